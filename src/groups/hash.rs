use std::collections::HashMap;

use crate::{Context, Result, Value};

/// Hash operations.
pub trait GroupHash: Send + Sync {
    /// Sets fields, returning how many were newly added.
    fn hset(&self, ctx: &Context, key: &str, fields: HashMap<String, Value>) -> Result<i64>;

    /// Sets `field` only if it does not exist. Returns 1 if set, 0 otherwise.
    fn hset_nx(&self, ctx: &Context, key: &str, field: &str, value: Value) -> Result<i64>;

    /// Value of `field`, nil if missing.
    fn hget(&self, ctx: &Context, key: &str, field: &str) -> Result<Value>;

    /// String length of the value of `field`.
    fn hstrlen(&self, ctx: &Context, key: &str, field: &str) -> Result<i64>;

    /// 1 if `field` exists, 0 otherwise.
    fn hexists(&self, ctx: &Context, key: &str, field: &str) -> Result<i64>;

    /// Removes fields, returning how many were removed.
    fn hdel(&self, ctx: &Context, key: &str, fields: &[&str]) -> Result<i64>;

    /// Number of fields.
    fn hlen(&self, ctx: &Context, key: &str) -> Result<i64>;

    /// Increments the integer stored at `field`.
    fn hincr_by(&self, ctx: &Context, key: &str, field: &str, increment: i64) -> Result<i64>;

    /// Increments the float stored at `field`.
    fn hincr_by_float(&self, ctx: &Context, key: &str, field: &str, increment: f64) -> Result<f64>;

    /// Sets fields.
    fn hmset(&self, ctx: &Context, key: &str, fields: HashMap<String, Value>) -> Result<()>;

    /// Values of `fields`, in order, nil for missing ones.
    fn hmget(&self, ctx: &Context, key: &str, fields: &[&str]) -> Result<Vec<Value>>;

    /// All field names.
    fn hkeys(&self, ctx: &Context, key: &str) -> Result<Vec<String>>;

    /// All values.
    fn hvals(&self, ctx: &Context, key: &str) -> Result<Vec<Value>>;

    /// All fields and values as a map value.
    fn hgetall(&self, ctx: &Context, key: &str) -> Result<Value>;
}
