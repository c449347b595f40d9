use std::fmt;

use crate::{Context, Result, Value};

/// List operations.
///
/// Blocking variants take a timeout in seconds; zero blocks until an
/// element arrives or the context is done. On timeout they return an empty
/// sequence (or nil for the single-value forms).
pub trait GroupList: Send + Sync {
    /// Prepends values, returning the new length.
    fn lpush(&self, ctx: &Context, key: &str, values: Vec<Value>) -> Result<i64>;

    /// Prepends values only if the list exists.
    fn lpush_x(&self, ctx: &Context, key: &str, values: Vec<Value>) -> Result<i64>;

    /// Appends values, returning the new length.
    fn rpush(&self, ctx: &Context, key: &str, values: Vec<Value>) -> Result<i64>;

    /// Appends values only if the list exists.
    fn rpush_x(&self, ctx: &Context, key: &str, values: Vec<Value>) -> Result<i64>;

    /// Pops from the head. Without `count` returns one element (or nil),
    /// with `count` returns a sequence.
    fn lpop(&self, ctx: &Context, key: &str, count: Option<usize>) -> Result<Value>;

    /// Pops from the tail, like [`GroupList::lpop`].
    fn rpop(&self, ctx: &Context, key: &str, count: Option<usize>) -> Result<Value>;

    /// Removes occurrences of `value`: `count > 0` from the head, `< 0` from
    /// the tail, `0` all of them.
    fn lrem(&self, ctx: &Context, key: &str, count: i64, value: Value) -> Result<i64>;

    /// Length of the list.
    fn llen(&self, ctx: &Context, key: &str) -> Result<i64>;

    /// Element at `index`, negative from the tail.
    fn lindex(&self, ctx: &Context, key: &str, index: i64) -> Result<Value>;

    /// Inserts `value` before or after `pivot`. Returns the new length, or -1
    /// when the pivot is missing.
    fn linsert(&self, ctx: &Context, key: &str, op: LInsertOp, pivot: Value, value: Value) -> Result<i64>;

    /// Replaces the element at `index`.
    fn lset(&self, ctx: &Context, key: &str, index: i64, value: Value) -> Result<Value>;

    /// Elements between `start` and `stop`, both inclusive.
    fn lrange(&self, ctx: &Context, key: &str, start: i64, stop: i64) -> Result<Vec<Value>>;

    /// Trims the list to the given range.
    fn ltrim(&self, ctx: &Context, key: &str, start: i64, stop: i64) -> Result<()>;

    /// Blocking head pop across `keys`. Returns `[key, element]`.
    fn blpop(&self, ctx: &Context, timeout: i64, keys: &[&str]) -> Result<Vec<Value>>;

    /// Blocking tail pop across `keys`. Returns `[key, element]`.
    fn brpop(&self, ctx: &Context, timeout: i64, keys: &[&str]) -> Result<Vec<Value>>;

    /// Moves the tail of `source` to the head of `destination`.
    fn rpoplpush(&self, ctx: &Context, source: &str, destination: &str) -> Result<Value>;

    /// Blocking [`GroupList::rpoplpush`].
    fn brpoplpush(&self, ctx: &Context, source: &str, destination: &str, timeout: i64) -> Result<Value>;
}

/// Position for [`GroupList::linsert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LInsertOp {
    /// Insert before the pivot.
    Before,
    /// Insert after the pivot.
    After,
}

impl LInsertOp {
    /// Wire name of the operation.
    pub fn as_str(&self) -> &'static str {
        match self {
            LInsertOp::Before => "BEFORE",
            LInsertOp::After => "AFTER",
        }
    }

    /// Wire arguments for the position.
    pub fn to_args(&self) -> Vec<Value> {
        vec![self.as_str().into()]
    }
}

impl fmt::Display for LInsertOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
