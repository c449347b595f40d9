use std::collections::HashMap;

use crate::{Context, Result, Value};

/// String operations.
pub trait GroupString: Send + Sync {
    /// Sets `key` to `value`. Returns `"OK"`, or nil when an NX/XX condition
    /// was not met. With `get` set, returns the previous value instead.
    fn set(&self, ctx: &Context, key: &str, value: Value, option: Option<SetOption>) -> Result<Value>;

    /// Sets `key` only if it does not exist. Returns whether it was set.
    fn set_nx(&self, ctx: &Context, key: &str, value: Value) -> Result<bool>;

    /// Sets `key` with a time to live in seconds.
    fn set_ex(&self, ctx: &Context, key: &str, value: Value, ttl_in_seconds: i64) -> Result<()>;

    /// Gets the value of `key`, nil if missing.
    fn get(&self, ctx: &Context, key: &str) -> Result<Value>;

    /// Gets the value of `key` and deletes it.
    fn get_del(&self, ctx: &Context, key: &str) -> Result<Value>;

    /// Gets the value of `key`, optionally changing its expiry.
    fn get_ex(&self, ctx: &Context, key: &str, option: Option<GetExOption>) -> Result<Value>;

    /// Sets `key` to `value` and returns the old value.
    fn get_set(&self, ctx: &Context, key: &str, value: Value) -> Result<Value>;

    /// Length of the string stored at `key`.
    fn strlen(&self, ctx: &Context, key: &str) -> Result<i64>;

    /// Appends `value`, returning the new length.
    fn append(&self, ctx: &Context, key: &str, value: &str) -> Result<i64>;

    /// Overwrites part of the string starting at `offset`, returning the new length.
    fn set_range(&self, ctx: &Context, key: &str, offset: i64, value: &str) -> Result<i64>;

    /// Substring between `start` and `end`, both inclusive, negative from the end.
    fn get_range(&self, ctx: &Context, key: &str, start: i64, end: i64) -> Result<String>;

    /// Increments the integer at `key` by one.
    fn incr(&self, ctx: &Context, key: &str) -> Result<i64>;

    /// Increments the integer at `key` by `increment`.
    fn incr_by(&self, ctx: &Context, key: &str, increment: i64) -> Result<i64>;

    /// Increments the float at `key` by `increment`.
    fn incr_by_float(&self, ctx: &Context, key: &str, increment: f64) -> Result<f64>;

    /// Decrements the integer at `key` by one.
    fn decr(&self, ctx: &Context, key: &str) -> Result<i64>;

    /// Decrements the integer at `key` by `decrement`.
    fn decr_by(&self, ctx: &Context, key: &str, decrement: i64) -> Result<i64>;

    /// Sets several keys at once.
    fn mset(&self, ctx: &Context, key_values: HashMap<String, Value>) -> Result<()>;

    /// Sets several keys only if none of them exist.
    fn mset_nx(&self, ctx: &Context, key_values: HashMap<String, Value>) -> Result<bool>;

    /// Gets several keys. Missing keys map to nil.
    fn mget(&self, ctx: &Context, keys: &[&str]) -> Result<HashMap<String, Value>>;
}

/// Expiry attached to a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlOption {
    /// EX seconds: expire after this many seconds.
    Ex(i64),
    /// PX milliseconds: expire after this many milliseconds.
    Px(i64),
    /// EXAT timestamp: expire at this Unix time, in seconds.
    ExAt(i64),
    /// PXAT timestamp: expire at this Unix time, in milliseconds.
    PxAt(i64),
    /// KEEPTTL: retain the time to live already associated with the key.
    KeepTtl,
}

impl TtlOption {
    /// Wire arguments for this option.
    pub fn to_args(&self) -> Vec<Value> {
        match *self {
            TtlOption::Ex(n) => vec!["EX".into(), n.into()],
            TtlOption::Px(n) => vec!["PX".into(), n.into()],
            TtlOption::ExAt(n) => vec!["EXAT".into(), n.into()],
            TtlOption::PxAt(n) => vec!["PXAT".into(), n.into()],
            TtlOption::KeepTtl => vec!["KEEPTTL".into()],
        }
    }
}

/// Write condition for [`GroupString::set`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetCondition {
    /// Only set the key if it does not already exist.
    Nx,
    /// Only set the key if it already exists.
    Xx,
}

/// Extra options for [`GroupString::set`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOption {
    /// Expiry of the new value.
    pub ttl: Option<TtlOption>,
    /// Existence condition.
    pub condition: Option<SetCondition>,
    /// Return the old string stored at key, or nil if it did not exist.
    pub get: bool,
}

impl SetOption {
    /// Wire arguments for this option, in `SET` argument order.
    pub fn to_args(&self) -> Vec<Value> {
        let mut args = Vec::new();
        match self.condition {
            Some(SetCondition::Nx) => args.push("NX".into()),
            Some(SetCondition::Xx) => args.push("XX".into()),
            None => {}
        }
        if self.get {
            args.push("GET".into());
        }
        if let Some(ttl) = self.ttl {
            args.extend(ttl.to_args());
        }
        args
    }
}

/// Extra options for [`GroupString::get_ex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GetExOption {
    /// Set a new expiry. `KeepTtl` leaves the expiry untouched.
    Ttl(TtlOption),
    /// PERSIST: remove the time to live associated with the key.
    Persist,
}

impl GetExOption {
    /// Wire arguments for this option.
    pub fn to_args(&self) -> Vec<Value> {
        match self {
            GetExOption::Ttl(TtlOption::KeepTtl) => Vec::new(),
            GetExOption::Ttl(ttl) => ttl.to_args(),
            GetExOption::Persist => vec!["PERSIST".into()],
        }
    }
}
