use std::time::SystemTime;

use crate::{Context, Result, Value};

/// Key-space operations that apply to every data type.
pub trait GroupGeneric: Send + Sync {
    /// Copies `source` to `destination`, returning 1 if copied.
    fn copy(&self, ctx: &Context, source: &str, destination: &str, option: Option<CopyOption>) -> Result<i64>;

    /// Number of `keys` that exist, counting duplicates.
    fn exists(&self, ctx: &Context, keys: &[&str]) -> Result<i64>;

    /// Type name of the value at `key`, `"none"` if missing.
    fn key_type(&self, ctx: &Context, key: &str) -> Result<String>;

    /// Removes keys, returning how many existed.
    fn unlink(&self, ctx: &Context, keys: &[&str]) -> Result<i64>;

    /// Renames `key`, overwriting `new_key`.
    fn rename(&self, ctx: &Context, key: &str, new_key: &str) -> Result<()>;

    /// Renames `key` only if `new_key` does not exist. 1 if renamed.
    fn rename_nx(&self, ctx: &Context, key: &str, new_key: &str) -> Result<i64>;

    /// Moves `key` to database `db`. 1 if moved.
    fn move_key(&self, ctx: &Context, key: &str, db: u32) -> Result<i64>;

    /// Deletes keys, returning how many existed.
    fn del(&self, ctx: &Context, keys: &[&str]) -> Result<i64>;

    /// A random key, `None` on an empty database.
    fn random_key(&self, ctx: &Context) -> Result<Option<String>>;

    /// Number of keys in the current database.
    fn db_size(&self, ctx: &Context) -> Result<i64>;

    /// Keys matching the glob `pattern`.
    fn keys(&self, ctx: &Context, pattern: &str) -> Result<Vec<String>>;

    /// Deletes every key of the current database.
    fn flush_db(&self, ctx: &Context, option: Option<FlushOp>) -> Result<()>;

    /// Deletes every key of every database.
    fn flush_all(&self, ctx: &Context, option: Option<FlushOp>) -> Result<()>;

    /// Sets a time to live in seconds. 1 if set.
    fn expire(&self, ctx: &Context, key: &str, seconds: i64, option: Option<ExpireOption>) -> Result<i64>;

    /// Sets an absolute expiry, second precision. 1 if set.
    fn expire_at(&self, ctx: &Context, key: &str, time: SystemTime, option: Option<ExpireOption>) -> Result<i64>;

    /// Absolute expiry as Unix seconds; -1 without expiry, -2 if missing.
    fn expire_time(&self, ctx: &Context, key: &str) -> Result<Value>;

    /// Remaining time to live in seconds; -1 without expiry, -2 if missing.
    fn ttl(&self, ctx: &Context, key: &str) -> Result<i64>;

    /// Removes the expiry. 1 if one was removed.
    fn persist(&self, ctx: &Context, key: &str) -> Result<i64>;

    /// Sets a time to live in milliseconds. 1 if set.
    fn pexpire(&self, ctx: &Context, key: &str, milliseconds: i64, option: Option<ExpireOption>) -> Result<i64>;

    /// Sets an absolute expiry, millisecond precision. 1 if set.
    fn pexpire_at(&self, ctx: &Context, key: &str, time: SystemTime, option: Option<ExpireOption>) -> Result<i64>;

    /// Absolute expiry as Unix milliseconds; -1 without expiry, -2 if missing.
    fn pexpire_time(&self, ctx: &Context, key: &str) -> Result<Value>;

    /// Remaining time to live in milliseconds; -1 without expiry, -2 if missing.
    fn pttl(&self, ctx: &Context, key: &str) -> Result<i64>;
}

/// Options for [`GroupGeneric::copy`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyOption {
    /// Destination database, the current one when `None`.
    pub db: Option<u32>,
    /// Overwrite an existing destination.
    pub replace: bool,
}

impl CopyOption {
    /// Wire arguments: `DB <n>` then `REPLACE`, each only when set.
    pub fn to_args(&self) -> Vec<Value> {
        let mut args = Vec::new();
        if let Some(db) = self.db {
            args.extend(["DB".into(), Value::Int(i64::from(db))]);
        }
        if self.replace {
            args.push("REPLACE".into());
        }
        args
    }
}

/// Flush mode for [`GroupGeneric::flush_db`] and [`GroupGeneric::flush_all`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOp {
    /// Flush synchronously.
    Sync,
    /// Flush asynchronously.
    Async,
}

impl FlushOp {
    /// Wire name of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            FlushOp::Sync => "SYNC",
            FlushOp::Async => "ASYNC",
        }
    }

    /// Wire arguments for the mode.
    pub fn to_args(&self) -> Vec<Value> {
        vec![self.as_str().into()]
    }
}

/// Condition for the expire family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpireOption {
    /// Set expiry only when the key has none.
    Nx,
    /// Set expiry only when the key already has one.
    Xx,
    /// Set expiry only when it is later than the current one.
    Gt,
    /// Set expiry only when it is earlier than the current one.
    Lt,
}

impl ExpireOption {
    /// Wire name of the condition.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpireOption::Nx => "NX",
            ExpireOption::Xx => "XX",
            ExpireOption::Gt => "GT",
            ExpireOption::Lt => "LT",
        }
    }

    /// Wire arguments for the condition.
    pub fn to_args(&self) -> Vec<Value> {
        vec![self.as_str().into()]
    }
}
