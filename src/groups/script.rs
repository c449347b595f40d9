use std::collections::HashMap;

use crate::{Context, Result, Value};

/// Server-side scripting operations.
pub trait GroupScript: Send + Sync {
    /// Evaluates `script` with `keys` and `args`.
    fn eval(&self, ctx: &Context, script: &str, keys: &[&str], args: Vec<Value>) -> Result<Value>;

    /// Evaluates a cached script by its SHA1 digest.
    fn eval_sha(&self, ctx: &Context, sha1: &str, keys: &[&str], args: Vec<Value>) -> Result<Value>;

    /// Loads `script` into the script cache, returning its digest.
    fn script_load(&self, ctx: &Context, script: &str) -> Result<String>;

    /// Reports which digests are cached.
    fn script_exists(&self, ctx: &Context, sha1s: &[&str]) -> Result<HashMap<String, bool>>;

    /// Flushes the script cache.
    fn script_flush(&self, ctx: &Context, option: Option<ScriptFlushOption>) -> Result<()>;

    /// Kills the currently running script.
    fn script_kill(&self, ctx: &Context) -> Result<()>;
}

/// Flush mode for [`GroupScript::script_flush`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptFlushOption {
    /// Flush synchronously.
    Sync,
    /// Flush asynchronously.
    Async,
}

impl ScriptFlushOption {
    /// Wire name of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            ScriptFlushOption::Sync => "SYNC",
            ScriptFlushOption::Async => "ASYNC",
        }
    }

    /// Wire arguments for the mode.
    pub fn to_args(&self) -> Vec<Value> {
        vec![self.as_str().into()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_flush_renders_mode() {
        assert_eq!(ScriptFlushOption::Sync.to_args(), vec![Value::from("SYNC")]);
    }
}
