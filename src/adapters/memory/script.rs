use std::collections::HashMap;

use super::MemoryAdapter;
use crate::groups::{GroupScript, ScriptFlushOption};
use crate::{Context, KvError, Result, Value};

pub(super) fn unsupported(command: &str) -> KvError {
    KvError::Unsupported(format!("{} is not supported by the memory adapter", command))
}

impl GroupScript for MemoryAdapter {
    fn eval(&self, _ctx: &Context, _script: &str, _keys: &[&str], _args: Vec<Value>) -> Result<Value> {
        Err(unsupported("EVAL"))
    }

    fn eval_sha(&self, _ctx: &Context, _sha1: &str, _keys: &[&str], _args: Vec<Value>) -> Result<Value> {
        Err(unsupported("EVALSHA"))
    }

    fn script_load(&self, _ctx: &Context, _script: &str) -> Result<String> {
        Err(unsupported("SCRIPT LOAD"))
    }

    fn script_exists(&self, _ctx: &Context, _sha1s: &[&str]) -> Result<HashMap<String, bool>> {
        Err(unsupported("SCRIPT EXISTS"))
    }

    fn script_flush(&self, _ctx: &Context, _option: Option<ScriptFlushOption>) -> Result<()> {
        Err(unsupported("SCRIPT FLUSH"))
    }

    fn script_kill(&self, _ctx: &Context) -> Result<()> {
        Err(unsupported("SCRIPT KILL"))
    }
}
