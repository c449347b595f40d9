use std::time::SystemTime;

use rand::seq::SliceRandom;

use super::store::{glob_match, no_such_key, now_ms, to_unix_ms, Keyspace};
use super::{check_db, MemoryAdapter};
use crate::groups::{CopyOption, ExpireOption, FlushOp, GroupGeneric};
use crate::{Context, KvError, Result, Value};

fn same_object() -> KvError {
    KvError::Store("ERR source and destination objects are the same".to_owned())
}

/// Sets the absolute expiry of `key` to `at_ms` subject to `option`.
///
/// A deadline in the past deletes the key. Returns 1 when applied.
pub(super) fn expire_in(ks: &mut Keyspace, key: &str, at_ms: i64, option: Option<ExpireOption>) -> i64 {
    let Some(entry) = ks.live(key) else {
        return 0;
    };
    let current = entry.expires_at;
    let allowed = match option {
        None => true,
        Some(ExpireOption::Nx) => current.is_none(),
        Some(ExpireOption::Xx) => current.is_some(),
        // no expiry counts as infinite
        Some(ExpireOption::Gt) => current.is_some_and(|c| at_ms > c),
        Some(ExpireOption::Lt) => current.map_or(true, |c| at_ms < c),
    };
    if !allowed {
        return 0;
    }
    if at_ms <= now_ms() {
        ks.remove(key);
    } else {
        entry.expires_at = Some(at_ms);
    }
    1
}

/// Remaining time to live in milliseconds, -1 without expiry, -2 if missing.
pub(super) fn pttl_in(ks: &mut Keyspace, key: &str) -> i64 {
    match ks.live(key) {
        None => -2,
        Some(entry) => entry.expires_at.map_or(-1, |at| (at - now_ms()).max(0)),
    }
}

pub(super) fn ttl_in(ks: &mut Keyspace, key: &str) -> i64 {
    match pttl_in(ks, key) {
        ms if ms < 0 => ms,
        ms => (ms + 500) / 1000,
    }
}

pub(super) fn persist_in(ks: &mut Keyspace, key: &str) -> i64 {
    match ks.live(key) {
        Some(entry) if entry.expires_at.is_some() => {
            entry.expires_at = None;
            1
        }
        _ => 0,
    }
}

pub(super) fn delete_in(ks: &mut Keyspace, keys: &[&str]) -> i64 {
    keys.iter().filter(|key| ks.remove(key).is_some()).count() as i64
}

pub(super) fn exists_in(ks: &mut Keyspace, keys: &[&str]) -> i64 {
    keys.iter().filter(|key| ks.contains(key)).count() as i64
}

pub(super) fn keys_in(ks: &mut Keyspace, pattern: &str) -> Vec<String> {
    let mut keys: Vec<String> = ks.keys().into_iter().filter(|k| glob_match(pattern, k)).collect();
    keys.sort();
    keys
}

pub(super) fn type_in(ks: &mut Keyspace, key: &str) -> String {
    ks.live(key)
        .map_or("none", |entry| entry.data.type_name())
        .to_owned()
}

impl MemoryAdapter {
    fn rename_inner(&self, ctx: &Context, key: &str, new_key: &str, only_new: bool) -> Result<i64> {
        self.with_db(ctx, |ks| {
            if !ks.contains(key) {
                return Err(no_such_key());
            }
            if key == new_key {
                return Ok(if only_new { 0 } else { 1 });
            }
            if only_new && ks.contains(new_key) {
                return Ok(0);
            }
            let entry = ks.remove(key).ok_or_else(no_such_key)?;
            ks.insert(new_key.to_owned(), entry);
            Ok(1)
        })
    }

    fn expiry(&self, ctx: &Context, key: &str, unit_ms: i64) -> Result<Value> {
        self.with_db(ctx, |ks| {
            Ok(Value::Int(match ks.live(key) {
                None => -2,
                Some(entry) => entry.expires_at.map_or(-1, |at| at / unit_ms),
            }))
        })
    }
}

impl GroupGeneric for MemoryAdapter {
    fn copy(&self, ctx: &Context, source: &str, destination: &str, option: Option<CopyOption>) -> Result<i64> {
        let option = option.unwrap_or_default();
        let target = match option.db {
            Some(db) => check_db(db)?,
            None => self.db,
        };
        if target == self.db && source == destination {
            return Err(same_object());
        }
        ctx.check()?;
        let mut dbs = self.store.lock();
        let Some(entry) = dbs[self.db].live(source).cloned() else {
            return Ok(0);
        };
        let dest = &mut dbs[target];
        if dest.contains(destination) && !option.replace {
            return Ok(0);
        }
        dest.insert(destination.to_owned(), entry);
        Ok(1)
    }

    fn exists(&self, ctx: &Context, keys: &[&str]) -> Result<i64> {
        self.with_db(ctx, |ks| Ok(exists_in(ks, keys)))
    }

    fn key_type(&self, ctx: &Context, key: &str) -> Result<String> {
        self.with_db(ctx, |ks| Ok(type_in(ks, key)))
    }

    fn unlink(&self, ctx: &Context, keys: &[&str]) -> Result<i64> {
        self.del(ctx, keys)
    }

    fn rename(&self, ctx: &Context, key: &str, new_key: &str) -> Result<()> {
        self.rename_inner(ctx, key, new_key, false).map(|_| ())
    }

    fn rename_nx(&self, ctx: &Context, key: &str, new_key: &str) -> Result<i64> {
        self.rename_inner(ctx, key, new_key, true)
    }

    fn move_key(&self, ctx: &Context, key: &str, db: u32) -> Result<i64> {
        let target = check_db(db)?;
        if target == self.db {
            return Err(same_object());
        }
        ctx.check()?;
        let mut dbs = self.store.lock();
        if !dbs[self.db].contains(key) || dbs[target].contains(key) {
            return Ok(0);
        }
        let Some(entry) = dbs[self.db].remove(key) else {
            return Ok(0);
        };
        dbs[target].insert(key.to_owned(), entry);
        Ok(1)
    }

    fn del(&self, ctx: &Context, keys: &[&str]) -> Result<i64> {
        self.with_db(ctx, |ks| Ok(delete_in(ks, keys)))
    }

    fn random_key(&self, ctx: &Context) -> Result<Option<String>> {
        self.with_db(ctx, |ks| Ok(ks.keys().choose(&mut rand::thread_rng()).cloned()))
    }

    fn db_size(&self, ctx: &Context) -> Result<i64> {
        self.with_db(ctx, |ks| Ok(ks.len() as i64))
    }

    fn keys(&self, ctx: &Context, pattern: &str) -> Result<Vec<String>> {
        self.with_db(ctx, |ks| Ok(keys_in(ks, pattern)))
    }

    fn flush_db(&self, ctx: &Context, _option: Option<FlushOp>) -> Result<()> {
        self.with_db(ctx, |ks| {
            ks.clear();
            Ok(())
        })
    }

    fn flush_all(&self, ctx: &Context, _option: Option<FlushOp>) -> Result<()> {
        ctx.check()?;
        self.store.lock().iter_mut().for_each(Keyspace::clear);
        Ok(())
    }

    fn expire(&self, ctx: &Context, key: &str, seconds: i64, option: Option<ExpireOption>) -> Result<i64> {
        self.pexpire(ctx, key, seconds.saturating_mul(1000), option)
    }

    fn expire_at(&self, ctx: &Context, key: &str, time: SystemTime, option: Option<ExpireOption>) -> Result<i64> {
        // whole seconds only
        let at = to_unix_ms(time).div_euclid(1000) * 1000;
        self.with_db(ctx, |ks| Ok(expire_in(ks, key, at, option)))
    }

    fn expire_time(&self, ctx: &Context, key: &str) -> Result<Value> {
        self.expiry(ctx, key, 1000)
    }

    fn ttl(&self, ctx: &Context, key: &str) -> Result<i64> {
        self.with_db(ctx, |ks| Ok(ttl_in(ks, key)))
    }

    fn persist(&self, ctx: &Context, key: &str) -> Result<i64> {
        self.with_db(ctx, |ks| Ok(persist_in(ks, key)))
    }

    fn pexpire(&self, ctx: &Context, key: &str, milliseconds: i64, option: Option<ExpireOption>) -> Result<i64> {
        self.with_db(ctx, |ks| {
            let at = now_ms().saturating_add(milliseconds);
            Ok(expire_in(ks, key, at, option))
        })
    }

    fn pexpire_at(&self, ctx: &Context, key: &str, time: SystemTime, option: Option<ExpireOption>) -> Result<i64> {
        let at = to_unix_ms(time);
        self.with_db(ctx, |ks| Ok(expire_in(ks, key, at, option)))
    }

    fn pexpire_time(&self, ctx: &Context, key: &str) -> Result<Value> {
        self.expiry(ctx, key, 1)
    }

    fn pttl(&self, ctx: &Context, key: &str) -> Result<i64> {
        self.with_db(ctx, |ks| Ok(pttl_in(ks, key)))
    }
}
