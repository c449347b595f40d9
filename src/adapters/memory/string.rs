use std::collections::HashMap;

use super::store::{encode, not_integer, now_ms, parse_f64, parse_i64, resolve_range, Data, Entry, Keyspace};
use super::MemoryAdapter;
use crate::groups::{GetExOption, GroupString, SetCondition, SetOption, TtlOption};
use crate::value::format_float;
use crate::{Context, KvError, Result, Value};

/// Largest string value SETRANGE may produce.
const MAX_STRING_LEN: usize = 512 * 1024 * 1024;

/// Absolute expiry, in Unix milliseconds, described by `ttl`.
///
/// `KeepTtl` yields `None`; callers decide what keeping means.
pub(super) fn ttl_deadline(ttl: TtlOption, command: &str) -> Result<Option<i64>> {
    let at = match ttl {
        TtlOption::Ex(secs) if secs > 0 => now_ms().saturating_add(secs.saturating_mul(1000)),
        TtlOption::Px(ms) if ms > 0 => now_ms().saturating_add(ms),
        TtlOption::ExAt(secs) if secs > 0 => secs.saturating_mul(1000),
        TtlOption::PxAt(ms) if ms > 0 => ms,
        TtlOption::KeepTtl => return Ok(None),
        _ => {
            return Err(KvError::Store(format!(
                "ERR invalid expire time in '{}' command",
                command
            )))
        }
    };
    Ok(Some(at))
}

fn incr_in(ks: &mut Keyspace, key: &str, delta: i64) -> Result<i64> {
    let current = match ks.string(key)? {
        Some(bytes) => parse_i64(bytes)?,
        None => 0,
    };
    let next = current.checked_add(delta).ok_or_else(|| {
        KvError::Store("ERR increment or decrement would overflow".to_owned())
    })?;
    write_keeping_ttl(ks, key, next.to_string().into_bytes());
    Ok(next)
}

/// Replaces the string at `key`, keeping its expiry if it has one.
fn write_keeping_ttl(ks: &mut Keyspace, key: &str, value: Vec<u8>) {
    match ks.live(key) {
        Some(entry) => entry.data = Data::Str(value),
        None => ks.set_string(key, value),
    }
}

pub(super) fn set_in(ks: &mut Keyspace, key: &str, value: Vec<u8>, option: SetOption) -> Result<Value> {
    let old = if option.get {
        Value::from(ks.string(key)?.map(|v| Value::bulk(v.clone())))
    } else {
        Value::Nil
    };
    let exists = ks.contains(key);
    let blocked = match option.condition {
        Some(SetCondition::Nx) => exists,
        Some(SetCondition::Xx) => !exists,
        None => false,
    };
    if blocked {
        return Ok(old);
    }
    let expires_at = match option.ttl {
        None => None,
        Some(TtlOption::KeepTtl) => ks.live(key).and_then(|e| e.expires_at),
        Some(ttl) => ttl_deadline(ttl, "set")?,
    };
    ks.insert(
        key.to_owned(),
        Entry {
            data: Data::Str(value),
            expires_at,
        },
    );
    Ok(if option.get { old } else { Value::from("OK") })
}

impl GroupString for MemoryAdapter {
    fn set(&self, ctx: &Context, key: &str, value: Value, option: Option<SetOption>) -> Result<Value> {
        let value = encode(&value);
        self.with_db(ctx, |ks| set_in(ks, key, value, option.unwrap_or_default()))
    }

    fn set_nx(&self, ctx: &Context, key: &str, value: Value) -> Result<bool> {
        let option = SetOption {
            condition: Some(SetCondition::Nx),
            ..Default::default()
        };
        Ok(!self.set(ctx, key, value, Some(option))?.is_nil())
    }

    fn set_ex(&self, ctx: &Context, key: &str, value: Value, ttl_in_seconds: i64) -> Result<()> {
        let value = encode(&value);
        self.with_db(ctx, |ks| {
            let expires_at = ttl_deadline(TtlOption::Ex(ttl_in_seconds), "setex")?;
            ks.insert(
                key.to_owned(),
                Entry {
                    data: Data::Str(value),
                    expires_at,
                },
            );
            Ok(())
        })
    }

    fn get(&self, ctx: &Context, key: &str) -> Result<Value> {
        self.with_db(ctx, |ks| {
            Ok(Value::from(ks.string(key)?.map(|v| Value::bulk(v.clone()))))
        })
    }

    fn get_del(&self, ctx: &Context, key: &str) -> Result<Value> {
        self.with_db(ctx, |ks| {
            let value = ks.string(key)?.map(|v| Value::bulk(v.clone()));
            if value.is_some() {
                ks.remove(key);
            }
            Ok(Value::from(value))
        })
    }

    fn get_ex(&self, ctx: &Context, key: &str, option: Option<GetExOption>) -> Result<Value> {
        self.with_db(ctx, |ks| {
            let Some(value) = ks.string(key)?.map(|v| Value::bulk(v.clone())) else {
                return Ok(Value::Nil);
            };
            let expires_at = match option {
                None | Some(GetExOption::Ttl(TtlOption::KeepTtl)) => return Ok(value),
                Some(GetExOption::Persist) => None,
                Some(GetExOption::Ttl(ttl)) => ttl_deadline(ttl, "getex")?,
            };
            if let Some(entry) = ks.live(key) {
                entry.expires_at = expires_at;
            }
            Ok(value)
        })
    }

    fn get_set(&self, ctx: &Context, key: &str, value: Value) -> Result<Value> {
        let option = SetOption {
            get: true,
            ..Default::default()
        };
        self.set(ctx, key, value, Some(option))
    }

    fn strlen(&self, ctx: &Context, key: &str) -> Result<i64> {
        self.with_db(ctx, |ks| Ok(ks.string(key)?.map_or(0, |v| v.len() as i64)))
    }

    fn append(&self, ctx: &Context, key: &str, value: &str) -> Result<i64> {
        self.with_db(ctx, |ks| {
            if let Some(current) = ks.string(key)? {
                current.extend_from_slice(value.as_bytes());
                return Ok(current.len() as i64);
            }
            ks.set_string(key, value.as_bytes().to_vec());
            Ok(value.len() as i64)
        })
    }

    fn set_range(&self, ctx: &Context, key: &str, offset: i64, value: &str) -> Result<i64> {
        let offset = usize::try_from(offset)
            .map_err(|_| KvError::Store("ERR offset is out of range".to_owned()))?;
        let end = offset
            .checked_add(value.len())
            .filter(|&end| end <= MAX_STRING_LEN)
            .ok_or_else(|| KvError::Store("ERR string exceeds maximum allowed size".to_owned()))?;
        self.with_db(ctx, |ks| {
            if value.is_empty() {
                return Ok(ks.string(key)?.map_or(0, |v| v.len() as i64));
            }
            if ks.string(key)?.is_none() {
                ks.set_string(key, Vec::new());
            }
            let current = ks.string(key)?.ok_or_else(not_integer)?;
            if current.len() < end {
                current.resize(end, 0);
            }
            current[offset..end].copy_from_slice(value.as_bytes());
            Ok(current.len() as i64)
        })
    }

    fn get_range(&self, ctx: &Context, key: &str, start: i64, end: i64) -> Result<String> {
        self.with_db(ctx, |ks| {
            let Some(bytes) = ks.string(key)? else {
                return Ok(String::new());
            };
            Ok(match resolve_range(start, end, bytes.len()) {
                Some((from, to)) => String::from_utf8_lossy(&bytes[from..=to]).into_owned(),
                None => String::new(),
            })
        })
    }

    fn incr(&self, ctx: &Context, key: &str) -> Result<i64> {
        self.incr_by(ctx, key, 1)
    }

    fn incr_by(&self, ctx: &Context, key: &str, increment: i64) -> Result<i64> {
        self.with_db(ctx, |ks| incr_in(ks, key, increment))
    }

    fn incr_by_float(&self, ctx: &Context, key: &str, increment: f64) -> Result<f64> {
        self.with_db(ctx, |ks| {
            let current = match ks.string(key)? {
                Some(bytes) => parse_f64(bytes)?,
                None => 0.0,
            };
            let next = current + increment;
            if !next.is_finite() {
                return Err(KvError::Store(
                    "ERR increment would produce NaN or Infinity".to_owned(),
                ));
            }
            write_keeping_ttl(ks, key, format_float(next).into_bytes());
            Ok(next)
        })
    }

    fn decr(&self, ctx: &Context, key: &str) -> Result<i64> {
        self.incr_by(ctx, key, -1)
    }

    fn decr_by(&self, ctx: &Context, key: &str, decrement: i64) -> Result<i64> {
        let delta = decrement.checked_neg().ok_or_else(not_integer)?;
        self.incr_by(ctx, key, delta)
    }

    fn mset(&self, ctx: &Context, key_values: HashMap<String, Value>) -> Result<()> {
        self.with_db(ctx, |ks| {
            for (key, value) in &key_values {
                ks.set_string(key, encode(value));
            }
            Ok(())
        })
    }

    fn mset_nx(&self, ctx: &Context, key_values: HashMap<String, Value>) -> Result<bool> {
        self.with_db(ctx, |ks| {
            if key_values.keys().any(|key| ks.contains(key)) {
                return Ok(false);
            }
            for (key, value) in &key_values {
                ks.set_string(key, encode(value));
            }
            Ok(true)
        })
    }

    fn mget(&self, ctx: &Context, keys: &[&str]) -> Result<HashMap<String, Value>> {
        self.with_db(ctx, |ks| {
            Ok(keys
                .iter()
                .map(|&key| {
                    let value = ks
                        .string(key)
                        .ok()
                        .flatten()
                        .map_or(Value::Nil, |v| Value::bulk(v.clone()));
                    (key.to_owned(), value)
                })
                .collect())
        })
    }
}
