use std::collections::HashMap;

use super::store::{encode, not_float, parse_f64, parse_i64, Keyspace};
use super::MemoryAdapter;
use crate::groups::GroupHash;
use crate::value::format_float;
use crate::{Context, KvError, Result, Value};

pub(super) fn hset_in(ks: &mut Keyspace, key: &str, fields: &HashMap<String, Value>) -> Result<i64> {
    let hash = ks.hash_or_create(key)?;
    let mut added = 0;
    for (field, value) in fields {
        if hash.insert(field.clone(), encode(value)).is_none() {
            added += 1;
        }
    }
    ks.drop_if_empty(key);
    Ok(added)
}

fn field_bytes(ks: &mut Keyspace, key: &str, field: &str) -> Result<Option<Vec<u8>>> {
    Ok(ks.hash(key)?.and_then(|h| h.get(field).cloned()))
}

impl GroupHash for MemoryAdapter {
    fn hset(&self, ctx: &Context, key: &str, fields: HashMap<String, Value>) -> Result<i64> {
        self.with_db(ctx, |ks| hset_in(ks, key, &fields))
    }

    fn hset_nx(&self, ctx: &Context, key: &str, field: &str, value: Value) -> Result<i64> {
        self.with_db(ctx, |ks| {
            let hash = ks.hash_or_create(key)?;
            if hash.contains_key(field) {
                return Ok(0);
            }
            hash.insert(field.to_owned(), encode(&value));
            Ok(1)
        })
    }

    fn hget(&self, ctx: &Context, key: &str, field: &str) -> Result<Value> {
        self.with_db(ctx, |ks| Ok(Value::from(field_bytes(ks, key, field)?.map(Value::bulk))))
    }

    fn hstrlen(&self, ctx: &Context, key: &str, field: &str) -> Result<i64> {
        self.with_db(ctx, |ks| Ok(field_bytes(ks, key, field)?.map_or(0, |v| v.len() as i64)))
    }

    fn hexists(&self, ctx: &Context, key: &str, field: &str) -> Result<i64> {
        self.with_db(ctx, |ks| Ok(field_bytes(ks, key, field)?.is_some() as i64))
    }

    fn hdel(&self, ctx: &Context, key: &str, fields: &[&str]) -> Result<i64> {
        self.with_db(ctx, |ks| {
            let Some(hash) = ks.hash(key)? else {
                return Ok(0);
            };
            let removed = fields.iter().filter(|f| hash.remove(**f).is_some()).count();
            ks.drop_if_empty(key);
            Ok(removed as i64)
        })
    }

    fn hlen(&self, ctx: &Context, key: &str) -> Result<i64> {
        self.with_db(ctx, |ks| Ok(ks.hash(key)?.map_or(0, |h| h.len() as i64)))
    }

    fn hincr_by(&self, ctx: &Context, key: &str, field: &str, increment: i64) -> Result<i64> {
        self.with_db(ctx, |ks| {
            let hash = ks.hash_or_create(key)?;
            let current = match hash.get(field) {
                Some(bytes) => parse_i64(bytes).map_err(|_| {
                    KvError::Store("ERR hash value is not an integer".to_owned())
                })?,
                None => 0,
            };
            let next = current.checked_add(increment).ok_or_else(|| {
                KvError::Store("ERR increment or decrement would overflow".to_owned())
            })?;
            hash.insert(field.to_owned(), next.to_string().into_bytes());
            Ok(next)
        })
    }

    fn hincr_by_float(&self, ctx: &Context, key: &str, field: &str, increment: f64) -> Result<f64> {
        self.with_db(ctx, |ks| {
            let hash = ks.hash_or_create(key)?;
            let current = match hash.get(field) {
                Some(bytes) => parse_f64(bytes)?,
                None => 0.0,
            };
            let next = current + increment;
            if !next.is_finite() {
                return Err(not_float());
            }
            hash.insert(field.to_owned(), format_float(next).into_bytes());
            Ok(next)
        })
    }

    fn hmset(&self, ctx: &Context, key: &str, fields: HashMap<String, Value>) -> Result<()> {
        self.with_db(ctx, |ks| hset_in(ks, key, &fields).map(|_| ()))
    }

    fn hmget(&self, ctx: &Context, key: &str, fields: &[&str]) -> Result<Vec<Value>> {
        self.with_db(ctx, |ks| {
            let hash = ks.hash(key)?;
            Ok(fields
                .iter()
                .map(|f| {
                    hash.as_ref()
                        .and_then(|h| h.get(*f))
                        .map_or(Value::Nil, |v| Value::bulk(v.clone()))
                })
                .collect())
        })
    }

    fn hkeys(&self, ctx: &Context, key: &str) -> Result<Vec<String>> {
        self.with_db(ctx, |ks| {
            Ok(ks
                .hash(key)?
                .map(|h| h.keys().cloned().collect())
                .unwrap_or_default())
        })
    }

    fn hvals(&self, ctx: &Context, key: &str) -> Result<Vec<Value>> {
        self.with_db(ctx, |ks| {
            Ok(ks
                .hash(key)?
                .map(|h| h.values().map(|v| Value::bulk(v.clone())).collect())
                .unwrap_or_default())
        })
    }

    fn hgetall(&self, ctx: &Context, key: &str) -> Result<Value> {
        self.with_db(ctx, |ks| {
            let map: HashMap<String, Value> = ks
                .hash(key)?
                .map(|h| {
                    h.iter()
                        .map(|(f, v)| (f.clone(), Value::bulk(v.clone())))
                        .collect()
                })
                .unwrap_or_default();
            Ok(Value::Map(map))
        })
    }
}
