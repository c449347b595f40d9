use std::collections::HashSet;

use rand::seq::{IteratorRandom, SliceRandom};

use super::store::{encode, Data, Entry, Keyspace};
use super::MemoryAdapter;
use crate::groups::GroupSet;
use crate::{Context, Result, Value};

#[derive(Clone, Copy)]
enum Combine {
    Inter,
    Union,
    Diff,
}

fn combine(ks: &mut Keyspace, keys: &[&str], how: Combine) -> Result<HashSet<Vec<u8>>> {
    let mut sets = Vec::with_capacity(keys.len());
    for key in keys {
        sets.push(ks.set(key)?.map(|s| s.clone()).unwrap_or_default());
    }
    let mut sets = sets.into_iter();
    let Some(mut result) = sets.next() else {
        return Ok(HashSet::new());
    };
    for other in sets {
        match how {
            Combine::Inter => result.retain(|m| other.contains(m)),
            Combine::Union => result.extend(other),
            Combine::Diff => result.retain(|m| !other.contains(m)),
        }
    }
    Ok(result)
}

fn store_set(ks: &mut Keyspace, destination: &str, members: HashSet<Vec<u8>>) -> i64 {
    let len = members.len() as i64;
    ks.remove(destination);
    if !members.is_empty() {
        ks.insert(destination.to_owned(), Entry::new(Data::Set(members)));
    }
    len
}

fn bulk_all(members: impl IntoIterator<Item = Vec<u8>>) -> Vec<Value> {
    members.into_iter().map(Value::bulk).collect()
}

impl MemoryAdapter {
    fn combine_store(&self, ctx: &Context, destination: &str, keys: &[&str], how: Combine) -> Result<i64> {
        self.with_db(ctx, |ks| {
            let members = combine(ks, keys, how)?;
            Ok(store_set(ks, destination, members))
        })
    }
}

impl GroupSet for MemoryAdapter {
    fn sadd(&self, ctx: &Context, key: &str, members: Vec<Value>) -> Result<i64> {
        self.with_db(ctx, |ks| {
            let set = ks.set_or_create(key)?;
            let added = members.iter().filter(|m| set.insert(encode(m))).count();
            ks.drop_if_empty(key);
            Ok(added as i64)
        })
    }

    fn sismember(&self, ctx: &Context, key: &str, member: Value) -> Result<i64> {
        let member = encode(&member);
        self.with_db(ctx, |ks| Ok(ks.set(key)?.is_some_and(|s| s.contains(&member)) as i64))
    }

    fn spop(&self, ctx: &Context, key: &str, count: Option<usize>) -> Result<Value> {
        self.with_db(ctx, |ks| {
            let Some(set) = ks.set(key)? else {
                return Ok(Value::Nil);
            };
            let chosen: Vec<Vec<u8>> = set
                .iter()
                .cloned()
                .choose_multiple(&mut rand::thread_rng(), count.unwrap_or(1));
            for member in &chosen {
                set.remove(member);
            }
            ks.drop_if_empty(key);
            Ok(match count {
                Some(_) => Value::Array(bulk_all(chosen)),
                None => Value::from(chosen.into_iter().next().map(Value::bulk)),
            })
        })
    }

    fn srandmember(&self, ctx: &Context, key: &str, count: Option<i64>) -> Result<Value> {
        self.with_db(ctx, |ks| {
            let members: Vec<Vec<u8>> = ks
                .set(key)?
                .map(|s| s.iter().cloned().collect())
                .unwrap_or_default();
            let mut rng = rand::thread_rng();
            Ok(match count {
                None => Value::from(members.choose(&mut rng).cloned().map(Value::bulk)),
                Some(n) if n >= 0 => Value::Array(bulk_all(
                    members.choose_multiple(&mut rng, n as usize).cloned(),
                )),
                // negative counts may repeat members
                Some(n) => Value::Array(
                    (0..n.unsigned_abs())
                        .filter_map(|_| members.choose(&mut rng).cloned())
                        .map(Value::bulk)
                        .collect(),
                ),
            })
        })
    }

    fn srem(&self, ctx: &Context, key: &str, members: Vec<Value>) -> Result<i64> {
        self.with_db(ctx, |ks| {
            let Some(set) = ks.set(key)? else {
                return Ok(0);
            };
            let removed = members.iter().filter(|m| set.remove(&encode(m))).count();
            ks.drop_if_empty(key);
            Ok(removed as i64)
        })
    }

    fn smove(&self, ctx: &Context, source: &str, destination: &str, member: Value) -> Result<i64> {
        let member = encode(&member);
        self.with_db(ctx, |ks| {
            ks.set(destination)?;
            let Some(set) = ks.set(source)? else {
                return Ok(0);
            };
            if !set.remove(&member) {
                return Ok(0);
            }
            ks.drop_if_empty(source);
            ks.set_or_create(destination)?.insert(member);
            Ok(1)
        })
    }

    fn scard(&self, ctx: &Context, key: &str) -> Result<i64> {
        self.with_db(ctx, |ks| Ok(ks.set(key)?.map_or(0, |s| s.len() as i64)))
    }

    fn smembers(&self, ctx: &Context, key: &str) -> Result<Vec<Value>> {
        self.with_db(ctx, |ks| {
            Ok(ks
                .set(key)?
                .map(|s| s.iter().cloned().map(Value::bulk).collect())
                .unwrap_or_default())
        })
    }

    fn smismember(&self, ctx: &Context, key: &str, members: Vec<Value>) -> Result<Vec<i64>> {
        self.with_db(ctx, |ks| {
            let set = ks.set(key)?;
            Ok(members
                .iter()
                .map(|m| set.as_ref().is_some_and(|s| s.contains(&encode(m))) as i64)
                .collect())
        })
    }

    fn sinter(&self, ctx: &Context, keys: &[&str]) -> Result<Vec<Value>> {
        self.with_db(ctx, |ks| Ok(bulk_all(combine(ks, keys, Combine::Inter)?)))
    }

    fn sinter_store(&self, ctx: &Context, destination: &str, keys: &[&str]) -> Result<i64> {
        self.combine_store(ctx, destination, keys, Combine::Inter)
    }

    fn sunion(&self, ctx: &Context, keys: &[&str]) -> Result<Vec<Value>> {
        self.with_db(ctx, |ks| Ok(bulk_all(combine(ks, keys, Combine::Union)?)))
    }

    fn sunion_store(&self, ctx: &Context, destination: &str, keys: &[&str]) -> Result<i64> {
        self.combine_store(ctx, destination, keys, Combine::Union)
    }

    fn sdiff(&self, ctx: &Context, keys: &[&str]) -> Result<Vec<Value>> {
        self.with_db(ctx, |ks| Ok(bulk_all(combine(ks, keys, Combine::Diff)?)))
    }

    fn sdiff_store(&self, ctx: &Context, destination: &str, keys: &[&str]) -> Result<i64> {
        self.combine_store(ctx, destination, keys, Combine::Diff)
    }
}
