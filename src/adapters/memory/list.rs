use std::collections::VecDeque;
use std::time::{Duration, Instant};

use super::store::{encode, no_such_key, resolve_range, Keyspace};
use super::MemoryAdapter;
use crate::groups::{GroupList, LInsertOp};
use crate::{Context, KvError, Result, Value};

/// Longest a blocked pop sleeps before re-checking its context.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Clone, Copy)]
pub(super) enum End {
    Head,
    Tail,
}

pub(super) fn push_in(ks: &mut Keyspace, key: &str, values: Vec<Value>, end: End, only_existing: bool) -> Result<i64> {
    if only_existing && ks.list(key)?.is_none() {
        return Ok(0);
    }
    let list = ks.list_or_create(key)?;
    for value in &values {
        match end {
            End::Head => list.push_front(encode(value)),
            End::Tail => list.push_back(encode(value)),
        }
    }
    let len = list.len() as i64;
    ks.drop_if_empty(key);
    Ok(len)
}

pub(super) fn pop_in(ks: &mut Keyspace, key: &str, end: End, count: usize) -> Result<Option<Vec<Vec<u8>>>> {
    let Some(list) = ks.list(key)? else {
        return Ok(None);
    };
    let mut popped = Vec::with_capacity(count.min(list.len()));
    while popped.len() < count {
        let item = match end {
            End::Head => list.pop_front(),
            End::Tail => list.pop_back(),
        };
        match item {
            Some(item) => popped.push(item),
            None => break,
        }
    }
    ks.drop_if_empty(key);
    Ok(Some(popped))
}

fn resolve_index(index: i64, len: usize) -> Option<usize> {
    let index = if index < 0 { len as i64 + index } else { index };
    (0..len as i64).contains(&index).then_some(index as usize)
}

fn bulk_all(items: impl IntoIterator<Item = Vec<u8>>) -> Vec<Value> {
    items.into_iter().map(Value::bulk).collect()
}

/// Pops one item from the tail of `source` onto the head of `destination`.
fn move_tail_to_head(ks: &mut Keyspace, source: &str, destination: &str) -> Result<Option<Vec<u8>>> {
    if ks.list(source)?.is_none() {
        return Ok(None);
    }
    // Fail on a wrongly typed destination before touching the source.
    ks.list(destination)?;
    let Some(item) = pop_in(ks, source, End::Tail, 1)?.and_then(|mut v| v.pop()) else {
        return Ok(None);
    };
    ks.list_or_create(destination)?.push_front(item.clone());
    Ok(Some(item))
}

impl MemoryAdapter {
    fn pop(&self, ctx: &Context, key: &str, end: End, count: Option<usize>) -> Result<Value> {
        self.with_db(ctx, |ks| {
            let popped = pop_in(ks, key, end, count.unwrap_or(1))?;
            Ok(match (popped, count) {
                (None, _) => Value::Nil,
                (Some(items), Some(_)) => Value::Array(bulk_all(items)),
                (Some(mut items), None) => Value::from(items.pop().map(Value::bulk)),
            })
        })
    }

    fn push(&self, ctx: &Context, key: &str, values: Vec<Value>, end: End, only_existing: bool) -> Result<i64> {
        let len = self.with_db(ctx, |ks| push_in(ks, key, values, end, only_existing))?;
        self.store.notify_pushed();
        Ok(len)
    }

    /// Runs `attempt` until it yields something, the timeout in seconds
    /// elapses (never when zero) or `ctx` is done.
    fn block_on<R>(
        &self,
        ctx: &Context,
        timeout: i64,
        mut attempt: impl FnMut(&mut Keyspace) -> Result<Option<R>>,
    ) -> Result<Option<R>> {
        if timeout < 0 {
            return Err(KvError::Store("ERR timeout is negative".to_owned()));
        }
        // a timeout too far out to represent waits like zero
        let deadline = (timeout > 0)
            .then(|| Instant::now().checked_add(Duration::from_secs(timeout as u64)))
            .flatten();
        let mut dbs = self.store.lock();
        loop {
            ctx.check()?;
            if let Some(found) = attempt(&mut dbs[self.db])? {
                drop(dbs);
                self.store.notify_pushed();
                return Ok(Some(found));
            }
            let mut wait = POLL_INTERVAL;
            if let Some(deadline) = deadline {
                let now = Instant::now();
                if now >= deadline {
                    return Ok(None);
                }
                wait = wait.min(deadline - now);
            }
            if let Some(remaining) = ctx.remaining() {
                wait = wait.min(remaining);
            }
            self.store.wait(&mut dbs, wait);
        }
    }

    fn blocking_pop(&self, ctx: &Context, timeout: i64, keys: &[&str], end: End) -> Result<Vec<Value>> {
        let popped = self.block_on(ctx, timeout, |ks| {
            for &key in keys {
                if let Some(item) = pop_in(ks, key, end, 1)?.and_then(|mut v| v.pop()) {
                    return Ok(Some(vec![Value::from(key), Value::bulk(item)]));
                }
            }
            Ok(None)
        })?;
        Ok(popped.unwrap_or_default())
    }
}

impl GroupList for MemoryAdapter {
    fn lpush(&self, ctx: &Context, key: &str, values: Vec<Value>) -> Result<i64> {
        self.push(ctx, key, values, End::Head, false)
    }

    fn lpush_x(&self, ctx: &Context, key: &str, values: Vec<Value>) -> Result<i64> {
        self.push(ctx, key, values, End::Head, true)
    }

    fn rpush(&self, ctx: &Context, key: &str, values: Vec<Value>) -> Result<i64> {
        self.push(ctx, key, values, End::Tail, false)
    }

    fn rpush_x(&self, ctx: &Context, key: &str, values: Vec<Value>) -> Result<i64> {
        self.push(ctx, key, values, End::Tail, true)
    }

    fn lpop(&self, ctx: &Context, key: &str, count: Option<usize>) -> Result<Value> {
        self.pop(ctx, key, End::Head, count)
    }

    fn rpop(&self, ctx: &Context, key: &str, count: Option<usize>) -> Result<Value> {
        self.pop(ctx, key, End::Tail, count)
    }

    fn lrem(&self, ctx: &Context, key: &str, count: i64, value: Value) -> Result<i64> {
        let value = encode(&value);
        self.with_db(ctx, |ks| {
            let Some(list) = ks.list(key)? else {
                return Ok(0);
            };
            let limit = if count == 0 { usize::MAX } else { count.unsigned_abs() as usize };
            let mut removed = 0;
            let mut kept: VecDeque<Vec<u8>> = VecDeque::with_capacity(list.len());
            if count < 0 {
                while let Some(item) = list.pop_back() {
                    if removed < limit && item == value {
                        removed += 1;
                    } else {
                        kept.push_front(item);
                    }
                }
            } else {
                while let Some(item) = list.pop_front() {
                    if removed < limit && item == value {
                        removed += 1;
                    } else {
                        kept.push_back(item);
                    }
                }
            }
            *list = kept;
            ks.drop_if_empty(key);
            Ok(removed as i64)
        })
    }

    fn llen(&self, ctx: &Context, key: &str) -> Result<i64> {
        self.with_db(ctx, |ks| Ok(ks.list(key)?.map_or(0, |l| l.len() as i64)))
    }

    fn lindex(&self, ctx: &Context, key: &str, index: i64) -> Result<Value> {
        self.with_db(ctx, |ks| {
            let item = ks.list(key)?.and_then(|list| {
                resolve_index(index, list.len()).and_then(|i| list.get(i).cloned())
            });
            Ok(Value::from(item.map(Value::bulk)))
        })
    }

    fn linsert(&self, ctx: &Context, key: &str, op: LInsertOp, pivot: Value, value: Value) -> Result<i64> {
        let (pivot, value) = (encode(&pivot), encode(&value));
        let len = self.with_db(ctx, |ks| {
            let Some(list) = ks.list(key)? else {
                return Ok(0);
            };
            let Some(at) = list.iter().position(|item| *item == pivot) else {
                return Ok(-1);
            };
            let at = match op {
                LInsertOp::Before => at,
                LInsertOp::After => at + 1,
            };
            list.insert(at, value);
            Ok(list.len() as i64)
        })?;
        if len > 0 {
            self.store.notify_pushed();
        }
        Ok(len)
    }

    fn lset(&self, ctx: &Context, key: &str, index: i64, value: Value) -> Result<Value> {
        let value = encode(&value);
        self.with_db(ctx, |ks| {
            let list = ks.list(key)?.ok_or_else(no_such_key)?;
            let i = resolve_index(index, list.len())
                .ok_or_else(|| KvError::Store("ERR index out of range".to_owned()))?;
            list[i] = value;
            Ok(Value::from("OK"))
        })
    }

    fn lrange(&self, ctx: &Context, key: &str, start: i64, stop: i64) -> Result<Vec<Value>> {
        self.with_db(ctx, |ks| {
            let Some(list) = ks.list(key)? else {
                return Ok(Vec::new());
            };
            Ok(match resolve_range(start, stop, list.len()) {
                Some((from, to)) => list.range(from..=to).cloned().map(Value::bulk).collect(),
                None => Vec::new(),
            })
        })
    }

    fn ltrim(&self, ctx: &Context, key: &str, start: i64, stop: i64) -> Result<()> {
        self.with_db(ctx, |ks| {
            let Some(list) = ks.list(key)? else {
                return Ok(());
            };
            match resolve_range(start, stop, list.len()) {
                Some((from, to)) => {
                    list.truncate(to + 1);
                    list.drain(..from);
                }
                None => list.clear(),
            }
            ks.drop_if_empty(key);
            Ok(())
        })
    }

    fn blpop(&self, ctx: &Context, timeout: i64, keys: &[&str]) -> Result<Vec<Value>> {
        self.blocking_pop(ctx, timeout, keys, End::Head)
    }

    fn brpop(&self, ctx: &Context, timeout: i64, keys: &[&str]) -> Result<Vec<Value>> {
        self.blocking_pop(ctx, timeout, keys, End::Tail)
    }

    fn rpoplpush(&self, ctx: &Context, source: &str, destination: &str) -> Result<Value> {
        let moved = self.with_db(ctx, |ks| move_tail_to_head(ks, source, destination))?;
        if moved.is_some() {
            self.store.notify_pushed();
        }
        Ok(Value::from(moved.map(Value::bulk)))
    }

    fn brpoplpush(&self, ctx: &Context, source: &str, destination: &str, timeout: i64) -> Result<Value> {
        let moved = self.block_on(ctx, timeout, |ks| move_tail_to_head(ks, source, destination))?;
        Ok(Value::from(moved.map(Value::bulk)))
    }
}
