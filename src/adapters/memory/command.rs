//! Raw command dispatch for [`MemoryAdapter::do_command`].

use std::collections::HashMap;
use std::vec;

use super::script::unsupported;
use super::store::{not_float, not_integer, wrong_args};
use super::MemoryAdapter;
use crate::groups::{
    ExpireOption, GroupGeneric, GroupHash, GroupList, GroupPubSub, GroupSet, GroupSortedSet,
    GroupString, LInsertOp, SetCondition, SetOption, TtlOption, ZAddMember, ZAddOption,
    ZRangeLimit, ZRangeOption, ZRevRangeOption,
};
use crate::value::format_float;
use crate::{Context, KvError, Result, Value};

fn syntax_error() -> KvError {
    KvError::Store("ERR syntax error".to_owned())
}

/// Cursor over the arguments of one command.
struct Args {
    command: String,
    rest: vec::IntoIter<Value>,
}

impl Args {
    fn new(command: &str, args: Vec<Value>) -> Self {
        Args {
            command: command.to_owned(),
            rest: args.into_iter(),
        }
    }

    fn remaining(&self) -> usize {
        self.rest.len()
    }

    fn value(&mut self) -> Result<Value> {
        self.rest.next().ok_or_else(|| wrong_args(&self.command))
    }

    fn string(&mut self) -> Result<String> {
        self.value()?.as_string()
    }

    /// Next argument upper-cased, for matching keywords.
    fn keyword(&mut self) -> Result<String> {
        Ok(self.string()?.to_ascii_uppercase())
    }

    fn int(&mut self) -> Result<i64> {
        self.value()?.as_i64().map_err(|_| not_integer())
    }

    fn float(&mut self) -> Result<f64> {
        self.value()?.as_f64().map_err(|_| not_float())
    }

    fn values(&mut self) -> Vec<Value> {
        self.rest.by_ref().collect()
    }

    fn strings(&mut self) -> Result<Vec<String>> {
        self.rest.by_ref().map(|v| v.as_string()).collect()
    }

    /// Remaining arguments as field/value pairs.
    fn pairs(&mut self) -> Result<HashMap<String, Value>> {
        if self.remaining() == 0 || self.remaining() % 2 != 0 {
            return Err(wrong_args(&self.command));
        }
        let mut pairs = HashMap::with_capacity(self.remaining() / 2);
        while self.remaining() > 0 {
            let field = self.string()?;
            pairs.insert(field, self.value()?);
        }
        Ok(pairs)
    }

    fn at_least(&self, n: usize) -> Result<()> {
        if self.remaining() < n {
            Err(wrong_args(&self.command))
        } else {
            Ok(())
        }
    }

    fn done(&self) -> Result<()> {
        if self.remaining() > 0 {
            Err(syntax_error())
        } else {
            Ok(())
        }
    }
}

fn refs(strings: &[String]) -> Vec<&str> {
    strings.iter().map(String::as_str).collect()
}

fn ints(values: Vec<i64>) -> Value {
    Value::Array(values.into_iter().map(Value::Int).collect())
}

fn ok() -> Value {
    Value::from("OK")
}

fn parse_set_option(args: &mut Args) -> Result<SetOption> {
    let mut option = SetOption::default();
    while args.remaining() > 0 {
        match args.keyword()?.as_str() {
            "NX" => option.condition = Some(SetCondition::Nx),
            "XX" => option.condition = Some(SetCondition::Xx),
            "GET" => option.get = true,
            "EX" => option.ttl = Some(TtlOption::Ex(args.int()?)),
            "PX" => option.ttl = Some(TtlOption::Px(args.int()?)),
            "EXAT" => option.ttl = Some(TtlOption::ExAt(args.int()?)),
            "PXAT" => option.ttl = Some(TtlOption::PxAt(args.int()?)),
            "KEEPTTL" => option.ttl = Some(TtlOption::KeepTtl),
            _ => return Err(syntax_error()),
        }
    }
    Ok(option)
}

fn parse_expire_option(args: &mut Args) -> Result<Option<ExpireOption>> {
    if args.remaining() == 0 {
        return Ok(None);
    }
    let option = match args.keyword()?.as_str() {
        "NX" => ExpireOption::Nx,
        "XX" => ExpireOption::Xx,
        "GT" => ExpireOption::Gt,
        "LT" => ExpireOption::Lt,
        other => {
            return Err(KvError::Store(format!(
                "ERR Unsupported option {}",
                other
            )))
        }
    };
    args.done()?;
    Ok(Some(option))
}

fn parse_zadd(args: &mut Args) -> Result<(ZAddOption, Vec<ZAddMember>)> {
    let mut option = ZAddOption::default();
    let mut members = Vec::new();
    let mut values = args.values().into_iter().peekable();
    while let Some(flag) = values.peek().and_then(|v| v.as_string().ok()) {
        match flag.to_ascii_uppercase().as_str() {
            "NX" => option.nx = true,
            "XX" => option.xx = true,
            "GT" => option.gt = true,
            "LT" => option.lt = true,
            "CH" => option.ch = true,
            "INCR" => option.incr = true,
            _ => break,
        }
        values.next();
    }
    let values: Vec<Value> = values.collect();
    if values.is_empty() || values.len() % 2 != 0 {
        return Err(syntax_error());
    }
    for pair in values.chunks(2) {
        let score = pair[0].as_f64().map_err(|_| not_float())?;
        members.push(ZAddMember::new(score, pair[1].clone()));
    }
    Ok((option, members))
}

fn parse_zrange_option(args: &mut Args) -> Result<ZRangeOption> {
    let mut option = ZRangeOption::default();
    while args.remaining() > 0 {
        match args.keyword()?.as_str() {
            "BYSCORE" => option.by_score = true,
            "BYLEX" => option.by_lex = true,
            "REV" => option.rev = true,
            "WITHSCORES" => option.with_scores = true,
            "LIMIT" => {
                option.limit = Some(ZRangeLimit {
                    offset: args.int()?,
                    count: args.int()?,
                })
            }
            _ => return Err(syntax_error()),
        }
    }
    Ok(option)
}

/// Executes `command` against `adapter`.
///
/// Replies follow the store's conventions: integers for counts, `"OK"`
/// for acknowledgments, nil for absent values and arrays for multi-value
/// replies. Floats computed by the store come back as text.
pub(super) fn dispatch(adapter: &MemoryAdapter, ctx: &Context, command: &str, args: Vec<Value>) -> Result<Value> {
    let name = command.to_ascii_uppercase();
    let mut args = Args::new(command, args);
    let a = &mut args;
    let reply = match name.as_str() {
        "PING" => match a.remaining() {
            0 => Value::from("PONG"),
            _ => a.value()?,
        },
        "ECHO" => a.value()?,

        // strings
        "GET" => adapter.get(ctx, &a.string()?)?,
        "SET" => {
            let (key, value) = (a.string()?, a.value()?);
            let option = parse_set_option(a)?;
            adapter.set(ctx, &key, value, Some(option))?
        }
        "SETNX" => {
            let (key, value) = (a.string()?, a.value()?);
            Value::from(adapter.set_nx(ctx, &key, value)?)
        }
        "SETEX" => {
            let (key, ttl, value) = (a.string()?, a.int()?, a.value()?);
            adapter.set_ex(ctx, &key, value, ttl)?;
            ok()
        }
        "GETDEL" => adapter.get_del(ctx, &a.string()?)?,
        "GETSET" => {
            let key = a.string()?;
            adapter.get_set(ctx, &key, a.value()?)?
        }
        "STRLEN" => Value::Int(adapter.strlen(ctx, &a.string()?)?),
        "APPEND" => {
            let key = a.string()?;
            Value::Int(adapter.append(ctx, &key, &a.string()?)?)
        }
        "SETRANGE" => {
            let (key, offset, value) = (a.string()?, a.int()?, a.string()?);
            Value::Int(adapter.set_range(ctx, &key, offset, &value)?)
        }
        "GETRANGE" => {
            let (key, start, end) = (a.string()?, a.int()?, a.int()?);
            Value::from(adapter.get_range(ctx, &key, start, end)?)
        }
        "INCR" => Value::Int(adapter.incr(ctx, &a.string()?)?),
        "DECR" => Value::Int(adapter.decr(ctx, &a.string()?)?),
        "INCRBY" => {
            let key = a.string()?;
            Value::Int(adapter.incr_by(ctx, &key, a.int()?)?)
        }
        "DECRBY" => {
            let key = a.string()?;
            Value::Int(adapter.decr_by(ctx, &key, a.int()?)?)
        }
        "INCRBYFLOAT" => {
            let key = a.string()?;
            Value::from(format_float(adapter.incr_by_float(ctx, &key, a.float()?)?))
        }
        "MGET" => {
            a.at_least(1)?;
            let keys = a.strings()?;
            let mut found = adapter.mget(ctx, &refs(&keys))?;
            Value::Array(
                keys.iter()
                    .map(|k| found.remove(k).unwrap_or_default())
                    .collect(),
            )
        }
        "MSET" => {
            adapter.mset(ctx, a.pairs()?)?;
            ok()
        }
        "MSETNX" => Value::from(adapter.mset_nx(ctx, a.pairs()?)?),

        // keys
        "DEL" | "UNLINK" => {
            a.at_least(1)?;
            Value::Int(adapter.del(ctx, &refs(&a.strings()?))?)
        }
        "EXISTS" => {
            a.at_least(1)?;
            Value::Int(adapter.exists(ctx, &refs(&a.strings()?))?)
        }
        "TYPE" => Value::from(adapter.key_type(ctx, &a.string()?)?),
        "KEYS" => Value::Array(
            adapter
                .keys(ctx, &a.string()?)?
                .into_iter()
                .map(Value::from)
                .collect(),
        ),
        "RANDOMKEY" => Value::from(adapter.random_key(ctx)?),
        "RENAME" => {
            let (key, new_key) = (a.string()?, a.string()?);
            adapter.rename(ctx, &key, &new_key)?;
            ok()
        }
        "RENAMENX" => {
            let (key, new_key) = (a.string()?, a.string()?);
            Value::Int(adapter.rename_nx(ctx, &key, &new_key)?)
        }
        "DBSIZE" => Value::Int(adapter.db_size(ctx)?),
        "FLUSHDB" => {
            adapter.flush_db(ctx, None)?;
            ok()
        }
        "FLUSHALL" => {
            adapter.flush_all(ctx, None)?;
            ok()
        }
        "EXPIRE" => {
            let (key, seconds) = (a.string()?, a.int()?);
            let option = parse_expire_option(a)?;
            Value::Int(adapter.expire(ctx, &key, seconds, option)?)
        }
        "PEXPIRE" => {
            let (key, ms) = (a.string()?, a.int()?);
            let option = parse_expire_option(a)?;
            Value::Int(adapter.pexpire(ctx, &key, ms, option)?)
        }
        "TTL" => Value::Int(adapter.ttl(ctx, &a.string()?)?),
        "PTTL" => Value::Int(adapter.pttl(ctx, &a.string()?)?),
        "PERSIST" => Value::Int(adapter.persist(ctx, &a.string()?)?),

        // hashes
        "HSET" => {
            let key = a.string()?;
            Value::Int(adapter.hset(ctx, &key, a.pairs()?)?)
        }
        "HMSET" => {
            let key = a.string()?;
            adapter.hmset(ctx, &key, a.pairs()?)?;
            ok()
        }
        "HSETNX" => {
            let (key, field, value) = (a.string()?, a.string()?, a.value()?);
            Value::Int(adapter.hset_nx(ctx, &key, &field, value)?)
        }
        "HGET" => {
            let (key, field) = (a.string()?, a.string()?);
            adapter.hget(ctx, &key, &field)?
        }
        "HSTRLEN" => {
            let (key, field) = (a.string()?, a.string()?);
            Value::Int(adapter.hstrlen(ctx, &key, &field)?)
        }
        "HEXISTS" => {
            let (key, field) = (a.string()?, a.string()?);
            Value::Int(adapter.hexists(ctx, &key, &field)?)
        }
        "HDEL" => {
            let key = a.string()?;
            a.at_least(1)?;
            Value::Int(adapter.hdel(ctx, &key, &refs(&a.strings()?))?)
        }
        "HLEN" => Value::Int(adapter.hlen(ctx, &a.string()?)?),
        "HINCRBY" => {
            let (key, field, by) = (a.string()?, a.string()?, a.int()?);
            Value::Int(adapter.hincr_by(ctx, &key, &field, by)?)
        }
        "HINCRBYFLOAT" => {
            let (key, field, by) = (a.string()?, a.string()?, a.float()?);
            Value::from(format_float(adapter.hincr_by_float(ctx, &key, &field, by)?))
        }
        "HMGET" => {
            let key = a.string()?;
            a.at_least(1)?;
            Value::Array(adapter.hmget(ctx, &key, &refs(&a.strings()?))?)
        }
        "HKEYS" => Value::Array(
            adapter
                .hkeys(ctx, &a.string()?)?
                .into_iter()
                .map(Value::from)
                .collect(),
        ),
        "HVALS" => Value::Array(adapter.hvals(ctx, &a.string()?)?),
        "HGETALL" => adapter.hgetall(ctx, &a.string()?)?,

        // lists
        "LPUSH" | "RPUSH" | "LPUSHX" | "RPUSHX" => {
            let key = a.string()?;
            a.at_least(1)?;
            let values = a.values();
            Value::Int(match name.as_str() {
                "LPUSH" => adapter.lpush(ctx, &key, values)?,
                "RPUSH" => adapter.rpush(ctx, &key, values)?,
                "LPUSHX" => adapter.lpush_x(ctx, &key, values)?,
                _ => adapter.rpush_x(ctx, &key, values)?,
            })
        }
        "LPOP" | "RPOP" => {
            let key = a.string()?;
            let count = match a.remaining() {
                0 => None,
                _ => Some(usize::try_from(a.int()?).map_err(|_| not_integer())?),
            };
            if name == "LPOP" {
                adapter.lpop(ctx, &key, count)?
            } else {
                adapter.rpop(ctx, &key, count)?
            }
        }
        "LREM" => {
            let (key, count, value) = (a.string()?, a.int()?, a.value()?);
            Value::Int(adapter.lrem(ctx, &key, count, value)?)
        }
        "LLEN" => Value::Int(adapter.llen(ctx, &a.string()?)?),
        "LINDEX" => {
            let (key, index) = (a.string()?, a.int()?);
            adapter.lindex(ctx, &key, index)?
        }
        "LINSERT" => {
            let key = a.string()?;
            let op = match a.keyword()?.as_str() {
                "BEFORE" => LInsertOp::Before,
                "AFTER" => LInsertOp::After,
                _ => return Err(syntax_error()),
            };
            let (pivot, value) = (a.value()?, a.value()?);
            Value::Int(adapter.linsert(ctx, &key, op, pivot, value)?)
        }
        "LSET" => {
            let (key, index, value) = (a.string()?, a.int()?, a.value()?);
            adapter.lset(ctx, &key, index, value)?
        }
        "LRANGE" => {
            let (key, start, stop) = (a.string()?, a.int()?, a.int()?);
            Value::Array(adapter.lrange(ctx, &key, start, stop)?)
        }
        "LTRIM" => {
            let (key, start, stop) = (a.string()?, a.int()?, a.int()?);
            adapter.ltrim(ctx, &key, start, stop)?;
            ok()
        }
        "RPOPLPUSH" => {
            let (source, destination) = (a.string()?, a.string()?);
            adapter.rpoplpush(ctx, &source, &destination)?
        }

        // sets
        "SADD" | "SREM" => {
            let key = a.string()?;
            a.at_least(1)?;
            let members = a.values();
            Value::Int(if name == "SADD" {
                adapter.sadd(ctx, &key, members)?
            } else {
                adapter.srem(ctx, &key, members)?
            })
        }
        "SISMEMBER" => {
            let key = a.string()?;
            Value::Int(adapter.sismember(ctx, &key, a.value()?)?)
        }
        "SMISMEMBER" => {
            let key = a.string()?;
            a.at_least(1)?;
            ints(adapter.smismember(ctx, &key, a.values())?)
        }
        "SMEMBERS" => Value::Array(adapter.smembers(ctx, &a.string()?)?),
        "SCARD" => Value::Int(adapter.scard(ctx, &a.string()?)?),
        "SPOP" => {
            let key = a.string()?;
            let count = match a.remaining() {
                0 => None,
                _ => Some(usize::try_from(a.int()?).map_err(|_| not_integer())?),
            };
            adapter.spop(ctx, &key, count)?
        }
        "SRANDMEMBER" => {
            let key = a.string()?;
            let count = match a.remaining() {
                0 => None,
                _ => Some(a.int()?),
            };
            adapter.srandmember(ctx, &key, count)?
        }
        "SMOVE" => {
            let (source, destination, member) = (a.string()?, a.string()?, a.value()?);
            Value::Int(adapter.smove(ctx, &source, &destination, member)?)
        }
        "SINTER" | "SUNION" | "SDIFF" => {
            a.at_least(1)?;
            let keys = a.strings()?;
            let keys = refs(&keys);
            Value::Array(match name.as_str() {
                "SINTER" => adapter.sinter(ctx, &keys)?,
                "SUNION" => adapter.sunion(ctx, &keys)?,
                _ => adapter.sdiff(ctx, &keys)?,
            })
        }

        // sorted sets
        "ZADD" => {
            let key = a.string()?;
            let (option, members) = parse_zadd(a)?;
            adapter.zadd(ctx, &key, Some(option), members)?
        }
        "ZSCORE" => {
            let key = a.string()?;
            let member = a.value()?;
            if adapter.zrank(ctx, &key, member.clone())? < 0 {
                Value::Nil
            } else {
                Value::Float(adapter.zscore(ctx, &key, member)?)
            }
        }
        "ZINCRBY" => {
            let (key, by, member) = (a.string()?, a.float()?, a.value()?);
            Value::Float(adapter.zincr_by(ctx, &key, by, member)?)
        }
        "ZCARD" => Value::Int(adapter.zcard(ctx, &a.string()?)?),
        "ZCOUNT" => {
            let (key, min, max) = (a.string()?, a.string()?, a.string()?);
            Value::Int(adapter.zcount(ctx, &key, &min, &max)?)
        }
        "ZRANGE" => {
            let (key, start, stop) = (a.string()?, a.string()?, a.string()?);
            let option = parse_zrange_option(a)?;
            Value::Array(adapter.zrange(ctx, &key, &start, &stop, Some(option))?)
        }
        "ZREVRANGE" => {
            let (key, start, stop) = (a.string()?, a.int()?, a.int()?);
            let with_scores = a.remaining() > 0;
            if with_scores && a.keyword()? != "WITHSCORES" {
                return Err(syntax_error());
            }
            adapter.zrev_range(ctx, &key, start, stop, Some(ZRevRangeOption { with_scores }))?
        }
        "ZRANK" | "ZREVRANK" => {
            let (key, member) = (a.string()?, a.value()?);
            let rank = if name == "ZRANK" {
                adapter.zrank(ctx, &key, member)?
            } else {
                adapter.zrev_rank(ctx, &key, member)?
            };
            if rank < 0 {
                Value::Nil
            } else {
                Value::Int(rank)
            }
        }
        "ZREM" => {
            let key = a.string()?;
            a.at_least(1)?;
            Value::Int(adapter.zrem(ctx, &key, a.values())?)
        }

        "PUBLISH" => {
            let channel = a.string()?;
            Value::Int(adapter.publish(ctx, &channel, a.value()?)?)
        }
        "EVAL" | "EVALSHA" | "SCRIPT" => return Err(unsupported(&name)),
        _ => {
            return Err(KvError::Store(format!(
                "ERR unknown command '{}'",
                command
            )))
        }
    };
    args.done()?;
    Ok(reply)
}
