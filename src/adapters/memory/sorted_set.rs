use std::collections::HashMap;

use super::store::{encode, not_float, not_integer, resolve_range, Keyspace};
use super::MemoryAdapter;
use crate::groups::{GroupSortedSet, ZAddMember, ZAddOption, ZRangeOption, ZRevRangeOption};
use crate::{Context, KvError, Result, Value};

type ZSet = HashMap<Vec<u8>, f64>;

/// Members ordered by score, ties broken by member bytes.
fn ordered(zset: &ZSet) -> Vec<(Vec<u8>, f64)> {
    let mut members: Vec<(Vec<u8>, f64)> = zset.iter().map(|(m, s)| (m.clone(), *s)).collect();
    members.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    members
}

#[derive(Debug, Clone, Copy)]
struct ScoreBound {
    value: f64,
    exclusive: bool,
}

impl ScoreBound {
    fn parse(raw: &str) -> Result<Self> {
        let (exclusive, raw) = match raw.strip_prefix('(') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        let value = match raw.to_ascii_lowercase().as_str() {
            "-inf" => f64::NEG_INFINITY,
            "+inf" | "inf" => f64::INFINITY,
            other => other
                .parse::<f64>()
                .ok()
                .filter(|f| !f.is_nan())
                .ok_or_else(|| KvError::Store("ERR min or max is not a float".to_owned()))?,
        };
        Ok(ScoreBound { value, exclusive })
    }

    fn admits_from_below(&self, score: f64) -> bool {
        if self.exclusive {
            score > self.value
        } else {
            score >= self.value
        }
    }

    fn admits_from_above(&self, score: f64) -> bool {
        if self.exclusive {
            score < self.value
        } else {
            score <= self.value
        }
    }
}

#[derive(Debug, Clone)]
enum LexBound {
    Lowest,
    Highest,
    Inclusive(Vec<u8>),
    Exclusive(Vec<u8>),
}

impl LexBound {
    fn parse(raw: &str) -> Result<Self> {
        match raw.as_bytes().split_first() {
            Some((b'-', [])) => Ok(LexBound::Lowest),
            Some((b'+', [])) => Ok(LexBound::Highest),
            Some((b'[', rest)) => Ok(LexBound::Inclusive(rest.to_vec())),
            Some((b'(', rest)) => Ok(LexBound::Exclusive(rest.to_vec())),
            _ => Err(KvError::Store(
                "ERR min or max not valid string range item".to_owned(),
            )),
        }
    }

    fn admits_from_below(&self, member: &[u8]) -> bool {
        match self {
            LexBound::Lowest => true,
            LexBound::Highest => false,
            LexBound::Inclusive(b) => member >= b.as_slice(),
            LexBound::Exclusive(b) => member > b.as_slice(),
        }
    }

    fn admits_from_above(&self, member: &[u8]) -> bool {
        match self {
            LexBound::Lowest => false,
            LexBound::Highest => true,
            LexBound::Inclusive(b) => member <= b.as_slice(),
            LexBound::Exclusive(b) => member < b.as_slice(),
        }
    }
}

fn by_score(zset: &ZSet, min: &str, max: &str) -> Result<Vec<(Vec<u8>, f64)>> {
    let (min, max) = (ScoreBound::parse(min)?, ScoreBound::parse(max)?);
    Ok(ordered(zset)
        .into_iter()
        .filter(|(_, s)| min.admits_from_below(*s) && max.admits_from_above(*s))
        .collect())
}

fn by_lex(zset: &ZSet, min: &str, max: &str) -> Result<Vec<(Vec<u8>, f64)>> {
    let (min, max) = (LexBound::parse(min)?, LexBound::parse(max)?);
    Ok(ordered(zset)
        .into_iter()
        .filter(|(m, _)| min.admits_from_below(m) && max.admits_from_above(m))
        .collect())
}

fn by_rank(zset: &ZSet, start: i64, stop: i64) -> Vec<(Vec<u8>, f64)> {
    let members = ordered(zset);
    match resolve_range(start, stop, members.len()) {
        Some((from, to)) => members[from..=to].to_vec(),
        None => Vec::new(),
    }
}

fn reply(members: Vec<(Vec<u8>, f64)>, with_scores: bool) -> Vec<Value> {
    let mut out = Vec::with_capacity(members.len() * if with_scores { 2 } else { 1 });
    for (member, score) in members {
        out.push(Value::bulk(member));
        if with_scores {
            out.push(Value::Float(score));
        }
    }
    out
}

fn parse_rank(raw: &str) -> Result<i64> {
    raw.trim().parse().map_err(|_| not_integer())
}

pub(super) fn zadd_in(ks: &mut Keyspace, key: &str, option: ZAddOption, members: &[(Vec<u8>, f64)]) -> Result<Value> {
    if option.nx && option.xx {
        return Err(KvError::Store(
            "ERR XX and NX options at the same time are not compatible".to_owned(),
        ));
    }
    if (option.gt && option.lt) || ((option.gt || option.lt) && option.nx) {
        return Err(KvError::Store(
            "ERR GT, LT, and/or NX options at the same time are not compatible".to_owned(),
        ));
    }
    if option.incr && members.len() != 1 {
        return Err(KvError::Store(
            "ERR INCR option supports a single increment-element pair".to_owned(),
        ));
    }
    let zset = ks.zset_or_create(key)?;
    let (mut added, mut changed) = (0, 0);
    let mut last = None;
    for (member, score) in members {
        let next = match zset.get(member) {
            Some(_) if option.nx => continue,
            None if option.xx => continue,
            Some(&old) => {
                let next = if option.incr { old + score } else { *score };
                if next.is_nan() {
                    return Err(nan_score());
                }
                if (option.gt && next <= old) || (option.lt && next >= old) {
                    continue;
                }
                if next != old {
                    changed += 1;
                }
                next
            }
            None => {
                added += 1;
                *score
            }
        };
        zset.insert(member.clone(), next);
        last = Some(next);
    }
    ks.drop_if_empty(key);
    Ok(if option.incr {
        Value::from(last)
    } else if option.ch {
        Value::Int(added + changed)
    } else {
        Value::Int(added)
    })
}

fn nan_score() -> KvError {
    KvError::Store("ERR resulting score is not a number (NaN)".to_owned())
}

fn remove_members(ks: &mut Keyspace, key: &str, members: Vec<(Vec<u8>, f64)>) -> Result<i64> {
    let Some(zset) = ks.zset(key)? else {
        return Ok(0);
    };
    let removed = members.iter().filter(|(m, _)| zset.remove(m).is_some()).count();
    ks.drop_if_empty(key);
    Ok(removed as i64)
}

impl MemoryAdapter {
    fn rank(&self, ctx: &Context, key: &str, member: Value, reverse: bool) -> Result<i64> {
        let member = encode(&member);
        self.with_db(ctx, |ks| {
            let Some(zset) = ks.zset(key)? else {
                return Ok(-1);
            };
            let mut members = ordered(zset);
            if reverse {
                members.reverse();
            }
            Ok(members
                .iter()
                .position(|(m, _)| *m == member)
                .map_or(-1, |i| i as i64))
        })
    }

    /// Runs `f` on the sorted set at `key`, or an empty one when missing.
    fn with_zset<R>(&self, ctx: &Context, key: &str, f: impl FnOnce(&ZSet) -> Result<R>) -> Result<R> {
        self.with_db(ctx, |ks| match ks.zset(key)? {
            Some(zset) => f(&*zset),
            None => f(&ZSet::new()),
        })
    }
}

impl GroupSortedSet for MemoryAdapter {
    fn zadd(&self, ctx: &Context, key: &str, option: Option<ZAddOption>, members: Vec<ZAddMember>) -> Result<Value> {
        let members: Vec<(Vec<u8>, f64)> = members
            .iter()
            .map(|m| (encode(&m.member), m.score))
            .collect();
        if members.iter().any(|(_, s)| s.is_nan()) {
            return Err(not_float());
        }
        self.with_db(ctx, |ks| zadd_in(ks, key, option.unwrap_or_default(), &members))
    }

    fn zscore(&self, ctx: &Context, key: &str, member: Value) -> Result<f64> {
        let member = encode(&member);
        self.with_zset(ctx, key, |zset| Ok(zset.get(&member).copied().unwrap_or_default()))
    }

    fn zincr_by(&self, ctx: &Context, key: &str, increment: f64, member: Value) -> Result<f64> {
        let option = ZAddOption {
            incr: true,
            ..Default::default()
        };
        let member = (encode(&member), increment);
        let next = self.with_db(ctx, |ks| zadd_in(ks, key, option, &[member]))?;
        next.as_f64()
    }

    fn zcard(&self, ctx: &Context, key: &str) -> Result<i64> {
        self.with_zset(ctx, key, |zset| Ok(zset.len() as i64))
    }

    fn zcount(&self, ctx: &Context, key: &str, min: &str, max: &str) -> Result<i64> {
        self.with_zset(ctx, key, |zset| Ok(by_score(zset, min, max)?.len() as i64))
    }

    fn zrange(&self, ctx: &Context, key: &str, start: &str, stop: &str, option: Option<ZRangeOption>) -> Result<Vec<Value>> {
        let option = option.unwrap_or_default();
        if option.limit.is_some() && !option.by_score && !option.by_lex {
            return Err(KvError::Store(
                "ERR syntax error, LIMIT is only supported in combination with either BYSCORE or BYLEX".to_owned(),
            ));
        }
        if option.by_lex && option.with_scores {
            return Err(KvError::Store(
                "ERR syntax error, WITHSCORES not supported in combination with BYLEX".to_owned(),
            ));
        }
        self.with_zset(ctx, key, |zset| {
            // reversed score and lex ranges name the upper bound first
            let (low, high) = if option.rev { (stop, start) } else { (start, stop) };
            let mut members = if option.by_score {
                by_score(zset, low, high)?
            } else if option.by_lex {
                by_lex(zset, low, high)?
            } else {
                let mut all = ordered(zset);
                if option.rev {
                    all.reverse();
                }
                let (start, stop) = (parse_rank(start)?, parse_rank(stop)?);
                return Ok(reply(
                    match resolve_range(start, stop, all.len()) {
                        Some((from, to)) => all[from..=to].to_vec(),
                        None => Vec::new(),
                    },
                    option.with_scores,
                ));
            };
            if option.rev {
                members.reverse();
            }
            if let Some(limit) = option.limit {
                let offset = limit.offset.max(0) as usize;
                let count = usize::try_from(limit.count).unwrap_or(usize::MAX);
                members = members.into_iter().skip(offset).take(count).collect();
            }
            Ok(reply(members, option.with_scores))
        })
    }

    fn zrev_range(&self, ctx: &Context, key: &str, start: i64, stop: i64, option: Option<ZRevRangeOption>) -> Result<Value> {
        let with_scores = option.unwrap_or_default().with_scores;
        self.with_zset(ctx, key, |zset| {
            let mut members = ordered(zset);
            members.reverse();
            let members = match resolve_range(start, stop, members.len()) {
                Some((from, to)) => members[from..=to].to_vec(),
                None => Vec::new(),
            };
            Ok(Value::Array(reply(members, with_scores)))
        })
    }

    fn zrank(&self, ctx: &Context, key: &str, member: Value) -> Result<i64> {
        self.rank(ctx, key, member, false)
    }

    fn zrev_rank(&self, ctx: &Context, key: &str, member: Value) -> Result<i64> {
        self.rank(ctx, key, member, true)
    }

    fn zrem(&self, ctx: &Context, key: &str, members: Vec<Value>) -> Result<i64> {
        let members: Vec<(Vec<u8>, f64)> = members.iter().map(|m| (encode(m), 0.0)).collect();
        self.with_db(ctx, |ks| remove_members(ks, key, members))
    }

    fn zrem_range_by_rank(&self, ctx: &Context, key: &str, start: i64, stop: i64) -> Result<i64> {
        self.with_db(ctx, |ks| {
            let doomed = ks.zset(key)?.map(|z| by_rank(z, start, stop)).unwrap_or_default();
            remove_members(ks, key, doomed)
        })
    }

    fn zrem_range_by_score(&self, ctx: &Context, key: &str, min: &str, max: &str) -> Result<i64> {
        self.with_db(ctx, |ks| {
            let doomed = match ks.zset(key)? {
                Some(zset) => by_score(zset, min, max)?,
                None => return Ok(0),
            };
            remove_members(ks, key, doomed)
        })
    }

    fn zrem_range_by_lex(&self, ctx: &Context, key: &str, min: &str, max: &str) -> Result<i64> {
        self.with_db(ctx, |ks| {
            let doomed = match ks.zset(key)? {
                Some(zset) => by_lex(zset, min, max)?,
                None => return Ok(0),
            };
            remove_members(ks, key, doomed)
        })
    }

    fn zlex_count(&self, ctx: &Context, key: &str, min: &str, max: &str) -> Result<i64> {
        self.with_zset(ctx, key, |zset| Ok(by_lex(zset, min, max)?.len() as i64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_bounds() -> Result<()> {
        let min = ScoreBound::parse("(1")?;
        assert!(!min.admits_from_below(1.0));
        assert!(min.admits_from_below(1.5));
        let max = ScoreBound::parse("+inf")?;
        assert!(max.admits_from_above(f64::MAX));
        assert!(ScoreBound::parse("abc").is_err());
        Ok(())
    }

    #[test]
    fn lex_bounds() -> Result<()> {
        let min = LexBound::parse("[b")?;
        let max = LexBound::parse("(d")?;
        assert!(min.admits_from_below(b"b"));
        assert!(!min.admits_from_below(b"a"));
        assert!(max.admits_from_above(b"c"));
        assert!(!max.admits_from_above(b"d"));
        assert!(LexBound::parse("b").is_err());
        Ok(())
    }

    #[test]
    fn ordering_breaks_ties_by_member() {
        let zset: ZSet = [(b"b".to_vec(), 1.0), (b"a".to_vec(), 1.0), (b"c".to_vec(), 0.5)]
            .into_iter()
            .collect();
        let members: Vec<Vec<u8>> = ordered(&zset).into_iter().map(|(m, _)| m).collect();
        assert_eq!(members, vec![b"c".to_vec(), b"a".to_vec(), b"b".to_vec()]);
    }

    #[test]
    fn incr_to_nan_is_rejected() {
        let mut ks = Keyspace::default();
        let plus = ZAddOption::default();
        zadd_in(&mut ks, "z", plus, &[(b"m".to_vec(), f64::INFINITY)]).unwrap();
        let incr = ZAddOption {
            incr: true,
            ..Default::default()
        };
        match zadd_in(&mut ks, "z", incr, &[(b"m".to_vec(), f64::NEG_INFINITY)]) {
            Err(KvError::Store(msg)) => assert_eq!(msg, "ERR resulting score is not a number (NaN)"),
            other => panic!("unexpected result {:?}", other),
        }
    }
}
