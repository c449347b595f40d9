use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime};

use kvclient::groups::*;
use kvclient::{Client, Conn, Context, KvError, MemoryAdapter, Result, Value};

fn client() -> Client {
    Client::with_adapter(Arc::new(MemoryAdapter::new()))
}

fn strings(values: Vec<Value>) -> Result<Vec<String>> {
    values.iter().map(Value::as_string).collect()
}

fn sorted(mut values: Vec<String>) -> Vec<String> {
    values.sort();
    values
}

#[test]
fn string_set_options() -> Result<()> {
    let ctx = Context::background();
    let c = client();

    assert_eq!(c.set(&ctx, "k", "v1".into(), None)?, Value::from("OK"));
    let nx = SetOption {
        condition: Some(SetCondition::Nx),
        ..Default::default()
    };
    assert_eq!(c.set(&ctx, "k", "v2".into(), Some(nx))?, Value::Nil);
    let xx_get = SetOption {
        condition: Some(SetCondition::Xx),
        get: true,
        ttl: Some(TtlOption::Ex(100)),
    };
    assert_eq!(c.set(&ctx, "k", "v3".into(), Some(xx_get))?, Value::from("v1"));
    assert_eq!(c.get(&ctx, "k")?, Value::from("v3"));
    assert!(c.ttl(&ctx, "k")? > 0);

    let keep = SetOption {
        ttl: Some(TtlOption::KeepTtl),
        ..Default::default()
    };
    c.set(&ctx, "k", "v4".into(), Some(keep))?;
    assert!(c.ttl(&ctx, "k")? > 0);
    c.set(&ctx, "k", "v5".into(), None)?;
    assert_eq!(c.ttl(&ctx, "k")?, -1);

    assert!(c.set_nx(&ctx, "fresh", "x".into())?);
    assert!(!c.set_nx(&ctx, "fresh", "y".into())?);
    assert!(c.set_ex(&ctx, "bad", "x".into(), 0).is_err());
    Ok(())
}

#[test]
fn string_reads_and_edits() -> Result<()> {
    let ctx = Context::background();
    let c = client();

    assert_eq!(c.append(&ctx, "s", "Hello")?, 5);
    assert_eq!(c.append(&ctx, "s", " World")?, 11);
    assert_eq!(c.strlen(&ctx, "s")?, 11);
    assert_eq!(c.get_range(&ctx, "s", 0, 4)?, "Hello");
    assert_eq!(c.get_range(&ctx, "s", -5, -1)?, "World");
    assert_eq!(c.set_range(&ctx, "s", 6, "Redis")?, 11);
    assert_eq!(c.get(&ctx, "s")?, Value::from("Hello Redis"));
    assert_eq!(c.set_range(&ctx, "padded", 2, "x")?, 3);
    assert_eq!(c.get(&ctx, "padded")?.as_bytes()?, b"\0\0x".to_vec());

    assert_eq!(c.get_set(&ctx, "s", "new".into())?, Value::from("Hello Redis"));
    assert_eq!(c.get_del(&ctx, "s")?, Value::from("new"));
    assert_eq!(c.get(&ctx, "s")?, Value::Nil);

    c.set(&ctx, "e", "v".into(), None)?;
    c.get_ex(&ctx, "e", Some(GetExOption::Ttl(TtlOption::Px(60_000))))?;
    assert!(c.pttl(&ctx, "e")? > 0);
    c.get_ex(&ctx, "e", Some(GetExOption::Persist))?;
    assert_eq!(c.pttl(&ctx, "e")?, -1);
    Ok(())
}

#[test]
fn set_range_limits() -> Result<()> {
    let ctx = Context::background();
    let c = client();

    // an empty write never pads or creates
    c.set(&ctx, "k", "ab".into(), None)?;
    assert_eq!(c.set_range(&ctx, "k", 10, "")?, 2);
    assert_eq!(c.get(&ctx, "k")?, Value::from("ab"));
    assert_eq!(c.set_range(&ctx, "absent", 10, "")?, 0);
    assert_eq!(c.exists(&ctx, &["absent"])?, 0);

    // oversized results are refused before allocating
    for offset in [i64::MAX, 512 * 1024 * 1024] {
        match c.set_range(&ctx, "k", offset, "x") {
            Err(KvError::Store(msg)) => assert_eq!(msg, "ERR string exceeds maximum allowed size"),
            other => panic!("unexpected result {:?}", other),
        }
    }
    assert!(matches!(c.set_range(&ctx, "k", -1, "x"), Err(KvError::Store(_))));
    assert_eq!(c.get(&ctx, "k")?, Value::from("ab"));
    Ok(())
}

#[test]
fn counters() -> Result<()> {
    let ctx = Context::background();
    let c = client();

    assert_eq!(c.incr(&ctx, "n")?, 1);
    assert_eq!(c.incr_by(&ctx, "n", 9)?, 10);
    assert_eq!(c.decr(&ctx, "n")?, 9);
    assert_eq!(c.decr_by(&ctx, "n", 4)?, 5);
    assert_eq!(c.incr_by_float(&ctx, "n", 0.5)?, 5.5);
    assert!(c.incr(&ctx, "n").is_err());

    c.set(&ctx, "max", i64::MAX.into(), None)?;
    assert!(c.incr(&ctx, "max").is_err());
    c.set(&ctx, "text", "abc".into(), None)?;
    assert!(matches!(c.incr(&ctx, "text"), Err(KvError::Store(_))));
    Ok(())
}

#[test]
fn multi_key_strings() -> Result<()> {
    let ctx = Context::background();
    let c = client();

    let mut pairs = HashMap::new();
    pairs.insert("a".to_owned(), Value::from(1));
    pairs.insert("b".to_owned(), Value::from("two"));
    c.mset(&ctx, pairs)?;

    let values = c.mget(&ctx, &["a", "b", "c"])?;
    assert_eq!(values["a"], Value::from("1"));
    assert_eq!(values["b"], Value::from("two"));
    assert_eq!(values["c"], Value::Nil);

    let mut clash = HashMap::new();
    clash.insert("a".to_owned(), Value::from(5));
    clash.insert("z".to_owned(), Value::from(5));
    assert!(!c.mset_nx(&ctx, clash)?);
    assert_eq!(c.get(&ctx, "z")?, Value::Nil);
    Ok(())
}

#[test]
fn hashes() -> Result<()> {
    let ctx = Context::background();
    let c = client();

    let mut fields = HashMap::new();
    fields.insert("name".to_owned(), Value::from("john"));
    fields.insert("age".to_owned(), Value::from(30));
    assert_eq!(c.hset(&ctx, "user", fields)?, 2);
    assert_eq!(c.hset_nx(&ctx, "user", "name", "jane".into())?, 0);
    assert_eq!(c.hset_nx(&ctx, "user", "city", "oslo".into())?, 1);

    assert_eq!(c.hget(&ctx, "user", "name")?, Value::from("john"));
    assert_eq!(c.hget(&ctx, "user", "missing")?, Value::Nil);
    assert_eq!(c.hstrlen(&ctx, "user", "name")?, 4);
    assert_eq!(c.hexists(&ctx, "user", "age")?, 1);
    assert_eq!(c.hlen(&ctx, "user")?, 3);
    assert_eq!(c.hincr_by(&ctx, "user", "age", 2)?, 32);
    assert_eq!(c.hincr_by_float(&ctx, "user", "score", 1.5)?, 1.5);
    assert!(c.hincr_by(&ctx, "user", "name", 1).is_err());

    assert_eq!(
        c.hmget(&ctx, "user", &["name", "nope"])?,
        vec![Value::from("john"), Value::Nil]
    );
    assert_eq!(
        sorted(c.hkeys(&ctx, "user")?),
        vec!["age", "city", "name", "score"]
    );
    assert_eq!(c.hvals(&ctx, "user")?.len(), 4);

    let all = c.hgetall(&ctx, "user")?.into_map()?;
    assert_eq!(all["city"], Value::from("oslo"));

    assert_eq!(c.hdel(&ctx, "user", &["age", "city", "name", "score"])?, 4);
    assert_eq!(c.exists(&ctx, &["user"])?, 0);
    Ok(())
}

#[test]
fn lists() -> Result<()> {
    let ctx = Context::background();
    let c = client();

    assert_eq!(c.rpush(&ctx, "l", vec!["a".into(), "b".into(), "c".into()])?, 3);
    assert_eq!(c.lpush(&ctx, "l", vec!["z".into()])?, 4);
    assert_eq!(c.lpush_x(&ctx, "missing", vec!["x".into()])?, 0);
    assert_eq!(c.rpush_x(&ctx, "l", vec!["d".into()])?, 5);
    assert_eq!(strings(c.lrange(&ctx, "l", 0, -1)?)?, vec!["z", "a", "b", "c", "d"]);

    assert_eq!(c.lindex(&ctx, "l", -1)?, Value::from("d"));
    assert_eq!(c.lindex(&ctx, "l", 10)?, Value::Nil);
    assert_eq!(c.linsert(&ctx, "l", LInsertOp::Before, "b".into(), "x".into())?, 6);
    assert_eq!(c.linsert(&ctx, "l", LInsertOp::After, "nope".into(), "x".into())?, -1);
    assert_eq!(c.lset(&ctx, "l", 0, "first".into())?, Value::from("OK"));
    assert!(c.lset(&ctx, "l", 99, "x".into()).is_err());

    assert_eq!(c.lpop(&ctx, "l", None)?, Value::from("first"));
    assert_eq!(strings(c.rpop(&ctx, "l", Some(2))?.into_array()?)?, vec!["d", "c"]);
    assert_eq!(c.llen(&ctx, "l")?, 3);

    c.rpush(&ctx, "r", vec!["a".into(), "b".into(), "a".into(), "a".into()])?;
    assert_eq!(c.lrem(&ctx, "r", -2, "a".into())?, 2);
    assert_eq!(strings(c.lrange(&ctx, "r", 0, -1)?)?, vec!["a", "b"]);
    c.ltrim(&ctx, "r", 1, 1)?;
    assert_eq!(strings(c.lrange(&ctx, "r", 0, -1)?)?, vec!["b"]);

    assert_eq!(c.rpoplpush(&ctx, "r", "dst")?, Value::from("b"));
    assert_eq!(c.exists(&ctx, &["r"])?, 0);
    assert_eq!(c.lpop(&ctx, "dst", None)?, Value::from("b"));
    assert_eq!(c.lpop(&ctx, "dst", None)?, Value::Nil);
    Ok(())
}

#[test]
fn blocking_pops() -> Result<()> {
    let ctx = Context::background();
    let c = Arc::new(client());

    // ready data returns immediately
    c.rpush(&ctx, "ready", vec!["x".into()])?;
    assert_eq!(strings(c.blpop(&ctx, 1, &["empty", "ready"])?)?, vec!["ready", "x"]);

    // a push from another thread wakes the waiter
    let pusher = {
        let c = c.clone();
        thread::spawn(move || -> Result<()> {
            thread::sleep(Duration::from_millis(50));
            c.rpush(&Context::background(), "queue", vec!["job".into()])?;
            Ok(())
        })
    };
    assert_eq!(strings(c.brpop(&ctx, 5, &["queue"])?)?, vec!["queue", "job"]);
    pusher.join().expect("pusher panicked")?;

    // timeouts yield nothing
    assert!(c.blpop(&ctx, 1, &["never"])?.is_empty());
    assert_eq!(c.brpoplpush(&ctx, "never", "dst", 1)?, Value::Nil);

    // the context bounds an infinite wait
    let short = ctx.with_timeout(Duration::from_millis(50));
    assert!(matches!(c.blpop(&short, 0, &["never"]), Err(KvError::DeadlineExceeded)));
    Ok(())
}

#[test]
fn blocking_pops_with_huge_timeouts() -> Result<()> {
    let ctx = Context::background();
    let c = client();

    c.rpush(&ctx, "ready", vec!["x".into()])?;
    assert_eq!(strings(c.blpop(&ctx, i64::MAX, &["ready"])?)?, vec!["ready", "x"]);

    let short = ctx.with_timeout(Duration::from_millis(50));
    assert!(matches!(c.brpop(&short, i64::MAX, &["never"]), Err(KvError::DeadlineExceeded)));
    let short = ctx.with_timeout(Duration::from_millis(50));
    assert!(matches!(
        c.brpoplpush(&short, "never", "dst", i64::MAX),
        Err(KvError::DeadlineExceeded)
    ));

    let unbounded = ctx.with_timeout(Duration::MAX);
    assert!(unbounded.deadline().is_none());
    c.rpush(&ctx, "later", vec!["y".into()])?;
    assert_eq!(strings(c.brpop(&unbounded, 0, &["later"])?)?, vec!["later", "y"]);
    Ok(())
}

#[test]
fn sets() -> Result<()> {
    let ctx = Context::background();
    let c = client();

    assert_eq!(c.sadd(&ctx, "a", vec!["1".into(), "2".into(), "3".into(), "3".into()])?, 3);
    assert_eq!(c.sadd(&ctx, "b", vec!["2".into(), "3".into(), "4".into()])?, 3);
    assert_eq!(c.sismember(&ctx, "a", "1".into())?, 1);
    assert_eq!(c.smismember(&ctx, "a", vec!["1".into(), "9".into()])?, vec![1, 0]);
    assert_eq!(c.scard(&ctx, "a")?, 3);

    assert_eq!(sorted(strings(c.sinter(&ctx, &["a", "b"])?)?), vec!["2", "3"]);
    assert_eq!(sorted(strings(c.sunion(&ctx, &["a", "b"])?)?), vec!["1", "2", "3", "4"]);
    assert_eq!(sorted(strings(c.sdiff(&ctx, &["a", "b"])?)?), vec!["1"]);
    assert_eq!(c.sinter_store(&ctx, "i", &["a", "b"])?, 2);
    assert_eq!(c.sunion_store(&ctx, "u", &["a", "b"])?, 4);
    assert_eq!(c.sdiff_store(&ctx, "d", &["a", "b"])?, 1);
    assert_eq!(sorted(strings(c.smembers(&ctx, "d")?)?), vec!["1"]);

    assert_eq!(c.smove(&ctx, "a", "b", "1".into())?, 1);
    assert_eq!(c.smove(&ctx, "a", "b", "1".into())?, 0);
    assert_eq!(c.srem(&ctx, "b", vec!["1".into(), "9".into()])?, 1);

    let popped = c.spop(&ctx, "u", Some(2))?.into_array()?;
    assert_eq!(popped.len(), 2);
    assert_eq!(c.scard(&ctx, "u")?, 2);
    assert!(!c.srandmember(&ctx, "u", None)?.is_nil());
    assert_eq!(c.srandmember(&ctx, "u", Some(10))?.into_array()?.len(), 2);
    assert_eq!(c.srandmember(&ctx, "u", Some(-5))?.into_array()?.len(), 5);
    assert_eq!(c.spop(&ctx, "missing", None)?, Value::Nil);
    Ok(())
}

#[test]
fn sorted_sets() -> Result<()> {
    let ctx = Context::background();
    let c = client();
    let members = vec![
        ZAddMember::new(1.0, "one"),
        ZAddMember::new(2.0, "two"),
        ZAddMember::new(3.0, "three"),
    ];
    assert_eq!(c.zadd(&ctx, "z", None, members)?, Value::Int(3));
    assert_eq!(c.zcard(&ctx, "z")?, 3);
    assert_eq!(c.zscore(&ctx, "z", "two".into())?, 2.0);
    assert_eq!(c.zincr_by(&ctx, "z", 2.5, "one".into())?, 3.5);
    assert_eq!(c.zrank(&ctx, "z", "two".into())?, 0);
    assert_eq!(c.zrev_rank(&ctx, "z", "two".into())?, 2);
    assert_eq!(c.zrank(&ctx, "z", "zero".into())?, -1);

    assert_eq!(strings(c.zrange(&ctx, "z", "0", "-1", None)?)?, vec!["two", "three", "one"]);
    let by_score = ZRangeOption {
        by_score: true,
        with_scores: true,
        ..Default::default()
    };
    assert_eq!(
        c.zrange(&ctx, "z", "(2", "+inf", Some(by_score))?,
        vec![Value::from("three"), Value::Float(3.0), Value::from("one"), Value::Float(3.5)]
    );
    let rev_limited = ZRangeOption {
        by_score: true,
        rev: true,
        limit: Some(ZRangeLimit { offset: 0, count: 1 }),
        ..Default::default()
    };
    assert_eq!(strings(c.zrange(&ctx, "z", "+inf", "-inf", Some(rev_limited))?)?, vec!["one"]);
    assert_eq!(
        strings(c.zrev_range(&ctx, "z", 0, 1, None)?.into_array()?)?,
        vec!["one", "three"]
    );
    assert_eq!(c.zcount(&ctx, "z", "2", "3")?, 2);

    let gt = ZAddOption {
        gt: true,
        ch: true,
        ..Default::default()
    };
    let updates = vec![ZAddMember::new(1.0, "two"), ZAddMember::new(10.0, "three")];
    assert_eq!(c.zadd(&ctx, "z", Some(gt), updates)?, Value::Int(1));
    let both = ZAddOption {
        nx: true,
        xx: true,
        ..Default::default()
    };
    assert!(c.zadd(&ctx, "z", Some(both), vec![ZAddMember::new(1.0, "x")]).is_err());

    assert_eq!(c.zrem(&ctx, "z", vec!["two".into(), "nope".into()])?, 1);
    assert_eq!(c.zrem_range_by_score(&ctx, "z", "-inf", "(10")?, 1);
    assert_eq!(c.zrem_range_by_rank(&ctx, "z", 0, -1)?, 1);
    assert_eq!(c.exists(&ctx, &["z"])?, 0);

    let lex = ["a", "b", "c", "d"].iter().map(|m| ZAddMember::new(0.0, *m)).collect();
    c.zadd(&ctx, "lex", None, lex)?;
    assert_eq!(c.zlex_count(&ctx, "lex", "[b", "+")?, 3);
    assert_eq!(c.zrem_range_by_lex(&ctx, "lex", "-", "(c")?, 2);
    assert_eq!(strings(c.zrange(&ctx, "lex", "0", "-1", None)?)?, vec!["c", "d"]);
    Ok(())
}

#[test]
fn key_space() -> Result<()> {
    let ctx = Context::background();
    let c = client();

    c.set(&ctx, "user:1", "a".into(), None)?;
    c.set(&ctx, "user:2", "b".into(), None)?;
    c.set(&ctx, "other", "c".into(), None)?;
    assert_eq!(c.keys(&ctx, "user:*")?, vec!["user:1", "user:2"]);
    assert_eq!(c.db_size(&ctx)?, 3);
    assert_eq!(c.key_type(&ctx, "missing")?, "none");
    assert!(c.random_key(&ctx)?.is_some());

    assert_eq!(c.copy(&ctx, "user:1", "copy", None)?, 1);
    assert_eq!(c.copy(&ctx, "user:2", "copy", None)?, 0);
    let replace = CopyOption {
        replace: true,
        ..Default::default()
    };
    assert_eq!(c.copy(&ctx, "user:2", "copy", Some(replace))?, 1);
    assert_eq!(c.get(&ctx, "copy")?, Value::from("b"));

    c.rename(&ctx, "copy", "renamed")?;
    assert!(c.rename(&ctx, "copy", "x").is_err());
    assert_eq!(c.rename_nx(&ctx, "renamed", "other")?, 0);
    assert_eq!(c.unlink(&ctx, &["renamed"])?, 1);
    assert_eq!(c.del(&ctx, &["user:1", "user:2", "nope"])?, 2);

    assert_eq!(c.move_key(&ctx, "other", 1)?, 1);
    assert_eq!(c.exists(&ctx, &["other"])?, 0);
    assert!(c.move_key(&ctx, "other", 0).is_err());

    c.set(&ctx, "k", "v".into(), None)?;
    c.flush_db(&ctx, Some(FlushOp::Sync))?;
    assert_eq!(c.db_size(&ctx)?, 0);
    c.set(&ctx, "k", "v".into(), None)?;
    c.flush_all(&ctx, None)?;
    assert_eq!(c.db_size(&ctx)?, 0);
    Ok(())
}

#[test]
fn keys_with_many_wildcards() -> Result<()> {
    let ctx = Context::background();
    let c = client();

    c.set(&ctx, &"a".repeat(40), "v".into(), None)?;
    let start = std::time::Instant::now();
    assert!(c.keys(&ctx, "*a*a*a*a*a*a*a*b")?.is_empty());
    assert_eq!(c.keys(&ctx, "*a*a*a*a*a*a*a*")?.len(), 1);
    let (mut conn, _) = c.psubscribe(&ctx, &["*a*a*a*a*a*a*a*b"])?;
    assert_eq!(c.publish(&ctx, &"a".repeat(40), "m".into())?, 0);
    assert!(start.elapsed() < Duration::from_secs(1));
    conn.close(&ctx)?;
    Ok(())
}

#[test]
fn databases_are_isolated() -> Result<()> {
    let ctx = Context::background();
    let zero = MemoryAdapter::new();
    let one = zero.select(1)?;
    assert_eq!(one.db(), 1);
    assert!(zero.select(16).is_err());

    zero.set(&ctx, "k", "zero".into(), None)?;
    assert_eq!(one.get(&ctx, "k")?, Value::Nil);
    zero.move_key(&ctx, "k", 1)?;
    assert_eq!(one.get(&ctx, "k")?, Value::from("zero"));

    let to_zero = CopyOption {
        db: Some(0),
        replace: false,
    };
    assert_eq!(one.copy(&ctx, "k", "k", Some(to_zero))?, 1);
    assert_eq!(zero.get(&ctx, "k")?, Value::from("zero"));

    one.flush_all(&ctx, None)?;
    assert_eq!(zero.db_size(&ctx)?, 0);
    Ok(())
}

#[test]
fn expiry() -> Result<()> {
    let ctx = Context::background();
    let c = client();

    c.set(&ctx, "k", "v".into(), None)?;
    assert_eq!(c.ttl(&ctx, "k")?, -1);
    assert_eq!(c.ttl(&ctx, "missing")?, -2);
    assert_eq!(c.expire_time(&ctx, "k")?, Value::Int(-1));

    assert_eq!(c.expire(&ctx, "k", 100, Some(ExpireOption::Xx))?, 0);
    assert_eq!(c.expire(&ctx, "k", 100, Some(ExpireOption::Nx))?, 1);
    assert_eq!(c.expire(&ctx, "k", 50, Some(ExpireOption::Gt))?, 0);
    assert_eq!(c.expire(&ctx, "k", 50, Some(ExpireOption::Lt))?, 1);
    let ttl = c.ttl(&ctx, "k")?;
    assert!(ttl > 0 && ttl <= 50);
    assert!(c.expire_time(&ctx, "k")?.as_i64()? > 0);

    assert_eq!(c.persist(&ctx, "k")?, 1);
    assert_eq!(c.persist(&ctx, "k")?, 0);

    let later = SystemTime::now() + Duration::from_secs(3600);
    assert_eq!(c.expire_at(&ctx, "k", later, None)?, 1);
    assert_eq!(c.pexpire_at(&ctx, "k", later, None)?, 1);
    assert!(c.pexpire_time(&ctx, "k")?.as_i64()? > 0);

    assert_eq!(c.pexpire(&ctx, "k", 30, None)?, 1);
    thread::sleep(Duration::from_millis(60));
    assert_eq!(c.get(&ctx, "k")?, Value::Nil);
    assert_eq!(c.pttl(&ctx, "k")?, -2);

    c.set(&ctx, "gone", "v".into(), None)?;
    assert_eq!(c.expire(&ctx, "gone", -1, None)?, 1);
    assert_eq!(c.exists(&ctx, &["gone"])?, 0);
    Ok(())
}

#[test]
fn wrong_type_and_scripting_errors() -> Result<()> {
    let ctx = Context::background();
    let c = client();

    c.lpush(&ctx, "list", vec!["a".into()])?;
    for result in [
        c.get(&ctx, "list").map(|_| ()),
        c.hget(&ctx, "list", "f").map(|_| ()),
        c.sadd(&ctx, "list", vec!["x".into()]).map(|_| ()),
        c.zcard(&ctx, "list").map(|_| ()),
    ] {
        assert!(matches!(result, Err(KvError::Store(msg)) if msg.starts_with("WRONGTYPE")));
    }

    assert!(matches!(c.eval(&ctx, "return 1", &[], vec![]), Err(KvError::Unsupported(_))));
    assert!(matches!(c.script_load(&ctx, "return 1"), Err(KvError::Unsupported(_))));
    assert!(matches!(c.script_flush(&ctx, None), Err(KvError::Unsupported(_))));
    Ok(())
}
