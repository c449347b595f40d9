use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

use log::debug;
use parking_lot::RwLock;

use crate::adapters::{Adapter, Conn};
use crate::groups::*;
use crate::{Config, Context, Registry, Result, Value};

/// Command-group handles derived from one adapter.
struct Groups {
    generic: Arc<dyn GroupGeneric>,
    hash: Arc<dyn GroupHash>,
    list: Arc<dyn GroupList>,
    pubsub: Arc<dyn GroupPubSub>,
    script: Arc<dyn GroupScript>,
    set: Arc<dyn GroupSet>,
    sorted_set: Arc<dyn GroupSortedSet>,
    string: Arc<dyn GroupString>,
}

impl Groups {
    fn derive(adapter: &dyn Adapter) -> Self {
        Groups {
            generic: adapter.group_generic(),
            hash: adapter.group_hash(),
            list: adapter.group_list(),
            pubsub: adapter.group_pubsub(),
            script: adapter.group_script(),
            set: adapter.group_set(),
            sorted_set: adapter.group_sorted_set(),
            string: adapter.group_string(),
        }
    }
}

/// The adapter and the group handles derived from it, swapped as a unit.
struct Bound {
    adapter: Arc<dyn Adapter>,
    groups: Groups,
}

impl Bound {
    fn new(adapter: Arc<dyn Adapter>) -> Self {
        let groups = Groups::derive(adapter.as_ref());
        Bound { adapter, groups }
    }
}

/// The client of a key-value store.
///
/// Every operation forwards to the current adapter; the client itself does
/// no I/O. It implements all command-group traits, so `client.get(..)`,
/// `client.hset(..)` and friends work directly.
pub struct Client {
    config: Option<Config>,
    bound: RwLock<Bound>,
}

impl Client {
    /// Creates a client from `config`, or from the default group's
    /// configuration of the global registry when `None`.
    ///
    /// # Errors
    ///
    /// [`KvError::MissingConfiguration`](crate::KvError::MissingConfiguration)
    /// if no configuration resolves, and
    /// [`KvError::MissingAdapter`](crate::KvError::MissingAdapter) if the
    /// registered adapter factory produces no adapter.
    pub fn new(config: Option<&Config>) -> Result<Self> {
        Registry::global().new_client(config)
    }

    /// Creates a client around an already built adapter.
    ///
    /// No configuration is consulted.
    pub fn with_adapter(adapter: Arc<dyn Adapter>) -> Self {
        Client {
            config: None,
            bound: RwLock::new(Bound::new(adapter)),
        }
    }

    pub(crate) fn with_config(config: Config, adapter: Arc<dyn Adapter>) -> Self {
        Client {
            config: Some(config),
            bound: RwLock::new(Bound::new(adapter)),
        }
    }

    /// The configuration this client was built from, if any.
    pub fn config(&self) -> Option<&Config> {
        self.config.as_ref()
    }

    /// Replaces the underlying adapter.
    ///
    /// Group handles are re-derived from `adapter` before the swap, so no
    /// caller ever observes a mix of old and new handles.
    pub fn set_adapter(&self, adapter: Arc<dyn Adapter>) {
        let bound = Bound::new(adapter);
        *self.bound.write() = bound;
        debug!("client adapter replaced");
    }

    /// Returns the current adapter.
    pub fn adapter(&self) -> Arc<dyn Adapter> {
        self.bound.read().adapter.clone()
    }

    /// Handle for key-space operations.
    pub fn group_generic(&self) -> Arc<dyn GroupGeneric> {
        self.bound.read().groups.generic.clone()
    }

    /// Handle for hash operations.
    pub fn group_hash(&self) -> Arc<dyn GroupHash> {
        self.bound.read().groups.hash.clone()
    }

    /// Handle for list operations.
    pub fn group_list(&self) -> Arc<dyn GroupList> {
        self.bound.read().groups.list.clone()
    }

    /// Handle for publish/subscribe operations.
    pub fn group_pubsub(&self) -> Arc<dyn GroupPubSub> {
        self.bound.read().groups.pubsub.clone()
    }

    /// Handle for scripting operations.
    pub fn group_script(&self) -> Arc<dyn GroupScript> {
        self.bound.read().groups.script.clone()
    }

    /// Handle for set operations.
    pub fn group_set(&self) -> Arc<dyn GroupSet> {
        self.bound.read().groups.set.clone()
    }

    /// Handle for sorted set operations.
    pub fn group_sorted_set(&self) -> Arc<dyn GroupSortedSet> {
        self.bound.read().groups.sorted_set.clone()
    }

    /// Handle for string operations.
    pub fn group_string(&self) -> Arc<dyn GroupString> {
        self.bound.read().groups.string.clone()
    }

    /// Sends `command` with `args` to the store and returns the reply.
    ///
    /// Sequence and mapping arguments are rendered as JSON text first.
    pub fn execute(&self, ctx: &Context, command: &str, args: Vec<Value>) -> Result<Value> {
        let args = normalize_args(args)?;
        self.adapter().do_command(ctx, command, args)
    }

    /// Retrieves a dedicated connection. The caller must close it.
    pub fn conn(&self, ctx: &Context) -> Result<Box<dyn Conn>> {
        self.adapter().conn(ctx)
    }

    /// Closes the adapter and releases its resources.
    pub fn close(&self, ctx: &Context) -> Result<()> {
        self.adapter().close(ctx)
    }

    /// Like [`Client::conn`], but panics on error.
    pub fn must_conn(&self, ctx: &Context) -> Box<dyn Conn> {
        match self.conn(ctx) {
            Ok(conn) => conn,
            Err(e) => panic!("{}", e),
        }
    }

    /// Like [`Client::execute`], but panics on error.
    pub fn must_execute(&self, ctx: &Context, command: &str, args: Vec<Value>) -> Value {
        match self.execute(ctx, command, args) {
            Ok(value) => value,
            Err(e) => panic!("{}", e),
        }
    }
}

fn normalize_args(args: Vec<Value>) -> Result<Vec<Value>> {
    args.into_iter()
        .map(|arg| match arg {
            Value::Array(_) | Value::Map(_) => Ok(Value::Str(arg.to_json()?)),
            scalar => Ok(scalar),
        })
        .collect()
}

impl GroupGeneric for Client {
    fn copy(&self, ctx: &Context, source: &str, destination: &str, option: Option<CopyOption>) -> Result<i64> {
        self.group_generic().copy(ctx, source, destination, option)
    }

    fn exists(&self, ctx: &Context, keys: &[&str]) -> Result<i64> {
        self.group_generic().exists(ctx, keys)
    }

    fn key_type(&self, ctx: &Context, key: &str) -> Result<String> {
        self.group_generic().key_type(ctx, key)
    }

    fn unlink(&self, ctx: &Context, keys: &[&str]) -> Result<i64> {
        self.group_generic().unlink(ctx, keys)
    }

    fn rename(&self, ctx: &Context, key: &str, new_key: &str) -> Result<()> {
        self.group_generic().rename(ctx, key, new_key)
    }

    fn rename_nx(&self, ctx: &Context, key: &str, new_key: &str) -> Result<i64> {
        self.group_generic().rename_nx(ctx, key, new_key)
    }

    fn move_key(&self, ctx: &Context, key: &str, db: u32) -> Result<i64> {
        self.group_generic().move_key(ctx, key, db)
    }

    fn del(&self, ctx: &Context, keys: &[&str]) -> Result<i64> {
        self.group_generic().del(ctx, keys)
    }

    fn random_key(&self, ctx: &Context) -> Result<Option<String>> {
        self.group_generic().random_key(ctx)
    }

    fn db_size(&self, ctx: &Context) -> Result<i64> {
        self.group_generic().db_size(ctx)
    }

    fn keys(&self, ctx: &Context, pattern: &str) -> Result<Vec<String>> {
        self.group_generic().keys(ctx, pattern)
    }

    fn flush_db(&self, ctx: &Context, option: Option<FlushOp>) -> Result<()> {
        self.group_generic().flush_db(ctx, option)
    }

    fn flush_all(&self, ctx: &Context, option: Option<FlushOp>) -> Result<()> {
        self.group_generic().flush_all(ctx, option)
    }

    fn expire(&self, ctx: &Context, key: &str, seconds: i64, option: Option<ExpireOption>) -> Result<i64> {
        self.group_generic().expire(ctx, key, seconds, option)
    }

    fn expire_at(&self, ctx: &Context, key: &str, time: SystemTime, option: Option<ExpireOption>) -> Result<i64> {
        self.group_generic().expire_at(ctx, key, time, option)
    }

    fn expire_time(&self, ctx: &Context, key: &str) -> Result<Value> {
        self.group_generic().expire_time(ctx, key)
    }

    fn ttl(&self, ctx: &Context, key: &str) -> Result<i64> {
        self.group_generic().ttl(ctx, key)
    }

    fn persist(&self, ctx: &Context, key: &str) -> Result<i64> {
        self.group_generic().persist(ctx, key)
    }

    fn pexpire(&self, ctx: &Context, key: &str, milliseconds: i64, option: Option<ExpireOption>) -> Result<i64> {
        self.group_generic().pexpire(ctx, key, milliseconds, option)
    }

    fn pexpire_at(&self, ctx: &Context, key: &str, time: SystemTime, option: Option<ExpireOption>) -> Result<i64> {
        self.group_generic().pexpire_at(ctx, key, time, option)
    }

    fn pexpire_time(&self, ctx: &Context, key: &str) -> Result<Value> {
        self.group_generic().pexpire_time(ctx, key)
    }

    fn pttl(&self, ctx: &Context, key: &str) -> Result<i64> {
        self.group_generic().pttl(ctx, key)
    }
}

impl GroupHash for Client {
    fn hset(&self, ctx: &Context, key: &str, fields: HashMap<String, Value>) -> Result<i64> {
        self.group_hash().hset(ctx, key, fields)
    }

    fn hset_nx(&self, ctx: &Context, key: &str, field: &str, value: Value) -> Result<i64> {
        self.group_hash().hset_nx(ctx, key, field, value)
    }

    fn hget(&self, ctx: &Context, key: &str, field: &str) -> Result<Value> {
        self.group_hash().hget(ctx, key, field)
    }

    fn hstrlen(&self, ctx: &Context, key: &str, field: &str) -> Result<i64> {
        self.group_hash().hstrlen(ctx, key, field)
    }

    fn hexists(&self, ctx: &Context, key: &str, field: &str) -> Result<i64> {
        self.group_hash().hexists(ctx, key, field)
    }

    fn hdel(&self, ctx: &Context, key: &str, fields: &[&str]) -> Result<i64> {
        self.group_hash().hdel(ctx, key, fields)
    }

    fn hlen(&self, ctx: &Context, key: &str) -> Result<i64> {
        self.group_hash().hlen(ctx, key)
    }

    fn hincr_by(&self, ctx: &Context, key: &str, field: &str, increment: i64) -> Result<i64> {
        self.group_hash().hincr_by(ctx, key, field, increment)
    }

    fn hincr_by_float(&self, ctx: &Context, key: &str, field: &str, increment: f64) -> Result<f64> {
        self.group_hash().hincr_by_float(ctx, key, field, increment)
    }

    fn hmset(&self, ctx: &Context, key: &str, fields: HashMap<String, Value>) -> Result<()> {
        self.group_hash().hmset(ctx, key, fields)
    }

    fn hmget(&self, ctx: &Context, key: &str, fields: &[&str]) -> Result<Vec<Value>> {
        self.group_hash().hmget(ctx, key, fields)
    }

    fn hkeys(&self, ctx: &Context, key: &str) -> Result<Vec<String>> {
        self.group_hash().hkeys(ctx, key)
    }

    fn hvals(&self, ctx: &Context, key: &str) -> Result<Vec<Value>> {
        self.group_hash().hvals(ctx, key)
    }

    fn hgetall(&self, ctx: &Context, key: &str) -> Result<Value> {
        self.group_hash().hgetall(ctx, key)
    }
}

impl GroupList for Client {
    fn lpush(&self, ctx: &Context, key: &str, values: Vec<Value>) -> Result<i64> {
        self.group_list().lpush(ctx, key, values)
    }

    fn lpush_x(&self, ctx: &Context, key: &str, values: Vec<Value>) -> Result<i64> {
        self.group_list().lpush_x(ctx, key, values)
    }

    fn rpush(&self, ctx: &Context, key: &str, values: Vec<Value>) -> Result<i64> {
        self.group_list().rpush(ctx, key, values)
    }

    fn rpush_x(&self, ctx: &Context, key: &str, values: Vec<Value>) -> Result<i64> {
        self.group_list().rpush_x(ctx, key, values)
    }

    fn lpop(&self, ctx: &Context, key: &str, count: Option<usize>) -> Result<Value> {
        self.group_list().lpop(ctx, key, count)
    }

    fn rpop(&self, ctx: &Context, key: &str, count: Option<usize>) -> Result<Value> {
        self.group_list().rpop(ctx, key, count)
    }

    fn lrem(&self, ctx: &Context, key: &str, count: i64, value: Value) -> Result<i64> {
        self.group_list().lrem(ctx, key, count, value)
    }

    fn llen(&self, ctx: &Context, key: &str) -> Result<i64> {
        self.group_list().llen(ctx, key)
    }

    fn lindex(&self, ctx: &Context, key: &str, index: i64) -> Result<Value> {
        self.group_list().lindex(ctx, key, index)
    }

    fn linsert(&self, ctx: &Context, key: &str, op: LInsertOp, pivot: Value, value: Value) -> Result<i64> {
        self.group_list().linsert(ctx, key, op, pivot, value)
    }

    fn lset(&self, ctx: &Context, key: &str, index: i64, value: Value) -> Result<Value> {
        self.group_list().lset(ctx, key, index, value)
    }

    fn lrange(&self, ctx: &Context, key: &str, start: i64, stop: i64) -> Result<Vec<Value>> {
        self.group_list().lrange(ctx, key, start, stop)
    }

    fn ltrim(&self, ctx: &Context, key: &str, start: i64, stop: i64) -> Result<()> {
        self.group_list().ltrim(ctx, key, start, stop)
    }

    fn blpop(&self, ctx: &Context, timeout: i64, keys: &[&str]) -> Result<Vec<Value>> {
        self.group_list().blpop(ctx, timeout, keys)
    }

    fn brpop(&self, ctx: &Context, timeout: i64, keys: &[&str]) -> Result<Vec<Value>> {
        self.group_list().brpop(ctx, timeout, keys)
    }

    fn rpoplpush(&self, ctx: &Context, source: &str, destination: &str) -> Result<Value> {
        self.group_list().rpoplpush(ctx, source, destination)
    }

    fn brpoplpush(&self, ctx: &Context, source: &str, destination: &str, timeout: i64) -> Result<Value> {
        self.group_list().brpoplpush(ctx, source, destination, timeout)
    }
}

impl GroupPubSub for Client {
    fn publish(&self, ctx: &Context, channel: &str, message: Value) -> Result<i64> {
        self.group_pubsub().publish(ctx, channel, message)
    }

    fn subscribe(&self, ctx: &Context, channels: &[&str]) -> Result<(Box<dyn Conn>, Vec<Subscription>)> {
        self.group_pubsub().subscribe(ctx, channels)
    }

    fn psubscribe(&self, ctx: &Context, patterns: &[&str]) -> Result<(Box<dyn Conn>, Vec<Subscription>)> {
        self.group_pubsub().psubscribe(ctx, patterns)
    }
}

impl GroupScript for Client {
    fn eval(&self, ctx: &Context, script: &str, keys: &[&str], args: Vec<Value>) -> Result<Value> {
        self.group_script().eval(ctx, script, keys, args)
    }

    fn eval_sha(&self, ctx: &Context, sha1: &str, keys: &[&str], args: Vec<Value>) -> Result<Value> {
        self.group_script().eval_sha(ctx, sha1, keys, args)
    }

    fn script_load(&self, ctx: &Context, script: &str) -> Result<String> {
        self.group_script().script_load(ctx, script)
    }

    fn script_exists(&self, ctx: &Context, sha1s: &[&str]) -> Result<HashMap<String, bool>> {
        self.group_script().script_exists(ctx, sha1s)
    }

    fn script_flush(&self, ctx: &Context, option: Option<ScriptFlushOption>) -> Result<()> {
        self.group_script().script_flush(ctx, option)
    }

    fn script_kill(&self, ctx: &Context) -> Result<()> {
        self.group_script().script_kill(ctx)
    }
}

impl GroupSet for Client {
    fn sadd(&self, ctx: &Context, key: &str, members: Vec<Value>) -> Result<i64> {
        self.group_set().sadd(ctx, key, members)
    }

    fn sismember(&self, ctx: &Context, key: &str, member: Value) -> Result<i64> {
        self.group_set().sismember(ctx, key, member)
    }

    fn spop(&self, ctx: &Context, key: &str, count: Option<usize>) -> Result<Value> {
        self.group_set().spop(ctx, key, count)
    }

    fn srandmember(&self, ctx: &Context, key: &str, count: Option<i64>) -> Result<Value> {
        self.group_set().srandmember(ctx, key, count)
    }

    fn srem(&self, ctx: &Context, key: &str, members: Vec<Value>) -> Result<i64> {
        self.group_set().srem(ctx, key, members)
    }

    fn smove(&self, ctx: &Context, source: &str, destination: &str, member: Value) -> Result<i64> {
        self.group_set().smove(ctx, source, destination, member)
    }

    fn scard(&self, ctx: &Context, key: &str) -> Result<i64> {
        self.group_set().scard(ctx, key)
    }

    fn smembers(&self, ctx: &Context, key: &str) -> Result<Vec<Value>> {
        self.group_set().smembers(ctx, key)
    }

    fn smismember(&self, ctx: &Context, key: &str, members: Vec<Value>) -> Result<Vec<i64>> {
        self.group_set().smismember(ctx, key, members)
    }

    fn sinter(&self, ctx: &Context, keys: &[&str]) -> Result<Vec<Value>> {
        self.group_set().sinter(ctx, keys)
    }

    fn sinter_store(&self, ctx: &Context, destination: &str, keys: &[&str]) -> Result<i64> {
        self.group_set().sinter_store(ctx, destination, keys)
    }

    fn sunion(&self, ctx: &Context, keys: &[&str]) -> Result<Vec<Value>> {
        self.group_set().sunion(ctx, keys)
    }

    fn sunion_store(&self, ctx: &Context, destination: &str, keys: &[&str]) -> Result<i64> {
        self.group_set().sunion_store(ctx, destination, keys)
    }

    fn sdiff(&self, ctx: &Context, keys: &[&str]) -> Result<Vec<Value>> {
        self.group_set().sdiff(ctx, keys)
    }

    fn sdiff_store(&self, ctx: &Context, destination: &str, keys: &[&str]) -> Result<i64> {
        self.group_set().sdiff_store(ctx, destination, keys)
    }
}

impl GroupSortedSet for Client {
    fn zadd(&self, ctx: &Context, key: &str, option: Option<ZAddOption>, members: Vec<ZAddMember>) -> Result<Value> {
        self.group_sorted_set().zadd(ctx, key, option, members)
    }

    fn zscore(&self, ctx: &Context, key: &str, member: Value) -> Result<f64> {
        self.group_sorted_set().zscore(ctx, key, member)
    }

    fn zincr_by(&self, ctx: &Context, key: &str, increment: f64, member: Value) -> Result<f64> {
        self.group_sorted_set().zincr_by(ctx, key, increment, member)
    }

    fn zcard(&self, ctx: &Context, key: &str) -> Result<i64> {
        self.group_sorted_set().zcard(ctx, key)
    }

    fn zcount(&self, ctx: &Context, key: &str, min: &str, max: &str) -> Result<i64> {
        self.group_sorted_set().zcount(ctx, key, min, max)
    }

    fn zrange(&self, ctx: &Context, key: &str, start: &str, stop: &str, option: Option<ZRangeOption>) -> Result<Vec<Value>> {
        self.group_sorted_set().zrange(ctx, key, start, stop, option)
    }

    fn zrev_range(&self, ctx: &Context, key: &str, start: i64, stop: i64, option: Option<ZRevRangeOption>) -> Result<Value> {
        self.group_sorted_set().zrev_range(ctx, key, start, stop, option)
    }

    fn zrank(&self, ctx: &Context, key: &str, member: Value) -> Result<i64> {
        self.group_sorted_set().zrank(ctx, key, member)
    }

    fn zrev_rank(&self, ctx: &Context, key: &str, member: Value) -> Result<i64> {
        self.group_sorted_set().zrev_rank(ctx, key, member)
    }

    fn zrem(&self, ctx: &Context, key: &str, members: Vec<Value>) -> Result<i64> {
        self.group_sorted_set().zrem(ctx, key, members)
    }

    fn zrem_range_by_rank(&self, ctx: &Context, key: &str, start: i64, stop: i64) -> Result<i64> {
        self.group_sorted_set().zrem_range_by_rank(ctx, key, start, stop)
    }

    fn zrem_range_by_score(&self, ctx: &Context, key: &str, min: &str, max: &str) -> Result<i64> {
        self.group_sorted_set().zrem_range_by_score(ctx, key, min, max)
    }

    fn zrem_range_by_lex(&self, ctx: &Context, key: &str, min: &str, max: &str) -> Result<i64> {
        self.group_sorted_set().zrem_range_by_lex(ctx, key, min, max)
    }

    fn zlex_count(&self, ctx: &Context, key: &str, min: &str, max: &str) -> Result<i64> {
        self.group_sorted_set().zlex_count(ctx, key, min, max)
    }
}

impl GroupString for Client {
    fn set(&self, ctx: &Context, key: &str, value: Value, option: Option<SetOption>) -> Result<Value> {
        self.group_string().set(ctx, key, value, option)
    }

    fn set_nx(&self, ctx: &Context, key: &str, value: Value) -> Result<bool> {
        self.group_string().set_nx(ctx, key, value)
    }

    fn set_ex(&self, ctx: &Context, key: &str, value: Value, ttl_in_seconds: i64) -> Result<()> {
        self.group_string().set_ex(ctx, key, value, ttl_in_seconds)
    }

    fn get(&self, ctx: &Context, key: &str) -> Result<Value> {
        self.group_string().get(ctx, key)
    }

    fn get_del(&self, ctx: &Context, key: &str) -> Result<Value> {
        self.group_string().get_del(ctx, key)
    }

    fn get_ex(&self, ctx: &Context, key: &str, option: Option<GetExOption>) -> Result<Value> {
        self.group_string().get_ex(ctx, key, option)
    }

    fn get_set(&self, ctx: &Context, key: &str, value: Value) -> Result<Value> {
        self.group_string().get_set(ctx, key, value)
    }

    fn strlen(&self, ctx: &Context, key: &str) -> Result<i64> {
        self.group_string().strlen(ctx, key)
    }

    fn append(&self, ctx: &Context, key: &str, value: &str) -> Result<i64> {
        self.group_string().append(ctx, key, value)
    }

    fn set_range(&self, ctx: &Context, key: &str, offset: i64, value: &str) -> Result<i64> {
        self.group_string().set_range(ctx, key, offset, value)
    }

    fn get_range(&self, ctx: &Context, key: &str, start: i64, end: i64) -> Result<String> {
        self.group_string().get_range(ctx, key, start, end)
    }

    fn incr(&self, ctx: &Context, key: &str) -> Result<i64> {
        self.group_string().incr(ctx, key)
    }

    fn incr_by(&self, ctx: &Context, key: &str, increment: i64) -> Result<i64> {
        self.group_string().incr_by(ctx, key, increment)
    }

    fn incr_by_float(&self, ctx: &Context, key: &str, increment: f64) -> Result<f64> {
        self.group_string().incr_by_float(ctx, key, increment)
    }

    fn decr(&self, ctx: &Context, key: &str) -> Result<i64> {
        self.group_string().decr(ctx, key)
    }

    fn decr_by(&self, ctx: &Context, key: &str, decrement: i64) -> Result<i64> {
        self.group_string().decr_by(ctx, key, decrement)
    }

    fn mset(&self, ctx: &Context, key_values: HashMap<String, Value>) -> Result<()> {
        self.group_string().mset(ctx, key_values)
    }

    fn mset_nx(&self, ctx: &Context, key_values: HashMap<String, Value>) -> Result<bool> {
        self.group_string().mset_nx(ctx, key_values)
    }

    fn mget(&self, ctx: &Context, keys: &[&str]) -> Result<HashMap<String, Value>> {
        self.group_string().mget(ctx, keys)
    }
}
