use crate::{Context, Result, Value};

/// Set operations.
pub trait GroupSet: Send + Sync {
    /// Adds members, returning how many were new.
    fn sadd(&self, ctx: &Context, key: &str, members: Vec<Value>) -> Result<i64>;

    /// 1 if `member` belongs to the set, 0 otherwise.
    fn sismember(&self, ctx: &Context, key: &str, member: Value) -> Result<i64>;

    /// Removes and returns random members. Without `count` returns one member
    /// (or nil), with `count` returns a sequence.
    fn spop(&self, ctx: &Context, key: &str, count: Option<usize>) -> Result<Value>;

    /// Returns random members without removing them. A negative `count` may
    /// repeat members.
    fn srandmember(&self, ctx: &Context, key: &str, count: Option<i64>) -> Result<Value>;

    /// Removes members, returning how many were removed.
    fn srem(&self, ctx: &Context, key: &str, members: Vec<Value>) -> Result<i64>;

    /// Moves `member` from `source` to `destination`. 1 if moved.
    fn smove(&self, ctx: &Context, source: &str, destination: &str, member: Value) -> Result<i64>;

    /// Cardinality of the set.
    fn scard(&self, ctx: &Context, key: &str) -> Result<i64>;

    /// All members.
    fn smembers(&self, ctx: &Context, key: &str) -> Result<Vec<Value>>;

    /// Membership of each of `members`, 1 or 0, in order.
    fn smismember(&self, ctx: &Context, key: &str, members: Vec<Value>) -> Result<Vec<i64>>;

    /// Intersection of the sets at `keys`.
    fn sinter(&self, ctx: &Context, keys: &[&str]) -> Result<Vec<Value>>;

    /// Stores the intersection in `destination`, returning its size.
    fn sinter_store(&self, ctx: &Context, destination: &str, keys: &[&str]) -> Result<i64>;

    /// Union of the sets at `keys`.
    fn sunion(&self, ctx: &Context, keys: &[&str]) -> Result<Vec<Value>>;

    /// Stores the union in `destination`, returning its size.
    fn sunion_store(&self, ctx: &Context, destination: &str, keys: &[&str]) -> Result<i64>;

    /// Members of the first set missing from all the others.
    fn sdiff(&self, ctx: &Context, keys: &[&str]) -> Result<Vec<Value>>;

    /// Stores the difference in `destination`, returning its size.
    fn sdiff_store(&self, ctx: &Context, destination: &str, keys: &[&str]) -> Result<i64>;
}
