use crate::{Context, Result, Value};

/// Sorted set operations.
///
/// Score bounds use the usual textual form: `"1.5"`, exclusive `"(1.5"`,
/// `"-inf"` and `"+inf"`. Lexicographic bounds are `"[a"`, `"(a"`, `"-"`
/// and `"+"`.
pub trait GroupSortedSet: Send + Sync {
    /// Adds or updates members. Returns the number of added (or, with `ch`,
    /// changed) members; with `incr`, the new score or nil when aborted.
    fn zadd(&self, ctx: &Context, key: &str, option: Option<ZAddOption>, members: Vec<ZAddMember>) -> Result<Value>;

    /// Score of `member`.
    fn zscore(&self, ctx: &Context, key: &str, member: Value) -> Result<f64>;

    /// Increments the score of `member`, returning the new score.
    fn zincr_by(&self, ctx: &Context, key: &str, increment: f64, member: Value) -> Result<f64>;

    /// Number of members.
    fn zcard(&self, ctx: &Context, key: &str) -> Result<i64>;

    /// Number of members with a score between `min` and `max`.
    fn zcount(&self, ctx: &Context, key: &str, min: &str, max: &str) -> Result<i64>;

    /// Members in the given range. Ranks by default; scores or lex bounds
    /// with the corresponding option.
    fn zrange(&self, ctx: &Context, key: &str, start: &str, stop: &str, option: Option<ZRangeOption>) -> Result<Vec<Value>>;

    /// Members by descending rank.
    fn zrev_range(&self, ctx: &Context, key: &str, start: i64, stop: i64, option: Option<ZRevRangeOption>) -> Result<Value>;

    /// Rank of `member` by ascending score, -1 if missing.
    fn zrank(&self, ctx: &Context, key: &str, member: Value) -> Result<i64>;

    /// Rank of `member` by descending score, -1 if missing.
    fn zrev_rank(&self, ctx: &Context, key: &str, member: Value) -> Result<i64>;

    /// Removes members, returning how many were removed.
    fn zrem(&self, ctx: &Context, key: &str, members: Vec<Value>) -> Result<i64>;

    /// Removes members by rank range.
    fn zrem_range_by_rank(&self, ctx: &Context, key: &str, start: i64, stop: i64) -> Result<i64>;

    /// Removes members by score range.
    fn zrem_range_by_score(&self, ctx: &Context, key: &str, min: &str, max: &str) -> Result<i64>;

    /// Removes members by lexicographic range.
    fn zrem_range_by_lex(&self, ctx: &Context, key: &str, min: &str, max: &str) -> Result<i64>;

    /// Number of members in a lexicographic range.
    fn zlex_count(&self, ctx: &Context, key: &str, min: &str, max: &str) -> Result<i64>;
}

/// Options for [`GroupSortedSet::zadd`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ZAddOption {
    /// Only update existing members.
    pub xx: bool,
    /// Only add new members.
    pub nx: bool,
    /// Only update when the new score is lower.
    pub lt: bool,
    /// Only update when the new score is greater.
    pub gt: bool,
    /// Count changed members, not only added ones.
    pub ch: bool,
    /// Behave like [`GroupSortedSet::zincr_by`].
    pub incr: bool,
}

impl ZAddOption {
    /// Wire arguments for this option.
    pub fn to_args(&self) -> Vec<Value> {
        [
            (self.xx, "XX"),
            (self.nx, "NX"),
            (self.lt, "LT"),
            (self.gt, "GT"),
            (self.ch, "CH"),
            (self.incr, "INCR"),
        ]
        .into_iter()
        .filter(|(on, _)| *on)
        .map(|(_, flag)| Value::from(flag))
        .collect()
    }
}

/// A score/member pair for [`GroupSortedSet::zadd`].
#[derive(Debug, Clone, PartialEq)]
pub struct ZAddMember {
    /// Score.
    pub score: f64,
    /// Member.
    pub member: Value,
}

impl ZAddMember {
    /// Creates a pair.
    pub fn new(score: f64, member: impl Into<Value>) -> Self {
        ZAddMember {
            score,
            member: member.into(),
        }
    }
}

/// `LIMIT offset count` for [`ZRangeOption`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZRangeLimit {
    /// Number of matching members to skip.
    pub offset: i64,
    /// Maximum number of members to return, negative for all.
    pub count: i64,
}

/// Options for [`GroupSortedSet::zrange`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ZRangeOption {
    /// Interpret bounds as scores.
    pub by_score: bool,
    /// Interpret bounds as lexicographic ranges.
    pub by_lex: bool,
    /// Reverse the ordering.
    pub rev: bool,
    /// Paging, only valid with `by_score` or `by_lex`.
    pub limit: Option<ZRangeLimit>,
    /// Interleave scores with members.
    pub with_scores: bool,
}

impl ZRangeOption {
    /// Wire arguments for this option.
    pub fn to_args(&self) -> Vec<Value> {
        let mut args = Vec::new();
        if self.by_score {
            args.push("BYSCORE".into());
        } else if self.by_lex {
            args.push("BYLEX".into());
        }
        if self.rev {
            args.push("REV".into());
        }
        if let Some(limit) = self.limit {
            args.extend(["LIMIT".into(), limit.offset.into(), limit.count.into()]);
        }
        if self.with_scores {
            args.push("WITHSCORES".into());
        }
        args
    }
}

/// Options for [`GroupSortedSet::zrev_range`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ZRevRangeOption {
    /// Interleave scores with members.
    pub with_scores: bool,
}

impl ZRevRangeOption {
    /// Wire arguments: `WITHSCORES` when set.
    pub fn to_args(&self) -> Vec<Value> {
        if self.with_scores {
            vec!["WITHSCORES".into()]
        } else {
            Vec::new()
        }
    }
}
