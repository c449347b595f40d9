//! Command-group contracts.
//!
//! Each group is an independent, object-safe trait. Adapters hand out one
//! implementation per group and the [`Client`](crate::Client) forwards to
//! them.

mod generic;
mod hash;
mod list;
mod pubsub;
mod script;
mod set;
mod sorted_set;
mod string;

pub use self::generic::{CopyOption, ExpireOption, FlushOp, GroupGeneric};
pub use self::hash::GroupHash;
pub use self::list::{GroupList, LInsertOp};
pub use self::pubsub::{GroupPubSub, Message, Subscription, SubscriptionKind};
pub use self::script::{GroupScript, ScriptFlushOption};
pub use self::set::GroupSet;
pub use self::sorted_set::{
    GroupSortedSet, ZAddMember, ZAddOption, ZRangeLimit, ZRangeOption, ZRevRangeOption,
};
pub use self::string::{GetExOption, GroupString, SetCondition, SetOption, TtlOption};
