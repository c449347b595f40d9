use std::fmt;

use crate::{Conn, Context, Result, Value};

/// Publish/subscribe operations.
///
/// Subscribing hands back a dedicated connection. The caller owns it and
/// must close it when done.
pub trait GroupPubSub: Send + Sync {
    /// Posts `message` to `channel`, returning the number of receivers.
    fn publish(&self, ctx: &Context, channel: &str, message: Value) -> Result<i64>;

    /// Subscribes a new connection to `channels`.
    fn subscribe(&self, ctx: &Context, channels: &[&str]) -> Result<(Box<dyn Conn>, Vec<Subscription>)>;

    /// Subscribes a new connection to glob-style `patterns`.
    ///
    /// - `h?llo` matches hello, hallo and hxllo
    /// - `h*llo` matches hllo and heeeello
    /// - `h[ae]llo` matches hello and hallo, but not hillo
    ///
    /// Use `\` to escape special characters.
    fn psubscribe(&self, ctx: &Context, patterns: &[&str]) -> Result<(Box<dyn Conn>, Vec<Subscription>)>;
}

/// A message published to a channel the connection listens on.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Message {
    /// Channel the message was published to.
    pub channel: String,
    /// Pattern that matched the channel, for pattern subscriptions.
    pub pattern: Option<String>,
    /// Payload.
    pub payload: String,
    /// Multi-part payload, when the message carries more than one part.
    pub payload_slice: Vec<String>,
}

/// Kind of a subscription acknowledgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionKind {
    /// `subscribe`
    Subscribe,
    /// `unsubscribe`
    Unsubscribe,
    /// `psubscribe`
    PSubscribe,
    /// `punsubscribe`
    PUnsubscribe,
}

impl SubscriptionKind {
    /// Wire name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionKind::Subscribe => "subscribe",
            SubscriptionKind::Unsubscribe => "unsubscribe",
            SubscriptionKind::PSubscribe => "psubscribe",
            SubscriptionKind::PUnsubscribe => "punsubscribe",
        }
    }
}

impl fmt::Display for SubscriptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Acknowledgment of a (un)subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    /// What happened.
    pub kind: SubscriptionKind,
    /// Channel or pattern name.
    pub channel: String,
    /// Number of channels and patterns the connection is now subscribed to.
    pub count: usize,
}

impl fmt::Display for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscription_displays_kind_and_channel() {
        let sub = Subscription {
            kind: SubscriptionKind::PSubscribe,
            channel: "news.*".to_owned(),
            count: 1,
        };
        assert_eq!(sub.to_string(), "psubscribe: news.*");
    }
}
