use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use log::debug;
use parking_lot::Mutex;

use super::store::{encode, glob_match};
use super::MemoryAdapter;
use crate::adapters::{AdapterOperation, Conn, ConnCommand};
use crate::groups::{GroupPubSub, Message, Subscription, SubscriptionKind};
use crate::{Context, KvError, Result, Value};

/// Longest a receive sleeps before re-checking its context.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

struct Subscriber {
    channels: HashSet<String>,
    patterns: HashSet<String>,
    tx: Sender<Message>,
}

impl Subscriber {
    fn count(&self) -> usize {
        self.channels.len() + self.patterns.len()
    }
}

/// Routes published messages to subscribed connections.
///
/// Each connection owns the receiving end of an unbounded channel;
/// publishing never blocks.
pub(super) struct Broker {
    next_id: AtomicU64,
    subscribers: Mutex<HashMap<u64, Subscriber>>,
}

impl Broker {
    pub(super) fn new() -> Self {
        Broker {
            next_id: AtomicU64::new(0),
            subscribers: Mutex::new(HashMap::new()),
        }
    }

    fn register(&self) -> (u64, Receiver<Message>) {
        let (tx, rx) = channel::unbounded();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.lock().insert(
            id,
            Subscriber {
                channels: HashSet::new(),
                patterns: HashSet::new(),
                tx,
            },
        );
        (id, rx)
    }

    fn subscribe(&self, id: u64, names: &[&str], kind: SubscriptionKind) -> Vec<Subscription> {
        let mut subscribers = self.subscribers.lock();
        let Some(sub) = subscribers.get_mut(&id) else {
            return Vec::new();
        };
        names
            .iter()
            .map(|&name| {
                match kind {
                    SubscriptionKind::PSubscribe => sub.patterns.insert(name.to_owned()),
                    _ => sub.channels.insert(name.to_owned()),
                };
                Subscription {
                    kind,
                    channel: name.to_owned(),
                    count: sub.count(),
                }
            })
            .collect()
    }

    /// Drops `names`, or every subscription of the kind when empty.
    fn unsubscribe(&self, id: u64, names: &[&str], kind: SubscriptionKind) -> Vec<Subscription> {
        let mut subscribers = self.subscribers.lock();
        let Some(sub) = subscribers.get_mut(&id) else {
            return Vec::new();
        };
        let mut targets: Vec<String> = if names.is_empty() {
            match kind {
                SubscriptionKind::PUnsubscribe => sub.patterns.iter().cloned().collect(),
                _ => sub.channels.iter().cloned().collect(),
            }
        } else {
            names.iter().map(|&n| n.to_owned()).collect()
        };
        if names.is_empty() {
            targets.sort();
        }
        targets
            .into_iter()
            .map(|name| {
                match kind {
                    SubscriptionKind::PUnsubscribe => sub.patterns.remove(&name),
                    _ => sub.channels.remove(&name),
                };
                Subscription {
                    kind,
                    channel: name,
                    count: sub.count(),
                }
            })
            .collect()
    }

    fn remove(&self, id: u64) {
        self.subscribers.lock().remove(&id);
    }

    /// Delivers `payload` and returns the number of receiving subscriptions.
    pub(super) fn publish(&self, channel: &str, payload: &str) -> i64 {
        let subscribers = self.subscribers.lock();
        let mut delivered = 0;
        for sub in subscribers.values() {
            if sub.channels.contains(channel) {
                let message = Message {
                    channel: channel.to_owned(),
                    pattern: None,
                    payload: payload.to_owned(),
                    payload_slice: Vec::new(),
                };
                if sub.tx.send(message).is_ok() {
                    delivered += 1;
                }
            }
            for pattern in sub.patterns.iter().filter(|p| glob_match(p, channel)) {
                let message = Message {
                    channel: channel.to_owned(),
                    pattern: Some(pattern.clone()),
                    payload: payload.to_owned(),
                    payload_slice: Vec::new(),
                };
                if sub.tx.send(message).is_ok() {
                    delivered += 1;
                }
            }
        }
        delivered
    }
}

fn acks(subscriptions: &[Subscription]) -> Value {
    Value::Array(
        subscriptions
            .iter()
            .map(|s| {
                Value::Array(vec![
                    s.kind.as_str().into(),
                    s.channel.as_str().into(),
                    s.count.into(),
                ])
            })
            .collect(),
    )
}

/// A dedicated connection to a [`MemoryAdapter`].
///
/// Registers with the broker on its first subscription and unregisters
/// when closed or dropped.
pub(super) struct MemoryConn {
    adapter: MemoryAdapter,
    subscriber: Option<(u64, Receiver<Message>)>,
    closed: bool,
}

impl MemoryConn {
    pub(super) fn new(adapter: MemoryAdapter) -> Self {
        MemoryConn {
            adapter,
            subscriber: None,
            closed: false,
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(KvError::InvalidParameter("connection is closed".to_owned()))
        } else {
            Ok(())
        }
    }

    fn subscriber_id(&mut self) -> u64 {
        match &self.subscriber {
            Some((id, _)) => *id,
            None => {
                let (id, rx) = self.adapter.broker.register();
                debug!("connection {} registered with broker", id);
                self.subscriber = Some((id, rx));
                id
            }
        }
    }

    fn change(&mut self, ctx: &Context, names: &[&str], kind: SubscriptionKind) -> Result<Vec<Subscription>> {
        self.ensure_open()?;
        ctx.check()?;
        let broker = self.adapter.broker.clone();
        Ok(match kind {
            SubscriptionKind::Subscribe | SubscriptionKind::PSubscribe => {
                let id = self.subscriber_id();
                broker.subscribe(id, names, kind)
            }
            SubscriptionKind::Unsubscribe | SubscriptionKind::PUnsubscribe => match &self.subscriber {
                Some((id, _)) => broker.unsubscribe(*id, names, kind),
                None => Vec::new(),
            },
        })
    }

    fn release(&mut self) {
        if let Some((id, _)) = self.subscriber.take() {
            self.adapter.broker.remove(id);
            debug!("connection {} left the broker", id);
        }
    }
}

impl ConnCommand for MemoryConn {
    fn subscribe(&mut self, ctx: &Context, channels: &[&str]) -> Result<Vec<Subscription>> {
        self.change(ctx, channels, SubscriptionKind::Subscribe)
    }

    fn psubscribe(&mut self, ctx: &Context, patterns: &[&str]) -> Result<Vec<Subscription>> {
        self.change(ctx, patterns, SubscriptionKind::PSubscribe)
    }

    fn unsubscribe(&mut self, ctx: &Context, channels: &[&str]) -> Result<Vec<Subscription>> {
        self.change(ctx, channels, SubscriptionKind::Unsubscribe)
    }

    fn punsubscribe(&mut self, ctx: &Context, patterns: &[&str]) -> Result<Vec<Subscription>> {
        self.change(ctx, patterns, SubscriptionKind::PUnsubscribe)
    }

    fn receive_message(&mut self, ctx: &Context) -> Result<Message> {
        self.ensure_open()?;
        let Some((_, rx)) = &self.subscriber else {
            return Err(KvError::InvalidParameter(
                "connection is not subscribed to anything".to_owned(),
            ));
        };
        loop {
            ctx.check()?;
            let wait = ctx.remaining().map_or(POLL_INTERVAL, |r| r.min(POLL_INTERVAL));
            match rx.recv_timeout(wait) {
                Ok(message) => return Ok(message),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(KvError::InvalidParameter(
                        "subscription was closed".to_owned(),
                    ))
                }
            }
        }
    }

    fn receive(&mut self, ctx: &Context) -> Result<Value> {
        let message = self.receive_message(ctx)?;
        let mut reply: Vec<Value> = match message.pattern {
            Some(pattern) => vec!["pmessage".into(), pattern.into()],
            None => vec!["message".into()],
        };
        reply.push(message.channel.into());
        reply.push(message.payload.into());
        Ok(Value::Array(reply))
    }
}

impl Conn for MemoryConn {
    fn do_command(&mut self, ctx: &Context, command: &str, args: Vec<Value>) -> Result<Value> {
        self.ensure_open()?;
        let kind = match command.to_ascii_uppercase().as_str() {
            "SUBSCRIBE" => SubscriptionKind::Subscribe,
            "PSUBSCRIBE" => SubscriptionKind::PSubscribe,
            "UNSUBSCRIBE" => SubscriptionKind::Unsubscribe,
            "PUNSUBSCRIBE" => SubscriptionKind::PUnsubscribe,
            _ => return self.adapter.do_command(ctx, command, args),
        };
        let names = args.iter().map(|a| a.as_string()).collect::<Result<Vec<_>>>()?;
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        let subscriptions = self.change(ctx, &names, kind)?;
        Ok(acks(&subscriptions))
    }

    fn close(&mut self, _ctx: &Context) -> Result<()> {
        self.release();
        self.closed = true;
        Ok(())
    }
}

impl Drop for MemoryConn {
    fn drop(&mut self) {
        self.release();
    }
}

impl MemoryAdapter {
    fn open_subscribed(&self, ctx: &Context, names: &[&str], kind: SubscriptionKind) -> Result<(Box<dyn Conn>, Vec<Subscription>)> {
        let mut conn = MemoryConn::new(self.clone());
        let subscriptions = conn.change(ctx, names, kind)?;
        Ok((Box::new(conn), subscriptions))
    }
}

impl GroupPubSub for MemoryAdapter {
    fn publish(&self, ctx: &Context, channel: &str, message: Value) -> Result<i64> {
        ctx.check()?;
        let payload = String::from_utf8_lossy(&encode(&message)).into_owned();
        Ok(self.broker.publish(channel, &payload))
    }

    fn subscribe(&self, ctx: &Context, channels: &[&str]) -> Result<(Box<dyn Conn>, Vec<Subscription>)> {
        self.open_subscribed(ctx, channels, SubscriptionKind::Subscribe)
    }

    fn psubscribe(&self, ctx: &Context, patterns: &[&str]) -> Result<(Box<dyn Conn>, Vec<Subscription>)> {
        self.open_subscribed(ctx, patterns, SubscriptionKind::PSubscribe)
    }
}
