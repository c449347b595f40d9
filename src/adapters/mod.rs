use std::sync::Arc;

use crate::groups::{
    GroupGeneric, GroupHash, GroupList, GroupPubSub, GroupScript, GroupSet, GroupSortedSet,
    GroupString, Message, Subscription,
};
use crate::{Config, Context, Result, Value};

/// Core operations of a store adapter.
///
/// Implementors own everything below this layer: wire protocol,
/// connection pooling, retries, routing. They receive the caller's
/// [`Context`] unchanged and are expected to honor it.
pub trait AdapterOperation: Send + Sync {
    /// Sends `command` with `args` and returns the reply.
    ///
    /// Arguments arrive as scalars or text; sequences and mappings have
    /// already been rendered as JSON by the client.
    fn do_command(&self, ctx: &Context, command: &str, args: Vec<Value>) -> Result<Value>;

    /// Retrieves a dedicated connection for continuous operations.
    ///
    /// The caller owns the connection and must close it.
    fn conn(&self, ctx: &Context) -> Result<Box<dyn Conn>>;

    /// Closes the adapter, releasing its pooled resources.
    fn close(&self, ctx: &Context) -> Result<()>;
}

/// Accessors for the command groups an adapter implements.
pub trait AdapterGroup: Send + Sync {
    /// Key-space operations.
    fn group_generic(&self) -> Arc<dyn GroupGeneric>;
    /// Hash operations.
    fn group_hash(&self) -> Arc<dyn GroupHash>;
    /// List operations.
    fn group_list(&self) -> Arc<dyn GroupList>;
    /// Publish/subscribe operations.
    fn group_pubsub(&self) -> Arc<dyn GroupPubSub>;
    /// Scripting operations.
    fn group_script(&self) -> Arc<dyn GroupScript>;
    /// Set operations.
    fn group_set(&self) -> Arc<dyn GroupSet>;
    /// Sorted set operations.
    fn group_sorted_set(&self) -> Arc<dyn GroupSortedSet>;
    /// String operations.
    fn group_string(&self) -> Arc<dyn GroupString>;
}

/// A complete store adapter.
///
/// Blanket-implemented for anything providing both halves.
pub trait Adapter: AdapterGroup + AdapterOperation {}

impl<T: AdapterGroup + AdapterOperation + ?Sized> Adapter for T {}

/// Factory turning a configuration into an adapter.
///
/// Returns `None` when it cannot build one for the given configuration.
pub type AdapterFunc = Arc<dyn Fn(&Config) -> Option<Arc<dyn Adapter>> + Send + Sync>;

/// Operations bound to one dedicated connection.
pub trait ConnCommand {
    /// Subscribes to `channels`.
    fn subscribe(&mut self, ctx: &Context, channels: &[&str]) -> Result<Vec<Subscription>>;

    /// Subscribes to glob-style `patterns`.
    fn psubscribe(&mut self, ctx: &Context, patterns: &[&str]) -> Result<Vec<Subscription>>;

    /// Unsubscribes from `channels`, or from all channels when empty.
    fn unsubscribe(&mut self, ctx: &Context, channels: &[&str]) -> Result<Vec<Subscription>>;

    /// Unsubscribes from `patterns`, or from all patterns when empty.
    fn punsubscribe(&mut self, ctx: &Context, patterns: &[&str]) -> Result<Vec<Subscription>>;

    /// Waits for the next published message.
    fn receive_message(&mut self, ctx: &Context) -> Result<Message>;

    /// Waits for the next raw reply, e.g. `["message", channel, payload]`.
    fn receive(&mut self, ctx: &Context) -> Result<Value>;
}

/// A dedicated connection.
pub trait Conn: ConnCommand + Send {
    /// Sends `command` on this connection and returns the reply.
    fn do_command(&mut self, ctx: &Context, command: &str, args: Vec<Value>) -> Result<Value>;

    /// Releases the connection. Further use fails.
    fn close(&mut self, ctx: &Context) -> Result<()>;
}

mod memory;

pub use self::memory::MemoryAdapter;
