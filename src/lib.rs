#![deny(missing_docs)]

//! A key-value store client facade over pluggable adapters.
//!
//! The [`Client`] exposes the usual store command groups (strings, hashes,
//! lists, sets, sorted sets, pub/sub, scripting, key-space) and forwards
//! every call to an [`Adapter`]. Adapters do the real work; this crate
//! ships an in-process [`MemoryAdapter`] and leaves network adapters to
//! other crates. The [`Registry`] memoizes one client per configuration
//! group.

mod adapters;
mod client;
mod config;
mod context;
mod error;
pub mod groups;
mod registry;
mod value;

pub use adapters::{
    Adapter, AdapterFunc, AdapterGroup, AdapterOperation, Conn, ConnCommand, MemoryAdapter,
};
pub use client::Client;
pub use config::{Config, DEFAULT_GROUP_NAME};
pub use context::Context;
pub use error::{ErrorKind, KvError, Result};
pub use registry::{
    clear_config, get_config, instance, register_adapter_func, remove_config, set_config,
    set_config_by_map, Registry,
};
pub use value::Value;
