use std::sync::Arc;

use log::debug;

use super::{Adapter, AdapterGroup, AdapterOperation, Conn};
use crate::groups::{
    GroupGeneric, GroupHash, GroupList, GroupPubSub, GroupScript, GroupSet, GroupSortedSet,
    GroupString,
};
use crate::{Config, Context, KvError, Result, Value};

use self::pubsub::{Broker, MemoryConn};
use self::store::{Keyspace, Store, DATABASES};

mod command;
mod generic;
mod hash;
mod list;
mod pubsub;
mod script;
mod set;
mod sorted_set;
mod store;
mod string;

/// An in-process adapter keeping all data in memory.
///
/// Implements every command group with the semantics of a Redis server:
/// sixteen logical databases, lazy key expiry, blocking list pops and
/// channel/pattern pub/sub. Scripting is not supported.
///
/// Cloning is cheap and clones share the same data; clones made with
/// [`MemoryAdapter::select`] see a different database of the same data.
#[derive(Clone)]
pub struct MemoryAdapter {
    store: Arc<Store>,
    broker: Arc<Broker>,
    db: usize,
}

impl Default for MemoryAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAdapter {
    /// Creates an empty store using database 0.
    pub fn new() -> Self {
        MemoryAdapter {
            store: Arc::new(Store::new()),
            broker: Arc::new(Broker::new()),
            db: 0,
        }
    }

    /// Returns an adapter over the same data using database `db`.
    pub fn select(&self, db: u32) -> Result<Self> {
        let db = check_db(db)?;
        Ok(MemoryAdapter {
            store: self.store.clone(),
            broker: self.broker.clone(),
            db,
        })
    }

    /// Index of the database this adapter operates on.
    pub fn db(&self) -> u32 {
        self.db as u32
    }

    /// An adapter factory building a fresh store per configuration,
    /// honoring [`Config::db`]. Yields nothing for an out of range db.
    pub fn factory() -> impl Fn(&Config) -> Option<Arc<dyn Adapter>> + Send + Sync + 'static {
        |config: &Config| -> Option<Arc<dyn Adapter>> {
            match MemoryAdapter::new().select(config.db) {
                Ok(adapter) => Some(Arc::new(adapter)),
                Err(e) => {
                    debug!("memory adapter rejected config: {}", e);
                    None
                }
            }
        }
    }

    /// Runs `f` on this adapter's database while holding the store lock.
    fn with_db<R>(&self, ctx: &Context, f: impl FnOnce(&mut Keyspace) -> Result<R>) -> Result<R> {
        ctx.check()?;
        let mut dbs = self.store.lock();
        f(&mut dbs[self.db])
    }
}

fn check_db(db: u32) -> Result<usize> {
    let db = db as usize;
    if db < DATABASES {
        Ok(db)
    } else {
        Err(KvError::Store("ERR DB index is out of range".to_owned()))
    }
}

impl AdapterOperation for MemoryAdapter {
    fn do_command(&self, ctx: &Context, command: &str, args: Vec<Value>) -> Result<Value> {
        ctx.check()?;
        command::dispatch(self, ctx, command, args)
    }

    fn conn(&self, ctx: &Context) -> Result<Box<dyn Conn>> {
        ctx.check()?;
        Ok(Box::new(MemoryConn::new(self.clone())))
    }

    fn close(&self, _ctx: &Context) -> Result<()> {
        Ok(())
    }
}

impl AdapterGroup for MemoryAdapter {
    fn group_generic(&self) -> Arc<dyn GroupGeneric> {
        Arc::new(self.clone())
    }

    fn group_hash(&self) -> Arc<dyn GroupHash> {
        Arc::new(self.clone())
    }

    fn group_list(&self) -> Arc<dyn GroupList> {
        Arc::new(self.clone())
    }

    fn group_pubsub(&self) -> Arc<dyn GroupPubSub> {
        Arc::new(self.clone())
    }

    fn group_script(&self) -> Arc<dyn GroupScript> {
        Arc::new(self.clone())
    }

    fn group_set(&self) -> Arc<dyn GroupSet> {
        Arc::new(self.clone())
    }

    fn group_sorted_set(&self) -> Arc<dyn GroupSortedSet> {
        Arc::new(self.clone())
    }

    fn group_string(&self) -> Arc<dyn GroupString> {
        Arc::new(self.clone())
    }
}
