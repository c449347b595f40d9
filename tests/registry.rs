use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use kvclient::groups::GroupString;
use kvclient::{Adapter, Config, Context, ErrorKind, KvError, MemoryAdapter, Registry, Result, Value};

fn counting_factory(built: Arc<AtomicUsize>) -> impl Fn(&Config) -> Option<Arc<dyn Adapter>> + Send + Sync + 'static {
    move |_: &Config| -> Option<Arc<dyn Adapter>> {
        built.fetch_add(1, Ordering::SeqCst);
        Some(Arc::new(MemoryAdapter::new()))
    }
}

// Concurrent first calls for one name build exactly one client
#[test]
fn instance_is_built_once_under_contention() -> Result<()> {
    let registry = Arc::new(Registry::new());
    let built = Arc::new(AtomicUsize::new(0));
    registry.register_adapter_func(counting_factory(built.clone()));
    registry.set_config(Config::default(), None);

    let threads = 16;
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let registry = registry.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                registry.instance(None)
            })
        })
        .collect();

    let clients: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("instance thread panicked"))
        .collect();
    assert_eq!(built.load(Ordering::SeqCst), 1);
    let first = clients[0].clone().expect("client should be built");
    for client in &clients {
        let client = client.as_ref().expect("client should be built");
        assert!(Arc::ptr_eq(&first, client));
    }
    Ok(())
}

// None, "" and the default group name all address the same instance
#[test]
fn default_group_aliases() -> Result<()> {
    let registry = Registry::new();
    registry.register_adapter_func(MemoryAdapter::factory());
    registry.set_config(Config::default(), Some(""));

    let a = registry.instance(None).expect("default client");
    let b = registry.instance(Some("")).expect("default client");
    let c = registry.instance(Some("default")).expect("default client");
    assert!(Arc::ptr_eq(&a, &b));
    assert!(Arc::ptr_eq(&a, &c));
    assert_eq!(registry.config(Some("default")), Some(Config::default()));
    Ok(())
}

// Distinct names get distinct clients backed by their own configuration
#[test]
fn named_groups_are_independent() -> Result<()> {
    let registry = Registry::new();
    registry.register_adapter_func(MemoryAdapter::factory());
    registry.set_config(Config::default(), None);
    registry.set_config(
        Config {
            db: 3,
            ..Config::default()
        },
        Some("cache"),
    );

    let ctx = Context::background();
    let default = registry.instance(None).expect("default client");
    let cache = registry.instance(Some("cache")).expect("cache client");
    assert!(!Arc::ptr_eq(&default, &cache));
    assert_eq!(cache.config().map(|c| c.db), Some(3));

    default.set(&ctx, "k", Value::from("default"), None)?;
    assert_eq!(cache.get(&ctx, "k")?, Value::Nil);
    Ok(())
}

// Failures are remembered: later configuration does not revive the name
#[test]
fn failed_instance_is_cached() -> Result<()> {
    let registry = Registry::new();
    let built = Arc::new(AtomicUsize::new(0));
    registry.register_adapter_func(counting_factory(built.clone()));

    assert!(registry.instance(Some("late")).is_none());
    registry.set_config(Config::default(), Some("late"));
    assert!(registry.instance(Some("late")).is_none());
    assert_eq!(built.load(Ordering::SeqCst), 0);
    Ok(())
}

#[test]
fn construction_errors() -> Result<()> {
    let registry = Registry::new();

    match registry.new_client(None) {
        Err(e @ KvError::MissingConfiguration(_)) => {
            assert_eq!(e.kind(), ErrorKind::MissingConfiguration)
        }
        other => panic!("expected missing configuration, got {:?}", other.err()),
    }

    // no factory registered yet
    registry.set_config(Config::default(), None);
    match registry.new_client(None) {
        Err(e) => assert_eq!(e.kind(), ErrorKind::MissingAdapter),
        Ok(_) => panic!("expected missing adapter"),
    }

    registry.register_adapter_func(MemoryAdapter::factory());
    let client = registry.new_client(None)?;
    assert_eq!(client.config(), Some(&Config::default()));

    // the memory factory rejects databases it does not have
    let bad = Config {
        db: 99,
        ..Config::default()
    };
    assert!(matches!(registry.new_client(Some(&bad)), Err(KvError::MissingAdapter)));
    Ok(())
}

#[test]
fn factory_changes_only_affect_later_clients() -> Result<()> {
    let registry = Registry::new();
    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));
    registry.set_config(Config::default(), None);

    registry.register_adapter_func(counting_factory(first.clone()));
    let before = registry.instance(None).expect("client");
    registry.register_adapter_func(counting_factory(second.clone()));
    let after = registry.instance(None).expect("client");
    let fresh = registry.new_client(None)?;

    assert!(Arc::ptr_eq(&before, &after));
    assert_eq!(first.load(Ordering::SeqCst), 1);
    assert_eq!(second.load(Ordering::SeqCst), 1);
    drop(fresh);
    Ok(())
}

#[test]
fn config_store() -> Result<()> {
    let registry = Registry::new();
    let mut map = serde_json::Map::new();
    map.insert("address".to_owned(), "10.0.0.1:6379".into());
    map.insert("db".to_owned(), 2.into());
    map.insert("idleTimeout".to_owned(), "30s".into());
    registry.set_config_by_map(map, Some("cache"))?;

    let config = registry.config(Some("cache")).expect("stored config");
    assert_eq!(config.address, "10.0.0.1:6379");
    assert_eq!(config.db, 2);
    assert_eq!(config.idle_timeout.as_secs(), 30);
    assert_eq!(registry.config(None), None);

    let mut bad = serde_json::Map::new();
    bad.insert("address".to_owned(), "".into());
    assert!(matches!(
        registry.set_config_by_map(bad, Some("bad")),
        Err(KvError::InvalidConfiguration(_))
    ));
    assert_eq!(registry.config(Some("bad")), None);

    registry.remove_config(Some("cache"));
    assert_eq!(registry.config(Some("cache")), None);

    registry.set_config(Config::default(), None);
    registry.set_config(Config::default(), Some("other"));
    registry.clear_config();
    assert_eq!(registry.config(None), None);
    assert_eq!(registry.config(Some("other")), None);
    Ok(())
}
