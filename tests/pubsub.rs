use std::sync::Arc;
use std::thread;
use std::time::Duration;

use kvclient::groups::{GroupPubSub, SubscriptionKind};
use kvclient::{Client, Conn, ConnCommand, Context, KvError, MemoryAdapter, Result, Value};

fn client() -> Client {
    Client::with_adapter(Arc::new(MemoryAdapter::new()))
}

#[test]
fn subscribe_and_receive() -> Result<()> {
    let ctx = Context::background();
    let c = client();

    let (mut conn, subs) = c.subscribe(&ctx, &["news", "sport"])?;
    assert_eq!(subs.len(), 2);
    assert_eq!(subs[0].kind, SubscriptionKind::Subscribe);
    assert_eq!(subs[1].count, 2);
    assert_eq!(subs[0].to_string(), "subscribe: news");

    assert_eq!(c.publish(&ctx, "news", "hello".into())?, 1);
    assert_eq!(c.publish(&ctx, "weather", "rain".into())?, 0);

    let message = conn.receive_message(&ctx)?;
    assert_eq!(message.channel, "news");
    assert_eq!(message.payload, "hello");
    assert_eq!(message.pattern, None);

    c.publish(&ctx, "sport", Value::from(42))?;
    assert_eq!(
        conn.receive(&ctx)?,
        Value::Array(vec!["message".into(), "sport".into(), "42".into()])
    );
    conn.close(&ctx)?;
    Ok(())
}

#[test]
fn pattern_subscriptions() -> Result<()> {
    let ctx = Context::background();
    let c = client();

    let (mut conn, subs) = c.psubscribe(&ctx, &["news.*"])?;
    assert_eq!(subs[0].kind, SubscriptionKind::PSubscribe);
    assert_eq!(c.publish(&ctx, "news.tech", "rust".into())?, 1);
    assert_eq!(c.publish(&ctx, "sports.tech", "no".into())?, 0);

    let message = conn.receive_message(&ctx)?;
    assert_eq!(message.pattern.as_deref(), Some("news.*"));
    assert_eq!(message.channel, "news.tech");

    c.publish(&ctx, "news.art", "paint".into())?;
    assert_eq!(
        conn.receive(&ctx)?,
        Value::Array(vec!["pmessage".into(), "news.*".into(), "news.art".into(), "paint".into()])
    );

    let acks = conn.punsubscribe(&ctx, &[])?;
    assert_eq!(acks.len(), 1);
    assert_eq!(acks[0].count, 0);
    assert_eq!(c.publish(&ctx, "news.tech", "gone".into())?, 0);
    Ok(())
}

#[test]
fn unsubscribe_and_close() -> Result<()> {
    let ctx = Context::background();
    let c = client();

    let mut conn = c.conn(&ctx)?;
    conn.subscribe(&ctx, &["a", "b"])?;
    let acks = conn.unsubscribe(&ctx, &["a"])?;
    assert_eq!(acks[0].kind, SubscriptionKind::Unsubscribe);
    assert_eq!(acks[0].count, 1);
    assert_eq!(c.publish(&ctx, "a", "x".into())?, 0);
    assert_eq!(c.publish(&ctx, "b", "x".into())?, 1);

    // raw subscription commands answer with acknowledgments
    let reply = conn.do_command(&ctx, "SUBSCRIBE", vec!["c".into()])?;
    assert_eq!(
        reply,
        Value::Array(vec![Value::Array(vec!["subscribe".into(), "c".into(), Value::Int(2)])])
    );

    conn.close(&ctx)?;
    assert_eq!(c.publish(&ctx, "b", "x".into())?, 0);
    assert!(matches!(conn.receive_message(&ctx), Err(KvError::InvalidParameter(_))));
    Ok(())
}

// Dropping a connection unregisters it
#[test]
fn dropped_connection_stops_counting() -> Result<()> {
    let ctx = Context::background();
    let c = client();
    let (conn, _) = c.subscribe(&ctx, &["ch"])?;
    assert_eq!(c.publish(&ctx, "ch", "x".into())?, 1);
    drop(conn);
    assert_eq!(c.publish(&ctx, "ch", "x".into())?, 0);
    Ok(())
}

#[test]
fn receive_waits_for_publisher() -> Result<()> {
    let ctx = Context::background();
    let c = Arc::new(client());
    let (mut conn, _) = c.subscribe(&ctx, &["jobs"])?;

    let publisher = {
        let c = c.clone();
        thread::spawn(move || -> Result<i64> {
            thread::sleep(Duration::from_millis(50));
            c.publish(&Context::background(), "jobs", "work".into())
        })
    };
    assert_eq!(conn.receive_message(&ctx)?.payload, "work");
    assert_eq!(publisher.join().expect("publisher panicked")?, 1);

    let short = ctx.with_timeout(Duration::from_millis(50));
    assert!(matches!(conn.receive_message(&short), Err(KvError::DeadlineExceeded)));
    Ok(())
}
