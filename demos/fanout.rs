//! Fan-out demo
//!
//! Publishes a ticking counter to a stream, with one subscriber connected
//! from the start and another joining late and catching up through replay.
//!
//! Run with: cargo run --example fanout

use std::sync::Arc;
use std::time::Duration;

use broadcast_rs::{ChannelSubscriber, Event, EventReceiver, Stream, StreamConfig};

fn spawn_reader(name: &'static str, mut rx: EventReceiver) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            println!(
                "[{}] id={} data={}",
                name,
                String::from_utf8_lossy(event.id.as_deref().unwrap_or_default()),
                String::from_utf8_lossy(&event.data)
            );
        }
        println!("[{}] disconnected", name);
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("broadcast_rs=debug".parse()?)
                .add_directive("fanout=debug".parse()?),
        )
        .init();

    let config = StreamConfig::default()
        .name("ticker")
        .max_inactivity(Duration::from_secs(2));
    let stream = Stream::new(config);

    let early = Arc::new(ChannelSubscriber::new("early"));
    stream.add_subscriber(early.clone()).await?;
    let early_reader = spawn_reader("early", early.connect().await?);

    for i in 0..5 {
        stream.publish(Event::new(format!("tick {}", i))).await?;
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    // Late joiner receives ticks 0..5 from history, then live ticks
    let late = Arc::new(ChannelSubscriber::new("late"));
    stream.add_subscriber(late.clone()).await?;
    let late_reader = spawn_reader("late", late.connect().await?);

    for i in 5..8 {
        stream.publish(Event::new(format!("tick {}", i))).await?;
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    let stats = stream.stats().await?;
    println!(
        "subscribers={} published={} logged={} replays={}",
        stats.subscriber_count, stats.events_published, stats.log_len, stats.replays_served
    );

    tokio::select! {
        _ = stream.close() => {
            println!("Stream closed");
        }
        _ = tokio::signal::ctrl_c() => {
            println!("\nShutting down...");
        }
    }

    let (early, late) = tokio::join!(early_reader, late_reader);
    for (name, result) in [("early", early), ("late", late)] {
        if let Err(e) = result {
            tracing::error!(reader = name, error = %e, "Reader task failed");
        }
    }

    Ok(())
}
