use anyhow::Result as AnyResult;
use fleeting_bot::{Bot, BotConfig, BotError, EventBus, InMemoryEventBus, event};
use fleeting_core::{Listener, ListenerError};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::sleep;

#[derive(Debug, Clone, PartialEq)]
struct Message {
    channel: u64,
    text: String,
}

fn message(channel: u64, text: &str) -> Message {
    Message {
        channel,
        text: text.into(),
    }
}

#[derive(Debug, Clone)]
struct Typing;

async fn bot_on(bus: &Arc<InMemoryEventBus>) -> Bot {
    Bot::builder()
        .bus(bus.clone() as Arc<dyn EventBus>)
        .start()
        .await
}

#[tokio::test(start_paused = true)]
async fn bus_events_reach_registered_listeners() -> AnyResult<()> {
    let bus = Arc::new(InMemoryEventBus::new(16));
    let bot = bot_on(&bus).await;
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    let id = bot.register(
        Listener::<Message>::builder()
            .predicate(|m: &Message| m.channel == 7)
            .on_match(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .ttl_millis(100)
            .build()?,
    )?;

    bus.publish(event(Typing)).await?;
    bus.publish(event(message(1, "elsewhere"))).await?;
    bus.publish(event(message(7, "here"))).await?;
    bus.publish(event(message(7, "again"))).await?;
    sleep(Duration::from_millis(1)).await;

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert!(!bot.listeners().is_pending(&id));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn next_event_returns_the_first_match() -> AnyResult<()> {
    let bus = Arc::new(InMemoryEventBus::new(16));
    let bot = bot_on(&bus).await;

    let (reply, published) = tokio::join!(
        bot.next_event(|m: &Message| m.text == "yes", Duration::from_millis(100)),
        async {
            sleep(Duration::from_millis(10)).await;
            bus.publish(event(message(1, "no"))).await?;
            sleep(Duration::from_millis(40)).await;
            bus.publish(event(message(2, "yes"))).await
        }
    );
    published?;

    assert_eq!(reply?, Some(message(2, "yes")));
    assert_eq!(bot.listeners().pending(), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn next_event_times_out_with_none() -> AnyResult<()> {
    let bus = Arc::new(InMemoryEventBus::new(16));
    let bot = bot_on(&bus).await;

    let started = tokio::time::Instant::now();
    let reply = bot
        .next_event(|_: &Message| true, Duration::from_millis(30))
        .await?;

    assert_eq!(reply, None);
    assert!(started.elapsed() >= Duration::from_millis(30));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn prompt_uses_the_configured_ttl() -> AnyResult<()> {
    let config = BotConfig {
        prompt_ttl: Duration::from_millis(20),
        ..BotConfig::default()
    };
    let bot = Bot::builder().config(config).start().await;

    let started = tokio::time::Instant::now();
    assert_eq!(bot.prompt(|_: &Typing| true).await?.map(|_| ()), None);
    assert!(started.elapsed() >= Duration::from_millis(20));
    assert!(started.elapsed() < Duration::from_millis(60));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn abandoned_wait_cancels_its_listener() -> AnyResult<()> {
    let bus = Arc::new(InMemoryEventBus::new(16));
    let bot = bot_on(&bus).await;

    let waited = tokio::time::timeout(
        Duration::from_millis(10),
        bot.next_event(|_: &Message| true, Duration::from_secs(5)),
    )
    .await;

    assert!(waited.is_err());
    assert_eq!(bot.listeners().pending(), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn shutdown_fails_pending_waits() -> AnyResult<()> {
    let bus = Arc::new(InMemoryEventBus::new(16));
    let bot = bot_on(&bus).await;

    let (reply, ()) = tokio::join!(
        bot.next_event(|_: &Message| true, Duration::from_secs(5)),
        async {
            sleep(Duration::from_millis(5)).await;
            bot.shutdown();
        }
    );

    assert!(matches!(
        reply,
        Err(BotError::Listener(ListenerError::NotRunning))
    ));
    assert!(matches!(
        bot.next_event(|_: &Message| true, Duration::from_secs(1)).await,
        Err(BotError::Listener(ListenerError::NotRunning))
    ));
    bot.join().await;
    Ok(())
}
