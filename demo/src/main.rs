use anyhow::Result;
use fleeting_bot::store::DocumentStore;
use fleeting_bot::variables::{EmoteCodec, NullableCodec, NumberCodec, VariableCodec};
use fleeting_bot::{Bot, BotConfig, Document, InMemoryDocumentStore, event};
use fleeting_core::Listener;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
struct Message {
    author: u64,
    text: String,
}

#[derive(Debug, Clone)]
struct ReactionAdded {
    author: u64,
    emote: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct GuildSettings {
    snowflake: u64,
    max_warnings: String,
    welcome_emote: String,
}

impl Document for GuildSettings {
    const COLLECTION: &'static str = "guild_settings";

    fn snowflake(&self) -> u64 {
        self.snowflake
    }
}

fn say(author: u64, text: &str) -> fleeting_bot::BotEvent {
    event(Message {
        author,
        text: text.to_string(),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = BotConfig::from_env()?;
    info!(environment = %config.environment, "starting demo bot");
    let bot = Bot::builder().config(config).start().await;

    // 1) 提问并等待同一作者的回答
    let (answer, published) = tokio::join!(
        bot.next_event(|m: &Message| m.author == 42, Duration::from_millis(200)),
        async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            bot.publish(say(7, "not me")).await?;
            bot.publish(say(42, "blue")).await
        }
    );
    published?;
    match answer? {
        Some(m) => info!(text = %m.text, "favourite colour answered"),
        None => info!("nobody answered"),
    }

    // 2) 无人回应的表情确认
    let (confirmed, published) = tokio::join!(
        bot.next_event(
            |r: &ReactionAdded| r.author == 42 && r.emote == "wave",
            Duration::from_millis(50),
        ),
        bot.publish(event(ReactionAdded {
            author: 7,
            emote: "wave".to_string(),
        }))
    );
    published?;
    let confirmed = confirmed?;
    info!(confirmed = confirmed.is_some(), "reaction prompt finished");

    // 3) 直接注册带超时回调的监听器
    let id = bot.register(
        Listener::<Message>::builder()
            .predicate(|m: &Message| m.text.starts_with("!stop"))
            .on_match(|m| {
                info!(author = m.author, "stop requested");
                Ok(())
            })
            .on_timeout(|| {
                info!("stop window closed");
                Ok(())
            })
            .ttl_millis(100)
            .build()?,
    )?;
    bot.publish(say(1, "!stop now")).await?;
    tokio::time::sleep(Duration::from_millis(150)).await;
    info!(pending = bot.listeners().is_pending(&id), "stop listener resolved");

    // 4) 设置项编码后写入文档存储
    let store = InMemoryDocumentStore::for_config(bot.config());
    let warnings = NullableCodec::new(NumberCodec::<u8>::new());
    let emote = EmoteCodec.decode("<a:wave:112233>")?;
    store
        .upsert(&GuildSettings {
            snowflake: 1,
            max_warnings: warnings.encode(&Some(3))?,
            welcome_emote: EmoteCodec.encode(&emote)?,
        })
        .await?;
    if let Some(settings) = store.get_by_snowflake::<GuildSettings>(1).await? {
        let max_warnings = warnings.decode(&settings.max_warnings)?;
        let welcome_emote = EmoteCodec.decode(&settings.welcome_emote)?;
        info!(
            database = store.database(),
            ?max_warnings,
            %welcome_emote,
            "guild settings stored"
        );
    }

    bot.join().await;
    Ok(())
}
