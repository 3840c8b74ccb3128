use std::{sync::Arc, time::Duration};

use teloxide::{dispatching::Dispatcher, dptree, prelude::*, types::BotCommand};

use gm_core::{
    commands::COMMANDS,
    config::Config,
    domain::UserId,
    messaging::{
        port::ChatPort,
        throttled::{ThrottleConfig, ThrottledPort},
    },
    GroupManager,
};

use crate::handlers;
use crate::TelegramPort;

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<GroupManager>,
    pub port: Arc<dyn ChatPort>,
    /// Without the leading `@`.
    pub bot_username: String,
}

fn bot_commands() -> Vec<BotCommand> {
    COMMANDS
        .iter()
        .map(|(name, description)| BotCommand::new(*name, *description))
        .collect()
}

pub async fn run_polling(cfg: Arc<Config>, manager: GroupManager) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    let me = bot.get_me().await?;
    let bot_username = me.username().to_string();
    tracing::info!(username = %bot_username, "bot started");

    if let Err(e) = bot.set_my_commands(bot_commands()).await {
        tracing::warn!(error = %e, "failed to register the command menu");
    }

    // Wrap the raw Telegram port with a throttling decorator to reduce 429s when
    // a purge or a burst of greetings fires many calls. The adapter still
    // retries once on RetryAfter.
    let raw_port: Arc<dyn ChatPort> = Arc::new(TelegramPort::new(bot.clone()));
    let port: Arc<dyn ChatPort> = Arc::new(ThrottledPort::new(raw_port, ThrottleConfig::default()));

    let manager = Arc::new(manager.with_bot_id(UserId(me.id.0 as i64)));

    let sweeper = {
        let manager = manager.clone();
        let every = (cfg.activity_idle_ttl / 2).max(Duration::from_secs(30));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                manager.sweep_activity().await;
            }
        })
    };

    let state = Arc::new(AppState {
        manager,
        port,
        bot_username,
    });

    let handler = dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    sweeper.abort();
    tracing::info!("bot stopped");
    Ok(())
}
