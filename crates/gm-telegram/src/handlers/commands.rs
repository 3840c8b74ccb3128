use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use gm_core::{
    domain::{ChatId, MessageId},
    messaging::types::{IncomingCommand, RepliedMessage},
};

use crate::{chat_user, router::AppState};

use super::chat_kind;

/// Splits `/cmd@botname args` into the lowercased name, the optional bot
/// mention and the trimmed arguments (inner newlines kept).
fn parse_command(text: &str) -> (String, Option<String>, String) {
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let mut head = first.strip_prefix('/').unwrap_or(first).splitn(2, '@');
    let cmd = head.next().unwrap_or("").to_lowercase();
    let mention = head.next().map(str::to_string);

    (cmd, mention, rest)
}

/// `/name` or `/name@bot`, where the name is ASCII letters, digits or `_`.
/// Anything else starting with `/` is ordinary text.
pub(super) fn looks_like_command(text: &str) -> bool {
    let Some(rest) = text.strip_prefix('/') else {
        return false;
    };
    let name = rest
        .split(|c: char| c.is_whitespace() || c == '@')
        .next()
        .unwrap_or("");
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A command addressed to another bot (`/ban@otherbot`) is not ours.
fn addressed_to_us(mention: Option<&str>, bot_username: &str) -> bool {
    match mention {
        None => true,
        Some(m) => m.eq_ignore_ascii_case(bot_username),
    }
}

pub(super) async fn handle_command(
    msg: &Message,
    text: &str,
    state: &Arc<AppState>,
) -> ResponseResult<()> {
    let Some(from) = msg.from() else {
        return Ok(());
    };

    let (name, mention, args) = parse_command(text);
    if name.is_empty() || !addressed_to_us(mention.as_deref(), &state.bot_username) {
        return Ok(());
    }

    let chat_id = ChatId(msg.chat.id.0);
    let cmd = IncomingCommand {
        chat_id,
        chat_kind: chat_kind(msg),
        message_id: MessageId(msg.id.0),
        from: chat_user(from),
        reply_to: msg.reply_to_message().map(|r| RepliedMessage {
            message_id: MessageId(r.id.0),
            from: r.from().map(chat_user),
        }),
        name,
        args,
    };

    tracing::debug!(chat_id = chat_id.0, user_id = cmd.from.id.0, command = %cmd.name, "command");
    if let Err(e) = state
        .manager
        .handle_command(state.port.as_ref(), cmd)
        .await
    {
        tracing::error!(chat_id = chat_id.0, error = %e, "command handler failed");
    }
    Ok(())
}
