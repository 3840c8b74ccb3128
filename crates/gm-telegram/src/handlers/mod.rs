//! Telegram update handlers.
//!
//! Each handler converts the teloxide message into the `gm-core` update model
//! and hands it to the `GroupManager`. Handler errors are logged, never
//! propagated to the dispatcher.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use gm_core::{
    domain::{ChatId, ChatKind, MessageId},
    messaging::types::{IncomingText, MembershipChange, MembershipEvent},
};

use crate::{chat_user, router::AppState};

mod commands;

pub(crate) fn chat_kind(msg: &Message) -> ChatKind {
    if msg.chat.is_private() {
        ChatKind::Private
    } else {
        ChatKind::Group
    }
}

fn membership_change(msg: &Message) -> Option<MembershipChange> {
    if let Some(users) = msg.new_chat_members() {
        return Some(MembershipChange::Joined(
            users.iter().map(chat_user).collect(),
        ));
    }
    msg.left_chat_member()
        .map(|u| MembershipChange::Left(chat_user(u)))
}

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let chat_id = ChatId(msg.chat.id.0);

    if let Some(change) = membership_change(&msg) {
        let event = MembershipEvent {
            chat_id,
            message_id: MessageId(msg.id.0),
            change,
        };
        if let Err(e) = state
            .manager
            .handle_membership(state.port.as_ref(), event)
            .await
        {
            tracing::error!(chat_id = chat_id.0, error = %e, "membership handler failed");
        }
        return Ok(());
    }

    let Some(from) = msg.from() else {
        return Ok(());
    };

    if let Some(text) = msg.text() {
        if commands::looks_like_command(text) {
            return commands::handle_command(&msg, text, &state).await;
        }
    }

    let Some(text) = msg.text().or_else(|| msg.caption()) else {
        return Ok(());
    };

    let incoming = IncomingText {
        chat_id,
        chat_kind: chat_kind(&msg),
        message_id: MessageId(msg.id.0),
        from: chat_user(from),
        text: text.to_string(),
    };
    if let Err(e) = state
        .manager
        .handle_text(state.port.as_ref(), incoming)
        .await
    {
        tracing::error!(chat_id = chat_id.0, error = %e, "protection handler failed");
    }
    Ok(())
}
