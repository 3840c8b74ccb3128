//! Telegram adapter (teloxide).
//!
//! This crate implements the `gm-core` messaging and moderation ports over the
//! Telegram Bot API.

use async_trait::async_trait;

use teloxide::{
    prelude::*,
    types::{ChatMemberStatus, ChatPermissions, ParseMode},
};

use tokio::time::sleep;

pub mod handlers;
pub mod router;

use gm_core::{
    domain::{ChatId, ChatUser, MessageId, MessageRef, UserId},
    errors::Error,
    messaging::{
        port::{MessagingPort, ModerationPort},
        types::{AdminRights, MemberStatus, Restriction},
    },
    Result,
};

#[derive(Clone)]
pub struct TelegramPort {
    bot: Bot,
}

impl TelegramPort {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn tg_msg_id(message_id: MessageId) -> teloxide::types::MessageId {
        teloxide::types::MessageId(message_id.0)
    }

    fn tg_user(user_id: UserId) -> Result<teloxide::types::UserId> {
        u64::try_from(user_id.0)
            .map(teloxide::types::UserId)
            .map_err(|_| Error::External(format!("invalid user id {}", user_id.0)))
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::External(format!("telegram error: {e}"))
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        tracing::debug!(wait = ?d, "telegram asked to retry later");
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(Self::map_err(other)),
                },
            }
        }
    }
}

/// Converts a Telegram user into the core user model.
pub fn chat_user(u: &teloxide::types::User) -> ChatUser {
    ChatUser {
        id: UserId(u.id.0 as i64),
        first_name: u.first_name.clone(),
        last_name: u.last_name.clone(),
        username: u.username.clone(),
        is_bot: u.is_bot,
    }
}

#[async_trait]
impl MessagingPort for TelegramPort {
    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
        let msg = self
            .with_retry(|| {
                self.bot
                    .send_message(Self::tg_chat(chat_id), html.to_string())
                    .parse_mode(ParseMode::Html)
            })
            .await?;

        Ok(MessageRef::new(chat_id, MessageId(msg.id.0)))
    }

    async fn reply_html(&self, to: MessageRef, html: &str) -> Result<MessageRef> {
        let msg = self
            .with_retry(|| {
                self.bot
                    .send_message(Self::tg_chat(to.chat_id), html.to_string())
                    .parse_mode(ParseMode::Html)
                    .reply_to_message_id(Self::tg_msg_id(to.message_id))
            })
            .await?;

        Ok(MessageRef::new(to.chat_id, MessageId(msg.id.0)))
    }

    async fn reply_text(&self, to: MessageRef, text: &str) -> Result<MessageRef> {
        let msg = self
            .with_retry(|| {
                self.bot
                    .send_message(Self::tg_chat(to.chat_id), text.to_string())
                    .reply_to_message_id(Self::tg_msg_id(to.message_id))
            })
            .await?;

        Ok(MessageRef::new(to.chat_id, MessageId(msg.id.0)))
    }

    async fn delete_message(&self, msg: MessageRef) -> Result<()> {
        self.with_retry(|| {
            self.bot
                .delete_message(Self::tg_chat(msg.chat_id), Self::tg_msg_id(msg.message_id))
        })
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ModerationPort for TelegramPort {
    async fn member_status(&self, chat_id: ChatId, user_id: UserId) -> Result<MemberStatus> {
        let user = Self::tg_user(user_id)?;
        let member = self
            .with_retry(|| self.bot.get_chat_member(Self::tg_chat(chat_id), user))
            .await?;

        Ok(match member.status() {
            ChatMemberStatus::Owner => MemberStatus::Owner,
            ChatMemberStatus::Administrator => MemberStatus::Administrator,
            ChatMemberStatus::Member => MemberStatus::Member,
            ChatMemberStatus::Restricted => MemberStatus::Restricted,
            ChatMemberStatus::Left => MemberStatus::Left,
            ChatMemberStatus::Banned => MemberStatus::Banned,
        })
    }

    async fn ban(&self, chat_id: ChatId, user_id: UserId) -> Result<()> {
        let user = Self::tg_user(user_id)?;
        self.with_retry(|| self.bot.ban_chat_member(Self::tg_chat(chat_id), user))
            .await?;
        Ok(())
    }

    async fn unban(&self, chat_id: ChatId, user_id: UserId) -> Result<()> {
        let user = Self::tg_user(user_id)?;
        self.with_retry(|| {
            self.bot
                .unban_chat_member(Self::tg_chat(chat_id), user)
                .only_if_banned(true)
        })
        .await?;
        Ok(())
    }

    async fn restrict(
        &self,
        chat_id: ChatId,
        user_id: UserId,
        restriction: Restriction,
    ) -> Result<()> {
        let user = Self::tg_user(user_id)?;
        let permissions = if restriction.can_send_messages {
            ChatPermissions::SEND_MESSAGES
        } else {
            ChatPermissions::empty()
        };
        self.with_retry(|| {
            let req = self
                .bot
                .restrict_chat_member(Self::tg_chat(chat_id), user, permissions);
            match restriction.until {
                Some(until) => req.until_date(until),
                None => req,
            }
        })
        .await?;
        Ok(())
    }

    async fn set_admin_rights(
        &self,
        chat_id: ChatId,
        user_id: UserId,
        rights: AdminRights,
    ) -> Result<()> {
        let user = Self::tg_user(user_id)?;
        self.with_retry(|| {
            self.bot
                .promote_chat_member(Self::tg_chat(chat_id), user)
                .can_manage_chat(rights.can_manage_chat)
                .can_delete_messages(rights.can_delete_messages)
                .can_restrict_members(rights.can_restrict_members)
                .can_promote_members(rights.can_promote_members)
        })
        .await?;
        Ok(())
    }
}
