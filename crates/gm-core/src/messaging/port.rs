use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef, UserId},
    messaging::types::{AdminRights, MemberStatus, Restriction},
    Result,
};

/// Sending and deleting chat messages.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef>;
    async fn reply_html(&self, to: MessageRef, html: &str) -> Result<MessageRef>;
    /// Reply without a parse mode; the text is shown verbatim.
    async fn reply_text(&self, to: MessageRef, text: &str) -> Result<MessageRef>;
    async fn delete_message(&self, msg: MessageRef) -> Result<()>;
}

/// Member administration in group chats.
#[async_trait]
pub trait ModerationPort: Send + Sync {
    async fn member_status(&self, chat_id: ChatId, user_id: UserId) -> Result<MemberStatus>;
    async fn ban(&self, chat_id: ChatId, user_id: UserId) -> Result<()>;
    async fn unban(&self, chat_id: ChatId, user_id: UserId) -> Result<()>;
    async fn restrict(
        &self,
        chat_id: ChatId,
        user_id: UserId,
        restriction: Restriction,
    ) -> Result<()>;
    async fn set_admin_rights(
        &self,
        chat_id: ChatId,
        user_id: UserId,
        rights: AdminRights,
    ) -> Result<()>;
}

/// Everything the command service needs from a messenger.
pub trait ChatPort: MessagingPort + ModerationPort {}

impl<T: MessagingPort + ModerationPort + ?Sized> ChatPort for T {}
