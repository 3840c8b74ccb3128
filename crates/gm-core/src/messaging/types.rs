use std::fmt;

use chrono::{DateTime, Utc};

use crate::domain::{ChatId, ChatKind, ChatUser, MessageId, MessageRef};

/// Cross-messenger incoming update model.
///
/// Telegram-specific fields live in the Telegram adapter.
#[derive(Clone, Debug)]
pub struct IncomingCommand {
    pub chat_id: ChatId,
    pub chat_kind: ChatKind,
    pub message_id: MessageId,
    pub from: ChatUser,
    pub reply_to: Option<RepliedMessage>,
    /// Lowercased command name without the leading `/` or `@botname`.
    pub name: String,
    /// Everything after the command name, trimmed (newlines preserved).
    pub args: String,
}

impl IncomingCommand {
    pub fn message(&self) -> MessageRef {
        MessageRef::new(self.chat_id, self.message_id)
    }

    /// The user whose message this command replies to.
    pub fn target(&self) -> Option<&ChatUser> {
        self.reply_to.as_ref().and_then(|r| r.from.as_ref())
    }
}

#[derive(Clone, Debug)]
pub struct RepliedMessage {
    pub message_id: MessageId,
    pub from: Option<ChatUser>,
}

/// A non-command message carrying text (or a media caption).
#[derive(Clone, Debug)]
pub struct IncomingText {
    pub chat_id: ChatId,
    pub chat_kind: ChatKind,
    pub message_id: MessageId,
    pub from: ChatUser,
    pub text: String,
}

impl IncomingText {
    pub fn message(&self) -> MessageRef {
        MessageRef::new(self.chat_id, self.message_id)
    }
}

#[derive(Clone, Debug)]
pub struct MembershipEvent {
    pub chat_id: ChatId,
    pub message_id: MessageId,
    pub change: MembershipChange,
}

impl MembershipEvent {
    pub fn message(&self) -> MessageRef {
        MessageRef::new(self.chat_id, self.message_id)
    }
}

#[derive(Clone, Debug)]
pub enum MembershipChange {
    Joined(Vec<ChatUser>),
    Left(ChatUser),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemberStatus {
    Owner,
    Administrator,
    Member,
    Restricted,
    Left,
    Banned,
}

impl MemberStatus {
    pub fn is_admin(self) -> bool {
        matches!(self, Self::Owner | Self::Administrator)
    }
}

impl fmt::Display for MemberStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Bot API status strings.
        let s = match self {
            Self::Owner => "creator",
            Self::Administrator => "administrator",
            Self::Member => "member",
            Self::Restricted => "restricted",
            Self::Left => "left",
            Self::Banned => "kicked",
        };
        f.write_str(s)
    }
}

/// Send permission change; `until: None` means it never expires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Restriction {
    pub can_send_messages: bool,
    pub until: Option<DateTime<Utc>>,
}

impl Restriction {
    pub fn mute(until: Option<DateTime<Utc>>) -> Self {
        Self {
            can_send_messages: false,
            until,
        }
    }

    pub fn unmute() -> Self {
        Self {
            can_send_messages: true,
            until: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct AdminRights {
    pub can_manage_chat: bool,
    pub can_delete_messages: bool,
    pub can_restrict_members: bool,
    pub can_promote_members: bool,
}

impl AdminRights {
    /// Rights granted by `/promote`.
    pub fn moderator() -> Self {
        Self {
            can_manage_chat: true,
            can_delete_messages: true,
            can_restrict_members: true,
            can_promote_members: false,
        }
    }

    pub fn none() -> Self {
        Self::default()
    }
}
