//! Recording `ChatPort` used by the unit tests.

use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
};

use async_trait::async_trait;

use crate::{
    domain::{ChatId, ChatKind, ChatUser, MessageId, MessageRef, UserId},
    errors::Error,
    messaging::{
        port::{MessagingPort, ModerationPort},
        types::{AdminRights, IncomingCommand, MemberStatus, RepliedMessage, Restriction},
    },
    Result,
};

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    SendHtml(ChatId, String),
    ReplyHtml(MessageRef, String),
    ReplyText(MessageRef, String),
    Delete(MessageRef),
    MemberStatus(ChatId, UserId),
    Ban(ChatId, UserId),
    Unban(ChatId, UserId),
    Restrict(ChatId, UserId, Restriction),
    SetAdminRights(ChatId, UserId, AdminRights),
}

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    statuses: HashMap<UserId, MemberStatus>,
    failing: HashSet<&'static str>,
    undeletable: HashSet<MessageId>,
    next_id: i32,
}

#[derive(Default)]
pub struct RecordingPort {
    state: Mutex<State>,
}

impl RecordingPort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(self, user: UserId, status: MemberStatus) -> Self {
        self.state.lock().unwrap().statuses.insert(user, status);
        self
    }

    /// Make every call of `op` (e.g. `"ban"`) fail.
    pub fn failing(self, op: &'static str) -> Self {
        self.state.lock().unwrap().failing.insert(op);
        self
    }

    pub fn undeletable(self, id: MessageId) -> Self {
        self.state.lock().unwrap().undeletable.insert(id);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Moderation calls only (no messages, no status lookups).
    pub fn actions(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| {
                matches!(
                    c,
                    Call::Ban(..)
                        | Call::Unban(..)
                        | Call::Restrict(..)
                        | Call::SetAdminRights(..)
                        | Call::Delete(..)
                )
            })
            .collect()
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::SendHtml(_, t) | Call::ReplyHtml(_, t) | Call::ReplyText(_, t) => Some(t),
                _ => None,
            })
            .collect()
    }

    pub fn last_text(&self) -> Option<String> {
        self.sent_texts().pop()
    }

    fn record(&self, call: Call, op: &'static str) -> Result<()> {
        let mut st = self.state.lock().unwrap();
        st.calls.push(call);
        if st.failing.contains(op) {
            return Err(Error::External(format!("{op} refused")));
        }
        Ok(())
    }

    fn next_ref(&self, chat_id: ChatId) -> MessageRef {
        let mut st = self.state.lock().unwrap();
        st.next_id += 1;
        MessageRef::new(chat_id, MessageId(10_000 + st.next_id))
    }
}

#[async_trait]
impl MessagingPort for RecordingPort {
    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
        self.record(Call::SendHtml(chat_id, html.to_string()), "send")?;
        Ok(self.next_ref(chat_id))
    }

    async fn reply_html(&self, to: MessageRef, html: &str) -> Result<MessageRef> {
        self.record(Call::ReplyHtml(to, html.to_string()), "send")?;
        Ok(self.next_ref(to.chat_id))
    }

    async fn reply_text(&self, to: MessageRef, text: &str) -> Result<MessageRef> {
        self.record(Call::ReplyText(to, text.to_string()), "send")?;
        Ok(self.next_ref(to.chat_id))
    }

    async fn delete_message(&self, msg: MessageRef) -> Result<()> {
        self.record(Call::Delete(msg), "delete")?;
        if self.state.lock().unwrap().undeletable.contains(&msg.message_id) {
            return Err(Error::External("message can't be deleted".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ModerationPort for RecordingPort {
    async fn member_status(&self, chat_id: ChatId, user_id: UserId) -> Result<MemberStatus> {
        self.record(Call::MemberStatus(chat_id, user_id), "member_status")?;
        let st = self.state.lock().unwrap();
        Ok(st
            .statuses
            .get(&user_id)
            .copied()
            .unwrap_or(MemberStatus::Member))
    }

    async fn ban(&self, chat_id: ChatId, user_id: UserId) -> Result<()> {
        self.record(Call::Ban(chat_id, user_id), "ban")
    }

    async fn unban(&self, chat_id: ChatId, user_id: UserId) -> Result<()> {
        self.record(Call::Unban(chat_id, user_id), "unban")
    }

    async fn restrict(
        &self,
        chat_id: ChatId,
        user_id: UserId,
        restriction: Restriction,
    ) -> Result<()> {
        self.record(Call::Restrict(chat_id, user_id, restriction), "restrict")
    }

    async fn set_admin_rights(
        &self,
        chat_id: ChatId,
        user_id: UserId,
        rights: AdminRights,
    ) -> Result<()> {
        self.record(Call::SetAdminRights(chat_id, user_id, rights), "set_admin_rights")
    }
}

pub const GROUP: ChatId = ChatId(-1001);
pub const ADMIN: UserId = UserId(1);
pub const MEMBER: UserId = UserId(2);

pub fn user(id: UserId, first_name: &str) -> ChatUser {
    ChatUser {
        id,
        first_name: first_name.to_string(),
        last_name: None,
        username: None,
        is_bot: false,
    }
}

/// `/name args` sent in `GROUP` by `from`, optionally replying to `target`.
pub fn command(from: UserId, text: &str, target: Option<UserId>) -> IncomingCommand {
    let (name, args) = text
        .trim_start_matches('/')
        .split_once(' ')
        .map(|(n, a)| (n.to_string(), a.trim().to_string()))
        .unwrap_or_else(|| (text.trim_start_matches('/').to_string(), String::new()));

    IncomingCommand {
        chat_id: GROUP,
        chat_kind: ChatKind::Group,
        message_id: MessageId(100),
        from: user(from, "Caller"),
        reply_to: target.map(|t| RepliedMessage {
            message_id: MessageId(90),
            from: Some(user(t, "Target")),
        }),
        name,
        args,
    }
}

/// Port where `ADMIN` is a chat administrator.
pub fn admin_port() -> RecordingPort {
    RecordingPort::new().with_status(ADMIN, MemberStatus::Administrator)
}
