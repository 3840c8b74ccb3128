use crate::{formatting::render_template, store::SettingUpdate, Result};

use super::CommandContext;

#[derive(Clone, Copy)]
enum Greeting {
    Welcome,
    Goodbye,
}

impl Greeting {
    fn label(self) -> &'static str {
        match self {
            Self::Welcome => "Welcome",
            Self::Goodbye => "Goodbye",
        }
    }

    fn command(self) -> &'static str {
        match self {
            Self::Welcome => "setwelcome",
            Self::Goodbye => "setgoodbye",
        }
    }

    fn update(self, text: String) -> SettingUpdate {
        match self {
            Self::Welcome => SettingUpdate::Welcome(text),
            Self::Goodbye => SettingUpdate::Goodbye(text),
        }
    }
}

async fn set(ctx: &CommandContext<'_>, kind: Greeting) -> Result<()> {
    let text = ctx.args();
    if text.is_empty() {
        return ctx
            .reply(&format!("Usage: /{} &lt;text&gt;", kind.command()))
            .await;
    }
    ctx.mgr
        .store()
        .update(ctx.cmd.chat_id, kind.update(text.to_string()))?;
    ctx.mgr.audit_action(ctx.cmd, None, kind.command(), Some(text));
    ctx.reply(&format!("✅ {} message updated.", kind.label()))
        .await
}

async fn reset(ctx: &CommandContext<'_>, kind: Greeting) -> Result<()> {
    let defaults = ctx.mgr.store().defaults();
    let text = match kind {
        Greeting::Welcome => defaults.welcome.clone(),
        Greeting::Goodbye => defaults.goodbye.clone(),
    };
    ctx.mgr.store().update(ctx.cmd.chat_id, kind.update(text))?;
    ctx.mgr
        .audit_action(ctx.cmd, None, &kind.command().replacen("set", "reset", 1), None);
    ctx.reply(&format!("✅ {} message reset.", kind.label()))
        .await
}

async fn preview(ctx: &CommandContext<'_>, kind: Greeting) -> Result<()> {
    let s = ctx.mgr.store().settings(ctx.cmd.chat_id)?;
    let template = match kind {
        Greeting::Welcome => &s.welcome,
        Greeting::Goodbye => &s.goodbye,
    };
    ctx.reply(&render_template(template, &ctx.cmd.from)).await
}

pub(super) async fn set_welcome(ctx: &CommandContext<'_>) -> Result<()> {
    set(ctx, Greeting::Welcome).await
}

pub(super) async fn reset_welcome(ctx: &CommandContext<'_>) -> Result<()> {
    reset(ctx, Greeting::Welcome).await
}

pub(super) async fn test_welcome(ctx: &CommandContext<'_>) -> Result<()> {
    preview(ctx, Greeting::Welcome).await
}

pub(super) async fn set_goodbye(ctx: &CommandContext<'_>) -> Result<()> {
    set(ctx, Greeting::Goodbye).await
}

pub(super) async fn reset_goodbye(ctx: &CommandContext<'_>) -> Result<()> {
    reset(ctx, Greeting::Goodbye).await
}

pub(super) async fn test_goodbye(ctx: &CommandContext<'_>) -> Result<()> {
    preview(ctx, Greeting::Goodbye).await
}
