use crate::{formatting::escape_html, Result};

use super::CommandContext;

pub(super) async fn id(ctx: &CommandContext<'_>) -> Result<()> {
    ctx.reply(&format!(
        "👤 You: <code>{}</code>\n💬 Chat: <code>{}</code>",
        ctx.cmd.from.id.0, ctx.cmd.chat_id.0
    ))
    .await
}

pub(super) async fn user_info(ctx: &CommandContext<'_>) -> Result<()> {
    let target = ctx.cmd.target().unwrap_or(&ctx.cmd.from);
    let username = target.username.as_deref().unwrap_or("N/A");
    ctx.reply(&format!(
        "👤 <b>{}</b>\nID: <code>{}</code>\nUsername: @{}\nIs bot: {}",
        escape_html(&target.full_name()),
        target.id.0,
        escape_html(username),
        target.is_bot
    ))
    .await
}

pub(super) async fn echo(ctx: &CommandContext<'_>) -> Result<()> {
    let text = ctx.args();
    if text.is_empty() {
        return ctx.reply("Usage: /echo &lt;text&gt;").await;
    }
    ctx.port.reply_text(ctx.cmd.message(), text).await?;
    Ok(())
}
