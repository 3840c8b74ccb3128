//! Bot commands: parsing, gating rules and the per-group handlers.

mod greetings;
mod moderation;
mod settings;
mod utility;

use crate::{
    domain::ChatKind,
    formatting::mention_html,
    manager::GroupManager,
    messaging::{port::ChatPort, types::IncomingCommand},
    Result,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    // Core
    Start,
    Help,
    Cmds,
    // Utilities
    Id,
    UserInfo,
    Echo,
    // Group settings
    Rules,
    SetRules,
    SetWarnLimit,
    AntiLink,
    SlowMode,
    Settings,
    // Moderation
    Warn,
    Warnings,
    ResetWarns,
    Mute,
    Unmute,
    Ban,
    Unban,
    Kick,
    Promote,
    Demote,
    Purge,
    // Welcome / goodbye
    SetWelcome,
    ResetWelcome,
    TestWelcome,
    SetGoodbye,
    ResetGoodbye,
    TestGoodbye,
}

/// Name and description of every command, in menu order.
pub const COMMANDS: &[(&str, &str)] = &[
    ("start", "Check that the bot is running"),
    ("help", "How to use the bot"),
    ("cmds", "Compact command list"),
    ("id", "Show your id and the chat id"),
    ("userinfo", "Info about you or the replied user"),
    ("echo", "Repeat the given text"),
    ("rules", "Show the group rules"),
    ("setrules", "Set the group rules"),
    ("setwarnlimit", "Warnings before an automatic ban"),
    ("antilink", "Mute users posting Telegram links (on|off)"),
    ("slowmode", "Seconds between messages per user (0 = off)"),
    ("settings", "Show the group settings"),
    ("warn", "Warn the replied user"),
    ("warnings", "Show warnings of the replied user"),
    ("resetwarns", "Clear warnings of the replied user"),
    ("mute", "Mute the replied user, optionally for 30s/10m/2h/1d"),
    ("unmute", "Unmute the replied user"),
    ("ban", "Ban the replied user"),
    ("unban", "Unban a user by id"),
    ("kick", "Remove the replied user"),
    ("promote", "Make the replied user an admin"),
    ("demote", "Remove admin rights from the replied user"),
    ("purge", "Delete messages from the replied one up to now"),
    ("setwelcome", "Set the welcome message"),
    ("resetwelcome", "Restore the default welcome message"),
    ("testwelcome", "Preview the welcome message"),
    ("setgoodbye", "Set the goodbye message"),
    ("resetgoodbye", "Restore the default goodbye message"),
    ("testgoodbye", "Preview the goodbye message"),
];

impl Command {
    pub fn parse(name: &str) -> Option<Self> {
        let cmd = match name.to_lowercase().as_str() {
            "start" => Self::Start,
            "help" => Self::Help,
            "cmds" => Self::Cmds,
            "id" => Self::Id,
            "userinfo" => Self::UserInfo,
            "echo" => Self::Echo,
            "rules" => Self::Rules,
            "setrules" => Self::SetRules,
            "setwarnlimit" => Self::SetWarnLimit,
            "antilink" => Self::AntiLink,
            "slowmode" => Self::SlowMode,
            "settings" => Self::Settings,
            "warn" => Self::Warn,
            "warnings" => Self::Warnings,
            "resetwarns" => Self::ResetWarns,
            "mute" => Self::Mute,
            "unmute" => Self::Unmute,
            "ban" => Self::Ban,
            "unban" => Self::Unban,
            "kick" => Self::Kick,
            "promote" => Self::Promote,
            "demote" => Self::Demote,
            "purge" => Self::Purge,
            "setwelcome" => Self::SetWelcome,
            "resetwelcome" => Self::ResetWelcome,
            "testwelcome" => Self::TestWelcome,
            "setgoodbye" => Self::SetGoodbye,
            "resetgoodbye" => Self::ResetGoodbye,
            "testgoodbye" => Self::TestGoodbye,
            _ => return None,
        };
        Some(cmd)
    }

    /// Only chat admins may run these, and only in groups.
    pub fn admin_only(self) -> bool {
        !matches!(
            self,
            Self::Start | Self::Help | Self::Cmds | Self::Id | Self::UserInfo | Self::Echo
        )
    }
}

pub(crate) const START_TEXT: &str = "🤖 Rose-like group manager running. Use /help or /cmds.";

pub(crate) const HELP_TEXT: &str = "📖 <b>Help</b>\n\n\
Use /cmds for a compact command list.\n\n\
Most moderation commands must be used by admins and by replying to the target user's message.";

pub(crate) const CMDS_TEXT: &str = "📋 <b>Command List</b>\n\n\
👮 Moderation:\n\
/warn, /warnings, /resetwarns, /mute, /unmute, /ban, /unban, /kick, /promote, /demote, /purge\n\n\
⚙️ Group Settings:\n\
/rules, /setrules, /setwarnlimit, /antilink, /slowmode, /settings\n\n\
👋 Welcome/Goodbye:\n\
/setwelcome, /resetwelcome, /testwelcome, /setgoodbye, /resetgoodbye, /testgoodbye\n\n\
🔧 Utilities:\n\
/id, /userinfo, /echo, /help, /cmds";

/// Per-invocation handler context.
pub(crate) struct CommandContext<'a> {
    pub mgr: &'a GroupManager,
    pub port: &'a dyn ChatPort,
    pub cmd: &'a IncomingCommand,
}

impl CommandContext<'_> {
    pub async fn reply(&self, html: &str) -> Result<()> {
        self.port.reply_html(self.cmd.message(), html).await?;
        Ok(())
    }

    pub fn args(&self) -> &str {
        self.cmd.args.trim()
    }

    /// First whitespace-separated argument.
    pub fn first_arg(&self) -> Option<&str> {
        self.cmd.args.split_whitespace().next()
    }
}

/// Checks the admin gate; replies and returns `false` when the caller may not proceed.
async fn admin_gate(ctx: &CommandContext<'_>) -> Result<bool> {
    let cmd = ctx.cmd;
    if cmd.chat_kind == ChatKind::Private {
        ctx.reply("❌ This command only works in groups.").await?;
        return Ok(false);
    }

    let status = match ctx.port.member_status(cmd.chat_id, cmd.from.id).await {
        Ok(status) => status,
        Err(e) => {
            ctx.reply(&format!(
                "❌ Admin check failed: {}",
                crate::formatting::escape_html(&e.to_string())
            ))
            .await?;
            return Ok(false);
        }
    };

    if !status.is_admin() {
        ctx.reply(&format!(
            "❌ {}, you are not an admin.\n\nYour status: <b>{status}</b>",
            mention_html(&cmd.from)
        ))
        .await?;
        return Ok(false);
    }
    Ok(true)
}

pub(crate) async fn dispatch(
    mgr: &GroupManager,
    port: &dyn ChatPort,
    cmd: &IncomingCommand,
) -> Result<()> {
    let Some(command) = Command::parse(&cmd.name) else {
        tracing::debug!(name = %cmd.name, "ignoring unknown command");
        return Ok(());
    };

    let ctx = CommandContext { mgr, port, cmd };
    if command.admin_only() && !admin_gate(&ctx).await? {
        return Ok(());
    }

    match command {
        Command::Start => ctx.reply(START_TEXT).await,
        Command::Help => ctx.reply(HELP_TEXT).await,
        Command::Cmds => ctx.reply(CMDS_TEXT).await,
        Command::Id => utility::id(&ctx).await,
        Command::UserInfo => utility::user_info(&ctx).await,
        Command::Echo => utility::echo(&ctx).await,

        Command::Rules => settings::rules(&ctx).await,
        Command::SetRules => settings::set_rules(&ctx).await,
        Command::SetWarnLimit => settings::set_warn_limit(&ctx).await,
        Command::AntiLink => settings::anti_link(&ctx).await,
        Command::SlowMode => settings::slow_mode(&ctx).await,
        Command::Settings => settings::show(&ctx).await,

        Command::Warn => moderation::warn(&ctx).await,
        Command::Warnings => moderation::warnings(&ctx).await,
        Command::ResetWarns => moderation::reset_warns(&ctx).await,
        Command::Mute => moderation::mute(&ctx).await,
        Command::Unmute => moderation::unmute(&ctx).await,
        Command::Ban => moderation::ban(&ctx).await,
        Command::Unban => moderation::unban(&ctx).await,
        Command::Kick => moderation::kick(&ctx).await,
        Command::Promote => moderation::promote(&ctx).await,
        Command::Demote => moderation::demote(&ctx).await,
        Command::Purge => moderation::purge(&ctx).await,

        Command::SetWelcome => greetings::set_welcome(&ctx).await,
        Command::ResetWelcome => greetings::reset_welcome(&ctx).await,
        Command::TestWelcome => greetings::test_welcome(&ctx).await,
        Command::SetGoodbye => greetings::set_goodbye(&ctx).await,
        Command::ResetGoodbye => greetings::reset_goodbye(&ctx).await,
        Command::TestGoodbye => greetings::test_goodbye(&ctx).await,
    }
}
