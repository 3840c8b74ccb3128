use crate::{formatting::escape_html, store::SettingUpdate, Result};

use super::CommandContext;

pub(super) async fn rules(ctx: &CommandContext<'_>) -> Result<()> {
    let s = ctx.mgr.store().settings(ctx.cmd.chat_id)?;
    ctx.reply(&format!("📜 <b>Rules</b>:\n{}", s.rules)).await
}

pub(super) async fn set_rules(ctx: &CommandContext<'_>) -> Result<()> {
    let text = ctx.args();
    if text.is_empty() {
        return ctx.reply("Usage: /setrules &lt;text&gt;").await;
    }
    ctx.mgr
        .store()
        .update(ctx.cmd.chat_id, SettingUpdate::Rules(text.to_string()))?;
    ctx.mgr.audit_action(ctx.cmd, None, "setrules", None);
    ctx.reply("✅ Rules updated.").await
}

pub(super) async fn set_warn_limit(ctx: &CommandContext<'_>) -> Result<()> {
    let Some(arg) = ctx.first_arg() else {
        return ctx.reply("Usage: /setwarnlimit &lt;n&gt;").await;
    };
    let n = match arg.parse::<u32>() {
        Ok(n) if n >= 1 => n,
        _ => return ctx.reply("❌ Invalid number.").await,
    };
    ctx.mgr
        .store()
        .update(ctx.cmd.chat_id, SettingUpdate::WarnLimit(n))?;
    ctx.mgr
        .audit_action(ctx.cmd, None, "setwarnlimit", Some(&n.to_string()));
    ctx.reply(&format!("✅ Warn limit set to {n}.")).await
}

pub(super) async fn anti_link(ctx: &CommandContext<'_>) -> Result<()> {
    let enabled = match ctx.first_arg().map(str::to_lowercase).as_deref() {
        Some("on") => true,
        Some("off") => false,
        _ => return ctx.reply("Usage: /antilink on|off").await,
    };
    ctx.mgr
        .store()
        .update(ctx.cmd.chat_id, SettingUpdate::AntiLink(enabled))?;
    ctx.mgr.audit_action(
        ctx.cmd,
        None,
        "antilink",
        Some(if enabled { "on" } else { "off" }),
    );
    ctx.reply(&format!(
        "✅ Anti-link {}.",
        if enabled { "enabled" } else { "disabled" }
    ))
    .await
}

pub(super) async fn slow_mode(ctx: &CommandContext<'_>) -> Result<()> {
    let Some(arg) = ctx.first_arg() else {
        return ctx.reply("Usage: /slowmode &lt;seconds&gt;").await;
    };
    let Ok(secs) = arg.parse::<u32>() else {
        return ctx.reply("❌ Invalid number.").await;
    };
    ctx.mgr
        .store()
        .update(ctx.cmd.chat_id, SettingUpdate::SlowMode(secs))?;
    ctx.mgr
        .audit_action(ctx.cmd, None, "slowmode", Some(&secs.to_string()));
    ctx.reply(&format!("✅ Slowmode set to {secs} seconds.")).await
}

pub(super) async fn show(ctx: &CommandContext<'_>) -> Result<()> {
    let s = ctx.mgr.store().settings(ctx.cmd.chat_id)?;
    ctx.reply(&format!(
        "⚙️ <b>Group Settings</b>\n\n\
Rules: {}\n\
Warn limit: {}\n\
Anti-link: {}\n\
Slowmode: {} sec\n\
Welcome: {}\n\
Goodbye: {}",
        s.rules,
        s.warn_limit,
        if s.anti_link { "ON" } else { "OFF" },
        s.slow_mode,
        escape_html(&s.welcome),
        escape_html(&s.goodbye),
    ))
    .await
}

#[cfg(test)]
mod tests {
    use crate::{
        manager::GroupManager,
        testing::{admin_port, command, ADMIN, GROUP},
    };

    #[tokio::test]
    async fn setrules_keeps_line_breaks() {
        let mgr = GroupManager::in_memory();
        let port = admin_port();
        mgr.handle_command(&port, command(ADMIN, "/setrules 1. be kind\n2. no spam", None))
            .await
            .unwrap();
        assert_eq!(port.last_text().unwrap(), "✅ Rules updated.");

        mgr.handle_command(&port, command(ADMIN, "/rules", None))
            .await
            .unwrap();
        assert_eq!(
            port.last_text().unwrap(),
            "📜 <b>Rules</b>:\n1. be kind\n2. no spam"
        );
    }

    #[tokio::test]
    async fn setrules_without_text_shows_usage() {
        let mgr = GroupManager::in_memory();
        let port = admin_port();
        mgr.handle_command(&port, command(ADMIN, "/setrules   ", None))
            .await
            .unwrap();
        assert_eq!(port.last_text().unwrap(), "Usage: /setrules &lt;text&gt;");
    }

    #[tokio::test]
    async fn warn_limit_must_be_positive() {
        let mgr = GroupManager::in_memory();
        let port = admin_port();

        for bad in ["/setwarnlimit 0", "/setwarnlimit -2", "/setwarnlimit many"] {
            mgr.handle_command(&port, command(ADMIN, bad, None))
                .await
                .unwrap();
            assert_eq!(port.last_text().unwrap(), "❌ Invalid number.");
        }
        assert_eq!(mgr.store().settings(GROUP).unwrap().warn_limit, 3);

        mgr.handle_command(&port, command(ADMIN, "/setwarnlimit 5", None))
            .await
            .unwrap();
        assert_eq!(port.last_text().unwrap(), "✅ Warn limit set to 5.");
        assert_eq!(mgr.store().settings(GROUP).unwrap().warn_limit, 5);
    }

    #[tokio::test]
    async fn antilink_toggles() {
        let mgr = GroupManager::in_memory();
        let port = admin_port();

        mgr.handle_command(&port, command(ADMIN, "/antilink ON", None))
            .await
            .unwrap();
        assert_eq!(port.last_text().unwrap(), "✅ Anti-link enabled.");
        assert!(mgr.store().settings(GROUP).unwrap().anti_link);

        mgr.handle_command(&port, command(ADMIN, "/antilink maybe", None))
            .await
            .unwrap();
        assert_eq!(port.last_text().unwrap(), "Usage: /antilink on|off");
        assert!(mgr.store().settings(GROUP).unwrap().anti_link);
    }

    #[tokio::test]
    async fn slowmode_and_settings_summary() {
        let mgr = GroupManager::in_memory();
        let port = admin_port();

        mgr.handle_command(&port, command(ADMIN, "/slowmode 10", None))
            .await
            .unwrap();
        assert_eq!(port.last_text().unwrap(), "✅ Slowmode set to 10 seconds.");

        mgr.handle_command(&port, command(ADMIN, "/slowmode", None))
            .await
            .unwrap();
        assert_eq!(port.last_text().unwrap(), "Usage: /slowmode &lt;seconds&gt;");

        mgr.handle_command(&port, command(ADMIN, "/settings", None))
            .await
            .unwrap();
        let text = port.last_text().unwrap();
        assert!(text.contains("Slowmode: 10 sec"));
        assert!(text.contains("Anti-link: OFF"));
        assert!(text.contains("Warn limit: 3"));
        assert!(text.contains("Welcome: 👋 &lt;b&gt;Welcome {mention}!&lt;/b&gt;"));
    }
}
