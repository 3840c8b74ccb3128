use chrono::Utc;

use crate::{
    domain::{ChatUser, MessageId, MessageRef, UserId},
    duration::parse_duration,
    formatting::{escape_html, format_user},
    messaging::types::{AdminRights, Restriction},
    Result,
};

use super::CommandContext;

/// The replied-to user, or `None` after replying with `hint`.
async fn target<'a>(ctx: &'a CommandContext<'_>, hint: &str) -> Result<Option<&'a ChatUser>> {
    match ctx.cmd.target() {
        Some(user) => Ok(Some(user)),
        None => {
            ctx.reply(hint).await?;
            Ok(None)
        }
    }
}

async fn report_failure(ctx: &CommandContext<'_>, what: &str, err: &crate::Error) -> Result<()> {
    tracing::warn!(chat_id = ctx.cmd.chat_id.0, action = what, error = %err, "moderation action failed");
    ctx.reply(&format!(
        "❌ Could not {what}: {}",
        escape_html(&err.to_string())
    ))
    .await
}

pub(super) async fn warn(ctx: &CommandContext<'_>) -> Result<()> {
    let Some(user) = target(ctx, "Reply to a user to warn.").await? else {
        return Ok(());
    };
    let chat_id = ctx.cmd.chat_id;
    let store = ctx.mgr.store();

    let count = store.add_warn(chat_id, user.id)?;
    let limit = store.settings(chat_id)?.warn_limit;

    if count < limit {
        ctx.mgr.audit_action(
            ctx.cmd,
            Some(user.id),
            "warn",
            Some(&format!("{count}/{limit}")),
        );
        return ctx
            .reply(&format!(
                "⚠️ {} warned ({count}/{limit}).",
                format_user(user)
            ))
            .await;
    }

    match ctx.port.ban(chat_id, user.id).await {
        Ok(()) => {
            store.set_warns(chat_id, user.id, 0)?;
            ctx.mgr.audit_action(
                ctx.cmd,
                Some(user.id),
                "ban",
                Some(&format!("warn limit {limit} reached")),
            );
            ctx.reply(&format!(
                "🚫 {} banned (warn limit {limit} reached).",
                format_user(user)
            ))
            .await
        }
        Err(e) => report_failure(ctx, "ban", &e).await,
    }
}

pub(super) async fn warnings(ctx: &CommandContext<'_>) -> Result<()> {
    let Some(user) = target(ctx, "Reply to a user to check warnings.").await? else {
        return Ok(());
    };
    let count = ctx.mgr.store().warns(ctx.cmd.chat_id, user.id)?;
    ctx.reply(&format!("⚠️ {} has {count} warnings.", format_user(user)))
        .await
}

pub(super) async fn reset_warns(ctx: &CommandContext<'_>) -> Result<()> {
    let Some(user) = target(ctx, "Reply to a user to reset warnings.").await? else {
        return Ok(());
    };
    ctx.mgr.store().set_warns(ctx.cmd.chat_id, user.id, 0)?;
    ctx.mgr.audit_action(ctx.cmd, Some(user.id), "resetwarns", None);
    ctx.reply(&format!("✅ Warnings reset for {}.", format_user(user)))
        .await
}

pub(super) async fn mute(ctx: &CommandContext<'_>) -> Result<()> {
    let Some(user) = target(ctx, "Reply to a user to mute.").await? else {
        return Ok(());
    };

    let arg = ctx.first_arg();
    let duration = match arg {
        None => None,
        Some(raw) => match parse_duration(raw) {
            Some(d) if d.is_zero() => None,
            Some(d) => Some(d),
            None => {
                return ctx
                    .reply("❌ Invalid duration. Use e.g. 30s, 10m, 2h, 1d.")
                    .await
            }
        },
    };

    let until = match duration {
        Some(d) => match chrono::Duration::from_std(d) {
            Ok(d) => Utc::now().checked_add_signed(d),
            Err(_) => None,
        },
        None => None,
    };

    match ctx
        .port
        .restrict(ctx.cmd.chat_id, user.id, Restriction::mute(until))
        .await
    {
        Ok(()) => {
            ctx.mgr.audit_action(ctx.cmd, Some(user.id), "mute", arg);
            let mut msg = format!("🔇 {} muted", format_user(user));
            if let (Some(raw), Some(_)) = (arg, duration) {
                msg.push_str(&format!(" for {}", escape_html(raw)));
            }
            ctx.reply(&msg).await
        }
        Err(e) => report_failure(ctx, "mute", &e).await,
    }
}

pub(super) async fn unmute(ctx: &CommandContext<'_>) -> Result<()> {
    let Some(user) = target(ctx, "Reply to a user to unmute.").await? else {
        return Ok(());
    };
    match ctx
        .port
        .restrict(ctx.cmd.chat_id, user.id, Restriction::unmute())
        .await
    {
        Ok(()) => {
            ctx.mgr.audit_action(ctx.cmd, Some(user.id), "unmute", None);
            ctx.reply(&format!("🔊 {} unmuted.", format_user(user)))
                .await
        }
        Err(e) => report_failure(ctx, "unmute", &e).await,
    }
}

pub(super) async fn ban(ctx: &CommandContext<'_>) -> Result<()> {
    let Some(user) = target(ctx, "Reply to a user to ban.").await? else {
        return Ok(());
    };
    match ctx.port.ban(ctx.cmd.chat_id, user.id).await {
        Ok(()) => {
            ctx.mgr.audit_action(ctx.cmd, Some(user.id), "ban", None);
            ctx.reply(&format!("🚫 {} banned.", format_user(user)))
                .await
        }
        Err(e) => report_failure(ctx, "ban", &e).await,
    }
}

pub(super) async fn unban(ctx: &CommandContext<'_>) -> Result<()> {
    let Some(arg) = ctx.first_arg() else {
        return ctx.reply("Usage: /unban &lt;user_id&gt;").await;
    };
    let Ok(id) = arg.parse::<i64>() else {
        return ctx
            .reply(&format!(
                "❌ Could not unban: invalid user id {}",
                escape_html(arg)
            ))
            .await;
    };
    let user_id = UserId(id);
    match ctx.port.unban(ctx.cmd.chat_id, user_id).await {
        Ok(()) => {
            ctx.mgr.audit_action(ctx.cmd, Some(user_id), "unban", None);
            ctx.reply(&format!("✅ Unbanned <code>{id}</code>")).await
        }
        Err(e) => report_failure(ctx, "unban", &e).await,
    }
}

pub(super) async fn kick(ctx: &CommandContext<'_>) -> Result<()> {
    let Some(user) = target(ctx, "Reply to a user to kick.").await? else {
        return Ok(());
    };
    let chat_id = ctx.cmd.chat_id;

    // Banning removes the user; the unban lets them rejoin later.
    let res = match ctx.port.ban(chat_id, user.id).await {
        Ok(()) => ctx.port.unban(chat_id, user.id).await,
        Err(e) => Err(e),
    };
    match res {
        Ok(()) => {
            ctx.mgr.audit_action(ctx.cmd, Some(user.id), "kick", None);
            ctx.reply(&format!("👢 {} kicked.", format_user(user)))
                .await
        }
        Err(e) => report_failure(ctx, "kick", &e).await,
    }
}

pub(super) async fn promote(ctx: &CommandContext<'_>) -> Result<()> {
    let Some(user) = target(ctx, "Reply to a user to promote.").await? else {
        return Ok(());
    };
    match ctx
        .port
        .set_admin_rights(ctx.cmd.chat_id, user.id, AdminRights::moderator())
        .await
    {
        Ok(()) => {
            ctx.mgr.audit_action(ctx.cmd, Some(user.id), "promote", None);
            ctx.reply(&format!("⬆️ {} promoted to admin.", format_user(user)))
                .await
        }
        Err(e) => report_failure(ctx, "promote", &e).await,
    }
}

pub(super) async fn demote(ctx: &CommandContext<'_>) -> Result<()> {
    let Some(user) = target(ctx, "Reply to a user to demote.").await? else {
        return Ok(());
    };
    match ctx
        .port
        .set_admin_rights(ctx.cmd.chat_id, user.id, AdminRights::none())
        .await
    {
        Ok(()) => {
            ctx.mgr.audit_action(ctx.cmd, Some(user.id), "demote", None);
            ctx.reply(&format!("⬇️ {} demoted.", format_user(user)))
                .await
        }
        Err(e) => report_failure(ctx, "demote", &e).await,
    }
}

pub(super) async fn purge(ctx: &CommandContext<'_>) -> Result<()> {
    let Some(replied) = ctx.cmd.reply_to.as_ref() else {
        return ctx
            .reply("Reply to a message to start purging from.")
            .await;
    };
    let chat_id = ctx.cmd.chat_id;
    let end = ctx.cmd.message_id.0;
    let max = i32::try_from(ctx.mgr.protection().max_purge).unwrap_or(i32::MAX);
    let start = replied.message_id.0.max(end.saturating_sub(max - 1));

    let mut deleted = 0usize;
    let mut last_err = None;
    for id in start..=end {
        match ctx
            .port
            .delete_message(MessageRef::new(chat_id, MessageId(id)))
            .await
        {
            Ok(()) => deleted += 1,
            Err(e) => last_err = Some(e),
        }
    }

    if deleted == 0 {
        if let Some(e) = last_err {
            return report_failure(ctx, "purge", &e).await;
        }
    }
    ctx.mgr.audit_action(
        ctx.cmd,
        None,
        "purge",
        Some(&format!("{deleted} messages from {start} to {end}")),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::{
        domain::{MessageId, MessageRef},
        manager::{GroupManager, ProtectionSettings},
        messaging::types::{AdminRights, Restriction},
        store::SettingUpdate,
        testing::{admin_port, command, Call, ADMIN, GROUP, MEMBER},
    };

    #[tokio::test]
    async fn warn_escalates_to_ban_at_limit() {
        let mgr = GroupManager::in_memory();
        let port = admin_port();
        mgr.store()
            .update(GROUP, SettingUpdate::WarnLimit(2))
            .unwrap();

        mgr.handle_command(&port, command(ADMIN, "/warn", Some(MEMBER)))
            .await
            .unwrap();
        assert!(port.last_text().unwrap().contains("warned (1/2)."));
        assert!(port.actions().is_empty());

        mgr.handle_command(&port, command(ADMIN, "/warn", Some(MEMBER)))
            .await
            .unwrap();
        assert!(port
            .last_text()
            .unwrap()
            .contains("banned (warn limit 2 reached)."));
        assert_eq!(port.actions(), vec![Call::Ban(GROUP, MEMBER)]);
        assert_eq!(mgr.store().warns(GROUP, MEMBER).unwrap(), 0);
    }

    #[tokio::test]
    async fn failed_escalation_keeps_warns() {
        let mgr = GroupManager::in_memory();
        let port = admin_port().failing("ban");
        mgr.store()
            .update(GROUP, SettingUpdate::WarnLimit(1))
            .unwrap();

        mgr.handle_command(&port, command(ADMIN, "/warn", Some(MEMBER)))
            .await
            .unwrap();
        assert!(port
            .last_text()
            .unwrap()
            .starts_with("❌ Could not ban: "));
        assert_eq!(mgr.store().warns(GROUP, MEMBER).unwrap(), 1);
    }

    #[tokio::test]
    async fn reply_target_is_required() {
        let mgr = GroupManager::in_memory();
        let port = admin_port();
        for (cmd, hint) in [
            ("/warn", "Reply to a user to warn."),
            ("/mute 5m", "Reply to a user to mute."),
            ("/kick", "Reply to a user to kick."),
            ("/purge", "Reply to a message to start purging from."),
        ] {
            mgr.handle_command(&port, command(ADMIN, cmd, None))
                .await
                .unwrap();
            assert_eq!(port.last_text().unwrap(), hint);
        }
        assert!(port.actions().is_empty());
    }

    #[tokio::test]
    async fn warnings_and_reset() {
        let mgr = GroupManager::in_memory();
        let port = admin_port();
        mgr.store().set_warns(GROUP, MEMBER, 2).unwrap();

        mgr.handle_command(&port, command(ADMIN, "/warnings", Some(MEMBER)))
            .await
            .unwrap();
        assert!(port.last_text().unwrap().ends_with("has 2 warnings."));

        mgr.handle_command(&port, command(ADMIN, "/resetwarns", Some(MEMBER)))
            .await
            .unwrap();
        assert!(port.last_text().unwrap().starts_with("✅ Warnings reset for "));
        assert_eq!(mgr.store().warns(GROUP, MEMBER).unwrap(), 0);
    }

    #[tokio::test]
    async fn timed_mute_sets_expiry() {
        let mgr = GroupManager::in_memory();
        let port = admin_port();
        let before = chrono::Utc::now();

        mgr.handle_command(&port, command(ADMIN, "/mute 10m", Some(MEMBER)))
            .await
            .unwrap();

        let Some(Call::Restrict(chat, user, r)) = port.actions().pop() else {
            panic!("expected a restrict call");
        };
        assert_eq!((chat, user), (GROUP, MEMBER));
        assert!(!r.can_send_messages);
        let until = r.until.expect("timed mute");
        let secs = (until - before).num_seconds();
        assert!((599..=601).contains(&secs), "unexpected expiry {secs}s");
        assert!(port.last_text().unwrap().ends_with("muted for 10m"));
    }

    #[tokio::test]
    async fn mute_without_duration_is_permanent() {
        let mgr = GroupManager::in_memory();
        let port = admin_port();
        mgr.handle_command(&port, command(ADMIN, "/mute", Some(MEMBER)))
            .await
            .unwrap();
        assert_eq!(
            port.actions(),
            vec![Call::Restrict(GROUP, MEMBER, Restriction::mute(None))]
        );
        assert!(port.last_text().unwrap().ends_with(" muted"));
    }

    #[tokio::test]
    async fn bad_mute_duration_does_nothing() {
        let mgr = GroupManager::in_memory();
        let port = admin_port();
        mgr.handle_command(&port, command(ADMIN, "/mute soon", Some(MEMBER)))
            .await
            .unwrap();
        assert!(port.actions().is_empty());
        assert!(port.last_text().unwrap().starts_with("❌ Invalid duration."));
    }

    #[tokio::test]
    async fn unmute_restores_sending() {
        let mgr = GroupManager::in_memory();
        let port = admin_port();
        mgr.handle_command(&port, command(ADMIN, "/unmute", Some(MEMBER)))
            .await
            .unwrap();
        assert_eq!(
            port.actions(),
            vec![Call::Restrict(GROUP, MEMBER, Restriction::unmute())]
        );
    }

    #[tokio::test]
    async fn ban_failure_is_reported() {
        let mgr = GroupManager::in_memory();
        let port = admin_port().failing("ban");
        mgr.handle_command(&port, command(ADMIN, "/ban", Some(MEMBER)))
            .await
            .unwrap();
        assert_eq!(
            port.last_text().unwrap(),
            "❌ Could not ban: external error: ban refused"
        );
    }

    #[tokio::test]
    async fn unban_by_id() {
        let mgr = GroupManager::in_memory();
        let port = admin_port();

        mgr.handle_command(&port, command(ADMIN, "/unban", None))
            .await
            .unwrap();
        assert_eq!(port.last_text().unwrap(), "Usage: /unban &lt;user_id&gt;");

        mgr.handle_command(&port, command(ADMIN, "/unban abc", None))
            .await
            .unwrap();
        assert!(port.last_text().unwrap().starts_with("❌ Could not unban:"));

        mgr.handle_command(&port, command(ADMIN, "/unban 555", None))
            .await
            .unwrap();
        assert_eq!(port.last_text().unwrap(), "✅ Unbanned <code>555</code>");
        assert_eq!(
            port.actions(),
            vec![Call::Unban(GROUP, crate::domain::UserId(555))]
        );
    }

    #[tokio::test]
    async fn kick_bans_then_unbans() {
        let mgr = GroupManager::in_memory();
        let port = admin_port();
        mgr.handle_command(&port, command(ADMIN, "/kick", Some(MEMBER)))
            .await
            .unwrap();
        assert_eq!(
            port.actions(),
            vec![Call::Ban(GROUP, MEMBER), Call::Unban(GROUP, MEMBER)]
        );
        assert!(port.last_text().unwrap().ends_with("kicked."));
    }

    #[tokio::test]
    async fn promote_and_demote_rights() {
        let mgr = GroupManager::in_memory();
        let port = admin_port();
        mgr.handle_command(&port, command(ADMIN, "/promote", Some(MEMBER)))
            .await
            .unwrap();
        mgr.handle_command(&port, command(ADMIN, "/demote", Some(MEMBER)))
            .await
            .unwrap();
        assert_eq!(
            port.actions(),
            vec![
                Call::SetAdminRights(GROUP, MEMBER, AdminRights::moderator()),
                Call::SetAdminRights(GROUP, MEMBER, AdminRights::none()),
            ]
        );
        assert!(!AdminRights::moderator().can_promote_members);
    }

    #[tokio::test]
    async fn purge_deletes_inclusive_range_and_skips_failures() {
        let mgr = GroupManager::in_memory();
        let port = admin_port().undeletable(MessageId(95));

        // Replies to message 90, command is message 100.
        mgr.handle_command(&port, command(ADMIN, "/purge", Some(MEMBER)))
            .await
            .unwrap();

        let deleted: Vec<i32> = port
            .actions()
            .into_iter()
            .filter_map(|c| match c {
                Call::Delete(MessageRef { message_id, .. }) => Some(message_id.0),
                _ => None,
            })
            .collect();
        assert_eq!(deleted, (90..=100).collect::<Vec<_>>());
        // Silent on success.
        assert!(port.sent_texts().is_empty());
    }

    fn deleted_ids(port: &crate::testing::RecordingPort) -> Vec<i32> {
        port.actions()
            .into_iter()
            .filter_map(|c| match c {
                Call::Delete(MessageRef { message_id, .. }) => Some(message_id.0),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn purge_stops_at_max_purge() {
        let mgr = GroupManager::in_memory_with(ProtectionSettings {
            max_purge: 3,
            ..ProtectionSettings::default()
        });
        let port = admin_port();

        mgr.handle_command(&port, command(ADMIN, "/purge", Some(MEMBER)))
            .await
            .unwrap();
        assert_eq!(deleted_ids(&port), vec![98, 99, 100]);
    }

    #[tokio::test]
    async fn purge_cap_of_one_deletes_only_the_command() {
        let mgr = GroupManager::in_memory_with(ProtectionSettings {
            max_purge: 1,
            ..ProtectionSettings::default()
        });
        let port = admin_port();

        mgr.handle_command(&port, command(ADMIN, "/purge", Some(MEMBER)))
            .await
            .unwrap();
        assert_eq!(deleted_ids(&port), vec![100]);
    }

    #[tokio::test]
    async fn purge_reports_total_failure() {
        let mgr = GroupManager::in_memory();
        let port = admin_port().failing("delete");
        mgr.handle_command(&port, command(ADMIN, "/purge", Some(MEMBER)))
            .await
            .unwrap();
        assert!(port
            .last_text()
            .unwrap()
            .starts_with("❌ Could not purge:"));
    }
}
