//! Reactions to non-command updates: greetings and the automatic protections.

use std::time::{Duration, Instant};

use chrono::Utc;

use crate::{
    audit::AuditEvent,
    domain::{ChatKind, ChatUser},
    duration::format_duration,
    formatting::{mention_html, render_template},
    manager::GroupManager,
    messaging::{
        port::ChatPort,
        types::{IncomingText, MembershipChange, MembershipEvent, Restriction},
    },
    protection::link_detected,
    Result,
};

pub(crate) async fn greet(
    mgr: &GroupManager,
    port: &dyn ChatPort,
    event: &MembershipEvent,
) -> Result<()> {
    let settings = mgr.store().settings(event.chat_id)?;

    let (template, users): (&str, Vec<&ChatUser>) = match &event.change {
        MembershipChange::Joined(users) => (
            settings.welcome.as_str(),
            users
                .iter()
                .filter(|u| Some(u.id) != mgr.bot_id())
                .collect(),
        ),
        MembershipChange::Left(user) => (settings.goodbye.as_str(), vec![user]),
    };

    for user in users {
        let text = render_template(template, user);
        if let Err(e) = port.reply_html(event.message(), &text).await {
            tracing::warn!(
                chat_id = event.chat_id.0,
                user_id = user.id.0,
                error = %e,
                "greeting failed"
            );
        }
    }
    Ok(())
}

enum Verdict {
    Allow,
    TooSoon(Duration),
    Spam(usize),
}

pub(crate) async fn protect(
    mgr: &GroupManager,
    port: &dyn ChatPort,
    msg: &IncomingText,
    now: Instant,
) -> Result<()> {
    if msg.chat_kind != ChatKind::Group {
        return Ok(());
    }
    let settings = mgr.store().settings(msg.chat_id)?;
    let p = *mgr.protection();

    if settings.anti_link && link_detected(&msg.text) {
        auto_mute(
            mgr,
            port,
            msg,
            p.link_mute,
            "link",
            &format!("🚫 {} muted for sending links.", mention_html(&msg.from)),
        )
        .await;
        return Ok(());
    }

    let key = (msg.chat_id, msg.from.id);
    let verdict = {
        let mut tracker = mgr.activity.lock().await;
        let interval = Duration::from_secs(u64::from(settings.slow_mode));
        if let Some(wait) = tracker.check_slow_mode_at(key, interval, now) {
            Verdict::TooSoon(wait)
        } else {
            let count = tracker.record_at(key, p.spam_window, interval, now);
            if count > p.spam_threshold {
                tracker.reset(key);
                Verdict::Spam(count)
            } else {
                Verdict::Allow
            }
        }
    };

    match verdict {
        Verdict::Allow => {}
        Verdict::TooSoon(wait) => {
            tracing::debug!(
                chat_id = msg.chat_id.0,
                user_id = msg.from.id.0,
                wait = %format_duration(wait),
                "slow mode: deleting message"
            );
            if let Err(e) = port.delete_message(msg.message()).await {
                tracing::warn!(chat_id = msg.chat_id.0, error = %e, "slow mode delete failed");
            }
        }
        Verdict::Spam(count) => {
            tracing::debug!(chat_id = msg.chat_id.0, user_id = msg.from.id.0, count, "spam detected");
            auto_mute(
                mgr,
                port,
                msg,
                p.spam_mute,
                "spam",
                &format!("🤖 {} auto-muted for spamming.", mention_html(&msg.from)),
            )
            .await;
        }
    }
    Ok(())
}

/// Delete the offending message, mute its sender for `mute_for` and announce it.
async fn auto_mute(
    mgr: &GroupManager,
    port: &dyn ChatPort,
    msg: &IncomingText,
    mute_for: Duration,
    reason: &str,
    announcement: &str,
) {
    let chat_id = msg.chat_id;
    let user_id = msg.from.id;

    if let Err(e) = port.delete_message(msg.message()).await {
        tracing::warn!(chat_id = chat_id.0, reason, error = %e, "auto-delete failed");
    }

    let until = chrono::Duration::from_std(mute_for)
        .ok()
        .and_then(|d| Utc::now().checked_add_signed(d));
    if let Err(e) = port
        .restrict(chat_id, user_id, Restriction::mute(until))
        .await
    {
        tracing::warn!(chat_id = chat_id.0, user_id = user_id.0, reason, error = %e, "auto-mute failed");
        mgr.audit(AuditEvent::error(chat_id, "auto-mute", &e.to_string()));
        return;
    }

    tracing::info!(
        chat_id = chat_id.0,
        user_id = user_id.0,
        reason,
        duration = %format_duration(mute_for),
        "auto-muted"
    );
    mgr.audit(AuditEvent::automatic(
        chat_id,
        user_id,
        "mute",
        &format!("{reason}, {}", format_duration(mute_for)),
    ));

    if let Err(e) = port.send_html(chat_id, announcement).await {
        tracing::warn!(chat_id = chat_id.0, error = %e, "auto-mute announcement failed");
    }
}
