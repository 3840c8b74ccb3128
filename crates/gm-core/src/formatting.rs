//! Formatting utilities for Telegram HTML parse mode (mentions, greeting templates).

use crate::domain::ChatUser;

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Clickable mention that works for users without a username.
pub fn mention_html(user: &ChatUser) -> String {
    format!(
        r#"<a href="tg://user?id={}">{}</a>"#,
        user.id.0,
        escape_html(&user.full_name())
    )
}

/// `mention (ID: <code>id</code>)`, used in moderation replies.
pub fn format_user(user: &ChatUser) -> String {
    format!("{} (ID: <code>{}</code>)", mention_html(user), user.id.0)
}

/// Render a welcome/goodbye template for `user`.
///
/// Placeholders: `{first}`, `{last}`, `{mention}`, `{id}`. `{{` and `}}` are
/// literal braces. A template with an unknown placeholder or a stray brace is
/// returned unchanged so admins see exactly what they typed.
pub fn render_template(template: &str, user: &ChatUser) -> String {
    try_render(template, user).unwrap_or_else(|| template.to_string())
}

fn try_render(template: &str, user: &ChatUser) -> Option<String> {
    let mut out = String::with_capacity(template.len() + 32);
    let mut chars = template.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '}' => return None,
            '{' => {
                let mut key = String::new();
                loop {
                    match chars.next()? {
                        '}' => break,
                        '{' => return None,
                        c => key.push(c),
                    }
                }
                out.push_str(&placeholder(&key, user)?);
            }
            other => out.push(other),
        }
    }

    Some(out)
}

fn placeholder(key: &str, user: &ChatUser) -> Option<String> {
    match key {
        "first" => Some(escape_html(&user.first_name)),
        "last" => Some(escape_html(user.last_name.as_deref().unwrap_or(""))),
        "mention" => Some(mention_html(user)),
        "id" => Some(user.id.0.to_string()),
        _ => None,
    }
}
