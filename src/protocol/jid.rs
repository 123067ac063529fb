//! Account and chat identifier helpers.
//!
//! Identifiers look like `15550100:12@s.whatsapp.net` (user, device 12) or
//! `120363000000@g.us` (group). Comparisons between users always go through
//! [`bare_number`] so device suffixes and domains never cause a mismatch.

/// Pseudo-chat that carries status updates.
pub const STATUS_BROADCAST: &str = "status@broadcast";

pub const GROUP_SUFFIX: &str = "@g.us";
pub const USER_DOMAIN: &str = "s.whatsapp.net";

pub fn is_group(jid: &str) -> bool {
    jid.ends_with(GROUP_SUFFIX)
}

pub fn is_status_broadcast(jid: &str) -> bool {
    jid == STATUS_BROADCAST
}

/// `15550100:12@s.whatsapp.net` -> `15550100`
pub fn bare_number(jid: &str) -> &str {
    let head = jid.split(':').next().unwrap_or(jid);
    head.split('@').next().unwrap_or(head)
}

/// Compare two user ids ignoring device suffix and domain.
pub fn same_user(a: &str, b: &str) -> bool {
    let (a, b) = (bare_number(a), bare_number(b));
    !a.is_empty() && a == b
}

/// Canonical user jid without device suffix.
pub fn user_jid(number_or_jid: &str) -> String {
    format!("{}@{}", bare_number(number_or_jid), USER_DOMAIN)
}

/// `@15550100`, the visible half of a mention.
pub fn mention_tag(jid: &str) -> String {
    format!("@{}", bare_number(jid))
}

/// Parse a user typed number such as `+1 555-0100` into a jid.
pub fn parse_number(input: &str) -> Option<String> {
    let digits: String = input.chars().filter(char::is_ascii_digit).collect();
    if digits.len() < 5 || digits.len() > 20 {
        return None;
    }
    Some(user_jid(&digits))
}
