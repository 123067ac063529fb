//! Turns an [`InboundMessage`] into the immutable [`InboundEvent`] every later
//! stage works on.
//!
//! Text is taken from the first non-empty of: conversation, extended text,
//! image caption, video caption, button reply id. It is lowercased, every
//! `.` followed by whitespace collapses to a bare `.` (so `. ping` and
//! `.ping` are the same command), and the result is trimmed.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::protocol::{
    InboundMessage, MessageContent, MessageKind, MessageRef, jid,
};

static DOT_SPACING: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.\s+").expect("valid regex"));

/// Prefix-triggered command split out of a message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedCommand {
    pub prefix: Option<char>,
    /// Lowercased first word after the prefix; empty for non-commands.
    pub token: String,
    /// Lowercased text after the prefix (what word-matched commands test).
    pub body: String,
    /// Everything after the token in its original casing.
    pub args_raw: String,
    /// `args_raw` split on whitespace.
    pub args: Vec<String>,
}

impl NormalizedCommand {
    pub fn is_command(&self) -> bool {
        !self.token.is_empty()
    }

    /// Lowercased argument at `index`.
    pub fn arg_lower(&self, index: usize) -> Option<String> {
        self.args.get(index).map(|a| a.to_lowercase())
    }
}

/// The message a reply points at.
#[derive(Debug, Clone)]
pub struct QuotedMessage {
    pub id: Option<String>,
    pub participant: Option<String>,
    /// Chat the quoted message lives in, when it differs from the current one.
    pub remote_chat: Option<String>,
    pub content: Option<MessageContent>,
}

#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub id: String,
    pub chat_id: String,
    pub sender_id: String,
    pub is_group: bool,
    pub from_self: bool,
    pub push_name: Option<String>,
    pub timestamp: i64,
    pub kind: MessageKind,
    /// Normalized lowercase text; empty for unsupported kinds.
    pub text: String,
    /// Same sources minus the button id, original casing.
    pub raw_text: String,
    pub mentioned: Vec<String>,
    pub quoted: Option<QuotedMessage>,
    pub command: NormalizedCommand,
    pub content: MessageContent,
}

impl InboundEvent {
    pub fn is_command(&self) -> bool {
        self.command.is_command()
    }

    /// Key to quote or delete this message.
    pub fn message_ref(&self) -> MessageRef {
        MessageRef {
            chat_id: self.chat_id.clone(),
            id: self.id.clone(),
            participant: self.is_group.then(|| self.sender_id.clone()),
            from_me: self.from_self,
        }
    }
}

/// First non-empty text field, including the button reply id.
pub fn extract_text(content: &MessageContent) -> &str {
    let button = content
        .buttons_response_message
        .as_ref()
        .and_then(|b| b.selected_button_id.as_deref());
    first_non_empty(text_sources(content).chain(std::iter::once(button)))
}

/// Like [`extract_text`] but without the button reply id.
pub fn extract_raw_text(content: &MessageContent) -> &str {
    first_non_empty(text_sources(content))
}

fn text_sources(content: &MessageContent) -> impl Iterator<Item = Option<&str>> {
    [
        content.conversation.as_deref(),
        content
            .extended_text_message
            .as_ref()
            .and_then(|m| m.text.as_deref()),
        content
            .image_message
            .as_ref()
            .and_then(|m| m.caption.as_deref()),
        content
            .video_message
            .as_ref()
            .and_then(|m| m.caption.as_deref()),
    ]
    .into_iter()
}

fn first_non_empty<'a>(mut sources: impl Iterator<Item = Option<&'a str>>) -> &'a str {
    sources
        .find_map(|s| s.filter(|s| !s.trim().is_empty()))
        .unwrap_or("")
}

/// Lowercase, collapse `.` + whitespace into `.`, trim.
pub fn normalize_text(text: &str) -> String {
    let lower = text.to_lowercase();
    DOT_SPACING.replace_all(&lower, ".").trim().to_string()
}

/// Split a normalized text into a command if it starts with one of `prefixes`.
pub fn parse_command(text: &str, raw_text: &str, prefixes: &[char]) -> NormalizedCommand {
    let Some(prefix) = text.chars().next().filter(|c| prefixes.contains(c)) else {
        return NormalizedCommand::default();
    };

    let body = text[prefix.len_utf8()..].to_string();
    let token = body.split_whitespace().next().unwrap_or("").to_string();
    if token.is_empty() {
        return NormalizedCommand::default();
    }

    let args_raw = raw_args(raw_text, prefix);
    let args = args_raw.split_whitespace().map(str::to_string).collect();

    NormalizedCommand {
        prefix: Some(prefix),
        token,
        body,
        args_raw,
        args,
    }
}

/// Raw text with the prefix and the first word removed.
fn raw_args(raw_text: &str, prefix: char) -> String {
    let trimmed = raw_text.trim();
    let rest = trimmed.strip_prefix(prefix).unwrap_or(trimmed).trim_start();
    match rest.find(char::is_whitespace) {
        Some(idx) => rest[idx..].trim().to_string(),
        None => String::new(),
    }
}

pub fn normalize(message: InboundMessage, prefixes: &[char]) -> InboundEvent {
    let text = normalize_text(extract_text(&message.content));
    let raw_text = extract_raw_text(&message.content).trim().to_string();
    let command = parse_command(&text, &raw_text, prefixes);

    let context = message.content.context_info();
    let mentioned = context
        .map(|c| c.mentioned_jid.clone())
        .unwrap_or_default();
    let quoted = context
        .filter(|c| c.stanza_id.is_some() || c.quoted_message.is_some())
        .map(|c| QuotedMessage {
            id: c.stanza_id.clone(),
            participant: c.participant.clone(),
            remote_chat: c.remote_jid.clone(),
            content: c.quoted_message.as_deref().cloned(),
        });

    InboundEvent {
        is_group: jid::is_group(&message.chat_id),
        kind: message.content.kind(),
        id: message.id,
        chat_id: message.chat_id,
        sender_id: message.sender_id,
        from_self: message.from_self,
        push_name: message.push_name,
        timestamp: message.timestamp,
        text,
        raw_text,
        mentioned,
        quoted,
        command,
        content: message.content,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ButtonsResponse, ContextInfo, ExtendedText, MediaMessage};

    const PREFIXES: &[char] = &['.', '!'];

    fn text_message(text: &str) -> InboundMessage {
        InboundMessage {
            id: "ID1".into(),
            chat_id: "120363@g.us".into(),
            sender_id: "1555@s.whatsapp.net".into(),
            from_self: false,
            push_name: None,
            timestamp: 0,
            content: MessageContent {
                conversation: Some(text.into()),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_dot_space_collapses() {
        let event = normalize(text_message(".  Ping   now"), PREFIXES);
        assert_eq!(event.text, ".ping   now");
        assert_eq!(event.command.token, "ping");
        assert_eq!(event.command.args, vec!["now"]);
    }

    #[test]
    fn test_args_keep_original_case() {
        let event = normalize(text_message("!HideTag Hello Everyone"), PREFIXES);
        assert_eq!(event.command.prefix, Some('!'));
        assert_eq!(event.command.token, "hidetag");
        assert_eq!(event.command.args_raw, "Hello Everyone");
        assert_eq!(event.command.body, "hidetag hello everyone");
    }

    #[test]
    fn test_text_without_prefix_is_never_a_command() {
        for text in ["ping", "hello .ping", "  ", "", "#ping", "ping."] {
            let event = normalize(text_message(text), PREFIXES);
            assert!(!event.is_command(), "{text:?} parsed as command");
            assert!(event.command.token.is_empty());
        }
    }

    #[test]
    fn test_lone_prefix_is_not_a_command() {
        let event = normalize(text_message(". "), PREFIXES);
        assert!(!event.is_command());
    }

    #[test]
    fn test_field_priority_and_button_id() {
        let content = MessageContent {
            image_message: Some(MediaMessage {
                caption: Some(".Sticker".into()),
                context_info: None,
            }),
            ..Default::default()
        };
        assert_eq!(extract_text(&content), ".Sticker");

        let button = MessageContent {
            buttons_response_message: Some(ButtonsResponse {
                selected_button_id: Some(".menu".into()),
            }),
            ..Default::default()
        };
        assert_eq!(extract_text(&button), ".menu");
        assert_eq!(extract_raw_text(&button), "");
    }

    #[test]
    fn test_unsupported_kind_is_empty() {
        let content = MessageContent {
            sticker_message: Some(serde_json::json!({})),
            ..Default::default()
        };
        assert_eq!(extract_text(&content), "");
    }

    #[test]
    fn test_mentions_and_quote() {
        let mut message = text_message("");
        message.content = MessageContent {
            extended_text_message: Some(ExtendedText {
                text: Some(".kick @1666".into()),
                context_info: Some(ContextInfo {
                    mentioned_jid: vec!["1666@s.whatsapp.net".into()],
                    participant: Some("1777@s.whatsapp.net".into()),
                    stanza_id: Some("Q1".into()),
                    ..Default::default()
                }),
            }),
            ..Default::default()
        };

        let event = normalize(message, PREFIXES);
        assert_eq!(event.mentioned, vec!["1666@s.whatsapp.net"]);
        let quoted = event.quoted.unwrap();
        assert_eq!(quoted.participant.as_deref(), Some("1777@s.whatsapp.net"));
        assert_eq!(quoted.id.as_deref(), Some("Q1"));
        assert!(event.is_group);
    }
}
