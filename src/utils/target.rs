//! Target resolution for user commands.
//!
//! Resolution order:
//! 1. Mentions in the command message
//! 2. Author of the quoted message
//! 3. Phone numbers given as arguments

use crate::normalizer::InboundEvent;
use crate::protocol::jid;

/// Every user a command points at, deduplicated by number.
pub fn resolve_targets(event: &InboundEvent) -> Vec<String> {
    let mut targets: Vec<String> = Vec::new();
    let mut push = |candidate: String| {
        if !targets.iter().any(|t| jid::same_user(t, &candidate)) {
            targets.push(candidate);
        }
    };

    if !event.mentioned.is_empty() {
        event.mentioned.iter().cloned().for_each(&mut push);
    } else if let Some(participant) = event
        .quoted
        .as_ref()
        .and_then(|q| q.participant.clone())
        .filter(|p| !p.is_empty())
    {
        push(participant);
    } else {
        event
            .command
            .args
            .iter()
            .filter_map(|arg| jid::parse_number(arg))
            .for_each(&mut push);
    }

    targets
}

/// First resolved target.
pub fn resolve_target(event: &InboundEvent) -> Option<String> {
    resolve_targets(event).into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::{NormalizedCommand, QuotedMessage};
    use crate::protocol::{MessageContent, MessageKind};

    fn event(mentioned: Vec<&str>, quoted: Option<&str>, args: Vec<&str>) -> InboundEvent {
        InboundEvent {
            id: "M".into(),
            chat_id: "g@g.us".into(),
            sender_id: "1@s.whatsapp.net".into(),
            is_group: true,
            from_self: false,
            push_name: None,
            timestamp: 0,
            kind: MessageKind::ExtendedText,
            text: String::new(),
            raw_text: String::new(),
            mentioned: mentioned.into_iter().map(String::from).collect(),
            quoted: quoted.map(|p| QuotedMessage {
                id: Some("Q".into()),
                participant: Some(p.into()),
                remote_chat: None,
                content: None,
            }),
            command: NormalizedCommand {
                args: args.into_iter().map(String::from).collect(),
                ..Default::default()
            },
            content: MessageContent::default(),
        }
    }

    #[test]
    fn test_mentions_win() {
        let e = event(
            vec!["2@s.whatsapp.net", "2:1@s.whatsapp.net", "3@s.whatsapp.net"],
            Some("4@s.whatsapp.net"),
            vec![],
        );
        assert_eq!(resolve_targets(&e), vec!["2@s.whatsapp.net", "3@s.whatsapp.net"]);
    }

    #[test]
    fn test_quoted_then_numbers() {
        let e = event(vec![], Some("4@s.whatsapp.net"), vec!["+15550100"]);
        assert_eq!(resolve_target(&e).as_deref(), Some("4@s.whatsapp.net"));

        let e = event(vec![], None, vec!["+1 555", "15550100"]);
        assert_eq!(resolve_targets(&e), vec!["15550100@s.whatsapp.net"]);

        let e = event(vec![], None, vec!["hello"]);
        assert!(resolve_targets(&e).is_empty());
    }
}
