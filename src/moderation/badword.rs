use async_trait::async_trait;
use regex::Regex;

use super::enforce::{enforce, is_exempt};
use super::{ModerationCheck, ModerationContext, Verdict};

/// Whole-word match against the configured bad-word list.
pub struct BadWordCheck {
    pattern: Option<Regex>,
}

impl BadWordCheck {
    pub fn new(words: &[String]) -> Result<Self, regex::Error> {
        let alternatives: Vec<String> = words
            .iter()
            .map(|w| w.trim())
            .filter(|w| !w.is_empty())
            .map(regex::escape)
            .collect();

        let pattern = if alternatives.is_empty() {
            None
        } else {
            Some(Regex::new(&format!(
                r"(?i)\b(?:{})\b",
                alternatives.join("|")
            ))?)
        };

        Ok(Self { pattern })
    }

    /// First bad word in `text`, if any.
    pub fn find<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.pattern
            .as_ref()
            .and_then(|p| p.find(text))
            .map(|m| m.as_str())
    }
}

#[async_trait]
impl ModerationCheck for BadWordCheck {
    fn name(&self) -> &'static str {
        "antibadword"
    }

    async fn check(&self, ctx: &ModerationContext<'_>) -> anyhow::Result<Verdict> {
        let Some(toggle) = ctx.services.stores.antibadword.active(&ctx.event.chat_id)? else {
            return Ok(Verdict::Clean);
        };
        if self.find(&ctx.event.text).is_none() {
            return Ok(Verdict::Clean);
        }
        if is_exempt(ctx).await {
            return Ok(Verdict::Exempt);
        }

        enforce(ctx, toggle, "bad language").await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::normalizer::normalize;
    use crate::protocol::Connection;
    use crate::store::{ModerationAction, ModerationToggle};
    use crate::testing::{ADMIN, GROUP, MEMBER, MockConnection, message, test_services};

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_whole_word_only() {
        let check = BadWordCheck::new(&words(&["ass", "damn"])).unwrap();
        assert_eq!(check.find("you ass!"), Some("ass"));
        assert_eq!(check.find("DAMN it"), Some("DAMN"));
        assert_eq!(check.find("a classic passage"), None);
        assert!(BadWordCheck::new(&[]).unwrap().find("ass").is_none());
    }

    async fn run(
        text: &str,
        sender: &str,
        toggle: Option<ModerationToggle>,
    ) -> (Verdict, Arc<MockConnection>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let services = test_services(dir.path());
        if let Some(toggle) = toggle {
            services.stores.antibadword.set(GROUP, toggle).unwrap();
        }
        let mock = MockConnection::new().with_group(GROUP, &[ADMIN], &[MEMBER], true);
        let conn: Arc<dyn Connection> = mock.clone();
        let event = normalize(message(GROUP, sender, text), &['.']);
        let perms = services.permissions.snapshot(conn.clone(), &event);
        let ctx = ModerationContext {
            conn: &conn,
            services: &services,
            event: &event,
            perms: &perms,
        };
        let check = BadWordCheck::new(&words(&["fuck"])).unwrap();
        let verdict = check.check(&ctx).await.unwrap();
        (verdict, mock, dir)
    }

    #[tokio::test]
    async fn test_disabled_chat_never_acts() {
        let (verdict, mock, _dir) = run("fuck fuck fuck", MEMBER, None).await;
        assert_eq!(verdict, Verdict::Clean);
        assert!(mock.calls().is_empty());

        let disabled = ModerationToggle {
            enabled: false,
            action: ModerationAction::Kick,
        };
        let (verdict, mock, _dir) = run("fuck", MEMBER, Some(disabled)).await;
        assert_eq!(verdict, Verdict::Clean);
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_admin_is_exempt() {
        let toggle = ModerationToggle::enabled(ModerationAction::Kick);
        let (verdict, mock, _dir) = run("fuck", ADMIN, Some(toggle)).await;
        assert_eq!(verdict, Verdict::Exempt);
        assert_eq!(mock.deletions(), 0);
    }

    #[tokio::test]
    async fn test_kick_action() {
        let toggle = ModerationToggle::enabled(ModerationAction::Kick);
        let (verdict, mock, _dir) = run("well fuck", MEMBER, Some(toggle)).await;
        assert_eq!(verdict, Verdict::Acted(ModerationAction::Kick));
        assert_eq!(mock.deletions(), 1);
        assert_eq!(mock.removals(), vec![MEMBER.to_string()]);
    }

    #[tokio::test]
    async fn test_warn_kicks_exactly_once_at_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let services = test_services(dir.path());
        services
            .stores
            .antibadword
            .set(GROUP, ModerationToggle::enabled(ModerationAction::Warn))
            .unwrap();
        let mock = MockConnection::new().with_group(GROUP, &[], &[MEMBER], true);
        let conn: Arc<dyn Connection> = mock.clone();
        let check = BadWordCheck::new(&words(&["fuck"])).unwrap();

        for _ in 0..3 {
            let event = normalize(message(GROUP, MEMBER, "fuck"), &['.']);
            let perms = services.permissions.snapshot(conn.clone(), &event);
            let ctx = ModerationContext {
                conn: &conn,
                services: &services,
                event: &event,
                perms: &perms,
            };
            check.check(&ctx).await.unwrap();
        }

        assert_eq!(mock.deletions(), 3);
        assert_eq!(mock.removals(), vec![MEMBER.to_string()]);
        assert_eq!(services.stores.warnings.count(GROUP, MEMBER).unwrap(), 0);
        let texts = mock.texts(GROUP);
        assert!(texts[0].contains("warning 1/3"));
        assert!(texts[1].contains("warning 2/3"));
        assert!(texts[2].contains("removed after 3 warnings"));
    }
}
