use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use super::enforce::{enforce, is_exempt};
use super::{ModerationCheck, ModerationContext, Verdict};

/// Scheme URLs, `www.` hosts, invite links and bare domains on common TLDs.
static LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)(?:https?://|www\.)\S+",
        r"|\b(?:chat\.whatsapp\.com|wa\.me|t\.me|discord\.gg)/\S+",
        r"|\b[a-z0-9][a-z0-9-]*\.(?:com|net|org|io|me|gg|xyz|info|co|ly|link|app|site|online|shop|tk)\b",
    ))
    .expect("Invalid regex")
});

pub fn contains_link(text: &str) -> bool {
    LINK.is_match(text)
}

pub struct LinkCheck;

#[async_trait]
impl ModerationCheck for LinkCheck {
    fn name(&self) -> &'static str {
        "antilink"
    }

    async fn check(&self, ctx: &ModerationContext<'_>) -> anyhow::Result<Verdict> {
        let Some(toggle) = ctx.services.stores.antilink.active(&ctx.event.chat_id)? else {
            return Ok(Verdict::Clean);
        };
        // Raw text: normalization joins "end. com" into "end.com".
        if !contains_link(&ctx.event.raw_text) {
            return Ok(Verdict::Clean);
        }
        if is_exempt(ctx).await {
            return Ok(Verdict::Exempt);
        }

        enforce(ctx, toggle, "sharing links").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_link() {
        for text in [
            "see https://example.org/x",
            "www.spam.io",
            "join chat.whatsapp.com/AbCdEf",
            "dm wa.me/15550100",
            "go to example.com now",
            "HTTP://SHOUT.NET",
        ] {
            assert!(contains_link(text), "{text:?} not detected");
        }

        for text in ["hello world", ".ping", "3.14 is pi", "the end. com on", "e.g. this"] {
            assert!(!contains_link(text), "{text:?} falsely detected");
        }
    }
}
