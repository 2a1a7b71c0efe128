//! Outline suggestions for new projects.

use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use super::{GenerationOptions, GenerationService};

/// Outline used whenever the generator cannot produce a usable one.
pub const FALLBACK_OUTLINE: [&str; 4] = ["Introduction", "Overview", "Detailed Analysis", "Conclusion"];

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```[A-Za-z0-9_-]*").expect("fence pattern is valid"));

pub fn fallback_outline() -> Vec<String> {
    FALLBACK_OUTLINE.iter().map(|s| s.to_string()).collect()
}

pub fn outline_prompt(topic: &str, doc_type: &str, context: &str) -> String {
    format!(
        "You are an API helper. Return a VALID JSON list of strings for section headers \
         for a {doc_type} about '{topic}'.\n\n\
         Additional Context/Instructions:\n{context}\n\n\
         Example: [\"Introduction\", \"Market Analysis\", \"Conclusion\"]\n\
         Rules:\n\
         1. Do NOT use Markdown.\n\
         2. Do NOT output '```json' or '```'.\n\
         3. Return ONLY the raw JSON list."
    )
}

/// Parse a generator reply into headings, tolerating a markdown code fence.
///
/// Returns `None` unless the reply is a non-empty JSON array of strings.
pub fn parse_outline(reply: &str) -> Option<Vec<String>> {
    let unfenced = CODE_FENCE.replace_all(reply, "");
    let outline: Vec<String> = serde_json::from_str(unfenced.trim()).ok()?;
    (!outline.is_empty()).then_some(outline)
}

/// Ask the generator for an outline. Never fails: any problem yields
/// [`FALLBACK_OUTLINE`].
pub async fn suggest_outline(
    service: &dyn GenerationService,
    topic: &str,
    doc_type: &str,
    context: &str,
) -> Vec<String> {
    let prompt = outline_prompt(topic, doc_type, context);
    match service.generate(&prompt, &GenerationOptions::default()).await {
        Ok(reply) => parse_outline(&reply).unwrap_or_else(|| {
            warn!(reply = %reply, "Outline reply was not a JSON list, using fallback");
            fallback_outline()
        }),
        Err(e) => {
            warn!(error = %e, "Outline generation failed, using fallback");
            fallback_outline()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::retry::testing::{rate_limited, Scripted};

    #[test]
    fn parses_plain_json() {
        assert_eq!(
            parse_outline(r#"["Intro", "Budget"]"#),
            Some(vec!["Intro".to_string(), "Budget".to_string()])
        );
    }

    #[test]
    fn strips_code_fences() {
        let reply = "```json\n[\"A\", \"B\"]\n```";
        assert_eq!(parse_outline(reply), Some(vec!["A".to_string(), "B".to_string()]));
        assert_eq!(parse_outline("```\n[\"A\"]\n```"), Some(vec!["A".to_string()]));
    }

    #[test]
    fn rejects_non_lists() {
        assert_eq!(parse_outline("Introduction, Conclusion"), None);
        assert_eq!(parse_outline(r#"{"outline": ["A"]}"#), None);
        assert_eq!(parse_outline("[1, 2]"), None);
        assert_eq!(parse_outline("[]"), None);
    }

    #[tokio::test]
    async fn falls_back_on_service_error() {
        let service = Scripted::new(vec![rate_limited()]);
        let outline = suggest_outline(&service, "Mars", "report", "").await;
        assert_eq!(outline, fallback_outline());
        assert_eq!(service.calls(), 1);
    }

    #[tokio::test]
    async fn falls_back_on_garbage() {
        let service = Scripted::new(vec![Ok("Sorry, I can't do that.".to_string())]);
        let outline = suggest_outline(&service, "Mars", "slides", "").await;
        assert_eq!(outline, fallback_outline());
    }

    #[tokio::test]
    async fn prompt_includes_topic_type_and_context() {
        let service = Scripted::new(vec![Ok(r#"["Why Mars"]"#.to_string())]);
        let outline = suggest_outline(&service, "Mars", "slides", "for kids").await;

        assert_eq!(outline, vec!["Why Mars".to_string()]);
        let prompt = service.prompts.lock().unwrap()[0].clone();
        assert!(prompt.contains("'Mars'"));
        assert!(prompt.contains("slides"));
        assert!(prompt.contains("for kids"));
    }
}
