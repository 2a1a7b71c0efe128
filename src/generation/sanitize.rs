//! Cleanup of generated text before it is stored.

use std::sync::LazyLock;

use regex::Regex;

/// A leading "Sure, here you go:" style lead-in, up to the first colon on the line.
static PREAMBLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:here is|of course|sure|certainly)\b[^\n]*?:\s*")
        .expect("preamble pattern is valid")
});

const MARKDOWN_MARKERS: [&str; 3] = ["**", "### ", "## "];

/// Strip conversational preambles and markdown markers from generated text.
///
/// Text that carries neither is returned trimmed and otherwise untouched.
/// Applying `sanitize` to its own output is a no-op.
pub fn sanitize(raw: &str) -> String {
    let mut text = clean_once(raw);
    loop {
        let next = clean_once(&text);
        // every change shortens the text, so this terminates
        if next == text {
            return text;
        }
        text = next;
    }
}

fn clean_once(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_preamble = PREAMBLE.replace(trimmed, "");
    let mut text = without_preamble.trim().to_string();
    for marker in MARKDOWN_MARKERS {
        text = text.replace(marker, "");
    }
    text.trim().to_string()
}
