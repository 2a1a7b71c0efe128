//! Rewriting a single section on request.

use anyhow::Result;
use tracing::{info, warn};

use crate::db::Database;
use crate::generation::{
    generate_with_retry, sanitize, GenerationOptions, GenerationService, RetryPolicy, Sleeper,
};
use crate::models::Section;

pub fn refine_prompt(content: &str, instruction: &str) -> String {
    format!(
        "Act as a professional document editor.\n\
         Rewrite the following text based on this instruction: \"{instruction}\".\n\n\
         Original Text:\n{content}\n\n\
         STRICT OUTPUT RULES:\n\
         1. Return ONLY the rewritten text.\n\
         2. Do NOT use Markdown formatting (no **, ##, -, or #).\n\
         3. Do NOT add conversational filler."
    )
}

/// Rewrite `section` following `instruction` and return its content afterwards.
///
/// On success the sanitized text is stored and returned. When generation
/// fails the section is left untouched and its prior content is returned.
/// Store errors propagate.
pub async fn refine_section(
    db: &Database,
    generator: &dyn GenerationService,
    sleeper: &dyn Sleeper,
    policy: RetryPolicy,
    section: &Section,
    instruction: &str,
) -> Result<String> {
    let prompt = refine_prompt(&section.content, instruction);
    let options = GenerationOptions::permissive();

    match generate_with_retry(generator, sleeper, policy, &prompt, &options).await {
        Ok(text) => {
            let content = sanitize(&text);
            if !db.set_section_content(section.id, &content)? {
                // deleted while we were waiting on the generator
                warn!(section_id = %section.id, "Refined section no longer exists");
            }
            info!(section_id = %section.id, "Section refined");
            Ok(content)
        }
        Err(e) => {
            warn!(section_id = %section.id, error = %e, "Refine failed, keeping prior content");
            Ok(section.content.clone())
        }
    }
}
