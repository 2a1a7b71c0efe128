//! Background content generation for new projects.
//!
//! A [`ContentJob`] is submitted to the [`JobQueue`] once a project and its
//! placeholder sections are committed. The [`ContentPipeline`] then walks the
//! outline in order and resolves every section exactly once:
//!
//! ```text
//! Pending ("Generating...") ──► Generated (sanitized text)
//!                          └──► Failed ("Error generating.")
//! ```
//!
//! Each section is committed before the next prompt is sent, so readers see a
//! growing prefix of resolved sections. A failed section never stops the run.

mod queue;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::db::Database;
use crate::generation::{
    generate_with_retry, sanitize, GenerationOptions, GenerationService, RetryPolicy, Sleeper,
};
use crate::models::{DocType, ProjectWithSections, FAILED_CONTENT};

pub use queue::{JobQueue, SubmitError, DEFAULT_QUEUE_CAPACITY};

/// Pause between sections to stay under the generator's request rate.
pub const SECTION_DELAY: Duration = Duration::from_secs(2);

/// Everything the pipeline needs to fill in one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentJob {
    pub project_id: Uuid,
    pub title: String,
    pub context: String,
    pub doc_type: DocType,
    /// Headings in generation order; index `i` is the section with `order = i`.
    pub outline: Vec<String>,
}

impl ContentJob {
    /// Build a job from a freshly created project.
    pub fn for_project(created: &ProjectWithSections) -> Self {
        Self {
            project_id: created.project.id,
            title: created.project.title.clone(),
            context: created.project.context.clone(),
            doc_type: created.project.doc_type,
            outline: created.sections.iter().map(|s| s.heading.clone()).collect(),
        }
    }
}

/// Outcome counts of one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub project_id: Uuid,
    pub generated: usize,
    pub failed: usize,
    /// Sections whose row was gone or could not be written.
    pub missing: usize,
}

/// Timing knobs for the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    pub retry: RetryPolicy,
    pub section_delay: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::bulk(),
            section_delay: SECTION_DELAY,
        }
    }
}

pub struct ContentPipeline {
    db: Database,
    generator: Arc<dyn GenerationService>,
    sleeper: Arc<dyn Sleeper>,
    config: PipelineConfig,
}

impl ContentPipeline {
    pub fn new(
        db: Database,
        generator: Arc<dyn GenerationService>,
        sleeper: Arc<dyn Sleeper>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            db,
            generator,
            sleeper,
            config,
        }
    }

    /// Generate every section of `job` in outline order.
    pub async fn run(&self, job: ContentJob) -> PipelineReport {
        info!(project_id = %job.project_id, sections = job.outline.len(), "Pipeline started");
        let mut report = PipelineReport {
            project_id: job.project_id,
            ..Default::default()
        };
        let options = GenerationOptions::default();

        for (index, heading) in job.outline.iter().enumerate() {
            if index > 0 {
                self.sleeper.sleep(self.config.section_delay).await;
            }

            let prompt = section_prompt(&job, heading);
            let content = match generate_with_retry(
                self.generator.as_ref(),
                self.sleeper.as_ref(),
                self.config.retry,
                &prompt,
                &options,
            )
            .await
            {
                Ok(text) => {
                    report.generated += 1;
                    sanitize(&text)
                }
                Err(e) => {
                    warn!(project_id = %job.project_id, order = index, error = %e, "Section failed");
                    report.failed += 1;
                    FAILED_CONTENT.to_string()
                }
            };

            match self
                .db
                .set_section_content_by_order(job.project_id, index as i64, &content)
            {
                Ok(true) => debug!(project_id = %job.project_id, order = index, "Section stored"),
                Ok(false) => {
                    warn!(project_id = %job.project_id, order = index, "Section row missing");
                    report.missing += 1;
                }
                Err(e) => {
                    error!(project_id = %job.project_id, order = index, error = %e, "Failed to store section");
                    report.missing += 1;
                }
            }
        }

        info!(
            project_id = %job.project_id,
            generated = report.generated,
            failed = report.failed,
            missing = report.missing,
            "Pipeline finished"
        );
        report
    }
}

/// Prompt for one section of a project.
pub fn section_prompt(job: &ContentJob, heading: &str) -> String {
    format!(
        "Write the content for the {framing}: '{heading}' for a project titled '{title}'.\n\n\
         USER INSTRUCTIONS / CONTEXT:\n{context}\n\n\
         Requirements:\n\
         - Write professional content.\n\
         - Write about 150-200 words.\n\
         - Do NOT use Markdown formatting (no ** or ##).",
        framing = job.doc_type.section_framing(),
        title = job.title,
        context = job.context,
    )
}
