//! Job queue that runs [`ContentJob`]s off the request path.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{broadcast, mpsc, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::{ContentJob, ContentPipeline, PipelineReport};

/// Jobs waiting for a free slot beyond this are refused.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("content job queue is full")]
    Full,

    #[error("content job queue is closed")]
    Closed,
}

/// Handle for submitting jobs. Cloneable; all clones feed the same worker.
///
/// Jobs for different projects run concurrently up to the configured limit,
/// and at most `capacity` more may wait. There is no cancellation: a
/// submitted job always runs to the end of its outline.
#[derive(Clone)]
pub struct JobQueue {
    tx: mpsc::Sender<ContentJob>,
    reports: broadcast::Sender<PipelineReport>,
}

impl JobQueue {
    /// Spawn the worker task. Must be called from within a tokio runtime.
    pub fn start(
        pipeline: Arc<ContentPipeline>,
        max_concurrent: usize,
        capacity: usize,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let (reports, _) = broadcast::channel(64);
        let worker = tokio::spawn(run_worker(
            pipeline,
            rx,
            reports.clone(),
            max_concurrent.max(1),
        ));
        (Self { tx, reports }, worker)
    }

    /// Enqueue without waiting. Fails at once when the backlog is full.
    pub fn submit(&self, job: ContentJob) -> Result<(), SubmitError> {
        debug!(project_id = %job.project_id, "Submitting content job");
        self.tx.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SubmitError::Full,
            mpsc::error::TrySendError::Closed(_) => SubmitError::Closed,
        })
    }

    /// Receive a report for every job that finishes after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineReport> {
        self.reports.subscribe()
    }
}

async fn run_worker(
    pipeline: Arc<ContentPipeline>,
    mut rx: mpsc::Receiver<ContentJob>,
    reports: broadcast::Sender<PipelineReport>,
    max_concurrent: usize,
) {
    info!(max_concurrent, "Content job worker started");
    let slots = Arc::new(Semaphore::new(max_concurrent));

    while let Some(job) = rx.recv().await {
        let permit = match slots.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                error!(error = %e, "Job slots closed");
                break;
            }
        };
        let pipeline = pipeline.clone();
        let reports = reports.clone();
        tokio::spawn(async move {
            let report = pipeline.run(job).await;
            drop(permit);
            // no subscribers is fine
            let _ = reports.send(report);
        });
    }

    info!("Content job worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::generation::retry::testing::{RecordingSleeper, Scripted};
    use crate::models::{CreateProjectInput, DocType};
    use crate::pipeline::PipelineConfig;

    #[tokio::test]
    async fn runs_submitted_jobs_and_reports() {
        let db = Database::open_memory().unwrap();
        db.migrate().unwrap();
        let user = db.create_user("q@example.com", "hash").unwrap().unwrap();
        let created = db
            .create_project(
                user.id,
                CreateProjectInput {
                    title: "Deck".to_string(),
                    doc_type: DocType::Slides,
                    context: String::new(),
                    outline: vec!["One".to_string(), "Two".to_string()],
                },
            )
            .unwrap();

        let pipeline = Arc::new(ContentPipeline::new(
            db.clone(),
            Arc::new(Scripted::new(vec![])),
            Arc::new(RecordingSleeper::default()),
            PipelineConfig::default(),
        ));
        let (queue, _worker) = JobQueue::start(pipeline, 2, DEFAULT_QUEUE_CAPACITY);
        let mut reports = queue.subscribe();

        queue.submit(ContentJob::for_project(&created)).unwrap();
        let report = reports.recv().await.unwrap();

        assert_eq!(report.project_id, created.project.id);
        assert_eq!(report.generated, 2);
        let sections = db.get_sections(created.project.id).unwrap();
        assert!(sections.iter().all(|s| s.content == "fallback text"));
    }

    #[tokio::test]
    async fn full_backlog_refuses_new_jobs() {
        let db = Database::open_memory().unwrap();
        db.migrate().unwrap();
        let user = db.create_user("q@example.com", "hash").unwrap().unwrap();
        let created = db
            .create_project(
                user.id,
                CreateProjectInput {
                    title: "Memo".to_string(),
                    doc_type: DocType::Report,
                    context: String::new(),
                    outline: vec!["Only".to_string()],
                },
            )
            .unwrap();

        let pipeline = Arc::new(ContentPipeline::new(
            db,
            Arc::new(Scripted::new(vec![])),
            Arc::new(RecordingSleeper::default()),
            PipelineConfig::default(),
        ));
        let (queue, _worker) = JobQueue::start(pipeline, 1, 1);

        // the worker cannot drain the channel until this task yields
        queue.submit(ContentJob::for_project(&created)).unwrap();
        assert_eq!(
            queue.submit(ContentJob::for_project(&created)),
            Err(SubmitError::Full)
        );
    }
}
