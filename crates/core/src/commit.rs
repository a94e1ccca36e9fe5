//! Commit protocol
//!
//! Pending local changes are partitioned into creations, updates and
//! removals, dispatched to the engine concurrently and settled all
//! together. A failed item keeps its commit state so the next commit
//! retries it; siblings are unaffected.

use crate::engine::{CreateContext, DocumentEngine, DocumentHandle};
use crate::error::EngineError;
use crate::state::{AnnotationState, CommitState, TrackedAnnotation};
use futures::future::join_all;
use parking_lot::Mutex;
use pdf_annotation_model::{AnnotationId, AnnotationObject};
use std::collections::HashMap;

/// Side table of creation payloads, keyed by annotation id
pub type PendingContexts = HashMap<AnnotationId, CreateContext>;

/// Outcome of one commit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommitReport {
    pub created: Vec<AnnotationId>,
    pub updated: Vec<AnnotationId>,
    pub removed: Vec<AnnotationId>,
    pub failures: Vec<(AnnotationId, EngineError)>,
}

impl CommitReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of engine operations attempted
    pub fn operations(&self) -> usize {
        self.created.len() + self.updated.len() + self.removed.len() + self.failures.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Create,
    Update,
    Remove,
}

#[derive(Debug, Clone)]
struct Job {
    id: AnnotationId,
    revision: u64,
    operation: Operation,
    /// Object as sent to the engine
    object: AnnotationObject,
    context: Option<CreateContext>,
}

enum Outcome {
    Created(AnnotationId),
    Updated,
    Removed,
}

fn plan(state: &AnnotationState, contexts: &PendingContexts) -> Vec<Job> {
    let mut jobs: Vec<Job> = state
        .pending()
        .into_iter()
        .filter_map(|tracked: TrackedAnnotation| {
            let id = tracked.object.id;
            // Settled by the commit that dispatched the creation
            if state.is_creating(id) {
                return None;
            }
            let operation = match tracked.commit_state {
                CommitState::New => Operation::Create,
                CommitState::Dirty => Operation::Update,
                CommitState::Deleted if tracked.ever_synced() => Operation::Remove,
                CommitState::Deleted | CommitState::Synced => return None,
            };
            Some(Job {
                id,
                revision: tracked.revision,
                operation,
                object: tracked.engine_object(),
                context: if operation == Operation::Create {
                    contexts.get(&id).cloned()
                } else {
                    None
                },
            })
        })
        .collect();
    // Deterministic dispatch order
    jobs.sort_by_key(|job| (job.operation as u8, job.object.page_index, job.object.created));
    jobs
}

async fn run_job(engine: &dyn DocumentEngine, doc: &DocumentHandle, job: &Job) -> Result<Outcome, EngineError> {
    let page = doc
        .page(job.object.page_index)
        .ok_or_else(|| EngineError::NotFound(format!("page {}", job.object.page_index)))?;
    match job.operation {
        Operation::Create => engine
            .create_page_annotation(doc, page, &job.object, job.context.clone())
            .await
            .map(Outcome::Created),
        Operation::Update => {
            if engine.update_page_annotation(doc, page, &job.object).await? {
                Ok(Outcome::Updated)
            } else {
                Err(EngineError::Failed("update rejected".to_string()))
            }
        }
        Operation::Remove => {
            if !engine.remove_page_annotation(doc, page, &job.object).await? {
                tracing::debug!(id = %job.id, "annotation already absent from engine");
            }
            Ok(Outcome::Removed)
        }
    }
}

/// Run the commit protocol against `engine`
///
/// The state lock is only held while planning and settling, never across
/// an engine call.
pub async fn commit_pending(
    state: &Mutex<AnnotationState>,
    contexts: &Mutex<PendingContexts>,
    engine: &dyn DocumentEngine,
    doc: &DocumentHandle,
) -> CommitReport {
    let jobs = {
        let mut state = state.lock();
        if !state.has_pending_changes() {
            tracing::debug!("nothing to commit");
            return CommitReport::default();
        }
        let jobs = plan(&state, &contexts.lock());
        for job in jobs.iter().filter(|job| job.operation == Operation::Create) {
            state.begin_creation(job.id);
        }
        jobs
    };

    let results = join_all(jobs.iter().map(|job| run_job(engine, doc, job))).await;

    let mut report = CommitReport::default();
    {
        let mut state = state.lock();
        let mut contexts = contexts.lock();
        for (job, result) in jobs.iter().zip(results) {
            match result {
                Ok(Outcome::Created(engine_id)) => {
                    contexts.remove(&job.id);
                    let synced = state.mark_synced(job.id, job.revision, engine_id);
                    state.finish_creation(job.id);
                    if !synced && state.get(job.id).is_none() {
                        tracing::warn!(
                            id = %job.id,
                            engine_id = %engine_id,
                            "created annotation is no longer tracked"
                        );
                    }
                    report.created.push(job.id);
                }
                Ok(Outcome::Updated) => {
                    contexts.remove(&job.id);
                    if let Some(engine_id) = state.get(job.id).and_then(|t| t.engine_id) {
                        state.mark_synced(job.id, job.revision, engine_id);
                    }
                    report.updated.push(job.id);
                }
                Ok(Outcome::Removed) => {
                    state.settle_removal(job.id);
                    report.removed.push(job.id);
                }
                Err(error) => {
                    if job.operation == Operation::Create {
                        state.finish_creation(job.id);
                        if state.get(job.id).is_none() {
                            contexts.remove(&job.id);
                        }
                    }
                    tracing::warn!(id = %job.id, operation = ?job.operation, "commit failed: {}", error);
                    report.failures.push((job.id, error));
                }
            }
        }
    }

    tracing::info!(
        created = report.created.len(),
        updated = report.updated.len(),
        removed = report.removed.len(),
        failed = report.failures.len(),
        "commit finished"
    );
    report
}
