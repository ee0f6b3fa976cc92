//! The operations behind each command line subcommand.
//!
//! Index work goes through an in-process worker: requests are batched into
//! messages, dispatched over a channel and handled one at a time.

use std::future::Future;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::Dependencies;
use crate::IndexingError;
use lms_search_pipeline::indexers::CourseSearchHit;
use lms_search_pipeline::messages::{
    CourseIndexRequest, LearningMaterialIndexRequest, MeshDescriptorIndexRequest,
    MAX_IDS_PER_MESSAGE,
};
use lms_search_pipeline::{
    ChannelDispatcher, IndexMessage, IndexWorker, MessageDispatcher, PipelineError,
    ReconciliationMode, ReconciliationReport, WorkerSummary,
};
use lms_search_shared::IngestStamp;

/// Create every missing index. Returns the names created.
pub async fn create_indexes(deps: &Dependencies) -> Result<Vec<String>, IndexingError> {
    Ok(deps.index_manager.create_indexes().await?)
}

/// Drop every managed index. Returns the names dropped.
pub async fn drop_indexes(deps: &Dependencies) -> Result<Vec<String>, IndexingError> {
    Ok(deps.index_manager.drop_indexes().await?)
}

/// Run a reconciliation and wait until the worker has handled every request.
pub async fn reconcile(
    deps: &Dependencies,
    mode: ReconciliationMode,
) -> Result<ReconciliationReport, IndexingError> {
    let (report, summary) = with_worker(deps, |dispatcher| async move {
        deps.reconciliation_driver(dispatcher).run(mode).await
    })
    .await;
    let report = report?;
    check_summary(summary)?;
    Ok(report)
}

/// Index the given learning materials, or every file-backed one when `ids`
/// is empty.
pub async fn index_learning_materials(
    deps: &Dependencies,
    ids: Vec<i64>,
    force: bool,
) -> Result<WorkerSummary, IndexingError> {
    let ids = if ids.is_empty() {
        deps.repository.file_learning_material_ids().await?
    } else {
        ids
    };
    let messages = ids
        .chunks(MAX_IDS_PER_MESSAGE)
        .map(|batch| LearningMaterialIndexRequest::new(batch.to_vec(), force).map(Into::into))
        .collect::<Result<Vec<IndexMessage>, _>>()?;
    run_messages(deps, messages).await
}

/// Index the given courses, or every course when `ids` is empty.
pub async fn index_courses(
    deps: &Dependencies,
    ids: Vec<i64>,
) -> Result<WorkerSummary, IndexingError> {
    let ids = if ids.is_empty() {
        deps.repository.course_ids().await?
    } else {
        ids
    };
    let stamp = IngestStamp::now();
    let messages = ids
        .chunks(MAX_IDS_PER_MESSAGE)
        .map(|batch| CourseIndexRequest::new(batch.to_vec(), stamp).map(Into::into))
        .collect::<Result<Vec<IndexMessage>, _>>()?;
    run_messages(deps, messages).await
}

/// Index the given MeSH descriptors, or every descriptor when `ids` is empty.
pub async fn index_mesh(
    deps: &Dependencies,
    ids: Vec<String>,
) -> Result<WorkerSummary, IndexingError> {
    let ids = if ids.is_empty() {
        deps.repository.mesh_descriptor_ids().await?
    } else {
        ids
    };
    let stamp = IngestStamp::now();
    let messages = ids
        .chunks(MAX_IDS_PER_MESSAGE)
        .map(|batch| MeshDescriptorIndexRequest::new(batch.to_vec(), stamp).map(Into::into))
        .collect::<Result<Vec<IndexMessage>, _>>()?;
    run_messages(deps, messages).await
}

/// Search the curriculum index.
pub async fn search_curriculum(
    deps: &Dependencies,
    text: &str,
    size: usize,
) -> Result<Vec<CourseSearchHit>, IndexingError> {
    Ok(deps.curriculum.search(text, size).await?)
}

async fn run_messages(
    deps: &Dependencies,
    messages: Vec<IndexMessage>,
) -> Result<WorkerSummary, IndexingError> {
    let total = messages.len();
    let (sent, summary) = with_worker(deps, |dispatcher| async move {
        for message in messages {
            dispatcher.dispatch(message).await?;
        }
        Ok::<_, PipelineError>(())
    })
    .await;
    sent?;
    info!(total, handled = summary.handled, "Indexing run finished");
    check_summary(summary)?;
    Ok(summary)
}

/// Run `produce` against a dispatcher while a worker handles what it sends.
///
/// The dispatcher is dropped when `produce` finishes, which lets the worker
/// drain the channel and stop. When `produce` fails the worker is shut down
/// instead, and whatever is still queued is reported as abandoned.
async fn with_worker<F, Fut, T>(
    deps: &Dependencies,
    produce: F,
) -> (Result<T, PipelineError>, WorkerSummary)
where
    F: FnOnce(Arc<dyn MessageDispatcher>) -> Fut,
    Fut: Future<Output = Result<T, PipelineError>>,
{
    let (worker, dispatcher): (IndexWorker, ChannelDispatcher) =
        IndexWorker::new(deps.message_handler());
    let shutdown = worker.shutdown_handle();
    let producer = async move {
        let produced = produce(Arc::new(dispatcher)).await;
        if produced.is_err() && shutdown.send(()).is_err() {
            warn!("Worker already stopped");
        }
        produced
    };
    tokio::join!(producer, worker.run())
}

fn check_summary(summary: WorkerSummary) -> Result<(), IndexingError> {
    if summary.is_incomplete() {
        return Err(IndexingError::IncompleteRun {
            failed: summary.failed,
            abandoned: summary.abandoned,
            total: summary.total(),
        });
    }
    if summary.degraded > 0 {
        warn!(
            degraded = summary.degraded,
            total = summary.total(),
            "Some bulk requests had item failures"
        );
        return Err(IndexingError::DegradedRun {
            degraded: summary.degraded,
            total: summary.total(),
        });
    }
    Ok(())
}
