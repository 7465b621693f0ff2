//! # Background Side Effects
//!
//! Welcome email and spreadsheet sync run as spawned tokio tasks. The caller
//! never awaits them; their failures are retried per `RetryPolicy` and then
//! only logged.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use authsync::client::side_effects::BackgroundTasks;
//! use authsync::shared::RetryPolicy;
//!
//! # async fn example() {
//! let tasks = BackgroundTasks::new(RetryPolicy::default());
//! tasks.spawn("noop", || async { Ok(()) });
//!
//! // On shutdown
//! tasks.wait_idle().await;
//! # }
//! ```

pub mod email;
pub mod retry;
pub mod sheets;

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

use crate::shared::config::RetryPolicy;
use crate::shared::error::ServiceError;

pub use email::{DisabledEmail, HttpEmailService};
pub use retry::{retry_with_backoff, RetryReport};
pub use sheets::{DisabledSheetSync, HttpSheetSync};

/// Tracker for fire-and-forget tasks
#[derive(Debug, Clone)]
pub struct BackgroundTasks {
    policy: RetryPolicy,
    handles: Arc<Mutex<Vec<JoinHandle<RetryReport>>>>,
}

impl BackgroundTasks {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            handles: Arc::new(Mutex::new(Vec::new())),
        }
    }

    // never held across an await
    fn handles(&self) -> MutexGuard<'_, Vec<JoinHandle<RetryReport>>> {
        self.handles.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn `operation` under the retry policy without waiting for it
    pub fn spawn<F, Fut>(&self, label: &'static str, operation: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), ServiceError>> + Send + 'static,
    {
        let policy = self.policy;
        let span = tracing::info_span!("side_effect", task = label, id = %Uuid::new_v4());
        let handle = tokio::spawn(
            async move { retry_with_backoff(label, policy, operation).await }.instrument(span),
        );

        let mut handles = self.handles();
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
    }

    /// Number of tasks still running
    pub fn pending(&self) -> usize {
        self.handles().iter().filter(|h| !h.is_finished()).count()
    }

    /// Await every task spawned so far and return their reports
    pub async fn wait_idle(&self) -> Vec<RetryReport> {
        let mut reports = Vec::new();
        loop {
            let drained: Vec<_> = self.handles().drain(..).collect();
            if drained.is_empty() {
                return reports;
            }
            for handle in drained {
                match handle.await {
                    Ok(report) => reports.push(report),
                    Err(e) => tracing::error!("side effect task panicked: {}", e),
                }
            }
        }
    }
}
