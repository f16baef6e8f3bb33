//! Batch executor.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use tailtrim_models::FileReport;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Runs a batch of files through a bounded pool of tasks.
pub struct BatchExecutor {
    max_concurrent_files: usize,
    file_semaphore: Arc<Semaphore>,
    shutdown: watch::Sender<bool>,
}

impl BatchExecutor {
    /// Create an executor running at most `max_concurrent_files` files at once.
    pub fn new(max_concurrent_files: usize) -> Self {
        let max_concurrent_files = max_concurrent_files.max(1);
        let (shutdown, _) = watch::channel(false);

        Self {
            max_concurrent_files,
            file_semaphore: Arc::new(Semaphore::new(max_concurrent_files)),
            shutdown,
        }
    }

    /// Stop dispatching new files. In-flight files still finish.
    pub fn request_shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Request shutdown on the first Ctrl-C.
    pub fn listen_for_ctrl_c(&self) -> JoinHandle<()> {
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Received Ctrl-C, finishing in-flight files");
                shutdown.send_replace(true);
            }
        })
    }

    /// Process every file and return the reports in input order.
    ///
    /// Files not yet started when shutdown is requested are reported as
    /// cancelled.
    pub async fn run<F, Fut>(&self, files: Vec<PathBuf>, process: F) -> Vec<FileReport>
    where
        F: Fn(PathBuf) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = FileReport> + Send + 'static,
    {
        info!(
            "Processing {} file(s) with {} max concurrent",
            files.len(),
            self.max_concurrent_files
        );

        let process = Arc::new(process);
        let mut shutdown_rx = self.shutdown.subscribe();
        let mut handles: Vec<(PathBuf, Option<JoinHandle<FileReport>>)> =
            Vec::with_capacity(files.len());

        for path in files {
            if *shutdown_rx.borrow() {
                handles.push((path, None));
                continue;
            }

            let permit = tokio::select! {
                permit = self.file_semaphore.clone().acquire_owned() => permit.ok(),
                _ = shutdown_rx.changed() => None,
            };
            let Some(permit) = permit else {
                handles.push((path, None));
                continue;
            };

            debug!("Dispatching {}", path.display());
            let process = Arc::clone(&process);
            let task_path = path.clone();
            let handle = tokio::spawn(async move {
                let _permit = permit;
                process(task_path).await
            });
            handles.push((path, Some(handle)));
        }

        let mut reports = Vec::with_capacity(handles.len());
        for (path, handle) in handles {
            let report = match handle {
                Some(handle) => match handle.await {
                    Ok(report) => report,
                    Err(e) => FileReport::failed(&path, format!("processing task failed: {}", e)),
                },
                None => FileReport::failed(&path, "cancelled"),
            };
            reports.push(report);
        }
        reports
    }
}
