use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use super::PeriodicJob;
use crate::reply::{ReplyEngine, ScanOutcome};

/// Scans the mailbox for unread mail and sends out of office replies.
pub struct AutoReply {
    engine: Arc<ReplyEngine>,
    interval: Duration,
}

impl AutoReply {
    pub fn new(engine: Arc<ReplyEngine>, interval: Duration) -> Self {
        Self { engine, interval }
    }
}

#[async_trait]
impl PeriodicJob for AutoReply {
    fn interval(&self) -> Duration {
        self.interval
    }

    async fn run_job(&self) {
        tracing::info!("Checking for new emails at {}", chrono::Local::now());

        match self.engine.scan().await {
            Ok(ScanOutcome::Completed(report)) => {
                tracing::info!(
                    "New emails checked: {} unread, {} replied, {} already replied to, {} threads with replies, {} failed",
                    report.unread,
                    report.replied,
                    report.skipped_duplicate_sender,
                    report.skipped_thread_has_reply,
                    report.failed
                );
            }
            Ok(ScanOutcome::AlreadyRunning) => {}
            Err(e) => {
                tracing::error!("Error occurred: {}", e);
            }
        }
    }
}
