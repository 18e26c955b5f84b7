use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

pub mod auto_reply;

pub use auto_reply::AutoReply;

pub const MIN_INTERVAL_SECS: u64 = 45;
pub const MAX_INTERVAL_SECS: u64 = 120;

#[async_trait]
pub trait PeriodicJob: Send + Sync {
    fn interval(&self) -> Duration;

    async fn run_job(&self);
}

/// Pick a polling interval between 45 and 120 seconds inclusive.
pub fn random_interval() -> Duration {
    let secs = rand::thread_rng().gen_range(MIN_INTERVAL_SECS..=MAX_INTERVAL_SECS);
    Duration::from_secs(secs)
}

/// Run `job` every `job.interval()` until the returned handle is
/// aborted. The first run happens one interval after spawning.
///
/// Each run gets its own task so a slow run never delays the timer.
/// Jobs that must not overlap have to guard against it themselves.
pub fn spawn_periodic_job<J: PeriodicJob + 'static>(job: Arc<J>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let period = job.interval();
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let job = Arc::clone(&job);
            tokio::spawn(async move {
                job.run_job().await;
            });
        }
    })
}
