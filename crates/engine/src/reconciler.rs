//! Background consistency checks.
//!
//! The reconciler periodically re-verifies the two global invariants the
//! engine maintains: every transaction's postings sum to zero, and every
//! account's cached balance equals its ledger history. It only observes and
//! reports; drift is never repaired.

use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::Engine;

const CHECK_LIMIT: u64 = 100;

#[derive(Clone, Copy, Debug)]
pub struct ReconcilerConfig {
    /// Pause between iterations.
    pub interval: Duration,
    /// Upper bound for each individual check.
    pub check_timeout: Duration,
}

/// Handle to the running reconciler task.
pub struct Reconciler {
    cancel: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl Reconciler {
    /// Spawns the reconciler. The first iteration runs immediately, then one
    /// per interval tick.
    pub fn spawn(engine: Engine, config: ReconcilerConfig) -> Self {
        let (cancel, mut cancelled) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            tracing::info!(
                interval_secs = config.interval.as_secs(),
                timeout_secs = config.check_timeout.as_secs(),
                "reconciler started"
            );
            let mut ticker = tokio::time::interval(config.interval);
            loop {
                tokio::select! {
                    _ = &mut cancelled => {
                        tracing::info!("reconciler stopped");
                        return;
                    }
                    _ = ticker.tick() => {
                        run_iteration(&engine, config.check_timeout).await;
                    }
                }
            }
        });
        Self { cancel, handle }
    }

    /// Signals the task to stop after its current iteration and waits for it
    /// up to `wait`.
    pub async fn stop(self, wait: Duration) {
        let _ = self.cancel.send(());
        if tokio::time::timeout(wait, self.handle).await.is_err() {
            tracing::warn!(wait_secs = wait.as_secs(), "reconciler did not stop in time");
        }
    }
}

/// One pass of both checks, each bounded by `check_timeout`. A timed-out or
/// failed check is reported and the loop keeps running.
async fn run_iteration(engine: &Engine, check_timeout: Duration) {
    match tokio::time::timeout(check_timeout, engine.find_unbalanced_transaction_ids(CHECK_LIMIT))
        .await
    {
        Err(_) => tracing::error!("ledger balance check timed out"),
        Ok(Err(err)) => tracing::error!(error = %err, "ledger balance check failed"),
        Ok(Ok(ids)) if ids.is_empty() => {
            tracing::info!("ledger balance check OK: no unbalanced transactions");
        }
        Ok(Ok(ids)) => tracing::error!(
            count = ids.len(),
            transaction_ids = ?ids,
            "ledger balance check FAILED: unbalanced transactions found"
        ),
    }

    match tokio::time::timeout(check_timeout, engine.find_account_mismatches(CHECK_LIMIT)).await {
        Err(_) => tracing::error!("account balance consistency check timed out"),
        Ok(Err(err)) => tracing::error!(error = %err, "account balance consistency check failed"),
        Ok(Ok(mismatches)) if mismatches.is_empty() => {
            tracing::info!("account balance consistency check OK: no mismatches");
        }
        Ok(Ok(mismatches)) => tracing::error!(
            count = mismatches.len(),
            mismatches = ?mismatches,
            "account balance consistency check FAILED: mismatches found"
        ),
    }
}
