use std::future::Future;

use fluvio_future::timer::sleep;
use tracing::debug;

use crate::backoff::BackoffPolicy;
use crate::error::Result;

/// Re-run `attempt` while it fails with a version conflict and the policy
/// has attempts left. Any other outcome ends the loop; on exhaustion the
/// last conflict is returned.
pub async fn retry_on_conflict<T, F, Fut>(policy: &BackoffPolicy, mut attempt: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = policy.attempts();
    let mut delays = policy.delays()?;
    let mut tries: u32 = 1;
    loop {
        match attempt().await {
            Err(err) if err.is_conflict() => {
                if tries >= attempts {
                    debug!(tries, "conflict retries exhausted");
                    return Err(err);
                }
                let delay = delays.next().unwrap_or_default();
                debug!(tries, ?delay, "conflict, backing off");
                sleep(delay).await;
                tries += 1;
            }
            outcome => return outcome,
        }
    }
}
