use log::{debug, info};

use super::Networking;
use crate::http::{NetworkError, Wave};
use crate::queue::{ConcurrencyMode, ModeGuard};

impl Networking {
    /// Re-executes every request in the offline store, one at a time.
    ///
    /// Entries are processed in the order they were first stored. Each one
    /// goes through the full pipeline and is removed from the store afterwards
    /// unless it failed while offline again. The queue runs in
    /// [`ConcurrencyMode::Serial`] for the duration of the replay; the previous
    /// mode is restored once the last entry has settled, whatever its outcome.
    ///
    /// Returns the outcome of the last entry, or `Ok(None)` if the store was
    /// empty. Concurrent calls are serialised. A cancel-all stops the replay:
    /// the cancelled entry and everything after it stay stored.
    pub async fn replay(&self) -> Result<Option<Wave>, NetworkError> {
        let _exclusive = self.inner.replay_lock.lock().await;

        let pending = self.inner.offline.all().await?;
        if pending.is_empty() {
            debug!("Nothing to replay");
            return Ok(None);
        }

        let serial = ModeGuard::force(&self.inner.queue, ConcurrencyMode::Serial);
        info!(count = pending.len(), previous_mode:% = serial.previous(); "Replaying offline requests");

        let mut last = None;
        for entry in pending {
            let outcome = self.execute(entry.request).await;

            match &outcome {
                Err(NetworkError::Cancelled) => {
                    info!(request = entry.key.as_str(); "Replay cancelled, keeping remaining requests");
                    return Err(NetworkError::Cancelled);
                },
                Err(error) if error.is_offline() => {
                    debug!(request = entry.key.as_str(); "Still offline, keeping request for a later replay");
                },
                _ => {
                    self.inner.offline.remove(&entry.key).await?;
                },
            }

            last = Some(outcome);
        }

        drop(serial);
        last.transpose()
    }
}
