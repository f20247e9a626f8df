use std::sync::Arc;
use std::time::Duration;

use iiifb_clients::PreservationClient;
use iiifb_store::ActivityStore;
use tracing::{debug, error, info};

use crate::coordinator::JobCoordinator;
use crate::error::WorkerError;
use crate::shutdown::Shutdown;

/// Polling loop: read the watermark, collect newer activities, hand them to
/// the coordinator oldest-first, sleep, repeat. One job at a time; the loop
/// finishes the job in hand before honouring a shutdown request.
pub struct StreamReader {
    store: Arc<dyn ActivityStore>,
    preservation: Arc<PreservationClient>,
    coordinator: JobCoordinator,
    stream_uri: String,
    interval: Duration,
}

impl StreamReader {
    pub fn new(
        store: Arc<dyn ActivityStore>,
        preservation: Arc<PreservationClient>,
        coordinator: JobCoordinator,
        stream_uri: impl Into<String>,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            preservation,
            coordinator,
            stream_uri: stream_uri.into(),
            interval,
        }
    }

    pub async fn run(&self, mut shutdown: Shutdown) -> Result<(), WorkerError> {
        info!("starting iiif-builder");

        while !shutdown.is_cancelled() {
            // The store is the only source of truth for the watermark; it is
            // re-read every iteration, never cached.
            let watermark = self.store.latest_end_time().await?;
            match self.preservation.activities(&self.stream_uri, watermark).await {
                Ok(activities) => {
                    // Collected newest-first; processed oldest-first so the
                    // watermark advances monotonically.
                    for activity in activities.iter().rev() {
                        debug!(end_time = %activity.end_time, "Processing activity");
                        self.coordinator.process_activity(activity).await?;
                        if shutdown.is_cancelled() {
                            break;
                        }
                    }
                }
                Err(e) => error!(error = %e, "Could not read activities"),
            }

            debug!(seconds = self.interval.as_secs_f64(), "Sleeping between polls");
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.cancelled() => {}
            }
        }

        info!("stopping iiif-builder");
        Ok(())
    }
}
