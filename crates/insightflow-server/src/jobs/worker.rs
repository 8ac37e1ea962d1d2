//! Background consumer of the analysis queue

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info};

use super::{AnalysisEvents, AnalysisJob};
use crate::features::analyses::commands::process;
use crate::store::SharedStore;

/// Drains the analysis queue, running up to `concurrency` jobs at a time
pub struct AnalysisWorker {
    receiver: mpsc::Receiver<AnalysisJob>,
    store: SharedStore,
    events: AnalysisEvents,
    concurrency: usize,
}

impl AnalysisWorker {
    pub fn new(
        receiver: mpsc::Receiver<AnalysisJob>,
        store: SharedStore,
        events: AnalysisEvents,
        concurrency: usize,
    ) -> Self {
        Self {
            receiver,
            store,
            events,
            concurrency: concurrency.max(1),
        }
    }

    /// Spawn the worker; the task ends once every queue handle is dropped and the backlog is done
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            info!(concurrency = self.concurrency, "Analysis worker started");
            self.run().await;
            info!("Analysis worker stopped");
        })
    }

    async fn run(self) {
        let store = self.store;
        let events = self.events;

        ReceiverStream::new(self.receiver)
            .for_each_concurrent(self.concurrency, |job| {
                let store = store.clone();
                let events = events.clone();
                async move {
                    let analysis_id = job.analysis_id;
                    // Failures are already logged and recorded on the analysis
                    if process::handle(store, &events, job).await.is_err() {
                        debug!(analysis_id = %analysis_id, "Analysis job ended in failure");
                    }
                }
            })
            .await;
    }
}
