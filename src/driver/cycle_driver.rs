use std::num::NonZeroUsize;
use std::path::Path;
use std::pin::pin;
use std::sync::Arc;
use std::thread::available_parallelism;

use compio::dispatcher::{Dispatcher, DispatcherBuilder};
use compio::runtime::spawn;
use derive_more::{Display, From};
use futures::{FutureExt, StreamExt};
use futures_channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use snafu::{ResultExt, Snafu};
use tracing::{debug, error, info, info_span, warn};

use crate::application::RuntimeConfig;
use crate::application::data::ErrorPolicy;
use crate::ext::ErrorChainExt;
use crate::filesystem::FileSystem;
use crate::sync::{ReconcileReport, SyncError, sync_dirs};

/// Default number of worker threads when unable to determine system parallelism
const DEFAULT_WORKER_THREADS: usize = 1;

/// Sequence number of a dispatched cycle, used to attribute log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, From)]
#[display("#{_0}")]
pub struct CycleId(u64);

impl CycleId {
    fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

type CycleOutcome = (CycleId, Result<ReconcileReport, CycleError>);

/// Totals over the lifetime of a driver run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverSummary {
    pub dispatched: u64,
    pub succeeded: u64,
    pub failed: u64,
}

/// Dispatches a reconciliation cycle onto a worker pool at a fixed interval.
///
/// Cycles are not serialized: a slow cycle may still be running when the
/// next one starts. The stop signal is only observed between dispatches and
/// never interrupts a running cycle.
pub struct CycleDriver<F> {
    dispatcher: Dispatcher,
    config: Arc<RuntimeConfig>,
    fs: F,
}

impl<F> CycleDriver<F>
where
    F: FileSystem + Clone + Send + 'static,
{
    pub fn new(config: Arc<RuntimeConfig>, fs: F) -> Result<Self, DriverCreationError> {
        let workers_num = Self::determine_worker_count();
        debug!("Using {} worker threads for sync cycles", workers_num);

        let dispatcher = DispatcherBuilder::new()
            .worker_threads(workers_num)
            .build()
            .context(DispatcherSnafu)?;

        Ok(Self {
            dispatcher,
            config,
            fs,
        })
    }

    /// Determines the number of worker threads available to overlapping cycles
    fn determine_worker_count() -> NonZeroUsize {
        available_parallelism().unwrap_or_else(|_| {
            NonZeroUsize::new(DEFAULT_WORKER_THREADS).unwrap_or(NonZeroUsize::MIN)
        })
    }

    /// Runs cycles until `stop` resolves, then waits for every dispatched
    /// cycle to finish.
    ///
    /// Under [`ErrorPolicy::Exit`] the first failed cycle ends the run
    /// immediately with an error, without waiting for the others.
    pub async fn run(
        self,
        stop: impl Future<Output = ()>,
    ) -> Result<DriverSummary, DriverError> {
        let (outcome_sender, mut outcome_receiver) = mpsc::unbounded::<CycleOutcome>();
        let mut ticker = compio::time::interval(self.config.interval);
        let mut stop = pin!(stop.fuse());
        let mut summary = DriverSummary::default();
        let mut next_id = CycleId::default();
        let mut in_flight: usize = 0;

        loop {
            futures::select_biased! {
                () = stop => {
                    info!("Stop requested, no further cycles will be dispatched");
                    break;
                }
                outcome = outcome_receiver.next() => {
                    if let Some(outcome) = outcome {
                        in_flight -= 1;
                        self.handle_outcome(outcome, &mut summary)?;
                    }
                }
                _ = ticker.tick().fuse() => {
                    next_id = next_id.next();
                    self.dispatch_cycle(next_id, outcome_sender.clone())?;
                    in_flight += 1;
                    summary.dispatched += 1;
                }
            }
        }

        self.drain(&mut outcome_receiver, in_flight, &mut summary)
            .await?;
        self.dispatcher.join().await.context(JoinSnafu)?;

        info!(
            "Ran {} cycles: {} succeeded, {} failed",
            summary.dispatched, summary.succeeded, summary.failed
        );
        Ok(summary)
    }

    /// Waits for the cycles still running when the stop signal arrived.
    async fn drain(
        &self,
        outcome_receiver: &mut UnboundedReceiver<CycleOutcome>,
        mut in_flight: usize,
        summary: &mut DriverSummary,
    ) -> Result<(), DriverError> {
        if in_flight > 0 {
            info!("Waiting for {} in-flight cycles to finish", in_flight);
        }

        while in_flight > 0 {
            match outcome_receiver.next().await {
                Some(outcome) => {
                    in_flight -= 1;
                    self.handle_outcome(outcome, summary)?;
                }
                None => break,
            }
        }

        Ok(())
    }

    fn handle_outcome(
        &self,
        (cycle, result): CycleOutcome,
        summary: &mut DriverSummary,
    ) -> Result<(), DriverError> {
        match result {
            Ok(_) => {
                summary.succeeded += 1;
                Ok(())
            }
            Err(error) => {
                summary.failed += 1;
                match self.config.error_policy {
                    ErrorPolicy::Exit => Err(error).context(CycleFailedSnafu { cycle }),
                    ErrorPolicy::Continue => {
                        warn!("Cycle {} failed, continuing with the next one", cycle);
                        Ok(())
                    }
                }
            }
        }
    }

    /// Dispatch one cycle to the worker pool and forward its outcome to the
    /// scheduling loop
    fn dispatch_cycle(
        &self,
        cycle: CycleId,
        outcome_sender: UnboundedSender<CycleOutcome>,
    ) -> Result<(), DriverError> {
        let fs = self.fs.clone();
        let config = self.config.clone();

        info!(
            cycle = %cycle,
            "Syncing {} and {}",
            config.source.display(),
            config.destination.display()
        );

        let receiver = self
            .dispatcher
            .dispatch(move || async move {
                run_cycle(cycle, &fs, &config.source, &config.destination)
            })
            .map_err(|e| DriverError::DispatchError {
                cycle,
                error: e.to_string(),
            })?;

        debug!("Dispatched cycle {}", cycle);

        spawn(async move {
            let result = match receiver.await {
                Ok(inner) => inner,
                Err(e) => {
                    debug!("Cycle {} was canceled: {}", cycle, e);
                    Err(CycleError::CanceledError { source: e })
                }
            };

            if let Err(send_err) = outcome_sender.unbounded_send((cycle, result)) {
                debug!("Failed to report outcome of cycle {}: {}", cycle, send_err);
            }
        })
        .detach();

        Ok(())
    }
}

/// Body of one cycle, executed on a worker thread.
fn run_cycle<F: FileSystem>(
    cycle: CycleId,
    fs: &F,
    source: &Path,
    destination: &Path,
) -> Result<ReconcileReport, CycleError> {
    let span = info_span!("cycle", id = %cycle);
    let _entered = span.enter();

    match sync_dirs(fs, source, destination) {
        Ok(report) => {
            info!("Cycle finished: {}", report);
            Ok(report)
        }
        Err(sync_error) => {
            error!("{}", sync_error.chain_display());
            if sync_error.is_permission_denied() {
                warn!(
                    "Access to {} was denied, check the permissions of both trees",
                    sync_error.path().display()
                );
            }
            Err(sync_error).context(SyncSnafu)
        }
    }
}

#[derive(Debug, Snafu)]
pub enum CycleError {
    #[snafu(display("Sync cycle failed"))]
    SyncError { source: SyncError },
    #[snafu(display("Sync cycle got cancelled"))]
    CanceledError {
        source: futures_channel::oneshot::Canceled,
    },
}

#[derive(Debug, Snafu)]
pub enum DriverCreationError {
    #[snafu(display("Failed to create the cycle dispatcher"))]
    DispatcherError { source: std::io::Error },
}

#[derive(Debug, Snafu)]
pub enum DriverError {
    #[snafu(display("Failed to dispatch cycle {}: {}", cycle, error))]
    DispatchError { cycle: CycleId, error: String },
    #[snafu(display("Cycle {} failed", cycle))]
    CycleFailed { cycle: CycleId, source: CycleError },
    #[snafu(display("Failed to shut down the cycle workers"))]
    JoinError { source: std::io::Error },
}
