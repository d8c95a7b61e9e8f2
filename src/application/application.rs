use std::future::pending;
use std::io;
use std::sync::Arc;

use snafu::Snafu;
use snafu::prelude::*;
use tracing::{debug, info, warn};

use crate::application::{LoggingSetupError, RuntimeConfig};
use crate::driver::{CycleDriver, DriverCreationError, DriverError, DriverSummary};
use crate::ext::PathDisplayExt;
use crate::filesystem::HostFs;

pub struct Application;

impl Application {
    pub async fn run(
        runtime_config: impl Into<RuntimeConfig>,
    ) -> Result<DriverSummary, ApplicationError> {
        let runtime_config: RuntimeConfig = runtime_config.into();
        debug!("Runtime config: {:?}", runtime_config);
        info!(
            "Starting sync of {} and {}",
            runtime_config.source.best_effort_display(),
            runtime_config.destination.best_effort_display()
        );

        let summary = CycleDriver::new(Arc::new(runtime_config), HostFs)
            .context(DriverCreationSnafu)?
            .run(shutdown_signal())
            .await
            .context(DriverSnafu)?;

        info!("Exiting...");
        Ok(summary)
    }
}

/// Resolves on the first SIGINT or SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let interrupt = std::pin::pin!(wait_for("SIGINT", compio::signal::ctrl_c()));
        let terminate = std::pin::pin!(wait_for(
            "SIGTERM",
            compio::signal::unix::signal(libc::SIGTERM)
        ));
        futures::future::select(interrupt, terminate).await;
    }
    #[cfg(not(unix))]
    {
        wait_for("Ctrl-C", compio::signal::ctrl_c()).await;
    }
}

/// A listener that cannot be installed never fires, so the process keeps
/// syncing instead of stopping on the spot.
async fn wait_for(name: &str, signal: impl Future<Output = io::Result<()>>) {
    match signal.await {
        Ok(()) => info!("Received {}, shutting down", name),
        Err(error) => {
            warn!("Cannot listen for {}: {}", name, error);
            pending::<()>().await
        }
    }
}

#[derive(Debug, Snafu)]
pub enum ApplicationError {
    #[snafu(
        display("Critical failure encountered while opening the log destination"),
        visibility(pub(crate))
    )]
    LoggingError { source: LoggingSetupError },
    #[snafu(display("Critical failure encountered while starting the cycle driver"))]
    DriverCreationError { source: DriverCreationError },
    #[snafu(display("Critical failure encountered while syncing"))]
    DriverError { source: DriverError },
}
