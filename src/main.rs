use snafu::ResultExt;
use tracing::debug;

use crate::application::{Application, ApplicationError, LoggingSnafu, setup_tracing};
use crate::cli::Cli;

mod application;
mod cli;
mod driver;
mod ext;
mod filesystem;
mod sync;

#[compio::main]
#[snafu::report]
async fn main() -> Result<(), ApplicationError> {
    let cli_args = Cli::parse_or_exit();
    setup_tracing(cli_args.log_level, &cli_args.log_file).context(LoggingSnafu)?;
    debug!("Parsed CLI arguments: {cli_args:?}");

    Application::run(cli_args).await?;

    Ok(())
}
