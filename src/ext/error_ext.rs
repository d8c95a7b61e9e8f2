use std::error::Error;

use snafu::ChainCompat;

/// Renders an error and all of its sources on one line, outermost first,
/// e.g. `Failed to snapshot the source tree: Failed to walk /src: Failed to
/// read /src: No such file or directory (os error 2)`.
pub trait ErrorChainExt {
    fn chain_display(&self) -> String;
}

impl<E: Error> ErrorChainExt for E {
    fn chain_display(&self) -> String {
        ChainCompat::new(self)
            .map(|error| error.to_string())
            .collect::<Vec<_>>()
            .join(": ")
    }
}
