use clap::ValueEnum;

/// What the cycle driver does when a cycle fails.
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Stop the process with a non-zero exit code.
    #[default]
    Exit,
    /// Log the failure and keep dispatching cycles.
    Continue,
}
