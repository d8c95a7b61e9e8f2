mod error_policy;
mod log_level;

pub use error_policy::ErrorPolicy;
pub use log_level::LogLevel;
