mod error_ext;
mod path_ext;

pub use error_ext::ErrorChainExt;
pub use path_ext::PathDisplayExt;
