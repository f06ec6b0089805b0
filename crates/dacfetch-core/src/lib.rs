use error::DacfetchError;

pub mod descriptor;
pub mod error;
pub mod paths;
pub mod project_root;
pub mod references;

pub type DacfetchResult<T> = std::result::Result<T, DacfetchError>;
