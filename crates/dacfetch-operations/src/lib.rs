pub mod cancel;
pub mod context;
pub mod download;
pub mod progress;
pub mod types;

pub use cancel::CancellationToken;
pub use context::FetchContext;
pub use download::{download_dacpacs, run};
pub use types::*;
