//! # qblast
//!
//! Async client for remote BLAST searches over the NCBI URL API.
//!
//! A search goes through three phases:
//!
//! 1. **submit** - the query is sent with `CMD=Put`; the service answers with a
//!    request id (`RID`) and an estimated wait (`RTOE`) inside an HTML comment.
//! 2. **poll** - the status of the request id is checked at a fixed interval until
//!    results are ready, the service loses the job, or the caller gives up.
//! 3. **download** - the results are fetched as a ZIP archive and extracted into a
//!    destination directory.
//!
//! ## Quick Start
//!
//! ```no_run
//! use qblast::{ClientConfig, JobClient, QueryConfig};
//! use std::path::Path;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let query = QueryConfig {
//!         database: "nt".to_string(),
//!         program: "blastn".to_string(),
//!         ..Default::default()
//!     };
//!     let (request, format) = query.validate(">seq1\nACGTACGTTAGC")?;
//!
//!     let mut client = JobClient::new(ClientConfig::default())?;
//!     let cancel = CancellationToken::new();
//!     let result = client
//!         .run(&request, format, Path::new("results"), &cancel)
//!         .await?;
//!
//!     println!("extracted {} files", result.files.len());
//!     Ok(())
//! }
//! ```
//!
//! The crate logs through `tracing` and installs no subscriber; the embedding
//! application chooses where events go.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Result archive extraction
pub mod archive;
/// Job lifecycle client
pub mod client;
/// Time source for the poll loop
pub mod clock;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Request URL construction
pub mod request;
/// Status envelope parsing
pub mod status;
/// Core types
pub mod types;

// Re-export commonly used types
pub use archive::ArchivePackager;
pub use client::{JobClient, classify};
pub use clock::{Clock, ManualClock, TokioClock};
pub use config::{ClientConfig, PollConfig, QueryConfig};
pub use error::{Error, Phase, Result};
pub use request::RequestBuilder;
pub use status::StatusBlock;
pub use types::{
    Database, DownloadResult, JobHandle, JobRequest, JobState, OutputFormat, PollOutcome, Program,
};
