//! threadfold-core library.
//!
//! Builds, for one author on a federated microblogging service, the forest of
//! every reply thread the author took part in, and marks the branches the
//! author never touched as folded.
//!
//! - [`model`]: statuses and accounts as the API returns them.
//! - [`forest`]: the mutable [`ForestState`] and its invariants.
//! - [`ingest`]: merges fetched statuses into the forest.
//! - [`classify`]: post-order fold flags and descendant counts.
//! - [`paginate`]: "N more threads" loads in either time direction.
//! - [`api`]: the conversation API trait and an in-memory implementation.
//!
//! # Conventions
//!
//! - **Errors**: `thiserror` enums at library seams ([`ForestError`],
//!   [`api::ApiError`]); `anyhow::Result` for configuration loading.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `debug!`).

pub mod api;
pub mod classify;
pub mod config;
pub mod error;
pub mod forest;
pub mod ingest;
pub mod model;
pub mod paginate;

pub use api::{ConversationApi, MemoryApi};
pub use error::{ErrorCode, ForestError};
pub use forest::{CoveredRange, DescendantCounts, ForestState};
pub use ingest::{IngestReport, Ingestor};
pub use model::{Account, Status};
pub use paginate::{Direction, LoadOutcome, Paginator};
