//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for jobs running on a local
//! machine or container with a mounted data directory.
//!
//! ## Overview
//!
//! - `StagingArea` over a local data directory using `tokio::fs`, with JSON
//!   manifest decoding via `serde_json`
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::LocalStagingArea;
//! use bridge_traits::StagingArea;
//!
//! #[tokio::main]
//! async fn main() {
//!     let staging = LocalStagingArea::new("/data");
//!     let items = staging.list_data_items("out/tables").await.unwrap();
//!
//!     // Hand the staging area to the mapping resolvers
//! }
//! ```

mod staging;

pub use staging::LocalStagingArea;
