//! Workspace facade crate.
//!
//! Exposes feature flags that map to the individual workspace crates
//! (`core-runtime`, `core-mapping`, `core-sync`). Job workers can depend on
//! `dataio-workspace` and enable the documented features without wiring each
//! crate individually.

#[cfg(feature = "desktop-shims")]
pub use core_runtime as runtime;

#[cfg(any(feature = "desktop-shims", feature = "mapping-only"))]
pub use core_mapping as mapping;

#[cfg(feature = "desktop-shims")]
pub use core_sync as sync;
