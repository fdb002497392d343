//! Strongly-typed identifiers shared by every component.
//!
//! External reach ids (`ReachId`) come from the source hydrography and are
//! what callers see. Internal positions (`ReachIndex`, `GaugeIndex`) are what
//! the operators index by. The registry is the only place that converts
//! between the two.
//!
//! # Example
//!
//! ```
//! use rivnet_rs::types::{ReachId, ReachIndex};
//!
//! let id: ReachId = 4_021_563;
//! let idx = ReachIndex::new(0);
//! assert_eq!(idx.get(), 0);
//! assert!(id > 0);
//! ```

mod indices;

pub use indices::{GaugeIndex, ReachIndex};

/// External reach identifier (unique positive integer).
///
/// Tables encode "no downstream reach" as `0`; in memory that is `None`.
pub type ReachId = u64;

/// Table sentinel for "no downstream reach".
pub const OUTLET_SENTINEL: ReachId = 0;
