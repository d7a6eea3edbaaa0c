//! Core data model
//!
//! The vector clock and trace primitives every other subsystem builds
//! on: causal ordering, content-addressable memory records, and the
//! salience score that ranks them.

pub mod clock;
pub mod trace;

pub use clock::{Ordering, VectorClock};
pub use trace::{
    canonical_string, compute_content_hash, Hint, Importance, Purpose, Salience, Trace,
    TraceError, TraceOptions,
};
