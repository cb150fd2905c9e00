//! Observation records: the raw batch as fetched and the canonical reading
//! written to the lake.

pub mod canonical;
pub mod normalize;
pub mod raw;
pub mod timestamp;

pub use canonical::{CanonicalReading, APPROVED};
pub use normalize::normalize;
pub use raw::RawObservationBatch;
pub use timestamp::parse_timestamp;
