pub mod message;
pub mod models;
pub mod protocol;
pub mod token;

/// Streaming chunk granularity. Raw content runs are written in slices of
/// at most `CHUNK_SIZE - 1` bytes so cancellation is observed between
/// chunks; any value >= 512 preserves wire compatibility.
pub const CHUNK_SIZE: usize = 4096;
