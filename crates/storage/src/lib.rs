//! Binary sidecar metadata codec.
//!
//! The sidecar (`<output>.gx`) stores the chunk table for a download so a
//! later run can resume where the previous one left off. The format is a
//! fixed-size, big-endian record layout with no header beyond the record
//! count, chosen to mirror the original GoXel accelerator's on-disk format
//! byte-for-byte.

mod sidecar;

pub use sidecar::{read_sidecar, write_sidecar, ChunkRecord, SidecarError};
