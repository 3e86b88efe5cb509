//! Test rigs for the driftlog stack.
//!
//! - [`pipe`]: an in-memory byte pipe so a writer and reader can be wired
//!   back to back without touching the filesystem
//! - [`BiasedI64`]: a headered, delta-capable integer codec (header =
//!   bias) that exercises the header and keyframe/delta machinery
//! - [`ChannelRoundtrip`] / [`MultiChannelRoundtrip`]: write-then-read
//!   rigs used by the integration suites

mod biased;
mod pipe;
mod roundtrip;

pub use biased::BiasedI64;
pub use pipe::{PipeReader, PipeWriter, pipe};
pub use roundtrip::{ChannelRoundtrip, MultiChannelRoundtrip, TEST_APPLICATION, TEST_HOST};
