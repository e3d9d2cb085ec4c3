//! Buffer plumbing shared by the `vecsum` engine and its tools.
//!
//! - [`buf::AlignedBuf`]: a heap allocation with a caller-chosen alignment.
//! - [`buf::PinnedArena`]: an [`buf::AlignedBuf`] that is optionally `mlock`ed for its lifetime.
//! - [`codec`]: the on-disk representation of the benchmark's input files.

pub mod buf;
pub mod codec;
