//! Utilities for working with buffers.
//!
//! The reduction loads 16-byte lanes, and `mlock` works on whole pages, so the
//! buffers the engine reads into are allocated with an explicit alignment
//! instead of going through `Vec<u8>`.

mod aligned;
pub use aligned::AlignedBuf;

mod pinned;
pub use pinned::PinnedArena;

/// Alignment used for scratch buffers that receive chunk reads.
pub const SCRATCH_ALIGNMENT: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum AllocError {
    #[error("zero-sized buffers are not supported")]
    ZeroSize,
    #[error("invalid layout: size={size} align={align}")]
    Layout { size: usize, align: usize },
    #[error("allocator returned null for {size} bytes")]
    OutOfMemory { size: usize },
    #[error("mlock of {len} bytes failed: {source}")]
    Lock {
        len: usize,
        #[source]
        source: std::io::Error,
    },
}

/// The system page size, falling back to 4KiB if `sysconf` can't tell us.
pub fn page_size() -> usize {
    match nix::unistd::sysconf(nix::unistd::SysconfVar::PAGE_SIZE) {
        Ok(Some(sz)) if sz > 0 => sz as usize,
        _ => 4096,
    }
}
