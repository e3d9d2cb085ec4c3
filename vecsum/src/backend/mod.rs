//! The storage system a run reads from.
//!
//! [`Backend`] is the plain read interface; [`ZeroCopyBackend`] adds buffers lent out
//! by the backend itself. [`LocalFs`] implements both for the local filesystem.

use std::path::Path;

mod local;
pub use local::{LocalFile, LocalFs, MappedBuffer};

pub trait Backend {
    type File;

    fn open(&self, path: &Path) -> std::io::Result<Self::File>;
    fn file_len(&self, file: &Self::File) -> std::io::Result<u64>;
    /// Read up to `buf.len()` bytes at the current position. `Ok(0)` means EOF.
    fn read(&self, file: &mut Self::File, buf: &mut [u8]) -> std::io::Result<usize>;
    /// Seek back to the start of the file.
    fn rewind(&self, file: &mut Self::File) -> std::io::Result<()>;
    fn close(&self, file: Self::File) -> std::io::Result<()>;
}

/// Reads that hand out the backend's own memory instead of copying into ours.
///
/// Every buffer returned by [`ZeroCopyBackend::read_zero`] must be passed to
/// [`ZeroCopyBackend::release`] exactly once, including empty (EOF) buffers.
pub trait ZeroCopyBackend: Backend {
    type Options;
    type Buffer;

    fn alloc_options(&self) -> std::io::Result<Self::Options>;
    /// Borrow up to `len` bytes at the current position and advance past them.
    /// An empty buffer means EOF.
    fn read_zero(
        &self,
        file: &mut Self::File,
        options: &Self::Options,
        len: usize,
    ) -> std::io::Result<Self::Buffer>;
    fn buffer_get<'a>(&'a self, buffer: &'a Self::Buffer) -> &'a [u8];
    fn buffer_length(&self, buffer: &Self::Buffer) -> usize {
        self.buffer_get(buffer).len()
    }
    fn release(&self, file: &mut Self::File, buffer: Self::Buffer);
    fn free_options(&self, options: Self::Options);
}
