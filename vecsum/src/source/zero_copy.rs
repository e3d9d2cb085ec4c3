use tracing::{trace, warn};

use super::{ChunkRead, DataSource};
use crate::{
    backend::ZeroCopyBackend,
    chunk::Chunk,
    metrics::{MetricsStorage, GLOBAL_STORAGE},
    Error, Strategy,
};

/// Reads chunks as buffers lent out by the backend.
///
/// Each lent buffer is wrapped in a scope guard right after [`ZeroCopyBackend::read_zero`]
/// returns. The guard hands the buffer back via [`ZeroCopyBackend::release`] when
/// [`DataSource::next_chunk`] returns, whether that is after consuming the chunk, at EOF,
/// on a partial read, or while unwinding from a panicking consumer.
pub struct ZeroCopySource<'b, B: ZeroCopyBackend> {
    backend: &'b B,
    file: B::File,
    options: B::Options,
    file_len: u64,
    chunk_size: usize,
    next_index: u64,
}

impl<'b, B: ZeroCopyBackend> ZeroCopySource<'b, B> {
    /// Takes ownership of `file`; it is closed again if the read options can't be allocated.
    pub fn new(
        backend: &'b B,
        file: B::File,
        file_len: u64,
        chunk_size: usize,
    ) -> Result<Self, Error> {
        let options = match backend.alloc_options() {
            Ok(options) => options,
            Err(e) => {
                if let Err(close_err) = backend.close(file) {
                    warn!("closing file after failed option allocation: {close_err}");
                }
                return Err(Error::io("alloc_options")(e));
            }
        };
        Ok(Self {
            backend,
            file,
            options,
            file_len,
            chunk_size,
            next_index: 0,
        })
    }
}

impl<'b, B: ZeroCopyBackend> DataSource for ZeroCopySource<'b, B> {
    fn strategy(&self) -> Strategy {
        Strategy::ZeroCopy
    }

    fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn file_len(&self) -> u64 {
        self.file_len
    }

    fn next_chunk(&mut self, consume: &mut dyn FnMut(Chunk<'_>)) -> Result<ChunkRead, Error> {
        let backend = self.backend;
        let expected = self.chunk_size;
        let buffer = backend
            .read_zero(&mut self.file, &self.options, expected)
            .map_err(Error::io("read_zero"))?;
        MetricsStorage::inc(&GLOBAL_STORAGE.zero_copy_buffers_acquired, 1);

        let file = &mut self.file;
        let lease = scopeguard::guard(buffer, move |buffer| {
            backend.release(file, buffer);
            MetricsStorage::inc(&GLOBAL_STORAGE.zero_copy_buffers_released, 1);
        });

        let bytes = backend.buffer_get(&lease);
        let got = bytes.len();
        if got == 0 {
            return Ok(ChunkRead::Eof);
        }
        if got < expected {
            return Err(Error::PartialRead { expected, got });
        }
        trace!(index = self.next_index, "zero-copy chunk");
        consume(Chunk::new(&bytes[..expected], self.next_index));
        self.next_index += 1;
        Ok(ChunkRead::Consumed)
    }

    fn rewind(&mut self) -> Result<(), Error> {
        self.backend
            .rewind(&mut self.file)
            .map_err(Error::io("rewind"))?;
        self.next_index = 0;
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<(), Error> {
        let this = *self;
        this.backend.free_options(this.options);
        this.backend.close(this.file).map_err(Error::io("close"))
    }
}
