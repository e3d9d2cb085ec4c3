use tracing::{debug, info};
use vecsum_common::buf::PinnedArena;

use super::{ChunkRead, DataSource};
use crate::{backend::Backend, chunk::Chunk, Error, Strategy};

/// Serves chunks out of a page-aligned arena holding the whole file.
///
/// The arena is filled once in [`LocalMemorySource::load`], so passes never touch the
/// backend. Dropping the source unlocks and frees the arena.
pub struct LocalMemorySource {
    arena: PinnedArena,
    chunk_size: usize,
    offset: usize,
    next_index: u64,
}

impl LocalMemorySource {
    /// Read the whole of `file` into a fresh arena. Does not close `file`.
    pub fn load<B: Backend>(
        backend: &B,
        file: &mut B::File,
        file_len: u64,
        chunk_size: usize,
    ) -> Result<Self, Error> {
        let size = usize::try_from(file_len).map_err(|_| {
            Error::Configuration(format!("file of {file_len} bytes does not fit in memory"))
        })?;
        info!("loading {size} bytes into an aligned arena");
        let mut arena =
            PinnedArena::new(size).map_err(|source| Error::Allocation { size, source })?;
        arena.fill_with(|buf| {
            let mut total = 0;
            while total < buf.len() {
                match backend.read(file, &mut buf[total..]) {
                    Ok(0) => {
                        return Err(Error::PartialRead {
                            expected: buf.len(),
                            got: total,
                        })
                    }
                    Ok(n) => total += n,
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(Error::io("read")(e)),
                }
            }
            Ok(())
        })?;
        debug!(size, "arena loaded");
        Ok(Self {
            arena,
            chunk_size,
            offset: 0,
            next_index: 0,
        })
    }

    /// Page-lock the arena.
    pub fn lock(&mut self) -> Result<(), Error> {
        let size = self.arena.len();
        self.arena
            .lock()
            .map_err(|source| Error::Allocation { size, source })
    }

    pub fn is_locked(&self) -> bool {
        self.arena.is_locked()
    }
}

impl DataSource for LocalMemorySource {
    fn strategy(&self) -> Strategy {
        Strategy::LocalMemory
    }

    fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn file_len(&self) -> u64 {
        self.arena.len() as u64
    }

    fn next_chunk(&mut self, consume: &mut dyn FnMut(Chunk<'_>)) -> Result<ChunkRead, Error> {
        let remaining = self.arena.len() - self.offset;
        if remaining == 0 {
            return Ok(ChunkRead::Eof);
        }
        if remaining < self.chunk_size {
            return Err(Error::PartialRead {
                expected: self.chunk_size,
                got: remaining,
            });
        }
        let end = self.offset + self.chunk_size;
        consume(Chunk::new(&self.arena[self.offset..end], self.next_index));
        self.offset = end;
        self.next_index += 1;
        Ok(ChunkRead::Consumed)
    }

    fn rewind(&mut self) -> Result<(), Error> {
        self.offset = 0;
        self.next_index = 0;
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<(), Error> {
        drop(self);
        Ok(())
    }
}
