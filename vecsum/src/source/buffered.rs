use tracing::{trace, warn};
use vecsum_common::buf::{AlignedBuf, SCRATCH_ALIGNMENT};

use super::{ChunkRead, DataSource};
use crate::{backend::Backend, chunk::Chunk, Error, Strategy};

/// Copies each chunk into one reusable, aligned scratch buffer.
pub struct BufferedSource<'b, B: Backend> {
    backend: &'b B,
    file: B::File,
    file_len: u64,
    scratch: AlignedBuf,
    next_index: u64,
}

impl<'b, B: Backend> BufferedSource<'b, B> {
    /// Takes ownership of `file`; it is closed again if the scratch buffer can't be allocated.
    pub fn new(
        backend: &'b B,
        file: B::File,
        file_len: u64,
        chunk_size: usize,
    ) -> Result<Self, Error> {
        let scratch = match AlignedBuf::zeroed(chunk_size, SCRATCH_ALIGNMENT) {
            Ok(buf) => buf,
            Err(source) => {
                if let Err(e) = backend.close(file) {
                    warn!("closing file after failed scratch allocation: {e}");
                }
                return Err(Error::Allocation {
                    size: chunk_size,
                    source,
                });
            }
        };
        Ok(Self {
            backend,
            file,
            file_len,
            scratch,
            next_index: 0,
        })
    }

    /// Fill the scratch buffer. Returns the number of bytes obtained, which is only
    /// short of the chunk size at EOF.
    fn fill(&mut self) -> Result<usize, Error> {
        let chunk_size = self.scratch.len();
        let mut filled = 0;
        while filled < chunk_size {
            match self.backend.read(&mut self.file, &mut self.scratch[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::io("read")(e)),
            }
        }
        Ok(filled)
    }
}

impl<'b, B: Backend> DataSource for BufferedSource<'b, B> {
    fn strategy(&self) -> Strategy {
        Strategy::Buffered
    }

    fn chunk_size(&self) -> usize {
        self.scratch.len()
    }

    fn file_len(&self) -> u64 {
        self.file_len
    }

    fn next_chunk(&mut self, consume: &mut dyn FnMut(Chunk<'_>)) -> Result<ChunkRead, Error> {
        let expected = self.scratch.len();
        match self.fill()? {
            0 => Ok(ChunkRead::Eof),
            got if got < expected => Err(Error::PartialRead { expected, got }),
            _ => {
                trace!(index = self.next_index, "buffered chunk");
                consume(Chunk::new(&self.scratch, self.next_index));
                self.next_index += 1;
                Ok(ChunkRead::Consumed)
            }
        }
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
        this.backend.close(this.file).map_err(Error::io("close"))
    }
}
