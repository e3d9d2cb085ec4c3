//! Data sources: one per [`Strategy`], all producing full chunks in file order.
//!
//! A source hands each chunk to a consumer closure instead of returning it. The chunk's
//! bytes only live for the duration of that call, which is what lets the zero-copy source
//! give the backend's buffer back before the next request.

use tracing::{debug, warn};

use crate::{
    backend::ZeroCopyBackend,
    chunk::{self, Chunk},
    Config, Error, Strategy,
};

mod buffered;
mod local_memory;
mod zero_copy;

pub use buffered::BufferedSource;
pub use local_memory::LocalMemorySource;
pub use zero_copy::ZeroCopySource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkRead {
    /// A full chunk was read and passed to the consumer.
    Consumed,
    Eof,
}

pub trait DataSource {
    fn strategy(&self) -> Strategy;
    fn chunk_size(&self) -> usize;
    fn file_len(&self) -> u64;
    /// Read the next chunk and pass it to `consume`. The consumer is not called on EOF or error.
    fn next_chunk(&mut self, consume: &mut dyn FnMut(Chunk<'_>)) -> Result<ChunkRead, Error>;
    /// Reposition at the start of the file for the next pass.
    fn rewind(&mut self) -> Result<(), Error>;
    fn close(self: Box<Self>) -> Result<(), Error>;
}

/// Open `config.path` on `backend` with the configured strategy.
///
/// Fails before issuing any read if the file is empty or not a whole number of chunks.
pub fn open<'b, B>(backend: &'b B, config: &Config) -> Result<Box<dyn DataSource + 'b>, Error>
where
    B: ZeroCopyBackend,
{
    let chunk_size = config.chunk_size.get();
    chunk::check_chunk_size(chunk_size)?;

    let mut file = backend
        .open(&config.path)
        .map_err(|source| Error::BackendConnect {
            path: config.path.clone(),
            source,
        })?;
    let checked = backend
        .file_len(&file)
        .map_err(Error::io("file_len"))
        .and_then(|len| {
            if len == 0 {
                return Err(Error::Configuration(format!(
                    "file {:?} has size 0",
                    config.path
                )));
            }
            chunk::check_file_size(len, chunk_size)?;
            Ok(len)
        });
    let file_len = match checked {
        Ok(len) => len,
        Err(e) => {
            if let Err(close_err) = backend.close(file) {
                warn!("closing {:?} after failed open: {close_err}", config.path);
            }
            return Err(e);
        }
    };
    debug!(path=?config.path, file_len, chunk_size, strategy=%config.strategy, "opened");

    Ok(match config.strategy {
        Strategy::Buffered => Box::new(BufferedSource::new(backend, file, file_len, chunk_size)?),
        Strategy::ZeroCopy => Box::new(ZeroCopySource::new(backend, file, file_len, chunk_size)?),
        Strategy::LocalMemory => {
            let loaded = LocalMemorySource::load(backend, &mut file, file_len, chunk_size)
                .and_then(|mut source| {
                    if config.lock_memory {
                        source.lock()?;
                    }
                    Ok(source)
                });
            // the arena holds everything, the file is no longer needed
            let closed = backend.close(file).map_err(Error::io("close"));
            let source = loaded?;
            closed?;
            Box::new(source)
        }
    })
}
