//! Chunk-size invariants and the [`Chunk`] view handed to the reduction.
//!
//! The reduction consumes [`DOUBLES_PER_LOOP_ITER`] doubles per iteration and has no
//! remainder loop, so a chunk must hold a whole number of such groups. The file in turn
//! must be a whole number of chunks, since every read is expected to return a full chunk.

use crate::sum::{DOUBLES_PER_LOOP_ITER, ELEMENT_SIZE};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AlignmentError {
    #[error("chunk size {chunk_size} is not a multiple of the element size {}", ELEMENT_SIZE)]
    ElementSize { chunk_size: usize },
    #[error(
        "chunk size {chunk_size} holds {elements} doubles, which is not a multiple of {}",
        DOUBLES_PER_LOOP_ITER
    )]
    UnrollWidth { chunk_size: usize, elements: usize },
    #[error("file size {file_size} is not a multiple of the chunk size {chunk_size}")]
    FileSize { file_size: u64, chunk_size: usize },
}

/// Accepts `chunk_size` iff it is a multiple of [`ELEMENT_SIZE`] and the resulting
/// element count is a multiple of [`DOUBLES_PER_LOOP_ITER`]. The rules are checked in that order.
pub fn check_chunk_size(chunk_size: usize) -> Result<(), AlignmentError> {
    if chunk_size % ELEMENT_SIZE != 0 {
        return Err(AlignmentError::ElementSize { chunk_size });
    }
    let elements = chunk_size / ELEMENT_SIZE;
    if elements % DOUBLES_PER_LOOP_ITER != 0 {
        return Err(AlignmentError::UnrollWidth {
            chunk_size,
            elements,
        });
    }
    Ok(())
}

pub fn check_file_size(file_size: u64, chunk_size: usize) -> Result<(), AlignmentError> {
    if chunk_size == 0 || file_size % chunk_size as u64 != 0 {
        return Err(AlignmentError::FileSize {
            file_size,
            chunk_size,
        });
    }
    Ok(())
}

/// A read-only view of exactly one chunk of the file.
///
/// The bytes are only borrowed: for zero-copy reads they belong to the backend and
/// go back to it as soon as the consumer returns.
#[derive(Clone, Copy, Debug)]
pub struct Chunk<'a> {
    bytes: &'a [u8],
    index: u64,
}

impl<'a> Chunk<'a> {
    pub(crate) fn new(bytes: &'a [u8], index: u64) -> Self {
        debug_assert!(check_chunk_size(bytes.len()).is_ok());
        Self { bytes, index }
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Position of this chunk within the current pass, starting at 0.
    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
