//! An in-memory [`Backend`] that counts every call and can be told to misbehave.

use std::{cell::RefCell, io, ops::Range, path::Path};

use crate::backend::{Backend, ZeroCopyBackend};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct Calls {
    pub opens: usize,
    pub reads: usize,
    pub zero_copy_reads: usize,
    pub acquired: usize,
    pub released: usize,
    pub rewinds: usize,
    pub closes: usize,
    pub options_allocated: usize,
    pub options_freed: usize,
}

#[derive(Default)]
pub(crate) struct MockBackend {
    data: Vec<u8>,
    /// Cap on the bytes a single `read` returns.
    pub max_read: Option<usize>,
    /// `read` stops returning data at this offset while `file_len` still reports the full size.
    pub truncate_reads_at: Option<usize>,
    /// The zero-copy read with this (0-based) call number returns at most `.1` bytes.
    pub short_zero_copy: Option<(usize, usize)>,
    pub fail_open: bool,
    /// Every n-th `read` call fails with `Interrupted` first.
    pub interrupt_every: Option<usize>,
    calls: RefCell<Calls>,
}

pub(crate) struct MockFile {
    pos: usize,
}

pub(crate) struct MockBuffer {
    range: Range<usize>,
}

impl MockBackend {
    pub(crate) fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            ..Default::default()
        }
    }

    pub(crate) fn calls(&self) -> Calls {
        self.calls.borrow().clone()
    }
}

impl Backend for MockBackend {
    type File = MockFile;

    fn open(&self, _path: &Path) -> io::Result<MockFile> {
        self.calls.borrow_mut().opens += 1;
        if self.fail_open {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "mock backend unreachable",
            ));
        }
        Ok(MockFile { pos: 0 })
    }

    fn file_len(&self, _file: &MockFile) -> io::Result<u64> {
        Ok(self.data.len() as u64)
    }

    fn read(&self, file: &mut MockFile, buf: &mut [u8]) -> io::Result<usize> {
        let call = {
            let mut calls = self.calls.borrow_mut();
            calls.reads += 1;
            calls.reads
        };
        if let Some(every) = self.interrupt_every {
            if call % every == 0 {
                return Err(io::Error::from(io::ErrorKind::Interrupted));
            }
        }
        let end = self.truncate_reads_at.unwrap_or(self.data.len());
        let available = end.saturating_sub(file.pos);
        let n = buf
            .len()
            .min(available)
            .min(self.max_read.unwrap_or(usize::MAX));
        buf[..n].copy_from_slice(&self.data[file.pos..file.pos + n]);
        file.pos += n;
        Ok(n)
    }

    fn rewind(&self, file: &mut MockFile) -> io::Result<()> {
        self.calls.borrow_mut().rewinds += 1;
        file.pos = 0;
        Ok(())
    }

    fn close(&self, _file: MockFile) -> io::Result<()> {
        self.calls.borrow_mut().closes += 1;
        Ok(())
    }
}

impl ZeroCopyBackend for MockBackend {
    type Options = ();
    type Buffer = MockBuffer;

    fn alloc_options(&self) -> io::Result<()> {
        self.calls.borrow_mut().options_allocated += 1;
        Ok(())
    }

    fn read_zero(&self, file: &mut MockFile, _options: &(), len: usize) -> io::Result<MockBuffer> {
        let call = {
            let mut calls = self.calls.borrow_mut();
            calls.zero_copy_reads += 1;
            calls.acquired += 1;
            calls.zero_copy_reads - 1
        };
        let mut n = len.min(self.data.len() - file.pos);
        if let Some((short_call, short_len)) = self.short_zero_copy {
            if call == short_call {
                n = n.min(short_len);
            }
        }
        let range = file.pos..file.pos + n;
        file.pos += n;
        Ok(MockBuffer { range })
    }

    fn buffer_get<'a>(&'a self, buffer: &'a MockBuffer) -> &'a [u8] {
        &self.data[buffer.range.clone()]
    }

    fn release(&self, _file: &mut MockFile, _buffer: MockBuffer) {
        self.calls.borrow_mut().released += 1;
    }

    fn free_options(&self, _options: ()) {
        self.calls.borrow_mut().options_freed += 1;
    }
}
