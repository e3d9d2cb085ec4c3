use std::{
    fs::File,
    ops::Range,
    os::unix::fs::FileExt,
    path::Path,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use memmap2::Mmap;
use tracing::{debug, trace};

use super::{Backend, ZeroCopyBackend};

/// The local filesystem. Zero-copy reads lend out slices of a read-only mapping of the file.
#[derive(Debug, Default)]
pub struct LocalFs {
    outstanding: AtomicUsize,
}

pub struct LocalFile {
    file: File,
    len: u64,
    pos: u64,
    map: Option<Arc<Mmap>>,
}

/// A slice of a file mapping, lent out by [`LocalFs::read_zero`](ZeroCopyBackend::read_zero).
pub struct MappedBuffer {
    map: Option<Arc<Mmap>>,
    range: Range<usize>,
}

impl LocalFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero-copy buffers handed out and not yet released.
    pub fn outstanding_buffers(&self) -> usize {
        self.outstanding.load(Ordering::Relaxed)
    }

    fn mapping(file: &mut LocalFile) -> std::io::Result<Arc<Mmap>> {
        if let Some(map) = &file.map {
            return Ok(Arc::clone(map));
        }
        // SAFETY: benchmark input files are not modified while a run reads them.
        let map = Arc::new(unsafe { Mmap::map(&file.file) }?);
        debug!(len = map.len(), "mapped file");
        file.map = Some(Arc::clone(&map));
        Ok(map)
    }
}

impl Backend for LocalFs {
    type File = LocalFile;

    fn open(&self, path: &Path) -> std::io::Result<LocalFile> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Ok(LocalFile {
            file,
            len,
            pos: 0,
            map: None,
        })
    }

    fn file_len(&self, file: &LocalFile) -> std::io::Result<u64> {
        Ok(file.len)
    }

    fn read(&self, file: &mut LocalFile, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = file.file.read_at(buf, file.pos)?;
        file.pos += n as u64;
        Ok(n)
    }

    fn rewind(&self, file: &mut LocalFile) -> std::io::Result<()> {
        file.pos = 0;
        Ok(())
    }

    fn close(&self, file: LocalFile) -> std::io::Result<()> {
        drop(file);
        Ok(())
    }
}

impl ZeroCopyBackend for LocalFs {
    /// Local reads are never checksummed, so there is nothing to configure.
    type Options = ();
    type Buffer = MappedBuffer;

    fn alloc_options(&self) -> std::io::Result<()> {
        Ok(())
    }

    fn read_zero(
        &self,
        file: &mut LocalFile,
        _options: &(),
        len: usize,
    ) -> std::io::Result<MappedBuffer> {
        let buffer = if file.pos >= file.len {
            // mapping an empty file fails, and there is nothing to lend out anyway
            MappedBuffer {
                map: None,
                range: 0..0,
            }
        } else {
            let map = Self::mapping(file)?;
            let start = usize::try_from(file.pos)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
            let end = start.saturating_add(len).min(map.len());
            file.pos = end as u64;
            MappedBuffer {
                map: Some(map),
                range: start..end,
            }
        };
        self.outstanding.fetch_add(1, Ordering::Relaxed);
        trace!(range=?buffer.range, "lent out mapped buffer");
        Ok(buffer)
    }

    fn buffer_get<'a>(&'a self, buffer: &'a MappedBuffer) -> &'a [u8] {
        match &buffer.map {
            Some(map) => &map[buffer.range.clone()],
            None => &[],
        }
    }

    fn release(&self, _file: &mut LocalFile, buffer: MappedBuffer) {
        self.outstanding.fetch_sub(1, Ordering::Relaxed);
        drop(buffer);
    }

    fn free_options(&self, _options: ()) {}
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn file_with(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(bytes).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn read_and_rewind() {
        let data: Vec<u8> = (0..=255).collect();
        let tmp = file_with(&data);
        let fs = LocalFs::new();
        let mut file = fs.open(tmp.path()).unwrap();
        assert_eq!(fs.file_len(&file).unwrap(), 256);

        let mut buf = vec![0; 200];
        assert_eq!(fs.read(&mut file, &mut buf).unwrap(), 200);
        assert_eq!(&buf[..], &data[..200]);
        assert_eq!(fs.read(&mut file, &mut buf).unwrap(), 56);
        assert_eq!(&buf[..56], &data[200..]);
        assert_eq!(fs.read(&mut file, &mut buf).unwrap(), 0);

        fs.rewind(&mut file).unwrap();
        assert_eq!(fs.read(&mut file, &mut buf).unwrap(), 200);
        assert_eq!(&buf[..], &data[..200]);
        fs.close(file).unwrap();
    }

    #[test]
    fn zero_copy_reads_and_releases() {
        let data: Vec<u8> = (0..128).collect();
        let tmp = file_with(&data);
        let fs = LocalFs::new();
        let mut file = fs.open(tmp.path()).unwrap();
        fs.alloc_options().unwrap();

        let a = fs.read_zero(&mut file, &(), 100).unwrap();
        assert_eq!(fs.buffer_get(&a), &data[..100]);
        let b = fs.read_zero(&mut file, &(), 100).unwrap();
        assert_eq!(fs.buffer_length(&b), 28);
        assert_eq!(fs.buffer_get(&b), &data[100..]);
        let eof = fs.read_zero(&mut file, &(), 100).unwrap();
        assert_eq!(fs.buffer_length(&eof), 0);
        assert_eq!(fs.outstanding_buffers(), 3);

        fs.release(&mut file, a);
        fs.release(&mut file, b);
        fs.release(&mut file, eof);
        assert_eq!(fs.outstanding_buffers(), 0);

        fs.rewind(&mut file).unwrap();
        let again = fs.read_zero(&mut file, &(), 64).unwrap();
        assert_eq!(fs.buffer_get(&again), &data[..64]);
        fs.release(&mut file, again);
        fs.free_options(());
        fs.close(file).unwrap();
    }

    #[test]
    fn zero_copy_on_empty_file() {
        let tmp = file_with(&[]);
        let fs = LocalFs::new();
        let mut file = fs.open(tmp.path()).unwrap();
        fs.alloc_options().unwrap();
        let eof = fs.read_zero(&mut file, &(), 64).unwrap();
        assert!(fs.buffer_get(&eof).is_empty());
        fs.release(&mut file, eof);
        assert_eq!(fs.outstanding_buffers(), 0);
    }

    #[test]
    fn open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = LocalFs::new().open(&dir.path().join("nope")).err().unwrap();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}
