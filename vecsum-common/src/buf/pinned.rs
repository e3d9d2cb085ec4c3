use std::{ffi::c_void, ops::Deref};

use tracing::{debug, warn};

use super::{AlignedBuf, AllocError};

/// A page-aligned buffer that stays `mlock`ed for as long as the arena lives.
///
/// Fill the buffer first (see [`PinnedArena::fill_with`]), then call [`PinnedArena::lock`].
/// Dropping the arena unlocks (if locked) and frees the memory, on every exit path.
pub struct PinnedArena {
    buf: AlignedBuf,
    locked: bool,
}

impl PinnedArena {
    /// Allocate a zeroed, page-aligned arena of `size` bytes. The arena is not locked yet.
    pub fn new(size: usize) -> Result<Self, AllocError> {
        let buf = AlignedBuf::zeroed(size, super::page_size())?;
        Ok(Self { buf, locked: false })
    }

    /// Fill the arena while it is still exclusively ours.
    ///
    /// # Panics
    ///
    /// Panics if the arena is already locked.
    pub fn fill_with<F, E>(&mut self, fill: F) -> Result<(), E>
    where
        F: FnOnce(&mut [u8]) -> Result<(), E>,
    {
        assert!(!self.locked, "arena must be filled before it is locked");
        fill(&mut self.buf)
    }

    /// `mlock` the whole arena.
    pub fn lock(&mut self) -> Result<(), AllocError> {
        if self.locked {
            return Ok(());
        }
        let len = self.buf.len();
        // SAFETY: the range is a live allocation owned by `self.buf`.
        unsafe { nix::sys::mman::mlock(self.buf.as_ptr() as *const c_void, len) }.map_err(
            |errno| AllocError::Lock {
                len,
                source: std::io::Error::from(errno),
            },
        )?;
        debug!(len, "locked arena");
        self.locked = true;
        Ok(())
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }
}

impl Deref for PinnedArena {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.buf
    }
}

impl Drop for PinnedArena {
    fn drop(&mut self) {
        if !self.locked {
            return;
        }
        let len = self.buf.len();
        // SAFETY: same range that was passed to `mlock`.
        match unsafe { nix::sys::mman::munlock(self.buf.as_ptr() as *const c_void, len) } {
            Ok(()) => debug!(len, "unlocked arena"),
            // the memory is freed right after anyway
            Err(errno) => warn!(len, %errno, "munlock failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_aligned_and_fillable() {
        let mut arena = PinnedArena::new(3 * 4096).unwrap();
        assert_eq!(arena.as_ptr() as usize % super::super::page_size(), 0);
        arena
            .fill_with(|buf| {
                buf.fill(0xab);
                Ok::<_, ()>(())
            })
            .unwrap();
        assert!(arena.iter().all(|b| *b == 0xab));
        assert!(!arena.is_locked());
    }

    #[test]
    fn lock_then_drop_unlocks() {
        let page = super::super::page_size();
        let mut arena = PinnedArena::new(page).unwrap();
        arena
            .fill_with(|buf| {
                buf.fill(7);
                Ok::<_, ()>(())
            })
            .unwrap();
        arena.lock().unwrap();
        assert!(arena.is_locked());
        // locking twice is a no-op
        arena.lock().unwrap();
        assert!(arena.iter().all(|b| *b == 7));
        drop(arena);
    }

    #[test]
    #[should_panic(expected = "filled before it is locked")]
    fn fill_after_lock_panics() {
        let mut arena = PinnedArena::new(super::super::page_size()).unwrap();
        arena.lock().unwrap();
        let _ = arena.fill_with(|_| Ok::<_, ()>(()));
    }

    #[test]
    fn fill_error_is_propagated() {
        let mut arena = PinnedArena::new(64).unwrap();
        let res = arena.fill_with(|_| Err("boom"));
        assert_eq!(res, Err("boom"));
    }
}
