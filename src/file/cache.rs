//! Generation-keyed memoisation of derived views.
//!
//! A [`Memo`] stores one computed value together with the [`crate::file::RawBuffer`]
//! generation it was derived from. A lookup with a different generation recomputes, so a
//! view computed before a structural edit is never handed out after it. Failed
//! computations are not stored.

use std::sync::{Arc, RwLock};

use crate::Result;

/// A lazily computed value tied to a buffer generation.
#[derive(Debug)]
pub struct Memo<T> {
    slot: RwLock<Option<(u64, Arc<T>)>>,
}

impl<T> Default for Memo<T> {
    fn default() -> Self {
        Memo {
            slot: RwLock::new(None),
        }
    }
}

impl<T> Memo<T> {
    /// Create an empty memo.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the value for `generation`, computing it with `init` if the stored one is
    /// missing or stale.
    ///
    /// # Errors
    /// Returns [`crate::Error::LockError`] if the lock is poisoned, or whatever `init`
    /// returns.
    pub fn get_or_try_init<F>(&self, generation: u64, init: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Result<T>,
    {
        {
            let guard = read_lock!(self.slot)?;
            if let Some((cached, value)) = guard.as_ref() {
                if *cached == generation {
                    return Ok(Arc::clone(value));
                }
            }
        }

        let value = Arc::new(init()?);
        let mut guard = write_lock!(self.slot)?;
        *guard = Some((generation, Arc::clone(&value)));
        Ok(value)
    }

    /// Drop the stored value.
    ///
    /// # Errors
    /// Returns [`crate::Error::LockError`] if the lock is poisoned.
    pub fn invalidate(&self) -> Result<()> {
        let mut guard = write_lock!(self.slot)?;
        *guard = None;
        Ok(())
    }

    /// Returns `true` if a value computed for `generation` is stored.
    #[must_use]
    pub fn is_fresh(&self, generation: u64) -> bool {
        self.slot
            .read()
            .map(|guard| matches!(guard.as_ref(), Some((cached, _)) if *cached == generation))
            .unwrap_or(false)
    }
}
