use std::{fmt, sync::Arc};

use parking_lot::Mutex;

use crate::errors::{Error, Result};

/// A single assignment box for a result produced by an executor during `flush`.
///
/// Clones share the same slot. The caller keeps one clone in its parameter value, the queued task
/// holds another through its arguments, and the backend fills the slot when the task runs. Reading
/// an empty cell is an error, as is filling a cell twice.
///
pub struct ResultCell<T> {
    name: &'static str,
    slot: Arc<Mutex<Option<T>>>,
}

impl<T> ResultCell<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            slot: Arc::new(Mutex::new(None)),
        }
    }

    /// Name of the argument this cell is bound to, used in error messages.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Store the result. May only be called once per cell.
    ///
    pub fn fill(&self, value: T) -> Result<()> {
        let mut slot = self.slot.lock();
        if slot.is_some() {
            return Err(Error::CellAlreadyFilled(self.name));
        }
        *slot = Some(value);

        Ok(())
    }

    pub fn is_filled(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Whether two cells share the same slot.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }
}

impl<T: Clone> ResultCell<T> {
    /// Get a copy of the result.
    ///
    /// Fails with `Error::CellEmpty` if the task owning this cell has not been flushed yet.
    ///
    pub fn get(&self) -> Result<T> {
        self.slot.lock().clone().ok_or(Error::CellEmpty(self.name))
    }
}

impl<T> Clone for ResultCell<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ResultCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultCell")
            .field("name", &self.name)
            .field("value", &*self.slot.lock())
            .finish()
    }
}
