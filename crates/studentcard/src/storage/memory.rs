//! In-process slot storage.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use crate::error::{Error, Result};

use super::SlotStorage;

/// Slot storage held in a map. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slots: RefCell<HashMap<String, String>>,
    read_only: Cell<bool>,
}

impl MemoryStorage {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding one slot.
    #[must_use]
    pub fn with_slot(key: impl Into<String>, value: impl Into<String>) -> Self {
        let storage = Self::new();
        storage.slots.borrow_mut().insert(key.into(), value.into());
        storage
    }

    /// Make subsequent writes and removals fail, as a full or locked
    /// backend would.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.set(read_only);
    }

    /// Number of occupied slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.borrow().len()
    }

    /// Whether no slot is occupied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.borrow().is_empty()
    }

    fn check_writable(&self) -> Result<()> {
        if self.read_only.get() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "storage is read-only",
            )));
        }
        Ok(())
    }
}

impl SlotStorage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.slots.borrow().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        self.check_writable()?;
        self.slots
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        self.check_writable()?;
        Ok(self.slots.borrow_mut().remove(key).is_some())
    }
}
