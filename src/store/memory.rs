use std::cell::RefCell;
use std::collections::BTreeMap;

use anyhow::Result;

use crate::store::repository::Repository;

/// In-process repository; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RefCell<BTreeMap<String, String>>,
}

impl Repository for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.records.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.records
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.records.borrow().keys().cloned().collect())
    }
}
