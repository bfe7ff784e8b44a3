use std::cell::RefCell;
use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// JSON key-value access, the only storage surface the domain modules see.
///
/// Implemented by the Spin key-value store for deployments and by
/// [`MemoryStore`] for tests, so feed composition and the social graph
/// never depend on a live runtime.
pub trait KeyValue {
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>>;
    fn set_json<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()>;
    fn delete(&self, key: &str) -> anyhow::Result<()>;
}

impl KeyValue for spin_sdk::key_value::Store {
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        Ok(spin_sdk::key_value::Store::get_json(self, key)?)
    }

    fn set_json<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        Ok(spin_sdk::key_value::Store::set_json(self, key, value)?)
    }

    fn delete(&self, key: &str) -> anyhow::Result<()> {
        Ok(spin_sdk::key_value::Store::delete(self, key)?)
    }
}

/// In-memory store for tests. Single-threaded, like a Spin component.
#[derive(Default)]
pub struct MemoryStore {
    data: RefCell<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValue for MemoryStore {
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        match self.data.borrow().get(key) {
            Some(raw) => Ok(Some(serde_json::from_slice(raw)?)),
            None => Ok(None),
        }
    }

    fn set_json<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        let raw = serde_json::to_vec(value)?;
        self.data.borrow_mut().insert(key.to_string(), raw);
        Ok(())
    }

    fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.data.borrow_mut().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trips_and_deletes() {
        let store = MemoryStore::new();
        store.set_json("list", &vec!["a".to_string()]).unwrap();

        let got: Option<Vec<String>> = store.get_json("list").unwrap();
        assert_eq!(got, Some(vec!["a".to_string()]));

        store.delete("list").unwrap();
        let gone: Option<Vec<String>> = store.get_json("list").unwrap();
        assert!(gone.is_none());
    }
}
