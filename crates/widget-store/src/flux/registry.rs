use indexmap::IndexMap;

use super::action::InstanceId;
use crate::fetch::Fetching;

/// Owns the records of every live instance of one widget family.
#[derive(Debug)]
pub struct Registry<R> {
    records: IndexMap<InstanceId, R>,
}

impl<R> Default for Registry<R> {
    fn default() -> Self {
        Registry {
            records: IndexMap::new(),
        }
    }
}

impl<R> Registry<R> {
    pub fn new() -> Self {
        Registry::default()
    }

    /// Inserts a new record.
    ///
    /// Never overwrites an existing record: returns `false` and drops the provided one instead.
    pub fn create(&mut self, id: InstanceId, record: R) -> bool {
        if self.records.contains_key(&id) {
            tracing::debug!("Instance '{}' already exists, not overwriting it", id);
            return false;
        }

        self.records.insert(id, record);
        true
    }

    /// Removes the record, returning it if it was present.
    pub fn destroy(&mut self, id: &InstanceId) -> Option<R> {
        self.records.shift_remove(id)
    }

    pub fn get(&self, id: &InstanceId) -> Option<&R> {
        self.records.get(id)
    }

    pub fn get_mut(&mut self, id: &InstanceId) -> Option<&mut R> {
        self.records.get_mut(id)
    }

    pub fn contains(&self, id: &InstanceId) -> bool {
        self.records.contains_key(id)
    }

    /// Returns the ids of all live instances in creation order.
    pub fn ids(&self) -> impl Iterator<Item = &InstanceId> {
        self.records.keys()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drops every record.
    pub fn clear(&mut self) {
        self.records.clear();
    }
}

impl<R: Fetching> Registry<R> {
    /// Returns the record a request completion is meant for.
    ///
    /// Completions for destroyed instances and for superseded requests yield `None`.
    pub(crate) fn settle(&mut self, id: &InstanceId, ticket: u64) -> Option<&mut R> {
        let Some(record) = self.records.get_mut(id) else {
            tracing::debug!("Discarding completion #{} for '{}': the instance no longer exists", ticket, id);
            return None;
        };
        if !record.requests().settle(ticket) {
            tracing::debug!("Discarding stale completion #{} for '{}'", ticket, id);
            return None;
        }

        Some(record)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::fetch::{RequestHandle, RequestSlot};

    #[test]
    fn create_doesnt_overwrite() {
        let mut registry = Registry::new();
        let id = InstanceId::from("a");

        assert!(registry.create(id.clone(), 1));
        assert!(!registry.create(id.clone(), 2));
        assert_eq!(registry.get(&id), Some(&1));
    }

    #[derive(Default)]
    struct Loading {
        requests: RequestSlot,
    }

    impl Fetching for Loading {
        fn requests(&mut self) -> &mut RequestSlot {
            &mut self.requests
        }
    }

    #[test]
    fn settle_only_accepts_the_latest_request_of_a_live_instance() {
        let mut registry = Registry::new();
        let id = InstanceId::from("a");
        registry.create(id.clone(), Loading::default());

        let first = RequestHandle::default();
        registry.get_mut(&id).unwrap().requests().replace(1, first.clone());
        registry.get_mut(&id).unwrap().requests().replace(2, RequestHandle::default());

        assert!(first.is_aborted());
        assert!(registry.settle(&id, 1).is_none());
        assert!(registry.settle(&id, 2).is_some());
        // Each request settles once
        assert!(registry.settle(&id, 2).is_none());

        registry.get_mut(&id).unwrap().requests().replace(3, RequestHandle::default());
        registry.destroy(&id);
        assert!(registry.settle(&id, 3).is_none());
    }

    #[test]
    fn destroy_is_idempotent() {
        let mut registry = Registry::new();
        let id = InstanceId::from("a");
        registry.create(id.clone(), "record");

        assert_eq!(registry.destroy(&id), Some("record"));
        assert_eq!(registry.destroy(&id), None);
        assert!(registry.is_empty());
        assert!(registry.create(id, "fresh"));
    }
}
