use agentspace_common::{EntityId, EntityKind, Identified};

use crate::error::StateError;

/// Uniqueness-enforcing collection of one entity variant.
///
/// Insertion order is preserved. Lookups are linear scans; sessions hold tens
/// to low hundreds of entities per variant.
#[derive(Debug, Clone)]
pub struct Registry<T> {
    kind: EntityKind,
    items: Vec<T>,
}

impl<T: Identified> Registry<T> {
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            items: Vec::new(),
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    /// Append `item`. Fails if an entity with the same id is already present.
    pub fn add(&mut self, item: T) -> Result<(), StateError> {
        if self.get(item.id())?.is_some() {
            return Err(StateError::DuplicateId {
                kind: self.kind,
                id: item.id().clone(),
            });
        }
        self.items.push(item);
        Ok(())
    }

    /// Remove the entity with `id`. Returns false if it was not present.
    pub fn remove(&mut self, id: &EntityId) -> bool {
        match self.items.iter().position(|item| item.id() == id) {
            Some(index) => {
                self.items.remove(index);
                true
            }
            None => false,
        }
    }

    /// Look up the unique entity with `id`.
    ///
    /// More than one match means the uniqueness invariant was broken and is
    /// reported as [`StateError::Corrupted`].
    pub fn get(&self, id: &EntityId) -> Result<Option<&T>, StateError> {
        self.check_unique(id)?;
        Ok(self.items.iter().find(|item| item.id() == id))
    }

    /// Mutable lookup with the same corruption check as [`Registry::get`].
    /// The id itself must not be changed through the returned reference.
    pub fn get_mut(&mut self, id: &EntityId) -> Result<Option<&mut T>, StateError> {
        self.check_unique(id)?;
        Ok(self.items.iter_mut().find(|item| item.id() == id))
    }

    fn check_unique(&self, id: &EntityId) -> Result<(), StateError> {
        let count = self.items.iter().filter(|item| item.id() == id).count();
        if count > 1 {
            return Err(StateError::Corrupted {
                kind: self.kind,
                id: id.clone(),
                count,
            });
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<T: Identified + Clone> Registry<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.items.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentspace_common::{Coordinate, Task};

    fn task(id: &str) -> Task {
        Task::with_id(id.into(), Coordinate::new(50.0, -1.0))
    }

    #[test]
    fn add_and_get() {
        let mut reg = Registry::new(EntityKind::Task);
        reg.add(task("t1")).unwrap();
        reg.add(task("t2")).unwrap();
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.get(&"t2".into()).unwrap().unwrap().id().as_str(), "t2");
        assert!(reg.get(&"t3".into()).unwrap().is_none());
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let mut reg = Registry::new(EntityKind::Task);
        reg.add(task("t1")).unwrap();
        let err = reg.add(task("t1")).unwrap_err();
        assert_eq!(
            err,
            StateError::DuplicateId {
                kind: EntityKind::Task,
                id: "t1".into(),
            }
        );
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn remove_missing_is_noop() {
        let mut reg: Registry<Task> = Registry::new(EntityKind::Task);
        assert!(!reg.remove(&"nope".into()));
        reg.add(task("t1")).unwrap();
        assert!(reg.remove(&"t1".into()));
        assert!(!reg.remove(&"t1".into()));
        assert!(reg.is_empty());
    }

    #[test]
    fn insertion_order_is_preserved() {
        let mut reg = Registry::new(EntityKind::Task);
        for id in ["c", "a", "b"] {
            reg.add(task(id)).unwrap();
        }
        reg.remove(&"a".into());
        let ids: Vec<&str> = reg.iter().map(|t| t.id().as_str()).collect();
        assert_eq!(ids, ["c", "b"]);
    }

    #[test]
    fn get_mut_edits_in_place() {
        let mut reg = Registry::new(EntityKind::Task);
        reg.add(task("t1")).unwrap();
        reg.get_mut(&"t1".into()).unwrap().unwrap().location = Coordinate::new(1.0, 2.0);
        let stored = reg.get(&"t1".into()).unwrap().unwrap();
        assert_eq!(stored.location, Coordinate::new(1.0, 2.0));
        assert!(reg.get_mut(&"t9".into()).unwrap().is_none());
    }

    #[test]
    fn double_match_reports_corruption() {
        // Bypass `add` to simulate a broken invariant.
        let mut reg = Registry::new(EntityKind::Task);
        reg.items.push(task("dup"));
        reg.items.push(task("dup"));
        let err = reg.get(&"dup".into()).unwrap_err();
        assert!(matches!(err, StateError::Corrupted { count: 2, .. }));
        assert!(reg.add(task("dup")).is_err());
    }

    #[test]
    fn ids_stay_unique_across_mixed_sequence() {
        let mut reg = Registry::new(EntityKind::Task);
        for round in 0..50 {
            let id = format!("t{}", round % 7);
            if round % 3 == 0 {
                reg.remove(&id.as_str().into());
            } else {
                let _ = reg.add(task(&id));
            }
            let mut ids: Vec<&str> = reg.iter().map(|t| t.id().as_str()).collect();
            let before = ids.len();
            ids.sort();
            ids.dedup();
            assert_eq!(ids.len(), before);
        }
    }
}
