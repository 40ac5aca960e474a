use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use reqflow_core::{DomainError, DomainResult, RequisitionId, not_found};
use reqflow_requisitions::Requisition;

use super::poisoned;

/// Requisition persistence.
///
/// The store owns identifier allocation and serializes writers, so creation
/// and transition closures run while the write lock is held.
pub trait RequisitionStore: Send + Sync {
    /// Allocate the next identifier, build the record from it and insert it.
    ///
    /// If `build` fails nothing is inserted and the identifier is not consumed.
    fn create_with(
        &self,
        build: &mut dyn FnMut(RequisitionId) -> DomainResult<Requisition>,
    ) -> DomainResult<Requisition>;

    /// Replace the record `id` with the value `apply` computes from it.
    ///
    /// Read, validation and write happen under one lock; a failing `apply`
    /// leaves the stored record untouched.
    fn update_with(
        &self,
        id: &RequisitionId,
        apply: &mut dyn FnMut(&Requisition) -> DomainResult<Requisition>,
    ) -> DomainResult<Requisition>;

    fn get(&self, id: &RequisitionId) -> Option<Requisition>;

    /// Snapshot of every record, newest first.
    fn list(&self) -> Vec<Requisition>;
}

impl<S> RequisitionStore for Arc<S>
where
    S: RequisitionStore + ?Sized,
{
    fn create_with(
        &self,
        build: &mut dyn FnMut(RequisitionId) -> DomainResult<Requisition>,
    ) -> DomainResult<Requisition> {
        (**self).create_with(build)
    }

    fn update_with(
        &self,
        id: &RequisitionId,
        apply: &mut dyn FnMut(&Requisition) -> DomainResult<Requisition>,
    ) -> DomainResult<Requisition> {
        (**self).update_with(id, apply)
    }

    fn get(&self, id: &RequisitionId) -> Option<Requisition> {
        (**self).get(id)
    }

    fn list(&self) -> Vec<Requisition> {
        (**self).list()
    }
}

#[derive(Debug)]
struct Inner {
    records: BTreeMap<u64, Requisition>,
    next_seq: u64,
}

/// In-memory requisition store keyed by the numeric part of `REQ-###`.
#[derive(Debug)]
pub struct InMemoryRequisitionStore {
    inner: RwLock<Inner>,
    id_width: usize,
}

impl InMemoryRequisitionStore {
    pub fn new(id_width: usize) -> Self {
        Self {
            inner: RwLock::new(Inner {
                records: BTreeMap::new(),
                next_seq: 1,
            }),
            id_width,
        }
    }
}

impl Default for InMemoryRequisitionStore {
    fn default() -> Self {
        Self::new(3)
    }
}

impl RequisitionStore for InMemoryRequisitionStore {
    fn create_with(
        &self,
        build: &mut dyn FnMut(RequisitionId) -> DomainResult<Requisition>,
    ) -> DomainResult<Requisition> {
        let mut inner = self.inner.write().map_err(|_| poisoned("requisition store"))?;

        let seq = inner.next_seq;
        let id = RequisitionId::from_sequence(seq, self.id_width);
        let req = build(id.clone())?;
        if req.id() != &id {
            return Err(DomainError::conflict(format!(
                "built requisition {} does not match allocated id {id}",
                req.id()
            )));
        }

        inner.next_seq = seq + 1;
        inner.records.insert(seq, req.clone());
        Ok(req)
    }

    fn update_with(
        &self,
        id: &RequisitionId,
        apply: &mut dyn FnMut(&Requisition) -> DomainResult<Requisition>,
    ) -> DomainResult<Requisition> {
        let mut inner = self.inner.write().map_err(|_| poisoned("requisition store"))?;

        let slot = id
            .sequence()
            .and_then(|seq| inner.records.get_mut(&seq))
            .filter(|req| req.id() == id)
            .ok_or_else(|| not_found::<Requisition>(id))?;

        let next = apply(slot)?;
        if next.id() != id {
            return Err(DomainError::conflict(format!(
                "update of {id} produced record {}",
                next.id()
            )));
        }

        *slot = next.clone();
        Ok(next)
    }

    fn get(&self, id: &RequisitionId) -> Option<Requisition> {
        let inner = self.inner.read().ok()?;
        let seq = id.sequence()?;
        inner.records.get(&seq).filter(|req| req.id() == id).cloned()
    }

    fn list(&self) -> Vec<Requisition> {
        let inner = match self.inner.read() {
            Ok(i) => i,
            Err(_) => return vec![],
        };

        inner.records.values().rev().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use reqflow_auth::{Actor, Role};
    use reqflow_core::UserId;
    use reqflow_requisitions::{
        FieldUpdates, NewRequisition, RequisitionStatus, RouterType, plan_creation, plan_transition,
    };
    use std::thread;

    fn test_actor() -> Actor {
        Actor::new(UserId::new("1"), "John Doe", "john.doe@sprintug.com", Role::FieldEngineer)
    }

    fn create(store: &InMemoryRequisitionStore, quantity: i64) -> DomainResult<Requisition> {
        let input = NewRequisition::new(RouterType::Mikrotik, quantity, "");
        store.create_with(&mut |id| {
            plan_creation(id, &input, &test_actor(), Utc::now()).map(|p| p.requisition)
        })
    }

    #[test]
    fn ids_are_sequential_and_zero_padded() {
        let store = InMemoryRequisitionStore::new(3);
        let first = create(&store, 1).unwrap();
        let second = create(&store, 2).unwrap();

        assert_eq!(first.id().as_str(), "REQ-001");
        assert_eq!(second.id().as_str(), "REQ-002");
    }

    #[test]
    fn failed_build_does_not_consume_an_id() {
        let store = InMemoryRequisitionStore::new(3);
        assert!(create(&store, 0).is_err());
        assert_eq!(create(&store, 1).unwrap().id().as_str(), "REQ-001");
        assert!(store.list().len() == 1);
    }

    #[test]
    fn get_returns_the_created_record() {
        let store = InMemoryRequisitionStore::new(3);
        let created = create(&store, 5).unwrap();

        assert_eq!(store.get(created.id()), Some(created));
        assert_eq!(store.get(&RequisitionId::from_sequence(99, 3)), None);
    }

    #[test]
    fn list_is_newest_first() {
        let store = InMemoryRequisitionStore::new(3);
        for _ in 0..3 {
            create(&store, 1).unwrap();
        }

        let ids: Vec<_> = store.list().iter().map(|r| r.id().to_string()).collect();
        assert_eq!(ids, ["REQ-003", "REQ-002", "REQ-001"]);
    }

    #[test]
    fn update_of_unknown_id_is_not_found() {
        let store = InMemoryRequisitionStore::new(3);
        let err = store
            .update_with(&RequisitionId::from_sequence(7, 3), &mut |r| Ok(r.clone()))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn failed_update_leaves_record_untouched() {
        let store = InMemoryRequisitionStore::new(3);
        let created = create(&store, 1).unwrap();

        let result = store.update_with(created.id(), &mut |current| {
            plan_transition(current, RequisitionStatus::Deployed, &FieldUpdates::new(), Utc::now())
                .map(|p| p.requisition)
        });

        assert!(result.is_err());
        assert_eq!(store.get(created.id()), Some(created));
    }

    #[test]
    fn concurrent_creations_get_distinct_ids() {
        let store = Arc::new(InMemoryRequisitionStore::new(3));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                thread::spawn(move || {
                    (0..25)
                        .map(|_| create(&store, 1).unwrap().id().clone())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut ids: Vec<_> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
        ids.sort_by_key(|id| id.sequence());
        ids.dedup();
        assert_eq!(ids.len(), 200);
    }

    #[test]
    fn concurrent_transitions_on_one_record_are_serialized() {
        let store = Arc::new(InMemoryRequisitionStore::new(3));
        let created = create(&store, 1).unwrap();

        let handles: Vec<_> = [RequisitionStatus::PricingNeeded, RequisitionStatus::Fulfilled]
            .into_iter()
            .map(|target| {
                let store = store.clone();
                let id = created.id().clone();
                thread::spawn(move || {
                    let updates = if target == RequisitionStatus::Fulfilled {
                        FieldUpdates::new().fulfilled_by("S1")
                    } else {
                        FieldUpdates::new()
                    };
                    store.update_with(&id, &mut |current| {
                        plan_transition(current, target, &updates, Utc::now())
                            .map(|p| p.requisition)
                    })
                })
            })
            .collect();

        let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let winners = outcomes.iter().filter(|o| o.is_ok()).count();

        // Both edges leave `pending`; whichever commits second sees the new
        // status and fails the graph guard.
        assert_eq!(winners, 1);
    }
}
