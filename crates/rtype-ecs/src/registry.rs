//! The ECS registry: entities, signatures, and per-type component storage.
//!
//! Mirrors the original engine's `Registry` (entity addresses, bitset signatures,
//! first-use component registration) with the REDESIGN FLAGS applied: component
//! type slots are assigned through a process-wide table guarded by a `Mutex`
//! (a blocking lock, not a spin loop), and the registry itself is meant to be
//! owned exclusively by a single room's game thread — no internal locking is
//! needed for entity/component access, only for the slot table shared across
//! every `Registry` instance in the process.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

use rand::Rng;
use rand_pcg::Pcg32;
use rtype_types::EntityId;

use crate::error::EcsError;

/// Maximum number of distinct component types a process may register.
pub const MAX_COMPONENTS: u32 = 32;

/// Bitset of attached component types. Bit `i` set means the entity owns the
/// component type assigned to slot `i`.
pub type Signature = u32;

fn component_slots() -> &'static Mutex<HashMap<TypeId, u32>> {
    static SLOTS: OnceLock<Mutex<HashMap<TypeId, u32>>> = OnceLock::new();
    SLOTS.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Returns the signature bit for `T`, registering it on first use. Registration
/// is serialized across all registries in the process via a single mutex,
/// replacing the source's busy-wait spinlock with a blocking critical section.
fn component_bit<T: 'static>() -> Result<Signature, EcsError> {
    let mut slots = component_slots().lock().expect("component slot table poisoned");
    let type_id = TypeId::of::<T>();
    if let Some(&slot) = slots.get(&type_id) {
        return Ok(1u32 << slot);
    }
    let next_slot = slots.len() as u32;
    if next_slot >= MAX_COMPONENTS {
        return Err(EcsError::ComponentCapExceeded(MAX_COMPONENTS));
    }
    slots.insert(type_id, next_slot);
    Ok(1u32 << next_slot)
}

trait AnyStore: Any {
    fn remove_untyped(&mut self, id: EntityId);
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: 'static> AnyStore for HashMap<EntityId, T> {
    fn remove_untyped(&mut self, id: EntityId) {
        self.remove(&id);
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Owns every entity's signature and every component type's storage. A registry is
/// meant to back exactly one room and is touched by exactly one thread at a time.
pub struct Registry {
    rng: Pcg32,
    signatures: HashMap<EntityId, Signature>,
    stores: HashMap<TypeId, Box<dyn AnyStore>>,
}

impl Registry {
    /// A registry with a non-deterministic (OS-entropy seeded) entity id generator.
    pub fn new() -> Self {
        let seed: u64 = rand::thread_rng().gen();
        Self::with_seed(seed)
    }

    /// A registry whose entity id stream is fully determined by `seed`, as required
    /// for the determinism property: identical seed + identical input log must
    /// reproduce identical per-tick snapshots.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Pcg32::new(seed, 0xa02bdbf7bb3c0a7),
            signatures: HashMap::new(),
            stores: HashMap::new(),
        }
    }

    /// Allocates a fresh non-zero id with an empty signature. IDs are drawn from a
    /// uniform distribution and retried on collision against currently-live entities.
    pub fn new_entity(&mut self) -> EntityId {
        loop {
            let candidate = self.rng.gen_range(1..=u32::MAX);
            if let Some(id) = EntityId::new(candidate) {
                if !self.signatures.contains_key(&id) {
                    self.signatures.insert(id, 0);
                    return id;
                }
            }
        }
    }

    /// Removes the entity from every component store and from the signature map.
    /// Idempotent: destroying an already-absent or never-seen id is a no-op.
    pub fn destroy_entity(&mut self, id: EntityId) {
        if self.signatures.remove(&id).is_none() {
            return;
        }
        for store in self.stores.values_mut() {
            store.remove_untyped(id);
        }
    }

    pub fn is_alive(&self, id: EntityId) -> bool {
        self.signatures.contains_key(&id)
    }

    pub fn signature(&self, id: EntityId) -> Signature {
        self.signatures.get(&id).copied().unwrap_or(0)
    }

    /// Attaches or replaces `T` on `id`. Registers the component type if this is its
    /// first use in the process. Fails if `id` is not a live entity, or if a new
    /// component type is needed but all 32 slots are already taken.
    pub fn set_component<T: 'static>(&mut self, id: EntityId, value: T) -> Result<(), EcsError> {
        if !self.signatures.contains_key(&id) {
            return Err(EcsError::MissingEntity(id));
        }
        let bit = component_bit::<T>()?;
        let store = self
            .stores
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(HashMap::<EntityId, T>::new()));
        let typed = store
            .as_any_mut()
            .downcast_mut::<HashMap<EntityId, T>>()
            .expect("component store type mismatch");
        typed.insert(id, value);
        *self.signatures.get_mut(&id).expect("checked above") |= bit;
        Ok(())
    }

    /// Clears the bit and erases the stored instance. Idempotent.
    pub fn remove_component<T: 'static>(&mut self, id: EntityId) {
        let Ok(bit) = component_bit::<T>() else {
            return;
        };
        if let Some(sig) = self.signatures.get_mut(&id) {
            *sig &= !bit;
        }
        if let Some(store) = self.stores.get_mut(&TypeId::of::<T>()) {
            store.remove_untyped(id);
        }
    }

    pub fn has_component<T: 'static>(&self, id: EntityId) -> bool {
        let Ok(bit) = component_bit::<T>() else {
            return false;
        };
        self.signatures.get(&id).is_some_and(|sig| sig & bit != 0)
    }

    pub fn get_component<T: 'static>(&self, id: EntityId) -> Result<&T, EcsError> {
        self.stores
            .get(&TypeId::of::<T>())
            .and_then(|store| (store as &dyn Any).downcast_ref::<HashMap<EntityId, T>>())
            .and_then(|typed| typed.get(&id))
            .ok_or(EcsError::MissingComponent(id))
    }

    pub fn get_component_mut<T: 'static>(&mut self, id: EntityId) -> Result<&mut T, EcsError> {
        self.stores
            .get_mut(&TypeId::of::<T>())
            .and_then(|store| store.as_any_mut().downcast_mut::<HashMap<EntityId, T>>())
            .and_then(|typed| typed.get_mut(&id))
            .ok_or(EcsError::MissingComponent(id))
    }

    /// Entities whose signature has every bit in `mask` set. Implemented as a
    /// linear scan over all live entities; the signature map is usually the
    /// smallest structure available, and iteration order need only be stable
    /// within a tick, not globally ordered.
    pub fn query(&self, mask: Signature) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self
            .signatures
            .iter()
            .filter(|(_, sig)| *sig & mask == mask)
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn entity_count(&self) -> usize {
        self.signatures.len()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns the signature bit assigned to `T`, for systems that build a
/// `requiredMask()` from several component types.
pub fn mask_of<T: 'static>() -> Signature {
    component_bit::<T>().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Pos(f32);
    struct Vel(f32);

    #[test]
    fn new_entity_ids_are_unique_and_nonzero() {
        let mut reg = Registry::with_seed(42);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..1000 {
            let id = reg.new_entity();
            assert_ne!(id.get(), 0);
            assert!(seen.insert(id));
        }
    }

    #[test]
    fn set_get_has_component_roundtrip() {
        let mut reg = Registry::with_seed(1);
        let e = reg.new_entity();
        assert!(!reg.has_component::<Pos>(e));
        reg.set_component(e, Pos(1.0)).unwrap();
        assert!(reg.has_component::<Pos>(e));
        assert_eq!(reg.get_component::<Pos>(e).unwrap().0, 1.0);
    }

    #[test]
    fn destroy_entity_clears_every_component() {
        let mut reg = Registry::with_seed(2);
        let e = reg.new_entity();
        reg.set_component(e, Pos(0.0)).unwrap();
        reg.set_component(e, Vel(0.0)).unwrap();
        reg.destroy_entity(e);
        assert!(!reg.is_alive(e));
        assert!(!reg.has_component::<Pos>(e));
        assert!(!reg.has_component::<Vel>(e));
        // idempotent
        reg.destroy_entity(e);
    }

    #[test]
    fn query_matches_signature_mask() {
        let mut reg = Registry::with_seed(3);
        let both = reg.new_entity();
        let pos_only = reg.new_entity();
        reg.set_component(both, Pos(0.0)).unwrap();
        reg.set_component(both, Vel(0.0)).unwrap();
        reg.set_component(pos_only, Pos(0.0)).unwrap();

        let mask = mask_of::<Pos>() | mask_of::<Vel>();
        let matches = reg.query(mask);
        assert_eq!(matches, vec![both]);
    }

    #[test]
    fn missing_component_is_reported_not_panicking() {
        let mut reg = Registry::with_seed(4);
        let e = reg.new_entity();
        assert!(matches!(
            reg.get_component::<Pos>(e),
            Err(EcsError::MissingComponent(_))
        ));
    }

    #[test]
    fn same_seed_same_id_stream() {
        let mut a = Registry::with_seed(99);
        let mut b = Registry::with_seed(99);
        let ids_a: Vec<_> = (0..50).map(|_| a.new_entity()).collect();
        let ids_b: Vec<_> = (0..50).map(|_| b.new_entity()).collect();
        assert_eq!(ids_a, ids_b);
    }
}
