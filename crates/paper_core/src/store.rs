//! Per-entity component storage.
//!
//! Each component kind has its own column keyed by [`EntityId`], so a lookup
//! is a single hash probe. The generic accessors are parameterized over the
//! sealed [`Component`] trait, which maps a Rust type to its column; nothing
//! outside this crate can add a kind.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::components::{ComponentKind, DataComponent, SpriteComponent, TransformComponent};
use crate::entity::EntityId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComponentError {
    #[error("entity {entity} has no {kind}")]
    Missing { entity: EntityId, kind: ComponentKind },

    #[error("entity {entity} already has a {kind}")]
    AlreadyPresent { entity: EntityId, kind: ComponentKind },

    #[error("entity {0} does not exist")]
    NoSuchEntity(EntityId),
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for crate::components::DataComponent {}
    impl Sealed for crate::components::TransformComponent {}
    impl Sealed for crate::components::SpriteComponent {}
}

/// A data block that can be attached to an entity.
pub trait Component: sealed::Sealed + Sized + 'static {
    const KIND: ComponentKind;

    #[doc(hidden)]
    fn column(store: &ComponentStore) -> &HashMap<EntityId, Self>;

    #[doc(hidden)]
    fn column_mut(store: &mut ComponentStore) -> &mut HashMap<EntityId, Self>;
}

impl Component for DataComponent {
    const KIND: ComponentKind = ComponentKind::Data;

    fn column(store: &ComponentStore) -> &HashMap<EntityId, Self> {
        &store.data
    }

    fn column_mut(store: &mut ComponentStore) -> &mut HashMap<EntityId, Self> {
        &mut store.data
    }
}

impl Component for TransformComponent {
    const KIND: ComponentKind = ComponentKind::Transform;

    fn column(store: &ComponentStore) -> &HashMap<EntityId, Self> {
        &store.transforms
    }

    fn column_mut(store: &mut ComponentStore) -> &mut HashMap<EntityId, Self> {
        &mut store.transforms
    }
}

impl Component for SpriteComponent {
    const KIND: ComponentKind = ComponentKind::Sprite;

    fn column(store: &ComponentStore) -> &HashMap<EntityId, Self> {
        &store.sprites
    }

    fn column_mut(store: &mut ComponentStore) -> &mut HashMap<EntityId, Self> {
        &mut store.sprites
    }
}

#[derive(Default)]
pub struct ComponentStore {
    alive: HashSet<EntityId>,
    // Creation order, so iteration is deterministic.
    order: Vec<EntityId>,
    data: HashMap<EntityId, DataComponent>,
    transforms: HashMap<EntityId, TransformComponent>,
    sprites: HashMap<EntityId, SpriteComponent>,
}

impl ComponentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an entity carrying only a [`DataComponent`].
    pub fn spawn(&mut self, name: &str) -> EntityId {
        let entity = EntityId::new();
        self.alive.insert(entity);
        self.order.push(entity);
        self.data.insert(entity, DataComponent::new(name));
        log::debug!("Spawned entity {entity} '{name}'");
        entity
    }

    /// Remove an entity and every component attached to it.
    pub fn despawn(&mut self, entity: EntityId) -> bool {
        if !self.alive.remove(&entity) {
            return false;
        }
        self.order.retain(|e| *e != entity);
        self.data.remove(&entity);
        self.transforms.remove(&entity);
        self.sprites.remove(&entity);
        log::debug!("Despawned entity {entity}");
        true
    }

    pub fn contains(&self, entity: EntityId) -> bool {
        self.alive.contains(&entity)
    }

    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.order.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn add_component<T: Component>(
        &mut self,
        entity: EntityId,
        component: T,
    ) -> Result<&mut T, ComponentError> {
        if !self.contains(entity) {
            return Err(ComponentError::NoSuchEntity(entity));
        }
        let column = T::column_mut(self);
        if column.contains_key(&entity) {
            return Err(ComponentError::AlreadyPresent {
                entity,
                kind: T::KIND,
            });
        }
        Ok(column.entry(entity).or_insert(component))
    }

    pub fn has_component<T: Component>(&self, entity: EntityId) -> bool {
        T::column(self).contains_key(&entity)
    }

    pub fn get_component<T: Component>(&self, entity: EntityId) -> Result<&T, ComponentError> {
        T::column(self)
            .get(&entity)
            .ok_or(ComponentError::Missing {
                entity,
                kind: T::KIND,
            })
    }

    pub fn get_component_mut<T: Component>(
        &mut self,
        entity: EntityId,
    ) -> Result<&mut T, ComponentError> {
        T::column_mut(self)
            .get_mut(&entity)
            .ok_or(ComponentError::Missing {
                entity,
                kind: T::KIND,
            })
    }

    pub fn remove_component<T: Component>(
        &mut self,
        entity: EntityId,
    ) -> Result<T, ComponentError> {
        T::column_mut(self)
            .remove(&entity)
            .ok_or(ComponentError::Missing {
                entity,
                kind: T::KIND,
            })
    }

    /// Every `(entity, component)` pair of one kind, in no particular order.
    pub fn iter<T: Component>(&self) -> impl Iterator<Item = (EntityId, &T)> + '_ {
        T::column(self).iter().map(|(id, c)| (*id, c))
    }

    /// First entity whose [`DataComponent`] has the given name.
    pub fn find_by_name(&self, name: &str) -> Option<EntityId> {
        self.order
            .iter()
            .copied()
            .find(|id| self.data.get(id).is_some_and(|d| d.name == name))
    }
}
