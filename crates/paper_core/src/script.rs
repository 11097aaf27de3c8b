//! The contract between the scene and user scripts.
//!
//! A script is attached to exactly one entity. The scene calls its hooks with
//! a [`ScriptContext`] that borrows the component store mutably and the
//! frame's input snapshot immutably for the duration of the call, so a hook
//! can never see input change under it and can never hold component borrows
//! across frames.

use std::fmt;

use thiserror::Error;

use crate::entity::EntityId;
use crate::input::InputSnapshot;
use crate::store::{Component, ComponentError, ComponentStore};

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error(transparent)]
    Component(#[from] ComponentError),

    #[error("lua: {0}")]
    Lua(String),

    #[error("{0}")]
    Failed(String),
}

pub type ScriptResult = Result<(), ScriptError>;

/// Which lifecycle hook is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    Create,
    Update,
    Destroy,
}

impl Hook {
    pub fn label(self) -> &'static str {
        match self {
            Self::Create => "on_create",
            Self::Update => "on_update",
            Self::Destroy => "on_destroy",
        }
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Lifecycle of one entity-script pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptPhase {
    /// Attached, `on_create` not yet run.
    Pending,
    /// Created; receives `on_update` every frame.
    Running,
    /// `on_destroy` has run (or the script was dropped before creation).
    Destroyed,
}

/// Behaviour attached to an entity.
///
/// Hooks report failures through [`ScriptError`]; the scene's fault policy
/// decides what happens next. A missing component is such a failure, so
/// `ctx.get_component_mut::<T>()?` is the usual way to require one.
pub trait EntityScript {
    fn name(&self) -> &str {
        "script"
    }

    fn on_create(&mut self, _ctx: &mut ScriptContext<'_>) -> ScriptResult {
        Ok(())
    }

    fn on_update(&mut self, ctx: &mut ScriptContext<'_>, dt: f32) -> ScriptResult;

    fn on_destroy(&mut self, _ctx: &mut ScriptContext<'_>) -> ScriptResult {
        Ok(())
    }
}

pub struct ScriptContext<'a> {
    entity: EntityId,
    frame: u64,
    store: &'a mut ComponentStore,
    input: &'a InputSnapshot,
    destroy_queue: &'a mut Vec<EntityId>,
}

impl<'a> ScriptContext<'a> {
    pub fn new(
        entity: EntityId,
        frame: u64,
        store: &'a mut ComponentStore,
        input: &'a InputSnapshot,
        destroy_queue: &'a mut Vec<EntityId>,
    ) -> Self {
        Self {
            entity,
            frame,
            store,
            input,
            destroy_queue,
        }
    }

    /// The entity this script is attached to.
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn input(&self) -> &InputSnapshot {
        self.input
    }

    pub fn get_component<T: Component>(&self) -> Result<&T, ComponentError> {
        self.store.get_component::<T>(self.entity)
    }

    pub fn get_component_mut<T: Component>(&mut self) -> Result<&mut T, ComponentError> {
        self.store.get_component_mut::<T>(self.entity)
    }

    pub fn has_component<T: Component>(&self) -> bool {
        self.store.has_component::<T>(self.entity)
    }

    /// Fail with [`ComponentError::Missing`] unless the entity carries `T`.
    pub fn require<T: Component>(&self) -> Result<(), ComponentError> {
        self.get_component::<T>().map(|_| ())
    }

    /// Whole-store access, for scripts that touch other entities.
    pub fn components(&self) -> &ComponentStore {
        &*self.store
    }

    pub fn components_mut(&mut self) -> &mut ComponentStore {
        &mut *self.store
    }

    /// Queue this script's own entity for destruction once the hook returns.
    pub fn destroy_self(&mut self) {
        let entity = self.entity;
        self.destroy_entity(entity);
    }

    pub fn destroy_entity(&mut self, entity: EntityId) {
        if !self.destroy_queue.contains(&entity) {
            self.destroy_queue.push(entity);
        }
    }
}
