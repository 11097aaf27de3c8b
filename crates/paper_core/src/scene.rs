//! Scene: entities, their scripts, and the per-frame dispatch loop.
//!
//! Frame order inside [`Scene::update`]:
//!
//!   1. `on_create` for every script attached since the last pass
//!   2. `on_update(dt)` for every running script, in attachment order;
//!      destruction requested by a script is applied right after that script
//!      returns, so a destroyed entity never receives another update
//!   3. texture cache sync for any sprite texture assigned this frame
//!
//! A failing hook is handled by the scene's [`FaultPolicy`].

use serde::Deserialize;
use thiserror::Error;

use crate::assets::TextureCache;
use crate::components::TransformComponent;
use crate::entity::EntityId;
use crate::input::InputSnapshot;
use crate::script::{EntityScript, Hook, ScriptContext, ScriptError, ScriptPhase};
use crate::store::{ComponentError, ComponentStore};
use crate::time::sanitize_dt;

/// What a failing hook does to the rest of the frame.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FaultPolicy {
    /// Log, run `on_destroy`, drop the script. The entity stays.
    #[default]
    Detach,
    /// Stop dispatching and return the error to the caller.
    Abort,
}

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("script '{script}' on entity {entity} failed in {hook}: {source}")]
    ScriptFault {
        entity: EntityId,
        script: String,
        hook: Hook,
        #[source]
        source: ScriptError,
    },

    #[error("entity {0} already has a script attached")]
    ScriptAlreadyAttached(EntityId),

    #[error("scene '{0}' is not running")]
    NotRunning(String),

    #[error(transparent)]
    Component(#[from] ComponentError),
}

struct ScriptSlot {
    entity: EntityId,
    phase: ScriptPhase,
    script: Box<dyn EntityScript>,
}

pub struct Scene {
    name: String,
    store: ComponentStore,
    scripts: Vec<ScriptSlot>,
    textures: TextureCache,
    fault_policy: FaultPolicy,
    destroy_queue: Vec<EntityId>,
    running: bool,
    frame: u64,
}

impl Scene {
    pub fn new(name: &str) -> Self {
        Self::with_textures(name, TextureCache::new())
    }

    pub fn with_textures(name: &str, textures: TextureCache) -> Self {
        Self {
            name: name.to_string(),
            store: ComponentStore::new(),
            scripts: Vec::new(),
            textures,
            fault_policy: FaultPolicy::default(),
            destroy_queue: Vec::new(),
            running: false,
            frame: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_fault_policy(&mut self, policy: FaultPolicy) {
        self.fault_policy = policy;
    }

    pub fn fault_policy(&self) -> FaultPolicy {
        self.fault_policy
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Number of update passes run so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn components(&self) -> &ComponentStore {
        &self.store
    }

    pub fn components_mut(&mut self) -> &mut ComponentStore {
        &mut self.store
    }

    pub fn textures(&self) -> &TextureCache {
        &self.textures
    }

    pub fn textures_mut(&mut self) -> &mut TextureCache {
        &mut self.textures
    }

    /// Create an entity with a name and a default transform.
    pub fn create_entity(&mut self, name: &str) -> EntityId {
        let entity = self.store.spawn(name);
        if let Err(err) = self
            .store
            .add_component(entity, TransformComponent::default())
        {
            log::error!("Failed to attach transform to entity {entity}: {err}");
        }
        entity
    }

    /// Destroy an entity now, running its script's `on_destroy` first.
    pub fn destroy_entity(&mut self, entity: EntityId) -> Result<bool, SceneError> {
        let input = InputSnapshot::empty();
        let result = self.destroy_now(entity, &input);
        self.prune();
        result
    }

    pub fn attach_script(
        &mut self,
        entity: EntityId,
        script: Box<dyn EntityScript>,
    ) -> Result<(), SceneError> {
        if !self.store.contains(entity) {
            return Err(ComponentError::NoSuchEntity(entity).into());
        }
        if self.slot_index(entity).is_some() {
            return Err(SceneError::ScriptAlreadyAttached(entity));
        }
        log::debug!(
            "Attached script '{}' to entity {} (scene '{}')",
            script.name(),
            entity,
            self.name
        );
        self.scripts.push(ScriptSlot {
            entity,
            phase: ScriptPhase::Pending,
            script,
        });
        Ok(())
    }

    /// Remove the script from an entity, running `on_destroy` if it was created.
    pub fn detach_script(&mut self, entity: EntityId) -> Result<bool, SceneError> {
        let Some(index) = self.slot_index(entity) else {
            return Ok(false);
        };
        let input = InputSnapshot::empty();
        let result = self.retire(index, &input);
        self.prune();
        result.map(|()| true)
    }

    pub fn script_phase(&self, entity: EntityId) -> Option<ScriptPhase> {
        self.scripts
            .iter()
            .rev()
            .find(|slot| slot.entity == entity)
            .map(|slot| slot.phase)
    }

    pub fn script_count(&self) -> usize {
        self.scripts
            .iter()
            .filter(|slot| slot.phase != ScriptPhase::Destroyed)
            .count()
    }

    /// Start the runtime: every attached script gets its `on_create`.
    pub fn start(&mut self) -> Result<(), SceneError> {
        if self.running {
            log::warn!("Scene '{}' already running", self.name);
            return Ok(());
        }
        self.running = true;
        log::info!(
            "Scene '{}' started with {} entities, {} scripts",
            self.name,
            self.store.len(),
            self.scripts.len()
        );
        let input = InputSnapshot::empty();
        let result = self.create_pending(&input);
        self.prune();
        result
    }

    /// Run one frame.
    pub fn update(&mut self, dt: f32, input: &InputSnapshot) -> Result<(), SceneError> {
        if !self.running {
            return Err(SceneError::NotRunning(self.name.clone()));
        }
        let dt = sanitize_dt(dt);
        self.frame += 1;

        let result = self.run_frame(dt, input);
        self.prune();
        let loaded = self.textures.sync(&self.store);
        if loaded > 0 {
            log::debug!("Frame {}: resolved {loaded} new textures", self.frame);
        }
        result
    }

    /// Stop the runtime: every created script gets its `on_destroy`.
    ///
    /// Teardown always runs to completion; under [`FaultPolicy::Abort`] the
    /// first failure is returned afterwards.
    pub fn stop(&mut self) -> Result<(), SceneError> {
        if !self.running {
            return Ok(());
        }
        let input = InputSnapshot::empty();
        let mut first_error = None;
        for index in 0..self.scripts.len() {
            if self.scripts[index].phase != ScriptPhase::Running {
                self.scripts[index].phase = ScriptPhase::Destroyed;
                continue;
            }
            if let Err(err) = self.dispatch(index, Hook::Destroy, 0.0, &input) {
                let fault = self.fault(index, Hook::Destroy, err);
                log::error!("{fault}");
                first_error.get_or_insert(fault);
            }
            self.scripts[index].phase = ScriptPhase::Destroyed;
        }
        self.scripts.clear();
        self.destroy_queue.clear();
        self.running = false;
        log::info!("Scene '{}' stopped after {} frames", self.name, self.frame);

        match (self.fault_policy, first_error) {
            (FaultPolicy::Abort, Some(err)) => Err(err),
            _ => Ok(()),
        }
    }

    fn run_frame(&mut self, dt: f32, input: &InputSnapshot) -> Result<(), SceneError> {
        self.create_pending(input)?;

        for index in 0..self.scripts.len() {
            if self.scripts[index].phase != ScriptPhase::Running {
                continue;
            }
            self.run_hook(index, Hook::Update, dt, input)?;
            self.apply_destroy_queue(input)?;
        }
        Ok(())
    }

    fn create_pending(&mut self, input: &InputSnapshot) -> Result<(), SceneError> {
        for index in 0..self.scripts.len() {
            if self.scripts[index].phase != ScriptPhase::Pending {
                continue;
            }
            self.run_hook(index, Hook::Create, 0.0, input)?;
            self.apply_destroy_queue(input)?;
        }
        Ok(())
    }

    fn run_hook(
        &mut self,
        index: usize,
        hook: Hook,
        dt: f32,
        input: &InputSnapshot,
    ) -> Result<(), SceneError> {
        let result = self.dispatch(index, hook, dt, input);
        // A failed on_create never counts as created, under either policy.
        match hook {
            Hook::Create if result.is_ok() => self.scripts[index].phase = ScriptPhase::Running,
            Hook::Create | Hook::Destroy => self.scripts[index].phase = ScriptPhase::Destroyed,
            Hook::Update => {}
        }
        match result {
            Ok(()) => Ok(()),
            Err(err) => self.handle_fault(index, hook, err, input),
        }
    }

    fn dispatch(
        &mut self,
        index: usize,
        hook: Hook,
        dt: f32,
        input: &InputSnapshot,
    ) -> Result<(), ScriptError> {
        let slot = &mut self.scripts[index];
        let mut ctx = ScriptContext::new(
            slot.entity,
            self.frame,
            &mut self.store,
            input,
            &mut self.destroy_queue,
        );
        match hook {
            Hook::Create => slot.script.on_create(&mut ctx),
            Hook::Update => slot.script.on_update(&mut ctx, dt),
            Hook::Destroy => slot.script.on_destroy(&mut ctx),
        }
    }

    fn handle_fault(
        &mut self,
        index: usize,
        hook: Hook,
        err: ScriptError,
        input: &InputSnapshot,
    ) -> Result<(), SceneError> {
        let fault = self.fault(index, hook, err);
        match self.fault_policy {
            FaultPolicy::Abort => Err(fault),
            FaultPolicy::Detach => {
                log::error!("{fault}. Detaching script.");
                if hook == Hook::Update {
                    if let Err(err) = self.dispatch(index, Hook::Destroy, 0.0, input) {
                        log::error!("{}", self.fault(index, Hook::Destroy, err));
                    }
                }
                self.scripts[index].phase = ScriptPhase::Destroyed;
                Ok(())
            }
        }
    }

    fn fault(&self, index: usize, hook: Hook, source: ScriptError) -> SceneError {
        let slot = &self.scripts[index];
        SceneError::ScriptFault {
            entity: slot.entity,
            script: slot.script.name().to_string(),
            hook,
            source,
        }
    }

    /// Run `on_destroy` if the script was created, then mark it destroyed.
    fn retire(&mut self, index: usize, input: &InputSnapshot) -> Result<(), SceneError> {
        match self.scripts[index].phase {
            ScriptPhase::Running => self.run_hook(index, Hook::Destroy, 0.0, input),
            ScriptPhase::Pending => {
                self.scripts[index].phase = ScriptPhase::Destroyed;
                Ok(())
            }
            ScriptPhase::Destroyed => Ok(()),
        }
    }

    fn destroy_now(&mut self, entity: EntityId, input: &InputSnapshot) -> Result<bool, SceneError> {
        if !self.store.contains(entity) {
            return Ok(false);
        }
        let result = match self.slot_index(entity) {
            Some(index) => self.retire(index, input),
            None => Ok(()),
        };
        // The entity goes away even if its on_destroy failed.
        self.store.despawn(entity);
        result.map(|()| true)
    }

    /// Drain the queue completely, even past a failing `on_destroy`; the
    /// first failure is returned afterwards.
    fn apply_destroy_queue(&mut self, input: &InputSnapshot) -> Result<(), SceneError> {
        let mut first_error = None;
        // on_destroy may queue further destruction, so drain until empty.
        while !self.destroy_queue.is_empty() {
            let entity = self.destroy_queue.remove(0);
            if let Err(err) = self.destroy_now(entity, input) {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn slot_index(&self, entity: EntityId) -> Option<usize> {
        self.scripts
            .iter()
            .position(|slot| slot.entity == entity && slot.phase != ScriptPhase::Destroyed)
    }

    fn prune(&mut self) {
        self.scripts.retain(|slot| slot.phase != ScriptPhase::Destroyed);
    }
}
