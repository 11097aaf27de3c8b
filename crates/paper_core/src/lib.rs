//! Runtime core for entity scripts: component storage, per-frame input,
//! the script lifecycle host, and the supporting clock and texture cache.

pub mod assets;
pub mod components;
pub mod entity;
pub mod input;
pub mod scene;
pub mod script;
pub mod store;
pub mod time;

pub use glam::{Vec3, Vec4};

pub use assets::{Texture, TextureCache};
pub use components::{DataComponent, Geometry, SpriteComponent, TransformComponent};
pub use entity::EntityId;
pub use input::{InputSnapshot, InputState, Key};
pub use scene::{FaultPolicy, Scene, SceneError};
pub use script::{EntityScript, ScriptContext, ScriptError, ScriptResult};
pub use store::{ComponentError, ComponentStore};
