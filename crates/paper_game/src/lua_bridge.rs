//! Lua entity scripts.
//!
//! A [`LuaScript`] is an [`EntityScript`] whose hooks live in a Lua file as
//! global functions `on_create()`, `on_update(dt)` and `on_destroy()`. Any of
//! them may be omitted.
//!
//! Component access works by snapshot and write-back: before each hook Rust
//! fills `engine.transform` and `engine.sprite` with plain tables holding the
//! entity's current values; after the hook returns Rust reads those tables
//! back and writes them into the component store. A component the entity does
//! not carry is `nil` on the Lua side, and `engine.require(kind)` raises a Lua
//! error for it, which reaches the scene as a script fault.
//!
//! Input is exposed as three lookup tables (`_down` / `_pressed` /
//! `_released`) rebuilt from the frame's snapshot, with `is_key_*` helpers
//! that validate key names.
//!
//! Reload strategy: on file change (mtime polling, opt-in) a **fresh Lua
//! state** is created and the file re-executed. Lua locals are lost; the
//! script is not re-created, so `on_create` still runs only once.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use mlua::prelude::*;
use paper_core::{
    DataComponent, EntityScript, Geometry, Key, ScriptContext, ScriptError, ScriptResult,
    SpriteComponent, Texture, TransformComponent, Vec3, Vec4,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LuaStatus {
    /// Script loaded and running normally.
    Loaded,
    /// Script failed to read or execute.
    Error,
    /// No script file found.
    Missing,
}

impl LuaStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Loaded => "Lua: loaded",
            Self::Error => "Lua: ERROR",
            Self::Missing => "Lua: missing",
        }
    }
}

impl std::fmt::Display for LuaStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Value passed into `engine.params` before the script runs.
#[derive(Debug, Clone, PartialEq)]
pub enum LuaParam {
    Number(f64),
    Text(String),
}

pub struct LuaScript {
    lua: Lua,
    name: String,
    script_path: PathBuf,
    last_modified: Option<SystemTime>,
    status: LuaStatus,
    last_error: Option<String>,
    params: Vec<(String, LuaParam)>,
    hot_reload: bool,
}

impl LuaScript {
    /// Load a script. A missing or broken file is not an error here; every
    /// hook then fails with the recorded reason.
    pub fn load(script_path: impl Into<PathBuf>) -> Self {
        let script_path = script_path.into();
        let name = script_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "lua".to_string());
        let mut script = Self {
            lua: Lua::new(),
            name,
            script_path,
            last_modified: None,
            status: LuaStatus::Missing,
            last_error: None,
            params: Vec::new(),
            hot_reload: false,
        };
        script.try_load_script();
        script
    }

    pub fn with_hot_reload(mut self, enabled: bool) -> Self {
        self.hot_reload = enabled;
        self
    }

    /// Set `engine.params[name]`. Survives reloads.
    pub fn set_param(&mut self, name: &str, value: LuaParam) {
        self.params.retain(|(existing, _)| existing != name);
        self.params.push((name.to_string(), value));
        if let Err(err) = self.apply_params() {
            log::error!("Failed to set Lua param '{name}': {err}");
        }
    }

    pub fn status(&self) -> LuaStatus {
        self.status
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn path(&self) -> &Path {
        &self.script_path
    }

    /// Check if the script file has been modified and reload if needed.
    pub fn check_reload(&mut self) -> bool {
        let current_mtime = match std::fs::metadata(&self.script_path) {
            Ok(meta) => meta.modified().ok(),
            Err(_) => return false,
        };

        if current_mtime != self.last_modified {
            log::info!(
                "Lua script changed, reloading: {}",
                self.script_path.display()
            );
            self.try_load_script();
            return true;
        }
        false
    }

    pub fn force_reload(&mut self) {
        log::info!("Lua script force reload: {}", self.script_path.display());
        self.try_load_script();
    }

    fn call_hook(&self, ctx: &mut ScriptContext<'_>, hook: &str, dt: Option<f32>) -> ScriptResult {
        if self.status != LuaStatus::Loaded {
            let reason = self
                .last_error
                .clone()
                .unwrap_or_else(|| format!("{} ({})", self.status, self.script_path.display()));
            return Err(ScriptError::Lua(reason));
        }

        self.push_state(ctx).map_err(lua_error)?;

        let func: Option<LuaFunction> = self.lua.globals().get(hook).map_err(lua_error)?;
        if let Some(func) = func {
            let called = match dt {
                Some(dt) => func.call::<()>(dt),
                None => func.call::<()>(()),
            };
            called.map_err(lua_error)?;
        }

        self.pull_state(ctx)
    }

    /// Write the entity's components and the frame's input into `engine`.
    fn push_state(&self, ctx: &ScriptContext<'_>) -> LuaResult<()> {
        let lua = &self.lua;
        let engine: LuaTable = lua.globals().get("engine")?;

        let input_table: LuaTable = engine.get("input")?;
        let down = lua.create_table()?;
        let pressed = lua.create_table()?;
        let released = lua.create_table()?;
        let snapshot = ctx.input();
        for key in snapshot.down_keys() {
            down.set(key.name(), true)?;
        }
        for &key in Key::ALL {
            if snapshot.is_key_pressed(key) {
                pressed.set(key.name(), true)?;
            }
            if snapshot.is_key_released(key) {
                released.set(key.name(), true)?;
            }
        }
        input_table.set("_down", down)?;
        input_table.set("_pressed", pressed)?;
        input_table.set("_released", released)?;

        let entity_table: LuaTable = engine.get("entity")?;
        entity_table.set("id", ctx.entity().uuid().to_string())?;
        let name = ctx
            .get_component::<DataComponent>()
            .map(|data| data.name.clone())
            .unwrap_or_default();
        entity_table.set("name", name)?;
        entity_table.set("frame", ctx.frame())?;

        let present = lua.create_table()?;
        present.set("data", ctx.has_component::<DataComponent>())?;
        present.set("transform", ctx.has_component::<TransformComponent>())?;
        present.set("sprite", ctx.has_component::<SpriteComponent>())?;
        engine.set("_components", present)?;

        match ctx.get_component::<TransformComponent>() {
            Ok(transform) => {
                let table = lua.create_table()?;
                table.set("position", vec3_to_table(lua, transform.position)?)?;
                table.set("rotation", vec3_to_table(lua, transform.rotation)?)?;
                table.set("scale", vec3_to_table(lua, transform.scale)?)?;
                engine.set("transform", table)?;
            }
            Err(_) => engine.set("transform", LuaValue::Nil)?,
        }

        match ctx.get_component::<SpriteComponent>() {
            Ok(sprite) => {
                let table = lua.create_table()?;
                match &sprite.texture {
                    Some(texture) => table.set("texture", texture.path())?,
                    None => table.set("texture", LuaValue::Nil)?,
                }
                table.set("geometry", sprite.geometry.name())?;
                table.set("color", color_to_table(lua, sprite.color)?)?;
                table.set("tiling_factor", sprite.tiling_factor)?;
                engine.set("sprite", table)?;
            }
            Err(_) => engine.set("sprite", LuaValue::Nil)?,
        }

        engine.set("_destroy", false)?;
        Ok(())
    }

    /// Read `engine.transform` / `engine.sprite` back into the components.
    fn pull_state(&self, ctx: &mut ScriptContext<'_>) -> ScriptResult {
        let engine: LuaTable = self.lua.globals().get("engine").map_err(lua_error)?;

        let transform_table: Option<LuaTable> = engine.get("transform").map_err(lua_error)?;
        if let (Some(table), true) = (
            transform_table,
            ctx.has_component::<TransformComponent>(),
        ) {
            let position = table_to_vec3(&table, "position").map_err(lua_error)?;
            let rotation = table_to_vec3(&table, "rotation").map_err(lua_error)?;
            let scale = table_to_vec3(&table, "scale").map_err(lua_error)?;
            let transform = ctx.get_component_mut::<TransformComponent>()?;
            transform.position = position;
            transform.rotation = rotation;
            transform.scale = scale;
        }

        let sprite_table: Option<LuaTable> = engine.get("sprite").map_err(lua_error)?;
        if let (Some(table), true) = (sprite_table, ctx.has_component::<SpriteComponent>()) {
            let texture_path: Option<String> = table.get("texture").map_err(lua_error)?;
            let geometry_name: String = table.get("geometry").map_err(lua_error)?;
            let geometry = Geometry::from_name(&geometry_name).ok_or_else(|| {
                ScriptError::Lua(format!("unknown sprite geometry '{geometry_name}'"))
            })?;
            let color_table: LuaTable = table.get("color").map_err(lua_error)?;
            let color = table_to_color(&color_table).map_err(lua_error)?;
            let tiling_factor: f32 = table.get("tiling_factor").map_err(lua_error)?;

            let sprite = ctx.get_component_mut::<SpriteComponent>()?;
            let unchanged = match (&sprite.texture, &texture_path) {
                (Some(current), Some(path)) => current.path() == path,
                (None, None) => true,
                _ => false,
            };
            if !unchanged {
                sprite.texture = texture_path.map(Texture::new);
            }
            sprite.geometry = geometry;
            sprite.color = color;
            sprite.tiling_factor = tiling_factor;
        }

        let destroy: bool = engine.get("_destroy").unwrap_or(false);
        if destroy {
            ctx.destroy_self();
        }
        Ok(())
    }

    fn try_load_script(&mut self) {
        if !self.script_path.exists() {
            log::warn!("Lua script not found: {}", self.script_path.display());
            self.status = LuaStatus::Missing;
            self.last_error = Some(format!(
                "Lua script not found: {}",
                self.script_path.display()
            ));
            self.last_modified = None;
            return;
        }

        // Record mtime before loading
        self.last_modified = std::fs::metadata(&self.script_path)
            .ok()
            .and_then(|m| m.modified().ok());

        // Create a fresh Lua state to avoid stale globals
        self.lua = Lua::new();

        if let Err(err) = self.setup_engine_api().and_then(|()| self.apply_params()) {
            let msg = format!("Failed to setup Lua engine API: {}", err);
            log::error!("{}", msg);
            self.status = LuaStatus::Error;
            self.last_error = Some(msg);
            return;
        }

        match std::fs::read_to_string(&self.script_path) {
            Ok(source) => {
                match self
                    .lua
                    .load(&source)
                    .set_name(self.script_path.to_string_lossy())
                    .exec()
                {
                    Ok(()) => {
                        self.status = LuaStatus::Loaded;
                        self.last_error = None;
                        log::info!("Lua script loaded: {}", self.script_path.display());
                    }
                    Err(err) => {
                        let msg = format!("Lua script load error: {}", err);
                        log::error!("{}", msg);
                        self.status = LuaStatus::Error;
                        self.last_error = Some(msg);
                    }
                }
            }
            Err(err) => {
                let msg = format!("Failed to read Lua script: {}", err);
                log::error!("{}", msg);
                self.status = LuaStatus::Error;
                self.last_error = Some(msg);
            }
        }
    }

    fn apply_params(&self) -> LuaResult<()> {
        let engine: Option<LuaTable> = self.lua.globals().get("engine")?;
        let Some(engine) = engine else {
            return Ok(());
        };
        let params: LuaTable = engine.get("params")?;
        for (name, value) in &self.params {
            match value {
                LuaParam::Number(n) => params.set(name.as_str(), *n)?,
                LuaParam::Text(s) => params.set(name.as_str(), s.as_str())?,
            }
        }
        Ok(())
    }

    /// Build the `engine` global table that Lua scripts interact with.
    ///
    /// Layout:
    ///   engine.input.is_key_down(name)     -- held this frame
    ///   engine.input.is_key_pressed(name)  -- went down this frame
    ///   engine.input.is_key_released(name) -- went up this frame
    ///   engine.entity.id / name / frame    -- read-only
    ///   engine.transform                   -- {position, rotation, scale} or nil
    ///   engine.sprite                      -- {texture, geometry, color, tiling_factor} or nil
    ///   engine.require(kind)               -- error unless the component exists
    ///   engine.destroy()                   -- destroy this entity after the hook
    ///   engine.log(msg)                    -- info-level log line
    ///   engine.params                      -- host-supplied settings
    fn setup_engine_api(&self) -> LuaResult<()> {
        let lua = &self.lua;
        let engine = lua.create_table()?;

        let input_table = lua.create_table()?;
        input_table.set("_down", lua.create_table()?)?;
        input_table.set("_pressed", lua.create_table()?)?;
        input_table.set("_released", lua.create_table()?)?;
        input_table.set("is_key_down", key_query(lua, "_down")?)?;
        input_table.set("is_key_pressed", key_query(lua, "_pressed")?)?;
        input_table.set("is_key_released", key_query(lua, "_released")?)?;
        engine.set("input", input_table)?;

        let entity_table = lua.create_table()?;
        entity_table.set("id", "")?;
        entity_table.set("name", "")?;
        entity_table.set("frame", 0)?;
        engine.set("entity", entity_table)?;

        engine.set("_components", lua.create_table()?)?;
        engine.set("_destroy", false)?;
        engine.set("params", lua.create_table()?)?;

        // engine.require(kind)
        let require = lua.create_function(|lua_ctx, kind: String| {
            let engine: LuaTable = lua_ctx.globals().get("engine")?;
            let present: LuaTable = engine.get("_components")?;
            let label = match kind.as_str() {
                "data" => "DataComponent",
                "transform" => "TransformComponent",
                "sprite" => "SpriteComponent",
                other => {
                    return Err(LuaError::RuntimeError(format!(
                        "unknown component kind '{other}'"
                    )))
                }
            };
            let has: bool = present.get::<Option<bool>>(kind.as_str())?.unwrap_or(false);
            if has {
                Ok(())
            } else {
                Err(LuaError::RuntimeError(format!("entity has no {label}")))
            }
        })?;
        engine.set("require", require)?;

        // engine.destroy()
        let destroy = lua.create_function(|lua_ctx, ()| {
            let engine: LuaTable = lua_ctx.globals().get("engine")?;
            engine.set("_destroy", true)?;
            Ok(())
        })?;
        engine.set("destroy", destroy)?;

        // engine.log(msg)
        let log_fn = lua.create_function(|_, msg: String| {
            log::info!("[lua] {msg}");
            Ok(())
        })?;
        engine.set("log", log_fn)?;

        lua.globals().set("engine", engine)?;

        Ok(())
    }
}

impl EntityScript for LuaScript {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_create(&mut self, ctx: &mut ScriptContext<'_>) -> ScriptResult {
        self.call_hook(ctx, "on_create", None)
    }

    fn on_update(&mut self, ctx: &mut ScriptContext<'_>, dt: f32) -> ScriptResult {
        if self.hot_reload {
            self.check_reload();
        }
        self.call_hook(ctx, "on_update", Some(dt))
    }

    fn on_destroy(&mut self, ctx: &mut ScriptContext<'_>) -> ScriptResult {
        self.call_hook(ctx, "on_destroy", None)
    }
}

/// `engine.input.<query>(name)` reading one of the snapshot sets.
fn key_query(lua: &Lua, set_name: &'static str) -> LuaResult<LuaFunction> {
    lua.create_function(move |lua_ctx, name: String| {
        let key = Key::from_name(&name)
            .ok_or_else(|| LuaError::RuntimeError(format!("unknown key '{name}'")))?;
        let engine: LuaTable = lua_ctx.globals().get("engine")?;
        let input: LuaTable = engine.get("input")?;
        let set: LuaTable = input.get(set_name)?;
        let result: bool = set.get::<Option<bool>>(key.name())?.unwrap_or(false);
        Ok(result)
    })
}

fn lua_error(err: LuaError) -> ScriptError {
    ScriptError::Lua(err.to_string())
}

fn vec3_to_table(lua: &Lua, v: Vec3) -> LuaResult<LuaTable> {
    let table = lua.create_table()?;
    table.set("x", v.x)?;
    table.set("y", v.y)?;
    table.set("z", v.z)?;
    Ok(table)
}

fn table_to_vec3(parent: &LuaTable, field: &str) -> LuaResult<Vec3> {
    let table: LuaTable = parent.get(field)?;
    Ok(Vec3::new(
        table.get("x")?,
        table.get("y")?,
        table.get("z")?,
    ))
}

fn color_to_table(lua: &Lua, c: Vec4) -> LuaResult<LuaTable> {
    let table = lua.create_table()?;
    table.set("r", c.x)?;
    table.set("g", c.y)?;
    table.set("b", c.z)?;
    table.set("a", c.w)?;
    Ok(table)
}

fn table_to_color(table: &LuaTable) -> LuaResult<Vec4> {
    Ok(Vec4::new(
        table.get("r")?,
        table.get("g")?,
        table.get("b")?,
        table.get("a")?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::PlayerScript;
    use paper_core::assets::{AssetError, TextureData, TextureLoader};
    use paper_core::scene::FaultPolicy;
    use paper_core::{EntityId, InputState, Scene, SceneError, TextureCache};
    use std::io::Write;

    const PLAYER_SCRIPT: &str = include_str!("../../../assets/scripts/player.lua");

    struct NoopLoader;

    impl TextureLoader for NoopLoader {
        fn load(&self, _path: &str) -> Result<TextureData, AssetError> {
            Ok(TextureData::placeholder())
        }
    }

    fn temp_lua_path(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!(
            "paper_test_lua_script_{}_{}.lua",
            name,
            std::process::id()
        ));
        path
    }

    fn write_temp_script(path: &PathBuf, content: &str) {
        let mut f = std::fs::File::create(path).expect("failed to create temp script");
        f.write_all(content.as_bytes())
            .expect("failed to write temp script");
        f.flush().expect("failed to flush temp script");
    }

    fn scene_with(script: Box<dyn EntityScript>, with_sprite: bool) -> (Scene, EntityId) {
        let textures = TextureCache::with_loader(Box::new(NoopLoader));
        let mut scene = Scene::with_textures("lua_test", textures);
        let e = scene.create_entity("player");
        if with_sprite {
            scene
                .components_mut()
                .add_component(e, SpriteComponent::default())
                .unwrap();
        }
        scene.attach_script(e, script).unwrap();
        (scene, e)
    }

    #[test]
    fn lua_status_display() {
        let variants = [LuaStatus::Loaded, LuaStatus::Error, LuaStatus::Missing];
        for variant in &variants {
            assert_eq!(
                format!("{}", variant),
                variant.label(),
                "Display for {:?} should match label()",
                variant
            );
        }
    }

    #[test]
    fn missing_file_reports_missing_and_faults_on_create() {
        let script = LuaScript::load("__nonexistent_script_for_test_42__.lua");
        assert_eq!(script.status(), LuaStatus::Missing);

        let (mut scene, e) = scene_with(Box::new(script), true);
        scene.set_fault_policy(FaultPolicy::Abort);
        let err = scene.start().unwrap_err();
        assert!(matches!(err, SceneError::ScriptFault { entity, .. } if entity == e));
    }

    #[test]
    fn invalid_script_reports_error() {
        let path = temp_lua_path("invalid");
        write_temp_script(&path, "this is not valid lua !@#$");
        let script = LuaScript::load(path.clone());
        assert_eq!(script.status(), LuaStatus::Error);
        assert!(script.last_error().is_some());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn hooks_are_optional() {
        let path = temp_lua_path("empty");
        write_temp_script(&path, "-- no hooks\n");
        let (mut scene, _) = scene_with(Box::new(LuaScript::load(path.clone())), true);
        scene.set_fault_policy(FaultPolicy::Abort);
        scene.start().unwrap();
        scene.update(0.016, &paper_core::InputSnapshot::empty()).unwrap();
        scene.stop().unwrap();
        let _ = std::fs::remove_file(&path);
    }

    fn bump_mtime(path: &PathBuf) {
        let file = std::fs::File::options()
            .write(true)
            .open(path)
            .expect("failed to open temp script");
        file.set_modified(SystemTime::now() + std::time::Duration::from_secs(5))
            .expect("failed to bump mtime");
    }

    fn position_of(scene: &Scene, e: EntityId) -> Vec3 {
        scene
            .components()
            .get_component::<TransformComponent>(e)
            .unwrap()
            .position
    }

    #[test]
    fn changed_file_is_reloaded_before_next_update() {
        let path = temp_lua_path("hot_reload");
        write_temp_script(
            &path,
            "function on_create() created = true end\n\
             function on_update(dt) engine.transform.position.x = 1 end\n",
        );
        let script = LuaScript::load(path.clone()).with_hot_reload(true);
        let (mut scene, e) = scene_with(Box::new(script), true);
        scene.set_fault_policy(FaultPolicy::Abort);
        scene.start().unwrap();
        let input = paper_core::InputSnapshot::empty();
        scene.update(0.016, &input).unwrap();
        assert_eq!(position_of(&scene, e).x, 1.0);

        write_temp_script(
            &path,
            "function on_update(dt)\n\
               engine.transform.position.x = 2\n\
               engine.transform.position.y = created and 1 or 0\n\
             end\n",
        );
        bump_mtime(&path);
        scene.update(0.016, &input).unwrap();

        // Fresh state and no second on_create, so `created` is gone.
        assert_eq!(position_of(&scene, e), Vec3::new(2.0, 0.0, 0.0));
        scene.stop().unwrap();
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn changed_file_is_ignored_without_hot_reload() {
        let path = temp_lua_path("no_hot_reload");
        write_temp_script(&path, "function on_update(dt) engine.transform.position.x = 1 end\n");
        let (mut scene, e) = scene_with(Box::new(LuaScript::load(path.clone())), true);
        scene.set_fault_policy(FaultPolicy::Abort);
        scene.start().unwrap();

        write_temp_script(&path, "function on_update(dt) engine.transform.position.x = 2 end\n");
        bump_mtime(&path);
        scene.update(0.016, &paper_core::InputSnapshot::empty()).unwrap();
        assert_eq!(position_of(&scene, e).x, 1.0);
        scene.stop().unwrap();
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn lua_player_matches_native_player() {
        let path = temp_lua_path("player");
        write_temp_script(&path, PLAYER_SCRIPT);

        let (mut lua_scene, lua_e) = scene_with(Box::new(LuaScript::load(path.clone())), true);
        let (mut native_scene, native_e) = scene_with(Box::new(PlayerScript::default()), true);
        lua_scene.set_fault_policy(FaultPolicy::Abort);
        lua_scene.start().unwrap();
        native_scene.start().unwrap();

        // (keys going down, keys going up) per frame
        let frames: &[(&[Key], &[Key])] = &[
            (&[Key::W], &[]),
            (&[Key::D, Key::E], &[]),
            (&[Key::P], &[Key::W]),
            (&[], &[Key::P]),
            (&[Key::S, Key::Q], &[Key::D]),
            (&[Key::P, Key::A], &[]),
            (&[], &[Key::P]),
        ];

        let mut input = InputState::new();
        for (down, up) in frames {
            for &k in *down {
                input.key_down(k);
            }
            for &k in *up {
                input.key_up(k);
            }
            let snap = input.latch();
            lua_scene.update(0.05, &snap).unwrap();
            native_scene.update(0.05, &snap).unwrap();
        }

        let lua_t = lua_scene
            .components()
            .get_component::<TransformComponent>(lua_e)
            .unwrap();
        let native_t = native_scene
            .components()
            .get_component::<TransformComponent>(native_e)
            .unwrap();
        assert!(
            (lua_t.position - native_t.position).length() < 1e-4,
            "lua {:?} vs native {:?}",
            lua_t.position,
            native_t.position
        );
        assert_eq!(lua_t.scale, native_t.scale);

        let lua_s = lua_scene
            .components()
            .get_component::<SpriteComponent>(lua_e)
            .unwrap();
        let native_s = native_scene
            .components()
            .get_component::<SpriteComponent>(native_e)
            .unwrap();
        assert_eq!(lua_s, native_s);
        assert_eq!(lua_s.tiling_factor, 2.0);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn lua_require_missing_sprite_is_fatal() {
        let path = temp_lua_path("require");
        write_temp_script(&path, PLAYER_SCRIPT);
        let (mut scene, _) = scene_with(Box::new(LuaScript::load(path.clone())), false);
        scene.set_fault_policy(FaultPolicy::Abort);
        let err = scene.start().unwrap_err();
        assert!(
            err.to_string().contains("SpriteComponent"),
            "unexpected error: {err}"
        );
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn unknown_key_name_raises() {
        let path = temp_lua_path("bad_key");
        write_temp_script(
            &path,
            r#"
function on_update(dt)
    engine.input.is_key_down("hyperspace")
end
"#,
        );
        let (mut scene, _) = scene_with(Box::new(LuaScript::load(path.clone())), true);
        scene.set_fault_policy(FaultPolicy::Abort);
        scene.start().unwrap();
        let err = scene
            .update(0.016, &paper_core::InputSnapshot::empty())
            .unwrap_err();
        assert!(err.to_string().contains("unknown key"), "unexpected: {err}");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn unknown_geometry_is_rejected_on_write_back() {
        let path = temp_lua_path("bad_geometry");
        write_temp_script(
            &path,
            r#"
function on_update(dt)
    engine.sprite.geometry = "hexagon"
end
"#,
        );
        let (mut scene, _) = scene_with(Box::new(LuaScript::load(path.clone())), true);
        scene.set_fault_policy(FaultPolicy::Abort);
        scene.start().unwrap();
        let err = scene
            .update(0.016, &paper_core::InputSnapshot::empty())
            .unwrap_err();
        assert!(err.to_string().contains("hexagon"));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn destroy_from_lua_removes_entity() {
        let path = temp_lua_path("destroy");
        write_temp_script(
            &path,
            r#"
destroyed = 0
function on_update(dt)
    engine.destroy()
end
function on_destroy()
    engine.log("bye from " .. engine.entity.name)
end
"#,
        );
        let (mut scene, e) = scene_with(Box::new(LuaScript::load(path.clone())), true);
        scene.start().unwrap();
        scene
            .update(0.016, &paper_core::InputSnapshot::empty())
            .unwrap();
        assert!(!scene.components().contains(e));
        assert_eq!(scene.script_count(), 0);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn params_are_visible_to_script() {
        let path = temp_lua_path("params");
        write_temp_script(
            &path,
            r#"
function on_update(dt)
    engine.transform.position.x = engine.params.speed
    engine.sprite.texture = engine.params.texture
end
"#,
        );
        let mut script = LuaScript::load(path.clone());
        script.set_param("speed", LuaParam::Number(7.5));
        script.set_param("texture", LuaParam::Text("from_params.png".to_string()));
        let (mut scene, e) = scene_with(Box::new(script), true);
        scene.set_fault_policy(FaultPolicy::Abort);
        scene.start().unwrap();
        scene
            .update(0.016, &paper_core::InputSnapshot::empty())
            .unwrap();

        let store = scene.components();
        assert_eq!(
            store.get_component::<TransformComponent>(e).unwrap().position.x,
            7.5
        );
        assert_eq!(
            store.get_component::<SpriteComponent>(e).unwrap().texture,
            Some(Texture::new("from_params.png"))
        );
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn force_reload_picks_up_new_file() {
        let path = temp_lua_path("reload");
        let _ = std::fs::remove_file(&path);
        let mut script = LuaScript::load(path.clone());
        assert_eq!(script.status(), LuaStatus::Missing);

        write_temp_script(&path, "function on_update(dt) end\n");
        script.force_reload();
        assert_eq!(
            script.status(),
            LuaStatus::Loaded,
            "After force_reload with valid script, status should be Loaded. Error: {:?}",
            script.last_error()
        );
        let _ = std::fs::remove_file(&path);
    }
}
