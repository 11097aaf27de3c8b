//! Paper runner: headless host for entity scripts.
//!
//! Builds a one-entity scene (transform + sprite), attaches the player script
//! (native Rust or Lua), and drives it frame by frame:
//!
//!   1. apply the frame's recorded key edges to `InputState`
//!   2. `latch()` the input into this frame's snapshot
//!   3. `FrameClock::advance(dt)` and `Scene::update(dt, &snapshot)`
//!
//! Without a replay the runner plays `--frames` idle frames. On exit the scene
//! is stopped so every script gets its `on_destroy`, and the player's final
//! transform and sprite are logged.

mod config;
mod lua_bridge;
mod player;
mod replay;

use std::path::PathBuf;

use clap::Parser;

use config::{load_config_from_path, RunnerConfig, ScriptChoice};
use lua_bridge::{LuaParam, LuaScript, LuaStatus};
use paper_core::time::FrameClock;
use paper_core::{
    EntityId, EntityScript, InputState, Scene, SpriteComponent, TransformComponent,
};
use player::PlayerScript;
use replay::{load_replay_from_path, FrameEdges};

const DEFAULT_IDLE_FRAMES: u32 = 60;
const DEFAULT_DT: f32 = 1.0 / 60.0;

/// Paper entity-script runner
#[derive(Parser)]
#[command(version, about = "Runs the player entity script against recorded input.")]
struct Cli {
    /// Runner config JSON. Command-line flags override its fields.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Replay JSON with per-frame key edges.
    #[arg(long, value_name = "PATH")]
    replay: Option<PathBuf>,

    /// "native" or a path to a Lua script.
    #[arg(long, value_name = "SCRIPT")]
    script: Option<String>,

    /// Idle frames to run when no replay is given.
    #[arg(long, default_value_t = DEFAULT_IDLE_FRAMES)]
    frames: u32,
}

fn build_script(config: &RunnerConfig) -> Result<Box<dyn EntityScript>, String> {
    match config.script_choice() {
        ScriptChoice::Native => Ok(Box::new(PlayerScript::new(
            config.speed,
            &config.release_texture,
        ))),
        ScriptChoice::Lua(path) => {
            let mut script = LuaScript::load(&path).with_hot_reload(config.hot_reload);
            if script.status() != LuaStatus::Loaded {
                return Err(format!(
                    "{}: {}",
                    script.status(),
                    script.last_error().unwrap_or("unknown error")
                ));
            }
            script.set_param("speed", LuaParam::Number(f64::from(config.speed)));
            script.set_param(
                "release_texture",
                LuaParam::Text(config.release_texture.clone()),
            );
            Ok(Box::new(script))
        }
    }
}

fn build_scene(config: &RunnerConfig) -> Result<(Scene, EntityId), String> {
    let mut scene = Scene::new("runner");
    scene.set_fault_policy(config.fault_policy);

    let player = scene.create_entity("player");
    scene
        .components_mut()
        .add_component(player, SpriteComponent::default())
        .map_err(|e| e.to_string())?;
    scene
        .attach_script(player, build_script(config)?)
        .map_err(|e| e.to_string())?;
    Ok((scene, player))
}

/// Feed `frames` through input → latch → update. Returns frames run.
fn run_frames(scene: &mut Scene, frames: &[FrameEdges], dt: f32) -> Result<u64, String> {
    let mut input = InputState::new();
    let mut clock = FrameClock::new();
    for edges in frames {
        edges.apply(&mut input);
        let snapshot = input.latch();
        let dt = clock.advance(dt);
        scene.update(dt, &snapshot).map_err(|e| e.to_string())?;
    }
    log::debug!(
        "Ran {} frames, {:.3}s simulated",
        clock.frame_count,
        clock.total_time
    );
    Ok(clock.frame_count)
}

fn log_player_state(scene: &Scene, player: EntityId) {
    let store = scene.components();
    match store.get_component::<TransformComponent>(player) {
        Ok(t) => log::info!(
            "Player transform: position {:?}, scale {:?}",
            t.position,
            t.scale
        ),
        Err(err) => log::warn!("{err}"),
    }
    match store.get_component::<SpriteComponent>(player) {
        Ok(s) => log::info!(
            "Player sprite: texture {:?}, geometry {}, color {:?}, tiling {}",
            s.texture.as_ref().map(|t| t.path()),
            s.geometry,
            s.color,
            s.tiling_factor
        ),
        Err(err) => log::warn!("{err}"),
    }
    for path in scene.textures().failed_paths() {
        log::warn!("Texture '{path}' rendered as placeholder");
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let mut config = match &cli.config {
        Some(path) => load_config_from_path(path)?,
        None => RunnerConfig::default(),
    };
    if let Some(script) = cli.script {
        config.script = script;
    }
    if let Some(replay) = cli.replay {
        config.replay = Some(replay);
    }

    let (frames, dt) = match &config.replay {
        Some(path) => {
            let replay = load_replay_from_path(path)?;
            log::info!(
                "Replay '{}': {} frames at dt {}",
                path.display(),
                replay.frame_count(),
                replay.dt
            );
            (replay.expanded_frames()?, replay.dt)
        }
        None => (
            vec![FrameEdges::default(); cli.frames as usize],
            DEFAULT_DT,
        ),
    };

    let (mut scene, player) = build_scene(&config)?;
    scene.start().map_err(|e| e.to_string())?;
    let outcome = run_frames(&mut scene, &frames, dt);
    log_player_state(&scene, player);
    scene.stop().map_err(|e| e.to_string())?;
    let ran = outcome?;
    log::info!("Finished after {ran} frames");
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Paper runner starting...");

    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        log::error!("{err}");
        std::process::exit(1);
    }
}
