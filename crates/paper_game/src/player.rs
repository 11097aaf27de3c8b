use paper_core::{
    EntityScript, Geometry, Key, ScriptContext, ScriptResult, SpriteComponent, Texture,
    TransformComponent, Vec3, Vec4,
};

pub const DEFAULT_SPEED: f32 = 2.0;
pub const DEFAULT_RELEASE_TEXTURE: &str = "assets/textures/player_alt.png";

/// Keyboard-driven player.
///
/// WASD moves on the XZ plane, E/Q on Y, and the player always drifts along
/// +X at `speed`. Releasing P restyles the sprite; the tiling factor it sets
/// counts releases starting at 1.
pub struct PlayerScript {
    speed: f32,
    release_texture: Texture,
    next_tiling: u32,
}

impl PlayerScript {
    pub fn new(speed: f32, release_texture: &str) -> Self {
        Self {
            speed,
            release_texture: Texture::new(release_texture),
            next_tiling: 1,
        }
    }
}

impl Default for PlayerScript {
    fn default() -> Self {
        Self::new(DEFAULT_SPEED, DEFAULT_RELEASE_TEXTURE)
    }
}

impl EntityScript for PlayerScript {
    fn name(&self) -> &str {
        "player"
    }

    fn on_create(&mut self, ctx: &mut ScriptContext<'_>) -> ScriptResult {
        ctx.require::<TransformComponent>()?;
        ctx.require::<SpriteComponent>()?;
        log::info!("Player script created on entity {}", ctx.entity());
        Ok(())
    }

    fn on_update(&mut self, ctx: &mut ScriptContext<'_>, dt: f32) -> ScriptResult {
        let step = self.speed * dt;
        let input = ctx.input();

        let mut delta = Vec3::ZERO;
        if input.is_key_down(Key::W) {
            delta.z -= step;
        }
        if input.is_key_down(Key::A) {
            delta.x -= step;
        }
        if input.is_key_down(Key::S) {
            delta.z += step;
        }
        if input.is_key_down(Key::D) {
            delta.x += step;
        }
        if input.is_key_down(Key::E) {
            delta.y += step;
        }
        if input.is_key_down(Key::Q) {
            delta.y -= step;
        }
        // Constant drift, independent of keys.
        delta.x += step;

        let released_p = input.is_key_released(Key::P);

        let transform = ctx.get_component_mut::<TransformComponent>()?;
        transform.position += delta;

        if released_p {
            transform.scale = Vec3::new(2.0, 2.0, 1.0);

            let tiling = self.next_tiling;
            self.next_tiling += 1;

            let sprite = ctx.get_component_mut::<SpriteComponent>()?;
            sprite.texture = Some(self.release_texture.clone());
            sprite.geometry = Geometry::Circle;
            sprite.color = Vec4::new(1.0, 0.0, 0.0, 1.0);
            sprite.tiling_factor = tiling as f32;
            log::debug!("Player sprite restyled, tiling factor {tiling}");
        }

        Ok(())
    }

    fn on_destroy(&mut self, ctx: &mut ScriptContext<'_>) -> ScriptResult {
        log::info!(
            "Player script destroyed on entity {} after {} restyles",
            ctx.entity(),
            self.next_tiling - 1
        );
        Ok(())
    }
}
