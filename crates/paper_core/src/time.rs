use std::time::Instant;

const FPS_SAMPLE_COUNT: usize = 60;

/// Largest `dt` a single frame may advance by.
pub const DEFAULT_MAX_DT: f32 = 0.25;

/// Variable-step frame clock. Each frame yields one `dt` that is handed to
/// every script's `on_update`.
pub struct FrameClock {
    pub max_dt: f32,
    pub total_time: f64,
    pub frame_count: u64,
    pub last_dt: f32,
    last_instant: Instant,

    fps_samples: [f32; FPS_SAMPLE_COUNT],
    fps_sample_index: usize,
    pub smoothed_fps: f32,
    pub smoothed_frame_time_ms: f32,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            max_dt: DEFAULT_MAX_DT,
            total_time: 0.0,
            frame_count: 0,
            last_dt: 0.0,
            last_instant: Instant::now(),
            fps_samples: [1.0 / 60.0; FPS_SAMPLE_COUNT],
            fps_sample_index: 0,
            smoothed_fps: 60.0,
            smoothed_frame_time_ms: 16.667,
        }
    }

    /// Measure wall-clock time since the previous frame and return it as `dt`.
    pub fn begin_frame(&mut self) -> f32 {
        let now = Instant::now();
        let real_dt = now.duration_since(self.last_instant).as_secs_f32();
        self.last_instant = now;
        self.advance(real_dt)
    }

    /// Step the clock by an externally supplied `dt` (headless runs, replays).
    pub fn advance(&mut self, dt: f32) -> f32 {
        let mut dt = sanitize_dt(dt);

        // Spiral-of-death cap
        if dt > self.max_dt {
            log::warn!(
                "Frame took {:.1}ms, capping dt to {}ms",
                dt * 1000.0,
                self.max_dt * 1000.0
            );
            dt = self.max_dt;
        }

        self.last_dt = dt;
        self.total_time += f64::from(dt);
        self.frame_count += 1;

        self.fps_samples[self.fps_sample_index] = dt;
        self.fps_sample_index = (self.fps_sample_index + 1) % FPS_SAMPLE_COUNT;
        let avg_dt: f32 = self.fps_samples.iter().sum::<f32>() / FPS_SAMPLE_COUNT as f32;
        self.smoothed_frame_time_ms = avg_dt * 1000.0;
        self.smoothed_fps = if avg_dt > 0.0 { 1.0 / avg_dt } else { 0.0 };

        dt
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Clamp a frame delta into the range scripts are promised: finite and >= 0.
pub fn sanitize_dt(dt: f32) -> f32 {
    if dt.is_finite() && dt >= 0.0 {
        dt
    } else {
        log::warn!("Rejected frame dt {dt}, using 0");
        0.0
    }
}
