//! Recorded key-event sequences for headless runs.
//!
//! Each replay frame lists the keys that go down and come up before that
//! frame's input is latched. `repeat` stretches a frame: the first copy
//! carries the edges, the remaining copies are idle frames with the same keys
//! still held.

use paper_core::time::DEFAULT_MAX_DT;
use paper_core::{InputState, Key};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Upper bound on one frame's `repeat`: ten minutes at 60 fps.
pub const MAX_REPEAT: u32 = 36_000;

#[derive(Debug, Deserialize, Clone)]
pub struct ReplaySequence {
    #[serde(default = "default_dt")]
    pub dt: f32,
    pub frames: Vec<ReplayFrame>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReplayFrame {
    #[serde(default)]
    pub press: Vec<String>,
    #[serde(default)]
    pub release: Vec<String>,
    #[serde(default = "default_repeat")]
    pub repeat: u32,
}

/// Key edges to feed into [`InputState`] before one latch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameEdges {
    pub down: Vec<Key>,
    pub up: Vec<Key>,
}

impl FrameEdges {
    pub fn apply(&self, input: &mut InputState) {
        for &key in &self.down {
            input.key_down(key);
        }
        for &key in &self.up {
            input.key_up(key);
        }
    }
}

impl ReplaySequence {
    /// One entry per simulated frame, with `repeat` unrolled.
    pub fn expanded_frames(&self) -> Result<Vec<FrameEdges>, String> {
        let mut out = Vec::new();
        for frame in &self.frames {
            let edges = FrameEdges {
                down: parse_keys(&frame.press)?,
                up: parse_keys(&frame.release)?,
            };
            out.push(edges);
            for _ in 1..frame.repeat.max(1) {
                out.push(FrameEdges::default());
            }
        }
        Ok(out)
    }

    pub fn frame_count(&self) -> usize {
        self.frames.iter().map(|f| f.repeat.max(1) as usize).sum()
    }
}

pub fn load_replay_from_path(path: &Path) -> Result<ReplaySequence, String> {
    let raw =
        fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    parse_replay(&raw).map_err(|e| format!("{e} ({})", path.display()))
}

pub fn parse_replay(raw: &str) -> Result<ReplaySequence, String> {
    let replay: ReplaySequence =
        serde_json::from_str(raw).map_err(|e| format!("Failed to parse replay JSON: {e}"))?;
    validate_replay(&replay)?;
    Ok(replay)
}

fn validate_replay(replay: &ReplaySequence) -> Result<(), String> {
    if !replay.dt.is_finite() || replay.dt <= 0.0 {
        return Err("Replay validation failed: dt must be > 0".to_string());
    }
    if replay.dt > DEFAULT_MAX_DT {
        return Err(format!(
            "Replay validation failed: dt {} exceeds the frame cap {DEFAULT_MAX_DT}",
            replay.dt
        ));
    }
    if replay.frames.is_empty() {
        return Err("Replay validation failed: frames list is empty".to_string());
    }
    for (index, frame) in replay.frames.iter().enumerate() {
        if frame.repeat > MAX_REPEAT {
            return Err(format!(
                "Replay validation failed: frame {index} repeat {} exceeds {MAX_REPEAT}",
                frame.repeat
            ));
        }
        parse_keys(&frame.press)?;
        parse_keys(&frame.release)?;
    }
    Ok(())
}

fn parse_keys(names: &[String]) -> Result<Vec<Key>, String> {
    names
        .iter()
        .map(|name| {
            name.parse::<Key>()
                .map_err(|e| format!("Replay validation failed: {e}"))
        })
        .collect()
}

const fn default_dt() -> f32 {
    1.0 / 60.0
}

const fn default_repeat() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_replay_with_defaults() {
        let replay = parse_replay(r#"{ "frames": [ { "press": ["w"] }, {} ] }"#)
            .expect("valid replay should parse");
        assert!((replay.dt - 1.0 / 60.0).abs() < f32::EPSILON);
        assert_eq!(replay.frames[0].repeat, 1);
        assert_eq!(replay.frame_count(), 2);
    }

    #[test]
    fn rejects_empty_frames() {
        let err = parse_replay(r#"{ "dt": 0.016, "frames": [] }"#).expect_err("should fail");
        assert!(err.contains("frames list is empty"));
    }

    #[test]
    fn rejects_non_positive_dt() {
        let err = parse_replay(r#"{ "dt": 0.0, "frames": [ {} ] }"#).expect_err("should fail");
        assert!(err.contains("dt must be > 0"));
    }

    #[test]
    fn rejects_dt_above_frame_cap() {
        let err = parse_replay(r#"{ "dt": 0.5, "frames": [ {} ] }"#).expect_err("should fail");
        assert!(err.contains("exceeds the frame cap"), "unexpected: {err}");
        assert!(parse_replay(r#"{ "dt": 0.25, "frames": [ {} ] }"#).is_ok());
    }

    #[test]
    fn rejects_oversized_repeat() {
        let err = parse_replay(r#"{ "frames": [ {}, { "repeat": 4294967295 } ] }"#)
            .expect_err("should fail");
        assert!(err.contains("frame 1 repeat 4294967295 exceeds"), "unexpected: {err}");
    }

    #[test]
    fn rejects_unknown_key_names() {
        let err = parse_replay(r#"{ "frames": [ { "press": ["warp"] } ] }"#)
            .expect_err("should fail");
        assert!(err.contains("unknown key name 'warp'"));
    }

    #[test]
    fn repeat_unrolls_into_idle_frames() {
        let replay = parse_replay(
            r#"{ "frames": [ { "press": ["d"], "repeat": 3 }, { "release": ["d"], "repeat": 0 } ] }"#,
        )
        .unwrap();
        let frames = replay.expanded_frames().unwrap();
        assert_eq!(frames.len(), 4);
        assert_eq!(frames[0].down, vec![Key::D]);
        assert_eq!(frames[1], FrameEdges::default());
        assert_eq!(frames[2], FrameEdges::default());
        assert_eq!(frames[3].up, vec![Key::D]);
    }

    #[test]
    fn edges_drive_input_state() {
        let replay = parse_replay(
            r#"{ "frames": [ { "press": ["p"], "repeat": 2 }, { "release": ["p"] } ] }"#,
        )
        .unwrap();
        let mut input = InputState::new();
        let mut released_on = Vec::new();
        for (i, edges) in replay.expanded_frames().unwrap().iter().enumerate() {
            edges.apply(&mut input);
            let snap = input.latch();
            assert_eq!(snap.is_key_down(Key::P), i < 2);
            if snap.is_key_released(Key::P) {
                released_on.push(i);
            }
        }
        assert_eq!(released_on, vec![2]);
    }

    #[test]
    fn load_reports_missing_file() {
        let err = load_replay_from_path(Path::new("__missing_replay__.json"))
            .expect_err("missing file should fail");
        assert!(err.contains("Failed to read"));
    }
}
