//! Built-in component kinds.
//!
//! The set is closed: [`ComponentKind`] lists every kind the store knows how
//! to hold, and lookups resolve against it at compile time through the
//! [`Component`](crate::store::Component) trait rather than by reflection.

use std::collections::BTreeSet;
use std::fmt;

use glam::{Vec3, Vec4};

use crate::assets::Texture;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Data,
    Transform,
    Sprite,
}

impl ComponentKind {
    pub const ALL: &'static [ComponentKind] = &[
        ComponentKind::Data,
        ComponentKind::Transform,
        ComponentKind::Sprite,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Data => "DataComponent",
            Self::Transform => "TransformComponent",
            Self::Sprite => "SpriteComponent",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Name and tags. Every entity gets one on creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataComponent {
    pub name: String,
    pub tags: BTreeSet<String>,
}

impl DataComponent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tags: BTreeSet::new(),
        }
    }

    /// Returns false if the tag was already present.
    pub fn add_tag(&mut self, tag: impl Into<String>) -> bool {
        self.tags.insert(tag.into())
    }

    pub fn remove_tag(&mut self, tag: &str) -> bool {
        self.tags.remove(tag)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformComponent {
    pub position: Vec3,
    /// Euler angles in radians, applied X then Y then Z.
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl TransformComponent {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }
}

impl Default for TransformComponent {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

/// Primitive shape a sprite is drawn as.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Geometry {
    #[default]
    Quad,
    Triangle,
    Circle,
}

impl Geometry {
    pub const ALL: &'static [Geometry] = &[Geometry::Quad, Geometry::Triangle, Geometry::Circle];

    pub fn name(self) -> &'static str {
        match self {
            Self::Quad => "quad",
            Self::Triangle => "triangle",
            Self::Circle => "circle",
        }
    }

    pub fn from_name(name: &str) -> Option<Geometry> {
        let lowered = name.trim().to_ascii_lowercase();
        Self::ALL.iter().copied().find(|g| g.name() == lowered)
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpriteComponent {
    pub texture: Option<Texture>,
    pub geometry: Geometry,
    /// Linear RGBA, each channel in 0..=1.
    pub color: Vec4,
    pub tiling_factor: f32,
}

impl Default for SpriteComponent {
    fn default() -> Self {
        Self {
            texture: None,
            geometry: Geometry::Quad,
            color: Vec4::ONE,
            tiling_factor: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_defaults_to_identity() {
        let t = TransformComponent::default();
        assert_eq!(t.position, Vec3::ZERO);
        assert_eq!(t.scale, Vec3::ONE);
        assert_eq!(t.rotation, Vec3::ZERO);
    }

    #[test]
    fn sprite_defaults() {
        let s = SpriteComponent::default();
        assert!(s.texture.is_none());
        assert_eq!(s.geometry, Geometry::Quad);
        assert_eq!(s.color, Vec4::ONE);
        assert_eq!(s.tiling_factor, 1.0);
    }

    #[test]
    fn geometry_names_parse_back() {
        for &g in Geometry::ALL {
            assert_eq!(Geometry::from_name(g.name()), Some(g));
        }
        assert_eq!(Geometry::from_name("Circle"), Some(Geometry::Circle));
        assert_eq!(Geometry::from_name("hexagon"), None);
    }

    #[test]
    fn data_component_tags() {
        let mut data = DataComponent::new("player");
        assert!(data.add_tag("controllable"));
        assert!(!data.add_tag("controllable"));
        assert!(data.has_tag("controllable"));
        assert!(data.remove_tag("controllable"));
        assert!(!data.has_tag("controllable"));
    }

    #[test]
    fn component_kind_labels() {
        for &kind in ComponentKind::ALL {
            assert_eq!(format!("{kind}"), kind.label());
        }
    }
}
