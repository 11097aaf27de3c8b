//! Texture handles and the host-side texture cache.
//!
//! A [`Texture`] is only a path: scripts create and assign them freely without
//! touching the filesystem. Decoding happens in [`TextureCache::sync`], which
//! the scene calls once after every update pass. A path that fails to load is
//! logged once, resolved to a magenta placeholder, and never retried.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::components::SpriteComponent;
use crate::store::ComponentStore;

const PLACEHOLDER_RGBA: [u8; 4] = [255, 0, 255, 255];

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("texture not found: {0}")]
    NotFound(String),

    #[error("failed to decode texture {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: image::ImageError,
    },
}

/// Reference to an image resource by path. Cheap to clone and compare.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Texture {
    path: Arc<str>,
}

impl Texture {
    pub fn new(path: impl AsRef<str>) -> Self {
        Self {
            path: Arc::from(path.as_ref()),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Debug for Texture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Texture({:?})", &*self.path)
    }
}

/// Decoded RGBA8 pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
    pub placeholder: bool,
}

impl TextureData {
    pub fn placeholder() -> Self {
        Self {
            width: 1,
            height: 1,
            pixels: PLACEHOLDER_RGBA.to_vec(),
            placeholder: true,
        }
    }
}

pub trait TextureLoader {
    fn load(&self, path: &str) -> Result<TextureData, AssetError>;
}

/// Loads PNG/JPEG files from disk through the `image` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageFileLoader;

impl TextureLoader for ImageFileLoader {
    fn load(&self, path: &str) -> Result<TextureData, AssetError> {
        if !Path::new(path).exists() {
            return Err(AssetError::NotFound(path.to_string()));
        }
        let rgba = image::open(path)
            .map_err(|source| AssetError::Decode {
                path: path.to_string(),
                source,
            })?
            .to_rgba8();
        Ok(TextureData {
            width: rgba.width(),
            height: rgba.height(),
            pixels: rgba.into_raw(),
            placeholder: false,
        })
    }
}

pub struct TextureCache {
    loader: Box<dyn TextureLoader>,
    entries: HashMap<Texture, Arc<TextureData>>,
    failed: HashSet<Texture>,
}

impl TextureCache {
    pub fn new() -> Self {
        Self::with_loader(Box::new(ImageFileLoader))
    }

    pub fn with_loader(loader: Box<dyn TextureLoader>) -> Self {
        Self {
            loader,
            entries: HashMap::new(),
            failed: HashSet::new(),
        }
    }

    /// Return the decoded image for `texture`, loading it on first use.
    pub fn resolve(&mut self, texture: &Texture) -> Arc<TextureData> {
        if let Some(data) = self.entries.get(texture) {
            return Arc::clone(data);
        }

        let data = match self.loader.load(texture.path()) {
            Ok(data) => {
                log::info!(
                    "Loaded texture '{}' ({}x{})",
                    texture.path(),
                    data.width,
                    data.height
                );
                Arc::new(data)
            }
            Err(err) => {
                log::warn!("{err}. Using placeholder texture.");
                self.failed.insert(texture.clone());
                Arc::new(TextureData::placeholder())
            }
        };
        self.entries.insert(texture.clone(), Arc::clone(&data));
        data
    }

    /// Resolve every sprite texture that is not cached yet. Returns the
    /// number of distinct textures loaded.
    pub fn sync(&mut self, store: &ComponentStore) -> usize {
        let pending: HashSet<Texture> = store
            .iter::<SpriteComponent>()
            .filter_map(|(_, sprite)| sprite.texture.clone())
            .filter(|texture| !self.entries.contains_key(texture))
            .collect();

        for texture in &pending {
            self.resolve(texture);
        }
        pending.len()
    }

    pub fn get(&self, texture: &Texture) -> Option<Arc<TextureData>> {
        self.entries.get(texture).cloned()
    }

    pub fn is_loaded(&self, texture: &Texture) -> bool {
        self.entries.contains_key(texture)
    }

    pub fn failed_paths(&self) -> impl Iterator<Item = &str> {
        self.failed.iter().map(Texture::path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for TextureCache {
    fn default() -> Self {
        Self::new()
    }
}
