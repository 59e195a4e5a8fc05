use serde::{Deserialize, Serialize};

/// Identity of a diffuse texture. Bake batches are keyed on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TextureId(pub String);

impl TextureId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shading {
    Lit,
    Unlit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    pub diffuse: TextureId,
    pub shading: Shading,
}

impl Material {
    pub fn lit(name: impl Into<String>, diffuse: TextureId) -> Self {
        Self {
            name: name.into(),
            diffuse,
            shading: Shading::Lit,
        }
    }

    /// Output material for baked geometry: vertex colors already carry the
    /// lighting, so only the texture is kept.
    pub fn unlit(diffuse: TextureId) -> Self {
        Self {
            name: format!("baked/{}", diffuse.as_str()),
            diffuse,
            shading: Shading::Unlit,
        }
    }
}
