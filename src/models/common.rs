use serde::{Deserialize, Serialize};
use std::fmt;

/// Image-capable models offered by default. Anything else is forwarded verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ModelId {
    GeminiFlashImage,
    FluxSchnell,
    FluxPro,
    Flux11Pro,
    Custom(String),
}

impl ModelId {
    pub fn catalog() -> [ModelId; 4] {
        [
            ModelId::GeminiFlashImage,
            ModelId::FluxSchnell,
            ModelId::FluxPro,
            ModelId::Flux11Pro,
        ]
    }

    pub fn as_str(&self) -> &str {
        match self {
            ModelId::GeminiFlashImage => "google/gemini-2.5-flash-image-preview",
            ModelId::FluxSchnell => "black-forest-labs/flux-1-schnell",
            ModelId::FluxPro => "black-forest-labs/flux-pro",
            ModelId::Flux11Pro => "black-forest-labs/flux-1.1-pro",
            ModelId::Custom(id) => id,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            ModelId::GeminiFlashImage => "Gemini 2.5 Flash",
            ModelId::FluxSchnell => "FLUX Schnell (Fast)",
            ModelId::FluxPro => "FLUX Pro (Premium)",
            ModelId::Flux11Pro => "FLUX 1.1 Pro",
            ModelId::Custom(id) => id,
        }
    }

    /// Blank input yields `None` so callers can fall back to their default.
    pub fn parse(id: &str) -> Option<Self> {
        let id = id.trim();
        if id.is_empty() {
            return None;
        }
        Some(Self::from(id.to_string()))
    }
}

impl Default for ModelId {
    fn default() -> Self {
        ModelId::GeminiFlashImage
    }
}

impl From<String> for ModelId {
    fn from(id: String) -> Self {
        Self::catalog()
            .into_iter()
            .find(|known| known.as_str() == id)
            .unwrap_or(ModelId::Custom(id))
    }
}

impl From<ModelId> for String {
    fn from(model: ModelId) -> Self {
        model.as_str().to_string()
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub default: bool,
}

pub fn supported_models(default_model: &ModelId) -> Vec<ModelInfo> {
    ModelId::catalog()
        .iter()
        .map(|model| ModelInfo {
            id: model.as_str().to_string(),
            name: model.display_name().to_string(),
            default: model == default_model,
        })
        .collect()
}

/// Style shortcuts a client can drop into the prompt box.
#[derive(Debug, Clone, Serialize)]
pub struct StylePreset {
    pub id: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub prompt: &'static str,
}

pub const STYLE_PRESETS: [StylePreset; 3] = [
    StylePreset {
        id: "cinematic",
        label: "Cinematic",
        description: "Dramatic lighting & contrast",
        prompt: "Enhance this image to look cinematic, with dramatic lighting, high contrast, and a professional color grade. Make it look like a blockbuster movie shot.",
    },
    StylePreset {
        id: "minimalist",
        label: "Minimalist",
        description: "Clean lines & simplicity",
        prompt: "Transform this image into a minimalist clean style. Simplify details, use a limited color palette, and focus on clean lines and negative space.",
    },
    StylePreset {
        id: "vintage",
        label: "Vintage",
        description: "Retro film grain & colors",
        prompt: "Apply a vintage film look to this image. Add grain, faded colors, and a retro aesthetic reminiscent of 1980s analog photography.",
    },
];

pub fn find_preset(id: &str) -> Option<&'static StylePreset> {
    STYLE_PRESETS
        .iter()
        .find(|preset| preset.id.eq_ignore_ascii_case(id.trim()))
}
