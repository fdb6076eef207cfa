pub mod config;
pub mod encoder;
pub mod error;
pub mod extractor;
pub mod logger;
pub mod models;
pub mod pipeline;
pub mod server;
pub mod settings;
pub mod upstream;

pub use config::{Config, UpstreamConfig};
pub use error::{ImageGenError, Result};
pub use extractor::{extract, Extraction, ExtractionStage};
pub use models::*;
pub use pipeline::{GenerationPipeline, GenerationRequest, PipelineRun, PipelineStage};
pub use settings::{ClientContext, PreferenceStore, Preferences, Theme};
pub use upstream::{OpenRouterClient, ReqwestTransport, UpstreamTransport};
