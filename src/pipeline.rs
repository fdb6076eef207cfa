//! Sequences validate → encode → send → extract for a single generation.
//!
//! Every run is independent: nothing is shared between runs besides the
//! upstream client's connection pool, and concurrent runs simply race.

use std::fmt;
use uuid::Uuid;

use crate::{
    encoder,
    error::{ImageGenError, Result},
    extractor,
    models::{CanonicalImageResult, Credential, ImageBlob, ModelId},
    settings::ClientContext,
    upstream::OpenRouterClient,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Idle,
    Validating,
    Encoding,
    Sending,
    Extracting,
    Succeeded,
    Failed,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Idle => "idle",
            PipelineStage::Validating => "validating",
            PipelineStage::Encoding => "encoding",
            PipelineStage::Sending => "sending",
            PipelineStage::Extracting => "extracting",
            PipelineStage::Succeeded => "succeeded",
            PipelineStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A request that passed validation.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub reference_image: Option<ImageBlob>,
    pub model: ModelId,
    pub credential: Credential,
}

/// Trace of one run: the stages it went through and how it ended.
#[derive(Debug)]
pub struct PipelineRun {
    pub request_id: Uuid,
    pub stages: Vec<PipelineStage>,
    pub outcome: Result<CanonicalImageResult>,
}

impl PipelineRun {
    pub fn final_stage(&self) -> PipelineStage {
        self.stages.last().copied().unwrap_or(PipelineStage::Idle)
    }
}

struct StageTracker {
    request_id: Uuid,
    stages: Vec<PipelineStage>,
}

impl StageTracker {
    fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            stages: vec![PipelineStage::Idle],
        }
    }

    fn advance(&mut self, stage: PipelineStage) {
        log::debug!(
            "[req:{}] {} → {}",
            self.request_id,
            self.stages.last().copied().unwrap_or(PipelineStage::Idle),
            stage
        );
        self.stages.push(stage);
    }

    fn finish(mut self, outcome: Result<CanonicalImageResult>) -> PipelineRun {
        match &outcome {
            Ok(image) => {
                self.advance(PipelineStage::Succeeded);
                log::info!(
                    "[req:{}] ✅ Image generated ({})",
                    self.request_id,
                    if image.is_data_uri() { "data URI" } else { "URL" }
                );
            }
            Err(e) => {
                self.advance(PipelineStage::Failed);
                log::warn!("[req:{}] Generation failed: {}", self.request_id, e);
            }
        }
        PipelineRun {
            request_id: self.request_id,
            stages: self.stages,
            outcome,
        }
    }
}

#[derive(Clone)]
pub struct GenerationPipeline {
    client: OpenRouterClient,
}

impl GenerationPipeline {
    pub fn new(client: OpenRouterClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &OpenRouterClient {
        &self.client
    }

    /// Fails fast, before any network call: missing credential first, then
    /// a blank prompt, then a malformed reference image.
    pub fn validate(
        context: &ClientContext,
        prompt: Option<&str>,
        image_data: Option<&str>,
    ) -> Result<GenerationRequest> {
        let credential = context
            .credential
            .clone()
            .ok_or_else(ImageGenError::missing_api_key)?;

        let prompt = match prompt {
            Some(p) if !p.trim().is_empty() => p.to_string(),
            _ => {
                return Err(ImageGenError::validation(
                    "A prompt is required.",
                    "Please provide a text description of the image you want to generate.",
                ))
            }
        };

        let reference_image = match image_data {
            Some(raw) if !raw.trim().is_empty() => Some(encoder::parse_image_data(raw)?),
            _ => None,
        };

        Ok(GenerationRequest {
            prompt,
            reference_image,
            model: context.model.clone(),
            credential,
        })
    }

    pub async fn run(
        &self,
        context: &ClientContext,
        prompt: Option<&str>,
        image_data: Option<&str>,
    ) -> Result<CanonicalImageResult> {
        self.run_traced(context, prompt, image_data).await.outcome
    }

    pub async fn run_traced(
        &self,
        context: &ClientContext,
        prompt: Option<&str>,
        image_data: Option<&str>,
    ) -> PipelineRun {
        let mut tracker = StageTracker::new();

        tracker.advance(PipelineStage::Validating);
        let request = match Self::validate(context, prompt, image_data) {
            Ok(request) => request,
            Err(e) => return tracker.finish(Err(e)),
        };

        log::info!(
            "[req:{}] Generating with model {} ({})",
            tracker.request_id,
            request.model,
            if request.reference_image.is_some() {
                "text + reference image"
            } else {
                "text only"
            }
        );
        log::debug!("[req:{}] Prompt: {}", tracker.request_id, request.prompt);

        let outcome = self.execute(&mut tracker, request).await;
        tracker.finish(outcome)
    }

    async fn execute(
        &self,
        tracker: &mut StageTracker,
        request: GenerationRequest,
    ) -> Result<CanonicalImageResult> {
        tracker.advance(PipelineStage::Encoding);
        let message = encoder::encode(&request.prompt, request.reference_image.as_ref());

        tracker.advance(PipelineStage::Sending);
        let response = self
            .client
            .send(message, &request.credential, &request.model)
            .await?;

        tracker.advance(PipelineStage::Extracting);
        match extractor::extract(&response) {
            Some(extraction) => {
                log::debug!(
                    "[req:{}] Image found via {}",
                    tracker.request_id,
                    extraction.stage.as_str()
                );
                Ok(extraction.image)
            }
            None => Err(ImageGenError::NotFound {
                text_reply: extractor::text_reply(&response),
            }),
        }
    }
}
