use std::path::PathBuf;

use chrono::Local;
use color_eyre::{Result, eyre::bail};
use log::{debug, info};
use reqwest::{Client, header};
use serde_json::json;

use crate::{
    generator::{
        GenerateFuture, GenerationRequest, ImageGenerator, Provider, require_api_key,
        run_transport, save_artifact,
    },
    naming::artifact_filename,
};

const DEFAULT_BASE_URL: &str = "https://api.stability.ai";
const DEFAULT_ENGINE: &str = "stable-diffusion-xl-1024-v1-0";

/// Stability AI text-to-image. The PNG endpoint returns one image per call, so `count`
/// images cost `count` requests.
#[derive(Clone)]
pub struct StabilityGenerator {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    engine: String,
}

impl StabilityGenerator {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.into(),
            engine: DEFAULT_ENGINE.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = engine.into();
        self
    }

    async fn request_images(&self, api_key: &str, request: &GenerationRequest) -> Result<Vec<PathBuf>> {
        let url = format!(
            "{}/v1/generation/{}/text-to-image",
            self.base_url, self.engine
        );
        let payload = json!({
            "text_prompts": [{ "text": request.prompt, "weight": 1 }],
            "width": request.size.width,
            "height": request.size.height,
            "samples": 1,
        });

        let timestamp = Local::now().naive_local();
        let mut paths = Vec::with_capacity(request.count as usize);
        for index in 1..=request.count as usize {
            let resp = self
                .client
                .post(&url)
                .bearer_auth(api_key)
                .header(header::ACCEPT, "image/png")
                .json(&payload)
                .send()
                .await?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                bail!("Stability request error: {status} - {body}");
            }

            let bytes = resp.bytes().await?;
            debug!("Stability image {index}: {} bytes", bytes.len());

            let file_name =
                artifact_filename(&request.prompt, Provider::Stability.id(), &timestamp, index);
            paths.push(save_artifact(&request.output_dir, &file_name, &bytes)?);
        }

        Ok(paths)
    }
}

impl ImageGenerator for StabilityGenerator {
    fn generate<'a>(&'a self, request: &'a GenerationRequest) -> GenerateFuture<'a> {
        Box::pin(async move {
            let api_key = require_api_key(self.api_key.as_deref(), Provider::Stability)?;
            info!("Generating {} image(s) with Stability AI...", request.count);

            let transport = self.request_images(api_key, request);
            Ok(run_transport(Provider::Stability, &request.output_dir, transport).await)
        })
    }

    fn provider(&self) -> &str {
        Provider::Stability.id()
    }
}
