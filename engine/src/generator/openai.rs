use std::path::PathBuf;

use chrono::Local;
use color_eyre::{
    Result,
    eyre::{ensure, eyre},
};
use log::{debug, info};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::{
    generator::{
        GenerateFuture, GenerationRequest, ImageGenerator, Provider, require_api_key,
        run_transport, save_artifact,
    },
    naming::artifact_filename,
};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// DALL-E image generation through the OpenAI images API.
#[derive(Clone)]
pub struct OpenAiGenerator {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl OpenAiGenerator {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn request_images(&self, api_key: &str, request: &GenerationRequest) -> Result<Vec<PathBuf>> {
        let resp = self
            .client
            .post(format!("{}/v1/images/generations", self.base_url))
            .bearer_auth(api_key)
            .json(&json!({
                "prompt": request.prompt,
                "n": request.count,
                "size": request.size.to_string(),
                "response_format": "url",
            }))
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        ensure!(status.is_success(), "OpenAI request error: {status} - {body}");

        let images = serde_json::from_str::<ImagesResponse>(&body)?;
        debug!("OpenAI response:\n{images:#?}");
        ensure!(!images.data.is_empty(), "OpenAI returned no images");

        let timestamp = Local::now().naive_local();
        let mut paths = Vec::with_capacity(images.data.len());
        for (index, image) in images.data.into_iter().enumerate() {
            let url = image
                .url
                .ok_or_else(|| eyre!("Missing image url in OpenAI response"))?;

            let bytes = self
                .client
                .get(url)
                .send()
                .await?
                .error_for_status()?
                .bytes()
                .await?;

            let file_name = artifact_filename(
                &request.prompt,
                Provider::OpenAi.id(),
                &timestamp,
                index + 1,
            );
            paths.push(save_artifact(&request.output_dir, &file_name, &bytes)?);
        }

        Ok(paths)
    }
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    url: Option<String>,
}

impl ImageGenerator for OpenAiGenerator {
    fn generate<'a>(&'a self, request: &'a GenerationRequest) -> GenerateFuture<'a> {
        Box::pin(async move {
            let api_key = require_api_key(self.api_key.as_deref(), Provider::OpenAi)?;
            info!("Generating {} image(s) with OpenAI DALL-E...", request.count);

            let transport = self.request_images(api_key, request);
            Ok(run_transport(Provider::OpenAi, &request.output_dir, transport).await)
        })
    }

    fn provider(&self) -> &str {
        Provider::OpenAi.id()
    }
}
