//! services/api/src/adapters/image_openai.rs
//!
//! This module contains the adapter for OpenAI's image-generation API.
//! It implements the `ImageGenerationService` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::images::{CreateImageRequestArgs, Image, ImageModel, ImageResponseFormat, ImageSize},
    Client,
};
use async_trait::async_trait;
use teeforge_core::domain::{GeneratedImage, ImageShape, ImageSource};
use teeforge_core::ports::{ImageGenerationService, PortError, PortResult};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `ImageGenerationService` port using the
/// OpenAI images API. The admin-selected image source picks the model.
#[derive(Clone)]
pub struct OpenAiImageAdapter {
    client: Client<OpenAIConfig>,
}

impl OpenAiImageAdapter {
    /// Creates a new `OpenAiImageAdapter`.
    pub fn new(client: Client<OpenAIConfig>) -> Self {
        Self { client }
    }

    fn model_for(source: ImageSource) -> ImageModel {
        match source {
            ImageSource::DallE3 => ImageModel::DallE3,
            ImageSource::GptImage1 => ImageModel::Other("gpt-image-1".to_string()),
        }
    }

    fn size_for(shape: ImageShape) -> ImageSize {
        match shape {
            ImageShape::Square => ImageSize::S1024x1024,
            ImageShape::Portrait => ImageSize::S1024x1792,
            ImageShape::Landscape => ImageSize::S1792x1024,
        }
    }
}

//=========================================================================================
// `ImageGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ImageGenerationService for OpenAiImageAdapter {
    /// Generates `count` candidate images. The image models only return
    /// one candidate per request, so the candidates are requested
    /// concurrently and collected in order.
    async fn generate(
        &self,
        prompt: &str,
        count: u8,
        shape: ImageShape,
        source: ImageSource,
    ) -> PortResult<Vec<GeneratedImage>> {
        let mut tasks = Vec::new();
        for _ in 0..count.max(1) {
            let request = CreateImageRequestArgs::default()
                .model(Self::model_for(source))
                .prompt(prompt)
                .n(1)
                .size(Self::size_for(shape))
                .response_format(ImageResponseFormat::Url)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?;
            let client = self.client.clone();
            tasks.push(async move { client.images().generate(request).await });
        }

        let responses = futures::future::join_all(tasks).await;

        let mut images = Vec::new();
        for response in responses {
            let response = response.map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;
            for image in response.data {
                if let Image::Url {
                    url,
                    revised_prompt,
                } = image.as_ref()
                {
                    images.push(GeneratedImage {
                        url: url.clone(),
                        revised_prompt: revised_prompt.clone(),
                    });
                }
            }
        }

        if images.is_empty() {
            return Err(PortError::Unexpected(
                "image backend returned no candidates".to_string(),
            ));
        }
        Ok(images)
    }
}
