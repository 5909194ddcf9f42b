//! AI image generation backends.

use std::io::Cursor;

use anyhow::Context;
use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use sha2::{Digest, Sha256};

/// Turns a prompt into encoded image bytes.
pub trait ImageGenerator: Send + Sync {
    fn generate(&self, prompt: &str) -> anyhow::Result<Vec<u8>>;
}

/// Offline generator: paints a gradient whose colours are derived from the
/// prompt hash, so the same prompt always yields the same PNG.
pub struct PlaceholderGenerator {
    size: u32,
}

impl PlaceholderGenerator {
    pub fn new(size: u32) -> Self {
        Self { size: size.max(1) }
    }
}

impl ImageGenerator for PlaceholderGenerator {
    fn generate(&self, prompt: &str) -> anyhow::Result<Vec<u8>> {
        let digest = Sha256::digest(prompt.as_bytes());
        let from = [digest[0], digest[1], digest[2]];
        let to = [digest[3], digest[4], digest[5]];
        let size = self.size;

        let img = RgbImage::from_fn(size, size, |x, y| {
            let t = (x + y) as f32 / (2 * size).max(1) as f32;
            let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t) as u8;
            Rgb([mix(from[0], to[0]), mix(from[1], to[1]), mix(from[2], to[2])])
        });

        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut out, ImageOutputFormat::Png)
            .context("encoding placeholder image")?;
        Ok(out.into_inner())
    }
}

/// Proxies prompts to an external generation service.
///
/// The service receives `{"prompt": ...}` and answers with either raw
/// `image/*` bytes or JSON carrying an `imageUrl` to download.
#[cfg(not(target_arch = "wasm32"))]
pub struct HttpGenerator {
    url: String,
    client: reqwest::blocking::Client,
}

#[cfg(not(target_arch = "wasm32"))]
impl HttpGenerator {
    pub fn new(url: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl ImageGenerator for HttpGenerator {
    fn generate(&self, prompt: &str) -> anyhow::Result<Vec<u8>> {
        #[derive(serde::Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Generated {
            image_url: String,
        }

        let resp = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({ "prompt": prompt }))
            .send()
            .context("calling image generator")?
            .error_for_status()?;

        let is_image = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.starts_with("image/"))
            .unwrap_or(false);
        if is_image {
            return Ok(resp.bytes()?.to_vec());
        }

        let generated: Generated = resp.json().context("generator returned neither an image nor imageUrl")?;
        tracing::debug!(url = %generated.image_url, "downloading generated image");
        let bytes = self
            .client
            .get(&generated.image_url)
            .send()?
            .error_for_status()?
            .bytes()?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::image_dimensions;

    #[test]
    fn placeholder_is_deterministic_png() {
        let gen = PlaceholderGenerator::new(64);
        let a = gen.generate("a lighthouse at dusk").unwrap();
        let b = gen.generate("a lighthouse at dusk").unwrap();
        let c = gen.generate("a forest").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(image_dimensions(&a), Some((64, 64)));
        assert_eq!(infer::get(&a).map(|t| t.extension()), Some("png"));
    }
}
