use std::collections::HashMap;

use bytes::Bytes;
use futures::stream;
use spin_sdk::http::Request;

use crate::core::errors::ApiError;

/// A file part of a `multipart/form-data` body.
#[derive(Debug, Clone)]
pub struct FormFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Fields of a `multipart/form-data` body, looked up case-insensitively.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: HashMap<String, FormFile>,
}

impl MultipartForm {
    pub fn parse(req: &Request) -> Result<Self, ApiError> {
        let content_type = req
            .header("Content-Type")
            .and_then(|h| h.as_str())
            .ok_or_else(|| ApiError::BadRequest("Expected multipart/form-data".to_string()))?;
        let boundary = multer::parse_boundary(content_type)
            .map_err(|_| ApiError::BadRequest("Expected multipart/form-data".to_string()))?;
        let body = Bytes::copy_from_slice(req.body());

        futures::executor::block_on(Self::collect(body, boundary))
    }

    async fn collect(body: Bytes, boundary: String) -> Result<Self, ApiError> {
        let source = stream::once(async move { Ok::<Bytes, std::io::Error>(body) });
        let mut multipart = multer::Multipart::new(source, boundary);
        let mut form = MultipartForm::default();

        while let Some(field) = multipart.next_field().await.map_err(malformed)? {
            let Some(name) = field.name().map(|n| n.to_ascii_lowercase()) else {
                continue;
            };
            match field.file_name().map(str::to_owned) {
                Some(file_name) => {
                    let content_type = field.content_type().map(|m| m.to_string());
                    let data = field.bytes().await.map_err(malformed)?;
                    // Browsers send an empty part when no file was chosen.
                    if data.is_empty() && file_name.is_empty() {
                        continue;
                    }
                    form.files.insert(
                        name,
                        FormFile {
                            file_name,
                            content_type,
                            data,
                        },
                    );
                }
                None => {
                    let text = field.text().await.map_err(malformed)?;
                    form.fields.insert(name, text);
                }
            }
        }

        Ok(form)
    }

    /// Trimmed text value; empty values read as absent.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(&name.to_ascii_lowercase())
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn required_text(&self, name: &str) -> Result<&str, ApiError> {
        self.text(name)
            .ok_or_else(|| ApiError::BadRequest(format!("{} is required", name)))
    }

    /// Text value exactly as sent, for secrets where whitespace is significant.
    pub fn raw_text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn required_raw_text(&self, name: &str) -> Result<&str, ApiError> {
        self.raw_text(name)
            .ok_or_else(|| ApiError::BadRequest(format!("{} is required", name)))
    }

    pub fn file(&self, name: &str) -> Option<&FormFile> {
        self.files.get(&name.to_ascii_lowercase())
    }
}

fn malformed(err: multer::Error) -> ApiError {
    ApiError::BadRequest(format!("Invalid form data: {}", err))
}
