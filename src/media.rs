//! Upload validation and image file storage.
//!
//! The same checks run in the client before an upload is sent and on the
//! server when it arrives: size, extension allowlist, content sniffing and,
//! for profile pictures, pixel dimensions.

use std::io::Cursor;

use thiserror::Error;
use uuid::Uuid;

use crate::config::{
    file_key, MAX_IMAGE_BYTES, MAX_PROFILE_PICTURE_BYTES, MAX_PROFILE_PICTURE_DIMENSION,
    SUPPORTED_IMAGE_EXTENSIONS,
};
use crate::core::kv::KvStore;

/// Public folders images are served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaFolder {
    ProfilePics,
    PostPics,
    AiPics,
}

impl MediaFolder {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaFolder::ProfilePics => "profile_pics",
            MediaFolder::PostPics => "post_pics",
            MediaFolder::AiPics => "ai_pics",
        }
    }

    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment.to_ascii_lowercase().as_str() {
            "profile_pics" => Some(MediaFolder::ProfilePics),
            "post_pics" => Some(MediaFolder::PostPics),
            "ai_pics" => Some(MediaFolder::AiPics),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    ProfilePicture,
    PostPicture,
}

impl UploadKind {
    fn max_bytes(&self) -> usize {
        match self {
            UploadKind::ProfilePicture => MAX_PROFILE_PICTURE_BYTES,
            UploadKind::PostPicture => MAX_IMAGE_BYTES,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            UploadKind::ProfilePicture => "Profile picture",
            UploadKind::PostPicture => "Image",
        }
    }

    fn max_dimension(&self) -> Option<u32> {
        match self {
            UploadKind::ProfilePicture => Some(MAX_PROFILE_PICTURE_DIMENSION),
            UploadKind::PostPicture => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UploadError {
    #[error("{0} must be less than {1}MB")]
    TooLarge(&'static str, usize),
    #[error("File is empty")]
    Empty,
    #[error("File type must be one of: {}", SUPPORTED_IMAGE_EXTENSIONS.join(", "))]
    UnsupportedType,
    #[error("Failed to load image")]
    Unreadable,
    #[error("{label} dimensions must not exceed {max}x{max} pixels")]
    DimensionsTooLarge { label: &'static str, max: u32 },
}

/// Lowercased extension including the dot, e.g. `.png`.
pub fn file_extension(file_name: &str) -> Option<String> {
    let dot = file_name.rfind('.')?;
    let ext = file_name[dot..].to_ascii_lowercase();
    if ext.len() > 1 {
        Some(ext)
    } else {
        None
    }
}

/// Canonical extension for the sniffed image type, if it is one we accept.
pub fn sniff_extension(bytes: &[u8]) -> Option<&'static str> {
    match infer::get(bytes)?.extension() {
        "jpg" => Some(".jpg"),
        "png" => Some(".png"),
        "webp" => Some(".webp"),
        "gif" => Some(".gif"),
        _ => None,
    }
}

pub fn image_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    image::io::Reader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}

/// Check an upload and return the extension it should be stored under.
pub fn validate_upload(kind: UploadKind, file_name: &str, bytes: &[u8]) -> Result<&'static str, UploadError> {
    if bytes.is_empty() {
        return Err(UploadError::Empty);
    }
    if bytes.len() > kind.max_bytes() {
        return Err(UploadError::TooLarge(kind.label(), kind.max_bytes() / (1024 * 1024)));
    }

    let declared = file_extension(file_name).ok_or(UploadError::UnsupportedType)?;
    if !SUPPORTED_IMAGE_EXTENSIONS.contains(&declared.as_str()) {
        return Err(UploadError::UnsupportedType);
    }

    let sniffed = sniff_extension(bytes).ok_or(UploadError::Unreadable)?;
    let (width, height) = image_dimensions(bytes).ok_or(UploadError::Unreadable)?;

    if let Some(max) = kind.max_dimension() {
        if width > max || height > max {
            return Err(UploadError::DimensionsTooLarge {
                label: kind.label(),
                max,
            });
        }
    }

    Ok(sniffed)
}

pub fn new_file_name(extension: &str) -> String {
    format!("{}{}", Uuid::new_v4().simple(), extension)
}

/// Store image bytes under a fresh name in `folder` and return that name.
pub fn store_file(store: &dyn KvStore, folder: MediaFolder, extension: &str, bytes: &[u8]) -> anyhow::Result<String> {
    let name = new_file_name(extension);
    store.set(&file_key(folder.as_str(), &name), bytes)?;
    Ok(name)
}

pub fn load_file(store: &dyn KvStore, folder: MediaFolder, name: &str) -> anyhow::Result<Option<Vec<u8>>> {
    if !is_safe_file_name(name) {
        return Ok(None);
    }
    store.get(&file_key(folder.as_str(), name))
}

pub fn delete_file(store: &dyn KvStore, folder: MediaFolder, name: &str) -> anyhow::Result<()> {
    store.delete(&file_key(folder.as_str(), name))
}

fn is_safe_file_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains("..")
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::kv::MemoryStore;
    use image::{ImageOutputFormat, Rgb, RgbImage};

    pub(crate) fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([200, 80, 40]));
        let mut out = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut out, ImageOutputFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn accepts_small_profile_picture() {
        assert_eq!(validate_upload(UploadKind::ProfilePicture, "me.PNG", &png(64, 64)), Ok(".png"));
    }

    #[test]
    fn rejects_oversized_profile_dimensions() {
        let err = validate_upload(UploadKind::ProfilePicture, "me.png", &png(600, 400)).unwrap_err();
        assert_eq!(err.to_string(), "Profile picture dimensions must not exceed 512x512 pixels");
    }

    #[test]
    fn post_pictures_have_no_dimension_cap() {
        assert!(validate_upload(UploadKind::PostPicture, "big.png", &png(900, 700)).is_ok());
    }

    #[test]
    fn rejects_unsupported_extension_and_garbage() {
        assert_eq!(
            validate_upload(UploadKind::PostPicture, "doc.pdf", &png(8, 8)),
            Err(UploadError::UnsupportedType)
        );
        assert_eq!(
            validate_upload(UploadKind::PostPicture, "fake.png", b"hello world"),
            Err(UploadError::Unreadable)
        );
        assert_eq!(validate_upload(UploadKind::PostPicture, "x.png", b""), Err(UploadError::Empty));
    }

    #[test]
    fn rejects_files_over_the_size_limit() {
        let huge = vec![0u8; MAX_IMAGE_BYTES + 1];
        let err = validate_upload(UploadKind::PostPicture, "x.png", &huge).unwrap_err();
        assert_eq!(err.to_string(), "Image must be less than 5MB");
    }

    #[test]
    fn stored_files_can_be_loaded_and_deleted() {
        let store = MemoryStore::new();
        let name = store_file(&store, MediaFolder::PostPics, ".png", b"abc").unwrap();
        assert!(name.ends_with(".png"));
        assert_eq!(load_file(&store, MediaFolder::PostPics, &name).unwrap(), Some(b"abc".to_vec()));
        assert_eq!(load_file(&store, MediaFolder::AiPics, &name).unwrap(), None);
        assert_eq!(load_file(&store, MediaFolder::PostPics, "../user:1").unwrap(), None);
        delete_file(&store, MediaFolder::PostPics, &name).unwrap();
        assert_eq!(load_file(&store, MediaFolder::PostPics, &name).unwrap(), None);
    }

    #[test]
    fn folders_parse_case_insensitively() {
        assert_eq!(MediaFolder::from_segment("Post_Pics"), Some(MediaFolder::PostPics));
        assert_eq!(MediaFolder::from_segment("api"), None);
    }
}
