use std::path::{Path, PathBuf};

use chrono::Utc;
use image::ImageFormat;
use rand::{distributions::Alphanumeric, Rng};

use crate::error::AppError;

/// Public prefix uploaded files are served under.
pub const UPLOADS_ROUTE: &str = "/uploads";

/// Local-disk store for coupon images.
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes an uploaded image and returns the reference to embed in the
    /// coupon (`/uploads/<file>`). Bytes that are not a recognizable image
    /// are rejected.
    pub async fn save(
        &self,
        original_name: Option<&str>,
        bytes: &[u8],
    ) -> Result<String, AppError> {
        if bytes.is_empty() {
            return Err(AppError::Validation("image is empty".to_string()));
        }
        match image::guess_format(bytes) {
            Ok(ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Gif | ImageFormat::WebP) => {}
            _ => {
                return Err(AppError::Validation(
                    "image must be a PNG, JPEG, GIF or WebP file".to_string(),
                ))
            }
        }

        tokio::fs::create_dir_all(&self.dir).await?;

        let nonce: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(6)
            .map(char::from)
            .collect();
        let file_name = format!(
            "{}-{}-{}",
            Utc::now().timestamp_millis(),
            nonce,
            sanitize_file_name(original_name.unwrap_or("image"))
        );

        tokio::fs::write(self.dir.join(&file_name), bytes).await?;
        tracing::debug!("Stored coupon image {}", file_name);

        Ok(format!("{}/{}", UPLOADS_ROUTE, file_name))
    }

    /// Deletes a file previously returned by [`ImageStore::save`]. Failures
    /// are logged, not returned.
    pub async fn remove(&self, reference: &str) {
        let Some(file_name) = reference
            .strip_prefix(UPLOADS_ROUTE)
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|name| !name.is_empty() && !name.contains(['/', '\\']))
        else {
            tracing::warn!("Refusing to remove unknown image reference {}", reference);
            return;
        };

        if let Err(e) = tokio::fs::remove_file(self.dir.join(file_name)).await {
            tracing::warn!("Failed to remove coupon image {}: {}", file_name, e);
        }
    }
}

fn sanitize_file_name(name: &str) -> String {
    // Drop any client-supplied directory part.
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "image".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    #[test]
    fn file_names_lose_paths_and_odd_characters() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\photos\\my logo.png"), "my_logo.png");
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
        assert_eq!(sanitize_file_name("///"), "image");
    }

    #[tokio::test]
    async fn save_writes_file_and_returns_public_reference() {
        let dir = std::env::temp_dir().join(format!("coupon-images-{}", rand::random::<u64>()));
        let store = ImageStore::new(&dir);

        let reference = store.save(Some("banner.png"), PNG_MAGIC).await.unwrap();
        assert!(reference.starts_with("/uploads/"));
        assert!(reference.ends_with("-banner.png"));

        let file_name = reference.trim_start_matches("/uploads/");
        let written = tokio::fs::read(dir.join(file_name)).await.unwrap();
        assert_eq!(written, PNG_MAGIC);

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn save_rejects_non_images() {
        let dir = std::env::temp_dir().join(format!("coupon-images-{}", rand::random::<u64>()));
        let store = ImageStore::new(&dir);
        let err = store.save(Some("notes.txt"), b"plain text").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn save_rejects_recognized_but_unsupported_formats() {
        let dir = std::env::temp_dir().join(format!("coupon-images-{}", rand::random::<u64>()));
        let store = ImageStore::new(&dir);
        let bmp = b"BM\x00\x00\x00\x00\x00\x00\x00\x00";
        assert_eq!(image::guess_format(bmp).unwrap(), ImageFormat::Bmp);

        let err = store.save(Some("logo.bmp"), bmp).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn remove_deletes_saved_file() {
        let dir = std::env::temp_dir().join(format!("coupon-images-{}", rand::random::<u64>()));
        let store = ImageStore::new(&dir);
        let reference = store.save(Some("banner.png"), PNG_MAGIC).await.unwrap();

        store.remove(&reference).await;
        let file_name = reference.trim_start_matches("/uploads/");
        assert!(!dir.join(file_name).exists());

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
