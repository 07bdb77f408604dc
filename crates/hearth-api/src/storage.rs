use std::path::{Path, PathBuf};

use anyhow::Result;
use axum::{
    body::Body,
    extract::multipart::Field,
    http::header,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use tokio::fs;
use tokio_util::io::ReaderStream;
use tracing::{info, warn};
use uuid::Uuid;

use hearth_db::models::NewFile;

use crate::error::{ApiError, ApiResult};

/// 10 MiB per uploaded file.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Copy)]
pub enum UploadDir {
    Messages,
    DirectMessages,
    Attachments,
    Emojis,
}

impl UploadDir {
    const ALL: [UploadDir; 4] = [
        UploadDir::Messages,
        UploadDir::DirectMessages,
        UploadDir::Attachments,
        UploadDir::Emojis,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            UploadDir::Messages => "messages",
            UploadDir::DirectMessages => "direct_messages",
            UploadDir::Attachments => "attachments",
            UploadDir::Emojis => "emojis",
        }
    }
}

/// One file part read out of a multipart body.
#[derive(Debug)]
pub struct Upload {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl Upload {
    /// Reads the whole part. `None` for the empty part a form sends when no
    /// file was picked.
    pub async fn from_field(field: Field<'_>) -> ApiResult<Option<Self>> {
        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await?;

        if filename.is_empty() && data.is_empty() {
            return Ok(None);
        }
        if data.len() > MAX_UPLOAD_BYTES {
            return Err(ApiError::PayloadTooLarge(format!(
                "File {} exceeds the 10 MiB limit",
                filename
            )));
        }
        Ok(Some(Self {
            filename,
            content_type,
            data,
        }))
    }
}

/// Uploaded files on local disk, one subdirectory per kind.
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    pub async fn new(root: PathBuf) -> Result<Self> {
        for dir in UploadDir::ALL {
            fs::create_dir_all(root.join(dir.as_str())).await?;
        }
        info!("Upload directory: {}", root.display());
        Ok(Self { root })
    }

    pub fn resolve(&self, stored: &str) -> PathBuf {
        self.root.join(stored)
    }

    /// Writes `upload` as `<dir>/<uuid><ext>` and describes it for the store.
    /// A failed write may leave a partial file behind.
    pub async fn save(&self, dir: UploadDir, upload: &Upload) -> Result<NewFile> {
        let ext = Path::new(&upload.filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_ascii_lowercase()))
            .unwrap_or_default();
        let stored = format!("{}/{}{}", dir.as_str(), Uuid::new_v4(), ext);

        fs::write(self.resolve(&stored), &upload.data).await?;

        Ok(NewFile {
            file_type: file_type_for(&upload.filename).to_string(),
            file_size: upload.data.len() as i64,
            mime_type: upload.content_type.clone(),
            filename: upload.filename.clone(),
            file_path: stored,
        })
    }

    /// Best-effort delete; a missing file is not an error.
    pub async fn remove(&self, stored: &str) {
        match fs::remove_file(self.resolve(stored)).await {
            Ok(()) => info!("Deleted {}", stored),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("File {} already gone", stored)
            }
            Err(e) => warn!("Failed to delete {}: {}", stored, e),
        }
    }

    /// Streams a stored file back with its mime type and original name.
    pub async fn download(&self, stored: &str, filename: &str, mime: Option<&str>) -> ApiResult<Response> {
        let file = match fs::File::open(self.resolve(stored)).await {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ApiError::NotFound("File not found on disk".into()));
            }
            Err(e) => return Err(e.into()),
        };

        let body = Body::from_stream(ReaderStream::new(file));
        let disposition = format!("attachment; filename=\"{}\"", filename.replace('"', "_"));
        Ok((
            [
                (header::CONTENT_TYPE, mime.unwrap_or("application/octet-stream").to_string()),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            body,
        )
            .into_response())
    }
}

/// Coarse category from the file extension.
pub fn file_type_for(filename: &str) -> &'static str {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "jpg" | "jpeg" | "png" | "gif" | "webp" | "svg" | "bmp" | "ico" => "image",
        "pdf" | "doc" | "docx" | "xls" | "xlsx" | "ppt" | "pptx" | "txt" | "md" | "csv" | "rtf"
        | "odt" => "document",
        "mp4" | "mov" | "avi" | "mkv" | "webm" => "video",
        "mp3" | "wav" | "ogg" | "flac" | "m4a" | "aac" => "audio",
        "zip" | "tar" | "gz" | "rar" | "7z" | "bz2" => "archive",
        _ => "other",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_follow_extension() {
        assert_eq!(file_type_for("cat.PNG"), "image");
        assert_eq!(file_type_for("report.pdf"), "document");
        assert_eq!(file_type_for("clip.webm"), "video");
        assert_eq!(file_type_for("song.flac"), "audio");
        assert_eq!(file_type_for("src.tar.gz"), "archive");
        assert_eq!(file_type_for("Makefile"), "other");
    }

    #[tokio::test]
    async fn save_then_remove() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path().to_path_buf()).await.unwrap();
        let upload = Upload {
            filename: "notes.TXT".into(),
            content_type: Some("text/plain".into()),
            data: Bytes::from_static(b"hello"),
        };

        let saved = storage.save(UploadDir::Attachments, &upload).await.unwrap();
        assert!(saved.file_path.starts_with("attachments/"));
        assert!(saved.file_path.ends_with(".txt"));
        assert_eq!(saved.file_size, 5);
        assert_eq!(saved.file_type, "document");
        assert_eq!(std::fs::read(storage.resolve(&saved.file_path)).unwrap(), b"hello");

        storage.remove(&saved.file_path).await;
        assert!(!storage.resolve(&saved.file_path).exists());
        // second remove is a no-op
        storage.remove(&saved.file_path).await;
    }
}
