//! Blob storage for proposal attachments.
//!
//! Stored objects are referenced by an unsigned URL of the form
//! `/files/{key}`. Reading one requires a signed URL that carries an
//! `expires` timestamp (unix seconds) and an HMAC-SHA256 `signature` over
//! `key:expires`.

use std::future::Future;
use std::path::{Path, PathBuf};

use actix_files::NamedFile;
use actix_web::http::header::{
    self, ContentDisposition, DispositionParam, DispositionType, HeaderValue,
};
use actix_web::{HttpRequest, HttpResponse, mime, web};
use chrono::Utc;
use hmac::{Hmac, Mac};
use rand::Rng;
use serde::Deserialize;
use sha2::Sha256;

use crate::errors::AppError;

type HmacSha256 = Hmac<Sha256>;

const URL_PREFIX: &str = "/files/";
const MAX_NAME_CHARS: usize = 100;

const UPLOAD_FAILED: &str = "Failed to upload file";
const DELETE_FAILED: &str = "Failed to delete file";
const SIGN_FAILED: &str = "Failed to sign file URL";

/// Boundary to wherever attachment bytes live.
pub trait BlobStore: Send + Sync {
    /// Store `bytes` and return the unsigned URL that refers to them.
    fn upload_file(
        &self,
        bytes: &[u8],
        name: &str,
        content_type: &str,
    ) -> impl Future<Output = Result<String, AppError>> + Send;

    /// Remove the object behind `url`. Removing a missing object is not an error.
    fn delete_file(&self, url: &str) -> impl Future<Output = Result<(), AppError>> + Send;

    /// A time-limited URL for reading the object behind `url`.
    fn get_signed_url(&self, url: &str, ttl_minutes: i64) -> Result<String, AppError>;
}

/// Objects stored as plain files under one directory.
#[derive(Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    signing_key: Vec<u8>,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, signing_key: impl Into<Vec<u8>>) -> Self {
        LocalBlobStore {
            root: root.into(),
            signing_key: signing_key.into(),
        }
    }

    /// Create the storage directory if needed.
    pub async fn ensure_root(&self) -> Result<(), AppError> {
        tokio::fs::create_dir_all(&self.root).await.map_err(|e| {
            log::error!("Cannot create storage directory {}: {e}", self.root.display());
            AppError::Storage(UPLOAD_FAILED.to_string())
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Option<PathBuf> {
        is_valid_key(key).then(|| self.root.join(key))
    }

    fn signature(&self, key: &str, expires: i64) -> Result<String, AppError> {
        let mut mac = HmacSha256::new_from_slice(&self.signing_key)
            .map_err(|_| AppError::Storage(SIGN_FAILED.to_string()))?;
        mac.update(format!("{key}:{expires}").as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Check a signed URL's parameters. `now` is unix seconds.
    pub fn verify_signature(&self, key: &str, expires: i64, signature: &str, now: i64) -> bool {
        if expires < now || !is_valid_key(key) {
            return false;
        }
        let Ok(expected) = hex::decode(signature) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(&self.signing_key) else {
            return false;
        };
        mac.update(format!("{key}:{expires}").as_bytes());
        mac.verify_slice(&expected).is_ok()
    }
}

impl BlobStore for LocalBlobStore {
    async fn upload_file(
        &self,
        bytes: &[u8],
        name: &str,
        content_type: &str,
    ) -> Result<String, AppError> {
        let key = generate_key(name);
        let path = self
            .path_for(&key)
            .ok_or_else(|| AppError::Storage(UPLOAD_FAILED.to_string()))?;

        self.ensure_root().await?;
        tokio::fs::write(&path, bytes).await.map_err(|e| {
            log::error!("Writing blob {key} failed: {e}");
            AppError::Storage(UPLOAD_FAILED.to_string())
        })?;

        log::info!("Stored blob {key} ({} bytes, {content_type})", bytes.len());
        Ok(format!("{URL_PREFIX}{key}"))
    }

    async fn delete_file(&self, url: &str) -> Result<(), AppError> {
        let path = key_from_url(url)
            .and_then(|key| self.path_for(key))
            .ok_or_else(|| AppError::Storage(DELETE_FAILED.to_string()))?;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                log::error!("Deleting blob {} failed: {e}", path.display());
                Err(AppError::Storage(DELETE_FAILED.to_string()))
            }
        }
    }

    fn get_signed_url(&self, url: &str, ttl_minutes: i64) -> Result<String, AppError> {
        let key = key_from_url(url)
            .filter(|key| is_valid_key(key))
            .ok_or_else(|| AppError::Storage(SIGN_FAILED.to_string()))?;
        if ttl_minutes <= 0 {
            return Err(AppError::Storage(SIGN_FAILED.to_string()));
        }
        let expires = Utc::now().timestamp() + ttl_minutes * 60;
        let signature = self.signature(key, expires)?;
        Ok(format!("{URL_PREFIX}{key}?expires={expires}&signature={signature}"))
    }
}

fn key_from_url(url: &str) -> Option<&str> {
    url.strip_prefix(URL_PREFIX)
}

/// Keys are `{32 hex chars}-{sanitized name}`.
fn generate_key(name: &str) -> String {
    let bytes: [u8; 16] = rand::rng().random();
    format!("{}-{}", hex::encode(bytes), sanitize_name(name))
}

/// Reduce a client-supplied file name to `[A-Za-z0-9._-]`, never `..` nor a leading dot.
pub fn sanitize_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let mut cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .take(MAX_NAME_CHARS)
        .collect();
    while cleaned.contains("..") {
        cleaned = cleaned.replace("..", ".");
    }
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() { "file".to_string() } else { cleaned }
}

pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && !key.starts_with('.')
        && !key.contains("..")
        && key.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
}

/// The name a key was created from, for download headers.
pub fn original_name(key: &str) -> &str {
    key.split_once('-').map(|(_, name)| name).unwrap_or(key)
}

#[derive(Deserialize)]
pub struct SignedQuery {
    pub expires: i64,
    pub signature: String,
}

/// Types a browser may render; everything else is sent as opaque bytes.
const RENDERABLE_TYPES: &[&str] = &[
    "application/pdf",
    "image/png",
    "image/jpeg",
    "image/gif",
    "text/plain",
];

fn served_content_type(guessed: &mime::Mime) -> mime::Mime {
    if RENDERABLE_TYPES.contains(&guessed.essence_str()) {
        guessed.clone()
    } else {
        mime::APPLICATION_OCTET_STREAM
    }
}

/// GET /files/{key}?expires=..&signature=..
///
/// Always served as a download so uploaded markup never runs on this origin.
pub async fn serve_file(
    req: HttpRequest,
    store: web::Data<LocalBlobStore>,
    key: web::Path<String>,
    query: web::Query<SignedQuery>,
) -> Result<HttpResponse, AppError> {
    let key = key.into_inner();
    if !store.verify_signature(&key, query.expires, &query.signature, Utc::now().timestamp()) {
        return Err(AppError::PermissionDenied("invalid or expired file signature".to_string()));
    }
    let path = store.path_for(&key).ok_or(AppError::NotFound)?;
    let file = NamedFile::open_async(&path).await.map_err(|_| AppError::NotFound)?;
    let content_type = served_content_type(file.content_type());
    let file = file
        .set_content_type(content_type)
        .set_content_disposition(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(original_name(&key).to_string())],
        });

    let mut response = file.into_response(&req);
    response
        .headers_mut()
        .insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    Ok(response)
}
