//! Filesystem staging store.
//!
//! Stages incoming byte streams under a single directory with
//! collision-free names: a fresh UUID prefix plus the sanitized original
//! filename, created atomically with O_EXCL. Bytes are hashed while they
//! stream to disk, so no whole-document buffering happens here. Staged
//! files are never deleted or moved by this store.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::error::StagingError;

/// Attempts at generating a fresh staging path before giving up. UUID
/// collisions do not happen in practice; the bound keeps the loop finite.
const MAX_CREATE_ATTEMPTS: u32 = 3;

/// Longest sanitized filename kept, in bytes.
const MAX_NAME_BYTES: usize = 150;

/// A successfully staged document.
#[derive(Debug, Clone)]
pub struct StagedFile {
    pub path: PathBuf,
    pub size: u64,
    pub sha256: String,
}

/// Writes incoming document bytes into the staging directory.
#[derive(Debug, Clone)]
pub struct StagingStore {
    root: PathBuf,
}

impl StagingStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Streams a document into a fresh staging file, hashing as it goes.
    ///
    /// Any failure mid-write removes the partial file before returning.
    pub async fn stage<S>(
        &self,
        mut source: S,
        suggested_name: &str,
    ) -> Result<StagedFile, StagingError>
    where
        S: Stream<Item = std::io::Result<Bytes>> + Unpin,
    {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| StagingError::CreateDirectory {
                path: self.root.clone(),
                source: e,
            })?;

        let safe_name = sanitize_filename(suggested_name);
        let (path, mut file) = self.create_unique(&safe_name).await?;

        let mut hasher = Sha256::new();
        let mut size: u64 = 0;

        while let Some(chunk) = source.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    discard_partial(&path).await;
                    return Err(StagingError::ReadSource {
                        name: safe_name,
                        source: e,
                    });
                }
            };
            hasher.update(&chunk);
            size += chunk.len() as u64;
            if let Err(e) = file.write_all(&chunk).await {
                discard_partial(&path).await;
                return Err(StagingError::WriteFile { path, source: e });
            }
        }

        if let Err(e) = file.flush().await {
            discard_partial(&path).await;
            return Err(StagingError::WriteFile { path, source: e });
        }

        let sha256 = format!("{:x}", hasher.finalize());
        log::debug!("Staged {} ({} bytes) at {}", safe_name, size, path.display());

        Ok(StagedFile { path, size, sha256 })
    }

    /// Creates a new staging file atomically (O_CREAT | O_EXCL), retrying
    /// with a fresh UUID prefix if the name is somehow taken.
    async fn create_unique(
        &self,
        safe_name: &str,
    ) -> Result<(PathBuf, tokio::fs::File), StagingError> {
        for _ in 0..MAX_CREATE_ATTEMPTS {
            let candidate = self.root.join(format!("{}_{}", Uuid::new_v4(), safe_name));
            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&candidate)
                .await
            {
                Ok(file) => return Ok((candidate, file)),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(StagingError::WriteFile {
                        path: candidate,
                        source: e,
                    });
                }
            }
        }
        Err(StagingError::PathExhausted(self.root.clone()))
    }
}

async fn discard_partial(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        log::warn!("Failed to remove partial file {}: {}", path.display(), e);
    }
}

/// Sanitizes a filename for filesystem safety. Path separators and shell
/// metacharacters become underscores; an empty result falls back to
/// "document"; overlong names are truncated with the extension kept.
pub(crate) fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('.');

    if cleaned.is_empty() {
        return "document".to_string();
    }
    if cleaned.len() <= MAX_NAME_BYTES {
        return cleaned.to_string();
    }

    // Keep a short extension when truncating.
    let (stem, ext) = match cleaned.rfind('.') {
        Some(pos) if cleaned.len() - pos <= 16 => (&cleaned[..pos], &cleaned[pos..]),
        _ => (cleaned, ""),
    };
    let budget = MAX_NAME_BYTES - ext.len();
    let mut base = String::new();
    for c in stem.chars() {
        if base.len() + c.len_utf8() > budget {
            break;
        }
        base.push(c);
    }
    format!("{}{}", base, ext)
}
