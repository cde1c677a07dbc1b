use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDate};
use tokio::fs;
use tokio::sync::Mutex;

use crate::models::label::{sanitize_component, LabelRecord, LabelSidecar, TireSpec};

/// Subtree holding archived labels, mirroring the dated layout of the root.
pub const ARCHIVE_DIR: &str = "_archive";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Agent-side labels tree.
///
/// Layout: `<root>/YYYY-MM-DD/HHMMSS_SKU.pdf` with an optional
/// `HHMMSS_SKU.json` sidecar, and the same structure under `<root>/_archive`.
/// Saves and archive/restore moves are serialised through one lock so a
/// move never races a write into the same dated folder.
pub struct LabelStorage {
    root: PathBuf,
    lock: Mutex<()>,
}

/// Where a label was written.
#[derive(Debug, Clone)]
pub struct SavedLabel {
    /// Path relative to the labels root, `/`-separated.
    pub path: String,
    pub absolute: PathBuf,
}

impl LabelStorage {
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        Ok(Self {
            root,
            lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn base(&self, archived: bool) -> PathBuf {
        if archived {
            self.root.join(ARCHIVE_DIR)
        } else {
            self.root.clone()
        }
    }

    /// Write a label into today's dated folder. The PDF lands via a temp file
    /// and a rename, so readers never see a partial document.
    pub async fn save(
        &self,
        job_id: &str,
        sku: &str,
        metadata: &TireSpec,
        bytes: &[u8],
        now: DateTime<Local>,
    ) -> Result<SavedLabel, StorageError> {
        let _guard = self.lock.lock().await;

        let date = now.format(DATE_FORMAT).to_string();
        let dir = self.root.join(&date);
        let archive_dir = self.base(true).join(&date);
        fs::create_dir_all(&dir).await?;

        // A name is free only if neither tree holds it, so the label can
        // later be archived without a clash.
        let base = format!("{}_{}", now.format("%H%M%S"), sanitize_component(sku));
        let mut stem = base.clone();
        let mut n = 0;
        while fs::try_exists(dir.join(format!("{stem}.pdf"))).await?
            || fs::try_exists(archive_dir.join(format!("{stem}.pdf"))).await?
        {
            n += 1;
            stem = format!("{base}_{n}");
        }

        let file_name = format!("{stem}.pdf");
        let target = dir.join(&file_name);
        let partial = dir.join(format!(".{file_name}.part"));
        fs::write(&partial, bytes).await?;
        if let Err(e) = fs::rename(&partial, &target).await {
            let _ = fs::remove_file(&partial).await;
            return Err(e.into());
        }

        let sidecar = LabelSidecar {
            job_id: job_id.to_string(),
            sku: sku.to_string(),
            metadata: metadata.clone(),
            saved_at: now,
        };
        let sidecar_path = dir.join(format!("{stem}.json"));
        match serde_json::to_vec_pretty(&sidecar) {
            Ok(json) => {
                if let Err(e) = fs::write(&sidecar_path, json).await {
                    tracing::warn!(path = %sidecar_path.display(), error = %e, "Failed to write label sidecar");
                }
            }
            Err(e) => tracing::warn!(error = %e, "Failed to serialize label sidecar"),
        }

        Ok(SavedLabel {
            path: format!("{date}/{file_name}"),
            absolute: target,
        })
    }

    /// Labels in the active (or archive) tree, newest first.
    pub async fn list(&self, archived: bool) -> Result<Vec<LabelRecord>, StorageError> {
        let base = self.base(archived);
        let mut records = Vec::new();

        let mut days = match fs::read_dir(&base).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(records),
            Err(e) => return Err(e.into()),
        };

        while let Some(day) = days.next_entry().await? {
            let day_name = day.file_name().to_string_lossy().into_owned();
            let Ok(date) = NaiveDate::parse_from_str(&day_name, DATE_FORMAT) else {
                continue;
            };
            if !day.file_type().await?.is_dir() {
                continue;
            }

            let mut files = fs::read_dir(day.path()).await?;
            while let Some(file) = files.next_entry().await? {
                let name = file.file_name().to_string_lossy().into_owned();
                if name.starts_with('.') || !name.ends_with(".pdf") {
                    continue;
                }

                let sidecar = read_sidecar(&file.path().with_extension("json")).await;
                let sku = match &sidecar {
                    Some(s) => s.sku.clone(),
                    None => sku_from_file_name(&name),
                };

                records.push(LabelRecord {
                    path: format!("{day_name}/{name}"),
                    date,
                    sku,
                    size_bytes: file.metadata().await?.len(),
                    archived,
                    sidecar,
                });
            }
        }

        records.sort_by(|a, b| b.path.cmp(&a.path));
        Ok(records)
    }

    /// Absolute path of an existing label.
    pub async fn locate(&self, rel: &str, archived: bool) -> Result<PathBuf, StorageError> {
        let path = self.base(archived).join(relative_path(rel)?);
        if !fs::try_exists(&path).await? {
            return Err(StorageError::NotFound(rel.to_string()));
        }
        Ok(path)
    }

    pub async fn read(&self, rel: &str, archived: bool) -> Result<Vec<u8>, StorageError> {
        let path = self.base(archived).join(relative_path(rel)?);
        fs::read(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound(rel.to_string()),
            _ => StorageError::Io(e),
        })
    }

    /// Move a label from the active tree into the archive.
    pub async fn archive(&self, rel: &str) -> Result<(), StorageError> {
        self.relocate(rel, false).await
    }

    /// Move an archived label back into the active tree.
    pub async fn restore(&self, rel: &str) -> Result<(), StorageError> {
        self.relocate(rel, true).await
    }

    async fn relocate(&self, rel: &str, from_archive: bool) -> Result<(), StorageError> {
        let relpath = relative_path(rel)?;
        let from_base = self.base(from_archive);
        let src = from_base.join(&relpath);
        let dst = self.base(!from_archive).join(&relpath);

        let _guard = self.lock.lock().await;

        if !fs::try_exists(&src).await? {
            return Err(StorageError::NotFound(rel.to_string()));
        }
        if fs::try_exists(&dst).await? {
            return Err(StorageError::AlreadyExists(rel.to_string()));
        }

        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::rename(&src, &dst).await?;

        let src_sidecar = src.with_extension("json");
        if fs::try_exists(&src_sidecar).await.unwrap_or(false) {
            if let Err(e) = fs::rename(&src_sidecar, dst.with_extension("json")).await {
                tracing::warn!(path = %src_sidecar.display(), error = %e, "Failed to move label sidecar");
            }
        }

        // Only succeeds once the dated folder is empty.
        if let Some(parent) = src.parent() {
            if parent != from_base {
                let _ = fs::remove_dir(parent).await;
            }
        }

        tracing::info!(
            path = %rel,
            archived = !from_archive,
            "Moved label"
        );
        Ok(())
    }
}

/// Validate a `/`-separated path relative to a labels base.
fn relative_path(rel: &str) -> Result<PathBuf, StorageError> {
    let invalid = || StorageError::InvalidPath(rel.to_string());
    if !rel.ends_with(".pdf") {
        return Err(invalid());
    }

    let mut out = PathBuf::new();
    for part in rel.split('/') {
        if part.is_empty()
            || part == "."
            || part == ".."
            || part == ARCHIVE_DIR
            || part.contains('\\')
            || part.contains(':')
        {
            return Err(invalid());
        }
        out.push(part);
    }
    Ok(out)
}

fn sku_from_file_name(name: &str) -> String {
    let stem = name.trim_end_matches(".pdf");
    stem.split_once('_')
        .map(|(_, sku)| sku.to_string())
        .unwrap_or_else(|| stem.to_string())
}

async fn read_sidecar(path: &Path) -> Option<LabelSidecar> {
    let raw = fs::read(path).await.ok()?;
    match serde_json::from_slice(&raw) {
        Ok(sidecar) => Some(sidecar),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable label sidecar");
            None
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Label not found: {0}")]
    NotFound(String),

    #[error("Label already exists at destination: {0}")]
    AlreadyExists(String),

    #[error("Invalid label path: {0}")]
    InvalidPath(String),

    #[error("Label storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}
