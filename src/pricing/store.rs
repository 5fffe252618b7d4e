use crate::error::{BillingError, Result};
use crate::pricing::adjuster::CatalogBackup;
use crate::pricing::catalog::PricingCatalog;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Backup file found on disk
#[derive(Debug, Clone, PartialEq)]
pub struct BackupEntry {
    pub name: String,
    pub path: PathBuf,
    pub created_at: DateTime<Utc>,
    pub size_bytes: u64,
}

/// Catalog file plus the directory its backups are written to
#[derive(Debug, Clone)]
pub struct PricingFile {
    catalog_path: PathBuf,
    backup_dir: PathBuf,
}

impl PricingFile {
    /// Backups go next to the catalog unless `backup_dir` is given
    pub fn new(catalog_path: impl Into<PathBuf>, backup_dir: Option<PathBuf>) -> Self {
        let catalog_path = catalog_path.into();
        let backup_dir = backup_dir.unwrap_or_else(|| match catalog_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        });

        Self {
            catalog_path,
            backup_dir,
        }
    }

    pub fn catalog_path(&self) -> &Path {
        &self.catalog_path
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Read and parse the live catalog
    pub async fn load(&self) -> Result<PricingCatalog> {
        let content = fs::read_to_string(&self.catalog_path)
            .await
            .map_err(|e| BillingError::storage(&self.catalog_path, e))?;

        let catalog = PricingCatalog::from_json(&content)?;
        info!(
            "Loaded {} model prices from {}",
            catalog.len(),
            self.catalog_path.display()
        );
        Ok(catalog)
    }

    /// Replace the live catalog file
    ///
    /// The new content goes to a sibling temp file first and is renamed over
    /// the old one, so readers of the file never see a partial write.
    pub async fn write(&self, catalog: &PricingCatalog) -> Result<()> {
        let content = catalog.to_json_pretty()?;

        if let Some(parent) = self.catalog_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| BillingError::storage(parent, e))?;
            }
        }

        let tmp_path = self.catalog_path.with_extension("json.tmp");
        write_synced(&tmp_path, content.as_bytes(), false).await?;

        if let Err(e) = fs::rename(&tmp_path, &self.catalog_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(BillingError::storage(&self.catalog_path, e));
        }

        info!(
            "Wrote {} model prices to {}",
            catalog.len(),
            self.catalog_path.display()
        );
        Ok(())
    }

    /// Persist a backup as `<stem>.backup.<unix-millis>.json`
    pub async fn write_backup(&self, backup: &CatalogBackup) -> Result<PathBuf> {
        fs::create_dir_all(&self.backup_dir)
            .await
            .map_err(|e| BillingError::storage(&self.backup_dir, e))?;

        let path = self
            .backup_dir
            .join(self.backup_file_name(backup.created_at));
        let content = backup.catalog.to_json_pretty()?;

        // Never clobber an existing backup
        write_synced(&path, content.as_bytes(), true).await?;

        info!("Saved pricing backup to: {}", path.display());
        Ok(path)
    }

    pub async fn remove_backup(&self, path: &Path) -> Result<()> {
        fs::remove_file(path)
            .await
            .map_err(|e| BillingError::storage(path, e))?;
        debug!("Removed pricing backup {}", path.display());
        Ok(())
    }

    /// Backups in the backup directory, newest first
    pub async fn list_backups(&self) -> Result<Vec<BackupEntry>> {
        let mut entries = match fs::read_dir(&self.backup_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(BillingError::storage(&self.backup_dir, e)),
        };

        let mut backups = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| BillingError::storage(&self.backup_dir, e))?
        {
            let name = entry.file_name().to_string_lossy().to_string();
            let Some(created_at) = self.parse_backup_time(&name) else {
                continue;
            };
            let metadata = entry
                .metadata()
                .await
                .map_err(|e| BillingError::storage(entry.path(), e))?;

            backups.push(BackupEntry {
                name,
                path: entry.path(),
                created_at,
                size_bytes: metadata.len(),
            });
        }

        backups.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.name.cmp(&a.name)));
        Ok(backups)
    }

    /// Load a backup by file name (a path is reduced to its file name)
    pub async fn read_backup(&self, name: &str) -> Result<CatalogBackup> {
        let file_name = Path::new(name)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let created_at = self
            .parse_backup_time(&file_name)
            .ok_or_else(|| BillingError::NotFound(format!("'{}' is not a pricing backup", name)))?;

        let path = self.backup_dir.join(&file_name);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(BillingError::NotFound(format!(
                    "backup '{}' does not exist in {}",
                    file_name,
                    self.backup_dir.display()
                )))
            }
            Err(e) => return Err(BillingError::storage(&path, e)),
        };

        Ok(CatalogBackup {
            created_at,
            catalog: PricingCatalog::from_json(&content)?,
        })
    }

    fn stem(&self) -> String {
        self.catalog_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "model_pricing".to_string())
    }

    fn backup_file_name(&self, created_at: DateTime<Utc>) -> String {
        format!("{}.backup.{}.json", self.stem(), created_at.timestamp_millis())
    }

    fn parse_backup_time(&self, file_name: &str) -> Option<DateTime<Utc>> {
        let prefix = format!("{}.backup.", self.stem());
        let millis = file_name.strip_prefix(&prefix)?.strip_suffix(".json")?;
        DateTime::from_timestamp_millis(millis.parse().ok()?)
    }
}

async fn write_synced(path: &Path, content: &[u8], create_new: bool) -> Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true);
    if create_new {
        options.create_new(true);
    } else {
        options.create(true).truncate(true);
    }

    let mut file = options
        .open(path)
        .await
        .map_err(|e| BillingError::storage(path, e))?;
    file.write_all(content)
        .await
        .map_err(|e| BillingError::storage(path, e))?;
    file.sync_all()
        .await
        .map_err(|e| BillingError::storage(path, e))?;
    Ok(())
}

/// SHA-256 of the catalog's serialized form
pub fn content_hash(catalog: &PricingCatalog) -> Result<String> {
    let content = catalog.to_json_pretty()?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}
