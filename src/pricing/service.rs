use crate::clock::Clock;
use crate::error::Result;
use crate::pricing::adjuster::PricingAdjuster;
use crate::pricing::catalog::PricingCatalog;
use crate::pricing::models::PriceQuote;
use crate::pricing::store::PricingFile;
use arc_swap::ArcSwap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Result of a completed catalog adjustment
#[derive(Debug, Clone)]
pub struct AdjustOutcome {
    pub backup_path: PathBuf,
    pub previous: Arc<PricingCatalog>,
    pub current: Arc<PricingCatalog>,
}

/// Service owning the live pricing catalog
///
/// Readers get whole snapshots through an `ArcSwap`; adjust, restore and
/// reload are serialized so only one writer touches the file at a time.
pub struct PricingService {
    store: PricingFile,
    adjuster: PricingAdjuster,
    current: ArcSwap<PricingCatalog>,
    write_lock: Mutex<()>,
}

impl PricingService {
    /// Load the catalog file and start serving it
    pub async fn open(store: PricingFile, clock: Arc<dyn Clock>) -> Result<Self> {
        let catalog = store.load().await?;
        Ok(Self::with_catalog(store, clock, catalog))
    }

    /// Serve an already-loaded catalog
    pub fn with_catalog(store: PricingFile, clock: Arc<dyn Clock>, catalog: PricingCatalog) -> Self {
        Self {
            store,
            adjuster: PricingAdjuster::new(clock),
            current: ArcSwap::from_pointee(catalog),
            write_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &PricingFile {
        &self.store
    }

    /// Current catalog snapshot
    pub fn snapshot(&self) -> Arc<PricingCatalog> {
        self.current.load_full()
    }

    /// Get pricing for a specific model
    pub fn lookup(&self, model_name: &str) -> Result<PriceQuote> {
        self.current.load().lookup(model_name).cloned()
    }

    /// Re-read the catalog file and publish it
    pub async fn reload(&self) -> Result<Arc<PricingCatalog>> {
        let _guard = self.write_lock.lock().await;
        let catalog = Arc::new(self.store.load().await?);
        self.current.store(Arc::clone(&catalog));
        Ok(catalog)
    }

    /// Multiply every price in the live catalog
    ///
    /// The backup is written first, then the new catalog. If the catalog
    /// write fails the backup is removed again and the live snapshot stays
    /// as it was; the new snapshot is published only after both writes.
    pub async fn adjust(&self, multiplier: f64) -> Result<AdjustOutcome> {
        let _guard = self.write_lock.lock().await;

        let previous = self.current.load_full();
        let (adjusted, backup) = self.adjuster.adjust(&previous, multiplier)?;

        let backup_path = self.store.write_backup(&backup).await?;

        if let Err(e) = self.store.write(&adjusted).await {
            if let Err(cleanup) = self.store.remove_backup(&backup_path).await {
                warn!(
                    "Failed to remove backup {} after aborted adjustment: {}",
                    backup_path.display(),
                    cleanup
                );
            }
            return Err(e);
        }

        let current = Arc::new(adjusted);
        self.current.store(Arc::clone(&current));

        info!(
            multiplier = multiplier,
            models = current.len(),
            backup = %backup_path.display(),
            "Pricing adjusted"
        );

        Ok(AdjustOutcome {
            backup_path,
            previous,
            current,
        })
    }

    /// Reinstall a backup as the live catalog
    pub async fn restore(&self, backup_name: &str) -> Result<Arc<PricingCatalog>> {
        let _guard = self.write_lock.lock().await;

        let backup = self.store.read_backup(backup_name).await?;
        let created_at = backup.created_at;
        let catalog = backup.restore();

        self.store.write(&catalog).await?;

        let catalog = Arc::new(catalog);
        self.current.store(Arc::clone(&catalog));

        info!(
            backup = backup_name,
            taken_at = %created_at,
            models = catalog.len(),
            "Pricing restored from backup"
        );
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::error::BillingError;
    use tempfile::TempDir;

    const CATALOG: &str = r#"[
        {"model_name": "claude-3-5-haiku-20241022", "input_cost_per_token": 0.0000008, "output_cost_per_token": 0.000004},
        {"model_name": "gpt-4o", "input_cost_per_token": 0.0000025, "output_cost_per_token": 0.00001}
    ]"#;

    async fn open_service(dir: &TempDir, millis: i64) -> PricingService {
        let path = dir.path().join("model_pricing.json");
        std::fs::write(&path, CATALOG).unwrap();
        PricingService::open(
            PricingFile::new(path, None),
            Arc::new(FixedClock::from_millis(millis)),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_adjust_publishes_and_persists() {
        let dir = TempDir::new().unwrap();
        let service = open_service(&dir, 1_000).await;

        let outcome = service.adjust(2.0).await.unwrap();
        assert!(outcome.backup_path.exists());
        assert_eq!(service.lookup("gpt-4o").unwrap().input_price, Some(0.000005));
        assert_eq!(outcome.previous.lookup("gpt-4o").unwrap().input_price, Some(0.0000025));

        let on_disk = service.store().load().await.unwrap();
        assert_eq!(on_disk, *service.snapshot());
    }

    #[tokio::test]
    async fn test_rejected_adjust_leaves_everything_untouched() {
        let dir = TempDir::new().unwrap();
        let service = open_service(&dir, 1_000).await;
        let before = std::fs::read(service.store().catalog_path()).unwrap();
        let snapshot = service.snapshot();

        for bad in [0.0, -1.0] {
            let err = service.adjust(bad).await.unwrap_err();
            assert!(matches!(err, BillingError::InvalidMultiplier(_)));
        }

        assert_eq!(std::fs::read(service.store().catalog_path()).unwrap(), before);
        assert!(Arc::ptr_eq(&snapshot, &service.snapshot()));
        assert!(service.store().list_backups().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_restore_reinstalls_backup() {
        let dir = TempDir::new().unwrap();
        let service = open_service(&dir, 1_000).await;
        let original = service.snapshot();

        let outcome = service.adjust(1.5).await.unwrap();
        let name = outcome.backup_path.file_name().unwrap().to_string_lossy().to_string();

        let restored = service.restore(&name).await.unwrap();
        assert_eq!(*restored, *original);
        assert_eq!(service.store().load().await.unwrap(), *original);
    }

    #[tokio::test]
    async fn test_restore_unknown_backup() {
        let dir = TempDir::new().unwrap();
        let service = open_service(&dir, 1_000).await;
        let err = service.restore("model_pricing.backup.1.json").await.unwrap_err();
        assert!(matches!(err, BillingError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_reload_picks_up_external_edit() {
        let dir = TempDir::new().unwrap();
        let service = open_service(&dir, 1_000).await;

        std::fs::write(
            service.store().catalog_path(),
            r#"[{"model_name": "gemini-1.5-pro", "input_cost_per_token": 0.00000125}]"#,
        )
        .unwrap();

        let catalog = service.reload().await.unwrap();
        assert_eq!(catalog.len(), 1);
        assert!(service.lookup("gpt-4o").is_err());
    }
}
