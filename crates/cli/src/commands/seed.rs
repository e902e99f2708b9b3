//! Demo catalog seeding.

use tracing::info;

use chosen_one_admin::backend::Backend;
use chosen_one_admin::config::BackendConfig;
use chosen_one_admin::services::ProductService;

/// Add the missing demo products, or replace the catalog when `reset` is set.
///
/// # Errors
///
/// Returns an error if configuration is invalid or a backend call fails.
pub async fn products(reset: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = BackendConfig::from_process_env()?;
    let backend = Backend::connect(&config)?;
    let service = ProductService::new(backend.store.as_ref());

    if reset {
        let added = service.reset_demo().await?;
        info!(added, "Demo catalog reset");
        return Ok(());
    }

    let existing = service.list().await?;
    let added = service.seed_missing(&existing).await?;
    if added == 0 {
        info!(existing = existing.len(), "Catalog already complete");
    } else {
        info!(added, "Demo products added");
    }
    Ok(())
}
