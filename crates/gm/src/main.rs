use std::sync::Arc;

use gm_core::{config::Config, GroupManager};

#[tokio::main]
async fn main() -> Result<(), gm_core::Error> {
    gm_core::logging::init("gm")?;

    let cfg = Arc::new(Config::load()?);

    let manager = GroupManager::from_config(&cfg)?;
    tracing::info!(
        db = %cfg.db_file.display(),
        audit_log = %cfg.audit_log_path.display(),
        "database ready"
    );

    gm_telegram::router::run_polling(cfg, manager)
        .await
        .map_err(|e| gm_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
