//! Remove build artifacts

use anyhow::Result;
use std::fs;

use crate::Folio;

/// Delete the snapshot and its directory when nothing else lives there
pub fn run(folio: &Folio) -> Result<()> {
    if folio.snapshot_path.exists() {
        fs::remove_file(&folio.snapshot_path)?;
        tracing::info!("Deleted: {:?}", folio.snapshot_path);
    }

    if let Some(parent) = folio.snapshot_path.parent() {
        if parent != folio.base_dir && parent.is_dir() && fs::read_dir(parent)?.next().is_none() {
            fs::remove_dir(parent)?;
            tracing::info!("Deleted: {:?}", parent);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;

    #[test]
    fn test_clean_removes_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let folio = Folio::with_config(dir.path(), SiteConfig::default());
        fs::create_dir_all(folio.snapshot_path.parent().unwrap()).unwrap();
        fs::write(&folio.snapshot_path, "{}").unwrap();

        run(&folio).unwrap();
        assert!(!folio.snapshot_path.exists());
        assert!(!dir.path().join(".folio").exists());
        // nothing left to clean is fine
        run(&folio).unwrap();
    }
}
