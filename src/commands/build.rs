//! Ingest the content directory into the post snapshot

use anyhow::Result;
use std::path::PathBuf;

use crate::content::LoadError;
use crate::snapshot::Snapshot;
use crate::Folio;

/// What a build produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub written: usize,
    pub skipped: Vec<String>,
    pub snapshot_path: PathBuf,
}

/// Load every post and write the snapshot
pub async fn run(folio: &Folio) -> Result<BuildReport> {
    let start = std::time::Instant::now();

    let loader = folio.loader();
    let outcomes = loader.load_all().await?;
    let attempted = outcomes.len();

    let mut posts = Vec::with_capacity(attempted);
    let mut skipped = Vec::new();
    for (slug, outcome) in outcomes {
        match outcome {
            Ok(entry) => posts.push(entry),
            Err(e) => {
                e.log(&slug);
                skipped.push(slug);
            }
        }
    }

    if posts.is_empty() {
        return Err(LoadError::NoValidPosts {
            root: folio.posts_root.clone(),
            attempted,
        }
        .into());
    }

    let snapshot = Snapshot::new(posts);
    snapshot.save(&folio.snapshot_path)?;

    tracing::info!(
        "Wrote {} posts to {:?} in {:.2}s ({} skipped)",
        snapshot.posts.len(),
        folio.snapshot_path,
        start.elapsed().as_secs_f64(),
        skipped.len()
    );

    Ok(BuildReport {
        written: snapshot.posts.len(),
        skipped,
        snapshot_path: folio.snapshot_path.clone(),
    })
}
