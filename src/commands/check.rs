//! Validate every post and report all problems at once

use anyhow::Result;

use crate::content::EntryError;
use crate::Folio;

/// Per-post validation results
#[derive(Debug, Default)]
pub struct CheckReport {
    pub valid: Vec<String>,
    pub invalid: Vec<(String, EntryError)>,
}

impl CheckReport {
    pub fn is_clean(&self) -> bool {
        self.invalid.is_empty()
    }
}

/// Validate all posts without writing anything
pub async fn collect(folio: &Folio) -> Result<CheckReport> {
    let outcomes = folio.loader().load_all().await?;

    let mut report = CheckReport::default();
    for (slug, outcome) in outcomes {
        match outcome {
            Ok(_) => report.valid.push(slug),
            Err(e) => report.invalid.push((slug, e)),
        }
    }
    Ok(report)
}

/// Print the report; fails when any post is invalid
pub async fn run(folio: &Folio) -> Result<()> {
    let report = collect(folio).await?;

    for slug in &report.valid {
        println!("  ok    {}", slug);
    }
    for (slug, err) in &report.invalid {
        println!("  FAIL  {}", slug);
        match err {
            EntryError::Validation { source, .. } => {
                for issue in &source.issues {
                    println!("          - {}", issue);
                }
            }
            other => println!("          - {}", other),
        }
    }

    println!(
        "{} valid, {} invalid",
        report.valid.len(),
        report.invalid.len()
    );

    if !report.is_clean() {
        anyhow::bail!("{} post(s) failed validation", report.invalid.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use std::fs;

    #[tokio::test]
    async fn test_collect_reports_all_issues() {
        let dir = tempfile::tempdir().unwrap();
        let folio = Folio::with_config(dir.path(), SiteConfig::default());
        for (slug, source) in [
            ("good", "---\ntitle: Good\n---\n"),
            ("bad", "---\naccess: protected\ndate: soon\n---\n"),
        ] {
            let post_dir = folio.posts_root.join(slug);
            fs::create_dir_all(&post_dir).unwrap();
            fs::write(post_dir.join("index.md"), source).unwrap();
        }

        let report = collect(&folio).await.unwrap();
        assert_eq!(report.valid, vec!["good"]);
        assert_eq!(report.invalid.len(), 1);

        let (slug, err) = &report.invalid[0];
        assert_eq!(slug, "bad");
        match err {
            EntryError::Validation { source, .. } => {
                let fields: Vec<_> = source.issues.iter().map(|i| i.field.as_str()).collect();
                assert_eq!(fields, vec!["title", "date", "password"]);
            }
            other => panic!("unexpected error: {}", other),
        }

        assert!(run(&folio).await.is_err());
    }
}
