//! List posts

use anyhow::Result;

use crate::config::SiteConfig;
use crate::content::PostSummary;
use crate::helpers::format_date;
use crate::Folio;

/// List posts from the content directory; `all` includes non-public posts
pub async fn run(folio: &Folio, all: bool) -> Result<()> {
    let repo = folio.live_repository();

    let posts: Vec<PostSummary> = if all {
        repo.list_posts().await?.to_vec()
    } else {
        repo.list_public_posts().await?
    };

    println!("{}", heading(&folio.config, all, posts.len()));
    if !folio.config.description.is_empty() {
        println!("{}", folio.config.description);
    }
    for post in &posts {
        println!("  {}", format_line(post, &folio.config.date_format));
    }

    Ok(())
}

fn heading(config: &SiteConfig, all: bool, count: usize) -> String {
    let kind = if all { "posts" } else { "public posts" };
    format!("{} - {} {}:", config.title, count, kind)
}

fn format_line(post: &PostSummary, date_format: &str) -> String {
    let date = post
        .date()
        .map(|d| format_date(&d, date_format))
        .unwrap_or_else(|| "----------".to_string());
    format!(
        "{} - {} [{}] ({})",
        date, post.frontmatter.title, post.frontmatter.access, post.slug
    )
}
