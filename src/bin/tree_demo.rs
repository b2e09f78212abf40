//! Walks a small project tree through load, expand and load-more, printing
//! the visible rows after each step.
//!
//! Usage: tree-demo [config.json]

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Duration, Utc};
use lazy_tree::domain::Project;
use lazy_tree::loader::FetchOutcome;
use lazy_tree::{LazyTree, MemoryFetcher, PendingFetch, Row, TreeConfig};

fn seed() -> Vec<Project> {
    let start = Utc::now() - Duration::days(30);
    let at = |day: i64| start + Duration::days(day);

    let mut projects = vec![
        Project::new(1, "Platform", at(0)),
        Project::new(2, "Mobile", at(1)),
        Project::new(3, "Marketing site", at(2)),
    ];
    let platform = [
        "Auth service",
        "Billing",
        "Search indexer",
        "Notifications",
        "Audit log",
    ];
    for (i, name) in platform.iter().enumerate() {
        projects.push(Project::new_child(10 + i as u32, *name, 1, at(3 + i as i64)));
    }
    projects.push(Project::new_child(20, "Token refresh", 10, at(10)));
    projects.push(Project::new_child(21, "SSO", 10, at(11)));
    projects.push(Project::new_child(30, "iOS", 2, at(12)));
    projects
}

async fn run_pending(pending: Option<PendingFetch<Project>>) -> Option<FetchOutcome<Project>> {
    match pending {
        Some(pending) => Some(pending.run().await),
        None => None,
    }
}

fn print_rows(title: &str, tree: &LazyTree<Project>) {
    let width = tree.config().indent_width;
    println!("-- {} --", title);
    for row in tree.rows() {
        let pad = " ".repeat(row.indent(width));
        match row {
            Row::Node(node) => {
                let marker = if node.is_leaf() {
                    " "
                } else if node.is_expanded() {
                    "v"
                } else {
                    ">"
                };
                println!("{}{} {}", pad, marker, node.entity().name);
            }
            Row::LoadMore { remaining, .. } => println!("{}  ... {} more", pad, remaining),
            Row::Failed { error, .. } => println!("{}  ! {} (retry)", pad, error),
        }
    }
    println!();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let log_dir = std::env::temp_dir().join("tree-demo");
    rolling_logger::init_logger(log_dir, "TreeDemo")?;

    let config = match std::env::args().nth(1) {
        Some(path) => TreeConfig::load(&PathBuf::from(path)),
        None => TreeConfig {
            page_size: 2,
            ..TreeConfig::default()
        },
    };

    let fetcher = Arc::new(MemoryFetcher::new(seed()));
    let mut tree = LazyTree::new(fetcher.clone(), config);

    tree.load().await?;
    print_rows("initial load", &tree);

    tree.expand(1).await?;
    print_rows("expand Platform", &tree);

    tree.load_more(1).await?;
    tree.expand(10).await?;
    print_rows("load more under Platform, expand Auth service", &tree);

    // Two nodes loading at once
    let mobile = tree.begin_expand(2)?;
    let platform = tree.begin_load_more(1)?;
    let (mobile, platform) = tokio::join!(run_pending(mobile), run_pending(platform));
    for outcome in [mobile, platform].into_iter().flatten() {
        tree.apply(outcome)?;
    }
    print_rows("expand Mobile while paging Platform", &tree);

    if tree.can_reparent(30, Some(3)) {
        tree.reparent(30, Some(3))?;
        tree.reveal(30)?;
    }
    print_rows("move iOS under Marketing site", &tree);

    let _ = rolling_logger::info(&format!(
        "Demo finished after {} fetch(es), {} node(s) materialized",
        fetcher.calls(),
        tree.forest().len()
    ));
    for line in rolling_logger::recent_lines().iter().rev().take(5).rev() {
        println!("log: {}", line);
    }
    Ok(())
}
