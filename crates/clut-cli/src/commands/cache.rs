//! Disk cache maintenance command

use anyhow::{Context, Result};
use clut_store::ClutStore;
use std::time::SystemTime;

use crate::{CacheAction, CacheArgs};

pub fn run(args: CacheArgs, store: &ClutStore) -> Result<()> {
    let cache = store.disk_cache();
    let dir = cache.dir().display();

    match args.action {
        CacheAction::List => {
            let entries = cache
                .entries()
                .with_context(|| format!("Failed to read cache: {dir}"))?;
            let now = SystemTime::now();
            for (path, mtime) in &entries {
                let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
                let age = now.duration_since(*mtime).unwrap_or_default().as_secs();
                println!(
                    "{:>10}  {:>8}s  {}",
                    super::format_size(size),
                    age,
                    path.display()
                );
            }
            println!("{} entries in {dir}", entries.len());
        }
        CacheAction::Trim => {
            let removed = cache
                .trim()
                .with_context(|| format!("Failed to trim cache: {dir}"))?;
            println!("Removed {removed} entries from {dir}");
        }
        CacheAction::Clear => {
            let removed = cache
                .clear()
                .with_context(|| format!("Failed to clear cache: {dir}"))?;
            println!("Removed {removed} entries from {dir}");
        }
    }
    Ok(())
}
