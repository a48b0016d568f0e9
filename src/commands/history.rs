use super::Context;
use anyhow::{anyhow, Context as _, Result};
use lexvox::history::{HistoryStore, SessionRecord, HISTORY_FILE};
use lexvox::storage;
use std::path::PathBuf;

fn open_store(ctx: &Context) -> Result<HistoryStore> {
    Ok(HistoryStore::load(storage::data_file(&ctx.prefs, HISTORY_FILE)?))
}

fn find<'a>(store: &'a HistoryStore, id: &str) -> Result<&'a SessionRecord> {
    store
        .get(id)
        .ok_or_else(|| anyhow!("No saved session with id {}", id))
}

pub fn list(ctx: &Context) -> Result<()> {
    let store = open_store(ctx)?;
    if store.is_empty() {
        println!("No saved sessions.");
        return Ok(());
    }
    for record in store.records() {
        println!(
            "{}  {}  {:<24}  {} turns",
            record.id,
            record.date,
            record.scenario.to_string(),
            record.transcript.len()
        );
    }
    Ok(())
}

pub fn show(ctx: &Context, id: &str) -> Result<()> {
    let store = open_store(ctx)?;
    print!("{}", storage::render_markdown(find(&store, id)?));
    Ok(())
}

pub fn remove(ctx: &Context, id: &str) -> Result<()> {
    let mut store = open_store(ctx)?;
    if store.remove(id)? {
        println!("Removed session {}", id);
    } else {
        println!("No saved session with id {}", id);
    }
    Ok(())
}

pub fn export(ctx: &Context, id: &str, dir: Option<PathBuf>) -> Result<()> {
    let store = open_store(ctx)?;
    let record = find(&store, id)?;
    let dir = dir
        .or_else(|| ctx.prefs.export_dir())
        .context("Could not determine an export directory; pass --dir")?;
    let path = storage::export_markdown(record, &dir)?;
    println!("Exported to {}", path.display());
    Ok(())
}
