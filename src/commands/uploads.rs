use super::Context;
use anyhow::Result;
use lexvox::storage;
use lexvox::uploads::{RecentUploads, RECENT_UPLOADS_FILE};

pub fn list(ctx: &Context) -> Result<()> {
    let recent = RecentUploads::load(storage::data_file(&ctx.prefs, RECENT_UPLOADS_FILE)?);
    if recent.entries().is_empty() {
        println!("No recent uploads.");
    }
    for entry in recent.entries() {
        println!("{}  {}", entry.date, entry.name);
    }
    Ok(())
}
