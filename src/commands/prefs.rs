use super::Context;
use anyhow::Result;
use lexvox::preferences::{self, PreferencesUpdate};
use std::path::PathBuf;
use tracing::info;

/// Apply any requested changes, persist them, then print the effective values
pub fn run(ctx: &Context, update: PreferencesUpdate) -> Result<()> {
    let mut prefs = ctx.prefs.clone();
    if !update.is_empty() {
        prefs.apply(update);
        preferences::save_preferences(&prefs)?;
        info!("Preferences updated");
    }

    println!("locale      {}", prefs.locale());
    println!("scenario    {}", prefs.scenario().tag());
    println!("data dir    {}", display_dir(prefs.data_dir()));
    println!("export dir  {}", display_dir(prefs.export_dir()));
    Ok(())
}

fn display_dir(dir: Option<PathBuf>) -> String {
    dir.map(|d| d.display().to_string())
        .unwrap_or_else(|| "(unavailable)".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_dir_without_location() {
        assert_eq!(display_dir(None), "(unavailable)");
        assert_eq!(display_dir(Some(PathBuf::from("/tmp/x"))), "/tmp/x");
    }
}
