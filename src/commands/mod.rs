pub mod history;
pub mod live;
pub mod prefs;
pub mod redact;
pub mod uploads;

use lexvox::config::AppConfig;
use lexvox::preferences::Preferences;

/// Configuration shared by all commands
pub struct Context {
    pub config: AppConfig,
    pub prefs: Preferences,
}
