use tracing::info;

use crate::error::Result;
use crate::model::Theme;
use crate::store::kv::KeyValueStore;

pub const THEME_KEY: &str = "theme";

/// Stored theme, defaulting to light when absent.
pub fn load_theme(storage: &impl KeyValueStore) -> Result<Theme> {
    Ok(storage
        .get(THEME_KEY)?
        .map(|raw| Theme::parse_lenient(&raw))
        .unwrap_or_default())
}

pub fn save_theme(storage: &impl KeyValueStore, theme: Theme) -> Result<()> {
    storage.set(THEME_KEY, theme.as_str())?;
    info!(%theme, "saved theme");
    Ok(())
}

pub fn toggle_theme(storage: &impl KeyValueStore) -> Result<Theme> {
    let next = load_theme(storage)?.toggled();
    save_theme(storage, next)?;
    Ok(next)
}
