use std::path::Path;

use clap::ValueEnum;

use crate::error::Result;
use crate::model::Theme;
use crate::output::{self, Format};
use crate::store::kv::FileKv;
use crate::store::prefs;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ThemeAction {
    Show,
    Toggle,
    Light,
    Dark,
}

pub fn run(data_dir: &Path, action: ThemeAction, format: Format) -> Result<()> {
    let kv = FileKv::open(data_dir)?;
    let theme = match action {
        ThemeAction::Show => prefs::load_theme(&kv)?,
        ThemeAction::Toggle => prefs::toggle_theme(&kv)?,
        ThemeAction::Light => {
            prefs::save_theme(&kv, Theme::Light)?;
            Theme::Light
        }
        ThemeAction::Dark => {
            prefs::save_theme(&kv, Theme::Dark)?;
            Theme::Dark
        }
    };
    output::print_theme(theme, format)
}
