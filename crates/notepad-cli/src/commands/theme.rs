//! Theme command handlers

use anyhow::{bail, Result};

use notepad_core::{Config, ExecutionContext, PersistentStore, Theme, THEME_KEY};

use crate::commands::store_options;
use crate::output::Output;

/// Store bound to the theme preference
pub type ThemeStore = PersistentStore<Theme>;

/// Open the theme preference, light unless set otherwise
pub fn open(ctx: &ExecutionContext, config: &Config) -> ThemeStore {
    PersistentStore::open(ctx, THEME_KEY, Theme::default(), store_options(config))
}

/// Show the current theme
pub fn show(store: &ThemeStore, output: &Output) -> Result<()> {
    output.print_theme(*store.get());
    Ok(())
}

/// Switch between light and dark
pub fn toggle(store: &mut ThemeStore, output: &Output) -> Result<()> {
    let before = *store.get();
    store.update(|theme| theme.toggled());

    if *store.get() == before {
        bail!("Failed to save theme. See the log for details.");
    }

    output.success(&format!("Theme set to {}", store.get()));
    Ok(())
}

/// Forget the stored preference
pub fn reset(store: &mut ThemeStore, output: &Output) -> Result<()> {
    store.remove();

    if *store.get() != Theme::default() {
        bail!("Failed to reset theme. See the log for details.");
    }

    output.success(&format!("Theme reset to {}", store.get()));
    Ok(())
}
