//! Menu command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::Herald;
use anyhow::Result;

/// Run the menu command.
pub async fn run_menu(cuisine: &str, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Menu, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let herald = Herald::from_settings(settings)?;

    let spinner = Output::spinner(&format!("Dreaming up a {} restaurant...", cuisine));
    let menu = herald.menu(cuisine).await;
    spinner.finish_and_clear();

    let menu = menu.map_err(|e| {
        Output::error(&format!("Menu generation failed: {}", e));
        e
    })?;

    Output::header(&menu.restaurant_name);
    for item in &menu.items {
        Output::list_item(item);
    }
    println!();

    Ok(())
}
