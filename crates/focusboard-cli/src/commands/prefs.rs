use clap::Subcommand;
use focusboard_core::profile::CognitivePrefsPatch;
use focusboard_core::Config;

use crate::app::{print_json, App};

#[derive(Subcommand)]
pub enum PrefsAction {
    /// Show cognitive preferences
    Show,
    /// Set one preference, e.g. `font_size large` or `focus_mode true`
    Set { key: String, value: String },
    /// Flip a boolean preference
    Toggle {
        /// focus_mode, summary_mode, animations_enabled or cognitive_alerts
        key: String,
    },
}

pub async fn run(action: PrefsAction, config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let app = App::open(config).await?;
    app.require_user()?;
    let profiles = app.profiles();

    match action {
        PrefsAction::Show => print_json(&profiles.cognitive_preferences())?,
        PrefsAction::Set { key, value } => {
            let patch = CognitivePrefsPatch::from_key_value(&key, &value)?;
            profiles.update_cognitive_prefs(patch).await?;
            println!("{key} = {value}");
        }
        PrefsAction::Toggle { key } => {
            match key.as_str() {
                "focus_mode" => profiles.toggle_focus_mode().await?,
                "summary_mode" => profiles.toggle_summary_mode().await?,
                "animations_enabled" => profiles.toggle_animations().await?,
                "cognitive_alerts" => profiles.toggle_cognitive_alerts().await?,
                other => return Err(format!("`{other}` is not a toggle").into()),
            }
            print_json(&profiles.cognitive_preferences())?;
        }
    }
    Ok(())
}
