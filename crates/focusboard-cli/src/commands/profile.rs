//! User profile commands.

use clap::Subcommand;
use focusboard_core::profile::UserInfoPatch;
use focusboard_core::{Config, NavigationProfile};

use crate::app::{print_json, App};

#[derive(Subcommand)]
pub enum ProfileAction {
    /// Show the profile and what its navigation profile exposes
    Show,
    /// Set a profile field: name, avatar_url, navigation_profile,
    /// specific_needs (comma-separated), study_routine or work_routine
    Set { key: String, value: String },
}

pub async fn run(action: ProfileAction, config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let app = App::open(config).await?;
    app.require_user()?;
    let profiles = app.profiles();

    match action {
        ProfileAction::Show => {
            print_json(&serde_json::json!({
                "user": profiles.user_info(),
                "config": profiles.profile_config(),
            }))?;
        }
        ProfileAction::Set { key, value } => {
            if key == "navigation_profile" {
                let profile: NavigationProfile = value.parse()?;
                profiles.set_navigation_profile(profile).await?;
            } else {
                profiles.update_user_info(patch_for(&key, &value)?).await?;
            }
            println!("{key} = {value}");
        }
    }
    Ok(())
}

fn patch_for(key: &str, value: &str) -> Result<UserInfoPatch, Box<dyn std::error::Error>> {
    let mut patch = UserInfoPatch::default();
    match key {
        "name" => patch.name = Some(value.trim().to_string()),
        "avatar_url" => patch.avatar_url = Some(value.to_string()),
        "specific_needs" => {
            patch.specific_needs = Some(focusboard_core::task::parse_tags(value));
        }
        "study_routine" => patch.study_routine = Some(value.to_string()),
        "work_routine" => patch.work_routine = Some(value.to_string()),
        other => return Err(format!("unknown profile field `{other}`").into()),
    }
    Ok(patch)
}
