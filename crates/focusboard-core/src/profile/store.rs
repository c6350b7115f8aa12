//! Signed-in user's profile with optimistic preference updates.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{
    check_alert_interval, CognitivePreferences, CognitivePrefsPatch, ComplexityLevel, FontSize,
    NavigationProfile, ProfileConfig, SpacingLevel, UserInfo, UserInfoPatch,
};
use crate::error::{CoreError, Result};
use crate::repository::UserRepository;

#[derive(Default)]
struct ProfileState {
    user_id: Option<String>,
    generation: u64,
    info: Option<UserInfo>,
}

/// Holds the [`UserInfo`] of the signed-in user.
///
/// Updates are applied locally first and then written through. A failed
/// write is returned to the caller but the local change stays.
pub struct UserProfileStore {
    repo: Arc<dyn UserRepository>,
    state: Mutex<ProfileState>,
}

impl UserProfileStore {
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self {
            repo,
            state: Mutex::new(ProfileState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, ProfileState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fetch (or create from `defaults`) the record of `user_id` and make it
    /// current. A load that finishes after another user took over is
    /// dropped.
    pub async fn load(&self, user_id: &str, defaults: &UserInfo) -> Result<UserInfo> {
        let generation = {
            let mut state = self.state();
            if state.user_id.as_deref() != Some(user_id) {
                state.generation += 1;
                state.user_id = Some(user_id.to_string());
                state.info = None;
            }
            state.generation
        };

        let info = self.repo.get_or_create(user_id, defaults).await?;

        let mut state = self.state();
        if state.generation == generation {
            state.info = Some(info.clone());
        } else {
            tracing::debug!(user_id, "discarding profile load for previous session");
        }
        Ok(info)
    }

    /// Forget the current user.
    pub fn sign_out(&self) {
        let mut state = self.state();
        state.generation += 1;
        state.user_id = None;
        state.info = None;
    }

    pub fn user_info(&self) -> Option<UserInfo> {
        self.state().info.clone()
    }

    /// Current preferences, or the defaults when nothing is loaded.
    pub fn cognitive_preferences(&self) -> CognitivePreferences {
        self.state()
            .info
            .as_ref()
            .map(|i| i.cognitive_preferences.clone())
            .unwrap_or_default()
    }

    pub fn navigation_profile(&self) -> NavigationProfile {
        self.state()
            .info
            .as_ref()
            .map(|i| i.navigation_profile)
            .unwrap_or_default()
    }

    pub fn profile_config(&self) -> &'static ProfileConfig {
        self.navigation_profile().config()
    }

    /// Merge `patch` into the local preferences and write it through.
    ///
    /// Does nothing when no profile is loaded.
    pub async fn update_cognitive_prefs(&self, patch: CognitivePrefsPatch) -> Result<()> {
        if let Some(minutes) = patch.alert_interval_minutes {
            check_alert_interval(minutes)?;
        }
        let user_id = {
            let mut state = self.state();
            let Some(user_id) = state.user_id.clone() else {
                return Ok(());
            };
            let Some(info) = state.info.as_mut() else {
                return Ok(());
            };
            info.cognitive_preferences.apply(&patch);
            user_id
        };
        tracing::debug!(%user_id, ?patch, "preferences updated locally");

        self.repo
            .update_cognitive_prefs(&user_id, &patch)
            .await
            .map_err(|e| {
                tracing::warn!(%user_id, error = %e, "failed to store preferences");
                CoreError::from(e)
            })
    }

    /// Merge `patch` into the local record and write it through.
    ///
    /// Does nothing when no profile is loaded.
    pub async fn update_user_info(&self, patch: UserInfoPatch) -> Result<()> {
        let user_id = {
            let mut state = self.state();
            let Some(user_id) = state.user_id.clone() else {
                return Ok(());
            };
            let Some(info) = state.info.as_mut() else {
                return Ok(());
            };
            patch.apply_to(info);
            user_id
        };

        self.repo
            .update_user_info(&user_id, &patch)
            .await
            .map_err(|e| {
                tracing::warn!(%user_id, error = %e, "failed to store user info");
                CoreError::from(e)
            })
    }

    pub async fn toggle_focus_mode(&self) -> Result<()> {
        let current = self.cognitive_preferences().focus_mode;
        self.update_cognitive_prefs(CognitivePrefsPatch {
            focus_mode: Some(!current),
            ..Default::default()
        })
        .await
    }

    pub async fn toggle_summary_mode(&self) -> Result<()> {
        let current = self.cognitive_preferences().summary_mode;
        self.update_cognitive_prefs(CognitivePrefsPatch {
            summary_mode: Some(!current),
            ..Default::default()
        })
        .await
    }

    pub async fn toggle_animations(&self) -> Result<()> {
        let current = self.cognitive_preferences().animations_enabled;
        self.update_cognitive_prefs(CognitivePrefsPatch {
            animations_enabled: Some(!current),
            ..Default::default()
        })
        .await
    }

    pub async fn toggle_cognitive_alerts(&self) -> Result<()> {
        let current = self.cognitive_preferences().cognitive_alerts;
        self.update_cognitive_prefs(CognitivePrefsPatch {
            cognitive_alerts: Some(!current),
            ..Default::default()
        })
        .await
    }

    pub async fn set_font_size(&self, font_size: FontSize) -> Result<()> {
        self.update_cognitive_prefs(CognitivePrefsPatch {
            font_size: Some(font_size),
            ..Default::default()
        })
        .await
    }

    pub async fn set_spacing_level(&self, spacing_level: SpacingLevel) -> Result<()> {
        self.update_cognitive_prefs(CognitivePrefsPatch {
            spacing_level: Some(spacing_level),
            ..Default::default()
        })
        .await
    }

    pub async fn set_complexity_level(&self, complexity_level: ComplexityLevel) -> Result<()> {
        self.update_cognitive_prefs(CognitivePrefsPatch {
            complexity_level: Some(complexity_level),
            ..Default::default()
        })
        .await
    }

    pub async fn set_alert_interval(&self, minutes: u32) -> Result<()> {
        self.update_cognitive_prefs(CognitivePrefsPatch {
            alert_interval_minutes: Some(minutes),
            ..Default::default()
        })
        .await
    }

    pub async fn set_navigation_profile(&self, profile: NavigationProfile) -> Result<()> {
        self.update_user_info(UserInfoPatch {
            navigation_profile: Some(profile),
            ..Default::default()
        })
        .await
    }
}
