//! User profile: cognitive preferences and the navigation profile.
//!
//! Preferences are a flat record of independent toggles and enumerated
//! settings. The navigation profile maps onto a static [`ProfileConfig`]
//! table that decides how much of the board is exposed.

mod store;

pub use store::UserProfileStore;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ComplexityLevel {
    Simple,
    #[default]
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SpacingLevel {
    Compact,
    #[default]
    Normal,
    Relaxed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FontSize {
    Small,
    #[default]
    Medium,
    Large,
}

/// Accessibility-oriented UI preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CognitivePreferences {
    #[serde(default)]
    pub complexity_level: ComplexityLevel,
    #[serde(default)]
    pub focus_mode: bool,
    #[serde(default)]
    pub summary_mode: bool,
    #[serde(default)]
    pub spacing_level: SpacingLevel,
    #[serde(default)]
    pub font_size: FontSize,
    #[serde(default = "default_true")]
    pub cognitive_alerts: bool,
    #[serde(default = "default_true")]
    pub animations_enabled: bool,
    #[serde(default = "default_alert_interval")]
    pub alert_interval_minutes: u32,
}

fn default_true() -> bool {
    true
}
fn default_alert_interval() -> u32 {
    25
}

impl Default for CognitivePreferences {
    fn default() -> Self {
        Self {
            complexity_level: ComplexityLevel::Full,
            focus_mode: false,
            summary_mode: false,
            spacing_level: SpacingLevel::Normal,
            font_size: FontSize::Medium,
            cognitive_alerts: true,
            animations_enabled: true,
            alert_interval_minutes: default_alert_interval(),
        }
    }
}

/// Partial preference update; each field is independent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CognitivePrefsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity_level: Option<ComplexityLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus_mode: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_mode: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spacing_level: Option<SpacingLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<FontSize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cognitive_alerts: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animations_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_interval_minutes: Option<u32>,
}

impl CognitivePreferences {
    /// Merge the set fields of `patch` into `self`.
    pub fn apply(&mut self, patch: &CognitivePrefsPatch) {
        if let Some(v) = patch.complexity_level {
            self.complexity_level = v;
        }
        if let Some(v) = patch.focus_mode {
            self.focus_mode = v;
        }
        if let Some(v) = patch.summary_mode {
            self.summary_mode = v;
        }
        if let Some(v) = patch.spacing_level {
            self.spacing_level = v;
        }
        if let Some(v) = patch.font_size {
            self.font_size = v;
        }
        if let Some(v) = patch.cognitive_alerts {
            self.cognitive_alerts = v;
        }
        if let Some(v) = patch.animations_enabled {
            self.animations_enabled = v;
        }
        if let Some(v) = patch.alert_interval_minutes {
            self.alert_interval_minutes = v;
        }
    }
}

impl CognitivePrefsPatch {
    /// Build a single-field patch from a `key`/`value` pair as typed on a
    /// command line (`focus_mode true`, `font_size large`, ...).
    pub fn from_key_value(key: &str, value: &str) -> Result<Self, ValidationError> {
        // Reuse serde so the accepted spellings match the stored ones.
        let json_value = match key {
            "focus_mode" | "summary_mode" | "cognitive_alerts" | "animations_enabled" => {
                serde_json::Value::Bool(value.parse::<bool>().map_err(|_| invalid(key, value))?)
            }
            "alert_interval_minutes" => {
                let n = value.parse::<u32>().map_err(|_| invalid(key, value))?;
                serde_json::Value::Number(check_alert_interval(n)?.into())
            }
            "complexity_level" | "spacing_level" | "font_size" => {
                serde_json::Value::String(value.to_ascii_lowercase())
            }
            _ => {
                return Err(ValidationError::UnknownVariant {
                    kind: "preference".into(),
                    value: key.into(),
                })
            }
        };
        let mut obj = serde_json::Map::new();
        obj.insert(key.to_string(), json_value);
        serde_json::from_value(serde_json::Value::Object(obj)).map_err(|_| invalid(key, value))
    }
}

/// Minutes between cognitive alerts offered to the user.
pub const ALERT_INTERVAL_CHOICES: [u32; 5] = [10, 20, 30, 45, 60];

/// Accept `minutes` if it is one of [`ALERT_INTERVAL_CHOICES`] or the
/// 25-minute default.
pub fn check_alert_interval(minutes: u32) -> Result<u32, ValidationError> {
    if minutes == default_alert_interval() || ALERT_INTERVAL_CHOICES.contains(&minutes) {
        Ok(minutes)
    } else {
        Err(ValidationError::InvalidValue {
            field: "alert_interval_minutes".into(),
            message: format!("choose one of {ALERT_INTERVAL_CHOICES:?}"),
        })
    }
}

fn invalid(key: &str, value: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: key.into(),
        message: format!("cannot use '{value}'"),
    }
}

/// Self-selected experience level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NavigationProfile {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl NavigationProfile {
    pub fn as_str(self) -> &'static str {
        match self {
            NavigationProfile::Beginner => "beginner",
            NavigationProfile::Intermediate => "intermediate",
            NavigationProfile::Advanced => "advanced",
        }
    }

    pub fn config(self) -> &'static ProfileConfig {
        match self {
            NavigationProfile::Beginner => &BEGINNER,
            NavigationProfile::Intermediate => &INTERMEDIATE,
            NavigationProfile::Advanced => &ADVANCED,
        }
    }
}

impl fmt::Display for NavigationProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NavigationProfile {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginner" => Ok(NavigationProfile::Beginner),
            "intermediate" => Ok(NavigationProfile::Intermediate),
            "advanced" => Ok(NavigationProfile::Advanced),
            other => Err(ValidationError::UnknownVariant {
                kind: "navigation profile".into(),
                value: other.into(),
            }),
        }
    }
}

/// What a navigation profile exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProfileConfig {
    pub show_tooltips: bool,
    pub max_tasks_in_doing: usize,
    pub show_limits: bool,
    /// Only the `todo` and `doing` columns are shown.
    pub simplified_kanban: bool,
    pub show_onboarding: bool,
    pub show_analytics: bool,
}

const BEGINNER: ProfileConfig = ProfileConfig {
    show_tooltips: true,
    max_tasks_in_doing: 1,
    show_limits: true,
    simplified_kanban: true,
    show_onboarding: true,
    show_analytics: false,
};

const INTERMEDIATE: ProfileConfig = ProfileConfig {
    show_tooltips: false,
    max_tasks_in_doing: 3,
    show_limits: true,
    simplified_kanban: false,
    show_onboarding: false,
    show_analytics: false,
};

const ADVANCED: ProfileConfig = ProfileConfig {
    show_tooltips: false,
    max_tasks_in_doing: 5,
    show_limits: false,
    simplified_kanban: false,
    show_onboarding: false,
    show_analytics: true,
};

impl ProfileConfig {
    /// Look up a profile by its stored name; unknown names get the
    /// intermediate table.
    pub fn for_name(name: &str) -> &'static ProfileConfig {
        name.parse::<NavigationProfile>()
            .map(NavigationProfile::config)
            .unwrap_or(&INTERMEDIATE)
    }
}

/// Per-user record kept by the user repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub navigation_profile: NavigationProfile,
    #[serde(default)]
    pub specific_needs: Vec<String>,
    #[serde(default)]
    pub study_routine: Option<String>,
    #[serde(default)]
    pub work_routine: Option<String>,
    #[serde(default)]
    pub cognitive_preferences: CognitivePreferences,
}

impl UserInfo {
    /// Fresh record: beginner profile and default preferences.
    pub fn with_defaults(id: impl Into<String>, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            avatar_url: None,
            navigation_profile: NavigationProfile::Beginner,
            specific_needs: Vec::new(),
            study_routine: None,
            work_routine: None,
            cognitive_preferences: CognitivePreferences::default(),
        }
    }
}

/// Partial update of the non-preference user fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfoPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigation_profile: Option<NavigationProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specific_needs: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub study_routine: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_routine: Option<String>,
}

impl UserInfoPatch {
    pub fn apply_to(&self, info: &mut UserInfo) {
        if let Some(name) = &self.name {
            info.name = name.clone();
        }
        if let Some(url) = &self.avatar_url {
            info.avatar_url = Some(url.clone());
        }
        if let Some(profile) = self.navigation_profile {
            info.navigation_profile = profile;
        }
        if let Some(needs) = &self.specific_needs {
            info.specific_needs = needs.clone();
        }
        if let Some(routine) = &self.study_routine {
            info.study_routine = Some(routine.clone());
        }
        if let Some(routine) = &self.work_routine {
            info.work_routine = Some(routine.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_preferences_match_first_run_values() {
        let prefs = CognitivePreferences::default();
        assert_eq!(prefs.complexity_level, ComplexityLevel::Full);
        assert!(!prefs.focus_mode);
        assert!(prefs.cognitive_alerts);
        assert_eq!(prefs.alert_interval_minutes, 25);
    }

    #[test]
    fn patch_touches_only_given_fields() {
        let mut prefs = CognitivePreferences::default();
        prefs.apply(&CognitivePrefsPatch {
            focus_mode: Some(true),
            font_size: Some(FontSize::Large),
            ..Default::default()
        });
        assert!(prefs.focus_mode);
        assert_eq!(prefs.font_size, FontSize::Large);
        assert_eq!(prefs.spacing_level, SpacingLevel::Normal);
    }

    #[test]
    fn profile_table_lookup() {
        assert_eq!(NavigationProfile::Beginner.config().max_tasks_in_doing, 1);
        assert!(NavigationProfile::Beginner.config().simplified_kanban);
        assert_eq!(NavigationProfile::Intermediate.config().max_tasks_in_doing, 3);
        assert!(NavigationProfile::Advanced.config().show_analytics);
        assert!(!NavigationProfile::Advanced.config().show_limits);
    }

    #[test]
    fn unknown_profile_falls_back_to_intermediate() {
        assert_eq!(
            ProfileConfig::for_name("expert"),
            NavigationProfile::Intermediate.config()
        );
    }

    #[test]
    fn prefs_patch_from_key_value() {
        let patch = CognitivePrefsPatch::from_key_value("font_size", "Large").unwrap();
        assert_eq!(patch.font_size, Some(FontSize::Large));

        let patch = CognitivePrefsPatch::from_key_value("alert_interval_minutes", "45").unwrap();
        assert_eq!(patch.alert_interval_minutes, Some(45));
        assert!(CognitivePrefsPatch::from_key_value("alert_interval_minutes", "7").is_err());

        assert!(CognitivePrefsPatch::from_key_value("focus_mode", "maybe").is_err());
        assert!(CognitivePrefsPatch::from_key_value("spacing_level", "huge").is_err());
        assert!(CognitivePrefsPatch::from_key_value("theme", "dark").is_err());
    }

    #[test]
    fn user_info_defaults() {
        let info = UserInfo::with_defaults("u1", "Ana", "ana@example.com");
        assert_eq!(info.navigation_profile, NavigationProfile::Beginner);
        assert_eq!(info.cognitive_preferences, CognitivePreferences::default());
    }
}
