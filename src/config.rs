use serde::Deserialize;

pub const SITE_CONFIG_ELEMENT_ID: &str = "site-config";

const DEFAULT_ROLES: [&str; 6] = [
    "Full Stack Developer",
    "Flutter Developer",
    "AI Enthusiast",
    "Problem Solver",
    "Research Scholar",
    "Innovation Driver",
];
const DEFAULT_CALENDAR_USERNAME: &str = "anudeep2710";
const DEFAULT_CALENDAR_ENDPOINT: &str = "/api/contributions";
const DEFAULT_PARTICLE_PALETTE: [u32; 2] = [0x00d4ff, 0x0ea5e9];

const TYPING_STEP_MS_BOUNDS: (u32, u32) = (10, 10_000);
const TYPING_PAUSE_MS_BOUNDS: (u32, u32) = (0, 60_000);
const PARTICLE_COUNT_BOUNDS: (u32, u32) = (0, 20_000);
const PARTICLE_SPREAD_BOUNDS: (f64, f64) = (1.0, 1_000.0);

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TypingTiming {
    pub start_delay_ms: u32,
    pub type_ms: u32,
    pub delete_ms: u32,
    pub full_pause_ms: u32,
    pub empty_pause_ms: u32,
}

impl Default for TypingTiming {
    fn default() -> Self {
        Self {
            start_delay_ms: 1_000,
            type_ms: 100,
            delete_ms: 50,
            full_pause_ms: 2_000,
            empty_pause_ms: 500,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParticleSettings {
    pub count: u32,
    pub mobile_count: u32,
    pub spread: f64,
    pub size: f64,
    pub opacity: f64,
    pub palette: Vec<u32>,
    pub spin_x: f64,
    pub spin_y: f64,
    pub camera_distance: f64,
    pub field_of_view: f64,
}

impl Default for ParticleSettings {
    fn default() -> Self {
        Self {
            count: 1_500,
            mobile_count: 500,
            spread: 100.0,
            size: 0.5,
            opacity: 0.8,
            palette: DEFAULT_PARTICLE_PALETTE.to_vec(),
            spin_x: 0.0002,
            spin_y: 0.0003,
            camera_distance: 50.0,
            field_of_view: 75.0,
        }
    }
}

impl ParticleSettings {
    pub fn count_for(&self, mobile: bool) -> u32 {
        if mobile {
            self.mobile_count
        } else {
            self.count
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CalendarSettings {
    pub username: String,
    pub endpoint: String,
}

impl Default for CalendarSettings {
    fn default() -> Self {
        Self {
            username: DEFAULT_CALENDAR_USERNAME.to_string(),
            endpoint: DEFAULT_CALENDAR_ENDPOINT.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SiteConfig {
    pub roles: Vec<String>,
    pub typing: TypingTiming,
    pub particles: ParticleSettings,
    pub calendar: Option<CalendarSettings>,
    pub navbar_scroll_threshold: f64,
    pub navbar_fallback_height: f64,
    pub cursor_trail_min_width: f64,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            roles: DEFAULT_ROLES.iter().map(|role| role.to_string()).collect(),
            typing: TypingTiming::default(),
            particles: ParticleSettings::default(),
            calendar: Some(CalendarSettings::default()),
            navbar_scroll_threshold: 50.0,
            navbar_fallback_height: 70.0,
            cursor_trail_min_width: 768.0,
        }
    }
}

impl SiteConfig {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let parsed: Self = serde_json::from_str(raw)?;
        Ok(parsed.clamped())
    }

    /// Falls back to the defaults for any timing or count outside its bounds.
    fn clamped(mut self) -> Self {
        let defaults = Self::default();

        self.typing.start_delay_ms = within_bounds(
            self.typing.start_delay_ms,
            defaults.typing.start_delay_ms,
            TYPING_PAUSE_MS_BOUNDS,
        );
        self.typing.type_ms =
            within_bounds(self.typing.type_ms, defaults.typing.type_ms, TYPING_STEP_MS_BOUNDS);
        self.typing.delete_ms = within_bounds(
            self.typing.delete_ms,
            defaults.typing.delete_ms,
            TYPING_STEP_MS_BOUNDS,
        );
        self.typing.full_pause_ms = within_bounds(
            self.typing.full_pause_ms,
            defaults.typing.full_pause_ms,
            TYPING_PAUSE_MS_BOUNDS,
        );
        self.typing.empty_pause_ms = within_bounds(
            self.typing.empty_pause_ms,
            defaults.typing.empty_pause_ms,
            TYPING_PAUSE_MS_BOUNDS,
        );

        self.particles.count = within_bounds(
            self.particles.count,
            defaults.particles.count,
            PARTICLE_COUNT_BOUNDS,
        );
        self.particles.mobile_count = within_bounds(
            self.particles.mobile_count,
            defaults.particles.mobile_count,
            PARTICLE_COUNT_BOUNDS,
        );
        if !(PARTICLE_SPREAD_BOUNDS.0..=PARTICLE_SPREAD_BOUNDS.1).contains(&self.particles.spread) {
            self.particles.spread = defaults.particles.spread;
        }

        if let Some(calendar) = self.calendar.as_ref() {
            if calendar.username.trim().is_empty() {
                self.calendar = None;
            }
        }

        self
    }
}

fn within_bounds<T: PartialOrd>(value: T, default: T, bounds: (T, T)) -> T {
    if (bounds.0..=bounds.1).contains(&value) {
        value
    } else {
        default
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let config = SiteConfig::from_json("{}").expect("valid config");
        assert_eq!(config, SiteConfig::default());
        assert_eq!(config.roles.len(), 6);
        assert_eq!(config.typing.type_ms, 100);
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let config = SiteConfig::from_json(
            r#"{ "roles": ["Rustacean"], "typing": { "deleteMs": 25 }, "calendar": { "username": "octocat" } }"#,
        )
        .expect("valid config");

        assert_eq!(config.roles, vec!["Rustacean".to_string()]);
        assert_eq!(config.typing.delete_ms, 25);
        assert_eq!(config.typing.full_pause_ms, 2_000);
        let calendar = config.calendar.expect("calendar kept");
        assert_eq!(calendar.username, "octocat");
        assert_eq!(calendar.endpoint, DEFAULT_CALENDAR_ENDPOINT);
    }

    #[test]
    fn out_of_bounds_values_fall_back_to_defaults() {
        let config = SiteConfig::from_json(
            r#"{ "typing": { "typeMs": 1 }, "particles": { "count": 999999, "spread": 0.0 } }"#,
        )
        .expect("valid config");

        assert_eq!(config.typing.type_ms, 100);
        assert_eq!(config.particles.count, 1_500);
        assert_eq!(config.particles.spread, 100.0);
    }

    #[test]
    fn blank_username_disables_calendar() {
        let config =
            SiteConfig::from_json(r#"{ "calendar": { "username": "  " } }"#).expect("valid config");
        assert!(config.calendar.is_none());

        let config = SiteConfig::from_json(r#"{ "calendar": null }"#).expect("valid config");
        assert!(config.calendar.is_none());
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(SiteConfig::from_json("{ roles: ").is_err());
    }

    #[test]
    fn mobile_particle_count_is_selected() {
        let particles = ParticleSettings::default();
        assert_eq!(particles.count_for(false), 1_500);
        assert_eq!(particles.count_for(true), 500);
    }
}
