use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionDay {
    pub date: String,
    pub weekday: u8,
    pub level: u8,
    pub count: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionWeek {
    pub days: Vec<ContributionDay>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionCalendar {
    pub username: String,
    pub total: u32,
    pub weeks: Vec<ContributionWeek>,
}

impl ContributionCalendar {
    pub fn day_count(&self) -> usize {
        self.weeks.iter().map(|week| week.days.len()).sum()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionsPayload {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar: Option<ContributionCalendar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(not(target_arch = "wasm32"))]
impl ContributionsPayload {
    pub fn success(calendar: ContributionCalendar) -> Self {
        Self {
            ok: true,
            calendar: Some(calendar),
            error: None,
        }
    }

    pub fn error(message: &str) -> Self {
        Self {
            ok: false,
            calendar: None,
            error: Some(message.to_string()),
        }
    }
}
