use std::fmt;

use crate::contributions::{ContributionCalendar, ContributionDay, ContributionsPayload};

pub const CALENDAR_FALLBACK_MESSAGE: &str = "GitHub contribution graph currently unavailable.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CalendarError {
    Request(String),
    Decode(String),
    Upstream(String),
}

impl fmt::Display for CalendarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request(message) => write!(f, "contribution request failed: {message}"),
            Self::Decode(message) => write!(f, "contribution response unreadable: {message}"),
            Self::Upstream(message) => write!(f, "contribution service error: {message}"),
        }
    }
}

impl std::error::Error for CalendarError {}

pub trait ContributionSource {
    async fn fetch(&self, username: &str) -> Result<ContributionCalendar, CalendarError>;
}

pub trait CalendarHost {
    fn render(&self, calendar: ContributionCalendar);
    fn show_fallback(&self, message: &str);

    /// `true` once the page has been torn down; late responses are dropped.
    fn is_released(&self) -> bool {
        false
    }
}

pub fn calendar_from_payload(payload: ContributionsPayload) -> Result<ContributionCalendar, CalendarError> {
    match payload {
        ContributionsPayload {
            ok: true,
            calendar: Some(calendar),
            ..
        } => Ok(calendar),
        ContributionsPayload { error, .. } => Err(CalendarError::Upstream(
            error.unwrap_or_else(|| "missing calendar".to_string()),
        )),
    }
}

pub fn day_tooltip(day: &ContributionDay) -> String {
    match day.count {
        0 => format!("No contributions on {}", day.date),
        1 => format!("1 contribution on {}", day.date),
        count => format!("{count} contributions on {}", day.date),
    }
}

pub fn summary_label(total: u32) -> String {
    match total {
        1 => "1 contribution in the last year".to_string(),
        total => format!("{total} contributions in the last year"),
    }
}

pub async fn load_calendar<S, H>(source: &S, host: &H, username: &str) -> bool
where
    S: ContributionSource,
    H: CalendarHost,
{
    let result = source.fetch(username).await;
    if host.is_released() {
        log::debug!("contribution calendar for {username} arrived after teardown");
        return false;
    }

    match result {
        Ok(calendar) => {
            log::debug!(
                "contribution calendar loaded for {username}: {} days",
                calendar.day_count()
            );
            host.render(calendar);
            true
        }
        Err(error) => {
            log::error!("Could not load GitHub calendar: {error}");
            host.show_fallback(CALENDAR_FALLBACK_MESSAGE);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contributions::ContributionWeek;
    use std::cell::RefCell;

    struct FixedSource(Result<ContributionCalendar, CalendarError>);

    impl ContributionSource for FixedSource {
        async fn fetch(&self, _username: &str) -> Result<ContributionCalendar, CalendarError> {
            self.0.clone()
        }
    }

    #[derive(Default)]
    struct RecordingHost {
        content: RefCell<Option<String>>,
        rendered: RefCell<Option<ContributionCalendar>>,
        released: bool,
    }

    impl CalendarHost for RecordingHost {
        fn render(&self, calendar: ContributionCalendar) {
            *self.rendered.borrow_mut() = Some(calendar);
        }

        fn show_fallback(&self, message: &str) {
            *self.content.borrow_mut() = Some(message.to_string());
        }

        fn is_released(&self) -> bool {
            self.released
        }
    }

    fn sample_calendar() -> ContributionCalendar {
        ContributionCalendar {
            username: "octocat".to_string(),
            total: 3,
            weeks: vec![ContributionWeek {
                days: vec![ContributionDay {
                    date: "2024-01-07".to_string(),
                    weekday: 0,
                    level: 2,
                    count: 3,
                }],
            }],
        }
    }

    #[tokio::test]
    async fn rejected_fetch_shows_fallback_message() {
        let source = FixedSource(Err(CalendarError::Request("network down".to_string())));
        let host = RecordingHost::default();

        let loaded = load_calendar(&source, &host, "octocat").await;

        assert!(!loaded);
        assert_eq!(host.content.borrow().as_deref(), Some(CALENDAR_FALLBACK_MESSAGE));
        assert!(host.rendered.borrow().is_none());
    }

    #[tokio::test]
    async fn successful_fetch_renders_calendar() {
        let source = FixedSource(Ok(sample_calendar()));
        let host = RecordingHost::default();

        assert!(load_calendar(&source, &host, "octocat").await);
        assert_eq!(host.rendered.borrow().as_ref(), Some(&sample_calendar()));
        assert!(host.content.borrow().is_none());
    }

    #[tokio::test]
    async fn response_after_teardown_touches_nothing() {
        let host = RecordingHost {
            released: true,
            ..RecordingHost::default()
        };

        assert!(!load_calendar(&FixedSource(Ok(sample_calendar())), &host, "octocat").await);
        let failing = FixedSource(Err(CalendarError::Request("network down".to_string())));
        assert!(!load_calendar(&failing, &host, "octocat").await);

        assert!(host.rendered.borrow().is_none());
        assert!(host.content.borrow().is_none());
    }

    #[test]
    fn error_payload_becomes_upstream_error() {
        let payload = ContributionsPayload {
            ok: false,
            calendar: None,
            error: Some("unknown user".to_string()),
        };

        assert_eq!(
            calendar_from_payload(payload),
            Err(CalendarError::Upstream("unknown user".to_string()))
        );
    }

    #[test]
    fn ok_payload_without_calendar_is_rejected() {
        let payload: ContributionsPayload =
            serde_json::from_str(r#"{ "ok": true }"#).expect("valid payload");

        assert!(matches!(
            calendar_from_payload(payload),
            Err(CalendarError::Upstream(_))
        ));
    }

    #[test]
    fn ok_payload_yields_calendar() {
        let payload = ContributionsPayload::success(sample_calendar());
        assert_eq!(calendar_from_payload(payload), Ok(sample_calendar()));
    }

    #[test]
    fn tooltips_pluralize_counts() {
        let mut day = sample_calendar().weeks[0].days[0].clone();
        assert_eq!(day_tooltip(&day), "3 contributions on 2024-01-07");

        day.count = 1;
        assert_eq!(day_tooltip(&day), "1 contribution on 2024-01-07");

        day.count = 0;
        assert_eq!(day_tooltip(&day), "No contributions on 2024-01-07");
    }

    #[test]
    fn summary_label_handles_singular_total() {
        assert_eq!(summary_label(1), "1 contribution in the last year");
        assert_eq!(summary_label(0), "0 contributions in the last year");
        assert_eq!(summary_label(412), "412 contributions in the last year");
    }
}
