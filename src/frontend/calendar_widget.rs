use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use gloo_net::http::Request;
use js_sys::encode_uri_component;
use web_sys::{Document, Element};
use yew::{prelude::*, AppHandle};

use super::dom;
use crate::calendar::{
    calendar_from_payload, day_tooltip, summary_label, CalendarError, CalendarHost, ContributionSource,
};
use crate::contributions::{ContributionCalendar, ContributionsPayload};

const CALENDAR_SELECTOR: &str = ".calendar";
const LOADER_SELECTOR: &str = ".calendar-loading";
const FALLBACK_STYLE: &str = "color:var(--color-text-muted);text-align:center;";
const LEGEND_LEVELS: [u8; 5] = [0, 1, 2, 3, 4];

pub struct HttpContributionSource {
    endpoint: String,
}

impl HttpContributionSource {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
        }
    }
}

impl ContributionSource for HttpContributionSource {
    async fn fetch(&self, username: &str) -> Result<ContributionCalendar, CalendarError> {
        let user = encode_uri_component(username)
            .as_string()
            .unwrap_or_else(|| username.to_string());
        let url = format!("{}?user={user}", self.endpoint);

        let response = Request::get(&url)
            .send()
            .await
            .map_err(|error| CalendarError::Request(error.to_string()))?;
        let payload = response
            .json::<ContributionsPayload>()
            .await
            .map_err(|error| CalendarError::Decode(error.to_string()))?;

        calendar_from_payload(payload)
    }
}

pub struct DomCalendarHost {
    document: Document,
    container: Element,
    loader: Option<Element>,
    app: RefCell<Option<AppHandle<ContributionGrid>>>,
    released: Cell<bool>,
}

impl DomCalendarHost {
    pub fn find(document: &Document) -> Option<Self> {
        Some(Self {
            document: document.clone(),
            container: dom::query(document, CALENDAR_SELECTOR)?,
            loader: dom::query(document, LOADER_SELECTOR),
            app: RefCell::new(None),
            released: Cell::new(false),
        })
    }

    fn unmount(&self) {
        if let Some(app) = self.app.borrow_mut().take() {
            app.destroy();
        }
    }

    pub fn teardown(&self) {
        self.released.set(true);
        self.unmount();
    }
}

impl CalendarHost for DomCalendarHost {
    fn render(&self, calendar: ContributionCalendar) {
        if self.is_released() {
            return;
        }
        self.unmount();
        dom::set_style(&self.container, "min-height", "auto");
        if let Some(loader) = &self.loader {
            dom::set_style(loader, "display", "none");
        }

        self.container.set_inner_html("");
        let props = ContributionGridProps {
            calendar: Rc::new(calendar),
        };
        let app = yew::Renderer::<ContributionGrid>::with_root_and_props(self.container.clone(), props).render();
        *self.app.borrow_mut() = Some(app);
    }

    fn show_fallback(&self, message: &str) {
        if self.is_released() {
            return;
        }
        self.unmount();
        self.container.set_inner_html("");

        let Ok(paragraph) = self.document.create_element("p") else {
            return;
        };
        let _ = paragraph.set_attribute("style", FALLBACK_STYLE);
        paragraph.set_text_content(Some(message));
        let _ = self.container.append_child(&paragraph);
    }

    fn is_released(&self) -> bool {
        self.released.get()
    }
}

#[derive(Properties, PartialEq)]
pub struct ContributionGridProps {
    calendar: Rc<ContributionCalendar>,
}

#[function_component(ContributionGrid)]
pub fn contribution_grid(props: &ContributionGridProps) -> Html {
    let calendar = &props.calendar;
    let profile = format!("https://github.com/{}", calendar.username);

    html! {
        <div class="contribution-calendar">
            <div class="contribution-weeks" role="grid" aria-label={summary_label(calendar.total)}>
                { for calendar.weeks.iter().map(|week| html! {
                    <div class="contribution-week" role="row">
                        { for week.days.iter().map(|day| html! {
                            <span
                                class="contribution-day"
                                role="gridcell"
                                data-date={day.date.clone()}
                                data-level={day.level.to_string()}
                                style={format!("grid-row: {}", u32::from(day.weekday) + 1)}
                                title={day_tooltip(day)}
                            />
                        }) }
                    </div>
                }) }
            </div>
            <div class="contribution-footer">
                <a class="contribution-summary" href={profile} target="_blank" rel="noopener noreferrer">
                    {summary_label(calendar.total)}
                </a>
                <div class="contribution-legend" aria-hidden="true">
                    <span>{"Less"}</span>
                    { for LEGEND_LEVELS.iter().map(|level| html! {
                        <span class="contribution-day" data-level={level.to_string()} />
                    }) }
                    <span>{"More"}</span>
                </div>
            </div>
        </div>
    }
}
