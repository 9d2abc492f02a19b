mod background;
mod calendar_widget;
mod dom;
mod effects;
mod navigation;
mod reveal;
mod typing;

use std::{cell::RefCell, rc::Rc};

use gloo_timers::callback::Timeout;
use js_sys::{Object, Reflect};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use wasm_bindgen_futures::spawn_local;
use web_sys::{
    console, window, AddEventListenerOptions, Document, HtmlCanvasElement,
    PageTransitionEvent, Window,
};

use self::{
    background::{ParticleBackground, Three},
    calendar_widget::{DomCalendarHost, HttpContributionSource},
    effects::{CardTilt, CursorEffect, DeviceShims, StatCounters},
    navigation::{Navigation, SectionObserver},
    reveal::{ScrollReveal, Timeline},
    typing::TypingTask,
};
use crate::{
    calendar::load_calendar,
    config::{SiteConfig, SITE_CONFIG_ELEMENT_ID},
    device::DeviceProfile,
    typer::RoleTyper,
};

const BACKGROUND_CANVAS_ID: &str = "3d-canvas";
const TYPING_TARGET_ID: &str = "typing-text";
const HERO_SELECTOR: &str = ".hero-content";
const HERO_FADE_DELAY_MS: u32 = 100;

const GREETING: [(&str, &str); 2] = [
    (
        "%c👋 Welcome to my portfolio!",
        "color: #00d4ff; font-size: 24px; font-weight: bold; text-shadow: 0 0 10px rgba(0,212,255,0.5);",
    ),
    (
        "%cLooking under the hood? I like your style!",
        "color: #e5e7eb; font-size: 14px;",
    ),
];

#[derive(Clone, Debug, Default)]
struct Capabilities {
    three: Option<Three>,
    timeline: Option<Timeline>,
}

impl Capabilities {
    fn detect() -> Self {
        let global: Object = js_sys::global();
        let capabilities = Self {
            three: Three::detect(&global),
            timeline: Timeline::detect(&global),
        };

        if capabilities.three.is_none() {
            log::info!("THREE not found, particle background disabled");
        }
        if capabilities.timeline.is_none() {
            log::info!("gsap/ScrollTrigger not found, scroll animations disabled");
        }
        capabilities
    }
}

#[derive(Default)]
struct Enhancements {
    navigation: Option<Navigation>,
    sections: Option<SectionObserver>,
    typing: Option<TypingTask>,
    reveal: Option<ScrollReveal>,
    shims: Option<DeviceShims>,
    background: Option<ParticleBackground>,
    tilt: Option<CardTilt>,
    counters: Option<StatCounters>,
    cursor: Option<CursorEffect>,
    calendar: Option<Rc<DomCalendarHost>>,
}

impl Enhancements {
    fn mount_immediate(
        &mut self,
        document: &Document,
        window: &Window,
        config: &SiteConfig,
        capabilities: &Capabilities,
        profile: DeviceProfile,
    ) {
        self.navigation = Some(Navigation::mount(document, config));
        self.sections = SectionObserver::observe(document);

        self.typing = document
            .get_element_by_id(TYPING_TARGET_ID)
            .and_then(|target| {
                TypingTask::start(target, RoleTyper::new(config.roles.clone(), config.typing.clone()))
            });

        self.reveal = capabilities
            .timeline
            .as_ref()
            .map(|timeline| ScrollReveal::animate(document, timeline));

        self.shims = Some(DeviceShims::install(document, window, profile));
    }

    fn mount_on_load(
        &mut self,
        document: &Document,
        window: &Window,
        config: &SiteConfig,
        capabilities: &Capabilities,
        profile: DeviceProfile,
    ) {
        self.background = capabilities.three.as_ref().and_then(|three| {
            let canvas = document
                .get_element_by_id(BACKGROUND_CANVAS_ID)?
                .dyn_into::<HtmlCanvasElement>()
                .ok()?;
            ParticleBackground::mount(three, window, canvas, &config.particles, profile.mobile)
                .map_err(|error| log::error!("particle background failed: {error:#}"))
                .ok()
        });

        if profile.allows_tilt() {
            self.tilt = Some(CardTilt::attach(document));
        }
        self.counters = StatCounters::observe(document);
        self.cursor = Some(CursorEffect::attach(document, window, config.cursor_trail_min_width));

        self.calendar = config.calendar.as_ref().and_then(|settings| {
            let host = Rc::new(DomCalendarHost::find(document)?);
            let source = HttpContributionSource::new(&settings.endpoint);
            let username = settings.username.clone();
            let task_host = host.clone();
            spawn_local(async move {
                load_calendar(&source, task_host.as_ref(), &username).await;
            });
            Some(host)
        });

        if let Some(body) = document.body() {
            let _ = body.class_list().add_1("loaded");
        }
        if let Some(hero) = dom::query(document, HERO_SELECTOR) {
            Timeout::new(HERO_FADE_DELAY_MS, move || {
                let _ = hero.class_list().add_1("fade-in");
            })
            .forget();
        }
    }

    fn teardown(&mut self) {
        if let Some(navigation) = self.navigation.as_mut() {
            navigation.teardown();
        }
        if let Some(sections) = self.sections.take() {
            sections.disconnect();
        }
        if let Some(typing) = self.typing.take() {
            typing.dispose();
        }
        if let Some(reveal) = self.reveal.as_mut() {
            reveal.teardown();
        }
        if let Some(shims) = self.shims.as_mut() {
            shims.teardown();
        }
        if let Some(background) = self.background.as_mut() {
            background.teardown();
        }
        if let Some(tilt) = self.tilt.as_mut() {
            tilt.teardown();
        }
        if let Some(counters) = self.counters.as_mut() {
            counters.teardown();
        }
        if let Some(cursor) = self.cursor.as_mut() {
            cursor.teardown();
        }
        if let Some(calendar) = self.calendar.take() {
            calendar.teardown();
        }
        *self = Self::default();
        log::debug!("page enhancements torn down");
    }
}

fn load_site_config(document: &Document) -> SiteConfig {
    let Some(raw) = document
        .get_element_by_id(SITE_CONFIG_ELEMENT_ID)
        .and_then(|element| element.text_content())
    else {
        return SiteConfig::default();
    };

    SiteConfig::from_json(&raw).unwrap_or_else(|error| {
        log::warn!("ignoring malformed #{SITE_CONFIG_ELEMENT_ID}: {error}");
        SiteConfig::default()
    })
}

fn detect_device(window: &Window) -> DeviceProfile {
    let navigator = window.navigator();
    let user_agent = navigator.user_agent().unwrap_or_default();
    let has_touch_events = Reflect::has(window, &JsValue::from_str("ontouchstart")).unwrap_or(false);

    DeviceProfile::detect(&user_agent, has_touch_events, navigator.max_touch_points())
}

fn print_greeting() {
    for (message, style) in GREETING {
        console::log_2(&JsValue::from_str(message), &JsValue::from_str(style));
    }
}

fn on_window_load(window: &Window, document: &Document, start: impl FnOnce() + 'static) {
    if document.ready_state() == "complete" {
        start();
        return;
    }

    let options = AddEventListenerOptions::new();
    options.set_once(true);
    let callback = Closure::once_into_js(start);
    if let Err(error) = window.add_event_listener_with_callback_and_add_event_listener_options(
        "load",
        callback.unchecked_ref(),
        &options,
    ) {
        log::warn!("load listener not registered: {error:?}");
    }
}

fn on_page_hide(window: &Window, enhancements: Rc<RefCell<Enhancements>>) {
    let callback = Closure::<dyn FnMut(PageTransitionEvent)>::new(move |event: PageTransitionEvent| {
        if !event.persisted() {
            enhancements.borrow_mut().teardown();
        }
    });

    if let Err(error) =
        window.add_event_listener_with_callback("pagehide", callback.as_ref().unchecked_ref())
    {
        log::warn!("pagehide listener not registered: {error:?}");
    }
    callback.forget();
}

pub fn run() {
    console_error_panic_hook::set_once();
    if let Err(error) = console_log::init_with_level(log::Level::Info) {
        console::warn_1(&JsValue::from_str(&format!("logger unavailable: {error}")));
    }

    let Some(window) = window() else {
        return;
    };
    let Some(document) = window.document() else {
        return;
    };

    let config = Rc::new(load_site_config(&document));
    let capabilities = Rc::new(Capabilities::detect());
    let profile = detect_device(&window);
    log::debug!("device profile: {profile:?}");

    effects::inject_cursor_styles(&document);
    print_greeting();

    let enhancements = Rc::new(RefCell::new(Enhancements::default()));
    enhancements
        .borrow_mut()
        .mount_immediate(&document, &window, &config, &capabilities, profile);

    {
        let enhancements = enhancements.clone();
        let load_window = window.clone();
        let load_document = document.clone();
        on_window_load(&window, &document, move || {
            enhancements.borrow_mut().mount_on_load(
                &load_document,
                &load_window,
                &config,
                &capabilities,
                profile,
            );
        });
    }

    on_page_hide(&window, enhancements);
}
