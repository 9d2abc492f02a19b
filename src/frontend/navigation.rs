use std::rc::Rc;

use js_sys::Array;
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use web_sys::{
    window, Document, Element, Event, HtmlElement, IntersectionObserver, IntersectionObserverEntry,
    IntersectionObserverInit, KeyboardEvent, Node, ScrollBehavior, ScrollToOptions,
};

use super::dom::{self, EventListener};
use crate::config::SiteConfig;
use crate::nav::{
    anchor_scroll_top, anchor_selector, hamburger_pose, navbar_is_scrolled, ActiveSectionTracker,
    IntersectionEvent, SectionRegistry, ACTIVE_CLASS, SCROLLED_CLASS, SECTION_BAND_ROOT_MARGIN,
};

const NAV_LINK_SELECTOR: &str = ".nav-link";
const SECTION_SELECTOR: &str = ".section, .hero";
const IN_PAGE_ANCHOR_SELECTOR: &str = "a[href^=\"#\"]";

pub struct Navigation {
    listeners: Vec<EventListener>,
}

impl Navigation {
    pub fn mount(document: &Document, config: &SiteConfig) -> Self {
        let mut listeners = Vec::new();

        listeners.extend(mount_mobile_menu(document));
        listeners.extend(mount_navbar_scroll(document, config.navbar_scroll_threshold));
        listeners.extend(mount_smooth_scroll(document, config.navbar_fallback_height));

        log::debug!("navigation mounted with {} listeners", listeners.len());
        Self { listeners }
    }

    pub fn teardown(&mut self) {
        self.listeners.clear();
    }
}

fn is_menu_open(menu: &Element) -> bool {
    menu.class_list().contains(ACTIVE_CLASS)
}

fn set_menu_open(menu: &Element, toggle: Option<&Element>, open: bool) {
    let _ = menu.class_list().toggle_with_force(ACTIVE_CLASS, open);

    let Some(toggle) = toggle else {
        return;
    };

    let _ = toggle.class_list().toggle_with_force(ACTIVE_CLASS, open);
    for (bar, pose) in dom::children_matching(toggle, "span")
        .iter()
        .zip(hamburger_pose(open))
    {
        dom::set_style(bar, "transform", pose.transform);
        dom::set_style(bar, "opacity", pose.opacity);
    }
}

fn mount_mobile_menu(document: &Document) -> Vec<EventListener> {
    let Some(menu) = document.get_element_by_id("nav-menu") else {
        return Vec::new();
    };
    let toggle = document.get_element_by_id("nav-toggle");
    let mut listeners = Vec::new();

    if let Some(toggle_element) = toggle.clone() {
        let menu = menu.clone();
        let toggle = toggle_element.clone();
        listeners.extend(EventListener::new(&toggle_element, "click", move |_| {
            let open = !is_menu_open(&menu);
            set_menu_open(&menu, Some(&toggle), open);
        }));
    }

    for link in dom::query_all(document, NAV_LINK_SELECTOR) {
        let menu = menu.clone();
        let toggle = toggle.clone();
        listeners.extend(EventListener::new(&link, "click", move |_| {
            set_menu_open(&menu, toggle.as_ref(), false);
        }));
    }

    {
        let menu = menu.clone();
        let toggle = toggle.clone();
        listeners.extend(EventListener::new(document, "keydown", move |event: Event| {
            let escape = event
                .dyn_ref::<KeyboardEvent>()
                .is_some_and(|key| key.key() == "Escape");
            if escape && is_menu_open(&menu) {
                set_menu_open(&menu, toggle.as_ref(), false);
            }
        }));
    }

    listeners.extend(EventListener::new(document, "click", move |event: Event| {
        let target = event.target().and_then(|target| target.dyn_into::<Node>().ok());
        let inside_menu = menu.contains(target.as_ref());
        let on_toggle = toggle
            .as_ref()
            .is_some_and(|toggle| toggle.contains(target.as_ref()));

        if !inside_menu && !on_toggle && is_menu_open(&menu) {
            set_menu_open(&menu, toggle.as_ref(), false);
        }
    }));

    listeners
}

fn mount_navbar_scroll(document: &Document, threshold: f64) -> Option<EventListener> {
    let navbar = document.get_element_by_id("navbar")?;
    let win = window()?;
    let scroll_window = win.clone();

    EventListener::with_passive(&win, "scroll", true, move |_| {
        let offset = scroll_window.page_y_offset().unwrap_or(0.0);
        let _ = navbar
            .class_list()
            .toggle_with_force(SCROLLED_CLASS, navbar_is_scrolled(offset, threshold));
    })
}

fn mount_smooth_scroll(document: &Document, fallback_navbar_height: f64) -> Vec<EventListener> {
    dom::query_all(document, IN_PAGE_ANCHOR_SELECTOR)
        .into_iter()
        .filter_map(|anchor| {
            let document = document.clone();
            let href_source = anchor.clone();
            EventListener::new(&anchor, "click", move |event: Event| {
                event.prevent_default();
                let Some(href) = href_source.get_attribute("href") else {
                    return;
                };
                let Some(selector) = anchor_selector(&href) else {
                    return;
                };
                let Some(target) = dom::query(&document, selector)
                    .and_then(|element| element.dyn_into::<HtmlElement>().ok())
                else {
                    return;
                };

                let navbar_height = document
                    .get_element_by_id("navbar")
                    .and_then(|navbar| navbar.dyn_into::<HtmlElement>().ok())
                    .map(|navbar| f64::from(navbar.offset_height()));
                let top = anchor_scroll_top(
                    f64::from(target.offset_top()),
                    navbar_height,
                    fallback_navbar_height,
                );

                if let Some(win) = window() {
                    let options = ScrollToOptions::new();
                    options.set_top(top);
                    options.set_behavior(ScrollBehavior::Smooth);
                    win.scroll_to_with_scroll_to_options(&options);
                }
            })
        })
        .collect()
}

pub struct SectionObserver {
    observer: IntersectionObserver,
    _callback: Closure<dyn FnMut(Array, IntersectionObserver)>,
}

impl SectionObserver {
    pub fn observe(document: &Document) -> Option<Self> {
        let links = dom::query_all(document, NAV_LINK_SELECTOR);
        let registry = Rc::new(SectionRegistry::new(
            dom::query_all(document, SECTION_SELECTOR)
                .into_iter()
                .map(|section| (section.get_attribute("id"), section)),
        ));

        if links.is_empty() || registry.is_empty() {
            return None;
        }

        let mut tracker =
            ActiveSectionTracker::new(links.iter().map(|link| link.get_attribute("href")));
        let callback_registry = registry.clone();

        let callback = Closure::<dyn FnMut(Array, IntersectionObserver)>::new(
            move |entries: Array, observer: IntersectionObserver| {
                if !links.iter().any(|link| link.is_connected()) {
                    log::debug!("navigation detached, section tracking stopped");
                    observer.disconnect();
                    return;
                }

                let events = entries
                    .iter()
                    .filter_map(|entry| entry.dyn_into::<IntersectionObserverEntry>().ok())
                    .filter_map(|entry| {
                        let section_id = callback_registry.id_for(&entry.target())?.to_string();
                        Some(IntersectionEvent {
                            section_id,
                            is_intersecting: entry.is_intersecting(),
                        })
                    });

                if tracker.handle(events) {
                    for (link, highlighted) in links.iter().zip(tracker.highlighted()) {
                        let _ = link
                            .class_list()
                            .toggle_with_force(ACTIVE_CLASS, *highlighted);
                    }
                }
            },
        );

        let options = IntersectionObserverInit::new();
        options.set_root_margin(SECTION_BAND_ROOT_MARGIN);
        options.set_threshold(&JsValue::from_f64(0.0));

        let observer =
            IntersectionObserver::new_with_options(callback.as_ref().unchecked_ref(), &options)
                .map_err(|error| log::warn!("section observer unavailable: {error:?}"))
                .ok()?;

        for section in registry.regions() {
            observer.observe(section);
        }
        log::debug!(
            "tracking sections: {:?}",
            registry.ids().collect::<Vec<_>>()
        );

        Some(Self {
            observer,
            _callback: callback,
        })
    }

    pub fn disconnect(&self) {
        self.observer.disconnect();
    }
}
