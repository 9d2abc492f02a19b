use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use gloo_timers::{callback::Timeout, future::TimeoutFuture};
use js_sys::Array;
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use wasm_bindgen_futures::spawn_local;
use web_sys::{
    Document, Element, Event, IntersectionObserver, IntersectionObserverEntry,
    IntersectionObserverInit, MouseEvent, Window,
};

use super::dom::{self, EventListener};
use crate::device::{
    particle_color, viewport_unit, CursorTrail, DeviceProfile, DoubleTapGuard,
    CURSOR_PARTICLE_LIFETIME_MS, CURSOR_TRAIL_CAPACITY, TOUCH_FEEDBACK_RELEASE_MS,
};
use crate::motion::{tilt_transform, StatCounter, CARD_SELECTOR, COUNTER_FRAME_MS, TILT_RESET};

const STAT_SELECTOR: &str = ".stat-number";
const ANIMATED_CLASS: &str = "animated";
const STAT_VISIBILITY_THRESHOLD: f64 = 0.5;
const TOUCH_FEEDBACK_SELECTOR: &str = ".btn, .project-link, .social-link";
const TOUCH_PRESSED_TRANSFORM: &str = "scale(0.98)";
const CURSOR_PARTICLE_CLASS: &str = "cursor-particle";

const CURSOR_STYLES: &str = r#"
    .cursor-particle {
        position: fixed;
        width: 5px;
        height: 5px;
        border-radius: 50%;
        pointer-events: none;
        z-index: 9999;
        animation: particle-fade 1s ease-out forwards;
    }

    @keyframes particle-fade {
        0% {
            transform: translate(0, 0) scale(1);
            opacity: 1;
        }
        100% {
            transform: translate(var(--tx, 0), var(--ty, 20px)) scale(0);
            opacity: 0;
        }
    }
"#;

pub fn inject_cursor_styles(document: &Document) {
    let Some(head) = document.head() else {
        return;
    };

    match document.create_element("style") {
        Ok(style) => {
            style.set_text_content(Some(CURSOR_STYLES));
            let _ = head.append_child(&style);
        }
        Err(error) => log::warn!("cursor styles not injected: {error:?}"),
    }
}

pub struct CardTilt {
    listeners: Vec<EventListener>,
}

impl CardTilt {
    pub fn attach(document: &Document) -> Self {
        let mut listeners = Vec::new();

        for card in dom::query_all(document, CARD_SELECTOR) {
            let moving = card.clone();
            listeners.extend(EventListener::new(&card, "mousemove", move |event: Event| {
                let Some(pointer) = event.dyn_ref::<MouseEvent>() else {
                    return;
                };
                let rect = moving.get_bounding_client_rect();
                let transform = tilt_transform(
                    f64::from(pointer.client_x()) - rect.left(),
                    f64::from(pointer.client_y()) - rect.top(),
                    rect.width(),
                    rect.height(),
                );
                dom::set_style(&moving, "transform", &transform);
            }));

            let leaving = card.clone();
            listeners.extend(EventListener::new(&card, "mouseleave", move |_| {
                dom::set_style(&leaving, "transform", TILT_RESET);
            }));
        }

        Self { listeners }
    }

    pub fn teardown(&mut self) {
        self.listeners.clear();
    }
}

pub struct StatCounters {
    observer: IntersectionObserver,
    cancelled: Rc<Cell<bool>>,
    _callback: Closure<dyn FnMut(Array, IntersectionObserver)>,
}

impl StatCounters {
    pub fn observe(document: &Document) -> Option<Self> {
        let counters = dom::query_all(document, STAT_SELECTOR);
        if counters.is_empty() {
            return None;
        }

        let cancelled = Rc::new(Cell::new(false));
        let stop = cancelled.clone();

        let callback = Closure::<dyn FnMut(Array, IntersectionObserver)>::new(
            move |entries: Array, observer: IntersectionObserver| {
                for entry in entries
                    .iter()
                    .filter_map(|entry| entry.dyn_into::<IntersectionObserverEntry>().ok())
                {
                    let target = entry.target();
                    if !entry.is_intersecting() || target.class_list().contains(ANIMATED_CLASS) {
                        continue;
                    }

                    let label = target.text_content().unwrap_or_default();
                    let frames: Vec<String> = StatCounter::parse(&label).frames().collect();
                    let _ = target.class_list().add_1(ANIMATED_CLASS);
                    observer.unobserve(&target);

                    let stop = stop.clone();
                    spawn_local(async move {
                        for frame in frames {
                            TimeoutFuture::new(COUNTER_FRAME_MS).await;
                            if stop.get() {
                                break;
                            }
                            target.set_text_content(Some(&frame));
                        }
                    });
                }
            },
        );

        let options = IntersectionObserverInit::new();
        options.set_root_margin("0px");
        options.set_threshold(&JsValue::from_f64(STAT_VISIBILITY_THRESHOLD));

        let observer =
            IntersectionObserver::new_with_options(callback.as_ref().unchecked_ref(), &options)
                .map_err(|error| log::warn!("stat counter observer unavailable: {error:?}"))
                .ok()?;
        for counter in &counters {
            observer.observe(counter);
        }

        Some(Self {
            observer,
            cancelled,
            _callback: callback,
        })
    }

    pub fn teardown(&mut self) {
        self.cancelled.set(true);
        self.observer.disconnect();
    }
}

pub struct CursorEffect {
    trail: Rc<RefCell<CursorTrail<Element>>>,
    listener: Option<EventListener>,
}

impl CursorEffect {
    pub fn attach(document: &Document, window: &Window, min_width: f64) -> Self {
        let trail = Rc::new(RefCell::new(CursorTrail::new(CURSOR_TRAIL_CAPACITY)));
        let moving_trail = trail.clone();
        let document_handle = document.clone();
        let width_source = window.clone();

        let listener = EventListener::new(document, "mousemove", move |event: Event| {
            let wide = width_source
                .inner_width()
                .ok()
                .and_then(|width| width.as_f64())
                .is_some_and(|width| width > min_width);
            if !wide {
                return;
            }
            let Some(pointer) = event.dyn_ref::<MouseEvent>() else {
                return;
            };
            let Some(body) = document_handle.body() else {
                return;
            };
            let Ok(particle) = document_handle.create_element("div") else {
                return;
            };

            particle.set_class_name(CURSOR_PARTICLE_CLASS);
            dom::set_style(&particle, "left", &format!("{}px", pointer.client_x()));
            dom::set_style(&particle, "top", &format!("{}px", pointer.client_y()));
            dom::set_style(&particle, "background", &particle_color(js_sys::Math::random()));
            if body.append_child(&particle).is_err() {
                return;
            }

            let (id, evicted) = moving_trail.borrow_mut().push(particle);
            for old in evicted {
                old.remove();
            }

            let expiring_trail = moving_trail.clone();
            Timeout::new(CURSOR_PARTICLE_LIFETIME_MS, move || {
                if let Some(particle) = expiring_trail.borrow_mut().expire(id) {
                    particle.remove();
                }
            })
            .forget();
        });

        Self { trail, listener }
    }

    pub fn teardown(&mut self) {
        self.listener = None;
        for particle in self.trail.borrow_mut().drain() {
            particle.remove();
        }
    }
}

pub struct DeviceShims {
    listeners: Vec<EventListener>,
}

impl DeviceShims {
    pub fn install(document: &Document, window: &Window, profile: DeviceProfile) -> Self {
        let mut listeners = Vec::new();

        update_viewport_unit(document, window);
        for event in ["resize", "orientationchange"] {
            let document = document.clone();
            let source = window.clone();
            listeners.extend(EventListener::new(window, event, move |_| {
                update_viewport_unit(&document, &source);
            }));
        }

        let mut guard = DoubleTapGuard::default();
        listeners.extend(EventListener::with_passive(document, "touchend", false, move |event: Event| {
            if guard.should_block(js_sys::Date::now()) {
                event.prevent_default();
            }
        }));

        if profile.mobile {
            if let Some(root) = document.document_element() {
                dom::set_style(&root, "scroll-behavior", "smooth");
            }
        }

        if profile.touch {
            for control in dom::query_all(document, TOUCH_FEEDBACK_SELECTOR) {
                let pressed = control.clone();
                listeners.extend(EventListener::with_passive(&control, "touchstart", true, move |_| {
                    dom::set_style(&pressed, "transform", TOUCH_PRESSED_TRANSFORM);
                }));

                let released = control.clone();
                listeners.extend(EventListener::with_passive(&control, "touchend", true, move |_| {
                    let released = released.clone();
                    Timeout::new(TOUCH_FEEDBACK_RELEASE_MS, move || {
                        dom::set_style(&released, "transform", "");
                    })
                    .forget();
                }));
            }
        }

        Self { listeners }
    }

    pub fn teardown(&mut self) {
        self.listeners.clear();
    }
}

fn update_viewport_unit(document: &Document, window: &Window) {
    let Some(height) = window.inner_height().ok().and_then(|height| height.as_f64()) else {
        return;
    };
    if let Some(root) = document.document_element() {
        dom::set_style(&root, "--vh", &viewport_unit(height));
    }
}
