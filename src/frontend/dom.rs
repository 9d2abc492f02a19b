use wasm_bindgen::{closure::Closure, JsCast};
use web_sys::{window, AddEventListenerOptions, Document, Element, Event, EventTarget, HtmlElement};

const FALLBACK_VIEWPORT: (f64, f64) = (1280.0, 720.0);

pub fn query(document: &Document, selector: &str) -> Option<Element> {
    document.query_selector(selector).ok().flatten()
}

pub fn query_all(document: &Document, selector: &str) -> Vec<Element> {
    let Ok(nodes) = document.query_selector_all(selector) else {
        return Vec::new();
    };

    (0..nodes.length())
        .filter_map(|index| nodes.item(index))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .collect()
}

pub fn children_matching(element: &Element, selector: &str) -> Vec<Element> {
    let Ok(nodes) = element.query_selector_all(selector) else {
        return Vec::new();
    };

    (0..nodes.length())
        .filter_map(|index| nodes.item(index))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .collect()
}

/// Setting an empty value removes the inline property.
pub fn set_style(element: &Element, property: &str, value: &str) {
    if let Some(html_element) = element.dyn_ref::<HtmlElement>() {
        let _ = html_element.style().set_property(property, value);
    }
}

pub fn class_names(element: &Element) -> Vec<String> {
    let classes = element.class_list();
    (0..classes.length())
        .filter_map(|index| classes.item(index))
        .collect()
}

pub fn viewport_size() -> (f64, f64) {
    let Some(win) = window() else {
        return FALLBACK_VIEWPORT;
    };

    let width = win
        .inner_width()
        .ok()
        .and_then(|value| value.as_f64())
        .unwrap_or(FALLBACK_VIEWPORT.0);
    let height = win
        .inner_height()
        .ok()
        .and_then(|value| value.as_f64())
        .unwrap_or(FALLBACK_VIEWPORT.1);

    (width, height)
}

pub fn device_pixel_ratio() -> f64 {
    window().map(|win| win.device_pixel_ratio()).unwrap_or(1.0)
}

pub struct EventListener {
    target: EventTarget,
    event: &'static str,
    callback: Closure<dyn FnMut(Event)>,
}

impl EventListener {
    pub fn new(target: &EventTarget, event: &'static str, handler: impl FnMut(Event) + 'static) -> Option<Self> {
        let callback = Closure::<dyn FnMut(Event)>::new(handler);
        target
            .add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())
            .ok()?;

        Some(Self {
            target: target.clone(),
            event,
            callback,
        })
    }

    pub fn with_passive(
        target: &EventTarget,
        event: &'static str,
        passive: bool,
        handler: impl FnMut(Event) + 'static,
    ) -> Option<Self> {
        let callback = Closure::<dyn FnMut(Event)>::new(handler);
        let options = AddEventListenerOptions::new();
        options.set_passive(passive);
        target
            .add_event_listener_with_callback_and_add_event_listener_options(
                event,
                callback.as_ref().unchecked_ref(),
                &options,
            )
            .ok()?;

        Some(Self {
            target: target.clone(),
            event,
            callback,
        })
    }
}

impl Drop for EventListener {
    fn drop(&mut self) {
        let _ = self
            .target
            .remove_event_listener_with_callback(self.event, self.callback.as_ref().unchecked_ref());
    }
}
