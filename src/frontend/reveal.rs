use js_sys::{Function, Object, Reflect};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element};

use super::dom;
use crate::motion::{card_reveal, parallax_speed, shape_parallax, title_reveal, TweenVars, CARD_SELECTOR};

const TITLE_SELECTOR: &str = ".section-title";
const SHAPE_SELECTOR: &str = ".shape";

fn method(target: &JsValue, name: &str) -> Option<Function> {
    Reflect::get(target, &JsValue::from_str(name))
        .ok()
        .and_then(|value| value.dyn_into::<Function>().ok())
}

fn is_present(value: &JsValue) -> bool {
    !value.is_undefined() && !value.is_null()
}

#[derive(Clone, Debug)]
pub struct Timeline {
    gsap: JsValue,
}

impl Timeline {
    pub fn detect(global: &Object) -> Option<Self> {
        let gsap = Reflect::get(global, &JsValue::from_str("gsap")).ok()?;
        let scroll_trigger = Reflect::get(global, &JsValue::from_str("ScrollTrigger")).ok()?;
        if !is_present(&gsap) || !is_present(&scroll_trigger) {
            return None;
        }

        let register = method(&gsap, "registerPlugin")?;
        if let Err(error) = register.call1(&gsap, &scroll_trigger) {
            log::warn!("ScrollTrigger registration failed: {error:?}");
            return None;
        }

        Some(Self { gsap })
    }

    fn tween(&self, kind: &str, target: &Element, vars: &TweenVars, trigger: Option<&Element>) -> Option<JsValue> {
        let vars_value = serde_wasm_bindgen::to_value(vars)
            .map_err(|error| log::warn!("tween options not serializable: {error}"))
            .ok()?;

        if let Some(trigger) = trigger {
            let scroll_trigger = Reflect::get(&vars_value, &JsValue::from_str("scrollTrigger")).ok()?;
            Reflect::set(&scroll_trigger, &JsValue::from_str("trigger"), trigger).ok()?;
        }

        method(&self.gsap, kind)?
            .call2(&self.gsap, target, &vars_value)
            .map_err(|error| log::warn!("gsap.{kind} failed: {error:?}"))
            .ok()
    }

    fn from(&self, target: &Element, vars: &TweenVars) -> Option<JsValue> {
        self.tween("from", target, vars, Some(target))
    }

    fn to(&self, target: &Element, vars: &TweenVars) -> Option<JsValue> {
        self.tween("to", target, vars, None)
    }
}

pub struct ScrollReveal {
    tweens: Vec<JsValue>,
}

impl ScrollReveal {
    pub fn animate(document: &Document, timeline: &Timeline) -> Self {
        let mut tweens = Vec::new();

        for (index, card) in dom::query_all(document, CARD_SELECTOR).iter().enumerate() {
            tweens.extend(timeline.from(card, &card_reveal(index)));
        }

        for title in dom::query_all(document, TITLE_SELECTOR) {
            tweens.extend(timeline.from(&title, &title_reveal()));
        }

        for shape in dom::query_all(document, SHAPE_SELECTOR) {
            let classes = dom::class_names(&shape);
            let speed = parallax_speed(classes.iter().map(String::as_str));
            tweens.extend(timeline.to(&shape, &shape_parallax(speed)));
        }

        log::debug!("scroll reveal created {} tweens", tweens.len());
        Self { tweens }
    }

    pub fn teardown(&mut self) {
        for tween in self.tweens.drain(..) {
            if let Some(kill) = method(&tween, "kill") {
                let _ = kill.call0(&tween);
            }
        }
    }
}
