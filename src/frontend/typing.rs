use std::{cell::Cell, rc::Rc};

use gloo_timers::future::TimeoutFuture;
use wasm_bindgen_futures::spawn_local;
use web_sys::Element;

use crate::typer::RoleTyper;

pub struct TypingTask {
    cancelled: Rc<Cell<bool>>,
}

impl TypingTask {
    pub fn start(target: Element, mut typer: RoleTyper) -> Option<Self> {
        if typer.is_empty() {
            log::debug!("no roles configured, typing effect disabled");
            return None;
        }

        let cancelled = Rc::new(Cell::new(false));
        let stop = cancelled.clone();

        spawn_local(async move {
            TimeoutFuture::new(typer.start_delay_ms()).await;

            while !stop.get() && target.is_connected() {
                let delay_ms = match typer.tick() {
                    Some(tick) => {
                        target.set_text_content(Some(tick.text));
                        tick.delay_ms
                    }
                    None => break,
                };

                TimeoutFuture::new(delay_ms).await;
            }

            log::debug!("typing effect stopped");
        });

        Some(Self { cancelled })
    }

    pub fn dispose(&self) {
        self.cancelled.set(true);
    }
}
