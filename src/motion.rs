use serde::Serialize;

pub const CARD_SELECTOR: &str = ".project-card, .research-card, .achievement-card, .info-card";
pub const TILT_RESET: &str = "perspective(1000px) rotateX(0) rotateY(0) translateY(0)";

const COUNTER_STEPS: f64 = 50.0;
pub const COUNTER_FRAME_MS: u32 = 30;
const REVEAL_TOGGLE_ACTIONS: &str = "play none none reverse";

pub fn tilt_transform(x: f64, y: f64, width: f64, height: f64) -> String {
    let rotate_x = (y - height / 2.0) / 10.0;
    let rotate_y = (width / 2.0 - x) / 10.0;

    format!("perspective(1000px) rotateX({rotate_x}deg) rotateY({rotate_y}deg) translateY(-10px)")
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatCounter {
    pub target: u64,
    pub suffix: String,
}

impl StatCounter {
    /// Every digit contributes to the target, every non-digit to the suffix.
    pub fn parse(text: &str) -> Self {
        let digits: String = text.chars().filter(char::is_ascii_digit).collect();
        let suffix: String = text.chars().filter(|c| !c.is_ascii_digit()).collect();

        Self {
            target: match digits.parse() {
                Ok(target) => target,
                Err(_) if digits.is_empty() => 0,
                Err(_) => u64::MAX,
            },
            suffix,
        }
    }

    /// Labels for successive frames; the last one is always the exact target.
    pub fn frames(&self) -> impl Iterator<Item = String> + '_ {
        let target = self.target as f64;
        let increment = target / COUNTER_STEPS;
        let mut step = 0_u32;
        let mut finished = false;

        std::iter::from_fn(move || {
            if finished {
                return None;
            }

            step += 1;
            let current = increment * f64::from(step);
            if current >= target {
                finished = true;
                Some(format!("{}{}", self.target, self.suffix))
            } else {
                Some(format!("{}{}", current.floor() as u64, self.suffix))
            }
        })
    }
}

pub fn parallax_speed<'a>(classes: impl IntoIterator<Item = &'a str>) -> f64 {
    let classes: Vec<&str> = classes.into_iter().collect();

    [("shape-1", 50.0), ("shape-2", 30.0), ("shape-3", 40.0), ("shape-4", 45.0)]
        .into_iter()
        .find(|(class, _)| classes.contains(class))
        .map(|(_, speed)| speed)
        .unwrap_or(35.0)
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollTriggerVars {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger: Option<&'static str>,
    pub start: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toggle_actions: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scrub: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TweenVars {
    pub scroll_trigger: ScrollTriggerVars,
    pub y: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ease: Option<&'static str>,
}

pub fn card_reveal(index: usize) -> TweenVars {
    TweenVars {
        scroll_trigger: ScrollTriggerVars {
            trigger: None,
            start: "top bottom-=100",
            end: None,
            toggle_actions: Some(REVEAL_TOGGLE_ACTIONS),
            scrub: None,
        },
        y: 60.0,
        opacity: Some(0.0),
        duration: Some(0.8),
        delay: Some(index as f64 * 0.1),
        ease: Some("power3.out"),
    }
}

pub fn title_reveal() -> TweenVars {
    TweenVars {
        scroll_trigger: ScrollTriggerVars {
            trigger: None,
            start: "top bottom-=50",
            end: None,
            toggle_actions: Some(REVEAL_TOGGLE_ACTIONS),
            scrub: None,
        },
        y: 30.0,
        opacity: Some(0.0),
        duration: Some(0.6),
        delay: None,
        ease: Some("power2.out"),
    }
}

pub fn shape_parallax(speed: f64) -> TweenVars {
    TweenVars {
        scroll_trigger: ScrollTriggerVars {
            trigger: Some("body"),
            start: "top top",
            end: Some("bottom top"),
            toggle_actions: None,
            scrub: Some(true),
        },
        y: speed,
        opacity: None,
        duration: None,
        delay: None,
        ease: None,
    }
}
