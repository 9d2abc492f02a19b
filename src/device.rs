use std::collections::VecDeque;

const MOBILE_AGENT_MARKERS: [&str; 8] = [
    "android",
    "webos",
    "iphone",
    "ipad",
    "ipod",
    "blackberry",
    "iemobile",
    "opera mini",
];
const DOUBLE_TAP_WINDOW_MS: f64 = 300.0;
pub const CURSOR_TRAIL_CAPACITY: usize = 5;
pub const CURSOR_PARTICLE_LIFETIME_MS: u32 = 1_000;
pub const TOUCH_FEEDBACK_RELEASE_MS: u32 = 100;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeviceProfile {
    pub mobile: bool,
    pub touch: bool,
}

impl DeviceProfile {
    pub fn detect(user_agent: &str, has_touch_events: bool, max_touch_points: i32) -> Self {
        Self {
            mobile: is_mobile_user_agent(user_agent),
            touch: has_touch_events || max_touch_points > 0,
        }
    }

    pub fn allows_tilt(self) -> bool {
        !self.mobile && !self.touch
    }
}

pub fn is_mobile_user_agent(user_agent: &str) -> bool {
    let user_agent = user_agent.to_ascii_lowercase();
    MOBILE_AGENT_MARKERS
        .iter()
        .any(|marker| user_agent.contains(marker))
}

pub fn viewport_unit(inner_height: f64) -> String {
    format!("{}px", inner_height * 0.01)
}

#[derive(Debug, Default)]
pub struct DoubleTapGuard {
    last_touch_end: Option<f64>,
}

impl DoubleTapGuard {
    pub fn should_block(&mut self, now_ms: f64) -> bool {
        let block = self
            .last_touch_end
            .is_some_and(|last| now_ms - last <= DOUBLE_TAP_WINDOW_MS);
        self.last_touch_end = Some(now_ms);
        block
    }
}

pub struct CursorTrail<T> {
    next_id: u64,
    live: VecDeque<(u64, T)>,
    capacity: usize,
}

impl<T> CursorTrail<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            next_id: 0,
            live: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn push(&mut self, particle: T) -> (u64, Vec<T>) {
        let id = self.next_id;
        self.next_id += 1;
        self.live.push_back((id, particle));

        let mut evicted = Vec::new();
        while self.live.len() > self.capacity {
            if let Some((_, oldest)) = self.live.pop_front() {
                evicted.push(oldest);
            }
        }

        (id, evicted)
    }

    /// Removes a particle whose lifetime ended; `None` if it was already
    /// evicted.
    pub fn expire(&mut self, id: u64) -> Option<T> {
        let position = self.live.iter().position(|(live_id, _)| *live_id == id)?;
        self.live.remove(position).map(|(_, particle)| particle)
    }

    pub fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
        self.live.drain(..).map(|(_, particle)| particle)
    }
}

pub fn particle_color(sample: f64) -> String {
    let hue = sample.clamp(0.0, 1.0) * 60.0 + 180.0;
    format!("hsl({hue}, 100%, 60%)")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_mobile_agents_case_insensitively() {
        assert!(is_mobile_user_agent(
            "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X)"
        ));
        assert!(is_mobile_user_agent("Opera/9.80 (J2ME/MIDP; Opera Mini/9.80)"));
        assert!(!is_mobile_user_agent(
            "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 Chrome/126.0"
        ));
    }

    #[test]
    fn touch_points_mark_touch_devices() {
        let profile = DeviceProfile::detect("Mozilla/5.0 (Windows NT 10.0)", false, 5);
        assert!(profile.touch);
        assert!(!profile.mobile);
        assert!(!profile.allows_tilt());
        assert!(DeviceProfile::detect("Mozilla/5.0 (Windows NT 10.0)", false, 0).allows_tilt());
    }

    #[test]
    fn viewport_unit_is_one_percent_of_height() {
        assert_eq!(viewport_unit(800.0), "8px");
    }

    #[test]
    fn double_tap_within_window_is_blocked() {
        let mut guard = DoubleTapGuard::default();
        assert!(!guard.should_block(1_000.0));
        assert!(guard.should_block(1_250.0));
        assert!(guard.should_block(1_550.0));
        assert!(!guard.should_block(2_000.0));
    }

    #[test]
    fn trail_evicts_oldest_beyond_capacity() {
        let mut trail = CursorTrail::new(CURSOR_TRAIL_CAPACITY);
        for particle in 0..CURSOR_TRAIL_CAPACITY {
            let (_, evicted) = trail.push(particle);
            assert!(evicted.is_empty());
        }

        let (_, evicted) = trail.push(99);
        assert_eq!(evicted, vec![0]);
        assert_eq!(trail.len(), CURSOR_TRAIL_CAPACITY);
    }

    #[test]
    fn expiring_an_evicted_particle_is_a_no_op() {
        let mut trail = CursorTrail::new(1);
        let (first, _) = trail.push("a");
        let (second, evicted) = trail.push("b");

        assert_eq!(evicted, vec!["a"]);
        assert_eq!(trail.expire(first), None);
        assert_eq!(trail.expire(second), Some("b"));
        assert_eq!(trail.len(), 0);
    }

    #[test]
    fn particle_hue_stays_in_blue_cyan_range() {
        assert_eq!(particle_color(0.0), "hsl(180, 100%, 60%)");
        assert_eq!(particle_color(0.5), "hsl(210, 100%, 60%)");
    }
}
