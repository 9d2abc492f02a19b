/// `rootMargin` that shrinks the observed band to the vertical middle of the
/// viewport, so usually only one section intersects at a time.
pub const SECTION_BAND_ROOT_MARGIN: &str = "-50% 0px -50% 0px";
pub const ACTIVE_CLASS: &str = "active";
pub const SCROLLED_CLASS: &str = "scrolled";

pub struct SectionRegistry<R> {
    entries: Vec<(String, R)>,
}

impl<R> SectionRegistry<R> {
    pub fn new(sections: impl IntoIterator<Item = (Option<String>, R)>) -> Self {
        let entries = sections
            .into_iter()
            .filter_map(|(id, region)| {
                let id = id?.trim().to_string();
                (!id.is_empty()).then_some((id, region))
            })
            .collect();

        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn regions(&self) -> impl Iterator<Item = &R> {
        self.entries.iter().map(|(_, region)| region)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(id, _)| id.as_str())
    }

    pub fn id_for(&self, region: &R) -> Option<&str>
    where
        R: PartialEq,
    {
        self.entries
            .iter()
            .find(|(_, candidate)| candidate == region)
            .map(|(id, _)| id.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntersectionEvent {
    pub section_id: String,
    pub is_intersecting: bool,
}

pub struct ActiveSectionTracker {
    link_targets: Vec<Option<String>>,
    highlighted: Vec<bool>,
    active: Option<String>,
}

impl ActiveSectionTracker {
    pub fn new(hrefs: impl IntoIterator<Item = Option<String>>) -> Self {
        let link_targets: Vec<Option<String>> = hrefs
            .into_iter()
            .map(|href| href.and_then(|value| value.strip_prefix('#').map(ToString::to_string)))
            .collect();
        let highlighted = vec![false; link_targets.len()];

        Self {
            link_targets,
            highlighted,
            active: None,
        }
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn highlighted(&self) -> &[bool] {
        &self.highlighted
    }

    pub fn activate(&mut self, section_id: &str) -> &[bool] {
        for (flag, target) in self.highlighted.iter_mut().zip(&self.link_targets) {
            *flag = target.as_deref() == Some(section_id);
        }
        self.active = Some(section_id.to_string());

        &self.highlighted
    }

    /// Applies a batch of events in delivery order. Returns `true` when any
    /// event was intersecting, i.e. the highlight flags were recomputed.
    pub fn handle(&mut self, events: impl IntoIterator<Item = IntersectionEvent>) -> bool {
        let mut changed = false;

        for event in events {
            if event.is_intersecting {
                self.activate(&event.section_id);
                changed = true;
            }
        }

        changed
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BarStyle {
    pub transform: &'static str,
    pub opacity: &'static str,
}

const BAR_RESET: BarStyle = BarStyle {
    transform: "",
    opacity: "",
};

pub fn hamburger_pose(open: bool) -> [BarStyle; 3] {
    if open {
        [
            BarStyle {
                transform: "rotate(45deg) translate(5px, 5px)",
                opacity: "",
            },
            BarStyle {
                transform: "",
                opacity: "0",
            },
            BarStyle {
                transform: "rotate(-45deg) translate(7px, -6px)",
                opacity: "",
            },
        ]
    } else {
        [BAR_RESET; 3]
    }
}

pub fn navbar_is_scrolled(page_offset: f64, threshold: f64) -> bool {
    page_offset > threshold
}

pub fn anchor_scroll_top(target_offset_top: f64, navbar_height: Option<f64>, fallback_height: f64) -> f64 {
    let navbar_height = navbar_height
        .filter(|height| *height > 0.0)
        .unwrap_or(fallback_height);

    target_offset_top - navbar_height
}

pub fn anchor_selector(href: &str) -> Option<&str> {
    (href.starts_with('#') && href.len() > 1).then_some(href)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> ActiveSectionTracker {
        ActiveSectionTracker::new(
            ["#home", "#about", "#projects", "#contact"]
                .into_iter()
                .map(|href| Some(href.to_string())),
        )
    }

    fn entered(id: &str) -> IntersectionEvent {
        IntersectionEvent {
            section_id: id.to_string(),
            is_intersecting: true,
        }
    }

    fn left(id: &str) -> IntersectionEvent {
        IntersectionEvent {
            section_id: id.to_string(),
            is_intersecting: false,
        }
    }

    #[test]
    fn entering_projects_highlights_only_its_link() {
        let mut tracker = tracker();
        tracker.activate("about");

        assert!(tracker.handle([entered("projects")]));
        assert_eq!(tracker.highlighted(), &[false, false, true, false]);
        assert_eq!(tracker.active(), Some("projects"));
    }

    #[test]
    fn repeated_activation_keeps_one_highlight() {
        let mut tracker = tracker();
        tracker.activate("contact");
        let flags = tracker.activate("contact").to_vec();

        assert_eq!(flags.iter().filter(|flag| **flag).count(), 1);
        assert_eq!(flags, vec![false, false, false, true]);
    }

    #[test]
    fn leaving_events_change_nothing() {
        let mut tracker = tracker();
        tracker.activate("home");

        assert!(!tracker.handle([left("home"), left("about")]));
        assert_eq!(tracker.highlighted(), &[true, false, false, false]);
        assert_eq!(tracker.active(), Some("home"));
    }

    #[test]
    fn last_intersecting_event_in_a_batch_wins() {
        let mut tracker = tracker();

        tracker.handle([entered("about"), left("home"), entered("contact")]);
        assert_eq!(tracker.active(), Some("contact"));
        assert_eq!(tracker.highlighted(), &[false, false, false, true]);
    }

    #[test]
    fn unknown_section_clears_all_highlights() {
        let mut tracker = tracker();
        tracker.activate("home");
        tracker.activate("footer");

        assert!(tracker.highlighted().iter().all(|flag| !flag));
    }

    #[test]
    fn links_without_fragment_never_highlight() {
        let mut tracker = ActiveSectionTracker::new([
            Some("https://example.com/#about".to_string()),
            None,
            Some("#about".to_string()),
        ]);

        assert_eq!(tracker.activate("about"), &[false, false, true]);
    }

    #[test]
    fn registry_skips_sections_without_id() {
        let registry = SectionRegistry::new([
            (Some("hero".to_string()), 1),
            (None, 2),
            (Some("  ".to_string()), 3),
            (Some("about".to_string()), 4),
        ]);

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.ids().collect::<Vec<_>>(), vec!["hero", "about"]);
        assert_eq!(registry.regions().copied().collect::<Vec<_>>(), vec![1, 4]);
        assert_eq!(registry.id_for(&4), Some("about"));
        assert_eq!(registry.id_for(&2), None);
    }

    #[test]
    fn hamburger_closed_pose_resets_every_bar() {
        assert!(hamburger_pose(false)
            .iter()
            .all(|bar| bar.transform.is_empty() && bar.opacity.is_empty()));
        assert_eq!(hamburger_pose(true)[1].opacity, "0");
    }

    #[test]
    fn navbar_scrolled_only_past_threshold() {
        assert!(!navbar_is_scrolled(50.0, 50.0));
        assert!(navbar_is_scrolled(50.5, 50.0));
    }

    #[test]
    fn anchor_scroll_subtracts_navbar_height() {
        assert_eq!(anchor_scroll_top(900.0, Some(80.0), 70.0), 820.0);
        assert_eq!(anchor_scroll_top(900.0, Some(0.0), 70.0), 830.0);
        assert_eq!(anchor_scroll_top(900.0, None, 70.0), 830.0);
    }

    #[test]
    fn bare_hash_has_no_selector() {
        assert_eq!(anchor_selector("#"), None);
        assert_eq!(anchor_selector("#projects"), Some("#projects"));
        assert_eq!(anchor_selector("/resume.pdf"), None);
    }
}
