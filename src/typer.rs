use crate::config::TypingTiming;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Typing,
    PausedAtFull,
    Deleting,
    PausedAtEmpty,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TyperState {
    pub role_index: usize,
    pub char_count: usize,
    pub phase: Phase,
}

impl TyperState {
    fn start() -> Self {
        Self {
            role_index: 0,
            char_count: 0,
            phase: Phase::Typing,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tick<'a> {
    pub text: &'a str,
    pub delay_ms: u32,
}

pub struct RoleTyper {
    roles: Vec<String>,
    timing: TypingTiming,
    state: TyperState,
}

impl RoleTyper {
    pub fn new(roles: Vec<String>, timing: TypingTiming) -> Self {
        Self {
            roles,
            timing,
            state: TyperState::start(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    pub fn state(&self) -> TyperState {
        self.state
    }

    pub fn start_delay_ms(&self) -> u32 {
        self.timing.start_delay_ms
    }

    pub fn visible_text(&self) -> &str {
        self.roles
            .get(self.state.role_index)
            .map(|role| char_prefix(role, self.state.char_count))
            .unwrap_or("")
    }

    /// Advances one step. Returns `None` without touching any state when there
    /// are no roles.
    pub fn tick(&mut self) -> Option<Tick<'_>> {
        let role_len = self.roles.get(self.state.role_index)?.chars().count();

        let delay_ms = match self.state.phase {
            Phase::Typing | Phase::PausedAtEmpty => self.type_step(role_len),
            Phase::Deleting | Phase::PausedAtFull => self.delete_step(),
        };

        Some(Tick {
            text: self.visible_text(),
            delay_ms,
        })
    }

    fn type_step(&mut self, role_len: usize) -> u32 {
        if self.state.char_count < role_len {
            self.state.char_count += 1;
        }

        if self.state.char_count == role_len {
            self.state.phase = Phase::PausedAtFull;
            self.timing.full_pause_ms
        } else {
            self.state.phase = Phase::Typing;
            self.timing.type_ms
        }
    }

    fn delete_step(&mut self) -> u32 {
        self.state.char_count = self.state.char_count.saturating_sub(1);

        if self.state.char_count == 0 {
            self.state.phase = Phase::PausedAtEmpty;
            self.state.role_index = (self.state.role_index + 1) % self.roles.len();
            self.timing.empty_pause_ms
        } else {
            self.state.phase = Phase::Deleting;
            self.timing.delete_ms
        }
    }
}

fn char_prefix(value: &str, chars: usize) -> &str {
    match value.char_indices().nth(chars) {
        Some((byte_index, _)) => &value[..byte_index],
        None => value,
    }
}
