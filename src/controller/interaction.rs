use glam::Vec3;
use tracing::debug;

use crate::model::Interactable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProximityState {
    InRange,
    #[default]
    OutOfRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProximityTransition {
    Entered,
    Exited,
}

/// Tracks whether the character is close enough to interact
#[derive(Debug, Clone)]
pub struct InteractionDetector {
    pub range: f32,
    state: ProximityState,
    target: Option<Interactable>,
    last_transition: Option<ProximityTransition>,
}

impl InteractionDetector {
    pub fn new(range: f32) -> Self {
        Self {
            range,
            state: ProximityState::OutOfRange,
            target: None,
            last_transition: None,
        }
    }

    pub fn state(&self) -> ProximityState {
        self.state
    }

    /// The object currently available for interaction
    pub fn target(&self) -> Option<&Interactable> {
        self.target.as_ref()
    }

    pub fn prompt_visible(&self) -> bool {
        self.state == ProximityState::InRange
    }

    /// Transition produced by the most recent [`InteractionDetector::update`]
    pub fn last_transition(&self) -> Option<ProximityTransition> {
        self.last_transition
    }

    /// Classify the character against the interactable. An absent
    /// interactable leaves the state untouched.
    pub fn update(&mut self, character: Vec3, interactable: Option<&Interactable>) -> ProximityState {
        self.last_transition = None;
        let Some(object) = interactable else {
            return self.state;
        };

        let distance = object.distance_to(character);
        let next = if distance < self.range {
            ProximityState::InRange
        } else {
            ProximityState::OutOfRange
        };

        self.target = match next {
            ProximityState::InRange => Some(*object),
            ProximityState::OutOfRange => None,
        };

        if next != self.state {
            let transition = match next {
                ProximityState::InRange => ProximityTransition::Entered,
                ProximityState::OutOfRange => ProximityTransition::Exited,
            };
            debug!(?transition, distance, "proximity changed");
            self.last_transition = Some(transition);
            self.state = next;
        }

        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object() -> Interactable {
        Interactable::new(Vec3::new(0.0, 1.0, 5.0), 0.5)
    }

    #[test]
    fn test_range_is_strict() {
        let mut d = InteractionDetector::new(2.0);
        let o = object();
        assert_eq!(d.update(Vec3::new(0.0, 1.0, 7.0), Some(&o)), ProximityState::OutOfRange);
        assert_eq!(d.update(Vec3::new(0.0, 1.0, 6.999), Some(&o)), ProximityState::InRange);
        assert!(d.prompt_visible());
        assert_eq!(d.target(), Some(&o));
    }

    #[test]
    fn test_enter_and_exit_transitions() {
        let mut d = InteractionDetector::new(2.0);
        let o = object();

        d.update(Vec3::new(0.0, 1.0, 6.0), Some(&o));
        assert_eq!(d.last_transition(), Some(ProximityTransition::Entered));

        d.update(Vec3::new(0.0, 1.0, 5.5), Some(&o));
        assert_eq!(d.last_transition(), None);

        d.update(Vec3::new(0.0, 1.0, 10.0), Some(&o));
        assert_eq!(d.last_transition(), Some(ProximityTransition::Exited));
        assert!(d.target().is_none());
        assert!(!d.prompt_visible());
    }

    #[test]
    fn test_missing_interactable_is_noop() {
        let mut d = InteractionDetector::new(2.0);
        assert_eq!(d.update(Vec3::ZERO, None), ProximityState::OutOfRange);
        assert_eq!(d.last_transition(), None);
    }
}
