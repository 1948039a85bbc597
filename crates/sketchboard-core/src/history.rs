//! Append-only log of committed actions.
//!
//! The log order is the canonical replay order. Local commits are appended at
//! commit time and remote actions at receipt time; there is no other ordering
//! key, no per-action removal, and no redo.

use crate::actions::Action;

/// Ordered sequence of committed actions.
#[derive(Debug, Clone, Default)]
pub struct ActionLog {
    actions: Vec<Action>,
    /// Bumped on every mutation so renderers can tell when they are stale.
    revision: u64,
}

impl ActionLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a committed action at the end.
    pub fn append(&mut self, action: Action) {
        self.actions.push(action);
        self.touch();
    }

    /// Adopt an authoritative snapshot, discarding everything held locally.
    pub fn replace_all(&mut self, actions: impl IntoIterator<Item = Action>) {
        self.actions.clear();
        self.actions.extend(actions);
        self.touch();
    }

    /// Remove every action.
    pub fn clear(&mut self) {
        self.actions.clear();
        self.touch();
    }

    /// Committed actions in replay order.
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Action> {
        self.actions.iter()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Monotonic change counter.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}

impl<'a> IntoIterator for &'a ActionLog {
    type Item = &'a Action;
    type IntoIter = std::slice::Iter<'a, Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{ImageAction, ShapeAction, ShapeKind, Stroke, StrokeKind, TextAction};
    use kurbo::Point;

    fn rect(x: f64) -> Action {
        Action::Shape(ShapeAction {
            kind: ShapeKind::Rectangle,
            color: "#000000".to_string(),
            size: 2.0,
            start: Point::new(x, x),
            end: Point::new(x + 10.0, x + 10.0),
        })
    }

    fn mixed() -> Vec<Action> {
        vec![
            rect(0.0),
            Action::Stroke(Stroke {
                kind: StrokeKind::Eraser,
                color: "#ffffff".to_string(),
                size: 20.0,
                path: vec![Point::ZERO, Point::new(1.0, 1.0)],
            }),
            Action::Text(TextAction {
                color: "#000000".to_string(),
                font_size: 10.0,
                text: "hello".to_string(),
                position: Point::new(3.0, 4.0),
            }),
            Action::Image(ImageAction {
                source: "data:image/png;base64,AAAA".to_string(),
                position: Point::new(50.0, 50.0),
            }),
            rect(7.0),
        ]
    }

    #[test]
    fn test_append_preserves_order() {
        let mut log = ActionLog::new();
        for action in mixed() {
            log.append(action);
        }
        assert_eq!(log.actions(), mixed().as_slice());
    }

    #[test]
    fn test_append_does_not_dedup() {
        let mut log = ActionLog::new();
        log.append(rect(1.0));
        log.append(rect(1.0));
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_replace_all_leaves_no_residue() {
        let mut log = ActionLog::new();
        log.append(rect(99.0));
        log.replace_all(mixed());
        log.replace_all(vec![rect(1.0), rect(2.0)]);
        assert_eq!(log.actions(), &[rect(1.0), rect(2.0)]);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let mut log = ActionLog::new();
        log.replace_all(mixed());
        log.clear();
        assert!(log.is_empty());
        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn test_revision_tracks_mutations() {
        let mut log = ActionLog::new();
        let r0 = log.revision();
        log.append(rect(0.0));
        let r1 = log.revision();
        assert_ne!(r0, r1);
        log.clear();
        assert_ne!(r1, log.revision());
    }
}
