//! Click versus drag classification
//!
//! A gesture counts as a click until the pointer travels further than the
//! threshold from where it went down.

use pdf_annotation_model::Position;

/// Default travel threshold in page units
pub const DEFAULT_CLICK_THRESHOLD: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickDetector {
    threshold: f32,
    start: Option<Position>,
    moved: bool,
}

impl ClickDetector {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            start: None,
            moved: false,
        }
    }

    /// Record the pointer-down position
    pub fn on_start(&mut self, pos: Position) {
        self.start = Some(pos);
        self.moved = false;
    }

    /// Track pointer travel; once moved, the gesture stays a drag
    pub fn on_move(&mut self, pos: Position) {
        if let Some(start) = self.start {
            if !self.moved && start.distance_to(&pos) > self.threshold {
                self.moved = true;
            }
        }
    }

    /// Finish the gesture
    ///
    /// Returns true when it was a click and click behavior is enabled.
    /// The detector is reset either way.
    pub fn on_end(&mut self, click_enabled: bool) -> bool {
        let clicked = self.start.is_some() && !self.moved && click_enabled;
        self.reset();
        clicked
    }

    pub fn has_moved(&self) -> bool {
        self.moved
    }

    pub fn is_tracking(&self) -> bool {
        self.start.is_some()
    }

    pub fn reset(&mut self) {
        self.start = None;
        self.moved = false;
    }
}

impl Default for ClickDetector {
    fn default() -> Self {
        Self::new(DEFAULT_CLICK_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_jitter_is_a_click() {
        let mut detector = ClickDetector::default();
        detector.on_start(Position::new(100.0, 100.0));
        detector.on_move(Position::new(103.0, 104.0));
        assert!(!detector.has_moved());
        assert!(detector.on_end(true));
    }

    #[test]
    fn test_travel_past_threshold_is_a_drag() {
        let mut detector = ClickDetector::default();
        detector.on_start(Position::new(100.0, 100.0));
        detector.on_move(Position::new(110.0, 100.0));
        // Returning to the start does not turn it back into a click
        detector.on_move(Position::new(100.0, 100.0));
        assert!(detector.has_moved());
        assert!(!detector.on_end(true));
    }

    #[test]
    fn test_click_requires_enabled_behavior() {
        let mut detector = ClickDetector::default();
        detector.on_start(Position::new(0.0, 0.0));
        assert!(!detector.on_end(false));
    }

    #[test]
    fn test_end_resets_state() {
        let mut detector = ClickDetector::new(1.0);
        detector.on_start(Position::new(0.0, 0.0));
        detector.on_move(Position::new(5.0, 0.0));
        detector.on_end(true);
        assert!(!detector.is_tracking());
        assert!(!detector.has_moved());
        // No start recorded
        assert!(!detector.on_end(true));
    }
}
