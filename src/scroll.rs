use crate::position::Screen;

/// One scroll transition at a time. The latch is released when the target
/// screen is observed in the viewport, not after a fixed delay.
#[derive(Debug, Default)]
pub struct Scroller {
    pending: Option<Screen>,
}

impl Scroller {
    /// Returns false when a transition is already in flight.
    pub fn request(&mut self, target: Screen) -> bool {
        if self.pending.is_some() {
            return false;
        }
        self.pending = Some(target);
        true
    }

    pub fn pending(&self) -> Option<Screen> {
        self.pending
    }

    pub fn in_flight(&self) -> bool {
        self.pending.is_some()
    }

    /// Reports the screen now fully visible; resolves a matching transition.
    pub fn observe(&mut self, visible: Screen) -> bool {
        if self.pending == Some(visible) {
            self.pending = None;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_request_is_suppressed_while_pending() {
        let mut scroller = Scroller::default();
        assert!(scroller.request(Screen::Stock));
        assert!(!scroller.request(Screen::Main));
        assert_eq!(scroller.pending(), Some(Screen::Stock));
    }

    #[test]
    fn latch_opens_only_when_target_is_observed() {
        let mut scroller = Scroller::default();
        scroller.request(Screen::Stock);
        assert!(!scroller.observe(Screen::Main));
        assert!(scroller.in_flight());
        assert!(scroller.observe(Screen::Stock));
        assert!(!scroller.in_flight());
        assert!(scroller.request(Screen::Main));
    }
}
