/// Derives "fetch the next page now" from the viewer's position in the loaded
/// feed. Fires at most once per (index, length) transition so a satisfied
/// predicate cannot storm the backend with duplicate page requests.
#[derive(Debug)]
pub struct PrefetchTrigger {
    threshold: usize,
    last_fired: Option<(usize, usize)>,
}

impl PrefetchTrigger {
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold,
            last_fired: None,
        }
    }

    /// True when the viewer is within `threshold` items of the end of the
    /// loaded data, more pages exist, and no load is already in flight.
    pub fn should_load(
        &mut self,
        current_index: usize,
        total_loaded: usize,
        has_more: bool,
        is_loading: bool,
    ) -> bool {
        if !has_more || is_loading || total_loaded == 0 {
            return false;
        }
        if current_index + self.threshold < total_loaded {
            return false;
        }
        let key = (current_index, total_loaded);
        if self.last_fired == Some(key) {
            return false;
        }
        self.last_fired = Some(key);
        true
    }

    /// Forget the last firing, e.g. after a feed reset.
    pub fn reset(&mut self) {
        self.last_fired = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_exactly_at_threshold_boundary() {
        let mut trigger = PrefetchTrigger::new(5);
        // 20 items loaded: index 14 is one short of the boundary.
        assert!(!trigger.should_load(14, 20, true, false));
        // Index 15 == 20 - 5: fire.
        assert!(trigger.should_load(15, 20, true, false));
    }

    #[test]
    fn test_fires_once_per_transition() {
        let mut trigger = PrefetchTrigger::new(5);
        assert!(trigger.should_load(15, 20, true, false));
        // Same index, same length: suppressed.
        assert!(!trigger.should_load(15, 20, true, false));
        // Index moved: eligible again.
        assert!(trigger.should_load(16, 20, true, false));
        // Data grew: eligible again at the same index.
        assert!(!trigger.should_load(16, 21, true, true)); // still loading
        assert!(trigger.should_load(16, 21, true, false));
    }

    #[test]
    fn test_suppressed_without_more_or_while_loading() {
        let mut trigger = PrefetchTrigger::new(5);
        assert!(!trigger.should_load(19, 20, false, false));
        assert!(!trigger.should_load(19, 20, true, true));
        assert!(!trigger.should_load(0, 0, true, false));
    }

    #[test]
    fn test_reset_allows_refire_for_same_key() {
        let mut trigger = PrefetchTrigger::new(3);
        assert!(trigger.should_load(7, 10, true, false));
        assert!(!trigger.should_load(7, 10, true, false));
        trigger.reset();
        assert!(trigger.should_load(7, 10, true, false));
    }
}
