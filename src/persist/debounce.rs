use crate::foundation::core::Timestamp;

#[derive(Clone, Debug, PartialEq, Eq)]
/// Save scheduler driven by the host clock.
///
/// Every change pushes the deadline to `now + delay`. Nothing is due before
/// [`SaveDebouncer::mark_hydrated`] has been called.
pub struct SaveDebouncer {
    delay_ms: u64,
    hydrated: bool,
    deadline: Option<Timestamp>,
}

impl SaveDebouncer {
    /// Scheduler with the given delay, not yet hydrated.
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            hydrated: false,
            deadline: None,
        }
    }

    /// Allow saves from now on.
    pub fn mark_hydrated(&mut self) {
        self.hydrated = true;
    }

    /// `true` once the initial load has completed.
    pub fn is_hydrated(&self) -> bool {
        self.hydrated
    }

    /// Record a change at `now`, restarting the timer.
    pub fn touch(&mut self, now: Timestamp) {
        if self.hydrated {
            self.deadline = Some(now.plus_millis(self.delay_ms));
        }
    }

    /// Pending deadline, if any.
    pub fn deadline(&self) -> Option<Timestamp> {
        self.deadline
    }

    /// `true` when a save is pending and its deadline has passed.
    pub fn is_due(&self, now: Timestamp) -> bool {
        self.deadline.is_some_and(|d| now >= d)
    }

    /// Consume the pending save if it is due.
    pub fn take_due(&mut self, now: Timestamp) -> bool {
        if self.is_due(now) {
            self.deadline = None;
            true
        } else {
            false
        }
    }

    /// Drop any pending save.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}
