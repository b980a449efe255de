use std::collections::HashMap;

use crate::foundation::core::Timestamp;
use crate::foundation::ids::BlockId;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
/// Handle for one submitted job. Completions carry it back so stale results can be detected.
pub struct JobTicket {
    /// Monotonic job number.
    pub seq: u64,
    /// Block that started the job.
    pub block: BlockId,
    /// Submission time.
    pub started_at: Timestamp,
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// Per-block job state.
pub enum JobState {
    /// Nothing running for the block.
    Idle,
    /// A job is running.
    InFlight {
        /// Ticket of the running job.
        ticket: JobTicket,
        /// Last retry attempt reported by the service, `0` before the first retry.
        attempt: u32,
    },
}

#[derive(Debug, Default)]
/// Tracks in-flight generation jobs per block so one block's job never blocks another.
pub struct GenerationTracker {
    jobs: HashMap<BlockId, (JobTicket, u32)>,
    next_seq: u64,
}

impl GenerationTracker {
    /// Empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a job for `block`. Returns `None` while that block already has one in flight.
    pub fn begin(&mut self, block: &BlockId, now: Timestamp) -> Option<JobTicket> {
        if self.jobs.contains_key(block) {
            return None;
        }
        self.next_seq += 1;
        let ticket = JobTicket {
            seq: self.next_seq,
            block: block.clone(),
            started_at: now,
        };
        self.jobs.insert(block.clone(), (ticket.clone(), 0));
        Some(ticket)
    }

    /// Record a retry attempt reported by the service.
    pub fn note_retry(&mut self, ticket: &JobTicket, attempt: u32) -> bool {
        match self.jobs.get_mut(&ticket.block) {
            Some((t, a)) if t == ticket => {
                *a = attempt;
                true
            }
            _ => false,
        }
    }

    /// Finish `ticket`, returning the block to `Idle`.
    ///
    /// Returns `false` when the ticket is not the current job of its block (already finished,
    /// or the tracker was cleared in between).
    pub fn finish(&mut self, ticket: &JobTicket) -> bool {
        match self.jobs.get(&ticket.block) {
            Some((t, _)) if t == ticket => {
                self.jobs.remove(&ticket.block);
                true
            }
            _ => false,
        }
    }

    /// Current state for `block`.
    pub fn state(&self, block: &BlockId) -> JobState {
        match self.jobs.get(block) {
            Some((ticket, attempt)) => JobState::InFlight {
                ticket: ticket.clone(),
                attempt: *attempt,
            },
            None => JobState::Idle,
        }
    }

    /// `true` while `block` has a job running.
    pub fn is_in_flight(&self, block: &BlockId) -> bool {
        self.jobs.contains_key(block)
    }

    /// Number of running jobs.
    pub fn in_flight_count(&self) -> usize {
        self.jobs.len()
    }

    /// Forget every running job.
    pub fn clear(&mut self) {
        self.jobs.clear();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/generation/tracker.rs"]
mod tests;
