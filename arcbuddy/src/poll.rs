//! Poll scheduling.
//!
//! Each periodic trigger owns a `Cadence`. The main loop asks every cadence
//! whether it is due and runs the work inline, which makes overlapping runs
//! of the same trigger impossible and keeps the whole schedule testable by
//! feeding in explicit instants.

use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct Cadence {
	interval: Duration,
	next: Instant,
}

impl Cadence {
	/// A new cadence is immediately due, so the first loop turn runs it.
	pub fn new(interval: Duration, now: Instant) -> Self {
		Self { interval, next: now }
	}

	/// True when the trigger should fire; firing schedules the next run.
	pub fn due(&mut self, now: Instant) -> bool {
		if now >= self.next {
			self.next = now + self.interval;
			return true;
		}
		false
	}

	/// Request an immediate on-demand run at the next loop turn.
	pub fn poke(&mut self, now: Instant) {
		self.next = now;
	}

	pub fn next_due(&self) -> Instant {
		self.next
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn fires_immediately_then_on_interval() {
		let t0 = Instant::now();
		let mut cadence = Cadence::new(Duration::from_secs(2), t0);

		assert!(cadence.due(t0));
		assert!(!cadence.due(t0 + Duration::from_millis(100)));
		assert!(!cadence.due(t0 + Duration::from_millis(1999)));
		assert!(cadence.due(t0 + Duration::from_secs(2)));
		// Schedules relative to the actual fire time.
		assert!(!cadence.due(t0 + Duration::from_secs(3)));
		assert!(cadence.due(t0 + Duration::from_secs(4)));
	}

	#[test]
	fn poke_forces_the_next_turn() {
		let t0 = Instant::now();
		let mut cadence = Cadence::new(Duration::from_secs(60), t0);
		assert!(cadence.due(t0));

		let later = t0 + Duration::from_secs(5);
		assert!(!cadence.due(later));
		cadence.poke(later);
		assert!(cadence.due(later));
		assert!(!cadence.due(later + Duration::from_secs(30)));
	}

	#[test]
	fn missed_turns_do_not_queue_extra_fires() {
		let t0 = Instant::now();
		let mut cadence = Cadence::new(Duration::from_secs(1), t0);
		assert!(cadence.due(t0));

		// The loop stalled for several intervals; exactly one fire results.
		let late = t0 + Duration::from_secs(10);
		assert!(cadence.due(late));
		assert!(!cadence.due(late));
	}
}
