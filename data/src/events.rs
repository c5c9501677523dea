//! Recognized-text -> game event parsing.
//!
//! Event broadcasts show up on screen as one line per event. Two line shapes
//! cover everything we have seen:
//!
//! ```text
//! Supply Drop - Dread Canyon - 5:32
//! Convoy in Blackstone Quarry (1:05)
//! ```
//!
//! When neither grammar matches anything, any bare clock token in the text
//! still produces a placeholder event, so a garbled capture never silently
//! drops a countdown.

use std::{sync::LazyLock, time::Duration};

use regex::Regex;

/// `name - location - timer`, dash or en-dash separators, reluctant groups.
static GRAMMAR_DASH: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^(?P<name>.+?)\s*[-–]\s*(?P<location>.+?)\s*[-–]\s*(?P<timer>(?i:active)|\d{1,2}:[0-5]\d)\s*$")
		.expect("regex")
});

/// `name (in|at|@) location (timer)`.
static GRAMMAR_PREP: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^(?P<name>.+?)\s+(?i:in|at|@)\s+(?P<location>.+?)\s*\(\s*(?P<timer>(?i:active)|\d{1,2}:[0-5]\d)\s*\)\s*$")
		.expect("regex")
});

/// Standalone clock tokens for the fallback scan.
static TIMER_TOKEN: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"\b\d{1,2}:[0-5]\d\b").expect("regex"));

/// Strict `M:SS` / `MM:SS` clock form.
static CLOCK: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^(\d{1,2}):([0-5]\d)$").expect("regex"));

/// Rough event grouping derived from name keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventCategory {
	Supply,
	Combat,
	Escort,
	Anomaly,
	Other,
}

/// One parsed event line. The timer is kept as its source token
/// (`"ACTIVE"` or `"M:SS"`); derived views parse it on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameEvent {
	pub name: String,
	pub location: String,
	pub timer: String,
}

impl GameEvent {
	pub fn is_active(&self) -> bool {
		self.timer.eq_ignore_ascii_case("active")
	}

	pub fn time_remaining(&self) -> Option<Duration> {
		parse_timer(&self.timer)
	}

	pub fn category(&self) -> EventCategory {
		let name = self.name.to_lowercase();
		let any = |words: &[&str]| words.iter().any(|w| name.contains(w));

		if any(&["supply", "drop", "cache", "stash"]) {
			EventCategory::Supply
		} else if any(&["assault", "raid", "siege", "hunt"]) {
			EventCategory::Combat
		} else if any(&["convoy", "escort", "transport"]) {
			EventCategory::Escort
		} else if any(&["storm", "anomaly", "surge"]) {
			EventCategory::Anomaly
		} else {
			EventCategory::Other
		}
	}
}

/// Parse recognized text into events, one per matching line.
///
/// The event list is rebuilt from scratch on every call; nothing is merged
/// with earlier parses.
pub fn parse(text: &str) -> Vec<GameEvent> {
	let mut events = Vec::new();

	for line in text.lines() {
		let line = line.trim();
		if line.is_empty() {
			continue;
		}

		let captures = GRAMMAR_DASH
			.captures(line)
			.or_else(|| GRAMMAR_PREP.captures(line));

		if let Some(caps) = captures {
			events.push(GameEvent {
				name: clean_fragment(&caps["name"]),
				location: clean_fragment(&caps["location"]),
				timer: caps["timer"].to_uppercase(),
			});
		}
	}

	if events.is_empty() {
		// Structure is unrecoverable; salvage bare countdowns so partial
		// information still reaches the user.
		for token in TIMER_TOKEN.find_iter(text) {
			events.push(GameEvent {
				name: "Unknown Event".to_string(),
				location: "Unknown".to_string(),
				timer: token.as_str().to_string(),
			});
		}
	}

	events
}

/// `"ACTIVE"` -> zero, `M:SS` -> the remaining duration, anything else ->
/// `None` (an unreadable timer is a miss, not an error).
pub fn parse_timer(token: &str) -> Option<Duration> {
	let token = token.trim();
	if token.eq_ignore_ascii_case("active") {
		return Some(Duration::ZERO);
	}

	let caps = CLOCK.captures(token)?;
	let minutes: u64 = caps[1].parse().ok()?;
	let seconds: u64 = caps[2].parse().ok()?;
	Some(Duration::from_secs(minutes * 60 + seconds))
}

/// Collapse whitespace, undo the usual `|` -> `I` OCR confusion, and
/// title-case each word.
fn clean_fragment(s: &str) -> String {
	s.replace('|', "I")
		.split_whitespace()
		.map(title_case_word)
		.collect::<Vec<_>>()
		.join(" ")
}

fn title_case_word(word: &str) -> String {
	let mut chars = word.chars();
	match chars.next() {
		Some(first) => first
			.to_uppercase()
			.chain(chars.flat_map(char::to_lowercase))
			.collect(),
		None => String::new(),
	}
}
