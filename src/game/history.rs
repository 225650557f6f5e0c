use chrono::{DateTime, Local};
use std::collections::VecDeque;
use std::fmt;

pub const HISTORY_LIMIT: usize = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    New,
    Move,
    Save,
    Load,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            EventKind::New => "new",
            EventKind::Move => "move",
            EventKind::Save => "save",
            EventKind::Load => "load",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone)]
pub struct Event {
    /// Seat name for moves, "system" otherwise.
    pub actor: String,
    pub kind: EventKind,
    pub game: u32,
    /// Log length after the event.
    pub move_number: usize,
    /// Played column (1-based) for moves, the source or target for save/load.
    pub detail: String,
    pub when: DateTime<Local>,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} #{} {} {} by {} ({})",
            self.when.format("%H:%M:%S"),
            self.game,
            self.kind,
            self.detail,
            self.actor,
            self.move_number
        )
    }
}

/// Bounded event history, newest first.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    entries: VecDeque<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        actor: impl Into<String>,
        kind: EventKind,
        game: u32,
        move_number: usize,
        detail: impl Into<String>,
    ) {
        self.entries.push_front(Event {
            actor: actor.into(),
            kind,
            game,
            move_number,
            detail: detail.into(),
            when: Local::now(),
        });
        self.entries.truncate(HISTORY_LIMIT);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&Event> {
        self.entries.front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newest_first_and_bounded() {
        let mut log = EventLog::new();
        for i in 0..(HISTORY_LIMIT + 5) {
            log.record("Player A", EventKind::Move, 1, i + 1, (i % 7 + 1).to_string());
        }
        assert_eq!(log.len(), HISTORY_LIMIT);
        assert_eq!(log.latest().unwrap().move_number, HISTORY_LIMIT + 5);
        assert_eq!(log.iter().last().unwrap().move_number, 6);
    }

    #[test]
    fn display_mentions_kind_and_actor() {
        let mut log = EventLog::new();
        log.record("system", EventKind::Save, 2, 0, "file");
        let line = log.latest().unwrap().to_string();
        assert!(line.contains("save file by system"), "{line}");
    }
}
