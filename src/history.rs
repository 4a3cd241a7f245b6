use std::collections::VecDeque;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::words::WordId;

pub const HISTORY_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct ReplacementHistoryEntry {
    pub id: WordId,
    pub old_text: String,
    pub new_text: String,
    pub timestamp: OffsetDateTime,
}

impl ReplacementHistoryEntry {
    pub fn timestamp_rfc3339(&self) -> String {
        self.timestamp
            .format(&Rfc3339)
            .unwrap_or_else(|_| "unknown".to_string())
    }
}

/// Most recent replacement first, at most [`HISTORY_LIMIT`] entries.
#[derive(Debug, Default)]
pub struct ReplacementHistory {
    entries: VecDeque<ReplacementHistoryEntry>,
}

impl ReplacementHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, id: WordId, old_text: &str, new_text: &str) {
        self.entries.push_front(ReplacementHistoryEntry {
            id,
            old_text: old_text.to_string(),
            new_text: new_text.to_string(),
            timestamp: OffsetDateTime::now_utc(),
        });
        self.entries.truncate(HISTORY_LIMIT);
    }

    pub fn entries(&self) -> impl Iterator<Item = &ReplacementHistoryEntry> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&ReplacementHistoryEntry> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_five_most_recent_first() {
        let mut history = ReplacementHistory::new();
        for idx in 0..8u32 {
            history.push(idx, &format!("old{}", idx), &format!("new{}", idx));
        }
        assert_eq!(history.len(), HISTORY_LIMIT);
        let ids = history.entries().map(|entry| entry.id).collect::<Vec<_>>();
        assert_eq!(ids, vec![7, 6, 5, 4, 3]);
        assert_eq!(history.latest().map(|e| e.new_text.as_str()), Some("new7"));
    }

    #[test]
    fn timestamps_do_not_go_backwards() {
        let mut history = ReplacementHistory::new();
        history.push(0, "a", "b");
        history.push(1, "c", "d");
        let stamps = history.entries().map(|e| e.timestamp).collect::<Vec<_>>();
        assert!(stamps[0] >= stamps[1]);
        assert!(history.latest().expect("entry").timestamp_rfc3339().contains('T'));
    }

    #[test]
    fn clear_empties() {
        let mut history = ReplacementHistory::new();
        history.push(0, "a", "b");
        history.clear();
        assert!(history.is_empty());
    }
}
