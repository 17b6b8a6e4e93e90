//! Timeline store: the ordered, in-memory log of entries rendered for a room.
//!
//! Entries are ordered by arrival at the client, not by server timestamp;
//! the store is a log, not a sorted index. [`Timeline::replace_all`] is the
//! only operation permitted to reorder, swapping the whole log for a
//! server-ordered history projection ([`project_history`]).

use spotline_proto::{HistoryRecord, MessageId, RecordKind};

/// Presence or status notice; not individually addressable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemEntry {
    /// Notice text as rendered.
    pub message: String,

    /// Server-side creation time, when the entry came from history.
    pub created_date: Option<String>,
}

/// One rendered chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEntry {
    /// Server-assigned id; absent while the entry exists only as an
    /// unreconciled live push.
    pub id: Option<MessageId>,

    /// Author display name.
    pub writer_name: String,

    /// Message content.
    pub message: String,

    /// Server-side creation time, when known.
    pub created_date: Option<String>,

    /// Display flag set by a confirmed edit; not a version counter.
    pub edited: bool,
}

/// Discriminated timeline entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimelineEntry {
    /// Presence/leave notice.
    System(SystemEntry),
    /// Chat message.
    Chat(ChatEntry),
}

impl TimelineEntry {
    /// Server id, for addressable chat entries only.
    pub fn id(&self) -> Option<MessageId> {
        match self {
            Self::Chat(chat) => chat.id,
            Self::System(_) => None,
        }
    }
}

/// Append-ordered entry log for one room session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timeline {
    entries: Vec<TimelineEntry>,
}

impl Timeline {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one entry in arrival order.
    pub fn push(&mut self, entry: TimelineEntry) {
        self.entries.push(entry);
    }

    /// Replaces the whole log with a server-ordered projection.
    ///
    /// The only reordering operation: a reconciler pass is a full replace,
    /// not a merge.
    pub fn replace_all(&mut self, entries: Vec<TimelineEntry>) {
        self.entries = entries;
    }

    /// Applies a confirmed edit in place: new content, `edited` flag set.
    ///
    /// Returns `false` (store untouched) when no chat entry carries the id.
    pub fn edit(&mut self, id: MessageId, message: &str) -> bool {
        for entry in &mut self.entries {
            if let TimelineEntry::Chat(chat) = entry
                && chat.id == Some(id)
            {
                chat.message = message.to_string();
                chat.edited = true;
                return true;
            }
        }
        false
    }

    /// Removes a confirmed delete's entry by id.
    ///
    /// Returns `false` (store untouched) when no chat entry carries the id.
    pub fn remove(&mut self, id: MessageId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id() != Some(id));
        self.entries.len() != before
    }

    /// Entries in display order.
    pub fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }

    /// Entry count.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Maps a fetched history list into timeline entries.
///
/// One projection serves both the initial seed and every reconciler pass.
/// If the user's most recent own record is a LEAVE record the projection is
/// empty: re-entering after leaving does not replay pre-leave history.
/// Otherwise TALK records become chat entries and ENTER/LEAVE records become
/// system entries, preserving server order.
pub fn project_history(records: &[HistoryRecord], own_name: &str) -> Vec<TimelineEntry> {
    let last_own = records.iter().rev().find(|record| record.writer_name == own_name);
    if last_own.is_some_and(|record| record.user_type == RecordKind::Leave) {
        return Vec::new();
    }

    records
        .iter()
        .map(|record| match record.user_type {
            RecordKind::Talk => TimelineEntry::Chat(ChatEntry {
                id: record.id,
                writer_name: record.writer_name.clone(),
                message: record.message.clone(),
                created_date: record.created_date.clone(),
                edited: false,
            }),
            RecordKind::Enter | RecordKind::Leave => TimelineEntry::System(SystemEntry {
                message: record.message.clone(),
                created_date: record.created_date.clone(),
            }),
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn chat(id: Option<MessageId>, writer: &str, message: &str) -> TimelineEntry {
        TimelineEntry::Chat(ChatEntry {
            id,
            writer_name: writer.into(),
            message: message.into(),
            created_date: None,
            edited: false,
        })
    }

    fn record(id: MessageId, writer: &str, message: &str, kind: RecordKind) -> HistoryRecord {
        HistoryRecord {
            id: Some(id),
            writer_name: writer.into(),
            message: message.into(),
            user_type: kind,
            created_date: None,
        }
    }

    #[test]
    fn push_preserves_arrival_order() {
        let mut timeline = Timeline::new();
        timeline.push(chat(Some(2), "coach", "second"));
        timeline.push(chat(Some(1), "coach", "first"));

        // Arrival order, not id order: the store is a log.
        let ids: Vec<_> = timeline.entries().iter().map(TimelineEntry::id).collect();
        assert_eq!(ids, vec![Some(2), Some(1)]);
    }

    #[test]
    fn replace_all_swaps_the_whole_log() {
        let mut timeline = Timeline::new();
        timeline.push(chat(None, "kim", "unconfirmed"));
        timeline.replace_all(vec![chat(Some(5), "kim", "test")]);

        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline.entries()[0].id(), Some(5));
    }

    #[test]
    fn edit_sets_flag_and_content() {
        let mut timeline = Timeline::new();
        timeline.push(chat(Some(3), "kim", "original"));

        assert!(timeline.edit(3, "corrected"));
        let TimelineEntry::Chat(chat) = &timeline.entries()[0] else {
            unreachable!("chat entry");
        };
        assert_eq!(chat.message, "corrected");
        assert!(chat.edited);
    }

    #[test]
    fn edit_misses_leave_store_untouched() {
        let mut timeline = Timeline::new();
        timeline.push(chat(Some(3), "kim", "original"));
        let before = timeline.clone();

        assert!(!timeline.edit(99, "corrected"));
        assert_eq!(timeline, before);
    }

    #[test]
    fn remove_deletes_only_the_addressed_entry() {
        let mut timeline = Timeline::new();
        timeline.push(chat(Some(1), "kim", "keep"));
        timeline.push(chat(Some(2), "kim", "drop"));
        timeline.push(chat(None, "kim", "unconfirmed"));

        assert!(timeline.remove(2));
        assert!(!timeline.remove(2));
        assert_eq!(timeline.len(), 2);
    }

    #[test]
    fn projection_maps_talk_and_presence_records() {
        let records = vec![
            record(1, "kim", "kim entered the room", RecordKind::Enter),
            record(2, "kim", "hi", RecordKind::Talk),
        ];
        let entries = project_history(&records, "coach");

        assert_eq!(entries.len(), 2);
        assert!(matches!(&entries[0], TimelineEntry::System(s) if s.message.contains("entered")));
        assert!(matches!(&entries[1], TimelineEntry::Chat(c) if c.id == Some(2)));
    }

    #[test]
    fn projection_empties_after_own_leave() {
        let records = vec![
            record(1, "kim", "hi", RecordKind::Talk),
            record(2, "kim", "kim left the room", RecordKind::Leave),
        ];
        assert!(project_history(&records, "kim").is_empty());
        // The other participant still sees everything.
        assert_eq!(project_history(&records, "coach").len(), 2);
    }

    #[test]
    fn projection_keeps_history_when_leave_is_not_latest_own_record() {
        let records = vec![
            record(1, "kim", "kim left the room", RecordKind::Leave),
            record(2, "kim", "kim entered the room", RecordKind::Enter),
            record(3, "kim", "back again", RecordKind::Talk),
        ];
        assert_eq!(project_history(&records, "kim").len(), 3);
    }
}
