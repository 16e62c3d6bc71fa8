//! Display projections consumed by rendering layers.
//!
//! # Responsibility
//! - Hold UI selection state (category filter, view mode, edited note).
//! - Project notes into cards with duplicate flags and relative dates.
//!
//! # Invariants
//! - Projections are read-only; they never mutate the store.
//! - Card order equals store order for the selected filter.

use crate::model::note::{Category, CategoryFilter, Note, NoteId};
use crate::repo::kv_repo::KeyValueStore;
use crate::service::note_store::NoteStore;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

/// Inline message shown next to the title field on a duplicate.
pub const DUPLICATE_MESSAGE: &str = "A note with this title already exists in this category";

const EXCERPT_MAX_CHARS: usize = 100;
const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Card layout for the note list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViewMode {
    #[default]
    Grid,
    List,
}

/// Selection state threaded through the rendering layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    pub filter: CategoryFilter,
    pub mode: ViewMode,
    /// Note currently open in the editor; `None` while creating or idle.
    pub editing: Option<NoteId>,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(&mut self, filter: CategoryFilter) {
        self.filter = filter;
    }

    pub fn set_mode(&mut self, mode: ViewMode) {
        self.mode = mode;
    }

    pub fn begin_edit(&mut self, id: NoteId) {
        self.editing = Some(id);
    }

    pub fn finish_edit(&mut self) {
        self.editing = None;
    }

    /// Heading for the selected filter.
    pub fn heading(&self) -> &'static str {
        category_heading(self.filter)
    }

    /// Live uniqueness hint for in-progress form input.
    ///
    /// Returns `DUPLICATE_MESSAGE` only when both fields are filled, the
    /// category is known, and another note (not the edited one) matches.
    pub fn title_conflict<S: KeyValueStore>(
        &self,
        store: &NoteStore<S>,
        title: &str,
        category: &str,
    ) -> Option<&'static str> {
        if title.trim().is_empty() {
            return None;
        }
        let category = Category::parse(category).ok()?;
        store
            .is_duplicate(title, category, self.editing)
            .then_some(DUPLICATE_MESSAGE)
    }
}

/// Per-note display projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteCard {
    pub id: NoteId,
    pub title: String,
    pub category: Category,
    /// Whitespace-collapsed description, capped at 100 chars.
    pub excerpt: String,
    /// Relative label for `updated_at`.
    pub date_label: String,
    /// Another note shares this `(title, category)`.
    pub is_duplicate: bool,
}

/// Builds cards for the selected filter in store order.
///
/// An empty result is the empty state.
pub fn render_cards<S: KeyValueStore>(
    store: &NoteStore<S>,
    state: &ViewState,
    now: DateTime<Utc>,
) -> Vec<NoteCard> {
    store
        .filter(state.filter)
        .map(|note| note_card(store, note, now))
        .collect()
}

pub fn note_card<S: KeyValueStore>(store: &NoteStore<S>, note: &Note, now: DateTime<Utc>) -> NoteCard {
    NoteCard {
        id: note.id,
        title: note.title.clone(),
        category: note.category,
        excerpt: excerpt(&note.description),
        date_label: relative_date_label(note.updated_at, now),
        is_duplicate: store.is_flagged(note),
    }
}

/// Sidebar rows: `(filter, count)` for `all` then each category.
pub fn category_rows<S: KeyValueStore>(store: &NoteStore<S>) -> Vec<(CategoryFilter, usize)> {
    store.count_by_category().into_iter().collect()
}

pub fn category_heading(filter: CategoryFilter) -> &'static str {
    match filter {
        CategoryFilter::All => "All Notes",
        CategoryFilter::Only(category) => category.as_str(),
    }
}

/// Relative label for a timestamp.
///
/// Whole elapsed days: `0` → "Today", `1` → "Yesterday", `< 7` → "N days ago",
/// otherwise the calendar date (`YYYY-MM-DD`).
pub fn relative_date_label(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed_ms = (now - timestamp).num_milliseconds().abs();
    match elapsed_ms / MILLIS_PER_DAY {
        0 => "Today".to_string(),
        1 => "Yesterday".to_string(),
        days @ 2..=6 => format!("{days} days ago"),
        _ => timestamp.format("%Y-%m-%d").to_string(),
    }
}

fn excerpt(description: &str) -> String {
    let collapsed = WHITESPACE_RE.replace_all(description, " ");
    let trimmed = collapsed.trim();
    let mut out = trimmed.chars().take(EXCERPT_MAX_CHARS).collect::<String>();
    if trimmed.chars().count() > EXCERPT_MAX_CHARS {
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{category_heading, excerpt, relative_date_label, ViewState, DUPLICATE_MESSAGE};
    use crate::model::note::{Category, CategoryFilter};
    use crate::repo::kv_repo::MemoryKeyValueStore;
    use crate::service::note_store::NoteStore;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn relative_date_label_buckets_by_whole_days() {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap();
        assert_eq!(relative_date_label(now - Duration::hours(3), now), "Today");
        assert_eq!(relative_date_label(now - Duration::hours(30), now), "Yesterday");
        assert_eq!(relative_date_label(now - Duration::days(4), now), "4 days ago");
        assert_eq!(relative_date_label(now - Duration::days(7), now), "2024-06-03");
    }

    #[test]
    fn excerpt_collapses_whitespace_and_caps_length() {
        assert_eq!(excerpt("  line one\n\n line\ttwo "), "line one line two");
        let long = "x".repeat(150);
        let capped = excerpt(&long);
        assert!(capped.ends_with("..."));
        assert_eq!(capped.chars().count(), 103);
    }

    #[test]
    fn title_conflict_ignores_the_note_being_edited() {
        let mut store = NoteStore::new(MemoryKeyValueStore::new());
        store.load().unwrap();
        let note = store.create("Standup", "Work", "").unwrap();

        let mut state = ViewState::new();
        assert_eq!(
            state.title_conflict(&store, "Standup ", "Work"),
            Some(DUPLICATE_MESSAGE)
        );
        assert_eq!(state.title_conflict(&store, "", "Work"), None);
        assert_eq!(state.title_conflict(&store, "Standup", ""), None);

        state.begin_edit(note.id);
        assert_eq!(state.title_conflict(&store, "Standup", "Work"), None);
        state.finish_edit();
        assert_eq!(state.editing, None);
    }

    #[test]
    fn headings_match_sidebar_labels() {
        assert_eq!(category_heading(CategoryFilter::All), "All Notes");
        assert_eq!(category_heading(CategoryFilter::Only(Category::Ideas)), "Ideas");
    }
}
