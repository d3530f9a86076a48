//! Local board state: categories with their image sequences, plus the
//! process-wide transients the view renders (upload-in-flight flag and the
//! current error notice).
//!
//! ## Mutation rules
//!
//! - The category set is fixed at construction. Only image sequences change.
//! - A sequence is only ever swapped whole, by category id
//!   ([`Board::replace_images`]); there is no index-level mutation.
//! - Only the pipeline's success paths change sequences, so a failed remote
//!   call can never leave a sequence half-updated.
//!
//! ## Notices
//!
//! At most one notice is shown. A new notice replaces the old one and restarts
//! its timer. Ordinary notices expire after the configured TTL (4s by
//! default); sticky ones (failed load) stay until a reload succeeds.
//!
//! ## Fetch tickets
//!
//! The initial load hands out a [`FetchTicket`]. Cancelling (the view being torn
//! down) or starting another fetch invalidates outstanding tickets, and results
//! carried by an invalid ticket are dropped instead of applied.

use crate::types::{Category, ImageRecord};
use std::time::{Duration, Instant};

pub const DEFAULT_NOTICE_TTL: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub raised_at: Instant,
    pub sticky: bool,
}

/// Proof that a fetch was started; required to apply its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket(u64);

#[derive(Debug, Clone)]
pub struct Board {
    categories: Vec<Category>,
    in_flight: usize,
    notice: Option<Notice>,
    notice_ttl: Duration,
    fetch_generation: u64,
    active_fetch: Option<u64>,
}

impl Board {
    pub fn new(categories: Vec<Category>) -> Self {
        Self {
            categories,
            in_flight: 0,
            notice: None,
            notice_ttl: DEFAULT_NOTICE_TTL,
            fetch_generation: 0,
            active_fetch: None,
        }
    }

    pub fn with_notice_ttl(mut self, ttl: Duration) -> Self {
        self.notice_ttl = ttl;
        self
    }

    // ---------------------------------------------------------------------
    // Categories
    // ---------------------------------------------------------------------

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn category_ids(&self) -> Vec<String> {
        self.categories.iter().map(|c| c.id.clone()).collect()
    }

    pub fn images(&self, id: &str) -> Option<&[ImageRecord]> {
        self.category(id).map(|c| c.images.as_slice())
    }

    /// Swap the whole image sequence of one category.
    ///
    /// Returns `false` (and changes nothing) for an unknown id or when any
    /// record claims a different category.
    pub fn replace_images(&mut self, id: &str, images: Vec<ImageRecord>) -> bool {
        if let Some(stray) = images.iter().find(|r| r.category != id) {
            tracing::warn!(
                category = id,
                record = stray.id,
                owner = %stray.category,
                "refusing sequence with foreign record"
            );
            return false;
        }
        match self.categories.iter_mut().find(|c| c.id == id) {
            Some(category) => {
                category.images = images;
                true
            }
            None => false,
        }
    }

    /// New sequence for `id` with `record` in front.
    pub fn with_prepended(&self, id: &str, record: ImageRecord) -> Option<Vec<ImageRecord>> {
        let current = self.images(id)?;
        let mut next = Vec::with_capacity(current.len() + 1);
        next.push(record);
        next.extend_from_slice(current);
        Some(next)
    }

    /// New sequence for `id` without the record whose id is `record_id`.
    pub fn without(&self, id: &str, record_id: i64) -> Option<Vec<ImageRecord>> {
        let current = self.images(id)?;
        Some(
            current
                .iter()
                .filter(|r| r.id != record_id)
                .cloned()
                .collect(),
        )
    }

    fn clear_all_images(&mut self) {
        for category in &mut self.categories {
            category.images.clear();
        }
    }

    // ---------------------------------------------------------------------
    // Upload flag
    // ---------------------------------------------------------------------

    /// True while at least one upload is in flight.
    pub fn is_uploading(&self) -> bool {
        self.in_flight > 0
    }

    pub(crate) fn begin_upload(&mut self) {
        self.in_flight += 1;
    }

    pub(crate) fn finish_upload(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }

    // ---------------------------------------------------------------------
    // Notices
    // ---------------------------------------------------------------------

    pub fn raise(&mut self, message: impl Into<String>) {
        self.set_notice(message.into(), false);
    }

    /// A notice that does not expire.
    pub fn raise_sticky(&mut self, message: impl Into<String>) {
        self.set_notice(message.into(), true);
    }

    fn set_notice(&mut self, message: String, sticky: bool) {
        tracing::debug!(%message, sticky, "notice raised");
        self.notice = Some(Notice {
            message,
            raised_at: Instant::now(),
            sticky,
        });
    }

    /// Drop the current notice unless it is sticky. Called when a new
    /// operation starts.
    pub fn clear_transient_notice(&mut self) {
        if self.notice.as_ref().is_some_and(|n| !n.sticky) {
            self.notice = None;
        }
    }

    pub fn clear_notice(&mut self) {
        self.notice = None;
    }

    pub fn notice_at(&self, now: Instant) -> Option<&str> {
        self.notice
            .as_ref()
            .filter(|n| n.sticky || now.saturating_duration_since(n.raised_at) < self.notice_ttl)
            .map(|n| n.message.as_str())
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice_at(Instant::now())
    }

    // ---------------------------------------------------------------------
    // Fetch tickets
    // ---------------------------------------------------------------------

    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.fetch_generation += 1;
        self.active_fetch = Some(self.fetch_generation);
        FetchTicket(self.fetch_generation)
    }

    /// Invalidate any in-flight fetch, e.g. on view teardown.
    pub fn cancel_fetch(&mut self) {
        self.active_fetch = None;
    }

    pub fn is_current(&self, ticket: FetchTicket) -> bool {
        self.active_fetch == Some(ticket.0)
    }

    /// Apply a completed fetch. A stale ticket leaves the board untouched and
    /// returns `false`.
    ///
    /// On success every listed category gets its fetched sequence and a sticky
    /// notice left by an earlier failed load is dropped. On failure every
    /// category is emptied and one sticky notice is raised.
    pub fn apply_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<(String, Vec<ImageRecord>)>, String>,
    ) -> bool {
        if !self.is_current(ticket) {
            tracing::debug!("dropping result of a cancelled fetch");
            return false;
        }
        self.active_fetch = None;

        match result {
            Ok(sequences) => {
                if self.notice.as_ref().is_some_and(|n| n.sticky) {
                    self.notice = None;
                }
                for (id, images) in sequences {
                    if !self.replace_images(&id, images) {
                        tracing::warn!(category = %id, "fetched sequence not applied");
                    }
                }
            }
            Err(message) => {
                self.clear_all_images();
                self.raise_sticky(message);
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn board() -> Board {
        Board::new(vec![
            Category::new("campo", "Campo", "🌾", "green", "from-green"),
            Category::new("avisos", "Avisos", "📢", "amber", "from-amber"),
        ])
    }

    fn record(id: i64, category: &str) -> ImageRecord {
        ImageRecord {
            id,
            category: category.to_string(),
            storage_path: format!("{category}/{id}.avif"),
            url: format!("https://cdn/{category}/{id}.avif"),
            created_at: Utc::now(),
        }
    }

    // =========================================================================
    // Sequences
    // =========================================================================

    #[test]
    fn new_board_has_empty_sequences() {
        let board = board();
        assert_eq!(board.category_ids(), vec!["campo", "avisos"]);
        assert!(board.images("campo").unwrap().is_empty());
        assert!(board.images("nope").is_none());
    }

    #[test]
    fn replace_swaps_one_category_only() {
        let mut board = board();
        assert!(board.replace_images("campo", vec![record(1, "campo")]));
        assert_eq!(board.images("campo").unwrap().len(), 1);
        assert!(board.images("avisos").unwrap().is_empty());
    }

    #[test]
    fn replace_rejects_foreign_records() {
        let mut board = board();
        assert!(!board.replace_images("campo", vec![record(1, "avisos")]));
        assert!(board.images("campo").unwrap().is_empty());
    }

    #[test]
    fn replace_unknown_category_is_refused() {
        let mut board = board();
        assert!(!board.replace_images("nope", vec![]));
    }

    #[test]
    fn prepended_puts_new_record_first() {
        let mut board = board();
        board.replace_images("campo", vec![record(1, "campo")]);
        let next = board.with_prepended("campo", record(2, "campo")).unwrap();
        let ids: Vec<i64> = next.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn without_filters_by_id() {
        let mut board = board();
        board.replace_images("campo", vec![record(2, "campo"), record(1, "campo")]);
        let next = board.without("campo", 1).unwrap();
        let ids: Vec<i64> = next.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2]);
        // The board itself is untouched until the sequence is swapped in
        assert_eq!(board.images("campo").unwrap().len(), 2);
    }

    // =========================================================================
    // Upload flag
    // =========================================================================

    #[test]
    fn uploading_while_any_in_flight() {
        let mut board = board();
        board.begin_upload();
        board.begin_upload();
        board.finish_upload();
        assert!(board.is_uploading());
        board.finish_upload();
        assert!(!board.is_uploading());
        board.finish_upload();
        assert!(!board.is_uploading());
    }

    // =========================================================================
    // Notices
    // =========================================================================

    #[test]
    fn notice_expires_after_ttl() {
        let mut board = board().with_notice_ttl(Duration::from_secs(4));
        board.raise("Upload failed");
        let raised = board.notice.as_ref().unwrap().raised_at;

        assert_eq!(board.notice_at(raised), Some("Upload failed"));
        assert_eq!(
            board.notice_at(raised + Duration::from_millis(3_999)),
            Some("Upload failed")
        );
        assert_eq!(board.notice_at(raised + Duration::from_secs(4)), None);
    }

    #[test]
    fn sticky_notice_never_expires() {
        let mut board = board();
        board.raise_sticky("Could not load the board");
        let raised = board.notice.as_ref().unwrap().raised_at;
        assert!(board.notice_at(raised + Duration::from_secs(3_600)).is_some());
    }

    #[test]
    fn new_notice_replaces_old() {
        let mut board = board();
        board.raise("first");
        board.raise("second");
        assert_eq!(board.notice(), Some("second"));
    }

    #[test]
    fn transient_clear_keeps_sticky() {
        let mut board = board();
        board.raise("transient");
        board.clear_transient_notice();
        assert_eq!(board.notice(), None);

        board.raise_sticky("sticky");
        board.clear_transient_notice();
        assert_eq!(board.notice(), Some("sticky"));
    }

    // =========================================================================
    // Fetch tickets
    // =========================================================================

    #[test]
    fn fetch_result_applies_with_current_ticket() {
        let mut board = board();
        let ticket = board.begin_fetch();
        let applied = board.apply_fetch(
            ticket,
            Ok(vec![("campo".to_string(), vec![record(7, "campo")])]),
        );
        assert!(applied);
        assert_eq!(board.images("campo").unwrap().len(), 1);
        // A ticket is single-use
        assert!(!board.is_current(ticket));
    }

    #[test]
    fn cancelled_fetch_is_dropped() {
        let mut board = board();
        let ticket = board.begin_fetch();
        board.cancel_fetch();
        let applied = board.apply_fetch(
            ticket,
            Ok(vec![("campo".to_string(), vec![record(7, "campo")])]),
        );
        assert!(!applied);
        assert!(board.images("campo").unwrap().is_empty());
    }

    #[test]
    fn newer_fetch_supersedes_older() {
        let mut board = board();
        let old = board.begin_fetch();
        let new = board.begin_fetch();
        assert!(!board.is_current(old));
        assert!(board.is_current(new));
    }

    #[test]
    fn failed_fetch_empties_everything_with_one_sticky_notice() {
        let mut board = board();
        board.replace_images("campo", vec![record(1, "campo")]);
        let ticket = board.begin_fetch();

        board.apply_fetch(ticket, Err("Could not load the board".to_string()));

        assert!(board.categories().iter().all(|c| c.images.is_empty()));
        assert_eq!(board.notice(), Some("Could not load the board"));
        assert!(board.notice.as_ref().unwrap().sticky);
    }

    #[test]
    fn successful_reload_clears_load_failure() {
        let mut board = board();
        let failed = board.begin_fetch();
        board.apply_fetch(failed, Err("Could not load the board".to_string()));

        let retry = board.begin_fetch();
        board.apply_fetch(
            retry,
            Ok(vec![("campo".to_string(), vec![record(7, "campo")])]),
        );

        assert_eq!(board.notice(), None);
        assert_eq!(board.images("campo").unwrap().len(), 1);
    }

    #[test]
    fn successful_reload_keeps_transient_notice() {
        let mut board = board();
        board.raise("Could not upload a.jpg");
        let ticket = board.begin_fetch();
        board.apply_fetch(ticket, Ok(vec![]));
        assert_eq!(board.notice(), Some("Could not upload a.jpg"));
    }

    #[test]
    fn cancelled_reload_keeps_load_failure() {
        let mut board = board();
        let failed = board.begin_fetch();
        board.apply_fetch(failed, Err("Could not load the board".to_string()));

        let retry = board.begin_fetch();
        board.cancel_fetch();
        board.apply_fetch(retry, Ok(vec![]));

        assert_eq!(board.notice(), Some("Could not load the board"));
    }
}
