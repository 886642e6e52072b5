//! Bell panel presentation adapter
//!
//! Renders the feed for display and turns clicks into controller intents.
//! The only state it owns is whether the dropdown is open.

use crate::controller::FeedController;
use crate::error::FeedError;
use bell_model::{relative_time, KindIcon, NotificationId, NotificationRecord};
use bell_store::FeedReader;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Badge ceiling; larger counts render as `"99+"`
pub const BADGE_LIMIT: usize = 99;

/// In-app navigation
pub trait Navigator: Send + Sync {
    /// Open `link`
    fn navigate(&self, link: &str);
}

/// One rendered row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemView {
    /// Record id, if persisted
    pub id: Option<NotificationId>,
    /// Kind icon
    pub icon: KindIcon,
    /// Kind label
    pub label: &'static str,
    /// Headline
    pub title: String,
    /// Body text
    pub body: String,
    /// "3 minutes ago" and friends
    pub when: String,
    /// Highlight as unread
    pub unread: bool,
    /// Navigation target
    pub link: Option<String>,
}

impl ItemView {
    fn from_record(record: &NotificationRecord, now: DateTime<Utc>) -> Self {
        Self {
            id: record.id,
            icon: record.kind.icon(),
            label: record.kind.label(),
            title: record.title.clone(),
            body: record.body.clone(),
            when: relative_time(record.created_at, now),
            unread: !record.read,
            link: record.link().map(str::to_string),
        }
    }
}

/// Everything needed to draw the bell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BellView {
    /// Badge text; `None` hides the badge
    pub badge: Option<String>,
    /// Dropdown open
    pub open: bool,
    /// Rows, most recent first
    pub items: Vec<ItemView>,
}

impl BellView {
    /// Whether the "no notifications" placeholder shows
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// What a click did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClickOutcome {
    /// A mark-read intent was issued
    pub marked_read: bool,
    /// A delete intent was issued
    pub deleted: bool,
    /// Link followed, if any
    pub navigated_to: Option<String>,
}

/// Badge text for an unread count
#[must_use]
pub fn badge_text(unread: usize) -> Option<String> {
    match unread {
        0 => None,
        n if n > BADGE_LIMIT => Some(format!("{BADGE_LIMIT}+")),
        n => Some(n.to_string()),
    }
}

/// The bell dropdown
pub struct BellPanel {
    controller: Arc<FeedController>,
    reader: FeedReader,
    navigator: Arc<dyn Navigator>,
    open: bool,
}

impl std::fmt::Debug for BellPanel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BellPanel")
            .field("open", &self.open)
            .field("unread", &self.reader.unread_count())
            .finish_non_exhaustive()
    }
}

impl BellPanel {
    /// Closed panel over `controller`'s feed
    #[must_use]
    pub fn new(controller: Arc<FeedController>, navigator: Arc<dyn Navigator>) -> Self {
        let reader = controller.reader();
        Self {
            controller,
            reader,
            navigator,
            open: false,
        }
    }

    /// Open or close the dropdown
    pub fn toggle(&mut self) {
        self.open = !self.open;
    }

    /// Close the dropdown (outside click)
    pub fn close(&mut self) {
        self.open = false;
    }

    /// Dropdown open
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Current badge text
    #[must_use]
    pub fn badge(&self) -> Option<String> {
        badge_text(self.reader.unread_count())
    }

    /// Render the current snapshot
    #[must_use]
    pub fn render(&self, now: DateTime<Utc>) -> BellView {
        let snapshot = self.reader.current();
        BellView {
            badge: badge_text(snapshot.unread_count()),
            open: self.open,
            items: snapshot
                .iter()
                .map(|record| ItemView::from_record(record, now))
                .collect(),
        }
    }

    /// Row click: mark read if unread, then follow the link
    ///
    /// # Errors
    /// The session is gone
    pub async fn click(&mut self, record: &NotificationRecord) -> Result<ClickOutcome, FeedError> {
        let mut outcome = ClickOutcome::default();

        if !record.read {
            if let Some(id) = record.id {
                self.controller.request_mark_read(id).await?;
                outcome.marked_read = true;
            }
        }

        if let Some(link) = record.link() {
            self.navigator.navigate(link);
            self.close();
            outcome.navigated_to = Some(link.to_string());
        }

        Ok(outcome)
    }

    /// Row click by id against the current snapshot; `None` if it is gone
    ///
    /// # Errors
    /// The session is gone
    pub async fn click_id(&mut self, id: NotificationId) -> Result<Option<ClickOutcome>, FeedError> {
        let record = self.reader.current().get(id).cloned();
        match record {
            Some(record) => self.click(&record).await.map(Some),
            None => Ok(None),
        }
    }

    /// Delete button: delete only, never opens the row
    ///
    /// # Errors
    /// The session is gone
    pub async fn click_delete(&self, record: &NotificationRecord) -> Result<ClickOutcome, FeedError> {
        let mut outcome = ClickOutcome::default();
        if let Some(id) = record.id {
            self.controller.request_delete(id).await?;
            outcome.deleted = true;
        }
        Ok(outcome)
    }

    /// "Mark all read" button
    ///
    /// # Errors
    /// The session is gone
    pub async fn mark_all_read(&self) -> Result<(), FeedError> {
        self.controller.request_mark_all_read().await
    }
}
