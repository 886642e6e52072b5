//! Notification kind tag
//!
//! The backend classifies notifications with a free-form string. Known tags get
//! their own variant; anything else is kept verbatim in [`NotificationKind::Other`]
//! so new backend kinds render with the neutral treatment instead of failing.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a notification
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NotificationKind {
    /// A new client submitted the lead form
    NewClient,
    /// A client is waiting for verification
    PendingVerification,
    /// An upcoming meeting
    MeetingReminder,
    /// Any tag this build does not know about
    Other(String),
}

/// Icon shown next to a notification in the panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KindIcon {
    /// Person with a plus sign
    UserPlus,
    /// Hourglass
    Hourglass,
    /// Calendar
    Calendar,
    /// Plain bell, the fallback
    Bell,
}

impl NotificationKind {
    /// Wire tag for this kind
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::NewClient => "NEW_CLIENT",
            Self::PendingVerification => "PENDING_VERIFICATION",
            Self::MeetingReminder => "MEETING_REMINDER",
            Self::Other(tag) => tag,
        }
    }

    /// Human readable label
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::NewClient => "New client",
            Self::PendingVerification => "Pending verification",
            Self::MeetingReminder => "Meeting reminder",
            Self::Other(_) => "Notification",
        }
    }

    /// Panel icon
    #[must_use]
    pub fn icon(&self) -> KindIcon {
        match self {
            Self::NewClient => KindIcon::UserPlus,
            Self::PendingVerification => KindIcon::Hourglass,
            Self::MeetingReminder => KindIcon::Calendar,
            Self::Other(_) => KindIcon::Bell,
        }
    }

    /// Whether the tag was recognized
    #[inline]
    #[must_use]
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl From<String> for NotificationKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "NEW_CLIENT" => Self::NewClient,
            "PENDING_VERIFICATION" => Self::PendingVerification,
            "MEETING_REMINDER" => Self::MeetingReminder,
            _ => Self::Other(tag),
        }
    }
}

impl From<&str> for NotificationKind {
    fn from(tag: &str) -> Self {
        Self::from(tag.to_string())
    }
}

impl From<NotificationKind> for String {
    fn from(kind: NotificationKind) -> Self {
        match kind {
            NotificationKind::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_tags_parse() {
        assert_eq!(NotificationKind::from("NEW_CLIENT"), NotificationKind::NewClient);
        assert_eq!(
            NotificationKind::from("PENDING_VERIFICATION"),
            NotificationKind::PendingVerification
        );
        assert_eq!(
            NotificationKind::from("MEETING_REMINDER"),
            NotificationKind::MeetingReminder
        );
    }

    #[test]
    fn unknown_tag_falls_back_to_neutral() {
        let kind = NotificationKind::from("INVOICE_OVERDUE");
        assert_eq!(kind, NotificationKind::Other("INVOICE_OVERDUE".to_string()));
        assert_eq!(kind.icon(), KindIcon::Bell);
        assert_eq!(kind.label(), "Notification");
        assert!(!kind.is_known());
    }

    #[test]
    fn unknown_tag_round_trips_verbatim() {
        let kind: NotificationKind = serde_json::from_str("\"lead_scored\"").unwrap();
        assert_eq!(serde_json::to_string(&kind).unwrap(), "\"lead_scored\"");
    }

    #[test]
    fn tags_are_case_sensitive() {
        assert!(!NotificationKind::from("new_client").is_known());
    }
}
