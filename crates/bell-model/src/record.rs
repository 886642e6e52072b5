//! Notification record
//!
//! One admissible unit of the feed. Field names follow the backend's JSON
//! (`idNotification`, `type`, `message`, `isRead`, `createdAt`).

use crate::error::DecodeError;
use crate::kind::NotificationKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Backend-assigned notification identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(pub u64);

impl NotificationId {
    /// Wrap a raw identifier
    #[inline]
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric value
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for NotificationId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single notification in the feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    /// Identifier, absent only for records the backend has not persisted
    #[serde(rename = "idNotification", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<NotificationId>,
    /// Classification tag
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    /// Headline
    pub title: String,
    /// Body text; may carry simple trusted markup
    #[serde(rename = "message", default)]
    pub body: String,
    /// In-app navigation target
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// Whether the operator has read it
    #[serde(rename = "isRead", default)]
    pub read: bool,
    /// Creation time; display only
    #[serde(
        rename = "createdAt",
        serialize_with = "crate::time::serialize",
        deserialize_with = "crate::time::deserialize"
    )]
    pub created_at: DateTime<Utc>,
}

impl NotificationRecord {
    /// Create an unread record created now
    #[must_use]
    pub fn new(id: u64, kind: NotificationKind, title: impl Into<String>) -> Self {
        Self {
            id: Some(NotificationId(id)),
            kind,
            title: title.into(),
            body: String::new(),
            link: None,
            read: false,
            created_at: Utc::now(),
        }
    }

    /// With body text
    #[inline]
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// With navigation target
    #[inline]
    #[must_use]
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    /// With read flag
    #[inline]
    #[must_use]
    pub fn with_read(mut self, read: bool) -> Self {
        self.read = read;
        self
    }

    /// With creation time
    #[inline]
    #[must_use]
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Decode a push-channel payload
    ///
    /// # Errors
    /// - `DecodeError::Empty` for a blank body
    /// - `DecodeError::Json` when the body is not a record
    pub fn from_json(payload: &str) -> Result<Self, DecodeError> {
        if payload.trim().is_empty() {
            return Err(DecodeError::Empty);
        }
        Ok(serde_json::from_str(payload)?)
    }

    /// Navigation target, if any; an empty link means none
    #[must_use]
    pub fn link(&self) -> Option<&str> {
        self.link.as_deref().filter(|l| !l.trim().is_empty())
    }

    /// True when the id matches
    #[inline]
    #[must_use]
    pub fn has_id(&self, id: NotificationId) -> bool {
        self.id == Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn decodes_backend_payload() {
        let json = r#"{
            "idNotification": 42,
            "type": "MEETING_REMINDER",
            "title": "Meeting at 10",
            "message": "<b>Acme</b> kickoff",
            "link": "/admin/rekap",
            "isRead": true,
            "createdAt": "2025-01-31T10:15:00"
        }"#;

        let record = NotificationRecord::from_json(json).unwrap();

        assert_eq!(record.id, Some(NotificationId(42)));
        assert_eq!(record.kind, NotificationKind::MeetingReminder);
        assert_eq!(record.body, "<b>Acme</b> kickoff");
        assert_eq!(record.link(), Some("/admin/rekap"));
        assert!(record.read);
        assert_eq!(
            record.created_at,
            Utc.with_ymd_and_hms(2025, 1, 31, 10, 15, 0).unwrap()
        );
    }

    #[test]
    fn optional_fields_default() {
        let json = r#"{"type":"X","title":"t","createdAt":1738318500000}"#;
        let record = NotificationRecord::from_json(json).unwrap();

        assert_eq!(record.id, None);
        assert_eq!(record.body, "");
        assert_eq!(record.link(), None);
        assert!(!record.read);
        assert_eq!(record.kind, NotificationKind::Other("X".to_string()));
    }

    #[test]
    fn empty_link_is_no_link() {
        let record = NotificationRecord::new(1, NotificationKind::NewClient, "t").with_link("  ");
        assert_eq!(record.link(), None);
    }

    #[test]
    fn malformed_payload_is_error() {
        assert!(matches!(
            NotificationRecord::from_json("{not json"),
            Err(DecodeError::Json { .. })
        ));
        assert!(matches!(
            NotificationRecord::from_json("   "),
            Err(DecodeError::Empty)
        ));
        // title is required
        assert!(NotificationRecord::from_json(r#"{"type":"X","createdAt":"2025-01-31T10:15:00"}"#).is_err());
    }

    #[test]
    fn serializes_with_wire_names() {
        let record = NotificationRecord::new(5, NotificationKind::NewClient, "Hi")
            .with_created_at(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["idNotification"], 5);
        assert_eq!(value["type"], "NEW_CLIENT");
        assert_eq!(value["isRead"], false);
        assert_eq!(value["createdAt"], "2025-01-01T00:00:00+00:00");
        assert!(value.get("link").is_none());

        let back: NotificationRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }

    fn kind() -> impl Strategy<Value = NotificationKind> {
        prop_oneof![
            Just(NotificationKind::NewClient),
            Just(NotificationKind::PendingVerification),
            Just(NotificationKind::MeetingReminder),
            "[A-Z_]{1,24}".prop_map(NotificationKind::from),
        ]
    }

    fn any_record() -> impl Strategy<Value = NotificationRecord> {
        (
            proptest::option::of(any::<u64>()),
            kind(),
            ".*",
            ".*",
            proptest::option::of(".*"),
            any::<bool>(),
            0i64..4_102_444_800,
        )
            .prop_map(|(id, kind, title, body, link, read, secs)| NotificationRecord {
                id: id.map(NotificationId),
                kind,
                title,
                body,
                link,
                read,
                created_at: Utc.timestamp_opt(secs, 0).single().unwrap_or_default(),
            })
    }

    proptest! {
        #[test]
        fn wire_form_round_trips(record in any_record()) {
            let json = serde_json::to_string(&record).unwrap();
            let back = NotificationRecord::from_json(&json).unwrap();
            prop_assert_eq!(back, record);
        }
    }
}
