//! Inbound message envelope and the errors raised while reading it.
//!
//! Payloads are kept as raw JSON so a malformed record can be dropped on its
//! own without losing the rest of a snapshot.

use serde::Deserialize;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::config::PusherSetting;

/// One message from the backend, discriminated by `"type"`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    /// Authoritative list of every item the backend currently tracks.
    ///
    /// `items` is either a barcode-keyed map or a list of records. Required.
    Snapshot { items: serde_json::Value },

    /// A newly announced item (upserted like any delta).
    Add {
        #[serde(default)]
        barcode: Option<String>,
        #[serde(default)]
        fields: serde_json::Value,
    },

    /// A field change for one item.
    Update {
        #[serde(default)]
        barcode: Option<String>,
        #[serde(default)]
        fields: serde_json::Value,
    },

    /// Local echo of a scanner read.
    Scan { barcode: String },

    /// New pusher settings from the operator form.
    Settings {
        settings: BTreeMap<String, PusherSetting>,
    },
}

impl InboundMessage {
    /// Parse one JSON line.
    pub fn parse(line: &str) -> Result<Self, MessageError> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Err(MessageError::Empty);
        }
        serde_json::from_str(trimmed).map_err(MessageError::Envelope)
    }

    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Snapshot { .. } => "snapshot",
            Self::Add { .. } => "add",
            Self::Update { .. } => "update",
            Self::Scan { .. } => "scan",
            Self::Settings { .. } => "settings",
        }
    }
}

/// The whole message could not be read.
#[derive(Debug, Error)]
pub enum MessageError {
    #[error("empty message")]
    Empty,

    #[error("invalid message envelope: {0}")]
    Envelope(serde_json::Error),
}

/// A single item record was malformed and dropped.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RecordError {
    #[error("record has no barcode")]
    MissingBarcode,

    #[error("record for {barcode} is not an object")]
    NotAnObject { barcode: String },

    #[error("snapshot items must be an object or a list, got {found}")]
    NotACollection { found: &'static str },

    #[error("record for {barcode}: field `{field}` has invalid value {value}")]
    InvalidField {
        barcode: String,
        field: &'static str,
        value: String,
    },
}

impl RecordError {
    /// Barcode of the offending record, when it was known.
    pub fn barcode(&self) -> Option<&str> {
        match self {
            Self::MissingBarcode | Self::NotACollection { .. } => None,
            Self::NotAnObject { barcode } | Self::InvalidField { barcode, .. } => Some(barcode),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_snapshot_envelope() {
        let msg = InboundMessage::parse(r#"{"type":"snapshot","items":{"A":{"status":"progress"}}}"#)
            .unwrap();
        match msg {
            InboundMessage::Snapshot { items } => assert!(items.get("A").is_some()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn snapshot_without_items_is_rejected() {
        assert!(matches!(
            InboundMessage::parse(r#"{"type":"snapshot"}"#),
            Err(MessageError::Envelope(_))
        ));
    }

    #[test]
    fn delta_without_barcode_still_parses() {
        let msg = InboundMessage::parse(r#"{"type":"update","fields":{"status":"routing"}}"#).unwrap();
        assert_eq!(msg.kind(), "update");
        assert!(matches!(msg, InboundMessage::Update { barcode: None, .. }));
    }

    #[test]
    fn rejects_unknown_type_and_garbage() {
        assert!(matches!(
            InboundMessage::parse(r#"{"type":"teleport"}"#),
            Err(MessageError::Envelope(_))
        ));
        assert!(matches!(InboundMessage::parse("not json"), Err(MessageError::Envelope(_))));
        assert!(matches!(InboundMessage::parse("   "), Err(MessageError::Empty)));
    }

    #[test]
    fn parses_settings_message() {
        let msg = InboundMessage::parse(
            r#"{"type":"settings","settings":{"Pusher 1":{"label":"FBA","distance":230}}}"#,
        )
        .unwrap();
        match msg {
            InboundMessage::Settings { settings } => {
                assert_eq!(settings["Pusher 1"].label, "FBA");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
