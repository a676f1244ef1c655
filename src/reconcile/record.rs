//! Lenient parsing of backend item records.
//!
//! The backend has gone through several payload shapes: camelCase and
//! snake_case keys, numbers sent as strings, `"In Progress"` statuses,
//! `timestamp` instead of `startTime`. All of them are accepted here so the
//! rest of the engine only sees [`ItemFields`].

use serde_json::{Map, Value};

use crate::config::defaults::PUSHER_COUNT;
use crate::types::{ItemFields, ItemStatus, RecordError};

const START_TIME_KEYS: &[&str] = &["startTime", "start_time", "timestamp"];
const STATUS_KEYS: &[&str] = &["status"];
const PUSHER_KEYS: &[&str] = &["pusher", "assignedPusher", "assigned_pusher", "pusher_number"];
const DISTANCE_KEYS: &[&str] = &["distance", "targetDistanceCm", "target_distance_cm"];
const POSITION_CM_KEYS: &[&str] = &["positionCm", "position_cm", "location"];
const POSITION_ID_KEYS: &[&str] = &["positionId", "position_id"];
const LABEL_KEYS: &[&str] = &["label"];
const BARCODE_KEYS: &[&str] = &["barcode"];

/// Timestamps above this are taken to be epoch milliseconds.
const MILLIS_THRESHOLD: f64 = 1e11;

/// One parsed record keyed by barcode.
pub type ParsedRecord = (String, ItemFields);

/// Split a snapshot payload into parsed records and dropped ones.
///
/// Accepts a barcode-keyed object or a list of records carrying `barcode`.
/// Barcodes of records that were present but malformed are returned in
/// `present` so they are not mistaken for absent items. Anything other than
/// an object or a list is rejected whole; `{}` and `[]` are an empty belt.
pub fn parse_snapshot(items: &Value) -> Result<SnapshotRecords, RecordError> {
    let mut out = SnapshotRecords::default();

    match items {
        Value::Object(map) => {
            for (barcode, record) in map {
                out.present.push(barcode.clone());
                match parse_fields(barcode, record) {
                    Ok(fields) => out.records.push((barcode.clone(), fields)),
                    Err(e) => out.dropped.push(e),
                }
            }
        }
        Value::Array(list) => {
            for record in list {
                let Some(barcode) = record_barcode(record) else {
                    out.dropped.push(RecordError::MissingBarcode);
                    continue;
                };
                out.present.push(barcode.clone());
                match parse_fields(&barcode, record) {
                    Ok(fields) => out.records.push((barcode, fields)),
                    Err(e) => out.dropped.push(e),
                }
            }
        }
        other => {
            return Err(RecordError::NotACollection {
                found: type_name(other),
            })
        }
    }

    Ok(out)
}

#[derive(Debug, Default)]
pub struct SnapshotRecords {
    pub records: Vec<ParsedRecord>,
    pub present: Vec<String>,
    pub dropped: Vec<RecordError>,
}

/// Parse the field object of one record. A `null` record carries no fields.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn parse_fields(barcode: &str, record: &Value) -> Result<ItemFields, RecordError> {
    let map = match record {
        Value::Object(map) => map,
        Value::Null => return Ok(ItemFields::default()),
        _ => {
            return Err(RecordError::NotAnObject {
                barcode: barcode.to_string(),
            })
        }
    };

    let invalid = |field: &'static str, value: &Value| RecordError::InvalidField {
        barcode: barcode.to_string(),
        field,
        value: value.to_string(),
    };

    let mut fields = ItemFields::default();

    if let Some(v) = lookup(map, START_TIME_KEYS) {
        let t = as_f64(v).ok_or_else(|| invalid("startTime", v))?;
        fields.start_time = Some(if t > MILLIS_THRESHOLD { t / 1000.0 } else { t });
    }

    if let Some(v) = lookup(map, STATUS_KEYS) {
        let status = v
            .as_str()
            .and_then(ItemStatus::parse_wire)
            .ok_or_else(|| invalid("status", v))?;
        fields.status = Some(status);
    }

    if let Some(v) = lookup_with_null(map, PUSHER_KEYS) {
        fields.assigned_pusher = Some(parse_pusher(v).map_err(|()| invalid("pusher", v))?);
    }

    if let Some(v) = lookup(map, DISTANCE_KEYS) {
        let d = as_f64(v)
            .filter(|d| *d >= 0.0)
            .ok_or_else(|| invalid("distance", v))?;
        fields.target_distance_cm = Some(d);
    }

    if let Some(v) = lookup(map, POSITION_CM_KEYS) {
        fields.position_cm = Some(as_f64(v).ok_or_else(|| invalid("positionCm", v))?);
    }

    if let Some(v) = lookup(map, POSITION_ID_KEYS) {
        let id = as_f64(v)
            .filter(|id| *id >= 0.0 && id.fract() == 0.0 && *id <= f64::from(u32::MAX))
            .ok_or_else(|| invalid("positionId", v))?;
        fields.position_id = Some(id as u32);
    }

    if let Some(v) = lookup(map, LABEL_KEYS) {
        fields.label = match v {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::String(_) => None,
            other => Some(other.to_string()),
        };
    }

    Ok(fields)
}

/// Barcode from a list-form record; numeric barcodes are stringified.
pub fn record_barcode(record: &Value) -> Option<String> {
    let map = record.as_object()?;
    match lookup(map, BARCODE_KEYS)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// `null` or out-of-range -> unassigned (overflow); non-numeric -> error.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn parse_pusher(value: &Value) -> Result<Option<u8>, ()> {
    if value.is_null() {
        return Ok(None);
    }
    let n = as_f64(value).ok_or(())?;
    let valid = n.fract() == 0.0 && n >= 1.0 && n <= PUSHER_COUNT as f64;
    Ok(valid.then(|| n as u8))
}

fn as_f64(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// First non-null value under any of `keys`.
fn lookup<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| map.get(*k))
        .find(|v| !v.is_null())
}

/// Like [`lookup`] but an explicit `null` counts as present.
fn lookup_with_null<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    lookup(map, keys).or_else(|| keys.iter().find_map(|k| map.get(*k)))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_camel_and_snake_case() {
        let camel = parse_fields(
            "A",
            &json!({"startTime": 10.0, "positionCm": 5, "positionId": 101, "status": "progress"}),
        )
        .unwrap();
        let snake = parse_fields(
            "A",
            &json!({"start_time": 10.0, "position_cm": 5, "position_id": 101, "status": "progress"}),
        )
        .unwrap();
        assert_eq!(camel, snake);
        assert_eq!(camel.start_time, Some(10.0));
        assert_eq!(camel.position_id, Some(101));
    }

    #[test]
    fn accepts_backend_record_shape() {
        let f = parse_fields(
            "9780",
            &json!({"location": 0, "pusher": "2", "distance": "313", "status": "In Progress", "timestamp": 1_700_000_000.5}),
        )
        .unwrap();
        assert_eq!(f.assigned_pusher, Some(Some(2)));
        assert_eq!(f.target_distance_cm, Some(313.0));
        assert_eq!(f.status, Some(ItemStatus::Progress));
        assert_eq!(f.start_time, Some(1_700_000_000.5));
        assert_eq!(f.position_cm, Some(0.0));
    }

    #[test]
    fn millisecond_timestamps_are_scaled() {
        let f = parse_fields("A", &json!({"startTime": 1_700_000_000_000_i64})).unwrap();
        assert_eq!(f.start_time, Some(1_700_000_000.0));
    }

    #[test]
    fn pusher_edge_cases() {
        let none = parse_fields("A", &json!({"pusher": null})).unwrap();
        assert_eq!(none.assigned_pusher, Some(None));
        let out_of_range = parse_fields("A", &json!({"pusher": 12})).unwrap();
        assert_eq!(out_of_range.assigned_pusher, Some(None));
        let absent = parse_fields("A", &json!({})).unwrap();
        assert_eq!(absent.assigned_pusher, None);
        assert!(parse_fields("A", &json!({"pusher": "left"})).is_err());
    }

    #[test]
    fn non_numeric_distance_is_rejected() {
        let err = parse_fields("A", &json!({"distance": "far"})).unwrap_err();
        assert!(matches!(err, RecordError::InvalidField { field: "distance", .. }));
        assert_eq!(err.barcode(), Some("A"));
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!(parse_fields("A", &json!({"status": "lost"})).is_err());
    }

    #[test]
    fn snapshot_map_keeps_good_records() {
        let snap = parse_snapshot(&json!({
            "A": {"status": "progress"},
            "B": {"distance": "nope"},
            "C": 17
        }))
        .unwrap();
        assert_eq!(snap.records.len(), 1);
        assert_eq!(snap.dropped.len(), 2);
        assert_eq!(snap.present, vec!["A", "B", "C"]);
    }

    #[test]
    fn snapshot_list_form() {
        let snap = parse_snapshot(&json!([
            {"barcode": "A", "status": "progress"},
            {"barcode": 42, "status": "pending"},
            {"status": "progress"}
        ]))
        .unwrap();
        let barcodes: Vec<_> = snap.records.iter().map(|(b, _)| b.as_str()).collect();
        assert_eq!(barcodes, vec!["A", "42"]);
        assert_eq!(snap.dropped, vec![RecordError::MissingBarcode]);
    }

    #[test]
    fn empty_collections_are_an_empty_belt() {
        for items in [json!({}), json!([])] {
            let snap = parse_snapshot(&items).unwrap();
            assert!(snap.records.is_empty() && snap.present.is_empty());
        }
    }

    #[test]
    fn non_collection_snapshot_is_rejected() {
        assert_eq!(
            parse_snapshot(&json!("garbage")).unwrap_err(),
            RecordError::NotACollection { found: "string" }
        );
        assert_eq!(
            parse_snapshot(&Value::Null).unwrap_err(),
            RecordError::NotACollection { found: "null" }
        );
        assert!(parse_snapshot(&json!(12)).is_err());
    }
}
