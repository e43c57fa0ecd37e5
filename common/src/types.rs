// Wire message types for change notifications forwarded by a peer installation
use mongodb::bson::{Bson, Document};
use serde::Deserialize;
use tracing::debug;

/// Marker field that distinguishes a real-time data update from other kinds
/// of change notifications. Messages without it are ignored.
pub const SOURCE_DATA_UPDATE: &str = "sourceDataUpdate";

/// Timestamp fields inside the marker subdocument that arrive as epoch
/// milliseconds or datetime strings and must be stored as native datetimes.
pub const TIME_TAG_FIELDS: [&str; 2] = ["timeTag", "timeTagAtSource"];

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangeNotification {
    #[serde(default)]
    document_key: Option<Document>,
    #[serde(default)]
    update_description: Option<UpdateDescription>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateDescription {
    #[serde(default)]
    updated_fields: Option<Document>,
}

/// A recognized change notification: the identity of the target document and
/// the fields to set on it.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEnvelope {
    pub document_key: Document,
    pub updated_fields: Document,
}

/// Classification of a raw datagram.
#[derive(Debug)]
pub enum Decoded {
    /// A real-time data update carrying the marker and a usable document key.
    Recognized(ChangeEnvelope),
    /// Structurally valid JSON without the marker; dropped silently.
    Ignored,
    /// Not decodable as a change notification; dropped with a log line.
    Malformed(String),
}

/// Decode a raw UDP payload into a tagged classification.
pub fn decode(raw: &[u8]) -> Decoded {
    let notification: ChangeNotification = match serde_json::from_slice(raw) {
        Ok(notification) => notification,
        Err(e) => return Decoded::Malformed(e.to_string()),
    };

    let updated_fields = match notification
        .update_description
        .and_then(|description| description.updated_fields)
    {
        Some(fields) => fields,
        None => return Decoded::Ignored,
    };

    match updated_fields.get(SOURCE_DATA_UPDATE) {
        None | Some(Bson::Null) => return Decoded::Ignored,
        Some(_) => {}
    }

    // An update without a target identity cannot be applied safely: an empty
    // filter would match an arbitrary document.
    let document_key = match notification.document_key {
        Some(key) if !key.is_empty() => key,
        _ => return Decoded::Malformed("missing documentKey".to_string()),
    };

    Decoded::Recognized(ChangeEnvelope {
        document_key,
        updated_fields,
    })
}

impl ChangeEnvelope {
    /// Convert `timeTag` / `timeTagAtSource` inside the marker subdocument
    /// from epoch millis or datetime strings into native BSON datetimes.
    /// Values that cannot be interpreted are passed through unchanged.
    pub fn normalize_timestamps(&mut self) {
        let source_update = match self.updated_fields.get_mut(SOURCE_DATA_UPDATE) {
            Some(Bson::Document(doc)) => doc,
            _ => return,
        };

        for field in TIME_TAG_FIELDS {
            let value = match source_update.get(field) {
                Some(value) => value,
                None => continue,
            };
            match coerce_datetime(value) {
                Some(datetime) => {
                    source_update.insert(field, Bson::DateTime(datetime));
                }
                None => {
                    debug!(field, ?value, "time tag not convertible, passing through");
                }
            }
        }
    }
}

fn coerce_datetime(value: &Bson) -> Option<mongodb::bson::DateTime> {
    match value {
        Bson::Int64(millis) => Some(mongodb::bson::DateTime::from_millis(*millis)),
        Bson::Int32(millis) => Some(mongodb::bson::DateTime::from_millis(i64::from(*millis))),
        Bson::Double(millis) if millis.is_finite() => {
            Some(mongodb::bson::DateTime::from_millis(*millis as i64))
        }
        Bson::String(text) => {
            parse_datetime_string(text).map(mongodb::bson::DateTime::from_millis)
        }
        Bson::DateTime(datetime) => Some(*datetime),
        _ => None,
    }
}

fn parse_datetime_string(text: &str) -> Option<i64> {
    if let Ok(datetime) = chrono::DateTime::parse_from_rfc3339(text) {
        return Some(datetime.timestamp_millis());
    }
    // Senders sometimes omit the timezone; read those as UTC.
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc().timestamp_millis());
        }
    }
    None
}
