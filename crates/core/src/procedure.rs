//! Procedure entry codec.
//!
//! Odontogram documents are stored as schema-less JSON and may have been written by earlier
//! versions of the service or edited by hand. This module is the only place that turns such a
//! document into [`ProcedureEntry`] values and back:
//!
//! - [`decode_many`] is a tolerant reader. It locates the candidate list (a bare array, or the
//!   array under a `procedures` key), keeps every well-shaped entry in order and silently drops
//!   the rest.
//! - [`encode`] writes the canonical shape: `{"procedures": [...]}` where every entry carries all
//!   six keys, with explicit `null` for absent optional fields.
//!
//! A `ProcedureEntry` can only be obtained through decoding, so everything downstream of the
//! codec observes well-shaped entries.
//!
//! ## Entry shape
//!
//! | key          | legacy key   | rule                                  |
//! |--------------|--------------|---------------------------------------|
//! | `tooth`      | `dente`      | required, non-blank string            |
//! | `type`       | `tipo`       | required, non-blank string            |
//! | `face`       |              | optional string                       |
//! | `note`       | `observacao` | optional string                       |
//! | `id`         |              | optional string                       |
//! | `occurredAt` | `data`       | optional string                       |
//!
//! `null` is treated as absent. Legacy keys are read only when the canonical key is absent and
//! are never written.

use chrono::{DateTime, SecondsFormat, Utc};
use odonto_types::NonEmptyText;
use odonto_uuid::ShardableUuid;
use serde_json::{Map, Value};

/// Key of the procedure list inside an odontogram document.
pub const PROCEDURES_KEY: &str = "procedures";

const ID_KEY: &str = "id";
const TOOTH_KEY: &str = "tooth";
const FACE_KEY: &str = "face";
const TYPE_KEY: &str = "type";
const NOTE_KEY: &str = "note";
const OCCURRED_AT_KEY: &str = "occurredAt";

const LEGACY_TOOTH_KEY: &str = "dente";
const LEGACY_TYPE_KEY: &str = "tipo";
const LEGACY_NOTE_KEY: &str = "observacao";
const LEGACY_OCCURRED_AT_KEY: &str = "data";

static ABSENT: Value = Value::Null;

/// One logged dental procedure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcedureEntry {
    id: Option<String>,
    tooth: NonEmptyText,
    face: Option<String>,
    kind: NonEmptyText,
    note: Option<String>,
    occurred_at: Option<String>,
}

impl ProcedureEntry {
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Tooth designation.
    pub fn tooth(&self) -> &str {
        self.tooth.as_str()
    }

    /// Tooth surface.
    pub fn face(&self) -> Option<&str> {
        self.face.as_deref()
    }

    /// Procedure category.
    pub fn kind(&self) -> &str {
        self.kind.as_str()
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    /// ISO-8601 timestamp of the procedure, when known.
    pub fn occurred_at(&self) -> Option<&str> {
        self.occurred_at.as_deref()
    }

    /// Replaces the server-owned fields with a fresh identifier and timestamp.
    ///
    /// Whatever `id` or timestamp the client sent is discarded.
    pub(crate) fn stamped(self, id: ShardableUuid, at: DateTime<Utc>) -> Self {
        Self {
            id: Some(id.to_string()),
            occurred_at: Some(at.to_rfc3339_opts(SecondsFormat::Millis, true)),
            ..self
        }
    }

    fn to_value(&self) -> Value {
        let mut map = Map::with_capacity(6);
        map.insert(ID_KEY.into(), optional(self.id.as_deref()));
        map.insert(TOOTH_KEY.into(), Value::String(self.tooth.to_string()));
        map.insert(FACE_KEY.into(), optional(self.face.as_deref()));
        map.insert(TYPE_KEY.into(), Value::String(self.kind.to_string()));
        map.insert(NOTE_KEY.into(), optional(self.note.as_deref()));
        map.insert(
            OCCURRED_AT_KEY.into(),
            optional(self.occurred_at.as_deref()),
        );
        Value::Object(map)
    }

    fn from_value(value: &Value) -> Option<Self> {
        let fields = value.as_object()?;

        let tooth = required_text(fields, TOOTH_KEY, LEGACY_TOOTH_KEY)?;
        let kind = required_text(fields, TYPE_KEY, LEGACY_TYPE_KEY)?;
        let face = optional_text(fields, FACE_KEY, None)?;
        let note = optional_text(fields, NOTE_KEY, Some(LEGACY_NOTE_KEY))?;
        let id = optional_text(fields, ID_KEY, None)?;
        let occurred_at = optional_text(fields, OCCURRED_AT_KEY, Some(LEGACY_OCCURRED_AT_KEY))?;

        Some(Self {
            id,
            tooth,
            face,
            kind,
            note,
            occurred_at,
        })
    }
}

/// Result of a tolerant decode, including how many candidates were discarded.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Decoded {
    pub entries: Vec<ProcedureEntry>,
    pub dropped: usize,
}

/// Decodes every well-shaped procedure entry from an arbitrary stored value.
///
/// Order is preserved. Malformed entries are discarded without error.
pub fn decode_many(raw: &Value) -> Vec<ProcedureEntry> {
    decode_counted(raw).entries
}

/// Like [`decode_many`], but also reports the number of dropped candidates.
pub fn decode_counted(raw: &Value) -> Decoded {
    let candidates: &[Value] = match raw {
        Value::Array(items) => items,
        Value::Object(fields) => match fields.get(PROCEDURES_KEY) {
            Some(Value::Array(items)) => items,
            _ => &[],
        },
        _ => &[],
    };

    let entries: Vec<ProcedureEntry> = candidates
        .iter()
        .filter_map(ProcedureEntry::from_value)
        .collect();
    let dropped = candidates.len() - entries.len();

    Decoded { entries, dropped }
}

/// Decodes a single client-supplied procedure object.
///
/// Reuses the list decoder on a one-element list, so a body passes only if it would survive as
/// a stored entry.
pub fn decode_one(input: &Value) -> Option<ProcedureEntry> {
    let mut entries = decode_many(&Value::Array(vec![input.clone()]));
    match entries.len() {
        1 => entries.pop(),
        _ => None,
    }
}

/// Encodes entries into the canonical odontogram document.
pub fn encode(entries: &[ProcedureEntry]) -> Value {
    let procedures = entries.iter().map(ProcedureEntry::to_value).collect();
    let mut document = Map::with_capacity(1);
    document.insert(PROCEDURES_KEY.into(), Value::Array(procedures));
    Value::Object(document)
}

fn optional(value: Option<&str>) -> Value {
    value.map_or(Value::Null, |v| Value::String(v.to_owned()))
}

fn lookup<'a>(fields: &'a Map<String, Value>, key: &str, legacy: Option<&str>) -> &'a Value {
    match fields.get(key) {
        Some(value) if !value.is_null() => value,
        _ => legacy
            .and_then(|legacy| fields.get(legacy))
            .unwrap_or(&ABSENT),
    }
}

fn required_text(fields: &Map<String, Value>, key: &str, legacy: &str) -> Option<NonEmptyText> {
    lookup(fields, key, Some(legacy))
        .as_str()
        .and_then(|s| NonEmptyText::new(s).ok())
}

/// Outer `None` rejects the entry; inner `None` means the field is absent.
fn optional_text(
    fields: &Map<String, Value>,
    key: &str,
    legacy: Option<&str>,
) -> Option<Option<String>> {
    match lookup(fields, key, legacy) {
        Value::Null => Some(None),
        Value::String(s) => Some(Some(s.clone())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_decode_keeps_only_well_shaped_entries() {
        let raw = json!([
            {"tooth": "11", "type": "restauração"},
            {"tooth": "", "type": "x"},
            42,
            {"type": "x"}
        ]);

        let entries = decode_many(&raw);

        assert_eq!(entries.len(), 1, "only the first entry should survive");
        assert_eq!(entries[0].tooth(), "11");
        assert_eq!(entries[0].kind(), "restauração");
        assert_eq!(entries[0].face(), None);
        assert_eq!(entries[0].id(), None);
    }

    #[test]
    fn test_decode_accepts_wrapped_list_and_preserves_order() {
        let raw = json!({
            "procedures": [
                {"tooth": "18", "type": "extração"},
                {"tooth": "21", "type": "canal", "face": "M", "note": "dor"},
                {"tooth": "36", "type": "limpeza"}
            ]
        });

        let entries = decode_many(&raw);
        let teeth: Vec<&str> = entries.iter().map(|e| e.tooth()).collect();
        assert_eq!(teeth, vec!["18", "21", "36"]);
    }

    #[test]
    fn test_decode_unrecognised_shapes_yield_empty_list() {
        for raw in [
            json!(null),
            json!("procedures"),
            json!(7),
            json!({}),
            json!({"procedures": {"tooth": "11", "type": "x"}}),
            json!({"entries": [{"tooth": "11", "type": "x"}]}),
        ] {
            assert!(decode_many(&raw).is_empty(), "{raw} should decode to nothing");
        }
    }

    #[test]
    fn test_decode_rejects_non_string_optional_fields() {
        let raw = json!([
            {"tooth": "11", "type": "x", "face": 3},
            {"tooth": "12", "type": "x", "note": ["a"]},
            {"tooth": "13", "type": "x", "id": 99},
            {"tooth": "14", "type": "x", "occurredAt": {"y": 2020}},
            {"tooth": 15, "type": "x"},
            {"tooth": "16", "type": "x", "face": null, "note": null},
        ]);

        let decoded = decode_counted(&raw);
        assert_eq!(decoded.dropped, 5);
        assert_eq!(decoded.entries.len(), 1);
        assert_eq!(decoded.entries[0].tooth(), "16");
    }

    #[test]
    fn test_decode_blank_required_fields_are_dropped() {
        let raw = json!([{"tooth": "   ", "type": "x"}, {"tooth": "11", "type": "\t"}]);
        assert!(decode_many(&raw).is_empty());
    }

    #[test]
    fn test_decode_reads_legacy_keys() {
        let raw = json!([{
            "dente": "24",
            "tipo": "restauração",
            "observacao": "resina",
            "data": "2021-03-04T10:00:00.000Z"
        }]);

        let entries = decode_many(&raw);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].tooth(), "24");
        assert_eq!(entries[0].kind(), "restauração");
        assert_eq!(entries[0].note(), Some("resina"));
        assert_eq!(entries[0].occurred_at(), Some("2021-03-04T10:00:00.000Z"));
    }

    #[test]
    fn test_canonical_key_wins_over_legacy_key() {
        let raw = json!([{"tooth": "11", "dente": "99", "type": "x", "tipo": "y"}]);
        let entries = decode_many(&raw);
        assert_eq!(entries[0].tooth(), "11");
        assert_eq!(entries[0].kind(), "x");
    }

    #[test]
    fn test_encode_writes_explicit_nulls() {
        let entries = decode_many(&json!([{"tooth": "11", "type": "selante"}]));

        let document = encode(&entries);

        assert_eq!(
            document,
            json!({
                "procedures": [{
                    "id": null,
                    "tooth": "11",
                    "face": null,
                    "type": "selante",
                    "note": null,
                    "occurredAt": null
                }]
            })
        );
    }

    #[test]
    fn test_encode_drops_unknown_and_legacy_keys() {
        let entries = decode_many(&json!([{"dente": "11", "tipo": "x", "extra": true}]));
        let document = encode(&entries);
        let entry = &document[PROCEDURES_KEY][0];

        assert_eq!(entry["tooth"], "11");
        assert!(entry.get("dente").is_none());
        assert!(entry.get("extra").is_none());
    }

    #[test]
    fn test_round_trip_is_stable() {
        let raw = json!({
            "procedures": [
                {"id": "a", "tooth": "11", "face": "O", "type": "restauração", "note": "ok", "occurredAt": "2024-01-01T00:00:00.000Z"},
                {"tooth": "12", "type": "canal"},
                {"dente": "13", "tipo": "limpeza", "data": "2020-05-05"}
            ]
        });

        let first = decode_many(&raw);
        let encoded = encode(&first);
        let second = decode_many(&encoded);

        assert_eq!(first, second);
        assert_eq!(encode(&second), encoded);
    }

    #[test]
    fn test_decode_one_requires_exactly_one_entry() {
        assert!(decode_one(&json!({"tooth": "21", "type": "canal"})).is_some());
        assert!(decode_one(&json!({"tooth": "21"})).is_none());
        assert!(decode_one(&json!([{"tooth": "21", "type": "canal"}])).is_none());
        assert!(decode_one(&json!("canal")).is_none());
    }

    #[test]
    fn test_stamped_overrides_client_supplied_fields() {
        let entry = decode_one(&json!({
            "tooth": "21",
            "type": "canal",
            "id": "client-supplied",
            "data": "2000-01-01"
        }))
        .expect("input should decode");
        assert_eq!(entry.id(), Some("client-supplied"));

        let id = ShardableUuid::parse("550e8400e29b41d4a716446655440000").unwrap();
        let at = Utc.with_ymd_and_hms(2026, 10, 16, 9, 30, 0).unwrap();
        let stamped = entry.stamped(id, at);

        assert_eq!(stamped.id(), Some("550e8400e29b41d4a716446655440000"));
        assert_eq!(stamped.occurred_at(), Some("2026-10-16T09:30:00.000Z"));
        assert_eq!(stamped.tooth(), "21");
    }
}
