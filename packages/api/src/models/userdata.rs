//! # User-data snapshot format
//!
//! A snapshot is JSON Lines: one object per line, each tagged with the kind
//! of row it holds.
//!
//! ```text
//! {"entityName":"journalEntry","id":1,"title":"..","date":"..","body":"..","rating":2,"namespace":".."}
//! {"entityName":"contact","id":3,"firstName":"..","lastName":"..", ...}
//! {"entityName":"debt","id":5,"amount":12.5,"currency":"EUR","description":"","contactId":3}
//! {"entityName":"activity","id":8,"name":"..","date":"2024-05-01","description":"","contactId":3}
//! ```
//!
//! Older exports call the discriminator `tableName`; both are accepted.
//!
//! Decoding is two-pass. [`EntityIdentifier`] reads only the discriminator,
//! then the whole value is decoded as the row type it names. Values with an
//! unrecognised discriminator come back as [`Decoded::Unknown`] so the caller
//! can skip them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Activity, Contact, Debt, JournalEntry};

/// The kinds of rows a snapshot holds, in export order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    JournalEntry,
    Contact,
    Debt,
    Activity,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::JournalEntry,
        EntityKind::Contact,
        EntityKind::Debt,
        EntityKind::Activity,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EntityKind::JournalEntry => "journalEntry",
            EntityKind::Contact => "contact",
            EntityKind::Debt => "debt",
            EntityKind::Activity => "activity",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

/// First pass of the decoder.
#[derive(Debug, Deserialize)]
pub struct EntityIdentifier {
    #[serde(rename = "entityName", alias = "tableName", default)]
    pub entity_name: String,
}

/// One line of a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "entityName", rename_all = "camelCase")]
pub enum ExportedEntity {
    JournalEntry(JournalEntry),
    Contact(Contact),
    Debt(Debt),
    Activity(Activity),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Entity(ExportedEntity),
    /// The discriminator, possibly empty.
    Unknown(String),
}

impl ExportedEntity {
    pub fn kind(&self) -> EntityKind {
        match self {
            ExportedEntity::JournalEntry(_) => EntityKind::JournalEntry,
            ExportedEntity::Contact(_) => EntityKind::Contact,
            ExportedEntity::Debt(_) => EntityKind::Debt,
            ExportedEntity::Activity(_) => EntityKind::Activity,
        }
    }

    /// Decode one snapshot value.
    pub fn decode(value: Value) -> Result<Decoded, serde_json::Error> {
        let identifier = EntityIdentifier::deserialize(&value)?;
        let Some(kind) = EntityKind::from_name(&identifier.entity_name) else {
            return Ok(Decoded::Unknown(identifier.entity_name));
        };

        let entity = match kind {
            EntityKind::JournalEntry => ExportedEntity::JournalEntry(serde_json::from_value(value)?),
            EntityKind::Contact => ExportedEntity::Contact(serde_json::from_value(value)?),
            EntityKind::Debt => ExportedEntity::Debt(serde_json::from_value(value)?),
            EntityKind::Activity => ExportedEntity::Activity(serde_json::from_value(value)?),
        };
        Ok(Decoded::Entity(entity))
    }

    /// Serialize as one snapshot line, including the trailing newline.
    pub fn to_line(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut line = serde_json::to_vec(self)?;
        line.push(b'\n');
        Ok(line)
    }
}

/// Splits an uploaded snapshot into JSON values as chunks arrive.
///
/// Values may span chunk boundaries; the unparsed tail is kept until the next
/// chunk completes it. Only the tail is buffered, never the whole upload.
/// The tail is parsed again only once a chunk brings a line break, so a large
/// record arriving in many small chunks is parsed a bounded number of times.
#[derive(Debug, Default)]
pub struct RecordReader {
    buffer: Vec<u8>,
}

impl RecordReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every value it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<Value>, serde_json::Error> {
        self.buffer.extend_from_slice(chunk);
        if !chunk.contains(&b'\n') {
            return Ok(Vec::new());
        }

        let mut values = Vec::new();
        let consumed = {
            let mut stream = serde_json::Deserializer::from_slice(&self.buffer).into_iter::<Value>();
            loop {
                match stream.next() {
                    Some(Ok(value)) => values.push(value),
                    Some(Err(e)) if e.is_eof() => break stream.byte_offset(),
                    Some(Err(e)) => return Err(e),
                    None => break self.buffer.len(),
                }
            }
        };

        self.buffer.drain(..consumed);
        Ok(values)
    }

    /// Signal the end of the upload. Returns the values still buffered, for
    /// an upload that did not end with a line break, and fails on a
    /// truncated value.
    pub fn finish(self) -> Result<Vec<Value>, serde_json::Error> {
        serde_json::Deserializer::from_slice(&self.buffer)
            .into_iter::<Value>()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;

    use super::*;

    fn debt() -> Debt {
        Debt {
            id: 5,
            amount: 12.5,
            currency: "EUR".to_string(),
            description: "Lunch".to_string(),
            contact_id: 3,
        }
    }

    #[test]
    fn test_line_is_tagged() {
        let line = ExportedEntity::Debt(debt()).to_line().unwrap();
        assert_eq!(line.last(), Some(&b'\n'));

        let value: Value = serde_json::from_slice(&line).unwrap();
        assert_eq!(value["entityName"], "debt");
        assert_eq!(value["contactId"], 3);
        assert_eq!(value["amount"], 12.5);
    }

    #[test]
    fn test_decode_activity() {
        let value = json!({
            "entityName": "activity",
            "id": 8,
            "name": "Hiking",
            "date": "2024-05-01",
            "description": "",
            "contactId": 3
        });

        let Decoded::Entity(ExportedEntity::Activity(activity)) = ExportedEntity::decode(value).unwrap()
        else {
            panic!("expected an activity");
        };
        assert_eq!(activity.name, "Hiking");
        assert_eq!(activity.date, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        assert_eq!(activity.contact_id, 3);
    }

    #[test]
    fn test_decode_accepts_table_name() {
        let value = json!({
            "tableName": "contact",
            "id": 3,
            "firstName": "Jane",
            "lastName": "Doe",
            "nickname": "",
            "email": "jane@example.com",
            "pronouns": "she/her",
            "namespace": "someone@example.com",
            "birthday": null
        });

        let Decoded::Entity(ExportedEntity::Contact(contact)) = ExportedEntity::decode(value).unwrap()
        else {
            panic!("expected a contact");
        };
        assert_eq!(contact.first_name, "Jane");
        assert!(contact.birthday.is_none());
        assert!(contact.notes.is_empty());
    }

    #[test]
    fn test_decode_unknown_kind() {
        let decoded = ExportedEntity::decode(json!({"entityName": "todo", "id": 1})).unwrap();
        assert_eq!(decoded, Decoded::Unknown("todo".to_string()));

        let decoded = ExportedEntity::decode(json!({"id": 1})).unwrap();
        assert_eq!(decoded, Decoded::Unknown(String::new()));
    }

    #[test]
    fn test_decode_known_kind_with_bad_fields_fails() {
        let value = json!({"entityName": "debt", "id": 5, "amount": "lots"});
        assert!(ExportedEntity::decode(value).is_err());
    }

    #[test]
    fn test_reader_across_chunks() {
        let mut reader = RecordReader::new();

        let values = reader.push(br#"{"entityName":"debt","id":1}"#).unwrap();
        assert!(values.is_empty());

        let values = reader.push(b"\n{\"entityName\":\"con").unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0]["entityName"], "debt");

        let values = reader.push(b"tact\",\"id\":2}\n{\"id\":3}\n").unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values[0]["entityName"], "contact");
        assert_eq!(values[1]["id"], 3);

        assert!(reader.finish().unwrap().is_empty());
    }

    #[test]
    fn test_reader_waits_for_line_break() {
        let notes = "x".repeat(4096);
        let line = format!("{{\"entityName\":\"contact\",\"id\":7,\"notes\":\"{notes}\"}}\n");
        let mut reader = RecordReader::new();

        let (body, last) = line.as_bytes().split_at(line.len() - 1);
        for chunk in body.chunks(3) {
            assert!(reader.push(chunk).unwrap().is_empty());
        }
        assert_eq!(reader.buffer.len(), body.len());

        let values = reader.push(last).unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0]["notes"].as_str().map(str::len), Some(4096));
        assert!(reader.buffer.is_empty());
    }

    #[test]
    fn test_reader_finish_returns_unterminated_values() {
        let mut reader = RecordReader::new();
        assert!(reader.push(b"{\"id\":1}{\"id\":2}").unwrap().is_empty());

        let values = reader.finish().unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values[1]["id"], 2);
    }

    #[test]
    fn test_reader_truncated_upload() {
        let mut reader = RecordReader::new();
        assert!(reader.push(b"{\"id\":1}\n{\"id\":").unwrap().len() == 1);
        assert!(reader.finish().is_err());
    }

    #[test]
    fn test_reader_rejects_garbage() {
        let mut reader = RecordReader::new();
        assert!(reader.push(b"{\"id\":1}\nnot json\n").is_err());
    }
}
