//! Wire messages exchanged between the coordinator and its workers.
//!
//! Frames are binary WebSocket messages whose payload is a JSON object with
//! exactly one top-level key naming the variant: `assignment` flows
//! coordinator-to-worker, `success` and `failed` flow back. Job ids travel
//! as brace-wrapped hyphenated UUID strings.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A job handed to a worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    #[serde(with = "braced_uuid")]
    pub id: Uuid,
    pub command: String,
}

/// Outcome report for a finished (or refused) assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    #[serde(with = "braced_uuid")]
    pub id: Uuid,
    #[serde(default)]
    pub std_out: String,
    #[serde(default)]
    pub std_err: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Message {
    Assignment(Assignment),
    Success(Completion),
    Failed(Completion),
}

impl Message {
    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("wire messages always serialize")
    }

    /// Lenient decode: anything unrecognizable is dropped with a warning
    /// rather than treated as an error. Consumers decide what a missing
    /// message means for them.
    pub fn decode(data: &[u8]) -> Option<Message> {
        match serde_json::from_slice(data) {
            Ok(message) => Some(message),
            Err(e) => {
                tracing::warn!(error = %e, "Undecodable wire message dropped");
                None
            }
        }
    }
}

mod braced_uuid {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use uuid::Uuid;

    pub fn serialize<S: Serializer>(id: &Uuid, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&id.braced())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Uuid, D::Error> {
        let text = String::deserialize(deserializer)?;
        Uuid::parse_str(&text).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignment_uses_braced_id_under_variant_key() {
        let id = Uuid::new_v4();
        let message = Message::Assignment(Assignment {
            id,
            command: "echo hello".to_string(),
        });

        let value: serde_json::Value = serde_json::from_slice(&message.to_bytes()).unwrap();
        let inner = value
            .get("assignment")
            .expect("top-level key names the variant");
        assert_eq!(
            inner.get("id").unwrap().as_str().unwrap(),
            format!("{{{}}}", id)
        );
        assert_eq!(inner.get("command").unwrap(), "echo hello");
    }

    #[test]
    fn messages_round_trip() {
        let original = Message::Success(Completion {
            id: Uuid::new_v4(),
            std_out: "out\n".to_string(),
            std_err: String::new(),
        });

        let decoded = Message::decode(&original.to_bytes()).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn decode_accepts_unbraced_ids_and_extra_fields() {
        let id = Uuid::new_v4();
        let payload = format!(
            r#"{{"failed": {{"id": "{}", "std_out": "x", "std_err": "", "retries": 3}}}}"#,
            id
        );

        match Message::decode(payload.as_bytes()) {
            Some(Message::Failed(c)) => {
                assert_eq!(c.id, id);
                assert_eq!(c.std_out, "x");
            }
            other => panic!("unexpected decode result: {:?}", other),
        }
    }

    #[test]
    fn decode_defaults_missing_output_fields() {
        let id = Uuid::new_v4();
        let payload = format!(r#"{{"success": {{"id": "{{{}}}"}}}}"#, id);

        match Message::decode(payload.as_bytes()) {
            Some(Message::Success(c)) => {
                assert_eq!(c.id, id);
                assert!(c.std_out.is_empty());
                assert!(c.std_err.is_empty());
            }
            other => panic!("unexpected decode result: {:?}", other),
        }
    }

    #[test]
    fn unknown_top_key_decodes_to_nothing() {
        assert_eq!(Message::decode(br#"{"greeting": {"id": "1"}}"#), None);
        assert_eq!(Message::decode(b"not json at all"), None);
        assert_eq!(Message::decode(b"{}"), None);
    }
}
