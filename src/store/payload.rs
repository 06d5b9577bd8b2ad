//! Payload schema for Qdrant points

use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{PointStruct, Value as QdrantValue};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A point ready to be upserted to Qdrant
#[derive(Debug, Clone)]
pub struct PagePoint {
    pub id: u64,
    pub vector: Vec<f32>,
    pub payload: PagePayload,
}

impl PagePoint {
    /// Convert to qdrant-client PointStruct
    pub fn to_point_struct(self) -> PointStruct {
        let payload_map = self.payload.to_qdrant_payload();
        PointStruct::new(self.id, self.vector, payload_map)
    }
}

/// Payload stored with each chunk in Qdrant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagePayload {
    /// Page URL the chunk came from
    pub url: String,

    /// Chunk text
    pub text: String,

    /// Sequential chunk id, same as the point id
    pub chunk_id: u64,
}

impl PagePayload {
    pub fn new(url: String, text: String, chunk_id: u64) -> Self {
        Self {
            url,
            text,
            chunk_id,
        }
    }

    /// Convert to Qdrant payload format
    pub fn to_qdrant_payload(self) -> HashMap<String, QdrantValue> {
        let mut map = HashMap::new();
        map.insert("url".to_string(), string_to_qdrant(&self.url));
        map.insert("text".to_string(), string_to_qdrant(&self.text));
        map.insert("chunk_id".to_string(), int_to_qdrant(self.chunk_id as i64));
        map
    }

    /// Rebuild a payload from the map Qdrant returns with a search hit.
    /// Missing or mistyped fields fall back to empty values.
    pub fn from_qdrant_payload(map: &HashMap<String, QdrantValue>) -> Self {
        Self {
            url: qdrant_string(map.get("url")),
            text: qdrant_string(map.get("text")),
            chunk_id: qdrant_int(map.get("chunk_id")).max(0) as u64,
        }
    }
}

fn string_to_qdrant(s: &str) -> QdrantValue {
    QdrantValue {
        kind: Some(Kind::StringValue(s.to_string())),
    }
}

fn int_to_qdrant(i: i64) -> QdrantValue {
    QdrantValue {
        kind: Some(Kind::IntegerValue(i)),
    }
}

fn qdrant_string(value: Option<&QdrantValue>) -> String {
    match value.and_then(|v| v.kind.as_ref()) {
        Some(Kind::StringValue(s)) => s.clone(),
        _ => String::new(),
    }
}

fn qdrant_int(value: Option<&QdrantValue>) -> i64 {
    match value.and_then(|v| v.kind.as_ref()) {
        Some(Kind::IntegerValue(i)) => *i,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_roundtrip() {
        let payload = PagePayload::new(
            "https://example.com/intro".to_string(),
            "Some chunk text".to_string(),
            7,
        );

        let map = payload.clone().to_qdrant_payload();
        let rebuilt = PagePayload::from_qdrant_payload(&map);
        assert_eq!(rebuilt, payload);
    }

    #[test]
    fn test_missing_fields_fall_back_to_empty() {
        let rebuilt = PagePayload::from_qdrant_payload(&HashMap::new());
        assert_eq!(rebuilt.url, "");
        assert_eq!(rebuilt.text, "");
        assert_eq!(rebuilt.chunk_id, 0);
    }
}
