//! HTTP payload bodies for the ksqlDB REST endpoints.
//!
//! Only the bodies live here; sending them is left to whatever HTTP client
//! the application already uses.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Kafka Streams property that picks the starting offset of a push query.
pub const AUTO_OFFSET_RESET: &str = "auto.offset.reset";

/// Where a new consumer starts reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoOffsetReset {
    Earliest,
    #[default]
    Latest,
}

impl AutoOffsetReset {
    pub fn as_str(&self) -> &'static str {
        match self {
            AutoOffsetReset::Earliest => "earliest",
            AutoOffsetReset::Latest => "latest",
        }
    }
}

/// Body of `POST /query-stream`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryStreamRequest {
    pub sql: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

impl QueryStreamRequest {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn offset_reset(self, reset: AutoOffsetReset) -> Self {
        self.property(AUTO_OFFSET_RESET, reset.as_str())
    }
}

/// Body of `POST /query` and `POST /ksql`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KsqlRequest {
    pub ksql: String,
    #[serde(
        rename = "streamsProperties",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub streams_properties: BTreeMap<String, String>,
}

impl KsqlRequest {
    pub fn new(ksql: impl Into<String>) -> Self {
        Self {
            ksql: ksql.into(),
            streams_properties: BTreeMap::new(),
        }
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.streams_properties.insert(key.into(), value.into());
        self
    }

    pub fn offset_reset(self, reset: AutoOffsetReset) -> Self {
        self.property(AUTO_OFFSET_RESET, reset.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_stream_body() {
        let body = QueryStreamRequest::new("SELECT * FROM Movies EMIT CHANGES;")
            .offset_reset(AutoOffsetReset::Earliest);
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "sql": "SELECT * FROM Movies EMIT CHANGES;",
                "properties": {"auto.offset.reset": "earliest"}
            })
        );
    }

    #[test]
    fn test_ksql_body_uses_streams_properties() {
        let body = KsqlRequest::new("SELECT * FROM Movies EMIT CHANGES;")
            .offset_reset(AutoOffsetReset::Latest);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["streamsProperties"]["auto.offset.reset"], "latest");

        let bare = serde_json::to_value(KsqlRequest::new("SHOW STREAMS;")).unwrap();
        assert_eq!(bare, json!({"ksql": "SHOW STREAMS;"}));
    }
}
