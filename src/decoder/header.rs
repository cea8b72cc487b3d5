//! Response header: column names and KSQL types of the rows that follow.

use crate::error::{KsqlError, KsqlResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryStreamHeader {
    #[serde(default)]
    pub query_id: Option<String>,
    pub column_names: Vec<String>,
    #[serde(default)]
    pub column_types: Vec<String>,
}

impl QueryStreamHeader {
    /// Header line of a `/query-stream` response:
    /// `{"queryId":"..","columnNames":[..],"columnTypes":[..]}`.
    pub fn parse(line: &str) -> KsqlResult<Self> {
        let json: Json = serde_json::from_str(line)
            .map_err(|e| KsqlError::Header(format!("{}: {}", e, line)))?;
        Self::from_json(json)
    }

    pub(crate) fn from_json(json: Json) -> KsqlResult<Self> {
        if !json.is_object() {
            return Err(KsqlError::Header(format!("expected an object, got {}", json)));
        }
        let header: Self =
            serde_json::from_value(json).map_err(|e| KsqlError::Header(e.to_string()))?;
        if !header.column_types.is_empty() && header.column_types.len() != header.column_names.len()
        {
            return Err(KsqlError::Header(format!(
                "{} column names but {} column types",
                header.column_names.len(),
                header.column_types.len()
            )));
        }
        Ok(header)
    }

    /// Header of a `/query` response, whose schema is a single string such
    /// as `` `ID` INTEGER, `TAGS` ARRAY<STRING> ``.
    pub fn from_schema(query_id: Option<String>, schema: &str) -> KsqlResult<Self> {
        let mut column_names = Vec::new();
        let mut column_types = Vec::new();
        for column in split_top_level(schema) {
            let column = column.trim();
            let (name, ty) = match column.strip_prefix('`') {
                Some(rest) => {
                    let end = rest.find('`').ok_or_else(|| {
                        KsqlError::Header(format!("unterminated column name in '{}'", column))
                    })?;
                    (&rest[..end], rest[end + 1..].trim())
                }
                None => column.split_once(' ').ok_or_else(|| {
                    KsqlError::Header(format!("column without a type: '{}'", column))
                })?,
            };
            column_names.push(name.to_string());
            column_types.push(ty.trim().to_string());
        }
        if column_names.is_empty() {
            return Err(KsqlError::Header("empty schema".to_string()));
        }
        Ok(Self {
            query_id,
            column_names,
            column_types,
        })
    }

    /// Pair a positional row with the column names:
    /// `[1, ["a"]]` becomes `{"Id": 1, "Places": ["a"]}`.
    pub fn zip_row(&self, values: Vec<Json>) -> KsqlResult<Json> {
        if values.len() != self.column_names.len() {
            return Err(KsqlError::Row(format!(
                "row has {} values for {} columns",
                values.len(),
                self.column_names.len()
            )));
        }
        let record: Map<String, Json> = self.column_names.iter().cloned().zip(values).collect();
        Ok(Json::Object(record))
    }
}

/// Split on commas outside `<...>` and `(...)`.
fn split_top_level(schema: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in schema.char_indices() {
        match c {
            '<' | '(' => depth += 1,
            '>' | ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&schema[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if !schema[start..].trim().is_empty() {
        parts.push(&schema[start..]);
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_query_stream_header() {
        let header = QueryStreamHeader::parse(
            r#"{"queryId":"q1","columnNames":["Id","Places"],"columnTypes":["INTEGER","ARRAY<STRING>"]}"#,
        )
        .unwrap();
        assert_eq!(header.query_id.as_deref(), Some("q1"));
        assert_eq!(header.column_names, vec!["Id", "Places"]);
    }

    #[test]
    fn test_malformed_header() {
        assert!(matches!(
            QueryStreamHeader::parse("[1, 2]"),
            Err(KsqlError::Header(_))
        ));
        assert!(matches!(
            QueryStreamHeader::parse(r#"{"queryId":"q1"}"#),
            Err(KsqlError::Header(_))
        ));
        assert!(matches!(
            QueryStreamHeader::parse("not json"),
            Err(KsqlError::Header(_))
        ));
    }

    #[test]
    fn test_schema_string_respects_nesting() {
        let header = QueryStreamHeader::from_schema(
            None,
            "`ID` INTEGER, `SCORES` MAP<STRING, INTEGER>, `PRICE` DECIMAL(10, 2), `ADDR` STRUCT<`A` STRING, `B` INTEGER>",
        )
        .unwrap();
        assert_eq!(header.column_names, vec!["ID", "SCORES", "PRICE", "ADDR"]);
        assert_eq!(
            header.column_types,
            vec![
                "INTEGER",
                "MAP<STRING, INTEGER>",
                "DECIMAL(10, 2)",
                "STRUCT<`A` STRING, `B` INTEGER>"
            ]
        );
    }

    #[test]
    fn test_zip_row() {
        let header = QueryStreamHeader {
            query_id: None,
            column_names: vec!["Id".into(), "Places".into()],
            column_types: vec![],
        };
        let record = header
            .zip_row(vec![json!(1), json!(["Place1", "Place2"])])
            .unwrap();
        assert_eq!(record, json!({"Id": 1, "Places": ["Place1", "Place2"]}));
        assert!(matches!(header.zip_row(vec![json!(1)]), Err(KsqlError::Row(_))));
    }
}
