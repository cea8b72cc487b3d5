//! Streaming row decoder.
//!
//! Reads a line-delimited ksqlDB response, one line per step: the header
//! first, then one row per line until the source ends, the server sends an
//! error row, or (for `/query`) the final message arrives. Dropping the
//! stream drops the line source with it.

pub mod header;
pub mod subscription;

pub use header::QueryStreamHeader;
pub use subscription::{subscribe, Observer, Subscription};

use crate::error::{KsqlError, KsqlResult};
use futures::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_stream::wrappers::LinesStream;

/// Which endpoint produced the response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseFormat {
    /// `/query-stream`: a header object, then one JSON array per row.
    #[default]
    QueryStream,
    /// `/query`: a JSON array spread over lines, one element per line.
    Query,
}

/// How a row value maps onto the target type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RowShape {
    /// Positional values zipped with the column names into an object.
    #[default]
    Record,
    /// A single non-composite value per row.
    Scalar,
}

/// What one response line turned out to be.
#[derive(Debug)]
enum Frame {
    Header(QueryStreamHeader),
    Values(Json),
    Error(KsqlError),
    Skip,
    End,
}

/// Lines of any buffered async reader.
pub fn lines_from_reader<R>(reader: R) -> LinesStream<R>
where
    R: AsyncBufRead,
{
    LinesStream::new(reader.lines())
}

/// A decoded response whose header has already been read.
pub struct QueryStream<T> {
    header: QueryStreamHeader,
    rows: Pin<Box<dyn Stream<Item = KsqlResult<T>> + Send>>,
}

impl<T> QueryStream<T>
where
    T: DeserializeOwned + Send + 'static,
{
    /// Read the header, failing before any row when it is missing or
    /// malformed. Rows are decoded on demand afterwards.
    pub async fn open<S>(mut lines: S, format: ResponseFormat, shape: RowShape) -> KsqlResult<Self>
    where
        S: Stream<Item = io::Result<String>> + Send + Unpin + 'static,
    {
        let header = read_header(&mut lines, format).await?;
        tracing::debug!(
            query_id = ?header.query_id,
            columns = ?header.column_names,
            "response header"
        );
        let rows = rows(lines, header.clone(), format, shape);
        Ok(Self { header, rows })
    }

    pub fn header(&self) -> &QueryStreamHeader {
        &self.header
    }
}

impl<T> Stream for QueryStream<T> {
    type Item = KsqlResult<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rows.as_mut().poll_next(cx)
    }
}

/// Lazy variant of [`QueryStream::open`]: nothing is read until the first
/// poll, and a header failure is the first and only item.
pub fn decode<T, S>(
    mut lines: S,
    format: ResponseFormat,
    shape: RowShape,
) -> Pin<Box<dyn Stream<Item = KsqlResult<T>> + Send>>
where
    T: DeserializeOwned + Send + 'static,
    S: Stream<Item = io::Result<String>> + Send + Unpin + 'static,
{
    Box::pin(async_stream::stream! {
        let header = match read_header(&mut lines, format).await {
            Ok(header) => header,
            Err(e) => {
                yield Err::<T, KsqlError>(e);
                return;
            }
        };
        let mut rows = rows::<T, S>(lines, header, format, shape);
        while let Some(row) = rows.next().await {
            yield row;
        }
    })
}

async fn read_header<S>(lines: &mut S, format: ResponseFormat) -> KsqlResult<QueryStreamHeader>
where
    S: Stream<Item = io::Result<String>> + Unpin,
{
    while let Some(line) = lines.next().await {
        match parse_line(&line?, format)? {
            Frame::Header(header) => return Ok(header),
            Frame::Skip => continue,
            Frame::Error(e) => return Err(e),
            Frame::Values(_) | Frame::End => {
                return Err(KsqlError::Header("first line is not a header".to_string()));
            }
        }
    }
    Err(KsqlError::Header("response ended before the header".to_string()))
}

fn rows<T, S>(
    mut lines: S,
    header: QueryStreamHeader,
    format: ResponseFormat,
    shape: RowShape,
) -> Pin<Box<dyn Stream<Item = KsqlResult<T>> + Send>>
where
    T: DeserializeOwned + Send + 'static,
    S: Stream<Item = io::Result<String>> + Send + Unpin + 'static,
{
    Box::pin(async_stream::stream! {
        while let Some(line) = lines.next().await {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    yield Err::<T, KsqlError>(e.into());
                    return;
                }
            };
            let frame = match parse_line(&line, format) {
                Ok(frame) => frame,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };
            match frame {
                Frame::Values(values) => {
                    tracing::trace!(row = %values, "decoded row");
                    yield decode_row(&header, values, shape);
                }
                Frame::Error(e) => {
                    tracing::warn!(error = %e, "error row in response");
                    yield Err(e);
                    return;
                }
                Frame::End => return,
                Frame::Skip | Frame::Header(_) => continue,
            }
        }
    })
}

fn decode_row<T: DeserializeOwned>(
    header: &QueryStreamHeader,
    values: Json,
    shape: RowShape,
) -> KsqlResult<T> {
    let value = match (shape, values) {
        (RowShape::Record, Json::Array(values)) => header.zip_row(values)?,
        (RowShape::Record, scalar) if header.column_names.len() == 1 => {
            header.zip_row(vec![scalar])?
        }
        (RowShape::Record, other) => {
            return Err(KsqlError::Row(format!(
                "expected {} positional values, got {}",
                header.column_names.len(),
                other
            )));
        }
        (RowShape::Scalar, Json::Array(mut values)) if values.len() == 1 => values.remove(0),
        (RowShape::Scalar, Json::Array(values)) => {
            return Err(KsqlError::Row(format!(
                "scalar row with {} values",
                values.len()
            )));
        }
        (RowShape::Scalar, scalar) => scalar,
    };
    serde_json::from_value(value).map_err(|e| KsqlError::Row(e.to_string()))
}

fn parse_line(line: &str, format: ResponseFormat) -> KsqlResult<Frame> {
    match format {
        ResponseFormat::QueryStream => parse_query_stream_line(line),
        ResponseFormat::Query => parse_query_line(line),
    }
}

fn parse_query_stream_line(line: &str) -> KsqlResult<Frame> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Frame::Skip);
    }
    let json: Json =
        serde_json::from_str(line).map_err(|e| KsqlError::Row(format!("{}: {}", e, line)))?;
    match json {
        Json::Object(object) => {
            if let Some(error) = error_from(&object) {
                return Ok(Frame::Error(error));
            }
            if object.contains_key("columnNames") {
                return QueryStreamHeader::from_json(Json::Object(object)).map(Frame::Header);
            }
            // Continuation tokens and other control messages.
            Ok(Frame::Skip)
        }
        values => Ok(Frame::Values(values)),
    }
}

/// `/query` lines are elements of one JSON array: strip the framing
/// (`[`, trailing `,`, closing `]`) and read the element.
fn parse_query_line(line: &str) -> KsqlResult<Frame> {
    let mut element = line.trim();
    element = element.strip_prefix('[').unwrap_or(element).trim_start();
    element = element.strip_suffix(',').unwrap_or(element).trim_end();
    element = element.strip_suffix(']').unwrap_or(element).trim_end();
    if element.is_empty() {
        return Ok(Frame::Skip);
    }

    let json: Json = serde_json::from_str(element)
        .map_err(|e| KsqlError::Row(format!("{}: {}", e, element)))?;
    let Json::Object(object) = json else {
        return Ok(Frame::Values(json));
    };

    if let Some(error) = error_from(&object) {
        return Ok(Frame::Error(error));
    }
    if let Some(Json::Object(header)) = object.get("header") {
        let query_id = header
            .get("queryId")
            .and_then(Json::as_str)
            .map(str::to_string);
        let schema = header
            .get("schema")
            .and_then(Json::as_str)
            .ok_or_else(|| KsqlError::Header("header without a schema".to_string()))?;
        return QueryStreamHeader::from_schema(query_id, schema).map(Frame::Header);
    }
    if let Some(Json::Object(row)) = object.get("row") {
        if row.get("tombstone").and_then(Json::as_bool).unwrap_or(false) {
            return Ok(Frame::Skip);
        }
        return match row.get("columns") {
            Some(columns) => Ok(Frame::Values(columns.clone())),
            None => Err(KsqlError::Row("row without columns".to_string())),
        };
    }
    if object.contains_key("finalMessage") {
        return Ok(Frame::End);
    }
    Ok(Frame::Skip)
}

/// An error object: `@type` mentions `error`, or an `errorMessage` wrapper.
fn error_from(object: &Map<String, Json>) -> Option<KsqlError> {
    if let Some(Json::Object(inner)) = object.get("errorMessage") {
        return Some(error_fields(inner));
    }
    let kind = object.get("@type").and_then(Json::as_str)?;
    if kind.contains("error") {
        Some(error_fields(object))
    } else {
        None
    }
}

fn error_fields(object: &Map<String, Json>) -> KsqlError {
    let message = object
        .get("message")
        .and_then(Json::as_str)
        .unwrap_or("unknown error");
    let code = object
        .get("errorCode")
        .or_else(|| object.get("error_code"))
        .and_then(Json::as_i64)
        .unwrap_or_default();
    KsqlError::query(message, code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Movie {
        #[serde(rename = "Id")]
        id: i32,
        #[serde(rename = "Places")]
        places: Vec<String>,
    }

    fn lines(items: &[&str]) -> impl Stream<Item = io::Result<String>> + Send + Unpin + 'static {
        stream::iter(
            items
                .iter()
                .map(|s| Ok(s.to_string()))
                .collect::<Vec<io::Result<String>>>(),
        )
    }

    const HEADER: &str = r#"{"queryId":"q1","columnNames":["Id","Places"],"columnTypes":["INTEGER","ARRAY<STRING>"]}"#;

    #[tokio::test]
    async fn test_decode_records() {
        let source = lines(&[HEADER, r#"[1,["Place1","Place2"]]"#, "", r#"[2,[]]"#]);
        let stream = QueryStream::<Movie>::open(source, ResponseFormat::QueryStream, RowShape::Record)
            .await
            .unwrap();
        assert_eq!(stream.header().query_id.as_deref(), Some("q1"));
        let rows: Vec<_> = stream.collect().await;
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0].as_ref().unwrap(),
            &Movie {
                id: 1,
                places: vec!["Place1".into(), "Place2".into()]
            }
        );
    }

    #[tokio::test]
    async fn test_error_row_ends_stream() {
        let source = lines(&[
            HEADER,
            r#"[1,["a"]]"#,
            r#"{"@type":"generic_error","error_code":40001,"message":"boom"}"#,
            r#"[2,["b"]]"#,
        ]);
        let rows: Vec<_> =
            decode::<Movie, _>(source, ResponseFormat::QueryStream, RowShape::Record)
                .collect()
                .await;
        assert_eq!(rows.len(), 2);
        assert!(rows[0].is_ok());
        match &rows[1] {
            Err(KsqlError::Query {
                message,
                error_code,
            }) => {
                assert_eq!(message, "boom");
                assert_eq!(*error_code, 40001);
            }
            other => panic!("expected query error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_header_fails_on_open() {
        let source = lines(&[r#"[1,["a"]]"#]);
        let result =
            QueryStream::<Movie>::open(source, ResponseFormat::QueryStream, RowShape::Record).await;
        assert!(matches!(result, Err(KsqlError::Header(_))));

        let empty = lines(&[]);
        let result =
            QueryStream::<Movie>::open(empty, ResponseFormat::QueryStream, RowShape::Record).await;
        assert!(matches!(result, Err(KsqlError::Header(_))));
    }

    #[tokio::test]
    async fn test_scalar_rows() {
        let source = lines(&[
            r#"{"queryId":"q2","columnNames":["KSQL_COL_0"],"columnTypes":["STRING"]}"#,
            r#"["a"]"#,
            r#""b""#,
        ]);
        let rows: Vec<String> =
            decode::<String, _>(source, ResponseFormat::QueryStream, RowShape::Scalar)
                .map(|row| row.unwrap())
                .collect()
                .await;
        assert_eq!(rows, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_query_endpoint_format() {
        let source = lines(&[
            r#"[{"header":{"queryId":"q3","schema":"`Id` INTEGER, `Places` ARRAY<STRING>"}},"#,
            r#"{"row":{"columns":[1,["x"]]}},"#,
            r#"{"row":{"columns":null,"tombstone":true}},"#,
            r#"{"row":{"columns":[2,["y","z"]]}},"#,
            r#"{"finalMessage":"Limit Reached"}]"#,
            r#"{"row":{"columns":[3,[]]}}"#,
        ]);
        let stream = QueryStream::<Movie>::open(source, ResponseFormat::Query, RowShape::Record)
            .await
            .unwrap();
        assert_eq!(stream.header().column_types, vec!["INTEGER", "ARRAY<STRING>"]);
        let ids: Vec<i32> = stream.map(|row| row.unwrap().id).collect().await;
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_query_endpoint_error() {
        let source = lines(&[
            r#"[{"header":{"queryId":"q4","schema":"`Id` INTEGER, `Places` ARRAY<STRING>"}},"#,
            r#"{"errorMessage":{"@type":"generic_error","errorCode":50000,"message":"lost"}}]"#,
        ]);
        let rows: Vec<_> = decode::<Movie, _>(source, ResponseFormat::Query, RowShape::Record)
            .collect()
            .await;
        assert!(matches!(
            rows.as_slice(),
            [Err(KsqlError::Query { error_code: 50000, .. })]
        ));
    }

    #[tokio::test]
    async fn test_type_mismatch_is_row_error() {
        let source = lines(&[HEADER, r#"["one",[]]"#]);
        let rows: Vec<_> =
            decode::<Movie, _>(source, ResponseFormat::QueryStream, RowShape::Record)
                .collect()
                .await;
        assert!(matches!(rows.as_slice(), [Err(KsqlError::Row(_))]));
    }
}
