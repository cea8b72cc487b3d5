//! CREATE STREAM / CREATE TABLE generation.

use crate::ast::Query;
use crate::config::CompileOptions;
use crate::error::{KsqlError, KsqlResult};
use crate::schema::{pluralize, ColumnDescriptor, KeyRole, SchemaDescriptor};
use crate::transpiler::context::CompileContext;
use crate::transpiler::select::select_body;
use serde::{Deserialize, Serialize};

/// Kafka record serialization formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SerializationFormat {
    None,
    Delimited,
    Json,
    #[serde(rename = "Json_SR")]
    JsonSr,
    Avro,
    Kafka,
    Protobuf,
    #[serde(rename = "Protobuf_NoSR")]
    ProtobufNoSr,
}

impl std::fmt::Display for SerializationFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SerializationFormat::None => write!(f, "None"),
            SerializationFormat::Delimited => write!(f, "Delimited"),
            SerializationFormat::Json => write!(f, "Json"),
            SerializationFormat::JsonSr => write!(f, "Json_SR"),
            SerializationFormat::Avro => write!(f, "Avro"),
            SerializationFormat::Kafka => write!(f, "Kafka"),
            SerializationFormat::Protobuf => write!(f, "Protobuf"),
            SerializationFormat::ProtobufNoSr => write!(f, "Protobuf_NoSR"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowType {
    Session,
    Hopping,
    Tumbling,
}

impl std::fmt::Display for WindowType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WindowType::Session => write!(f, "SESSION"),
            WindowType::Hopping => write!(f, "HOPPING"),
            WindowType::Tumbling => write!(f, "TUMBLING"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    CreateStream,
    CreateOrReplaceStream,
    CreateSourceStream,
    CreateTable,
    CreateOrReplaceTable,
    CreateSourceTable,
}

impl StatementKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            StatementKind::CreateStream => "CREATE STREAM",
            StatementKind::CreateOrReplaceStream => "CREATE OR REPLACE STREAM",
            StatementKind::CreateSourceStream => "CREATE SOURCE STREAM",
            StatementKind::CreateTable => "CREATE TABLE",
            StatementKind::CreateOrReplaceTable => "CREATE OR REPLACE TABLE",
            StatementKind::CreateSourceTable => "CREATE SOURCE TABLE",
        }
    }

    pub fn is_table(&self) -> bool {
        matches!(
            self,
            StatementKind::CreateTable
                | StatementKind::CreateOrReplaceTable
                | StatementKind::CreateSourceTable
        )
    }

    fn is_replace(&self) -> bool {
        matches!(
            self,
            StatementKind::CreateOrReplaceStream | StatementKind::CreateOrReplaceTable
        )
    }

    fn is_source(&self) -> bool {
        matches!(
            self,
            StatementKind::CreateSourceStream | StatementKind::CreateSourceTable
        )
    }
}

/// Properties of a CREATE statement. Only the fields that are set end up
/// in the WITH clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityCreationMetadata {
    pub entity_name: Option<String>,
    pub should_pluralize: bool,
    pub kafka_topic: Option<String>,
    pub key_format: Option<SerializationFormat>,
    pub value_format: Option<SerializationFormat>,
    pub value_delimiter: Option<String>,
    pub partitions: Option<u32>,
    pub replicas: Option<u32>,
    pub timestamp: Option<String>,
    pub timestamp_format: Option<String>,
    pub wrap_single_value: Option<bool>,
    pub window_type: Option<WindowType>,
    pub window_size: Option<String>,
}

impl Default for EntityCreationMetadata {
    fn default() -> Self {
        Self {
            entity_name: None,
            should_pluralize: true,
            kafka_topic: None,
            key_format: None,
            value_format: Some(SerializationFormat::Json),
            value_delimiter: None,
            partitions: None,
            replicas: None,
            timestamp: None,
            timestamp_format: None,
            wrap_single_value: None,
            window_type: None,
            window_size: None,
        }
    }
}

impl EntityCreationMetadata {
    pub fn new(kafka_topic: impl Into<String>) -> Self {
        Self {
            kafka_topic: Some(kafka_topic.into()),
            ..Self::default()
        }
    }

    pub fn entity_name(mut self, name: impl Into<String>) -> Self {
        self.entity_name = Some(name.into());
        self
    }

    pub fn without_pluralization(mut self) -> Self {
        self.should_pluralize = false;
        self
    }

    pub fn partitions(mut self, partitions: u32) -> Self {
        self.partitions = Some(partitions);
        self
    }

    pub fn replicas(mut self, replicas: u32) -> Self {
        self.replicas = Some(replicas);
        self
    }

    pub fn key_format(mut self, format: SerializationFormat) -> Self {
        self.key_format = Some(format);
        self
    }

    pub fn value_format(mut self, format: Option<SerializationFormat>) -> Self {
        self.value_format = format;
        self
    }

    pub fn value_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.value_delimiter = Some(delimiter.into());
        self
    }

    pub fn timestamp(mut self, column: impl Into<String>, format: Option<&str>) -> Self {
        self.timestamp = Some(column.into());
        self.timestamp_format = format.map(str::to_string);
        self
    }

    pub fn wrap_single_value(mut self, wrap: bool) -> Self {
        self.wrap_single_value = Some(wrap);
        self
    }

    pub fn windowed(mut self, window_type: WindowType, size: Option<&str>) -> Self {
        self.window_type = Some(window_type);
        self.window_size = size.map(str::to_string);
        self
    }

    /// Entity name for a schema: the explicit name or the type name,
    /// pluralized unless disabled.
    pub fn resolve_name(&self, type_name: &str) -> String {
        let base = self.entity_name.as_deref().unwrap_or(type_name);
        if self.should_pluralize {
            pluralize(base)
        } else {
            base.to_string()
        }
    }

    /// `KEY='VALUE'` pairs in a fixed order.
    pub fn properties(&self) -> Vec<String> {
        let value_format = match (self.value_format, self.window_type) {
            (None, Some(_)) => Some(SerializationFormat::Json),
            (format, _) => format,
        };

        let mut props: Vec<(&str, String)> = Vec::new();
        if let Some(topic) = &self.kafka_topic {
            props.push(("KAFKA_TOPIC", topic.clone()));
        }
        if let Some(format) = self.key_format {
            props.push(("KEY_FORMAT", format.to_string()));
        }
        if let Some(format) = value_format {
            props.push(("VALUE_FORMAT", format.to_string()));
        }
        if let Some(delimiter) = &self.value_delimiter {
            props.push(("VALUE_DELIMITER", delimiter.clone()));
        }
        if let Some(n) = self.partitions {
            props.push(("PARTITIONS", n.to_string()));
        }
        if let Some(n) = self.replicas {
            props.push(("REPLICAS", n.to_string()));
        }
        if let Some(column) = &self.timestamp {
            props.push(("TIMESTAMP", column.clone()));
        }
        if let Some(format) = &self.timestamp_format {
            props.push(("TIMESTAMP_FORMAT", format.clone()));
        }
        if let Some(wrap) = self.wrap_single_value {
            props.push(("WRAP_SINGLE_VALUE", wrap.to_string()));
        }
        if let Some(window_type) = self.window_type {
            props.push(("WINDOW_TYPE", window_type.to_string()));
        }
        if let Some(size) = &self.window_size {
            props.push(("WINDOW_SIZE", size.clone()));
        }

        props
            .into_iter()
            .map(|(key, value)| format!("{}='{}'", key, value))
            .collect()
    }

    fn with_clause(&self) -> String {
        let props = self.properties();
        if props.is_empty() {
            String::new()
        } else {
            format!(" WITH ( {} )", props.join(", "))
        }
    }
}

fn statement_head(kind: StatementKind, if_not_exists: bool, name: &str) -> KsqlResult<String> {
    if if_not_exists && kind.is_replace() {
        return Err(KsqlError::unsupported("IF NOT EXISTS with OR REPLACE"));
    }
    let mut sql = String::from(kind.keyword());
    if if_not_exists {
        sql.push_str(" IF NOT EXISTS");
    }
    sql.push(' ');
    sql.push_str(name);
    Ok(sql)
}

fn column_definition(column: &ColumnDescriptor, kind: StatementKind) -> String {
    let mut def = format!("{} {}", column.wire_name(), column.kind.ksql_type());
    match column.key {
        KeyRole::None => {}
        KeyRole::PrimaryKey => def.push_str(" PRIMARY KEY"),
        KeyRole::Key if kind.is_table() => def.push_str(" PRIMARY KEY"),
        KeyRole::Key => def.push_str(" KEY"),
    }
    def
}

/// `CREATE {STREAM|TABLE} name (columns) WITH ( ... );`
pub fn create_statement(
    schema: &SchemaDescriptor,
    metadata: &EntityCreationMetadata,
    kind: StatementKind,
    if_not_exists: bool,
) -> KsqlResult<String> {
    if schema.columns.is_empty() {
        return Err(KsqlError::invalid(format!(
            "type '{}' has no columns to create",
            schema.name
        )));
    }

    let name = metadata.resolve_name(&schema.name);
    let mut sql = statement_head(kind, if_not_exists, &name)?;

    let columns: Vec<String> = schema
        .columns
        .iter()
        .map(|c| column_definition(c, kind))
        .collect();
    sql.push_str(&format!(" ({})", columns.join(", ")));
    sql.push_str(&metadata.with_clause());
    sql.push(';');

    tracing::debug!(entity = %name, statement = %sql, "generated CREATE statement");
    Ok(sql)
}

/// `CREATE {STREAM|TABLE} name WITH ( ... ) AS SELECT ...;`, a persistent
/// query. The entity name comes from the metadata, else from the query's
/// source.
pub fn create_as_select(
    query: &Query,
    metadata: &EntityCreationMetadata,
    kind: StatementKind,
    if_not_exists: bool,
    options: &CompileOptions,
) -> KsqlResult<String> {
    if kind.is_source() {
        return Err(KsqlError::unsupported("CREATE SOURCE ... AS SELECT"));
    }
    let name = match (&metadata.entity_name, query.source()) {
        (Some(name), _) => name.clone(),
        (None, Some(source)) => source.base_name().to_string(),
        (None, None) => return Err(KsqlError::invalid("query does not start with a source")),
    };

    let mut ctx = CompileContext::new(options);
    let select = select_body(query, &mut ctx)?;

    let mut sql = statement_head(kind, if_not_exists, &name)?;
    sql.push_str(&metadata.with_clause());
    sql.push_str(" AS ");
    sql.push_str(&select);
    sql.push(';');

    tracing::debug!(entity = %name, statement = %sql, "generated CREATE AS SELECT");
    Ok(sql)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TypeKind;
    use pretty_assertions::assert_eq;

    fn movie() -> SchemaDescriptor {
        SchemaDescriptor::new("Movie")
            .column(ColumnDescriptor::new("Id", TypeKind::Int).key())
            .column(ColumnDescriptor::new("Title", TypeKind::String))
            .column(ColumnDescriptor::new("Release_Year", TypeKind::Int))
    }

    #[test]
    fn test_create_table() {
        let metadata = EntityCreationMetadata::new("t").partitions(1).replicas(1);
        let sql = create_statement(&movie(), &metadata, StatementKind::CreateTable, false).unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE Movies (Id INT PRIMARY KEY, Title VARCHAR, Release_Year INT) \
             WITH ( KAFKA_TOPIC='t', VALUE_FORMAT='Json', PARTITIONS='1', REPLICAS='1' );"
        );
    }

    #[test]
    fn test_stream_key_and_if_not_exists() {
        let metadata = EntityCreationMetadata::new("movies").without_pluralization();
        let sql =
            create_statement(&movie(), &metadata, StatementKind::CreateStream, true).unwrap();
        assert_eq!(
            sql,
            "CREATE STREAM IF NOT EXISTS Movie (Id INT KEY, Title VARCHAR, Release_Year INT) \
             WITH ( KAFKA_TOPIC='movies', VALUE_FORMAT='Json' );"
        );
    }

    #[test]
    fn test_replace_with_if_not_exists_is_rejected() {
        let metadata = EntityCreationMetadata::new("t");
        let err = create_statement(&movie(), &metadata, StatementKind::CreateOrReplaceTable, true)
            .unwrap_err();
        assert!(matches!(err, KsqlError::Unsupported(_)));
    }

    #[test]
    fn test_window_metadata_forces_json() {
        let metadata = EntityCreationMetadata::new("t")
            .value_format(None)
            .windowed(WindowType::Tumbling, Some("10 SECONDS"));
        assert_eq!(
            metadata.properties(),
            vec![
                "KAFKA_TOPIC='t'",
                "VALUE_FORMAT='Json'",
                "WINDOW_TYPE='TUMBLING'",
                "WINDOW_SIZE='10 SECONDS'",
            ]
        );
    }

    #[test]
    fn test_all_properties_in_order() {
        let metadata = EntityCreationMetadata::new("t")
            .key_format(SerializationFormat::Kafka)
            .value_format(Some(SerializationFormat::Delimited))
            .value_delimiter("|")
            .timestamp("Ts", Some("yyyy-MM-dd"))
            .wrap_single_value(false);
        assert_eq!(
            metadata.properties().join(", "),
            "KAFKA_TOPIC='t', KEY_FORMAT='Kafka', VALUE_FORMAT='Delimited', VALUE_DELIMITER='|', \
             TIMESTAMP='Ts', TIMESTAMP_FORMAT='yyyy-MM-dd', WRAP_SINGLE_VALUE='false'"
        );
    }

    #[test]
    fn test_empty_schema_is_invalid() {
        let err = create_statement(
            &SchemaDescriptor::new("Empty"),
            &EntityCreationMetadata::default(),
            StatementKind::CreateStream,
            false,
        )
        .unwrap_err();
        assert!(matches!(err, KsqlError::InvalidQuery(_)));
    }
}
