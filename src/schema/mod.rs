//! Schema descriptors: the ordered column shape of a row type.
//!
//! A descriptor is produced once per type through [`KsqlSchema`], usually
//! generated by `#[derive(KsqlSchema)]`, and consumed by the statement
//! generator and by member-access compilation.

pub mod naming;

use serde::{Deserialize, Serialize};

pub use naming::pluralize;

/// Introspection interface for row types.
pub trait KsqlSchema {
    fn schema() -> SchemaDescriptor;
}

/// Column type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeKind {
    Int,
    BigInt,
    Double,
    Boolean,
    String,
    Bytes,
    Date,
    Time,
    Timestamp,
    Decimal { precision: u8, scale: u8 },
    Array(Box<TypeKind>),
    Map(Box<TypeKind>, Box<TypeKind>),
    Struct(Vec<ColumnDescriptor>),
}

impl TypeKind {
    pub fn array(element: TypeKind) -> Self {
        TypeKind::Array(Box::new(element))
    }

    pub fn map(key: TypeKind, value: TypeKind) -> Self {
        TypeKind::Map(Box::new(key), Box::new(value))
    }

    /// KSQL type text, e.g. `ARRAY<VARCHAR>` or `STRUCT<Street VARCHAR>`.
    pub fn ksql_type(&self) -> String {
        match self {
            TypeKind::Int => "INT".to_string(),
            TypeKind::BigInt => "BIGINT".to_string(),
            TypeKind::Double => "DOUBLE".to_string(),
            TypeKind::Boolean => "BOOLEAN".to_string(),
            TypeKind::String => "VARCHAR".to_string(),
            TypeKind::Bytes => "BYTES".to_string(),
            TypeKind::Date => "DATE".to_string(),
            TypeKind::Time => "TIME".to_string(),
            TypeKind::Timestamp => "TIMESTAMP".to_string(),
            TypeKind::Decimal { precision, scale } => format!("DECIMAL({}, {})", precision, scale),
            TypeKind::Array(element) => format!("ARRAY<{}>", element.ksql_type()),
            TypeKind::Map(key, value) => format!("MAP<{}, {}>", key.ksql_type(), value.ksql_type()),
            TypeKind::Struct(fields) => {
                let fields: Vec<String> = fields
                    .iter()
                    .map(|f| format!("{} {}", f.wire_name(), f.kind.ksql_type()))
                    .collect();
                format!("STRUCT<{}>", fields.join(", "))
            }
        }
    }

    /// Element of an array, or value of a map.
    pub fn element_kind(&self) -> Option<&TypeKind> {
        match self {
            TypeKind::Array(element) | TypeKind::Map(_, element) => Some(element),
            _ => None,
        }
    }

    pub fn struct_fields(&self) -> Option<&[ColumnDescriptor]> {
        match self {
            TypeKind::Struct(fields) => Some(fields),
            _ => None,
        }
    }
}

/// Key role of a column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyRole {
    #[default]
    None,
    /// `KEY` on streams, `PRIMARY KEY` on tables.
    Key,
    /// Always `PRIMARY KEY`.
    PrimaryKey,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Logical member name.
    pub name: String,
    /// Name used on the wire, when different.
    #[serde(default)]
    pub rename: Option<String>,
    pub kind: TypeKind,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub key: KeyRole,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            rename: None,
            kind,
            nullable: false,
            key: KeyRole::None,
        }
    }

    pub fn rename(mut self, wire_name: impl Into<String>) -> Self {
        self.rename = Some(wire_name.into());
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn key(mut self) -> Self {
        self.key = KeyRole::Key;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.key = KeyRole::PrimaryKey;
        self
    }

    pub fn wire_name(&self) -> &str {
        self.rename.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    /// Simple type name.
    pub name: String,
    pub columns: Vec<ColumnDescriptor>,
}

impl SchemaDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    pub fn of<T: KsqlSchema>() -> Self {
        T::schema()
    }

    pub fn column(mut self, column: ColumnDescriptor) -> Self {
        self.columns.push(column);
        self
    }

    /// Find a column by logical name.
    pub fn find(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }
}
