//! INSERT INTO ... VALUES generation.

use crate::ast::Value;
use crate::error::{KsqlError, KsqlResult};
use crate::schema::{pluralize, SchemaDescriptor, TypeKind};
use crate::transpiler::literal::{self, empty_array, with_separator, LiteralStyle};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsertProperties {
    pub entity_name: Option<String>,
    pub should_pluralize: bool,
    pub decimal_separator: char,
}

impl Default for InsertProperties {
    fn default() -> Self {
        Self {
            entity_name: None,
            should_pluralize: true,
            decimal_separator: '.',
        }
    }
}

impl InsertProperties {
    pub fn entity_name(mut self, name: impl Into<String>) -> Self {
        self.entity_name = Some(name.into());
        self
    }

    pub fn without_pluralization(mut self) -> Self {
        self.should_pluralize = false;
        self
    }
}

/// `INSERT INTO name (columns) VALUES (values);` for one instance.
///
/// The instance is materialized through `serde_json` and its fields are
/// read by wire name, falling back to the logical name. Fields the
/// instance does not serialize are left out.
pub fn insert_statement<T: Serialize>(
    schema: &SchemaDescriptor,
    instance: &T,
    properties: &InsertProperties,
) -> KsqlResult<String> {
    let json = serde_json::to_value(instance)?;
    let Json::Object(fields) = json else {
        return Err(KsqlError::invalid(format!(
            "INSERT into '{}' needs a value that serializes to an object",
            schema.name
        )));
    };

    let style = LiteralStyle {
        decimal_separator: properties.decimal_separator,
        ..LiteralStyle::default()
    }
    .lower_bools();

    let mut columns = Vec::new();
    let mut values = Vec::new();
    for column in &schema.columns {
        let Some(value) = fields
            .get(column.wire_name())
            .or_else(|| fields.get(&column.name))
        else {
            continue;
        };
        columns.push(column.wire_name().to_string());
        values.push(render(&column.kind, value, &style)?);
    }

    if columns.is_empty() {
        return Err(KsqlError::invalid(format!(
            "no columns of '{}' to insert",
            schema.name
        )));
    }

    let base = properties.entity_name.as_deref().unwrap_or(&schema.name);
    let name = if properties.should_pluralize {
        pluralize(base)
    } else {
        base.to_string()
    };

    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({});",
        name,
        columns.join(", "),
        values.join(", ")
    );
    tracing::debug!(entity = %name, statement = %sql, "generated INSERT statement");
    Ok(sql)
}

/// Render one serialized field as a literal of the column's kind.
fn render(kind: &TypeKind, value: &Json, style: &LiteralStyle) -> KsqlResult<String> {
    if value.is_null() {
        return Ok("NULL".to_string());
    }

    let rendered = match (kind, value) {
        (TypeKind::Int | TypeKind::BigInt, Json::Number(n)) => match n.as_i64() {
            Some(i) => literal::print(&Value::Int(i), style),
            None => n.to_string(),
        },
        (TypeKind::Double, Json::Number(n)) => {
            literal::print(&Value::Float(n.as_f64().unwrap_or_default()), style)
        }
        (TypeKind::Decimal { .. }, Json::Number(n)) => {
            with_separator(n.to_string(), style.decimal_separator)
        }
        (TypeKind::Decimal { .. }, Json::String(s)) => {
            with_separator(s.clone(), style.decimal_separator)
        }
        (TypeKind::Boolean, Json::Bool(b)) => literal::print(&Value::Bool(*b), style),
        (
            TypeKind::String | TypeKind::Date | TypeKind::Time | TypeKind::Timestamp,
            Json::String(s),
        ) => literal::print(&Value::String(s.clone()), style),
        (TypeKind::Bytes, Json::Array(items)) => {
            let bytes = items
                .iter()
                .map(|b| {
                    b.as_u64()
                        .and_then(|b| u8::try_from(b).ok())
                        .ok_or_else(|| KsqlError::invalid("byte array element out of range"))
                })
                .collect::<KsqlResult<Vec<u8>>>()?;
            literal::print(&Value::Bytes(bytes), style)
        }
        (TypeKind::Array(element), Json::Array(items)) => {
            if items.is_empty() {
                empty_array(Some(element))
            } else {
                let items = items
                    .iter()
                    .map(|item| render(element, item, style))
                    .collect::<KsqlResult<Vec<_>>>()?;
                format!("ARRAY[{}]", items.join(", "))
            }
        }
        (TypeKind::Map(key, element), Json::Object(entries)) => {
            let entries = entries
                .iter()
                .map(|(k, v)| {
                    let key = render(key, &Json::String(k.clone()), style)?;
                    Ok(format!("{} := {}", key, render(element, v, style)?))
                })
                .collect::<KsqlResult<Vec<_>>>()?;
            format!("MAP({})", entries.join(", "))
        }
        (TypeKind::Struct(fields), Json::Object(entries)) => {
            let mut parts = Vec::new();
            for field in fields {
                let Some(v) = entries
                    .get(field.wire_name())
                    .or_else(|| entries.get(&field.name))
                else {
                    continue;
                };
                parts.push(format!(
                    "{} := {}",
                    field.wire_name(),
                    render(&field.kind, v, style)?
                ));
            }
            format!("STRUCT({})", parts.join(", "))
        }
        // Map keys arrive as JSON strings whatever their declared kind.
        (TypeKind::Int | TypeKind::BigInt, Json::String(s)) if s.parse::<i64>().is_ok() => {
            s.clone()
        }
        (kind, value) => {
            return Err(KsqlError::invalid(format!(
                "value {} does not fit column type {}",
                value,
                kind.ksql_type()
            )));
        }
    };
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnDescriptor;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    #[derive(Serialize)]
    struct Movie {
        #[serde(rename = "Title")]
        title: String,
        #[serde(rename = "Id")]
        id: i32,
        #[serde(rename = "Rating")]
        rating: f64,
        #[serde(rename = "Tags")]
        tags: Vec<String>,
        #[serde(rename = "Released")]
        released: bool,
    }

    fn schema() -> SchemaDescriptor {
        SchemaDescriptor::new("Movie")
            .column(ColumnDescriptor::new("Title", TypeKind::String))
            .column(ColumnDescriptor::new("Id", TypeKind::Int).key())
            .column(ColumnDescriptor::new("Rating", TypeKind::Double))
            .column(ColumnDescriptor::new("Tags", TypeKind::array(TypeKind::String)))
            .column(ColumnDescriptor::new("Released", TypeKind::Boolean))
    }

    #[test]
    fn test_insert_in_schema_order() {
        let movie = Movie {
            title: "Aliens".into(),
            id: 1,
            rating: 8.4,
            tags: vec!["scifi".into()],
            released: true,
        };
        let sql = insert_statement(&schema(), &movie, &InsertProperties::default()).unwrap();
        assert_eq!(
            sql,
            "INSERT INTO Movies (Title, Id, Rating, Tags, Released) \
             VALUES ('Aliens', 1, 8.4, ARRAY['scifi'], true);"
        );
    }

    #[test]
    fn test_empty_array_uses_typed_idiom() {
        let movie = Movie {
            title: "Alien".into(),
            id: 2,
            rating: 8.5,
            tags: vec![],
            released: false,
        };
        let props = InsertProperties::default()
            .entity_name("Films")
            .without_pluralization();
        let sql = insert_statement(&schema(), &movie, &props).unwrap();
        assert_eq!(
            sql,
            "INSERT INTO Films (Title, Id, Rating, Tags, Released) \
             VALUES ('Alien', 2, 8.5, ARRAY_REMOVE(ARRAY[''], ''), false);"
        );
    }

    #[test]
    fn test_map_and_struct_columns() {
        #[derive(Serialize)]
        struct Row {
            #[serde(rename = "Scores")]
            scores: BTreeMap<String, i32>,
            #[serde(rename = "Address")]
            address: Address,
        }
        #[derive(Serialize)]
        struct Address {
            #[serde(rename = "No")]
            number: i32,
        }

        let schema = SchemaDescriptor::new("Row")
            .column(ColumnDescriptor::new(
                "Scores",
                TypeKind::map(TypeKind::String, TypeKind::Int),
            ))
            .column(ColumnDescriptor::new(
                "Address",
                TypeKind::Struct(vec![ColumnDescriptor::new("Number", TypeKind::Int).rename("No")]),
            ));
        let row = Row {
            scores: BTreeMap::from([("a".to_string(), 1), ("b".to_string(), 2)]),
            address: Address { number: 7 },
        };
        let sql = insert_statement(&schema, &row, &InsertProperties::default()).unwrap();
        assert_eq!(
            sql,
            "INSERT INTO Rows (Scores, Address) VALUES (MAP('a' := 1, 'b' := 2), STRUCT(No := 7));"
        );
    }

    #[test]
    fn test_scalar_instance_is_rejected() {
        let err = insert_statement(&schema(), &5, &InsertProperties::default()).unwrap_err();
        assert!(matches!(err, KsqlError::InvalidQuery(_)));
    }
}
