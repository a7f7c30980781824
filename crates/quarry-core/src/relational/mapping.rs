//! Mapping of relational result rows back into nested JSON.
//!
//! A lowered query returns one positional row per root record: scalars for
//! the root columns and one JSON column per relation. Inside that JSON,
//! every related record is an array whose positions follow the child's
//! selection order. The mapper walks both in lockstep.

use serde_json::{Map, Value};

use super::Cardinality;
use crate::error::MappingError;
use crate::value::SqlValue;

/// The shape of one selected entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// A column or computed value.
    Scalar,
    /// A related record (to-one) or list of records (to-many).
    Relation {
        /// Cardinality of the relation.
        cardinality: Cardinality,
        /// Shape of each related record.
        fields: Vec<RelationalField>,
    },
}

/// A selected entry of a relational query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationalField {
    /// Result key.
    pub key: String,
    /// Shape.
    pub kind: FieldKind,
}

/// Maps one positional row into a JSON object.
pub fn map_relational_row(selection: &[RelationalField], row: &[SqlValue]) -> Result<Value, MappingError> {
    if selection.len() != row.len() {
        return Err(MappingError::RowShape {
            expected: selection.len(),
            actual: row.len(),
        });
    }

    let mut object = Map::with_capacity(selection.len());
    for (field, value) in selection.iter().zip(row) {
        let mapped = match &field.kind {
            FieldKind::Scalar => value.to_json(),
            FieldKind::Relation { .. } => map_nested(field, relation_json(field, value)?)?,
        };
        object.insert(field.key.clone(), mapped);
    }
    Ok(Value::Object(object))
}

/// Drivers hand JSON columns back either decoded or as text.
fn relation_json(field: &RelationalField, value: &SqlValue) -> Result<Value, MappingError> {
    match value {
        SqlValue::Null => Ok(Value::Null),
        SqlValue::Json(json) => Ok(json.clone()),
        SqlValue::Text(text) => Ok(serde_json::from_str(text)?),
        _ => Err(MappingError::UnexpectedValue {
            key: field.key.clone(),
        }),
    }
}

fn map_nested(field: &RelationalField, value: Value) -> Result<Value, MappingError> {
    let FieldKind::Relation { cardinality, fields } = &field.kind else {
        return Ok(value);
    };
    match (cardinality, value) {
        (Cardinality::One, Value::Null) => Ok(Value::Null),
        (Cardinality::One, Value::Array(items)) => map_record(fields, items),
        (Cardinality::Many, Value::Null) => Ok(Value::Array(Vec::new())),
        (Cardinality::Many, Value::Array(records)) => records
            .into_iter()
            .map(|record| match record {
                Value::Array(items) => map_record(fields, items),
                _ => Err(MappingError::UnexpectedValue {
                    key: field.key.clone(),
                }),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        _ => Err(MappingError::UnexpectedValue {
            key: field.key.clone(),
        }),
    }
}

fn map_record(fields: &[RelationalField], items: Vec<Value>) -> Result<Value, MappingError> {
    if fields.len() != items.len() {
        return Err(MappingError::RowShape {
            expected: fields.len(),
            actual: items.len(),
        });
    }
    let mut object = Map::with_capacity(fields.len());
    for (field, item) in fields.iter().zip(items) {
        object.insert(field.key.clone(), map_nested(field, item)?);
    }
    Ok(Value::Object(object))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn scalar(key: &str) -> RelationalField {
        RelationalField {
            key: key.to_owned(),
            kind: FieldKind::Scalar,
        }
    }

    fn relation(key: &str, cardinality: Cardinality, fields: Vec<RelationalField>) -> RelationalField {
        RelationalField {
            key: key.to_owned(),
            kind: FieldKind::Relation {
                cardinality,
                fields,
            },
        }
    }

    fn selection() -> Vec<RelationalField> {
        vec![
            scalar("id"),
            relation(
                "posts",
                Cardinality::Many,
                vec![
                    scalar("title"),
                    relation("author", Cardinality::One, vec![scalar("name")]),
                ],
            ),
        ]
    }

    #[test]
    fn test_map_nested_row() {
        let row = vec![
            SqlValue::Int(1),
            SqlValue::Text(String::from(r#"[["a", ["ann"]], ["b", null]]"#)),
        ];
        let mapped = map_relational_row(&selection(), &row).unwrap();
        assert_eq!(
            mapped,
            json!({
                "id": 1,
                "posts": [
                    {"title": "a", "author": {"name": "ann"}},
                    {"title": "b", "author": null},
                ],
            })
        );
    }

    #[test]
    fn test_null_many_is_empty_list() {
        let row = vec![SqlValue::Int(1), SqlValue::Null];
        let mapped = map_relational_row(&selection(), &row).unwrap();
        assert_eq!(mapped, json!({"id": 1, "posts": []}));
    }

    #[test]
    fn test_decoded_json_is_accepted() {
        let row = vec![SqlValue::Int(1), SqlValue::Json(json!([]))];
        let mapped = map_relational_row(&selection(), &row).unwrap();
        assert_eq!(mapped, json!({"id": 1, "posts": []}));
    }

    #[test]
    fn test_shape_errors() {
        let err = map_relational_row(&selection(), &[SqlValue::Int(1)]).unwrap_err();
        assert!(matches!(err, MappingError::RowShape { expected: 2, actual: 1 }));

        let row = vec![SqlValue::Int(1), SqlValue::Int(5)];
        let err = map_relational_row(&selection(), &row).unwrap_err();
        assert!(matches!(err, MappingError::UnexpectedValue { key } if key == "posts"));

        let row = vec![SqlValue::Int(1), SqlValue::Text(String::from("not json"))];
        let err = map_relational_row(&selection(), &row).unwrap_err();
        assert!(matches!(err, MappingError::Json(_)));
    }
}
