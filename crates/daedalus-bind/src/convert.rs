//! Synchronous structural conversion.
//!
//! Coerces bound values toward their declared types, recursing into
//! class properties and array elements. Conversion never throws; it
//! collects one issue per offending path and returns the best value it
//! could produce, so the validator can report every problem at once.

use serde_json::Value;

use daedalus_core::ValidationIssue;
use daedalus_reflect::{DataType, Primitive, TypeSpace};

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{s}\""),
        other => other.to_string(),
    }
}

fn push_issue(issues: &mut Vec<ValidationIssue>, path: &[String], value: &Value, target: &str) {
    issues.push(ValidationIssue::new(
        path.to_vec(),
        format!("Unable to convert {} to {target}", render(value)),
    ));
}

fn convert_primitive(
    primitive: Primitive,
    value: Value,
    path: &[String],
    issues: &mut Vec<ValidationIssue>,
) -> Value {
    match primitive {
        Primitive::Number => match &value {
            Value::Number(_) => value,
            // Integer parses keep integer representation so coerced
            // ids compare equal to stored ones.
            Value::String(s) => {
                let trimmed = s.trim();
                if let Ok(int) = trimmed.parse::<i64>() {
                    Value::from(int)
                } else if let Some(float) = trimmed
                    .parse::<f64>()
                    .ok()
                    .and_then(serde_json::Number::from_f64)
                {
                    Value::Number(float)
                } else {
                    push_issue(issues, path, &value, Primitive::Number.name());
                    value
                }
            }
            _ => {
                push_issue(issues, path, &value, Primitive::Number.name());
                value
            }
        },
        Primitive::String => match &value {
            Value::String(_) => value,
            Value::Number(n) => Value::String(n.to_string()),
            Value::Bool(b) => Value::String(b.to_string()),
            _ => {
                push_issue(issues, path, &value, Primitive::String.name());
                value
            }
        },
        Primitive::Boolean => match &value {
            Value::Bool(_) => value,
            Value::String(s) => match s.as_str() {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                _ => {
                    push_issue(issues, path, &value, Primitive::Boolean.name());
                    value
                }
            },
            _ => {
                push_issue(issues, path, &value, Primitive::Boolean.name());
                value
            }
        },
    }
}

/// Converts a value toward a declared type, appending an issue per
/// mismatching path. `Null` passes through untouched; whether null is
/// acceptable is the validator's required check, not a conversion
/// concern.
#[must_use]
pub fn convert(
    space: &TypeSpace,
    value: Value,
    ty: &DataType,
    path: &mut Vec<String>,
    issues: &mut Vec<ValidationIssue>,
) -> Value {
    if value.is_null() {
        return value;
    }
    match ty {
        DataType::Unknown | DataType::Symbol(_) => value,
        DataType::Primitive(primitive) => convert_primitive(*primitive, value, path, issues),
        DataType::Array(inner) => match value {
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(index, item)| {
                        path.push(index.to_string());
                        let converted = convert(space, item, inner, path, issues);
                        path.pop();
                        converted
                    })
                    .collect(),
            ),
            other => {
                push_issue(issues, path, &other, "Array");
                other
            }
        },
        DataType::Class(id) => {
            let Value::Object(mut fields) = value else {
                let name = space.registry().name_of(*id);
                push_issue(issues, path, &value, &name);
                return value;
            };
            match space.reflect(*id) {
                Ok(reflection) => {
                    for property in &reflection.properties {
                        if let Some(field) = fields.remove(&property.name) {
                            path.push(property.name.clone());
                            let converted = convert(space, field, &property.ty, path, issues);
                            path.pop();
                            fields.insert(property.name.clone(), converted);
                        }
                    }
                }
                Err(err) => {
                    issues.push(ValidationIssue::new(path.clone(), err.to_string()));
                }
            }
            Value::Object(fields)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daedalus_reflect::{array, boolean, class, number, string};

    fn run(space: &TypeSpace, value: Value, ty: &DataType) -> (Value, Vec<ValidationIssue>) {
        let mut path = Vec::new();
        let mut issues = Vec::new();
        let converted = convert(space, value, ty, &mut path, &mut issues);
        (converted, issues)
    }

    #[test]
    fn test_string_to_number_coercion() {
        let space = TypeSpace::new();
        let (value, issues) = run(&space, serde_json::json!("42"), &number());
        assert!(issues.is_empty());
        assert_eq!(value, serde_json::json!(42));
    }

    #[test]
    fn test_unconvertible_number_reports_path() {
        let space = TypeSpace::new();
        let (_, issues) = run(&space, serde_json::json!("abc"), &number());
        assert_eq!(issues.len(), 1);
        assert!(issues[0].path.is_empty());
        assert_eq!(issues[0].messages[0], "Unable to convert \"abc\" to Number");
    }

    #[test]
    fn test_boolean_coercion() {
        let space = TypeSpace::new();
        let (value, issues) = run(&space, serde_json::json!("true"), &boolean());
        assert!(issues.is_empty());
        assert_eq!(value, serde_json::json!(true));

        let (_, issues) = run(&space, serde_json::json!("yes"), &boolean());
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn test_array_elements_convert_with_indexed_paths() {
        let space = TypeSpace::new();
        let (value, issues) = run(
            &space,
            serde_json::json!(["1", "x", "3"]),
            &array(number()),
        );
        assert_eq!(value[0], serde_json::json!(1));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, vec!["1"]);
    }

    #[test]
    fn test_class_properties_convert_recursively() {
        let space = TypeSpace::new();
        let owner = space
            .define("Owner")
            .property("id", number())
            .register()
            .expect("owner");
        let animal = space
            .define("Animal")
            .property("name", string())
            .property("owner", class(owner))
            .register()
            .expect("animal");

        let (value, issues) = run(
            &space,
            serde_json::json!({"name": "Rex", "owner": {"id": "abc"}}),
            &class(animal),
        );
        assert_eq!(value["name"], "Rex");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, vec!["owner", "id"]);
        assert_eq!(
            issues[0].messages[0],
            "Unable to convert \"abc\" to Number"
        );
    }

    #[test]
    fn test_null_passes_through() {
        let space = TypeSpace::new();
        let (value, issues) = run(&space, Value::Null, &number());
        assert!(issues.is_empty());
        assert!(value.is_null());
    }

    #[test]
    fn test_undeclared_fields_are_kept() {
        let space = TypeSpace::new();
        let dto = space
            .define("Dto")
            .property("id", number())
            .register()
            .expect("dto");
        let (value, issues) = run(
            &space,
            serde_json::json!({"id": "1", "extra": true}),
            &class(dto),
        );
        assert!(issues.is_empty());
        assert_eq!(value["extra"], serde_json::json!(true));
        assert_eq!(value["id"], serde_json::json!(1));
    }
}
