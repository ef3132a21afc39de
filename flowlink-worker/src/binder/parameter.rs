//! Handler parameter declarations

use serde_json::Value;

/// How a parameter obtains its value from a job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    /// Well-known job metadata, or the reserved `headers` / `variables` names
    Default,
    /// A top-level variable, named explicitly or after the parameter
    Variable { name: Option<String> },
    /// A custom header, named explicitly or after the parameter
    Header { name: Option<String> },
    /// A value reached by a dot-separated path into the variables
    ///
    /// With no path the whole variable document is mapped. `fields` lists the
    /// target type's field names and only matters in that case.
    Mapper {
        path: Option<String>,
        fields: Vec<String>,
    },
    /// A binding handled by a user-registered binder
    Custom {
        kind: String,
        argument: Option<String>,
    },
}

impl Binding {
    pub fn variable(name: impl Into<String>) -> Self {
        Self::Variable {
            name: Some(name.into()),
        }
    }

    pub fn header(name: impl Into<String>) -> Self {
        Self::Header {
            name: Some(name.into()),
        }
    }

    pub fn path(path: impl Into<String>) -> Self {
        Self::Mapper {
            path: Some(path.into()),
            fields: Vec::new(),
        }
    }

    /// Map the whole variable document into a type with the given fields
    pub fn document<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Mapper {
            path: None,
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn kind(&self) -> BindingKind {
        match self {
            Self::Default => BindingKind::Default,
            Self::Variable { .. } => BindingKind::Variable,
            Self::Header { .. } => BindingKind::Header,
            Self::Mapper { .. } => BindingKind::Mapper,
            Self::Custom { kind, .. } => BindingKind::Custom(kind.clone()),
        }
    }
}

/// Key under which a binder is registered
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BindingKind {
    Default,
    Variable,
    Header,
    Mapper,
    Custom(String),
}

/// Type a bound value must convert to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetType {
    Any,
    Bool,
    Integer,
    Float,
    String,
    Map,
    List,
    /// A struct-shaped document
    Object,
    /// The activated job itself
    Job,
}

impl TargetType {
    /// Convert a looked-up value, or `None` when it does not fit
    ///
    /// `null` never converts.
    pub fn convert(self, value: &Value) -> Option<Value> {
        match (self, value) {
            (_, Value::Null) => None,
            (Self::Any, v) => Some(v.clone()),
            (Self::Bool, Value::Bool(_)) => Some(value.clone()),
            (Self::Bool, Value::String(s)) => s.parse::<bool>().ok().map(Value::Bool),
            (Self::Integer, Value::Number(n)) => {
                if n.is_i64() || n.is_u64() {
                    Some(value.clone())
                } else {
                    n.as_f64()
                        .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                        .map(|f| Value::from(f as i64))
                }
            }
            (Self::Integer, Value::String(s)) => s.trim().parse::<i64>().ok().map(Value::from),
            (Self::Float, Value::Number(n)) => n.as_f64().map(Value::from),
            (Self::Float, Value::String(s)) => s.trim().parse::<f64>().ok().map(Value::from),
            (Self::String, Value::String(_)) => Some(value.clone()),
            (Self::String, Value::Number(n)) => Some(Value::String(n.to_string())),
            (Self::String, Value::Bool(b)) => Some(Value::String(b.to_string())),
            (Self::Map | Self::Object, Value::Object(_)) => Some(value.clone()),
            (Self::List, Value::Array(_)) => Some(value.clone()),
            _ => None,
        }
    }
}

/// One declared handler parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSpec {
    pub name: String,
    pub binding: Binding,
    pub target: TargetType,
    /// Whether the handler accepts an absent value
    pub nullable: bool,
}

impl ParameterSpec {
    /// A required parameter
    pub fn new(name: impl Into<String>, binding: Binding, target: TargetType) -> Self {
        Self {
            name: name.into(),
            binding,
            target,
            nullable: false,
        }
    }

    pub fn optional(mut self) -> Self {
        self.nullable = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_convert_scalars() {
        assert_eq!(TargetType::Integer.convert(&json!(5)), Some(json!(5)));
        assert_eq!(TargetType::Integer.convert(&json!(5.0)), Some(json!(5)));
        assert_eq!(TargetType::Integer.convert(&json!(5.5)), None);
        assert_eq!(TargetType::Integer.convert(&json!("42")), Some(json!(42)));
        assert_eq!(TargetType::Float.convert(&json!(2)), Some(json!(2.0)));
        assert_eq!(TargetType::String.convert(&json!(7)), Some(json!("7")));
        assert_eq!(TargetType::Bool.convert(&json!("true")), Some(json!(true)));
    }

    #[test]
    fn test_convert_rejects_shape_mismatch() {
        assert_eq!(TargetType::Integer.convert(&json!({"c": 5})), None);
        assert_eq!(TargetType::Map.convert(&json!([1, 2])), None);
        assert_eq!(TargetType::List.convert(&json!([1, 2])), Some(json!([1, 2])));
        assert_eq!(TargetType::Object.convert(&json!({"c": 5})), Some(json!({"c": 5})));
        assert_eq!(TargetType::Any.convert(&Value::Null), None);
        assert_eq!(TargetType::Job.convert(&json!({})), None);
    }

    #[test]
    fn test_binding_kind() {
        assert_eq!(Binding::variable("a").kind(), BindingKind::Variable);
        assert_eq!(Binding::document(["a"]).kind(), BindingKind::Mapper);
        let custom = Binding::Custom {
            kind: "env".to_string(),
            argument: None,
        };
        assert_eq!(custom.kind(), BindingKind::Custom("env".to_string()));
    }
}
