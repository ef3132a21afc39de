//! Binder for nested paths into the variable document

use flowlink_core::domain::job::ActivatedJob;
use serde_json::Value;

use super::{Binder, Binding, BindingResult, ParameterSpec};

/// Descends the variables along a dot-separated path
///
/// An empty or missing path maps the whole document. Missing segments, `null`
/// and non-map intermediate values all bind to nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct MapperBinder;

impl Binder for MapperBinder {
    fn bind(&self, job: &ActivatedJob, parameter: &ParameterSpec) -> BindingResult {
        let path = match &parameter.binding {
            Binding::Mapper { path, .. } => path.as_deref().unwrap_or(""),
            _ => "",
        };

        if path.is_empty() {
            let document = Value::Object(job.variables.clone());
            return BindingResult::from_conversion(parameter.target.convert(&document));
        }

        let mut segments = path.split('.');
        let Some(first) = segments.next() else {
            return BindingResult::Empty;
        };
        let mut current = match job.variables.get(first) {
            Some(value) => value,
            None => return BindingResult::Empty,
        };

        for segment in segments {
            current = match current {
                Value::Object(map) => match map.get(segment) {
                    Some(value) => value,
                    None => return BindingResult::Empty,
                },
                _ => return BindingResult::Empty,
            };
        }

        BindingResult::from_conversion(parameter.target.convert(current))
    }
}
