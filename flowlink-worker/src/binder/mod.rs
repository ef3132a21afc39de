//! Argument binding
//!
//! Turns an activated job into the arguments a handler declared. Each
//! parameter's [`Binding`] selects a [`Binder`] from the [`BinderRegistry`];
//! kinds without a registered binder fall back to the [`DefaultBinder`].
//!
//! Binders signal a missing value with [`BindingResult::Empty`]. Whether an
//! empty value is acceptable is decided afterwards from the parameter's
//! nullability.

mod default;
mod lookup;
mod mapper;
mod parameter;

pub use default::DefaultBinder;
pub use lookup::{HeaderBinder, VariableBinder};
pub use mapper::MapperBinder;
pub use parameter::{Binding, BindingKind, ParameterSpec, TargetType};

use flowlink_core::domain::job::ActivatedJob;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::handler::{Arguments, HandlerError};

/// Outcome of binding one parameter
#[derive(Debug, Clone, PartialEq)]
pub enum BindingResult {
    /// A value converted to the parameter's target type
    Present(Value),
    /// No value; legal only for nullable parameters
    Empty,
    /// A required parameter had no value
    Missing { parameter: String },
}

impl BindingResult {
    pub(crate) fn from_conversion(value: Option<Value>) -> Self {
        match value {
            Some(value) => Self::Present(value),
            None => Self::Empty,
        }
    }
}

/// Resolves one parameter from a job
///
/// Implementations must not fail for a value that is simply absent.
pub trait Binder: Send + Sync {
    fn bind(&self, job: &ActivatedJob, parameter: &ParameterSpec) -> BindingResult;
}

/// Binders keyed by binding kind
#[derive(Clone)]
pub struct BinderRegistry {
    binders: HashMap<BindingKind, Arc<dyn Binder>>,
    fallback: Arc<dyn Binder>,
}

impl BinderRegistry {
    /// Registry with only the default binder
    pub fn empty() -> Self {
        Self {
            binders: HashMap::new(),
            fallback: Arc::new(DefaultBinder),
        }
    }

    /// Register a binder, returning the one it replaces
    pub fn register(
        &mut self,
        kind: BindingKind,
        binder: Arc<dyn Binder>,
    ) -> Option<Arc<dyn Binder>> {
        self.binders.insert(kind, binder)
    }

    pub fn binder_for(&self, kind: &BindingKind) -> &dyn Binder {
        self.binders
            .get(kind)
            .map(Arc::as_ref)
            .unwrap_or(self.fallback.as_ref())
    }

    /// Bind one parameter and apply its nullability
    pub fn bind(&self, job: &ActivatedJob, parameter: &ParameterSpec) -> BindingResult {
        match self.binder_for(&parameter.binding.kind()).bind(job, parameter) {
            BindingResult::Empty if !parameter.nullable => BindingResult::Missing {
                parameter: parameter.name.clone(),
            },
            result => result,
        }
    }

    /// Bind every declared parameter
    ///
    /// Fails on the first required parameter without a value.
    pub fn bind_all(
        &self,
        job: Arc<ActivatedJob>,
        parameters: &[ParameterSpec],
    ) -> Result<Arguments, HandlerError> {
        let mut values = Vec::with_capacity(parameters.len());
        for parameter in parameters {
            let value = match self.bind(&job, parameter) {
                BindingResult::Present(value) => Some(value),
                BindingResult::Empty => None,
                BindingResult::Missing { parameter } => {
                    return Err(HandlerError::missing_argument(&parameter));
                }
            };
            values.push((parameter.name.clone(), value));
        }
        Ok(Arguments::new(job, values))
    }
}

impl Default for BinderRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(BindingKind::Variable, Arc::new(VariableBinder));
        registry.register(BindingKind::Header, Arc::new(HeaderBinder));
        registry.register(BindingKind::Mapper, Arc::new(MapperBinder));
        registry
    }
}

impl std::fmt::Debug for BinderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinderRegistry")
            .field("kinds", &self.binders.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Variable names a worker needs from the broker
///
/// The union, in declaration order and without duplicates, of the declared
/// names, the names of variable parameters, and the root segment of each
/// mapper path. A mapper without a path contributes its target's fields.
pub fn fetch_variables(declared: &[String], parameters: &[ParameterSpec]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let mut push = |name: &str| {
        if !name.is_empty() && !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    };

    for name in declared {
        push(name.as_str());
    }

    for parameter in parameters {
        match &parameter.binding {
            Binding::Variable { name } => push(name.as_deref().unwrap_or(&parameter.name)),
            Binding::Mapper { path, fields } => match path.as_deref().filter(|p| !p.is_empty()) {
                Some(path) => push(path.split('.').next().unwrap_or(path)),
                None => fields.iter().for_each(|field| push(field.as_str())),
            },
            _ => {}
        }
    }

    names
}
