//! Bound handler arguments

use flowlink_core::domain::job::ActivatedJob;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

use super::HandlerError;

/// Arguments bound for one invocation, in parameter order
#[derive(Debug, Clone)]
pub struct Arguments {
    job: Arc<ActivatedJob>,
    values: Vec<(String, Option<Value>)>,
}

impl Arguments {
    pub(crate) fn new(job: Arc<ActivatedJob>, values: Vec<(String, Option<Value>)>) -> Self {
        Self { job, values }
    }

    /// The job the arguments were bound from
    pub fn job(&self) -> &ActivatedJob {
        &self.job
    }

    /// Raw value of a parameter, `None` when it bound to nothing
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| v.as_ref())
    }

    /// Deserialize an optional parameter
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, HandlerError> {
        match self.value(name) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    /// Deserialize a parameter that must be present
    pub fn require<T: DeserializeOwned>(&self, name: &str) -> Result<T, HandlerError> {
        self.get(name)?
            .ok_or_else(|| HandlerError::missing_argument(name))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Value>)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_job;
    use serde_json::json;

    #[test]
    fn test_typed_access() {
        let args = Arguments::new(
            Arc::new(sample_job(json!({}))),
            vec![
                ("amount".to_string(), Some(json!(12))),
                ("note".to_string(), None),
            ],
        );

        assert_eq!(args.get::<i64>("amount").unwrap(), Some(12));
        assert_eq!(args.get::<String>("note").unwrap(), None);
        assert_eq!(args.require::<i64>("amount").unwrap(), 12);
        assert_eq!(
            args.require::<String>("note").unwrap_err().kind(),
            HandlerError::MISSING_ARGUMENT
        );
        assert!(args.get::<String>("amount").is_err());
    }
}
