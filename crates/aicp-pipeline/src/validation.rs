use std::panic::{self, AssertUnwindSafe};

use jsonschema::Validator;
use tracing::{error, info};

/// A predicate checked against a stage's output. Boxed so callers can supply
/// arbitrary closures; wrapped in `catch_unwind` when invoked so a panicking
/// predicate fails the gate instead of the whole pipeline.
pub type Predicate = Box<dyn Fn(&serde_json::Value) -> bool + Send + Sync>;

/// Validates a stage's output before it is allowed to feed downstream stages.
///
/// Combines an optional JSON Schema check with an optional predicate
/// function; a gate passes only if every check it was configured with
/// passes.
pub struct ValidationGate {
    name: String,
    schema: Option<Validator>,
    predicate: Option<Predicate>,
}

impl ValidationGate {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
            predicate: None,
        }
    }

    pub fn with_schema(mut self, schema: &serde_json::Value) -> Result<Self, jsonschema::ValidationError<'static>> {
        self.schema = Some(jsonschema::validator_for(schema)?);
        Ok(self)
    }

    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run every configured check. Returns `true` only if all pass.
    pub fn validate(&self, data: &serde_json::Value) -> bool {
        if let Some(schema) = &self.schema {
            if let Err(e) = schema.validate(data) {
                error!(gate = %self.name, error = %e, "validation_gate_failed");
                return false;
            }
        }

        if let Some(predicate) = &self.predicate {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| predicate(data)));
            match outcome {
                Ok(true) => {}
                Ok(false) => {
                    error!(gate = %self.name, error = "predicate returned false", "validation_gate_failed");
                    return false;
                }
                Err(_) => {
                    error!(gate = %self.name, error = "predicate panicked", "validation_gate_failed");
                    return false;
                }
            }
        }

        info!(gate = %self.name, "validation_gate_passed");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_with_no_checks_configured() {
        let gate = ValidationGate::new("noop");
        assert!(gate.validate(&serde_json::json!({"anything": true})));
    }

    #[test]
    fn schema_check_rejects_mismatched_shape() {
        let schema = serde_json::json!({
            "type": "object",
            "required": ["summary"],
            "properties": { "summary": { "type": "string" } }
        });
        let gate = ValidationGate::new("shape").with_schema(&schema).unwrap();
        assert!(gate.validate(&serde_json::json!({ "summary": "ok" })));
        assert!(!gate.validate(&serde_json::json!({ "other": 1 })));
    }

    #[test]
    fn predicate_check_runs_and_can_fail() {
        let gate = ValidationGate::new("nonempty")
            .with_predicate(Box::new(|v| v.as_str().map(|s| !s.is_empty()).unwrap_or(false)));
        assert!(gate.validate(&serde_json::json!("hello")));
        assert!(!gate.validate(&serde_json::json!("")));
    }

    #[test]
    fn panicking_predicate_fails_the_gate_instead_of_the_process() {
        let gate = ValidationGate::new("panics")
            .with_predicate(Box::new(|v| v.as_array().unwrap()[0].as_bool().unwrap()));
        assert!(!gate.validate(&serde_json::json!("not an array")));
    }
}
