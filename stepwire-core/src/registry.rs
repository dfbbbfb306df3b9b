//! Explicit registration table mapping step patterns to handlers.
//!
//! Step implementations are registered by pattern text (for example
//! `say <greeting> to <someone>`). The host decides how a pattern is
//! normalised, so patterns are bound to their host-resolved step values
//! before dispatch: see [`StepRegistry::bind`].

use crate::error::{CoreError, StepFailure};
use crate::table::Table;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// An argument passed to a step implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepArg {
    Text(String),
    Table(Table),
}

impl StepArg {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            StepArg::Text(text) => Some(text),
            StepArg::Table(_) => None,
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            StepArg::Table(table) => Some(table),
            StepArg::Text(_) => None,
        }
    }
}

/// A step implementation.
pub type StepHandler = Arc<dyn Fn(&[StepArg]) -> Result<(), StepFailure> + Send + Sync>;

#[derive(Clone)]
struct Registration {
    pattern: String,
    handler: StepHandler,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("pattern", &self.pattern)
            .finish_non_exhaustive()
    }
}

/// Registered step implementations, in registration order.
#[derive(Debug, Default)]
pub struct StepRegistry {
    entries: RwLock<Vec<Registration>>,
}

impl StepRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> StepRegistryBuilder {
        StepRegistryBuilder::default()
    }

    /// Registers a handler for `pattern`.
    pub fn register<F>(&self, pattern: impl Into<String>, handler: F)
    where
        F: Fn(&[StepArg]) -> Result<(), StepFailure> + Send + Sync + 'static,
    {
        let pattern = pattern.into();
        tracing::debug!("Registering step '{}'", pattern);
        self.entries.write().push(Registration {
            pattern,
            handler: Arc::new(handler),
        });
    }

    /// Returns the registered patterns in registration order.
    pub fn patterns(&self) -> Vec<String> {
        self.entries
            .read()
            .iter()
            .map(|entry| entry.pattern.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Pairs each registered pattern with its resolved step value.
    ///
    /// `step_values` must be in the order returned by [`patterns`](Self::patterns).
    /// Two patterns that resolve to the same step value are ambiguous and
    /// rejected.
    pub fn bind(&self, step_values: Vec<String>) -> Result<BoundSteps, CoreError> {
        let entries = self.entries.read();
        if entries.len() != step_values.len() {
            return Err(CoreError::ValueCountMismatch {
                expected: entries.len(),
                actual: step_values.len(),
            });
        }

        let mut steps: HashMap<String, Registration> = HashMap::with_capacity(entries.len());
        for (entry, step_value) in entries.iter().zip(step_values) {
            if let Some(existing) = steps.get(&step_value) {
                return Err(CoreError::DuplicateStep {
                    step_value,
                    first: existing.pattern.clone(),
                    second: entry.pattern.clone(),
                });
            }
            steps.insert(step_value, entry.clone());
        }

        tracing::debug!("Bound {} step implementations", steps.len());
        Ok(BoundSteps { steps })
    }
}

/// Builder for a [`StepRegistry`].
#[derive(Default)]
pub struct StepRegistryBuilder {
    entries: Vec<Registration>,
}

impl StepRegistryBuilder {
    pub fn step<F>(mut self, pattern: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&[StepArg]) -> Result<(), StepFailure> + Send + Sync + 'static,
    {
        self.entries.push(Registration {
            pattern: pattern.into(),
            handler: Arc::new(handler),
        });
        self
    }

    pub fn build(self) -> StepRegistry {
        StepRegistry {
            entries: RwLock::new(self.entries),
        }
    }
}

/// Step implementations keyed by host-resolved step value.
#[derive(Debug)]
pub struct BoundSteps {
    steps: HashMap<String, Registration>,
}

impl BoundSteps {
    pub fn is_implemented(&self, step_value: &str) -> bool {
        self.steps.contains_key(step_value)
    }

    /// Returns the pattern a step value was registered under.
    pub fn pattern_for(&self, step_value: &str) -> Option<&str> {
        self.steps.get(step_value).map(|entry| entry.pattern.as_str())
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Runs the implementation bound to `step_value`.
    pub fn dispatch(&self, step_value: &str, args: &[StepArg]) -> Result<(), CoreError> {
        let entry = self
            .steps
            .get(step_value)
            .ok_or_else(|| CoreError::StepNotFound {
                step_value: step_value.to_string(),
            })?;

        tracing::debug!("Executing step '{}' ({} args)", entry.pattern, args.len());
        (entry.handler)(args).map_err(|source| CoreError::StepFailed {
            step_value: step_value.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn noop(_: &[StepArg]) -> Result<(), StepFailure> {
        Ok(())
    }

    #[test]
    fn test_patterns_in_registration_order() {
        let registry = StepRegistry::builder()
            .step("say <greeting> to <someone>", noop)
            .step("open the browser", noop)
            .build();
        registry.register("close the browser", noop);

        assert_eq!(
            registry.patterns(),
            vec![
                "say <greeting> to <someone>",
                "open the browser",
                "close the browser"
            ]
        );
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_bind_and_dispatch() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();

        let registry = StepRegistry::new();
        registry.register("say <greeting> to <someone>", move |args: &[StepArg]| {
            assert_eq!(args[0].as_text(), Some("hello"));
            assert_eq!(args[1].as_text(), Some("world"));
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let bound = registry.bind(vec!["say {} to {}".to_string()]).unwrap();
        assert!(bound.is_implemented("say {} to {}"));
        assert_eq!(
            bound.pattern_for("say {} to {}"),
            Some("say <greeting> to <someone>")
        );

        bound
            .dispatch(
                "say {} to {}",
                &[
                    StepArg::Text("hello".into()),
                    StepArg::Text("world".into()),
                ],
            )
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dispatch_table_argument() {
        let registry = StepRegistry::builder()
            .step("almost all words have vowels <table>", |args: &[StepArg]| {
                let table = args[0]
                    .as_table()
                    .ok_or_else(|| StepFailure::new("expected a table"))?;
                if table.column_values("Word").map(|c| c.len()) != Some(1) {
                    return Err(StepFailure::new("expected one word"));
                }
                Ok(())
            })
            .build();
        let bound = registry
            .bind(vec!["almost all words have vowels {}".to_string()])
            .unwrap();

        let mut table = Table::new(["Word"]);
        table.add_row(["Gauge"]).unwrap();
        bound
            .dispatch("almost all words have vowels {}", &[StepArg::Table(table)])
            .unwrap();

        let err = bound
            .dispatch(
                "almost all words have vowels {}",
                &[StepArg::Text("nope".into())],
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::StepFailed { .. }));
        assert!(err.to_string().contains("expected a table"));
    }

    #[test]
    fn test_duplicate_step_values_rejected() {
        let registry = StepRegistry::builder()
            .step("say <a>", noop)
            .step("say <b>", noop)
            .build();

        let err = registry
            .bind(vec!["say {}".to_string(), "say {}".to_string()])
            .unwrap_err();
        match err {
            CoreError::DuplicateStep {
                step_value,
                first,
                second,
            } => {
                assert_eq!(step_value, "say {}");
                assert_eq!(first, "say <a>");
                assert_eq!(second, "say <b>");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_value_count_mismatch() {
        let registry = StepRegistry::builder().step("one", noop).build();
        assert!(matches!(
            registry.bind(vec![]),
            Err(CoreError::ValueCountMismatch {
                expected: 1,
                actual: 0
            })
        ));
    }

    #[test]
    fn test_unknown_step() {
        let bound = StepRegistry::new().bind(vec![]).unwrap();
        assert!(bound.is_empty());
        assert!(matches!(
            bound.dispatch("missing", &[]),
            Err(CoreError::StepNotFound { .. })
        ));
    }
}
