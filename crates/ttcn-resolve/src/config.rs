//! Check configuration.
//!
//! Everything that changes how a program is checked is passed to the
//! [`Checker`](crate::resolve::Checker) explicitly. There is no ambient
//! state: two checkers with different configurations can run side by side.

use serde::{Deserialize, Serialize};

/// Runtime library the generated code will link against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuntimeVariant {
    /// Load-test runtime
    #[default]
    Load,
    /// Function-test runtime: altsteps copy every `in` parameter on entry
    FunctionTest,
}

impl RuntimeVariant {
    /// Parse the command-line spelling (`load`, `function-test`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "load" => Some(RuntimeVariant::Load),
            "function-test" => Some(RuntimeVariant::FunctionTest),
            _ => None,
        }
    }

    /// Whether templates may be concatenated with `&`.
    pub fn allows_template_concatenation(self) -> bool {
        self == RuntimeVariant::FunctionTest
    }

    /// Whether an altstep copies every `in` parameter on entry.
    pub fn altstep_copies_in_params(self) -> bool {
        self == RuntimeVariant::FunctionTest
    }
}

/// Options for one checking run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckConfig {
    #[serde(default)]
    pub runtime: RuntimeVariant,
    /// Promote warnings to errors in the final report
    #[serde(default)]
    pub warnings_as_errors: bool,
}

impl CheckConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_runtime(mut self, runtime: RuntimeVariant) -> Self {
        self.runtime = runtime;
        self
    }

    pub fn with_warnings_as_errors(mut self, enabled: bool) -> Self {
        self.warnings_as_errors = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_from_name() {
        assert_eq!(RuntimeVariant::from_name("load"), Some(RuntimeVariant::Load));
        assert_eq!(
            RuntimeVariant::from_name("function-test"),
            Some(RuntimeVariant::FunctionTest)
        );
        assert_eq!(RuntimeVariant::from_name("parallel"), None);
    }

    #[test]
    fn test_function_test_runtime_switches() {
        assert!(RuntimeVariant::FunctionTest.allows_template_concatenation());
        assert!(RuntimeVariant::FunctionTest.altstep_copies_in_params());
        assert!(!RuntimeVariant::Load.altstep_copies_in_params());
    }

    #[test]
    fn test_config_builder() {
        let config = CheckConfig::new()
            .with_runtime(RuntimeVariant::FunctionTest)
            .with_warnings_as_errors(true);
        assert_eq!(config.runtime, RuntimeVariant::FunctionTest);
        assert!(config.warnings_as_errors);
        assert_eq!(CheckConfig::default().runtime, RuntimeVariant::Load);
    }
}
