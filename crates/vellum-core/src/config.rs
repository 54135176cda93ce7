//! Compiler configuration.

/// Default number of identifiers a relationship sub-query may contribute.
pub const DEFAULT_SAMPLE_CAP: usize = 50;

/// Process-wide compiler configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerConfig {
    /// Maximum identifiers collected per relationship sub-query. Folds over
    /// larger result sets are truncated and flagged.
    pub sample_cap: usize,

    /// Whether `near` conditions skip the field read check.
    pub near_bypasses_access: bool,
}

impl CompilerConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self {
            sample_cap: DEFAULT_SAMPLE_CAP,
            near_bypasses_access: true,
        }
    }

    /// Set the sub-query sample cap (at least 1).
    pub fn with_sample_cap(mut self, cap: usize) -> Self {
        self.sample_cap = cap.max(1);
        self
    }

    /// Subject `near` conditions to the field read check.
    pub fn with_gated_near(mut self) -> Self {
        self.near_bypasses_access = false;
        self
    }
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-call compile options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileOptions {
    /// Skip field read checks. Only for trusted callers.
    pub override_access: bool,
    /// Allow conditions on hidden fields.
    pub include_hidden_fields: bool,
}

impl CompileOptions {
    /// Options for an untrusted caller.
    pub fn new() -> Self {
        Self::default()
    }

    /// Options for a trusted caller that bypasses field read checks.
    pub fn trusted() -> Self {
        Self {
            override_access: true,
            ..Self::default()
        }
    }

    /// Allow conditions on hidden fields.
    pub fn with_hidden_fields(mut self) -> Self {
        self.include_hidden_fields = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CompilerConfig::default();
        assert_eq!(config.sample_cap, 50);
        assert!(config.near_bypasses_access);

        let options = CompileOptions::default();
        assert!(!options.override_access);
        assert!(!options.include_hidden_fields);
    }

    #[test]
    fn test_builders() {
        let config = CompilerConfig::new().with_sample_cap(0).with_gated_near();
        assert_eq!(config.sample_cap, 1);
        assert!(!config.near_bypasses_access);

        let options = CompileOptions::trusted().with_hidden_fields();
        assert!(options.override_access);
        assert!(options.include_hidden_fields);
    }
}
