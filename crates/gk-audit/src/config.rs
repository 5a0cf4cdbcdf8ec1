// config.rs — Audit modes, feedback verbosity, and tunable thresholds.

use serde::{Deserialize, Serialize};

/// How strictly findings are resolved into a decision.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditMode {
    /// Any violation or confirmation demand blocks.
    Strict,
    /// Nothing blocks; findings are attached as information.
    Permissive,
    /// Violations block only at high priority; confirmation demands
    /// hold the call.
    Hybrid,
}

impl Default for AuditMode {
    fn default() -> Self {
        AuditMode::Hybrid
    }
}

impl std::fmt::Display for AuditMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditMode::Strict => write!(f, "strict"),
            AuditMode::Permissive => write!(f, "permissive"),
            AuditMode::Hybrid => write!(f, "hybrid"),
        }
    }
}

/// How much explanation goes into feedback messages.
///
/// Ordered: `Minimal < Detailed < Verbose`, so callers can gate extra
/// annotations on `verbosity >= Detailed`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackVerbosity {
    /// One line naming the outcome.
    Minimal,
    /// Lists each violated constraint's description and message.
    Detailed,
    /// Adds a suggestion to try a different approach.
    Verbose,
}

impl Default for FeedbackVerbosity {
    fn default() -> Self {
        FeedbackVerbosity::Detailed
    }
}

/// Tunable auditor settings.
///
/// Necessity thresholds are calibrated per mode — stricter modes demand
/// more evidence that a call serves the stated task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditorConfig {
    #[serde(default)]
    pub mode: AuditMode,
    #[serde(default)]
    pub verbosity: FeedbackVerbosity,
    /// Tool names that bypass every check. Checked before the blacklist:
    /// the whitelist wins when both name the same tool.
    #[serde(default)]
    pub whitelist: Vec<String>,
    /// Tool names that are always blocked.
    #[serde(default)]
    pub blacklist: Vec<String>,
    /// Minimum necessity score in strict mode.
    #[serde(default = "default_strict_necessity")]
    pub strict_necessity_threshold: f64,
    /// Minimum necessity score in hybrid mode.
    #[serde(default = "default_hybrid_necessity")]
    pub hybrid_necessity_threshold: f64,
    /// Minimum necessity score in permissive mode.
    #[serde(default = "default_permissive_necessity")]
    pub permissive_necessity_threshold: f64,
}

fn default_strict_necessity() -> f64 {
    0.4
}

fn default_hybrid_necessity() -> f64 {
    0.3
}

fn default_permissive_necessity() -> f64 {
    0.2
}

impl Default for AuditorConfig {
    fn default() -> Self {
        Self {
            mode: AuditMode::default(),
            verbosity: FeedbackVerbosity::default(),
            whitelist: Vec::new(),
            blacklist: Vec::new(),
            strict_necessity_threshold: default_strict_necessity(),
            hybrid_necessity_threshold: default_hybrid_necessity(),
            permissive_necessity_threshold: default_permissive_necessity(),
        }
    }
}

impl AuditorConfig {
    /// The necessity threshold for the configured mode.
    pub fn necessity_threshold(&self) -> f64 {
        match self.mode {
            AuditMode::Strict => self.strict_necessity_threshold,
            AuditMode::Hybrid => self.hybrid_necessity_threshold,
            AuditMode::Permissive => self.permissive_necessity_threshold,
        }
    }

    /// Builder-style mode override.
    pub fn with_mode(mut self, mode: AuditMode) -> Self {
        self.mode = mode;
        self
    }

    /// Builder-style verbosity override.
    pub fn with_verbosity(mut self, verbosity: FeedbackVerbosity) -> Self {
        self.verbosity = verbosity;
        self
    }
}
