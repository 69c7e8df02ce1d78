use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::content::FetchedPackage;
use super::driver::CandidateDriver;
use super::reconcile::InstalledComparison;

/// Pipeline state machine.
///
/// State transitions:
/// - Initializing -> Describing -> Matching -> Reconciling -> Resolving
///   -> Fetching -> Installing -> Complete
/// - Reconciling -> Complete (catalog returned nothing)
/// - Resolving -> Installing | Complete (nothing to fetch or downloads disabled)
/// - Fetching -> Complete (installation skipped)
/// - any non-terminal state -> Failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Initializing,
    Describing,
    Matching,
    Reconciling,
    Resolving,
    Fetching,
    Installing,
    Complete,
    Failed,
}

impl Stage {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Complete | Stage::Failed)
    }

    /// Check whether the pipeline may move from `self` to `next`.
    #[must_use]
    pub fn can_transition_to(&self, next: Stage) -> bool {
        use Stage::*;
        if self.is_terminal() {
            return false;
        }
        if next == Failed {
            return true;
        }
        matches!(
            (self, next),
            (Initializing, Describing)
                | (Describing, Matching)
                | (Matching, Reconciling)
                | (Reconciling, Resolving)
                | (Reconciling, Complete)
                | (Resolving, Fetching)
                | (Resolving, Installing)
                | (Resolving, Complete)
                | (Fetching, Installing)
                | (Fetching, Complete)
                | (Installing, Complete)
        )
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// Privilege-dependent capabilities, decided once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Capabilities {
    /// Running with rights to inspect local driver state and install drivers.
    pub elevated: bool,
}

/// How a run ended, mapped to the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompletionCode {
    Complete,
    ConfigurationFault,
    Failed,
    NoDriversFound,
}

impl CompletionCode {
    pub fn exit_code(&self) -> i32 {
        match self {
            CompletionCode::Complete => 0,
            CompletionCode::ConfigurationFault => 1,
            CompletionCode::Failed => 2,
            CompletionCode::NoDriversFound => 3,
        }
    }
}

/// Policy after capability degradation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectivePolicy {
    pub hardware_must_be_present: bool,
    pub update_only_dated_drivers: bool,
    pub used_fallback_enumerator: bool,
    pub comparison_available: bool,
}

/// Everything a run produced, for the caller and the audit trail.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub stage: Stage,
    pub transitions: Vec<(Stage, Stage)>,
    pub policy: Option<EffectivePolicy>,
    pub targets: Vec<CandidateDriver>,
    pub comparisons: Option<Vec<InstalledComparison>>,
    pub content_ids: Vec<String>,
    pub fetched: Vec<FetchedPackage>,
    pub installed: bool,
    pub warnings: Vec<String>,
    pub audit_dir: Option<PathBuf>,
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            stage: Stage::Initializing,
            transitions: Vec::new(),
            policy: None,
            targets: Vec::new(),
            comparisons: None,
            content_ids: Vec::new(),
            fetched: Vec::new(),
            installed: false,
            warnings: Vec::new(),
            audit_dir: None,
        }
    }

    /// Move to `next`, recording the transition. Illegal moves are ignored
    /// and reported as `false`.
    pub fn advance(&mut self, next: Stage) -> bool {
        if !self.stage.can_transition_to(next) {
            return false;
        }
        self.transitions.push((self.stage, next));
        self.stage = next;
        true
    }

    pub fn visited(&self, stage: Stage) -> bool {
        self.transitions.iter().any(|(_, to)| *to == stage)
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}
