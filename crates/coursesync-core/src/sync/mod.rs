//! Sync orchestration: which stages run for an invocation, and in what order.
//!
//! An invocation is selected once, up front, as a [`SyncMode`]. [`SyncPlan`] turns
//! the mode into the fixed stage sequence with a run/skip decision per stage, and
//! [`SyncOrchestrator`] executes it against a gateway and a store.

mod dedup;
mod orchestrator;
pub mod scopes;

#[cfg(test)]
mod testing;

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppError;
use crate::normalize::InstructorMatch;

pub use orchestrator::SyncOrchestrator;

/// What a single invocation is asked to refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncMode {
    /// Every global kind, in dependency order. Never touches courses.
    Full,
    /// Only the named term's subjects and availability rows.
    TermScoped { term: String },
    /// Only the named term's courses, using subjects already stored for it.
    CourseOnly { term: String },
}

impl SyncMode {
    /// Builds a mode from the CLI selector: `--term NAME` or `--courses NAME`.
    ///
    /// Empty names count as absent. Supplying both is rejected.
    ///
    /// # Examples
    ///
    /// ```
    /// use coursesync_core::sync::SyncMode;
    ///
    /// assert_eq!(SyncMode::from_selector(None, None).unwrap(), SyncMode::Full);
    /// assert_eq!(
    ///     SyncMode::from_selector(None, Some("2019 Fall".into())).unwrap(),
    ///     SyncMode::CourseOnly { term: "2019 Fall".into() }
    /// );
    /// assert!(SyncMode::from_selector(Some("a".into()), Some("b".into())).is_err());
    /// ```
    pub fn from_selector(term: Option<String>, courses: Option<String>) -> Result<Self, AppError> {
        let term = term.filter(|t| !t.trim().is_empty());
        let courses = courses.filter(|t| !t.trim().is_empty());

        match (term, courses) {
            (None, None) => Ok(SyncMode::Full),
            (Some(term), None) => Ok(SyncMode::TermScoped { term }),
            (None, Some(term)) => Ok(SyncMode::CourseOnly { term }),
            (Some(_), Some(_)) => Err(AppError::ConfigError(
                "--term and --courses cannot be combined".to_string(),
            )),
        }
    }

    /// The term name this invocation is scoped to, if any.
    pub fn term_name(&self) -> Option<&str> {
        match self {
            SyncMode::Full => None,
            SyncMode::TermScoped { term } | SyncMode::CourseOnly { term } => Some(term),
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncMode::Full => write!(f, "full"),
            SyncMode::TermScoped { term } => write!(f, "term:{}", term),
            SyncMode::CourseOnly { term } => write!(f, "courses:{}", term),
        }
    }
}

/// One entity kind's fetch-normalize-store cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    Terms,
    Schools,
    Subjects,
    Instructors,
    Buildings,
    Rooms,
    Courses,
}

impl Stage {
    /// Every stage in execution order. Each stage only reads kinds written by
    /// stages before it.
    pub const ORDER: [Stage; 7] = [
        Stage::Terms,
        Stage::Schools,
        Stage::Subjects,
        Stage::Instructors,
        Stage::Buildings,
        Stage::Rooms,
        Stage::Courses,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Terms => "terms",
            Stage::Schools => "schools",
            Stage::Subjects => "subjects",
            Stage::Instructors => "instructors",
            Stage::Buildings => "buildings",
            Stage::Rooms => "rooms",
            Stage::Courses => "courses",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageAction {
    Run,
    Skip,
}

/// Ordered run/skip decision for every stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPlan {
    steps: Vec<(Stage, StageAction)>,
}

impl SyncPlan {
    pub fn for_mode(mode: &SyncMode) -> Self {
        let steps = Stage::ORDER
            .iter()
            .map(|&stage| {
                let runs = match mode {
                    SyncMode::Full => stage != Stage::Courses,
                    SyncMode::TermScoped { .. } => stage == Stage::Subjects,
                    SyncMode::CourseOnly { .. } => stage == Stage::Courses,
                };
                let action = if runs {
                    StageAction::Run
                } else {
                    StageAction::Skip
                };
                (stage, action)
            })
            .collect();

        Self { steps }
    }

    pub fn steps(&self) -> &[(Stage, StageAction)] {
        &self.steps
    }

    /// Stages that will run, in order.
    pub fn stages_to_run(&self) -> Vec<Stage> {
        self.steps
            .iter()
            .filter(|(_, action)| *action == StageAction::Run)
            .map(|(stage, _)| *stage)
            .collect()
    }

    pub fn runs(&self, stage: Stage) -> bool {
        self.steps
            .iter()
            .any(|&(s, action)| s == stage && action == StageAction::Run)
    }
}

/// What one stage did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    pub stage: Stage,
    pub action: StageAction,
    /// Gateway calls made.
    pub fetches: usize,
    /// Records returned across all fetches, before deduplication.
    pub records: usize,
    /// Rows handed to the store, after deduplication, across every kind the stage writes.
    pub rows_written: usize,
}

impl StageReport {
    pub fn skipped(stage: Stage) -> Self {
        Self {
            stage,
            action: StageAction::Skip,
            fetches: 0,
            records: 0,
            rows_written: 0,
        }
    }

    pub fn ran(stage: Stage, fetches: usize, records: usize, rows_written: usize) -> Self {
        Self {
            stage,
            action: StageAction::Run,
            fetches,
            records,
            rows_written,
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.action == StageAction::Skip
    }
}

/// Instructor joins that did not resolve cleanly during a Courses stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinReport {
    pub resolved: usize,
    pub unresolved: BTreeSet<String>,
    pub ambiguous: BTreeSet<String>,
    /// Course rows stored with the fallback instructor id.
    pub fallback_rows: usize,
}

impl JoinReport {
    pub fn record(&mut self, outcome: &InstructorMatch) {
        match outcome {
            InstructorMatch::Resolved(_) => self.resolved += 1,
            InstructorMatch::Ambiguous { name, .. } => {
                self.ambiguous.insert(name.clone());
            }
            InstructorMatch::Unresolved(name) => {
                self.fallback_rows += 1;
                self.unresolved.insert(name.clone());
            }
        }
    }

    /// Returns true if every join resolved to exactly one instructor.
    pub fn is_clean(&self) -> bool {
        self.unresolved.is_empty() && self.ambiguous.is_empty()
    }
}

/// Summary of a completed invocation.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub run_id: Uuid,
    pub mode: SyncMode,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub stages: Vec<StageReport>,
    pub joins: JoinReport,
}

impl SyncReport {
    pub fn new(mode: SyncMode) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            mode,
            started_at: Utc::now(),
            finished_at: None,
            stages: Vec::new(),
            joins: JoinReport::default(),
        }
    }

    pub fn stage(&self, stage: Stage) -> Option<&StageReport> {
        self.stages.iter().find(|r| r.stage == stage)
    }

    pub fn stages_run(&self) -> impl Iterator<Item = &StageReport> {
        self.stages.iter().filter(|r| !r.is_skipped())
    }

    pub fn total_fetches(&self) -> usize {
        self.stages.iter().map(|r| r.fetches).sum()
    }

    pub fn total_rows_written(&self) -> usize {
        self.stages.iter().map(|r| r.rows_written).sum()
    }

    /// Wall-clock time of the invocation, once finished.
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.finished_at.map(|end| end - self.started_at)
    }
}
