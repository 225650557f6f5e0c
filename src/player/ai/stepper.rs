//! Cooperative, cancellable search.
//!
//! A [`SearchTask`] scores one candidate column per [`SearchTask::advance`]
//! call so a host loop can interleave input handling and rendering between
//! columns. [`StepScheduler`] owns at most one task at a time and hands out
//! task ids so that steps scheduled for an old task are recognised and dropped.

use super::alpha_beta::{ColumnScore, SearchEngine};
use crate::core::{center_out, Grid, Player};

pub type TaskId = u64;

/// What the finished search is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purpose {
    /// Machine turn: the chosen column is played.
    Play,
    /// Human turn: scores are only reported.
    Analyse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Running,
    Done,
    Cancelled,
}

/// Result of a single advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Scored { column: usize, score: i64 },
    /// Candidate column was full.
    Skipped { column: usize },
    Finished,
}

/// Final report of a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOutcome {
    /// Best column, `None` when nothing could be scored.
    pub column: Option<usize>,
    pub best_score: Option<i64>,
    /// Indexed by column.
    pub scores: Vec<ColumnScore>,
}

/// One search over a grid snapshot.
#[derive(Debug, Clone)]
pub struct SearchTask {
    id: TaskId,
    perspective: Player,
    depth: usize,
    grid: Grid,
    order: Vec<usize>,
    next: usize,
    scores: Vec<ColumnScore>,
    best: Option<(usize, i64)>,
    state: TaskState,
}

impl SearchTask {
    pub fn new(id: TaskId, grid: Grid, depth: usize, perspective: Player) -> Self {
        let scores = (0..grid.cols())
            .map(|c| {
                if grid.is_column_full(c) {
                    ColumnScore::NotApplicable
                } else {
                    ColumnScore::Pending
                }
            })
            .collect();
        SearchTask {
            id,
            perspective,
            depth,
            order: center_out(grid.cols()),
            grid,
            next: 0,
            scores,
            best: None,
            state: TaskState::Running,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn perspective(&self) -> Player {
        self.perspective
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn scores(&self) -> &[ColumnScore] {
        &self.scores
    }

    pub fn best(&self) -> Option<(usize, i64)> {
        self.best
    }

    /// Candidates still to visit, full columns included.
    pub fn remaining(&self) -> usize {
        self.order.len().saturating_sub(self.next)
    }

    /// Visits the next candidate column in center-out order. Once every
    /// candidate has been visited the task moves to `Done` and reports `Finished`.
    pub fn advance(&mut self, engine: &SearchEngine) -> Progress {
        if self.state != TaskState::Running {
            return Progress::Finished;
        }
        let Some(&column) = self.order.get(self.next) else {
            self.state = TaskState::Done;
            return Progress::Finished;
        };
        self.next += 1;

        match engine.score_column(&self.grid, column, self.depth, self.perspective) {
            Some(score) => {
                self.scores[column] = ColumnScore::Scored(score);
                // Strict comparison keeps the first-seen column on ties.
                if self.best.map_or(true, |(_, b)| score > b) {
                    self.best = Some((column, score));
                }
                Progress::Scored { column, score }
            }
            None => Progress::Skipped { column },
        }
    }

    pub fn cancel(&mut self) {
        if self.state == TaskState::Running {
            self.state = TaskState::Cancelled;
        }
    }

    pub fn outcome(&self) -> SearchOutcome {
        SearchOutcome {
            column: self.best.map(|(c, _)| c),
            best_score: self.best.map(|(_, s)| s),
            scores: self.scores.clone(),
        }
    }
}

/// Returned by [`StepScheduler::begin`] when a task is already in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Busy(pub TaskId);

/// What a scheduled step did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// The id does not belong to the active task; nothing happened.
    Stale,
    Progress {
        column: usize,
        score: ColumnScore,
        /// Whether the column was full, so the next step can be scheduled sooner.
        skipped: bool,
    },
    Done {
        purpose: Purpose,
        perspective: Player,
        outcome: SearchOutcome,
    },
}

/// Single-slot owner of the active search.
#[derive(Debug, Default)]
pub struct StepScheduler {
    active: Option<(SearchTask, Purpose)>,
    next_id: TaskId,
}

impl StepScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a task and returns its id together with the initial score report.
    pub fn begin(
        &mut self,
        grid: Grid,
        depth: usize,
        perspective: Player,
        purpose: Purpose,
    ) -> Result<(TaskId, Vec<ColumnScore>), Busy> {
        if let Some((task, _)) = &self.active {
            return Err(Busy(task.id()));
        }
        self.next_id += 1;
        let task = SearchTask::new(self.next_id, grid, depth, perspective);
        let initial = task.scores().to_vec();
        tracing::debug!(
            "search #{} begin {:?} for {} at depth {}",
            task.id(),
            purpose,
            perspective,
            depth
        );
        self.active = Some((task, purpose));
        Ok((self.next_id, initial))
    }

    /// Runs one step of task `id`. Finishing the task frees the slot.
    pub fn advance(&mut self, id: TaskId, engine: &SearchEngine) -> Step {
        let Some((task, purpose)) = self.active.as_mut() else {
            return Step::Stale;
        };
        if task.id() != id {
            tracing::debug!("dropping stale step for search #{id}");
            return Step::Stale;
        }

        match task.advance(engine) {
            Progress::Scored { column, score } => {
                tracing::debug!("search #{id} column {column} -> {score}");
                Step::Progress {
                    column,
                    score: ColumnScore::Scored(score),
                    skipped: false,
                }
            }
            Progress::Skipped { column } => Step::Progress {
                column,
                score: ColumnScore::NotApplicable,
                skipped: true,
            },
            Progress::Finished => {
                let purpose = *purpose;
                let perspective = task.perspective();
                let outcome = task.outcome();
                self.active = None;
                tracing::debug!("search #{id} done: {:?}", outcome.column);
                Step::Done {
                    purpose,
                    perspective,
                    outcome,
                }
            }
        }
    }

    /// Discards the active task, if any. Returns whether one was running.
    pub fn cancel(&mut self) -> bool {
        match self.active.take() {
            Some((mut task, purpose)) => {
                task.cancel();
                tracing::debug!(
                    "search #{} ({:?}) cancelled with {} columns left",
                    task.id(),
                    purpose,
                    task.remaining()
                );
                true
            }
            None => false,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_purpose(&self) -> Option<Purpose> {
        self.active.as_ref().map(|(_, p)| *p)
    }

    /// Score report of the active task.
    pub fn scores(&self) -> Option<&[ColumnScore]> {
        self.active.as_ref().map(|(t, _)| t.scores())
    }
}
