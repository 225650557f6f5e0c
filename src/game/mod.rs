//! The playing session: one context object that owns the grid, the move log,
//! the view cursor and the machine player's in-flight work.
//!
//! Nothing here blocks. Machine turns and searches are split into
//! [`ScheduledTask`] units that the host pops from the [`Scheduler`] and hands
//! back through [`Session::run_due`]. Two gates protect the log: the search
//! slot in [`StepScheduler`] and `move_lock`, held from the start of a machine
//! turn until its move is applied.

pub mod history;
pub mod online;
pub mod replay;
pub mod save;
pub mod scheduler;
pub mod store;

use std::fmt;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::{AppConfig, BoardConfig, TimingConfig};
use crate::core::{Grid, MoveLog, Player, Position, MAX_DIM, MIN_DIM};
use crate::error::{ConfigError, MoveError};
use crate::logic::{result_after, GameResult};
use crate::player::ai::{
    clamp_depth, random_column, AiConfig, AiMode, ColumnScore, Purpose, SearchEngine, Step,
    StepScheduler, TaskId, WindowEvaluator,
};
use crate::player::GameMode;

pub use history::{Event, EventKind, EventLog};
pub use online::{OnlineLink, RemoteState, Role, RoomStatus};
pub use save::{GameSnapshot, PlayerNames, SavePayload};
pub use scheduler::{ImmediateQueue, ScheduledTask, Scheduler, TimerQueue};
pub use store::{DirStore, GameStore, StoredGame, Summary};

/// Why a click did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    GameOver,
    /// A machine turn is in progress.
    Busy,
    /// The view is rewound.
    Replay,
    NotYourTurn,
    Spectator,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    Played { player: Player, pos: Position },
    Rejected(MoveError),
    Ignored(IgnoreReason),
    /// Online: the host should send this column to the room.
    SubmitRemote(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    ToMove(Player),
    Thinking(Player),
    Won(Player),
    Draw,
    Stopped,
    Replay { cursor: usize, total: usize },
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Status::ToMove(p) => write!(f, "{p} to move"),
            Status::Thinking(p) => write!(f, "{p} is thinking..."),
            Status::Won(p) => write!(f, "{p} wins"),
            Status::Draw => write!(f, "draw"),
            Status::Stopped => write!(f, "stopped"),
            Status::Replay { cursor, total } => write!(f, "replay {cursor}/{total}"),
        }
    }
}

/// Everything a painter needs for one frame.
#[derive(Debug, Clone)]
pub struct RenderView {
    pub grid: Grid,
    pub winning_cells: Vec<Position>,
    pub hover_column: Option<usize>,
    /// Empty when no score report is active.
    pub scores: Vec<ColumnScore>,
    pub status: Status,
    pub cursor: usize,
    pub total_moves: usize,
    pub game_index: u32,
    pub mode: GameMode,
    pub ai_mode: AiMode,
    pub depth: u8,
    pub names: [String; 2],
    pub online: Option<(String, Role)>,
}

pub struct Session<S: Scheduler = TimerQueue> {
    board: BoardConfig,
    grid: Grid,
    log: MoveLog,
    cursor: usize,
    result: GameResult,
    halted: bool,
    mode: GameMode,
    ai: AiConfig,
    timing: TimingConfig,
    names: PlayerNames,
    save_name: String,
    game_index: u32,
    hover: Option<usize>,
    scores: Vec<ColumnScore>,
    engine: SearchEngine,
    stepper: StepScheduler,
    move_lock: bool,
    scheduler: S,
    history: EventLog,
    online: Option<OnlineLink>,
    rng: StdRng,
}

impl<S: Scheduler> Session<S> {
    pub fn new(config: &AppConfig, scheduler: S) -> Self {
        Self::with_rng(config, scheduler, StdRng::from_entropy())
    }

    /// Starts game #1 with an explicit random source.
    pub fn with_rng(config: &AppConfig, scheduler: S, rng: StdRng) -> Self {
        let board = config.board.clone();
        let mut session = Session {
            grid: Grid::new(board.rows, board.cols),
            log: MoveLog::new(board.starting_player),
            board,
            cursor: 0,
            result: GameResult::InProgress,
            halted: false,
            mode: GameMode::default(),
            ai: config.ai.clone(),
            timing: config.timing.clone(),
            names: PlayerNames::default(),
            save_name: save::default_save_name(),
            game_index: 0,
            hover: None,
            scores: Vec::new(),
            engine: SearchEngine::new(Box::new(WindowEvaluator::new(config.ai.weights.clone()))),
            stepper: StepScheduler::new(),
            move_lock: false,
            scheduler,
            history: EventLog::new(),
            online: None,
            rng,
        };
        session.new_game();
        session
    }

    // ----- accessors

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn log(&self) -> &MoveLog {
        &self.log
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn result(&self) -> &GameResult {
        &self.result
    }

    pub fn is_over(&self) -> bool {
        self.halted || self.result.is_over()
    }

    /// Player whose token the next drop at the cursor would place.
    pub fn to_move(&self) -> Player {
        self.log.player_at(self.cursor)
    }

    /// A search of either purpose holds the slot.
    pub fn is_searching(&self) -> bool {
        self.stepper.is_busy()
    }

    /// A machine turn's search holds the slot.
    pub fn is_thinking(&self) -> bool {
        self.stepper.active_purpose() == Some(Purpose::Play)
    }

    pub fn move_locked(&self) -> bool {
        self.move_lock
    }

    pub fn scores(&self) -> &[ColumnScore] {
        &self.scores
    }

    pub fn history(&self) -> &EventLog {
        &self.history
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn ai(&self) -> &AiConfig {
        &self.ai
    }

    pub fn game_index(&self) -> u32 {
        self.game_index
    }

    pub fn save_name(&self) -> &str {
        &self.save_name
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn name_of(&self, player: Player) -> String {
        let (a, b) = self.mode.default_names();
        match player {
            Player::A => self.names.a.clone().unwrap_or_else(|| a.to_string()),
            Player::B => self.names.b.clone().unwrap_or_else(|| b.to_string()),
        }
    }

    // ----- settings

    pub fn set_mode(&mut self, mode: GameMode) {
        if self.mode == mode {
            return;
        }
        self.cancel_machine_work();
        self.mode = mode;
        tracing::info!("mode set to {mode}");
        self.after_state_change(self.robot_delay());
    }

    pub fn set_ai(&mut self, mode: AiMode, depth: u8) {
        self.cancel_machine_work();
        self.ai.mode = mode;
        self.ai.depth = clamp_depth(Some(depth as i64));
        self.scores.clear();
        tracing::info!("ai set to {} depth {}", mode.as_str(), self.ai.depth);
        self.after_state_change(self.robot_delay());
    }

    /// Board used by the next [`Session::new_game`].
    pub fn set_board(
        &mut self,
        rows: usize,
        cols: usize,
        starting: Player,
    ) -> Result<(), ConfigError> {
        for (name, v) in [("rows", rows), ("cols", cols)] {
            if !(MIN_DIM..=MAX_DIM).contains(&v) {
                return Err(ConfigError::Validation(format!(
                    "{name} must be in [{MIN_DIM}, {MAX_DIM}], got {v}"
                )));
            }
        }
        self.board = BoardConfig {
            rows,
            cols,
            starting_player: starting,
        };
        Ok(())
    }

    pub fn set_names(&mut self, names: PlayerNames) {
        self.names = names;
    }

    pub fn set_save_name(&mut self, name: impl Into<String>) {
        self.save_name = name.into();
    }

    // ----- lifecycle

    /// Fresh local game from the board settings. Leaves an online session.
    pub fn new_game(&mut self) {
        self.cancel_machine_work();
        if let Some(link) = self.online.take() {
            tracing::info!("leaving room {}", link.code);
        }
        let BoardConfig {
            rows,
            cols,
            starting_player,
        } = self.board.clone();
        self.reset_board(rows, cols, MoveLog::new(starting_player), 0);
        self.game_index += 1;
        self.save_name = save::default_save_name();
        self.history.clear();
        self.history.record(
            "system",
            EventKind::New,
            self.game_index,
            0,
            format!("{rows}x{cols}"),
        );
        tracing::info!(
            "new game #{} {}x{} ({}, {} starts)",
            self.game_index,
            rows,
            cols,
            self.mode,
            starting_player
        );
        self.after_state_change(self.robot_delay());
    }

    /// Halts the game with no winner.
    pub fn stop(&mut self) {
        self.cancel_machine_work();
        self.halted = true;
        self.result = GameResult::InProgress;
        tracing::info!("game #{} stopped after {} moves", self.game_index, self.log.len());
    }

    // ----- input

    pub fn hover(&mut self, column: Option<usize>) {
        self.hover = column.filter(|&c| c < self.grid.cols());
    }

    pub fn hovered(&self) -> Option<usize> {
        self.hover
    }

    pub fn click(&mut self, col: usize) -> ClickOutcome {
        if self.is_over() {
            return ClickOutcome::Ignored(IgnoreReason::GameOver);
        }
        if self.is_thinking() || self.move_lock {
            return ClickOutcome::Ignored(IgnoreReason::Busy);
        }
        if let Some(err) = self.check_column(col) {
            return ClickOutcome::Rejected(err);
        }

        if let Some(link) = &self.online {
            if link.role == Role::Spectator {
                return ClickOutcome::Ignored(IgnoreReason::Spectator);
            }
            if self.cursor < self.log.len() {
                return ClickOutcome::Ignored(IgnoreReason::Replay);
            }
            if link.role.player() != Some(self.to_move()) {
                return ClickOutcome::Ignored(IgnoreReason::NotYourTurn);
            }
            return ClickOutcome::SubmitRemote(col);
        }

        if self.cursor < self.log.len() {
            return ClickOutcome::Ignored(IgnoreReason::Replay);
        }
        let player = self.to_move();
        if self.mode.is_machine(player) {
            return ClickOutcome::Ignored(IgnoreReason::NotYourTurn);
        }

        // Analysis of the position being left is worthless now.
        self.cancel_machine_work();
        match self.apply_move(col, player) {
            Ok(pos) => {
                self.after_state_change(self.robot_delay());
                ClickOutcome::Played { player, pos }
            }
            Err(e) => {
                self.after_state_change(self.robot_delay());
                ClickOutcome::Rejected(e)
            }
        }
    }

    fn check_column(&self, col: usize) -> Option<MoveError> {
        if col >= self.grid.cols() {
            Some(MoveError::OutOfRange {
                col,
                cols: self.grid.cols(),
            })
        } else if self.grid.is_column_full(col) {
            Some(MoveError::ColumnFull(col))
        } else {
            None
        }
    }

    // ----- scheduling

    /// Runs every unit due at `now`; returns how many ran.
    pub fn run_due(&mut self, now: Instant) -> usize {
        let mut ran = 0;
        while let Some(task) = self.scheduler.pop_due(now) {
            self.run_task(task);
            ran += 1;
        }
        ran
    }

    /// Runs units until none is pending or `limit` ran.
    pub fn run_until_idle(&mut self, limit: usize) -> usize {
        let mut ran = 0;
        while ran < limit {
            let Some(task) = self.scheduler.pop_due(Instant::now()) else {
                break;
            };
            self.run_task(task);
            ran += 1;
        }
        ran
    }

    pub fn next_due_in(&self, now: Instant) -> Option<Duration> {
        self.scheduler.next_due_in(now)
    }

    fn run_task(&mut self, task: ScheduledTask) {
        match task {
            ScheduledTask::RobotTurn => self.robot_turn(),
            ScheduledTask::SearchStep(id) => self.search_step(id),
        }
    }

    fn robot_delay(&self) -> Duration {
        Duration::from_millis(self.timing.robot_delay)
    }

    /// Drops the active search and every pending unit, and releases the lock.
    fn cancel_machine_work(&mut self) {
        let had_search = self.stepper.cancel();
        let dropped = self.scheduler.cancel_all();
        if had_search || dropped > 0 || self.move_lock {
            tracing::debug!("cancelled machine work ({dropped} pending units)");
        }
        self.move_lock = false;
    }

    /// Replaces the board, log and cursor wholesale and recomputes the result.
    /// A rewound cursor shows the prefix as in progress, like replay navigation.
    fn reset_board(&mut self, rows: usize, cols: usize, log: MoveLog, cursor: usize) {
        let replayed =
            crate::logic::reconstruct(rows, cols, log.moves(), cursor, log.starting_player());
        self.result = if cursor < log.len() {
            GameResult::InProgress
        } else {
            replayed.result()
        };
        self.grid = replayed.grid;
        self.log = log;
        self.cursor = cursor;
        self.halted = false;
        self.scores.clear();
        self.hover = None;
    }

    /// The single append path for local and machine moves.
    fn apply_move(&mut self, col: usize, player: Player) -> Result<Position, MoveError> {
        let pos = self.grid.drop_token(col, player)?;
        self.log.record_at(self.cursor, col);
        self.cursor = self.log.len();
        self.result = result_after(&self.grid, pos, player);
        self.history.record(
            self.name_of(player),
            EventKind::Move,
            self.game_index,
            self.log.len(),
            (col + 1).to_string(),
        );
        match &self.result {
            GameResult::Win { player, .. } => {
                tracing::info!(
                    "game #{} won by {} in {} moves",
                    self.game_index,
                    player,
                    self.log.len()
                )
            }
            GameResult::Draw => tracing::info!("game #{} drawn", self.game_index),
            GameResult::InProgress => {}
        }
        Ok(pos)
    }

    /// Queues the machine's turn or starts analysis for a human, as the position requires.
    fn after_state_change(&mut self, delay: Duration) {
        if self.online.is_some() || self.is_over() || self.cursor < self.log.len() {
            return;
        }
        if self.move_lock || self.is_thinking() {
            return;
        }
        if self.mode.is_machine(self.to_move()) {
            self.stepper.cancel();
            self.scheduler.schedule(delay, ScheduledTask::RobotTurn);
        } else {
            self.start_analysis();
        }
    }

    fn start_analysis(&mut self) {
        self.stepper.cancel();
        if self.ai.mode != AiMode::Minimax {
            self.scores.clear();
            return;
        }
        let begun = self.stepper.begin(
            self.grid.clone(),
            self.ai.depth as usize,
            self.to_move(),
            Purpose::Analyse,
        );
        if let Ok((id, initial)) = begun {
            self.scores = initial;
            self.scheduler.schedule(Duration::ZERO, ScheduledTask::SearchStep(id));
        }
    }

    fn robot_turn(&mut self) {
        if self.online.is_some() || self.is_over() || self.cursor < self.log.len() {
            return;
        }
        if self.move_lock || self.is_thinking() {
            return;
        }
        let player = self.to_move();
        if !self.mode.is_machine(player) {
            return;
        }

        self.stepper.cancel();
        self.move_lock = true;
        match self.ai.mode {
            AiMode::Random => match random_column(&self.grid, &mut self.rng) {
                Some(col) => self.play_machine_move(col, player),
                None => {
                    self.result = GameResult::Draw;
                    self.move_lock = false;
                }
            },
            AiMode::Minimax => {
                let begun = self.stepper.begin(
                    self.grid.clone(),
                    self.ai.depth as usize,
                    player,
                    Purpose::Play,
                );
                match begun {
                    Ok((id, initial)) => {
                        self.scores = initial;
                        self.scheduler.schedule(Duration::ZERO, ScheduledTask::SearchStep(id));
                    }
                    Err(busy) => {
                        tracing::warn!("machine turn skipped, search #{} still active", busy.0);
                        self.move_lock = false;
                    }
                }
            }
        }
    }

    fn search_step(&mut self, id: TaskId) {
        match self.stepper.advance(id, &self.engine) {
            Step::Stale => {}
            Step::Progress {
                column,
                score,
                skipped,
            } => {
                if let Some(slot) = self.scores.get_mut(column) {
                    *slot = score;
                }
                let delay = match self.stepper.active_purpose() {
                    Some(Purpose::Analyse) => self.timing.analysis_step,
                    _ if skipped => self.timing.skip_delay,
                    _ => self.timing.step_delay,
                };
                self.scheduler
                    .schedule(Duration::from_millis(delay), ScheduledTask::SearchStep(id));
            }
            Step::Done {
                purpose: Purpose::Analyse,
                outcome,
                ..
            } => {
                self.scores = outcome.scores;
            }
            Step::Done {
                purpose: Purpose::Play,
                perspective,
                outcome,
            } => {
                self.scores = outcome.scores;
                if perspective != self.to_move() {
                    tracing::warn!("search for {perspective} finished out of turn, discarded");
                    self.move_lock = false;
                    return;
                }
                let column = outcome.column.or_else(|| {
                    let fallback = random_column(&self.grid, &mut self.rng);
                    if let Some(c) = fallback {
                        tracing::warn!("no column could be scored, playing random column {c}");
                    }
                    fallback
                });
                match column {
                    Some(col) => self.play_machine_move(col, perspective),
                    None => self.move_lock = false,
                }
            }
        }
    }

    fn play_machine_move(&mut self, col: usize, player: Player) {
        if let Err(e) = self.apply_move(col, player) {
            tracing::warn!("machine move rejected: {e}");
        }
        self.move_lock = false;
        self.after_state_change(Duration::from_millis(self.timing.chain_delay));
    }

    // ----- output

    pub fn status(&self) -> Status {
        if self.halted {
            return Status::Stopped;
        }
        match &self.result {
            GameResult::Win { player, .. } => Status::Won(*player),
            GameResult::Draw => Status::Draw,
            GameResult::InProgress if self.cursor < self.log.len() => Status::Replay {
                cursor: self.cursor,
                total: self.log.len(),
            },
            GameResult::InProgress if self.is_thinking() => Status::Thinking(self.to_move()),
            GameResult::InProgress => Status::ToMove(self.to_move()),
        }
    }

    pub fn render_view(&self) -> RenderView {
        RenderView {
            grid: self.grid.clone(),
            winning_cells: self.result.winning_cells().to_vec(),
            hover_column: self.hover,
            scores: self.scores.clone(),
            status: self.status(),
            cursor: self.cursor,
            total_moves: self.log.len(),
            game_index: self.game_index,
            mode: self.mode,
            ai_mode: self.ai.mode,
            depth: self.ai.depth,
            names: [self.name_of(Player::A), self.name_of(Player::B)],
            online: self.online.as_ref().map(|l| (l.code.clone(), l.role)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(rows: usize, cols: usize) -> AppConfig {
        let mut cfg = AppConfig::default();
        cfg.board.rows = rows;
        cfg.board.cols = cols;
        cfg.timing = TimingConfig::instant();
        cfg.ai.depth = 2;
        cfg
    }

    fn session(rows: usize, cols: usize) -> Session<ImmediateQueue> {
        Session::with_rng(&config(rows, cols), ImmediateQueue::new(), StdRng::seed_from_u64(3))
    }

    #[test]
    fn starts_as_game_one_with_new_event() {
        let s = session(6, 7);
        assert_eq!(s.game_index(), 1);
        assert_eq!(s.history().latest().unwrap().kind, EventKind::New);
        assert_eq!(s.status(), Status::ToMove(Player::A));
    }

    #[test]
    fn human_clicks_alternate_and_append() {
        let mut s = session(6, 7);
        assert!(matches!(s.click(3), ClickOutcome::Played { player: Player::A, .. }));
        assert!(matches!(s.click(3), ClickOutcome::Played { player: Player::B, .. }));
        assert_eq!(s.log().moves(), &[3, 3]);
        assert_eq!(s.cursor(), 2);
        assert_eq!(s.history().len(), 3);
    }

    #[test]
    fn bad_click_is_a_no_op() {
        let mut s = session(4, 4);
        for _ in 0..4 {
            s.click(0);
        }
        let before = s.log().clone();
        assert_eq!(s.click(0), ClickOutcome::Rejected(MoveError::ColumnFull(0)));
        assert_eq!(
            s.click(9),
            ClickOutcome::Rejected(MoveError::OutOfRange { col: 9, cols: 4 })
        );
        assert_eq!(s.log(), &before);
    }

    #[test]
    fn win_ends_the_game() {
        let mut s = session(6, 7);
        for col in [0, 0, 1, 1, 2, 2, 3] {
            s.click(col);
        }
        assert_eq!(s.status(), Status::Won(Player::A));
        assert_eq!(s.render_view().winning_cells.len(), 4);
        assert_eq!(s.click(4), ClickOutcome::Ignored(IgnoreReason::GameOver));
    }

    #[test]
    fn machine_answers_human() {
        let mut s = session(6, 7);
        s.set_mode(GameMode::HumanVsMachine);
        s.click(3);
        assert_eq!(s.status(), Status::ToMove(Player::B));
        assert_eq!(s.click(2), ClickOutcome::Ignored(IgnoreReason::NotYourTurn));
        s.run_until_idle(1_000);
        assert_eq!(s.log().len(), 2);
        assert!(!s.move_locked());
        assert_eq!(s.status(), Status::ToMove(Player::A));
    }

    #[test]
    fn lock_is_held_during_machine_search() {
        let mut s = session(6, 7);
        s.set_mode(GameMode::HumanVsMachine);
        s.click(3);
        // RobotTurn, then the first search step.
        s.run_until_idle(2);
        assert!(s.move_locked());
        assert!(s.is_thinking());
        assert!(matches!(s.status(), Status::Thinking(Player::B)));
        assert_eq!(s.click(0), ClickOutcome::Ignored(IgnoreReason::Busy));
    }

    #[test]
    fn machine_vs_machine_plays_to_the_end() {
        let mut s = session(4, 4);
        s.set_ai(AiMode::Random, 1);
        s.set_mode(GameMode::MachineVsMachine);
        s.run_until_idle(10_000);
        assert!(s.is_over());
        assert!(s.log().len() >= 7);
        assert_eq!(s.scheduler().pending(), 0);
    }

    #[test]
    fn analysis_fills_scores_on_human_turn() {
        let mut s = session(6, 7);
        assert!(s.is_searching());
        assert!(!s.is_thinking());
        s.run_until_idle(100);
        assert_eq!(s.scores().len(), 7);
        assert!(s.scores().iter().all(|c| matches!(c, ColumnScore::Scored(_))));
        assert!(!s.is_searching());
    }

    #[test]
    fn click_during_analysis_cancels_it() {
        let mut s = session(6, 7);
        s.run_until_idle(2);
        assert!(s.is_searching());
        assert!(matches!(s.click(3), ClickOutcome::Played { .. }));
        assert_eq!(s.log().len(), 1);
        s.run_until_idle(100);
        assert_eq!(s.log().len(), 1);
    }

    #[test]
    fn stop_cancels_machine_work() {
        let mut s = session(6, 7);
        s.set_mode(GameMode::MachineVsMachine);
        s.run_until_idle(3);
        s.stop();
        assert_eq!(s.status(), Status::Stopped);
        assert!(!s.is_searching());
        assert!(!s.move_locked());
        assert_eq!(s.scheduler().pending(), 0);
        let len = s.log().len();
        s.run_until_idle(100);
        assert_eq!(s.log().len(), len);
    }

    #[test]
    fn new_game_uses_board_settings_and_counts() {
        let mut s = session(6, 7);
        s.click(1);
        s.set_board(5, 5, Player::B).unwrap();
        assert!(s.set_board(3, 5, Player::B).is_err());
        s.new_game();
        assert_eq!(s.game_index(), 2);
        assert_eq!((s.grid().rows(), s.grid().cols()), (5, 5));
        assert!(s.log().is_empty());
        assert_eq!(s.to_move(), Player::B);
        assert_eq!(s.history().len(), 1);
    }

    #[test]
    fn hover_is_bounded() {
        let mut s = session(6, 7);
        s.hover(Some(6));
        assert_eq!(s.render_view().hover_column, Some(6));
        s.hover(Some(7));
        assert_eq!(s.hovered(), None);
    }
}
