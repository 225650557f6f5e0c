use super::{Scheduler, Session};
use crate::logic::{reconstruct, GameResult};

impl<S: Scheduler> Session<S> {
    /// Moves the view cursor to `index` (clamped) and shows that prefix.
    ///
    /// Machine work is cancelled. A rewound view is shown as in progress with
    /// no highlight; at the end of the log the real result is restored and play
    /// resumes. Returns `false` when refused (online).
    pub fn navigate_to(&mut self, index: usize) -> bool {
        if let Some(link) = &self.online {
            tracing::warn!("replay refused while online in room {}", link.code);
            return false;
        }
        self.cancel_machine_work();

        let total = self.log.len();
        let cursor = index.min(total);
        let replayed = reconstruct(
            self.grid.rows(),
            self.grid.cols(),
            self.log.moves(),
            cursor,
            self.log.starting_player(),
        );
        self.grid = replayed.grid.clone();
        self.cursor = cursor;
        self.halted = false;
        self.scores.clear();
        self.result = if cursor == total {
            replayed.result()
        } else {
            GameResult::InProgress
        };
        tracing::debug!("view at {cursor}/{total}");

        if cursor == total {
            self.after_state_change(self.robot_delay());
        }
        true
    }

    pub fn first(&mut self) -> bool {
        self.navigate_to(0)
    }

    pub fn prev(&mut self) -> bool {
        self.navigate_to(self.cursor.saturating_sub(1))
    }

    pub fn next(&mut self) -> bool {
        self.navigate_to(self.cursor + 1)
    }

    pub fn last(&mut self) -> bool {
        self.navigate_to(self.log.len())
    }

    pub fn in_replay(&self) -> bool {
        self.cursor < self.log.len()
    }

    /// Discards the moves after the cursor and continues play from the shown position.
    pub fn resume_here(&mut self) -> bool {
        if self.online.is_some() || !self.in_replay() {
            return false;
        }
        self.cancel_machine_work();
        let dropped = self.log.len() - self.cursor;
        self.log.truncate(self.cursor);
        let replayed = reconstruct(
            self.grid.rows(),
            self.grid.cols(),
            self.log.moves(),
            self.cursor,
            self.log.starting_player(),
        );
        self.result = replayed.result();
        tracing::info!("resumed at move {}, {dropped} later moves discarded", self.cursor);
        self.after_state_change(self.robot_delay());
        true
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{AppConfig, TimingConfig};
    use crate::core::{Cell, Player};
    use crate::game::{ClickOutcome, IgnoreReason, ImmediateQueue, Scheduler, Session, Status};
    use crate::player::ai::AiMode;
    use crate::player::GameMode;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn session() -> Session<ImmediateQueue> {
        let mut cfg = AppConfig::default();
        cfg.board.rows = 6;
        cfg.board.cols = 7;
        cfg.timing = TimingConfig::instant();
        cfg.ai.mode = AiMode::Random;
        Session::with_rng(&cfg, ImmediateQueue::new(), StdRng::seed_from_u64(9))
    }

    #[test]
    fn navigation_clamps_and_rebuilds() {
        let mut s = session();
        for col in [3, 3, 4, 5] {
            s.click(col);
        }
        assert!(s.navigate_to(2));
        assert_eq!(s.cursor(), 2);
        assert_eq!(s.grid().get(5, 4), Cell::Empty);
        assert_eq!(s.grid().get(4, 3), Cell::Token(Player::B));
        assert_eq!(s.status(), Status::Replay { cursor: 2, total: 4 });

        s.navigate_to(99);
        assert_eq!(s.cursor(), 4);
        s.first();
        assert_eq!(s.cursor(), 0);
        s.prev();
        assert_eq!(s.cursor(), 0);
        s.next();
        assert_eq!(s.cursor(), 1);
        s.last();
        assert_eq!(s.cursor(), 4);
        assert_eq!(s.log().moves(), &[3, 3, 4, 5]);
    }

    #[test]
    fn rewound_view_refuses_clicks_and_hides_result() {
        let mut s = session();
        for col in [0, 0, 1, 1, 2, 2, 3] {
            s.click(col);
        }
        assert_eq!(s.status(), Status::Won(Player::A));
        s.prev();
        assert!(s.render_view().winning_cells.is_empty());
        assert_eq!(s.click(4), ClickOutcome::Ignored(IgnoreReason::Replay));
        s.last();
        assert_eq!(s.status(), Status::Won(Player::A));
    }

    #[test]
    fn resume_truncates_future() {
        let mut s = session();
        for col in [3, 3, 4, 5] {
            s.click(col);
        }
        s.navigate_to(2);
        assert!(s.resume_here());
        assert_eq!(s.log().moves(), &[3, 3]);
        assert!(matches!(s.click(6), ClickOutcome::Played { player: Player::A, .. }));
        assert_eq!(s.log().moves(), &[3, 3, 6]);
        assert!(!s.resume_here());
    }

    #[test]
    fn navigation_cancels_machine_turn() {
        let mut s = session();
        s.set_mode(GameMode::HumanVsMachine);
        s.click(3);
        assert_eq!(s.scheduler().pending(), 1);
        s.navigate_to(0);
        assert_eq!(s.scheduler().pending(), 0);
        assert!(!s.move_locked());
        assert_eq!(s.log().len(), 1);
    }
}
