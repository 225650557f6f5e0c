pub mod alpha_beta;
pub mod config;
pub mod eval;
pub mod evaluator;
pub mod random;
pub mod stepper;

pub use alpha_beta::{ColumnScore, SearchEngine, WIN_SCORE};
pub use config::{clamp_depth, AiConfig, AiMode, EvalWeights, MAX_DEPTH, MIN_DEPTH};
pub use eval::WindowEvaluator;
pub use evaluator::Evaluator;
pub use random::random_column;
pub use stepper::{Purpose, SearchOutcome, SearchTask, Step, StepScheduler, TaskId};
