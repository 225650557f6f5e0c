use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const MIN_DEPTH: u8 = 1;
pub const MAX_DEPTH: u8 = 8;
pub const DEFAULT_DEPTH: u8 = 4;

/// How the machine picks its columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AiMode {
    Random,
    #[default]
    Minimax,
}

impl AiMode {
    pub fn as_str(self) -> &'static str {
        match self {
            AiMode::Random => "random",
            AiMode::Minimax => "minimax",
        }
    }

    /// Lenient parse used for saved documents: anything but "minimax" is random.
    pub fn parse_lenient(s: &str) -> AiMode {
        if s.trim().eq_ignore_ascii_case("minimax") {
            AiMode::Minimax
        } else {
            AiMode::Random
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub mode: AiMode,
    pub depth: u8,
    pub weights: EvalWeights,
}

/// Evaluator constants. Opponent weights are stored as positive magnitudes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalWeights {
    pub center: i64,
    pub four: i64,
    pub own_three: i64,
    pub own_two: i64,
    pub opp_three: i64,
    pub opp_two: i64,
}

impl Default for EvalWeights {
    fn default() -> Self {
        EvalWeights {
            center: 10,
            four: 1_000_000,
            own_three: 200,
            own_two: 30,
            opp_three: 220,
            opp_two: 35,
        }
    }
}

impl EvalWeights {
    /// Checks win > own three > own two > 0 and the mirrored order for the opponent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ordered = self.four > self.own_three
            && self.own_three > self.own_two
            && self.own_two > 0
            && self.four > self.opp_three
            && self.opp_three > self.opp_two
            && self.opp_two > 0
            && self.center >= 0;
        if ordered {
            Ok(())
        } else {
            Err(ConfigError::Validation(format!(
                "ai.weights must keep four > three > two > 0 for both sides, got {self:?}"
            )))
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        AiConfig {
            mode: AiMode::Minimax,
            depth: DEFAULT_DEPTH,
            weights: EvalWeights::default(),
        }
    }
}

impl AiConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_DEPTH..=MAX_DEPTH).contains(&self.depth) {
            return Err(ConfigError::Validation(format!(
                "ai.depth must be in [{MIN_DEPTH}, {MAX_DEPTH}], got {}",
                self.depth
            )));
        }
        self.weights.validate()
    }
}

/// Clamps an untrusted depth into the supported range, `DEFAULT_DEPTH` when absent.
pub fn clamp_depth(depth: Option<i64>) -> u8 {
    match depth {
        Some(d) => d.clamp(MIN_DEPTH as i64, MAX_DEPTH as i64) as u8,
        None => DEFAULT_DEPTH,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(AiConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_depth_out_of_range() {
        let cfg = AiConfig {
            depth: 9,
            ..AiConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_inverted_weights() {
        let weights = EvalWeights {
            own_two: 500,
            ..EvalWeights::default()
        };
        assert!(weights.validate().is_err());
    }

    #[test]
    fn mode_parsing() {
        assert_eq!(AiMode::parse_lenient("Minimax"), AiMode::Minimax);
        assert_eq!(AiMode::parse_lenient("whatever"), AiMode::Random);
        let m: AiMode = serde_json::from_str("\"random\"").unwrap();
        assert_eq!(m, AiMode::Random);
    }

    #[test]
    fn depth_clamping() {
        assert_eq!(clamp_depth(Some(0)), 1);
        assert_eq!(clamp_depth(Some(12)), 8);
        assert_eq!(clamp_depth(Some(5)), 5);
        assert_eq!(clamp_depth(None), 4);
    }
}
