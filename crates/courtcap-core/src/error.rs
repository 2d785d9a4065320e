// Errors raised by the evaluation stages (aggregate, normalize, score).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvalError {
    /// A raw row or aggregated record is unusable: a required stat is missing
    /// or non-finite, attempts are below makes, or eligibility is empty.
    #[error("data integrity error for player `{player}`: {detail}")]
    DataIntegrity { player: String, detail: String },

    /// League-wide shooting volume cannot anchor the impact calculation.
    #[error("data integrity error: league-wide {category} volume is unusable ({detail})")]
    LeagueVolume {
        category: &'static str,
        detail: String,
    },

    #[error("invalid evaluation options: {0}")]
    Configuration(String),
}

impl EvalError {
    pub(crate) fn integrity(player: &str, detail: impl Into<String>) -> Self {
        EvalError::DataIntegrity {
            player: player.to_string(),
            detail: detail.into(),
        }
    }
}
