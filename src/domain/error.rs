//! Domain error types.

/// Top-level error type for tradebot.
#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error("no data available for {symbol}: {reason}")]
    DataUnavailable { symbol: String, reason: String },

    #[error("insufficient funds: requested {requested:.2} USD, available {available:.2} USD")]
    InsufficientFunds { requested: f64, available: f64 },

    #[error("no holdings of {symbol} to sell")]
    NoHoldings { symbol: String },

    #[error("persistence error: {reason}")]
    Persistence { reason: String },

    #[error("strategy error: {reason}")]
    Strategy { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&BotError> for std::process::ExitCode {
    fn from(err: &BotError) -> Self {
        let code: u8 = match err {
            BotError::Io(_) => 1,
            BotError::ConfigParse { .. }
            | BotError::ConfigMissing { .. }
            | BotError::ConfigInvalid { .. } => 2,
            BotError::Persistence { .. } => 3,
            BotError::Strategy { .. } => 4,
            BotError::DataUnavailable { .. } => 5,
            BotError::InsufficientFunds { .. } | BotError::NoHoldings { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
