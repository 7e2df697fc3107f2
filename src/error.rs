use thiserror::Error;

#[derive(Error, Debug)]
pub enum StatsError {
    #[error("Unit already registered: {0}")]
    UnitAlreadyRegistered(String),

    #[error("Unknown unit: {0}")]
    UnknownUnit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, StatsError>;
