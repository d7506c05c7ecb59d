use thiserror::Error;

pub type KpResult<T> = Result<T, KpError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KpError {
    /// A user-supplied date matched neither `YYYY-MM-DD` nor `DD.MM.YYYY`.
    #[error("Invalid date for {what}: '{value}'")]
    InvalidDate { what: &'static str, value: String },
}
