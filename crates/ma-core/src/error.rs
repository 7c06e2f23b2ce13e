use thiserror::Error;

pub type MaResult<T> = Result<T, MaError>;

#[derive(Error, Debug)]
pub enum MaError {
    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: String },

    #[error("Index out of bounds: {what} (index={index}, len={len})")]
    IndexOob {
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error("Composition error: {what}")]
    Composition { what: String },

    #[error("Dimension error: {what}")]
    Dimension { what: String },

    #[error("Singular system: {what}")]
    Singular { what: String },

    #[error("Convergence failed: {what}")]
    Convergence { what: String },
}
