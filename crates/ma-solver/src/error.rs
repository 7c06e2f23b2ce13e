//! Error types for solver operations.

use ma_core::MaError;
use ma_model::ModelError;
use thiserror::Error;

/// Errors that can occur while assembling or solving an equilibrium system.
#[derive(Error, Debug)]
pub enum SolverError {
    #[error("Composition error: {0}")]
    Composition(#[from] ModelError),

    #[error("Dimension error: {what}")]
    Dimension { what: String },

    #[error("Singular system: {what}")]
    Singular { what: String },

    #[error("Convergence failed: {what}")]
    ConvergenceFailed { what: String },

    #[error("Sweep point {index} failed: {source}")]
    SweepPoint {
        index: usize,
        source: Box<SolverError>,
    },
}

pub type SolverResult<T> = Result<T, SolverError>;

impl SolverError {
    /// The underlying error, looking through sweep annotations.
    pub fn root(&self) -> &SolverError {
        match self {
            SolverError::SweepPoint { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<SolverError> for MaError {
    fn from(e: SolverError) -> Self {
        match e {
            SolverError::Composition(err) => err.into(),
            SolverError::Dimension { what } => MaError::Dimension { what },
            SolverError::Singular { what } => MaError::Singular { what },
            SolverError::ConvergenceFailed { what } => MaError::Convergence { what },
            SolverError::SweepPoint { index, source } => {
                let at = |what: String| format!("sweep point {}: {}", index, what);
                match MaError::from(*source) {
                    MaError::Composition { what } => MaError::Composition { what: at(what) },
                    MaError::Dimension { what } => MaError::Dimension { what: at(what) },
                    MaError::Singular { what } => MaError::Singular { what: at(what) },
                    MaError::Convergence { what } => MaError::Convergence { what: at(what) },
                    other => other,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_unwraps_sweep_annotations() {
        let err = SolverError::SweepPoint {
            index: 3,
            source: Box::new(SolverError::Singular {
                what: "dependent rows".to_string(),
            }),
        };
        assert!(matches!(err.root(), SolverError::Singular { .. }));
        assert!(err.to_string().contains("Sweep point 3"));
    }

    #[test]
    fn converts_into_core_error() {
        let err: MaError = SolverError::Dimension {
            what: "2 equations for 3 species".to_string(),
        }
        .into();
        assert!(matches!(err, MaError::Dimension { .. }));

        let err: MaError = SolverError::Composition(ModelError::EmptySweep).into();
        assert!(matches!(err, MaError::Composition { .. }));
    }

    #[test]
    fn sweep_point_keeps_its_kind() {
        let err: MaError = SolverError::SweepPoint {
            index: 4,
            source: Box::new(SolverError::ConvergenceFailed {
                what: "maximum iterations 200 reached".to_string(),
            }),
        }
        .into();
        match err {
            MaError::Convergence { what } => assert!(what.starts_with("sweep point 4: ")),
            other => panic!("unexpected {:?}", other),
        }

        let err: MaError = SolverError::SweepPoint {
            index: 0,
            source: Box::new(SolverError::Singular {
                what: "constraints are linearly dependent".to_string(),
            }),
        }
        .into();
        assert!(matches!(err, MaError::Singular { .. }));
    }
}
