//! ma-project: equilibrium problem file format, validation and compilation.

pub mod compile;
pub mod migrate;
pub mod schema;
pub mod validate;

pub use compile::{CompiledProblem, compile};
pub use migrate::{LATEST_VERSION, migrate_to_latest};
pub use schema::*;
pub use validate::{ValidationError, validate_problem};

use std::path::Path;

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Migration error: {what}")]
    Migration { what: String },

    #[error("Model error: {0}")]
    Model(#[from] ma_model::ModelError),

    #[error("Compile error: {what}")]
    Compile { what: String },

    #[error("Unsupported file type: {path}")]
    UnsupportedFormat { path: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn load_yaml(path: &Path) -> ProjectResult<ProblemDef> {
    let content = std::fs::read_to_string(path)?;
    let mut problem: ProblemDef = serde_yaml::from_str(&content)?;
    problem = migrate_to_latest(problem)?;
    validate_problem(&problem)?;
    Ok(problem)
}

pub fn save_yaml(path: &Path, problem: &ProblemDef) -> ProjectResult<()> {
    validate_problem(problem)?;
    let content = serde_yaml::to_string(problem)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn load_json(path: &Path) -> ProjectResult<ProblemDef> {
    let content = std::fs::read_to_string(path)?;
    let mut problem: ProblemDef = serde_json::from_str(&content)?;
    problem = migrate_to_latest(problem)?;
    validate_problem(&problem)?;
    Ok(problem)
}

pub fn save_json(path: &Path, problem: &ProblemDef) -> ProjectResult<()> {
    validate_problem(problem)?;
    let content = serde_json::to_string_pretty(problem)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Load by extension: `.json` as JSON, `.yaml`/`.yml` as YAML.
pub fn load(path: &Path) -> ProjectResult<ProblemDef> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => load_json(path),
        Some("yaml") | Some("yml") => load_yaml(path),
        _ => Err(ProjectError::UnsupportedFormat {
            path: path.display().to_string(),
        }),
    }
}
