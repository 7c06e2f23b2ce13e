//! Schema migration framework.

use crate::ProjectError;
use crate::schema::ProblemDef;

pub const LATEST_VERSION: u32 = 1;

pub fn migrate_to_latest(mut problem: ProblemDef) -> Result<ProblemDef, ProjectError> {
    while problem.version < LATEST_VERSION {
        problem = migrate_one_version(problem)?;
    }
    Ok(problem)
}

fn migrate_one_version(problem: ProblemDef) -> Result<ProblemDef, ProjectError> {
    match problem.version {
        0 => migrate_v0_to_v1(problem),
        v => Err(ProjectError::Migration {
            what: format!("No migration path from version {}", v),
        }),
    }
}

/// Version 0 gave reactions a raw `equilibrium_constant` (K); version 1
/// stores `ln_k` or `log10_k`.
fn migrate_v0_to_v1(mut problem: ProblemDef) -> Result<ProblemDef, ProjectError> {
    for (i, reaction) in problem.reactions.iter_mut().enumerate() {
        let Some(k) = reaction.equilibrium_constant.take() else {
            continue;
        };
        if reaction.ln_k.is_some() || reaction.log10_k.is_some() {
            return Err(ProjectError::Migration {
                what: format!(
                    "reaction {} gives both equilibrium_constant and a log constant",
                    i
                ),
            });
        }
        if !(k.is_finite() && k > 0.0) {
            return Err(ProjectError::Migration {
                what: format!(
                    "reaction {} equilibrium_constant must be positive, got {}",
                    i, k
                ),
            });
        }
        reaction.ln_k = Some(k.ln());
    }

    problem.version = 1;
    Ok(problem)
}
