//! Problem file schema definitions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProblemDef {
    pub version: u32,
    pub name: String,
    #[serde(default)]
    pub species: Vec<String>,
    #[serde(default)]
    pub reactions: Vec<ReactionDef>,
    #[serde(default)]
    pub constraints: Vec<ConstraintDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solver: Option<SolverDef>,
}

/// Species name to stoichiometric coefficient or constraint weight.
pub type TermsDef = BTreeMap<String, f64>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ReactionDef {
    #[serde(default)]
    pub reactants: TermsDef,
    #[serde(default)]
    pub products: TermsDef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ln_k: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log10_k: Option<f64>,
    /// Version 0 only: the equilibrium constant itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equilibrium_constant: Option<f64>,
}

impl ReactionDef {
    /// Natural log of the equilibrium constant, whichever way it was given.
    pub fn resolved_ln_k(&self) -> Option<f64> {
        match (self.ln_k, self.log10_k) {
            (Some(ln_k), None) => Some(ln_k),
            (None, Some(log10_k)) => Some(log10_k * std::f64::consts::LN_10),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ConstraintDef {
    pub terms: TermsDef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logspace: Option<LogspaceDef>,
}

/// Resolved right-hand side of a constraint entry.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetDef {
    Fixed(f64),
    Swept(Vec<f64>),
}

impl ConstraintDef {
    /// `None` unless exactly one of `value`, `values`, `logspace` is set.
    pub fn target(&self) -> Option<TargetDef> {
        match (&self.value, &self.values, &self.logspace) {
            (Some(v), None, None) => Some(TargetDef::Fixed(*v)),
            (None, Some(vs), None) => Some(TargetDef::Swept(vs.clone())),
            (None, None, Some(ls)) => Some(TargetDef::Swept(ls.points())),
            _ => None,
        }
    }

    pub fn is_sweep(&self) -> bool {
        matches!(self.target(), Some(TargetDef::Swept(_)))
    }
}

/// `num` points evenly spaced in log10 between `10^start` and `10^stop`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LogspaceDef {
    pub start: f64,
    pub stop: f64,
    pub num: usize,
}

impl LogspaceDef {
    pub fn points(&self) -> Vec<f64> {
        match self.num {
            0 => Vec::new(),
            1 => vec![10f64.powf(self.start)],
            n => {
                let step = (self.stop - self.start) / (n - 1) as f64;
                (0..n)
                    .map(|i| 10f64.powf(self.start + step * i as f64))
                    .collect()
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SolverDef {
    #[serde(default)]
    pub residual_form: ResidualFormDef,
    #[serde(default)]
    pub initial_guess: InitialGuessDef,
    /// Required when `initial_guess` is `provided`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_ln_concentrations: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abs_tol: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rel_tol: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_step: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_step: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResidualFormDef {
    #[default]
    Linear,
    LogRatio,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum InitialGuessDef {
    #[default]
    Zeros,
    Reservoir,
    Provided,
}
