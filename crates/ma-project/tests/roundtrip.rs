use ma_project::schema::*;
use ma_project::{load, load_json, load_yaml, save_json, save_yaml, validate_problem};

fn terms(entries: &[(&str, f64)]) -> TermsDef {
    entries.iter().map(|(n, c)| (n.to_string(), *c)).collect()
}

fn schottky() -> ProblemDef {
    ProblemDef {
        version: 1,
        name: "Schottky".to_string(),
        species: vec!["nil".to_string(), "V_M".to_string(), "V_O".to_string()],
        reactions: vec![ReactionDef {
            reactants: terms(&[("nil", 1.0)]),
            products: terms(&[("V_M", 1.0), ("V_O", 2.0)]),
            ln_k: Some(-25.0),
            ..ReactionDef::default()
        }],
        constraints: vec![
            ConstraintDef {
                terms: terms(&[("nil", 1.0)]),
                value: Some(1.0),
                ..ConstraintDef::default()
            },
            ConstraintDef {
                terms: terms(&[("V_O", 2.0), ("V_M", -4.0)]),
                values: Some(vec![0.0]),
                ..ConstraintDef::default()
            },
        ],
        solver: Some(SolverDef {
            residual_form: ResidualFormDef::LogRatio,
            initial_guess: InitialGuessDef::Reservoir,
            max_iterations: Some(100),
            ..SolverDef::default()
        }),
    }
}

#[test]
fn roundtrip_yaml_empty_problem() {
    let problem = ProblemDef {
        version: 1,
        name: "Empty".to_string(),
        species: vec![],
        reactions: vec![],
        constraints: vec![],
        solver: None,
    };
    validate_problem(&problem).unwrap();

    let path = std::env::temp_dir().join("ma_project_roundtrip_empty.yaml");
    save_yaml(&path, &problem).unwrap();
    let loaded = load_yaml(&path).unwrap();
    assert_eq!(problem, loaded);
}

#[test]
fn roundtrip_yaml_full_problem() {
    let problem = schottky();
    let path = std::env::temp_dir().join("ma_project_roundtrip_schottky.yaml");
    save_yaml(&path, &problem).unwrap();
    assert_eq!(load(&path).unwrap(), problem);
}

#[test]
fn roundtrip_json_full_problem() {
    let problem = schottky();
    let path = std::env::temp_dir().join("ma_project_roundtrip_schottky.json");
    save_json(&path, &problem).unwrap();
    assert_eq!(load_json(&path).unwrap(), problem);
}

#[test]
fn invalid_problem_is_not_saved() {
    let mut problem = schottky();
    problem.species.push("nil".to_string());
    let path = std::env::temp_dir().join("ma_project_invalid.yaml");
    assert!(save_yaml(&path, &problem).is_err());
}

#[test]
fn unknown_extension_is_rejected() {
    let path = std::env::temp_dir().join("ma_project_problem.toml");
    assert!(matches!(
        load(&path),
        Err(ma_project::ProjectError::UnsupportedFormat { .. })
    ));
}
