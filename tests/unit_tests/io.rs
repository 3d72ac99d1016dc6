use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::PathBuf;
use weakgrid::driver::{SolveReport, StepMetrics, StopReason};
use weakgrid::error::FemError;
use weakgrid::field::NodalField;
use weakgrid::grid::GridShape;
use weakgrid::io::{read_field_json, write_field_json, write_report_json};

/// A fresh scratch directory for a single test.
fn scratch_dir(test_name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("weakgrid-io-{}-{}", std::process::id(), test_name));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

#[test]
fn field_json_round_trip() {
    let dir = scratch_dir("field_round_trip");
    let path = dir.join("nested/field.json");
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let field = NodalField::<f64>::random_uniform(2, 3, GridShape::new(5, 4), -1.0, 1.0, &mut rng);

    write_field_json(&path, &field).unwrap();
    let loaded: NodalField<f64> = read_field_json(&path).unwrap();
    assert_eq!(loaded, field);
    // Every entry must survive the text round trip bit for bit
    for (a, b) in loaded.to_vector().iter().zip(field.to_vector().iter()) {
        assert_eq!(a.to_bits(), b.to_bits());
    }
}

#[test]
fn report_json_contains_history() {
    let dir = scratch_dir("report");
    let path = dir.join("report.json");
    let report = SolveReport {
        history: vec![StepMetrics {
            step: 0,
            loss: 2.0,
            final_loss: 1.0,
            inner_iterations: 5,
            function_evaluations: 6,
        }],
        stop_reason: StopReason::EarlyStopped,
        final_loss: 1.0,
        best_loss: Some(2.0),
    };
    write_report_json(&path, &report).unwrap();

    let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["stop_reason"], "EarlyStopped");
    assert_eq!(json["history"][0]["inner_iterations"], 5);
    let parsed: SolveReport<f64> = serde_json::from_value(json).unwrap();
    assert_eq!(parsed, report);
}

#[test]
fn reading_missing_file_is_an_error() {
    let dir = scratch_dir("missing");
    let result = read_field_json::<f64>(dir.join("missing.json"));
    assert!(result.is_err());
}

#[test]
fn reading_inconsistent_field_is_an_error() {
    let dir = scratch_dir("inconsistent");
    std::fs::create_dir_all(&dir).unwrap();
    let field = NodalField::<f64>::zeros(1, 2, GridShape::new(3, 4));
    let valid = serde_json::to_value(&field).unwrap();

    let mut wrong_count = valid.clone();
    wrong_count["batch_size"] = serde_json::json!(2);
    let path = dir.join("wrong_count.json");
    std::fs::write(&path, wrong_count.to_string()).unwrap();
    let err = read_field_json::<f64>(&path).unwrap_err();
    assert!(matches!(
        err.root_cause().downcast_ref::<FemError>(),
        Some(FemError::GridCountMismatch { num_grids: 2, .. })
    ));

    let mut wrong_shape = valid;
    wrong_shape["shape"]["rows"] = serde_json::json!(5);
    let path = dir.join("wrong_shape.json");
    std::fs::write(&path, wrong_shape.to_string()).unwrap();
    let err = read_field_json::<f64>(&path).unwrap_err();
    assert!(matches!(
        err.root_cause().downcast_ref::<FemError>(),
        Some(FemError::ShapeMismatch { .. })
    ));
}
