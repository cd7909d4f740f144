//! End-to-end tests: evaluation input through assembly, validation and scoring.

mod common;

use common::{uniform_evaluation, write_artifacts, Fixture, THRESHOLD, VERSION};
use dislexia_predictor::core::features::{assemble_features, PaddingProfile};
use dislexia_predictor::core::report::{PredictionOutcome, PredictorMode};
use dislexia_predictor::core::risk::RiskLevel;
use dislexia_predictor::core::schema::{Demographic, FeatureKey};
use dislexia_predictor::evaluation::{Evaluation, EvaluationInput, ScreeningRequest};
use dislexia_predictor::model::{Calibration, ModelCache, ModelState};
use dislexia_predictor::transparency::create_shared_log;
use dislexia_predictor::Predictor;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

fn loaded_predictor(dir: &TempDir) -> Predictor {
    write_artifacts(dir.path());
    Predictor::new(Arc::new(ModelCache::new(dir.path(), Calibration::default())))
}

fn score(predictor: &Predictor, input: &EvaluationInput) -> PredictionOutcome {
    let vector = assemble_features(input, &PaddingProfile::default()).vector;
    predictor.predict(&vector)
}

#[test]
fn test_good_performance_scores_low() {
    let dir = TempDir::new().unwrap();
    let predictor = loaded_predictor(&dir);

    let outcome = score(&predictor, &uniform_evaluation(95.0, 5.0));
    let result = outcome.result().expect("scored result");

    assert!(result.probability < 0.01);
    assert!(!result.has_dyslexia);
    assert_eq!(result.risk_level, RiskLevel::Low);
    assert_eq!(result.classification, "Sin Dislexia");
    assert_eq!(result.threshold_used, THRESHOLD);
    assert_eq!(result.model_version.as_deref(), Some(VERSION));
    assert!(!result.is_simulated());
    assert!(result.recommendation.contains("no indican signos significativos"));
}

#[test]
fn test_poor_performance_scores_high() {
    let dir = TempDir::new().unwrap();
    let predictor = loaded_predictor(&dir);

    let outcome = score(&predictor, &uniform_evaluation(10.0, 90.0));
    let result = outcome.result().expect("scored result");

    assert!(result.probability > 0.99);
    assert!(result.has_dyslexia);
    assert_eq!(result.risk_level, RiskLevel::High);
    assert_eq!(result.classification, "Dislexia Detectada");
    assert!(result.confidence > 0.99);
    assert!(result.recommendation.contains("encarecidamente"));
    assert!(result.disclaimer.contains("86%"));
}

#[test]
fn test_prediction_is_deterministic() {
    let dir = TempDir::new().unwrap();
    let predictor = loaded_predictor(&dir);
    let input = uniform_evaluation(60.0, 40.0);

    let first = score(&predictor, &input);
    let second = score(&predictor, &input);

    let p1 = first.result().unwrap().probability;
    let p2 = second.result().unwrap().probability;
    assert_eq!(p1.to_bits(), p2.to_bits());
}

#[test]
fn test_wire_format() {
    let dir = TempDir::new().unwrap();
    let predictor = loaded_predictor(&dir);

    let outcome = score(&predictor, &uniform_evaluation(95.0, 5.0));
    let json = serde_json::to_value(&outcome).unwrap();

    for field in [
        "tiene_dislexia",
        "probabilidad",
        "probabilidad_porcentaje",
        "confianza",
        "confianza_porcentaje",
        "nivel_riesgo",
        "clasificacion",
        "umbral_utilizado",
        "recomendacion",
        "disclaimer",
    ] {
        assert!(json.get(field).is_some(), "missing {field}");
    }
    assert!(json.get("simulacion").is_none());
    assert_eq!(json["nivel_riesgo"], "BAJO");
}

#[test]
fn test_forced_failure_falls_back_to_simulation() {
    let dir = TempDir::new().unwrap();
    let predictor = loaded_predictor(&dir);
    predictor.cache().force_failed("artifacts quarantined");

    let outcome = score(&predictor, &uniform_evaluation(10.0, 90.0));
    let result = outcome.result().expect("simulated result");

    assert_eq!(result.simulated, Some(true));
    assert!((result.probability - 0.9).abs() < 1e-9);
    assert_eq!(result.threshold_used, 0.5);
    assert!(result.recommendation.starts_with("PREDICCIÓN SIMULADA"));

    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["simulacion"], true);

    predictor.cache().invalidate();
    let outcome = score(&predictor, &uniform_evaluation(10.0, 90.0));
    assert!(!outcome.result().unwrap().is_simulated());
}

#[test]
fn test_missing_artifacts_simulate() {
    let dir = TempDir::new().unwrap();
    let predictor = Predictor::new(Arc::new(ModelCache::new(
        dir.path().join("absent"),
        Calibration::default(),
    )));

    let outcome = score(&predictor, &uniform_evaluation(95.0, 5.0));
    assert!(outcome.result().unwrap().is_simulated());

    let info = predictor.model_info();
    assert!(!info.loaded);
    assert_eq!(info.mode, PredictorMode::Simulation);
}

#[test]
fn test_mismatched_versions_simulate() {
    let dir = TempDir::new().unwrap();
    Fixture {
        scaler_version: "v2.1".to_string(),
        ..Fixture::default()
    }
    .write(dir.path());
    let cache = ModelCache::new(dir.path(), Calibration::default());

    match cache.ensure_loaded() {
        ModelState::Degraded(reason) => assert!(reason.contains("v2.1")),
        ModelState::Ready(_) => panic!("mismatched artifact set must not load"),
    }
}

#[test]
fn test_missing_threshold_defaults_to_half() {
    let dir = TempDir::new().unwrap();
    Fixture {
        threshold: None,
        ..Fixture::default()
    }
    .write(dir.path());
    let predictor = Predictor::new(Arc::new(ModelCache::new(dir.path(), Calibration::default())));

    assert_eq!(predictor.model_info().threshold, 0.5);
}

#[test]
fn test_model_metrics_come_from_artifact() {
    let dir = TempDir::new().unwrap();
    let predictor = loaded_predictor(&dir);
    let metrics = predictor.model_info().metrics.expect("shipped metrics");
    assert_eq!(metrics.roc_auc, 0.8210);

    let bare = TempDir::new().unwrap();
    Fixture {
        metrics: false,
        ..Fixture::default()
    }
    .write(bare.path());
    let predictor = Predictor::new(Arc::new(ModelCache::new(bare.path(), Calibration::default())));

    let info = predictor.model_info();
    assert!(info.loaded);
    assert!(info.metrics.is_none());
    let json = serde_json::to_value(&info).unwrap();
    assert!(json.get("metricas").is_none());
}

#[test]
fn test_numeric_overflow_is_error_flagged() {
    let dir = TempDir::new().unwrap();
    // Age sits in the last model column; dividing by a subnormal scale overflows.
    let mut scale = vec![1.0; 196];
    scale[195] = 1e-308;
    Fixture {
        scale,
        ..Fixture::default()
    }
    .write(dir.path());

    let log = create_shared_log();
    let predictor = Predictor::new(Arc::new(ModelCache::new(dir.path(), Calibration::default())))
        .with_log(log.clone());

    let outcome = score(&predictor, &uniform_evaluation(95.0, 5.0));
    assert!(outcome.is_error());

    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["error"], true);
    assert!(json["tiene_dislexia"].is_null());
    assert!(json["probabilidad"].is_null());
    assert_eq!(log.stats().inference_failures, 1);
}

#[test]
fn test_calibration_from_model_dir() {
    let dir = TempDir::new().unwrap();
    Fixture {
        calibration: Some(serde_json::json!({
            "risk_bands": {"medium_from": 0.0, "high_from": 0.999999},
            "validated_accuracy": 0.9
        })),
        ..Fixture::default()
    }
    .write(dir.path());
    let predictor = Predictor::new(Arc::new(ModelCache::new(dir.path(), Calibration::default())));

    let outcome = score(&predictor, &uniform_evaluation(95.0, 5.0));
    let result = outcome.result().unwrap();
    assert_eq!(result.risk_level, RiskLevel::Medium);
    assert!(result.disclaimer.contains("90%"));
}

#[test]
fn test_concurrent_first_use_loads_once() {
    let dir = TempDir::new().unwrap();
    write_artifacts(dir.path());
    let cache = Arc::new(ModelCache::new(dir.path(), Calibration::default()));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || match cache.ensure_loaded() {
                ModelState::Ready(model) => model,
                ModelState::Degraded(reason) => panic!("load failed: {reason}"),
            })
        })
        .collect();

    let models: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for model in &models[1..] {
        assert!(Arc::ptr_eq(&models[0], model));
    }
}

#[test]
fn test_screen_complete_evaluation() {
    let dir = TempDir::new().unwrap();
    let log = create_shared_log();
    let predictor = loaded_predictor(&dir).with_log(log.clone());

    let mut evaluation = Evaluation::new(common::child());
    for ordinal in 1..=32u8 {
        let session = evaluation.start_exercise(ordinal).unwrap();
        for answer in 0..5 {
            session.record_answer(answer != 4, 10).unwrap();
        }
        evaluation.complete_exercise(ordinal).unwrap();
    }
    assert!(evaluation.is_ready_to_score());

    let report = predictor.screen(&evaluation.to_input());

    assert!(report.success);
    assert_eq!(report.evaluation.sessions.completed, 32);
    assert_eq!(report.evaluation.metrics.mean_accuracy, 80.0);
    let coverage = report.coverage.unwrap();
    assert_eq!(coverage.real_exercises, 32);
    assert_eq!(coverage.padded_exercises, 0);

    let info = report.model_info.unwrap();
    assert_eq!(info.mode, PredictorMode::Production);
    assert_eq!(info.version, VERSION);
    assert_eq!(info.total_features, 196);

    let stats = log.stats();
    assert_eq!(stats.screenings, 1);
    assert_eq!(stats.scored_predictions, 1);
}

#[test]
fn test_screen_partial_evaluation_is_padded() {
    let dir = TempDir::new().unwrap();
    let predictor = loaded_predictor(&dir);

    let mut evaluation = Evaluation::new(common::child());
    for ordinal in 1..=3u8 {
        let session = evaluation.start_exercise(ordinal).unwrap();
        session.record_answer(true, 10).unwrap();
        evaluation.complete_exercise(ordinal).unwrap();
    }
    evaluation.start_exercise(4).unwrap();
    evaluation.abandon_exercise(4).unwrap();

    let input = evaluation.to_input();
    assert_eq!(input.exercises.len(), 3);

    let report = predictor.screen(&input);
    assert!(report.success);
    let coverage = report.coverage.unwrap();
    assert_eq!(coverage.real_exercises, 3);
    assert_eq!(coverage.padded_exercises, 29);
}

#[test]
fn test_screen_rejects_invalid_demographics() {
    let dir = TempDir::new().unwrap();
    let predictor = loaded_predictor(&dir);

    let mut input = uniform_evaluation(95.0, 5.0);
    input.child.age = 18;
    let report = predictor.screen(&input);

    assert!(!report.success);
    assert_eq!(report.error.as_deref(), Some("Features inválidas"));
    assert_eq!(report.validation_errors.len(), 1);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["success"], false);
    assert!(json["errores_validacion"].is_array());
    assert!(json.get("prediccion").is_none());
}

#[test]
fn test_assembled_demographics_reach_model() {
    let input = uniform_evaluation(95.0, 5.0);
    let vector = assemble_features(&input, &PaddingProfile::default()).vector;

    assert_eq!(vector.get(FeatureKey::Demographic(Demographic::Age)), 9.0);
    assert_eq!(vector.get(FeatureKey::Demographic(Demographic::GenderMale)), 1.0);
}

#[test]
fn test_configured_languages_set_native_flag() {
    let mut request: serde_json::Value =
        serde_json::to_value(ScreeningRequest::from(uniform_evaluation(95.0, 5.0))).unwrap();
    request["child"] = serde_json::json!({
        "age": 9,
        "gender": "masculino",
        "native_language": "Galego",
        "other_languages": true
    });
    let request: ScreeningRequest = serde_json::from_value(request).unwrap();
    let native = FeatureKey::Demographic(Demographic::NativelangYes);

    let default_input = request.clone().into_input(&["espa", "spanish", "castellano"]);
    let vector = assemble_features(&default_input, &PaddingProfile::default()).vector;
    assert_eq!(vector.get(native), 0.0);

    let input = request.into_input(&["galego".to_string()]);
    assert_eq!(input.exercises.len(), 32);
    let vector = assemble_features(&input, &PaddingProfile::default()).vector;
    assert_eq!(vector.get(native), 1.0);
    assert_eq!(vector.get(FeatureKey::Demographic(Demographic::OtherlangYes)), 1.0);
    assert_eq!(vector.get(FeatureKey::Demographic(Demographic::GenderMale)), 1.0);
}
