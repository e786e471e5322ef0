use std::fs::File;
use std::path::Path;

use approx::assert_abs_diff_eq;
use ndarray::Array1;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;

use winetrack::ParamGuard;
use winetrack_datasets::{generate, write_csv};
use winetrack_tracking::{
    FileStore, LoggingError, MemoryStore, Metric, ModelVersion, RunInfo, RunStatus,
    TrackingStore,
};
use winetrack_workflow::{run_training, CapturedDiagnostics, WorkflowError, WorkflowParams};

fn write_winequality(path: &Path, n: usize, seed: u64) {
    let mut rng = Xoshiro256Plus::seed_from_u64(seed);
    let dataset = generate::winequality_like(n, &mut rng);
    write_csv(&dataset, "quality", b';', File::create(path).unwrap()).unwrap();
}

#[test]
fn logs_params_metrics_and_model() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("winequality-red.csv");
    write_winequality(&csv, 100, 42);

    let params = WorkflowParams::new()
        .data_source(csv.to_str().unwrap())
        .check()
        .unwrap();
    let store = MemoryStore::new();
    let diagnostics = CapturedDiagnostics::new();
    let mut out = Vec::new();

    let summary = run_training(&params, &store, &diagnostics, &mut out).unwrap();

    assert_eq!(summary.n_train, 75);
    assert_eq!(summary.n_test, 25);
    assert!(diagnostics.warnings().is_empty());

    let runs = store.runs();
    assert_eq!(runs.len(), 1);
    let run = &runs[0];
    assert_eq!(run.info.status, RunStatus::Finished);
    assert_eq!(run.info.run_id, summary.run.run_id);
    assert_eq!(run.param_values("alpha"), vec!["0.5"]);
    assert_eq!(run.param_values("l1_ratio"), vec!["0.5"]);
    for key in &["rmse", "mae", "r2"] {
        let values = run.metric_values(key);
        assert_eq!(values.len(), 1, "metric {}", key);
        assert!(values[0].is_finite(), "metric {}", key);
    }
    assert!(run.metric_values("rmse")[0] >= 0.0);
    assert!(run.metric_values("r2")[0] <= 1.0);
    assert!(run.artifacts.contains_key("model/model.json"));
    assert!(run.artifacts.contains_key("model/MLmodel"));

    let versions = store.model_versions("ElasticnetWineModel");
    assert_eq!(versions.len(), 1);
    assert_eq!(
        versions[0].source,
        format!("runs:/{}/model", summary.run.run_id)
    );
    assert_eq!(summary.model_version.as_ref(), Some(&versions[0]));

    let printed = String::from_utf8(out).unwrap();
    assert!(printed.starts_with("Elasticnet model (alpha=0.500000, l1_ratio=0.500000):\n"));
    assert!(printed.contains("  RMSE: "));
    assert!(printed.contains("  MAE: "));
    assert!(printed.contains("  R2: "));
    assert_eq!(printed.trim_end(), summary.to_string());
}

#[test]
fn same_settings_same_scores() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("winequality-red.csv");
    write_winequality(&csv, 120, 7);

    let params = WorkflowParams::new()
        .data_source(csv.to_str().unwrap())
        .check()
        .unwrap();
    let store = MemoryStore::new();
    let diagnostics = CapturedDiagnostics::new();

    let first = run_training(&params, &store, &diagnostics, &mut std::io::sink()).unwrap();
    let second = run_training(&params, &store, &diagnostics, &mut std::io::sink()).unwrap();

    assert_eq!(first.metrics, second.metrics);
    assert_ne!(first.run.run_id, second.run.run_id);
    assert_eq!(store.runs().len(), 2);
    assert_eq!(store.model_versions("ElasticnetWineModel").len(), 2);
}

#[test]
fn unpenalized_fit_on_linear_data() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("linear.csv");

    let mut rng = Xoshiro256Plus::seed_from_u64(3);
    let weights = Array1::linspace(-1.0, 1.0, 11);
    let dataset = generate::linear(200, &weights, 5.5, &mut rng);
    write_csv(&dataset, "quality", b';', File::create(&csv).unwrap()).unwrap();

    let params = WorkflowParams::new()
        .data_source(csv.to_str().unwrap())
        .alpha(0.0)
        .l1_ratio(0.0)
        .check()
        .unwrap();
    let store = MemoryStore::new();

    let summary = run_training(
        &params,
        &store,
        &CapturedDiagnostics::new(),
        &mut std::io::sink(),
    )
    .unwrap();

    assert_abs_diff_eq!(summary.metrics.r2, 1.0, epsilon = 1e-6);
    assert_abs_diff_eq!(summary.metrics.rmse, 0.0, epsilon = 1e-3);
}

#[test]
fn train_fraction_sets_split_sizes() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("winequality-red.csv");
    write_winequality(&csv, 100, 11);

    for (fraction, n_train, n_test) in &[(0.7, 70, 30), (0.9, 90, 10), (0.75, 75, 25)] {
        let params = WorkflowParams::new()
            .data_source(csv.to_str().unwrap())
            .train_fraction(*fraction)
            .check()
            .unwrap();

        let summary = run_training(
            &params,
            &MemoryStore::new(),
            &CapturedDiagnostics::new(),
            &mut std::io::sink(),
        )
        .unwrap();

        assert_eq!(summary.n_train, *n_train, "fraction {}", fraction);
        assert_eq!(summary.n_test, *n_test, "fraction {}", fraction);
    }
}

#[test]
fn unreachable_source_is_fatal() {
    let params = WorkflowParams::new()
        .data_source("http://127.0.0.1:9/winequality-red.csv")
        .check()
        .unwrap();
    let store = MemoryStore::new();
    let diagnostics = CapturedDiagnostics::new();
    let mut out = Vec::new();

    let result = run_training(&params, &store, &diagnostics, &mut out);

    assert!(matches!(result, Err(WorkflowError::DataLoad(_))));
    assert_eq!(diagnostics.warnings().len(), 1);
    assert!(diagnostics.warnings()[0].contains("Unable to download training & test CSV"));
    assert!(store.runs().is_empty());
    assert!(out.is_empty());
}

#[test]
fn missing_file_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let params = WorkflowParams::new()
        .data_source(dir.path().join("missing.csv").to_str().unwrap())
        .check()
        .unwrap();
    let store = MemoryStore::new();
    let diagnostics = CapturedDiagnostics::new();

    let result = run_training(&params, &store, &diagnostics, &mut std::io::sink());

    assert!(matches!(result, Err(WorkflowError::DataLoad(_))));
    assert_eq!(diagnostics.warnings().len(), 1);
    assert!(store.runs().is_empty());
}

/// Delegates to a memory store but rejects one metric
struct RejectingStore {
    inner: MemoryStore,
    rejected_metric: &'static str,
}

impl TrackingStore for RejectingStore {
    fn get_or_create_experiment(&self, name: &str) -> winetrack_tracking::Result<String> {
        self.inner.get_or_create_experiment(name)
    }

    fn create_run(
        &self,
        experiment_id: &str,
        run_name: Option<&str>,
        start_time: i64,
    ) -> winetrack_tracking::Result<RunInfo> {
        self.inner.create_run(experiment_id, run_name, start_time)
    }

    fn log_param(&self, run_id: &str, key: &str, value: &str) -> winetrack_tracking::Result<()> {
        self.inner.log_param(run_id, key, value)
    }

    fn log_metric(&self, run_id: &str, metric: &Metric) -> winetrack_tracking::Result<()> {
        if metric.key == self.rejected_metric {
            return Err(LoggingError::Api {
                code: "TEMPORARILY_UNAVAILABLE".to_string(),
                message: "metric store offline".to_string(),
            });
        }
        self.inner.log_metric(run_id, metric)
    }

    fn set_tag(&self, run_id: &str, key: &str, value: &str) -> winetrack_tracking::Result<()> {
        self.inner.set_tag(run_id, key, value)
    }

    fn log_artifact(
        &self,
        run: &RunInfo,
        path: &str,
        contents: &[u8],
    ) -> winetrack_tracking::Result<()> {
        self.inner.log_artifact(run, path, contents)
    }

    fn update_run(
        &self,
        run_id: &str,
        status: RunStatus,
        end_time: i64,
    ) -> winetrack_tracking::Result<()> {
        self.inner.update_run(run_id, status, end_time)
    }

    fn register_model_version(
        &self,
        name: &str,
        source: &str,
        run_id: &str,
    ) -> winetrack_tracking::Result<ModelVersion> {
        self.inner.register_model_version(name, source, run_id)
    }
}

#[test]
fn tracking_failure_fails_run() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("winequality-red.csv");
    write_winequality(&csv, 100, 42);

    let params = WorkflowParams::new()
        .data_source(csv.to_str().unwrap())
        .check()
        .unwrap();
    let store = RejectingStore {
        inner: MemoryStore::new(),
        rejected_metric: "r2",
    };

    let result = run_training(
        &params,
        &store,
        &CapturedDiagnostics::new(),
        &mut std::io::sink(),
    );

    match result {
        Err(WorkflowError::Logging(err)) => {
            assert_eq!(err.api_code(), Some("TEMPORARILY_UNAVAILABLE"))
        }
        other => panic!("expected a logging error, got {:?}", other),
    }

    let runs = store.inner.runs();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].info.status, RunStatus::Failed);
    assert_eq!(runs[0].metric_values("rmse").len(), 1);
    assert!(store.inner.model_versions("ElasticnetWineModel").is_empty());
}

#[test]
fn records_into_mlruns() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("winequality-red.csv");
    write_winequality(&csv, 100, 1);

    let params = WorkflowParams::new()
        .data_source(csv.to_str().unwrap())
        .experiment_name("wine-quality")
        .run_name(Some("nightly"))
        .check()
        .unwrap();
    let store = FileStore::new(dir.path().join("mlruns")).unwrap();

    let summary = run_training(
        &params,
        &store,
        &CapturedDiagnostics::new(),
        &mut std::io::sink(),
    )
    .unwrap();

    let info = store.run_info(&summary.run.run_id).unwrap();
    assert_eq!(info.status, RunStatus::Finished);
    assert_eq!(info.run_name.as_deref(), Some("nightly"));
    assert_eq!(
        store.param(&info.run_id, "alpha").unwrap().as_deref(),
        Some("0.5")
    );
    assert_eq!(store.model_versions("ElasticnetWineModel").unwrap().len(), 1);
}

#[test]
fn invalid_settings_are_rejected_before_running() {
    assert!(WorkflowParams::new().alpha(-1.0).check().is_err());
    assert!(WorkflowParams::new().l1_ratio(2.0).check().is_err());
}
