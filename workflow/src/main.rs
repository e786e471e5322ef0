use std::error::Error;
use std::io;
use std::path::PathBuf;

use clap::Parser;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::EnvFilter;

use winetrack::ParamGuard;
use winetrack_tracking::{open_store, Credentials, TrackingUri};
use winetrack_workflow::{run_training, ConfigFile, TracingDiagnostics, WorkflowParams};

/// Train an ElasticNet on the red wine quality data and log the run to MLflow
#[derive(Parser, Debug)]
#[command(name = "train-wine", version)]
struct Cli {
    /// YAML file with workflow settings, flags take precedence
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// URL or path of the `;` separated wine quality CSV
    #[arg(long, value_name = "URL|PATH")]
    data_source: Option<String>,
    /// Overall penalty of the ElasticNet
    #[arg(long)]
    alpha: Option<f64>,
    /// Share of the L1 penalty, between 0 and 1
    #[arg(long)]
    l1_ratio: Option<f64>,
    /// Seed of the train/test shuffle
    #[arg(long)]
    split_seed: Option<u64>,
    /// Seed of the estimator
    #[arg(long)]
    fit_seed: Option<u64>,
    /// Share of rows used for training
    #[arg(long)]
    train_fraction: Option<f64>,
    /// Tracking server URL or `mlruns` directory [default: config file, then
    /// `MLFLOW_TRACKING_URI`, then `mlruns`]
    #[arg(long)]
    tracking_uri: Option<String>,
    #[arg(long, env = "MLFLOW_EXPERIMENT_NAME")]
    experiment_name: Option<String>,
    #[arg(long)]
    run_name: Option<String>,
    #[arg(long)]
    registered_model_name: Option<String>,
}

impl Cli {
    fn overrides(&self) -> ConfigFile {
        ConfigFile {
            data_source: self.data_source.clone(),
            alpha: self.alpha,
            l1_ratio: self.l1_ratio,
            split_seed: self.split_seed,
            fit_seed: self.fit_seed,
            train_fraction: self.train_fraction,
            tracking_uri: self.tracking_uri.clone(),
            experiment_name: self.experiment_name.clone(),
            run_name: self.run_name.clone(),
            registered_model_name: self.registered_model_name.clone(),
            ..ConfigFile::default()
        }
    }
}

fn install_logger() -> Result<(), SetGlobalDefaultError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .compact()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
}

fn main() -> Result<(), Box<dyn Error>> {
    install_logger()?;
    let cli = Cli::parse();

    let file = match &cli.config {
        Some(path) => ConfigFile::from_path(path)?,
        None => ConfigFile::default(),
    };
    let config = file.merge(cli.overrides());
    let params = config.apply(WorkflowParams::new()).check()?;

    let uri = TrackingUri::resolve(config.tracking_uri.as_deref())?;
    tracing::info!(%uri, experiment = params.experiment_name(), "tracking");
    let store = open_store(&uri, Credentials::from_env())?;

    let stdout = io::stdout();
    let summary = run_training(
        &params,
        store.as_ref(),
        &TracingDiagnostics,
        &mut stdout.lock(),
    )?;
    if let Some(version) = summary.model_version {
        tracing::info!(
            model = %version.name,
            version = version.version,
            "registered {}",
            version.source
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::Cli;
    use clap::{CommandFactory, Parser};
    use winetrack::ParamGuard;
    use winetrack_workflow::{ConfigFile, WorkflowParams};

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_config_file() {
        let cli = Cli::try_parse_from([
            "train-wine",
            "--alpha",
            "0.25",
            "--registered-model-name",
            "WineModel",
        ])
        .unwrap();
        let file = ConfigFile {
            alpha: Some(0.1),
            l1_ratio: Some(0.9),
            ..ConfigFile::default()
        };

        let params = file
            .merge(cli.overrides())
            .apply(WorkflowParams::new())
            .check()
            .unwrap();

        assert_eq!(params.alpha(), 0.25);
        assert_eq!(params.l1_ratio(), 0.9);
        assert_eq!(params.registered_model_name(), "WineModel");
    }

    #[test]
    fn tracking_uri_from_config_file_is_kept() {
        let cli = Cli::try_parse_from(["train-wine"]).unwrap();
        let file = ConfigFile {
            tracking_uri: Some("http://tracking:5000".to_string()),
            ..ConfigFile::default()
        };
        assert_eq!(
            file.clone().merge(cli.overrides()).tracking_uri.as_deref(),
            Some("http://tracking:5000")
        );

        // the environment is only consulted when resolving the uri
        let command = Cli::command();
        let arg = command
            .get_arguments()
            .find(|arg| arg.get_id() == "tracking_uri")
            .unwrap();
        assert!(arg.get_env().is_none());

        let cli =
            Cli::try_parse_from(["train-wine", "--tracking-uri", "file:///tmp/mlruns"]).unwrap();
        assert_eq!(
            file.merge(cli.overrides()).tracking_uri.as_deref(),
            Some("file:///tmp/mlruns")
        );
    }
}
