use clap::{Parser, Subcommand, ValueEnum};
use eyre::{Result, WrapErr};
use std::path::PathBuf;

use exampass::artifacts;
use exampass::predict::{predict, PredictionForm};
use exampass::server::{DEFAULT_ENCODERS_PATH, DEFAULT_MODEL_PATH};

#[derive(Parser)]
#[command(
    name = "exampass",
    version,
    about = "Pass/fail predictions for student exam results from a pre-trained classifier."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web front-end
    Serve {
        /// Address to bind to
        #[arg(long, env = "EXAMPASS_BIND", default_value = "127.0.0.1:5000")]
        bind: String,

        #[command(flatten)]
        artifacts: ArtifactArgs,
    },

    /// Run a single prediction from the command line
    Predict {
        #[arg(long)]
        gender: String,

        #[arg(long)]
        race_ethnicity: String,

        #[arg(long)]
        lunch: String,

        #[arg(long)]
        test_preparation_course: String,

        #[command(flatten)]
        artifacts: ArtifactArgs,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Summary)]
        format: OutputFormat,
    },
}

#[derive(clap::Args)]
struct ArtifactArgs {
    /// Path to the serialized model
    #[arg(long, env = "EXAMPASS_MODEL", default_value = DEFAULT_MODEL_PATH)]
    model: PathBuf,

    /// Path to the serialized column → encoder mapping
    #[arg(long, env = "EXAMPASS_ENCODERS", default_value = DEFAULT_ENCODERS_PATH)]
    encoders: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Summary,
    Json,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_serve(bind: String, paths: ArtifactArgs) -> Result<()> {
    use exampass::server::{run_server, ServerConfig};

    let bind_addr = bind
        .parse()
        .wrap_err_with(|| format!("Invalid bind address: {}", bind))?;

    let config = ServerConfig {
        bind_addr,
        model_path: paths.model,
        encoders_path: paths.encoders,
    };

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_server(config))?;

    Ok(())
}

fn cmd_predict(form: PredictionForm, paths: ArtifactArgs, format: OutputFormat) -> Result<()> {
    let loaded = artifacts::load(&paths.model, &paths.encoders).wrap_err_with(|| {
        format!(
            "Failed to load {} and {}",
            paths.model.display(),
            paths.encoders.display()
        )
    })?;

    let prediction = predict(&loaded, &form).map_err(|e| eyre::eyre!(e.user_message()))?;

    match format {
        OutputFormat::Json => {
            let result = serde_json::json!({
                "success": true,
                "prediction": prediction,
                "text": prediction.display(),
                "model_kind": loaded.model.kind(),
                "model_hash": loaded.model_hash,
            });
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        OutputFormat::Summary => {
            println!("{}", prediction.display());
            println!("Model: {} ({})", loaded.model.kind(), loaded.model_hash);
        }
    }

    Ok(())
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve { bind, artifacts } => cmd_serve(bind, artifacts),
        Commands::Predict {
            gender,
            race_ethnicity,
            lunch,
            test_preparation_course,
            artifacts,
            format,
        } => {
            let form = PredictionForm {
                gender: Some(gender),
                race_ethnicity: Some(race_ethnicity),
                lunch: Some(lunch),
                test_preparation_course: Some(test_preparation_course),
            };
            cmd_predict(form, artifacts, format)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:?}");
        std::process::exit(1);
    }
}
