use clap::Parser;
use grit::config::{Command, GenerateArgs, ProjectArgs, PublishArgs};
use grit::utils::error::ErrorSeverity;
use grit::utils::logger::{self, LogFormat};
use grit::utils::validation::{validate_required_field, Validate};
use grit::{
    CliConfig, GrafanaClient, GritEngine, LocalStorage, OutputPipeline, Project, ProjectSource,
    PublishPipeline,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();

    let format = if config.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };
    logger::init_logger(config.verbose, format);

    tracing::debug!("Starting grit {}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = config.validate() {
        tracing::error!("Invalid arguments: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());
        std::process::exit(1);
    }

    let outcome = match config.command {
        Command::Inspect(args) => inspect(args),
        Command::Generate(args) => generate(args).await,
        Command::Publish(args) => publish(args).await,
    };

    if let Err(e) = outcome {
        tracing::error!(
            "grit failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

fn inspect(args: ProjectArgs) -> grit::Result<()> {
    let project = Project::open(&args.project)?;
    println!("{}", serde_json::to_string_pretty(&project.inspect())?);
    Ok(())
}

async fn generate(args: GenerateArgs) -> grit::Result<()> {
    let project = Project::open(&args.project.project)?;
    let variations = if args.variations.is_empty() {
        project.config.variations()
    } else {
        args.variations
            .iter()
            .map(|name| project.variation(name))
            .collect::<grit::Result<Vec<_>>>()?
    };
    let output_root = args
        .output
        .clone()
        .unwrap_or_else(|| project.output_dir().display().to_string());
    let bundle = args.bundle || project.config.output.bundle;

    for variation in variations {
        tracing::info!("Generating '{}'", variation.name);
        let pipeline = OutputPipeline::new(
            ProjectSource::new(project.clone(), variation),
            LocalStorage::new(output_root.clone()),
            output_root.clone(),
        )
        .with_bundle(bundle)
        .with_dry_run(args.dry_run);

        let summary = GritEngine::new(pipeline).run().await?;
        println!("✅ {}", summary);
    }
    Ok(())
}

async fn publish(args: PublishArgs) -> grit::Result<()> {
    let project = Project::open(&args.project.project)?;
    let variation = project.variation(&args.variation)?;
    let grafana = project.config.grafana.clone();

    let url = args
        .url
        .or_else(|| grafana.as_ref().map(|g| g.url.clone()));
    let url = validate_required_field("grafana.url", &url)?;
    let token = args
        .token
        .or_else(|| grafana.as_ref().and_then(|g| g.token.clone()));
    let overwrite = !args.no_overwrite && grafana.as_ref().map_or(true, |g| g.overwrite);

    let pipeline = PublishPipeline::new(
        ProjectSource::new(project, variation),
        GrafanaClient::new(url, token)?,
    )
    .with_overwrite(overwrite)
    .with_dry_run(args.dry_run);

    let summary = GritEngine::new(pipeline).run().await?;
    println!("✅ {}", summary);
    Ok(())
}
