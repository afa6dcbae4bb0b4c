//! inkpress command-line entry point
//!
//! - `serve`: run the HTTP API
//! - `export`: write the static site once
//! - `import`: load Markdown files with front matter as articles

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use inkpress::{
    api::{self, AppState},
    config::Config,
    db,
    services::{ExportRequest, ImportService},
};

/// Markdown CMS backend with static site export
#[derive(Parser)]
#[command(name = "inkpress", version, about)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API server
    Serve {
        /// Port to listen on (overrides the config file)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Export published content as a static site
    Export {
        /// Output directory
        #[arg(short, long)]
        output: Option<String>,
        /// Directory holding uploaded images
        #[arg(short, long)]
        uploads: Option<String>,
        /// Site title
        #[arg(short, long)]
        title: Option<String>,
    },
    /// Import Markdown files with front matter
    Import {
        /// Files to import
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inkpress=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = Config::load_with_env(&cli.config)?;
    tracing::info!("Configuration loaded from {}", cli.config.display());

    let pool = db::create_pool(&config.database).await?;
    let applied = db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database ready ({} migrations applied)", applied);

    let state = AppState::new(pool.clone(), &config);
    state.template_service.initialize_defaults().await?;

    let result = match cli.command {
        Commands::Serve { port } => serve(state, &config, port).await,
        Commands::Export {
            output,
            uploads,
            title,
        } => {
            export(
                &state,
                ExportRequest {
                    output_dir: output,
                    upload_dir: uploads,
                    site_title: title,
                },
            )
            .await
        }
        Commands::Import { files } => import(&state, &files).await,
    };

    pool.close().await;
    result
}

async fn serve(state: AppState, config: &Config, port: Option<u16>) -> Result<()> {
    let app = api::build_router(state, &config.server.cors_origin);

    let addr = format!("{}:{}", config.server.host, port.unwrap_or(config.server.port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

async fn export(state: &AppState, request: ExportRequest) -> Result<()> {
    let settings = state.settings_service.get().await?;
    let config = request.resolve(
        &settings,
        &state.upload_config.path,
        &state.export_defaults.image_base_url,
    );

    let report = state.export_service.export(&config).await?;
    println!(
        "Exported {} articles, {} categories, {} tags to {}",
        report.articles,
        report.categories,
        report.tags,
        report.output_dir.display()
    );
    for path in &report.removed {
        println!("  removed {}", path.display());
    }
    if report.images_copied > 0 {
        println!("Copied {} images", report.images_copied);
    }
    Ok(())
}

async fn import(state: &AppState, files: &[PathBuf]) -> Result<()> {
    let importer = ImportService::new(
        Arc::clone(&state.article_service),
        Arc::clone(&state.category_service),
        Arc::clone(&state.tag_service),
    );

    let mut failed = 0;
    for file in files {
        match importer.import_file(file).await {
            Ok(article) => println!("Imported {} -> {} ({})", file.display(), article.slug, article.status),
            Err(e) => {
                failed += 1;
                tracing::error!("Failed to import {}: {}", file.display(), e);
                eprintln!("Failed to import {}: {}", file.display(), e);
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} files failed to import", failed, files.len());
    }
    Ok(())
}
