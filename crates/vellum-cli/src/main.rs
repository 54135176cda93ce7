//! vellum - compile CMS `where` clauses into native document-store queries.

mod config;
mod formatter;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vellum_core::store::{DocumentStore, FindOptions};

use config::{Args, CliConfig, ProjectConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays machine readable.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vellum_cli=info,vellum_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Args::parse().into_config();
    run(config).await
}

async fn run(config: CliConfig) -> anyhow::Result<()> {
    tracing::info!(
        project = %config.project_path.display(),
        collection = %config.collection,
        override_access = config.options.override_access,
        sample_cap = config.compiler.sample_cap,
        "configuration loaded"
    );

    let project = ProjectConfig::load(&config.project_path)?;
    let engine = project.into_engine(config.compiler.clone())?;
    tracing::info!(entities = engine.registry().len(), "schema compiled");

    let where_clause = config.where_source.load()?;
    let compiled = engine
        .compile_query(
            &config.collection,
            &where_clause,
            config.sort.as_deref(),
            config.request.clone(),
            config.options,
        )
        .await
        .with_context(|| format!("compiling query for {}", config.collection))?;

    if compiled.truncated {
        tracing::warn!(
            cap = engine.config().sample_cap,
            "relationship sample truncated; results may be incomplete"
        );
    }
    let rendered = formatter::compiled_to_json(&config.collection, &compiled);
    println!("{}", serde_json::to_string_pretty(&rendered)?);

    if config.execute {
        let documents = engine
            .store()
            .find(&config.collection, &compiled.filter, FindOptions::default())
            .await
            .context("executing query")?;
        tracing::info!(matched = documents.len(), "query executed");
        println!("{}", formatter::format_documents(&documents, config.format));
    }

    Ok(())
}
