use crate::cli::OutputFormat;
use crate::{EXIT_CLIENT_ERROR, EXIT_SERVICE_ERROR};
use anyhow::{Context, Result};
use pathquery_config::PathQueryConfig;
use pathquery_core::{
    BagProducer, BagStore, BuildError, DefaultSchemaLoader, InMemoryProfile, Model, PathQuery,
    PathQueryBuilder, QueryFormat,
};
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::debug;

pub async fn execute(
    config: &PathQueryConfig,
    format: OutputFormat,
    query: PathBuf,
    model: PathBuf,
    schema: Option<String>,
    bags: Option<PathBuf>,
) -> Result<ExitCode> {
    let input = tokio::fs::read_to_string(&query)
        .await
        .with_context(|| format!("Failed to read query file {}", query.display()))?;
    let input = input.trim_start();

    let model_json = tokio::fs::read_to_string(&model)
        .await
        .with_context(|| format!("Failed to read model file {}", model.display()))?;
    let model = Model::from_json(&model_json).context("Failed to load data model")?;

    let query_format = QueryFormat::detect(input);
    let schema = match schema {
        Some(schema) => schema,
        None => config
            .schemas
            .reference_for(query_format.as_str())
            .context("No schema configured for this query format")?
            .to_string(),
    };
    debug!("Validating {} query against {}", query_format, schema);

    let profile = match &bags {
        Some(path) => InMemoryProfile::load(path)
            .await
            .with_context(|| format!("Failed to load saved lists from {}", path.display()))?,
        None => InMemoryProfile::default(),
    };

    let client = reqwest::Client::builder()
        .timeout(config.network.timeout())
        .build()
        .context("Failed to create HTTP client")?;
    let builder = PathQueryBuilder::new(Arc::new(DefaultSchemaLoader::new(client)));

    let result = builder
        .build(input, &model, &schema, profile.producer())
        .await;

    match result {
        Ok(query) => {
            print_query(&query, format)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            print_error(&err, format)?;
            let code = if err.is_client_error() {
                EXIT_CLIENT_ERROR
            } else {
                EXIT_SERVICE_ERROR
            };
            Ok(ExitCode::from(code))
        }
    }
}

fn print_query(query: &PathQuery, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(query)?),
        OutputFormat::Text => {
            println!("Query is valid");
            if let Some(name) = query.name() {
                println!("  name:        {}", name);
            }
            println!("  root:        {}", query.root_class().unwrap_or("-"));
            let view: Vec<&str> = query.view().iter().map(|p| p.as_str()).collect();
            println!("  view:        {}", view.join(" "));
            for constraint in query.constraints() {
                println!("  constraint:  {}", constraint);
            }
            if let Some(logic) = query.constraint_logic() {
                println!("  logic:       {}", logic);
            }
            let bags: Vec<String> = query.bag_names().into_iter().collect();
            if !bags.is_empty() {
                println!("  lists:       {}", bags.join(", "));
            }
        }
    }
    Ok(())
}

fn print_error(err: &BuildError, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let body = json!({
                "error": err.kind().as_str(),
                "clientError": err.is_client_error(),
                "lists": err.bag_names(),
                "message": err.message(),
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        OutputFormat::Text => eprint!("Error ({}): {}", err.kind(), err.message()),
    }
    Ok(())
}
