use crate::cli::{BagsCommands, OutputFormat};
use crate::EXIT_CLIENT_ERROR;
use anyhow::{Context, Result};
use pathquery_core::{update_list_description, InMemoryProfile, ListUpdateError};
use std::path::Path;
use std::process::ExitCode;
use tracing::info;

pub async fn execute(cmd: BagsCommands, format: OutputFormat) -> Result<ExitCode> {
    match cmd {
        BagsCommands::List { bags } => list(&bags, format).await,
        BagsCommands::Describe {
            name,
            description,
            bags,
        } => describe(&bags, &name, &description, format).await,
    }
}

async fn load(path: &Path) -> Result<InMemoryProfile> {
    InMemoryProfile::load(path)
        .await
        .with_context(|| format!("Failed to load saved lists from {}", path.display()))
}

async fn list(path: &Path, format: OutputFormat) -> Result<ExitCode> {
    let bags = load(path).await?.sorted();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&bags)?),
        OutputFormat::Text => {
            if bags.is_empty() {
                println!("No saved lists");
            } else {
                println!("{:<24} {:<12} {:<16} {:>6}  DESCRIPTION", "NAME", "STATE", "TYPE", "SIZE");
                for bag in &bags {
                    println!(
                        "{:<24} {:<12} {:<16} {:>6}  {}",
                        bag.name,
                        bag.state.as_str(),
                        bag.bag_type.as_deref().unwrap_or("-"),
                        bag.size,
                        bag.description.as_deref().unwrap_or("")
                    );
                }
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn describe(path: &Path, name: &str, description: &str, format: OutputFormat) -> Result<ExitCode> {
    let profile = load(path).await?;

    let summary = match update_list_description(&profile, name, description) {
        Ok(summary) => summary,
        Err(err @ (ListUpdateError::NotOwned(_) | ListUpdateError::MissingParameter(_))) => {
            eprintln!("Error: {}", err);
            return Ok(ExitCode::from(EXIT_CLIENT_ERROR));
        }
        Err(err) => return Err(err.into()),
    };

    profile
        .save(path)
        .await
        .with_context(|| format!("Failed to write saved lists to {}", path.display()))?;
    info!("Updated description of list {}", summary.name);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Text => println!("{}: {}", summary.name, summary.description),
    }
    Ok(ExitCode::SUCCESS)
}
