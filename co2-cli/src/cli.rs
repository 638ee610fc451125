use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use co2_core::{Config, EstimateCommand, GridIntensityLookup, Location, Outcome, ProviderId};
use inquire::{Confirm, Password, Select, Text, validator::Validation};
use std::{io::Write, path::PathBuf, process::ExitCode};

use crate::selection::{self, LineRange};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "co2", version, about = "Estimate the CO₂ cost of transmitting code")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Estimate emissions for a file, a range of its lines, or stdin.
    Estimate {
        /// File to read; stdin when omitted or "-".
        path: Option<PathBuf>,

        /// Only use these lines, e.g. "10:42", "10:" or ":42".
        #[arg(long)]
        lines: Option<LineRange>,

        /// Assume the code is served from a green-hosted data center.
        #[arg(long)]
        green: bool,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show the detected location.
    Location {
        #[arg(long)]
        json: bool,
    },

    /// Show the grid intensity used for a country.
    Intensity {
        /// ISO alpha-3 country code, e.g. "FRA".
        country: Option<String>,
    },

    /// Configure the geolocation provider.
    Configure {
        /// Provider short name, "ipapi" or "fixed".
        provider: Option<String>,
    },
}

impl Cli {
    pub async fn run(self) -> Result<ExitCode> {
        match self.command {
            Command::Estimate { path, lines, green, json } => {
                let config = Config::load()?;
                let command = EstimateCommand::from_config(&config)?.with_green_hosting(green);
                let text = selection::read(path.as_deref(), lines).await?;

                if command.resolver().cached().await.is_none() && !text.trim().is_empty() {
                    eprintln!("Detecting your location...");
                }

                let outcome = command.run(&text).await;
                let (mut out, mut err) = (std::io::stdout().lock(), std::io::stderr().lock());
                render(&outcome, json, &mut out, &mut err)?;

                if outcome.is_failure() {
                    return Ok(ExitCode::FAILURE);
                }
            }
            Command::Location { json } => {
                let config = Config::load()?;
                let command = EstimateCommand::from_config(&config)?;
                let location = command.resolver().resolve().await?;

                if json {
                    println!("{}", serde_json::to_string_pretty(&*location)?);
                } else {
                    print_location(&location, command.grid());
                }
            }
            Command::Intensity { country } => {
                let config = Config::load()?;
                let lookup = GridIntensityLookup::new(config.intensity_table()?);
                let result = lookup.lookup(country.as_deref());

                println!(
                    "{}: {:.2} gCO₂/kWh ({}, {})",
                    country.as_deref().unwrap_or("-"),
                    result.intensity,
                    result.source,
                    result.year
                );
            }
            Command::Configure { provider } => configure(provider.as_deref())?,
        }

        Ok(ExitCode::SUCCESS)
    }
}

/// Reports go to `out`; warnings and errors go to `err`.
fn render(outcome: &Outcome, json: bool, out: &mut impl Write, err: &mut impl Write) -> Result<()> {
    match outcome {
        Outcome::NothingSelected => {
            writeln!(err, "warning: Select some code first!")?;
        }
        Outcome::Success(report) => {
            if json {
                let value = serde_json::json!({ "status": "success", "report": report });
                writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?;
            } else {
                writeln!(out, "{report}")?;
            }
        }
        Outcome::Fallback { report, reason } => {
            writeln!(err, "error: {reason}. Using global average.")?;
            if json {
                let value = serde_json::json!({
                    "status": "fallback",
                    "reason": reason.to_string(),
                    "report": report,
                });
                writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?;
            } else {
                writeln!(out, "{report}")?;
            }
        }
        Outcome::Critical(critical) => {
            writeln!(err, "error: {critical}")?;
        }
    }

    Ok(())
}

fn print_location(location: &Location, lookup: &GridIntensityLookup) {
    let grid = lookup.lookup(location.country_code_iso3.as_deref());
    let or_dash = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());

    println!("Location: {}", location.label());
    println!("Region:   {}", or_dash(&location.region));
    println!(
        "Country:  {} / {}",
        or_dash(&location.country_code),
        or_dash(&location.country_code_iso3)
    );
    println!("Grid:     {:.2} gCO₂/kWh ({}, {})", grid.intensity, grid.source, grid.year);
}

fn configure(provider: Option<&str>) -> Result<()> {
    // Read the file as-is so environment overrides are not persisted.
    let path = Config::config_file_path()?;
    let mut config = Config::load_from(&path)?;

    let id = match provider {
        Some(name) => ProviderId::try_from(name)?,
        None => Select::new("Geolocation provider:", ProviderId::all().to_vec())
            .prompt()
            .context("Provider selection aborted")?,
    };

    match id {
        ProviderId::IpApi => {
            let key = Password::new("ipapi.co API key (empty for the free tier):")
                .without_confirmation()
                .prompt()
                .context("API key entry aborted")?;

            if !key.trim().is_empty() {
                config.upsert_provider_api_key(id, key.trim().to_string());
            }
        }
        ProviderId::Fixed => {
            let country = Text::new("Country name:").prompt().context("Country entry aborted")?;
            let iso3 = Text::new("ISO alpha-3 country code:")
                .with_validator(|input: &str| {
                    let ok = input.trim().len() == 3
                        && input.trim().chars().all(|c| c.is_ascii_alphabetic());
                    Ok::<_, inquire::CustomUserError>(if ok {
                        Validation::Valid
                    } else {
                        Validation::Invalid("Expected three letters, e.g. FRA".into())
                    })
                })
                .prompt()
                .context("Country code entry aborted")?;
            let city = Text::new("City (optional):")
                .prompt_skippable()
                .context("City entry aborted")?
                .filter(|c| !c.trim().is_empty());

            config.set_fixed_location(Location {
                country: Some(country.trim().to_string()),
                country_code_iso3: Some(iso3.trim().to_ascii_uppercase()),
                city: city.map(|c| c.trim().to_string()),
                ..Location::default()
            });
        }
    }

    let make_default = Confirm::new(&format!("Use {id} as the default provider?"))
        .with_default(true)
        .prompt()
        .context("Confirmation aborted")?;
    if make_default {
        config.set_default_provider(id);
    }

    config.save_to(&path)?;
    println!("Saved configuration to {}", path.display());

    Ok(())
}
