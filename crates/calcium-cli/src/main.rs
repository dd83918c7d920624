mod commands;
mod logging;
mod progress;

use std::fs;
use std::io::{self, Write};
use std::process;

use anyhow::{bail, Context, Result};
use calcium_core::storage::models::{Scan, ScanField, TaskStatus};
use calcium_core::storage::Database;
use calcium_core::{AppConfig, ProcessingEngine, ProcessingTaskKey, TriggerOutcome};
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands};
use dotenv::dotenv;
use progress::CliReporter;
use tracing::{error, info};
use uuid::Uuid;

fn main() {
    dotenv().ok();

    let _guard = logging::init_logger();

    let config = match calcium_core::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let args = Cli::parse();
    let Some(command) = args.command else {
        let _ = Cli::command().print_long_help();
        return;
    };

    if let Err(err) = run(command, &config) {
        error!("Error: {:#}", err);
        process::exit(1);
    }
}

fn run(command: Commands, config: &AppConfig) -> Result<()> {
    match command {
        Commands::Init => {
            let db = open_database(config)?;
            info!(
                "Database {} at schema version {}",
                config.database_path,
                db.schema_version()?
            );
        }
        Commands::AddScan {
            scan_id,
            scan_path,
            fields,
            channels,
            description,
        } => add_scan(config, scan_id, scan_path, &fields, &channels, description)?,
        Commands::AddParamset {
            method,
            paramset_idx,
            params_file,
            description,
        } => {
            let text = fs::read_to_string(&params_file)
                .with_context(|| format!("reading {}", params_file.display()))?;
            let params: serde_json::Value = serde_json::from_str(&text)
                .with_context(|| format!("parsing {}", params_file.display()))?;

            open_database(config)?.insert_param_set_with_params(
                method,
                paramset_idx,
                &description,
                &params,
            )?;
            println!("Added {} parameter set {}", method, paramset_idx);
        }
        Commands::Submit {
            scan_id,
            method,
            paramset_idx,
            instance,
        } => {
            let engine = ProcessingEngine::from_config(config)?;
            let key = match instance {
                Some(instance) => ProcessingTaskKey::new(scan_id, instance),
                None => ProcessingTaskKey::generate(scan_id),
            };
            engine.register_task(&key, method, paramset_idx)?;
            println!("{}", key.processing_instance.hyphenated());
        }
        Commands::Trigger { scan_id, instance } => run_trigger(config, scan_id, instance)?,
        Commands::Populate => {
            let engine = ProcessingEngine::from_config(config)?;
            let summary = engine.populate(&CliReporter::new())?;
            info!(
                "{} completed, {} still pending, {} files registered",
                format!("{}", summary.tasks_completed).green(),
                format!("{}", summary.tasks_pending).yellow(),
                format!("{}", summary.files_registered).cyan(),
            );
        }
        Commands::Status => print_status(config)?,
        Commands::PrintConfig => {
            println!("Configuration: {:?}", config);
        }
        Commands::TruncateDb => {
            if prompt_confirm(
                "Are you SURE you want to delete every task and result?",
                Some(false),
            )? {
                open_database(config)?.truncate_all()?;
                println!("All data tables truncated");
            }
        }
    }
    Ok(())
}

fn open_database(config: &AppConfig) -> Result<Database> {
    Database::open(&config.database_path)
        .with_context(|| format!("opening database {}", config.database_path))
}

fn add_scan(
    config: &AppConfig,
    scan_id: i64,
    scan_path: String,
    fields: &[String],
    channels: &[i64],
    description: String,
) -> Result<()> {
    let fields = fields
        .iter()
        .enumerate()
        .map(|(field_idx, dims)| parse_field(scan_id, field_idx as i64, dims))
        .collect::<Result<Vec<_>>>()?;

    let scan = Scan {
        scan_id,
        scan_path,
        description,
    };
    open_database(config)?.insert_scan_with_layout(&scan, &fields, channels)?;
    println!(
        "Added scan {} with {} fields and {} channels",
        scan_id,
        fields.len(),
        channels.len()
    );
    Ok(())
}

fn parse_field(scan_id: i64, field_idx: i64, dims: &str) -> Result<ScanField> {
    let Some((height, width)) = dims.split_once(['x', 'X']) else {
        bail!("field '{}' is not HEIGHTxWIDTH", dims);
    };
    Ok(ScanField {
        scan_id,
        field_idx,
        px_height: height.trim().parse().context("field height")?,
        px_width: width.trim().parse().context("field width")?,
    })
}

fn run_trigger(config: &AppConfig, scan_id: i64, instance: Uuid) -> Result<()> {
    let engine = ProcessingEngine::from_config(config)?;
    let key = ProcessingTaskKey::new(scan_id, instance);
    match engine.trigger(&key)? {
        TriggerOutcome::Pending => println!("{} {}", key, "pending".yellow()),
        TriggerOutcome::Completed { files } => {
            println!("{} {} ({} files)", key, "complete".green(), files)
        }
        TriggerOutcome::AlreadyComplete => {
            println!("{} {}", key, "already complete".green())
        }
    }
    Ok(())
}

fn print_status(config: &AppConfig) -> Result<()> {
    let db = open_database(config)?;
    let summaries = db.list_task_summaries()?;
    if summaries.is_empty() {
        println!("No processing tasks registered");
        return Ok(());
    }
    for summary in summaries {
        let status = match summary.status() {
            TaskStatus::Complete => "complete".green(),
            TaskStatus::Pending => "pending".yellow(),
        };
        println!(
            "{:>6}  {}  {:<8} #{:<3} {:<9} {:>4} files  {}",
            summary.task.key.scan_id,
            summary.task.key.processing_instance.hyphenated(),
            summary.task.processing_method,
            summary.task.paramset_idx,
            status,
            summary.output_file_count,
            summary.processing_time.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}

fn prompt_confirm(prompt: &str, default: Option<bool>) -> io::Result<bool> {
    let mut input = String::new();

    loop {
        input.clear();

        match default {
            Some(true) => print!("{} (Y/n): ", prompt),
            Some(false) | None => print!("{} (y/N): ", prompt),
        }
        io::stdout().flush()?;

        io::stdin().read_line(&mut input)?;

        match input.trim().to_uppercase().as_str() {
            "Y" => return Ok(true),
            "N" => return Ok(false),
            "" => match default {
                Some(default) => return Ok(default),
                None => continue,
            },
            _ => continue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_field_dims() {
        let field = parse_field(3, 1, "512x256").unwrap();
        assert_eq!(field.scan_id, 3);
        assert_eq!(field.field_idx, 1);
        assert_eq!(field.px_height, 512);
        assert_eq!(field.px_width, 256);
    }

    #[test]
    fn test_parse_field_rejects_garbage() {
        assert!(parse_field(1, 0, "512").is_err());
        assert!(parse_field(1, 0, "ax4").is_err());
    }
}
