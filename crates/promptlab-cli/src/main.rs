//! plab: replay playground sessions and compare experiment runs from the command line.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Table};
use serde::Deserialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use promptlab::compare::{experiment_info_by_id, render_json, CompareRow};
use promptlab::storage;
use promptlab::{
    CompareExperimentsPayload, CompareTable, InitialProps, InstanceIdAllocator, PlaygroundAction,
    PlaygroundConfig, PlaygroundStore, RunCell,
};

#[derive(Parser)]
#[command(
    name = "plab",
    about = "🧪 promptlab: prompt playground and experiment comparison",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scripted playground session and print the final state
    Session {
        /// Session script (.yaml, .yml or .json)
        script: PathBuf,
        /// Output format
        #[arg(long, short, default_value = "yaml", value_parser = ["yaml", "json"])]
        format: String,
        /// Maximum number of playground instances
        #[arg(long, default_value_t = 2)]
        max_instances: usize,
        /// Allow deleting the last remaining instance
        #[arg(long)]
        allow_empty: bool,
    },
    /// Print a comparison table of experiment runs over a dataset
    Compare {
        /// Compare-experiments payload (.json, .yaml or .yml)
        payload: PathBuf,
        /// Experiment ids to compare, in column order (default: every
        /// experiment of the dataset, by sequence number)
        #[arg(long = "experiment", short = 'e')]
        experiments: Vec<String>,
        /// Show indented JSON instead of single-line values
        #[arg(long)]
        full_text: bool,
    },
}

/// A session script: optional initial props plus the actions to replay.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SessionScript {
    initial: InitialProps,
    actions: Vec<PlaygroundAction>,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Session {
            script,
            format,
            max_instances,
            allow_empty,
        } => {
            let config = PlaygroundConfig::default()
                .with_max_instances(max_instances)
                .with_keep_last_instance(!allow_empty);
            cmd_session(script, format, config)?;
        }
        Commands::Compare {
            payload,
            experiments,
            full_text,
        } => {
            cmd_compare(payload, experiments, full_text)?;
        }
    }

    Ok(())
}

// ─── Command implementations ──────────────────────────────────────────────────

fn cmd_session(script_path: PathBuf, format: String, config: PlaygroundConfig) -> Result<()> {
    let script: SessionScript = storage::load_document(&script_path)?;

    // Ids start at 0 so replays are reproducible.
    let store = PlaygroundStore::builder()
        .config(config)
        .ids(InstanceIdAllocator::starting_at(0))
        .initial_props(script.initial)
        .build()?;

    let ignored = Arc::new(Mutex::new(Vec::new()));
    let sink = ignored.clone();
    store.on_ignored(move |reason| {
        if let Ok(mut reasons) = sink.lock() {
            reasons.push(reason.to_string());
        }
    });

    let mut changed = 0;
    for action in &script.actions {
        if store.apply(action) {
            changed += 1;
        }
    }
    info!(
        actions = script.actions.len(),
        changed,
        "Replayed {}",
        script_path.display()
    );

    if let Ok(reasons) = ignored.lock() {
        for reason in reasons.iter() {
            eprintln!("ignored: {}", reason);
        }
    }

    let state = store.snapshot();
    let content = match format.as_str() {
        "json" => serde_json::to_string_pretty(&state)? + "\n",
        "yaml" => serde_yaml::to_string(&state)?,
        _ => anyhow::bail!("Unknown format: {}", format),
    };
    print!("{}", content);
    Ok(())
}

fn cmd_compare(payload_path: PathBuf, experiments: Vec<String>, full_text: bool) -> Result<()> {
    let payload: CompareExperimentsPayload = storage::load_document(&payload_path)?;

    let experiment_ids = if experiments.is_empty() {
        let mut known: Vec<_> = experiment_info_by_id(&payload).into_iter().collect();
        known.sort_by_key(|(_, info)| info.sequence_number);
        known.into_iter().map(|(id, _)| id).collect()
    } else {
        experiments
    };
    if experiment_ids.is_empty() {
        anyhow::bail!("No experiments to compare: pass --experiment or include the dataset");
    }

    let compare = CompareTable::build(&payload, &experiment_ids);
    if compare.is_empty() {
        println!("No examples to compare");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    let mut header = vec!["example".to_string()];
    header.extend(compare.columns.iter().map(|column| column.header()));
    table.set_header(header);

    for row in &compare.rows {
        table.add_row(row_cells(&compare, row, full_text));
    }

    println!("{}", table);
    Ok(())
}

fn row_cells(compare: &CompareTable, row: &CompareRow, full_text: bool) -> Vec<String> {
    let mut cells = vec![
        row.id.clone(),
        render_json(&row.input, full_text),
        render_json(&row.reference_output, full_text),
    ];
    cells.extend(
        compare
            .experiment_ids()
            .map(|id| cell_text(&row.cell(id), full_text)),
    );
    cells
}

fn cell_text(cell: &RunCell<'_>, full_text: bool) -> String {
    match cell {
        RunCell::NotRun => "not run".to_string(),
        RunCell::Repetitions(n) => format!("{} runs", n),
        RunCell::Failed { error } => format!("error: {}", error),
        RunCell::Output {
            output,
            latency_ms,
            annotations,
            ..
        } => {
            let mut lines = vec![render_json(output, full_text)];
            if let Some(ms) = latency_ms {
                lines.push(format_latency(*ms));
            }
            for annotation in annotations {
                let value = match (&annotation.label, annotation.score) {
                    (Some(label), _) => label.clone(),
                    (None, Some(score)) => format!("{:.2}", score),
                    (None, None) => "-".to_string(),
                };
                lines.push(format!("{}: {}", annotation.name, value));
            }
            lines.join("\n")
        }
    }
}

// ─── Utilities ────────────────────────────────────────────────────────────────

fn format_latency(ms: i64) -> String {
    if ms.abs() < 1000 {
        format!("{}ms", ms)
    } else {
        format!("{:.2}s", ms as f64 / 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latency_switches_to_seconds() {
        assert_eq!(format_latency(420), "420ms");
        assert_eq!(format_latency(1250), "1.25s");
    }

    #[test]
    fn empty_script_is_valid() {
        let script: SessionScript = serde_yaml::from_str("{}").unwrap();
        assert!(script.actions.is_empty());
        assert_eq!(script.initial, InitialProps::default());
    }
}
