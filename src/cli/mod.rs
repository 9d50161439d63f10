//! Command-line interface
//!
//! `legendary train` fits and logs a model, `legendary fetch` pulls a
//! registered version back and scores sample rows.

use clap::{Parser, Subcommand};
use colored::*;
use std::time::Instant;

use crate::tracking::{ExperimentTracker, TrackingConfig, ENV_TRACKING_URI};
use crate::training::ForestConfig;
use crate::workflow::{self, FetchSettings, TrainSettings, DEFAULT_DATA_URL};

pub const DEFAULT_RUN_NAME: &str = "default";
pub const DEFAULT_TRACKING_URI: &str = "http://localhost:5000";
pub const DEFAULT_EXPERIMENT: &str = "pokemon";
pub const DEFAULT_MODEL_VERSION: &str = "4";

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(&format!("{:<18}", key)), val.white())
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "legendary")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Train, track and fetch a legendary-Pokémon random forest")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a random forest and log it to a tracking server
    Train {
        /// Tracking server URL (http[s]://...) or local store (file:/path)
        tracking_uri: String,

        /// Experiment the run is recorded under
        experiment_name: String,

        /// Run name
        #[arg(default_value = DEFAULT_RUN_NAME)]
        run_name: String,

        /// CSV location (URL or path)
        #[arg(default_value = DEFAULT_DATA_URL)]
        data_url: String,

        /// Number of trees
        #[arg(default_value_t = 10)]
        n_estimator: usize,

        /// Maximum tree depth
        #[arg(default_value_t = 5)]
        max_depth: usize,

        /// Minimum samples required to split a node
        #[arg(default_value_t = 2)]
        min_samples_split: usize,

        /// Also register the logged model under this name
        #[arg(long, value_name = "NAME")]
        register_as: Option<String>,
    },

    /// Fetch a registered model and predict sample rows
    Fetch {
        /// Registered model name
        #[arg(default_value = DEFAULT_EXPERIMENT)]
        experiment_name: String,

        /// Registered model version
        #[arg(default_value = DEFAULT_MODEL_VERSION)]
        model_version: String,

        /// Tracking server URL or local store
        #[arg(long, env = ENV_TRACKING_URI, default_value = DEFAULT_TRACKING_URI)]
        tracking_uri: String,

        /// CSV location (URL or path)
        #[arg(long, default_value = DEFAULT_DATA_URL)]
        data_url: String,

        /// Rows sampled per class
        #[arg(long, default_value_t = 5)]
        samples: usize,

        /// Sampling seed
        #[arg(long)]
        seed: Option<u64>,
    },
}

// ─── Commands ──────────────────────────────────────────────────────────────────

impl Commands {
    /// Training settings for a `train` invocation
    pub fn train_settings(&self) -> Option<(String, TrainSettings)> {
        match self {
            Commands::Train {
                tracking_uri,
                experiment_name,
                run_name,
                data_url,
                n_estimator,
                max_depth,
                min_samples_split,
                register_as,
            } => {
                let forest = ForestConfig::default()
                    .with_n_estimators(*n_estimator)
                    .with_max_depth(*max_depth)
                    .with_min_samples_split(*min_samples_split);
                let mut settings = TrainSettings::new(experiment_name.clone())
                    .with_run_name(run_name.clone())
                    .with_data_url(data_url.clone())
                    .with_forest(forest);
                if let Some(name) = register_as {
                    settings = settings.with_register_as(name.clone());
                }
                Some((tracking_uri.clone(), settings))
            }
            Commands::Fetch { .. } => None,
        }
    }

    /// Fetch settings for a `fetch` invocation
    pub fn fetch_settings(&self) -> Option<(String, FetchSettings)> {
        match self {
            Commands::Fetch {
                experiment_name,
                model_version,
                tracking_uri,
                data_url,
                samples,
                seed,
            } => Some((
                tracking_uri.clone(),
                FetchSettings {
                    model_name: experiment_name.clone(),
                    model_version: model_version.clone(),
                    data_url: data_url.clone(),
                    samples: *samples,
                    seed: *seed,
                    ..FetchSettings::default()
                },
            )),
            Commands::Train { .. } => None,
        }
    }
}

pub async fn cmd_train(tracking_uri: &str, settings: &TrainSettings) -> anyhow::Result<()> {
    section("Train");

    let config = TrackingConfig::from_env()?;
    let mut tracker = ExperimentTracker::from_uri(tracking_uri, &config)?;

    step_run(&format!("Training on {}", settings.data_url.cyan()));
    let start = Instant::now();
    let outcome = workflow::run_workflow(settings, &mut tracker).await?;
    step_done(&format!("{:?}", start.elapsed()));

    let forest = &settings.forest;
    println!();
    println!(
        "RandomForest model (n_estimator={:.6}, max_depth={}, min_samples_split={:.6}):",
        forest.n_estimators as f64,
        forest
            .max_depth
            .map_or_else(|| "None".to_string(), |d| format!("{:.6}", d as f64)),
        forest.min_samples_split as f64,
    );
    println!("accuracy: {:.6}", outcome.accuracy());
    println!();

    line_box_top();
    line_box(&kv("Tracking", &tracker.store().describe()));
    line_box(&kv("Experiment id", &outcome.experiment_id));
    line_box(&kv("Run id", &outcome.run_id));
    line_box(&kv("Train / test rows", &format!("{} / {}", outcome.report.n_train, outcome.report.n_test)));
    if let Some(uri) = &outcome.registered {
        line_box(&kv("Registered", &uri.to_string()));
    }
    line_box_bottom();
    println!();

    Ok(())
}

pub async fn cmd_fetch(tracking_uri: &str, settings: &FetchSettings) -> anyhow::Result<()> {
    section("Fetch");

    let config = TrackingConfig::from_env()?;
    let tracker = ExperimentTracker::from_uri(tracking_uri, &config)?;

    step_run(&format!("Scoring samples with {}", settings.model_uri().to_string().cyan()));
    let start = Instant::now();
    let outcome = workflow::test_model(settings, &tracker).await?;
    step_done(&format!("{:?}", start.elapsed()));

    println!();
    println!("{}", prediction_line(settings.samples, "legendary", &outcome.legendary_predictions));
    println!("{}", prediction_line(settings.samples, "normal", &outcome.normal_predictions));
    println!();

    Ok(())
}

fn prediction_line(samples: usize, kind: &str, predictions: &[bool]) -> String {
    format!("The prediction of {} {} pokemon: {:?}", samples, kind, predictions)
}

/// Dispatch a parsed command line
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some((tracking_uri, settings)) = cli.command.train_settings() {
        return cmd_train(&tracking_uri, &settings).await;
    }
    if let Some((tracking_uri, settings)) = cli.command.fetch_settings() {
        return cmd_fetch(&tracking_uri, &settings).await;
    }
    Ok(())
}
