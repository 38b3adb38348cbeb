//! Command-line interface: the training run and the upload utility

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::{PipelineConfig, RunContext};
use crate::pipeline::{PipelineOutcome, TrainingPipeline};
use crate::store::{csv_to_documents, DocumentSink, MongoStore};

fn dim(s: &str) -> ColoredString    { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn kv(key: &str, val: &str) {
    println!("    {:<22} {}", muted(key), val.white());
}

#[derive(Parser)]
#[command(name = "netsec-trainer")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Train a phishing-traffic classifier from records in MongoDB")]
#[command(long_about = None)]
pub struct Cli {
    /// Pipeline config file (YAML); defaults apply when omitted
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run ingestion, validation, transformation and model training
    Train {
        /// Column schema file, overriding the config
        #[arg(short, long)]
        schema: Option<PathBuf>,
    },

    /// Bulk-insert a CSV file into the configured collection
    PushData {
        /// Input CSV file with a header row
        #[arg(short, long)]
        file: PathBuf,
    },
}

/// Load the run config, applying a schema override
pub fn load_config(path: Option<&Path>, schema: Option<&Path>) -> anyhow::Result<PipelineConfig> {
    let mut config = match path {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(schema) = schema {
        config.validation.schema_path = schema.to_path_buf();
    }
    Ok(config)
}

fn print_outcome(outcome: &PipelineOutcome) {
    section("Data ingestion");
    kv("train", &outcome.ingestion.trained_file_path.display().to_string());
    kv("test", &outcome.ingestion.test_file_path.display().to_string());

    section("Data validation");
    let status = if outcome.validation.validation_status {
        "valid".green()
    } else {
        "issues found".yellow()
    };
    println!("    {:<22} {}", muted("status"), status);
    kv("drift report", &outcome.validation.drift_report_file_path.display().to_string());

    section("Data transformation");
    kv("preprocessor", &outcome.transformation.transformed_object_file_path.display().to_string());
    kv("train array", &outcome.transformation.transformed_train_file_path.display().to_string());
    kv("test array", &outcome.transformation.transformed_test_file_path.display().to_string());

    section("Model trainer");
    let trainer = &outcome.trainer;
    println!("    {:<22} {}", muted("best model"), trainer.best_model.to_string().cyan().bold());
    kv("parameters", &trainer.best_params.to_string());
    kv("held-out score", &format!("{:.4}", trainer.best_score));
    kv("train", &trainer.train_metric_artifact.to_string());
    kv("test", &trainer.test_metric_artifact.to_string());
    kv("bundle", &trainer.trained_model_file_path.display().to_string());
    kv("report", &trainer.model_report_file_path.display().to_string());
    println!();
}

pub fn cmd_train(config: PipelineConfig, context: RunContext, mongo_url: &str) -> anyhow::Result<()> {
    section("Train");
    println!("    {:<22} {}", muted("run"), context.timestamp.white());

    step_run("Connecting to MongoDB");
    let store = MongoStore::connect(mongo_url)?;
    step_done("");

    step_run("Running pipeline");
    let start = Instant::now();
    let outcome = TrainingPipeline::new(config, context, &store).run_pipeline()?;
    step_done(&format!("{:?}", start.elapsed()));

    print_outcome(&outcome);
    Ok(())
}

pub fn cmd_push_data(config: &PipelineConfig, file: &Path, mongo_url: &str) -> anyhow::Result<()> {
    section("Push data");

    step_run(&format!("Reading {}", file.display()));
    let documents = csv_to_documents(file)?;
    step_done(&format!("{} records", documents.len()));

    let database = &config.ingestion.database_name;
    let collection = &config.ingestion.collection_name;

    step_run(&format!("Inserting into {}.{}", database.cyan(), collection.cyan()));
    let start = Instant::now();
    let store = MongoStore::connect(mongo_url)?;
    let inserted = store.insert_many(database, collection, documents)?;
    step_done(&format!("{} records in {:?}", inserted, start.elapsed()));

    println!();
    Ok(())
}
