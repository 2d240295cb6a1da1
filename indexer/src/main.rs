use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use reelsim_core::ingest::Ingest;
use reelsim_core::persist::{load_meta, load_recommender, save_model, save_similarity, ModelPaths};
use reelsim_core::similarity::PrecomputedMatrix;
use reelsim_core::{DocFrequency, IngestConfig, Model, ModelConfig, Record, SimilarityStrategyKind};
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build and query title similarity models", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a model from a CSV/JSON/JSONL catalog file or a directory of them
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Output model directory
        #[arg(long)]
        output: String,
        /// JSON model configuration; flags below override it
        #[arg(long)]
        config: Option<PathBuf>,
        /// Minimum document frequency: a count ("2") or a proportion ("0.01")
        #[arg(long)]
        min_df: Option<DocFrequency>,
        /// Maximum document frequency: a count or a proportion ("0.8")
        #[arg(long)]
        max_df: Option<DocFrequency>,
        /// Compute and save the full similarity matrix
        #[arg(long, default_value_t = false)]
        precompute_similarity: bool,
        /// Keep every row, not only movies
        #[arg(long, default_value_t = false)]
        all_types: bool,
        /// Abort when more than this share of rows is malformed
        #[arg(long, default_value_t = 0.05)]
        max_skip_ratio: f64,
    },
    /// Print recommendations for one title from a saved model
    Recommend {
        #[arg(long, default_value = "./data/model")]
        model: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value_t = 5)]
        top_n: usize,
    },
    /// Summarize a saved model
    Inspect {
        #[arg(long, default_value = "./data/model")]
        model: String,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, config, min_df, max_df, precompute_similarity, all_types, max_skip_ratio } => {
            let mut model_config = match config {
                Some(path) => ModelConfig::from_json_file(path)?,
                None => ModelConfig::default(),
            };
            if let Some(v) = min_df { model_config.min_df = v; }
            if let Some(v) = max_df { model_config.max_df = v; }
            if precompute_similarity { model_config.strategy = SimilarityStrategyKind::Precomputed; }
            model_config.validate()?;
            let ingest_config = IngestConfig { movies_only: !all_types, max_skip_ratio };
            build_model(&input, &output, &model_config, ingest_config)
        }
        Commands::Recommend { model, title, top_n } => recommend(&model, &title, top_n),
        Commands::Inspect { model } => inspect(&model),
    }
}

fn collect_inputs(input_path: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input_path.is_dir() {
        for entry in WalkDir::new(input_path).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() {
                if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                    if matches!(ext, "csv" | "json" | "jsonl") {
                        files.push(p.to_path_buf());
                    }
                }
            }
        }
    } else if input_path.is_file() {
        files.push(input_path.to_path_buf());
    }
    files
}

fn load_catalog(input: &str, config: IngestConfig) -> Result<Vec<Record>> {
    let files = collect_inputs(Path::new(input));
    if files.is_empty() {
        bail!("no catalog files found at {input}");
    }
    let mut ingest = Ingest::new(config);
    for file in &files {
        tracing::info!(file = %file.display(), "reading catalog");
        ingest.read_path(file)?;
    }
    Ok(ingest.finish()?)
}

fn build_model(input: &str, output: &str, config: &ModelConfig, ingest_config: IngestConfig) -> Result<()> {
    let records = load_catalog(input, ingest_config)?;
    let model = Model::fit(records, config)?;

    let paths = ModelPaths::new(output);
    let meta = save_model(&paths, &model, config)?;
    if config.strategy == SimilarityStrategyKind::Precomputed {
        let matrix = PrecomputedMatrix::build(&model);
        save_similarity(&paths, &model, &matrix)?;
    }

    tracing::info!(output, num_docs = meta.num_docs, num_terms = meta.num_terms, "model build complete");
    Ok(())
}

fn recommend(model_dir: &str, title: &str, top_n: usize) -> Result<()> {
    let recommender = load_recommender(&ModelPaths::new(model_dir))?;
    let doc = recommender.resolve(title)?;
    let rule = "=".repeat(80);

    if let Some(r) = recommender.model().record(doc) {
        println!("{rule}");
        println!("{}", r.title.to_uppercase());
        println!("{rule}");
        print_details(&r.genres, &r.director, &r.cast, &r.country, &r.rating, &r.description);
        println!();
    }

    println!("TOP {top_n} RECOMMENDATIONS");
    println!("{rule}");
    for e in recommender.recommend(title, top_n)? {
        println!("\n> {} (similarity: {})", e.title, e.similarity);
        println!("{}", "-".repeat(60));
        print_details(&e.genres, &e.director, &e.cast, &e.country, &e.rating, &e.description);
    }
    Ok(())
}

fn print_details(genres: &[String], director: &str, cast: &[String], country: &[String], rating: &str, description: &str) {
    println!("Genre: {}", genres.join(", "));
    println!("Director: {director}");
    println!("Cast: {}", cast.join(", "));
    println!("Country: {}", country.join(", "));
    println!("Rating: {rating}");
    println!("Description: {description}");
}

fn inspect(model_dir: &str) -> Result<()> {
    let paths = ModelPaths::new(model_dir);
    let meta = load_meta(&paths)?;
    println!("{}", serde_json::to_string_pretty(&meta)?);
    println!("similarity matrix saved: {}", paths.similarity().exists());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn collects_catalog_files_in_name_order() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.jsonl"), "").unwrap();
        fs::write(dir.path().join("a.csv"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        let names: Vec<_> = collect_inputs(dir.path())
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.csv", "b.jsonl"]);
    }

    #[test]
    fn builds_and_reloads_from_jsonl() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("catalog.jsonl");
        let rows = [
            r#"{"show_id":"s1","type":"Movie","title":"Ghost Ship","listed_in":"Horror Movies","description":"a ghost haunts a cargo ship"}"#,
            r#"{"show_id":"s2","type":"Movie","title":"Ghost Town","listed_in":"Horror Movies","description":"a ghost haunts a town"}"#,
            r#"{"show_id":"s3","type":"Movie","title":"Ocean Race","listed_in":"Sports Movies","description":"sailors race a cargo ship"}"#,
            r#"{"show_id":"s4","type":"Movie","title":"Ocean Rescue","listed_in":"Sports Movies","description":"sailors rescue a town"}"#,
        ];
        fs::write(&input, rows.join("\n")).unwrap();
        let out = dir.path().join("model");
        let config = ModelConfig { strategy: SimilarityStrategyKind::Precomputed, ..ModelConfig::default() };
        build_model(input.to_str().unwrap(), out.to_str().unwrap(), &config, IngestConfig::default()).unwrap();

        assert!(out.join("similarity.bin").exists());
        let recommender = load_recommender(&ModelPaths::new(&out)).unwrap();
        assert_eq!(recommender.recommend("ghost ship", 1).unwrap()[0].title, "Ghost Town");
    }
}
