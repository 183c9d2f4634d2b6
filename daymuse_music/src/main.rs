// Daymuse — CLI entry point.
//
// Composes one day's piece from a file of precomputed article embeddings.
// The pipeline: load continuity from the data directory -> extract semantic
// features -> build the music intent -> generate the score -> write MIDI.
//
// Usage:
//   cargo run -p daymuse_music -- [output.mid] --input embeddings.json
//     [--data-dir DIR] [--date YYYY-MM-DD] [--seed N] [--duration SECONDS]
//     [--clusters K] [--solo]
//
// The input file holds a JSON array of embedding vectors, one per article,
// as produced by the external sentence-embedding model. With --solo the
// output is the motif-engine solo piano rendition instead of the ensemble.

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use daymuse_music::midi::write_midi;
use daymuse_music::pipeline::{PipelineConfig, run_day};
use daymuse_music::solo::generate_solo;
use daymuse_semantics::{DailyStore, Embedding};

fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    let output_path = args
        .get(1)
        .filter(|s| !s.starts_with("--"))
        .map(|s| s.as_str())
        .unwrap_or("music.mid");
    let input_path: Option<String> = parse_flag(&args, "--input");
    let data_dir: String = parse_flag(&args, "--data-dir").unwrap_or_else(|| "data".to_string());
    let seed: Option<u64> = parse_flag(&args, "--seed");
    let date: Option<String> = parse_flag(&args, "--date");
    let duration: u32 = parse_flag(&args, "--duration").unwrap_or(75);
    let clusters: usize = parse_flag(&args, "--clusters").unwrap_or(4);
    let solo = args.iter().any(|a| a == "--solo");

    let Some(input_path) = input_path else {
        eprintln!("Missing --input <embeddings.json>");
        std::process::exit(2);
    };

    let day: NaiveDate = match date {
        Some(s) => match s.parse() {
            Ok(d) => d,
            Err(e) => {
                eprintln!("Invalid --date '{s}': {e}");
                std::process::exit(2);
            }
        },
        None => chrono::Local::now().date_naive(),
    };

    println!("=== Daymuse ===");
    println!("Date: {day}");
    println!("Input: {input_path}");
    println!("Output: {output_path} ({})", if solo { "solo piano" } else { "ensemble" });
    if let Some(s) = seed {
        println!("Seed: {s}");
    }
    println!();

    println!("[1/3] Loading embeddings...");
    let batch = match load_embeddings(Path::new(&input_path)) {
        Ok(batch) => batch,
        Err(e) => {
            eprintln!("  Failed to read {input_path}: {e}");
            std::process::exit(1);
        }
    };
    if batch.is_empty() {
        eprintln!("  No articles in {input_path}. Nothing to compose.");
        std::process::exit(1);
    }
    println!("  {} articles, dimension {}.", batch.len(), batch[0].len());

    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_os_rng(),
    };

    println!("[2/3] Extracting features and composing...");
    let store = DailyStore::new(&data_dir);
    let config = PipelineConfig {
        num_clusters: clusters,
        duration_seconds: duration,
        ..PipelineConfig::default()
    };
    let output = match run_day(&store, day, &batch, &config, &mut rng) {
        Ok(output) => output,
        Err(e) => {
            eprintln!("  Pipeline failed: {e}");
            std::process::exit(1);
        }
    };
    let f = &output.features;
    println!(
        "  Phase: {} | topics: {} | entropy: {:.2} | velocity: {:.2} | novelty: {:.2}",
        f.narrative_phase.as_str(),
        f.num_topics,
        f.topic_entropy,
        f.semantic_velocity,
        f.semantic_novelty
    );
    println!(
        "  Emotion: valence {:+.2}, arousal {:.2}, tension {:.2} | tempo {} BPM",
        f.emotion.valence, f.emotion.arousal, f.emotion.tension, output.intent.tempo_base
    );

    println!("[3/3] Writing MIDI to {output_path}...");
    let score = if solo {
        generate_solo(f, duration, &mut rng)
    } else {
        output.score
    };
    match write_midi(&score, Path::new(output_path)) {
        Ok(()) => {
            println!("  Done! {} notes across {} tracks.", score.total_notes(), score.tracks.len());
        }
        Err(e) => {
            eprintln!("  Error writing MIDI: {e}");
            std::process::exit(1);
        }
    }

    println!();
    println!("Play with: timidity {output_path} (or any MIDI player)");
}

fn load_embeddings(path: &Path) -> Result<Vec<Embedding>, Box<dyn std::error::Error>> {
    let bytes = std::fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn parse_flag<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse().ok())
}
