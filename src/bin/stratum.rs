//! Stratum CLI — inspect annotation graph snapshots.
//!
//! Usage:
//!   stratum info <snapshot.json>
//!   stratum layers <snapshot.json>
//!   stratum text <snapshot.json>
//!   stratum spans <snapshot.json> --layer Token --from 0 --to 27 [--mode covered-by]

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use stratum::{Document, DocumentReader, DocumentSnapshot, LayerKey};

#[derive(Parser)]
#[command(
    name = "stratum",
    version,
    about = "Layered annotation graph store"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show document id, text length and entity counts
    Info {
        /// Path to a document snapshot (JSON)
        snapshot: PathBuf,
    },
    /// List node and edge layers with member counts
    Layers {
        /// Path to a document snapshot (JSON)
        snapshot: PathBuf,
    },
    /// Print the document text
    Text {
        /// Path to a document snapshot (JSON)
        snapshot: PathBuf,
    },
    /// Scan one layer's annotations against a text range
    Spans {
        /// Path to a document snapshot (JSON)
        snapshot: PathBuf,
        /// Layer name to scan
        #[arg(long)]
        layer: String,
        /// Variant within the layer
        #[arg(long)]
        variant: Option<String>,
        /// Range start offset
        #[arg(long, default_value_t = 0)]
        from: usize,
        /// Range end offset (defaults to the text length)
        #[arg(long)]
        to: Option<usize>,
        /// How the stored ranges must relate to the query range
        #[arg(long, value_enum, default_value = "covered-by")]
        mode: Mode,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    CoveredBy,
    Overlapping,
    Covering,
}

fn load_document(path: &Path) -> Result<Document, String> {
    let data = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    let snapshot: DocumentSnapshot = serde_json::from_str(&data)
        .map_err(|e| format!("Failed to parse {}: {}", path.display(), e))?;
    snapshot
        .restore()
        .map_err(|e| format!("Failed to restore document: {}", e))
}

fn cmd_info(doc: &Document) -> i32 {
    println!("id:         {}", doc.id());
    println!("text:       {} bytes", doc.text().len());
    println!("layers:     {} node / {} edge", doc.node_layers().count(), doc.edge_layers().count());
    println!("entities:   {} nodes / {} edges", doc.node_count(), doc.edge_count());
    0
}

fn cmd_layers(doc: &Document) -> i32 {
    let reader = DocumentReader::new(doc);
    for key in reader.node_layers() {
        if let Some(layer) = doc.node_collection(key) {
            println!(
                "node {:<24} {} pure, {} annotations",
                key.to_string(),
                layer.pure().count(),
                layer.annotations().len()
            );
        }
    }
    for key in reader.edge_layers() {
        if let Some(layer) = doc.edge_collection(key) {
            println!("edge {:<24} {} edges", key.to_string(), layer.len());
        }
    }
    0
}

fn cmd_text(doc: &Document) -> i32 {
    println!("{}", doc.text());
    0
}

fn cmd_spans(
    doc: &Document,
    layer: &str,
    variant: Option<&str>,
    from: usize,
    to: Option<usize>,
    mode: Mode,
) -> i32 {
    let key = match variant {
        Some(v) => LayerKey::with_variant(layer, v),
        None => LayerKey::new(layer),
    };
    let to = to.unwrap_or_else(|| doc.text().len());
    let reader = DocumentReader::new(doc);
    let hits = match mode {
        Mode::CoveredBy => reader.covered_by(&key, from, to),
        Mode::Overlapping => reader.overlapping(&key, from, to),
        Mode::Covering => reader.covering(&key, from, to),
    };
    if hits.is_empty() {
        eprintln!("No matching annotations in '{}'", key);
        return 1;
    }
    for node in hits {
        if let (Ok(Some((start, end))), Ok(text)) = (doc.range(node), doc.covered_text(node)) {
            println!("[{:>5}, {:>5})  {}", start, end, text.unwrap_or(""));
        }
    }
    0
}

fn main() {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let code = match cli.command {
        Commands::Info { snapshot } => match load_document(&snapshot) {
            Ok(doc) => cmd_info(&doc),
            Err(e) => {
                eprintln!("Error: {}", e);
                1
            }
        },
        Commands::Layers { snapshot } => match load_document(&snapshot) {
            Ok(doc) => cmd_layers(&doc),
            Err(e) => {
                eprintln!("Error: {}", e);
                1
            }
        },
        Commands::Text { snapshot } => match load_document(&snapshot) {
            Ok(doc) => cmd_text(&doc),
            Err(e) => {
                eprintln!("Error: {}", e);
                1
            }
        },
        Commands::Spans {
            snapshot,
            layer,
            variant,
            from,
            to,
            mode,
        } => match load_document(&snapshot) {
            Ok(doc) => cmd_spans(&doc, &layer, variant.as_deref(), from, to, mode),
            Err(e) => {
                eprintln!("Error: {}", e);
                1
            }
        },
    };
    std::process::exit(code);
}
