//! Demo CLI: generate a context-aware procedure from a free-text request.
//!
//! Parses the request into context filters, traverses the sample graph (or
//! a graph file, when given), prints the annotated steps, and optionally
//! exports a cross-linked markdown document.

use clap::Parser;
use docascode::error::Result;
use docascode::export::ProcedureExporter;
use docascode::graph::{annotate_steps, generate_procedure, GraphStore};
use docascode::query::{parse_free_text_query, DEFAULT_START_NODE};
use docascode::seed::sample_underwriting_graph;

#[derive(Parser, Debug)]
#[command(name = "procedure", about = "Generate a procedure from a free-text request")]
struct Args {
    /// Free-text request, e.g. "home loan for a first-time buyer in New Mexico with rural property"
    query: String,

    /// Graph JSON file to traverse (defaults to the built-in sample graph)
    #[arg(long)]
    graph_file: Option<String>,

    /// Start node for traversal
    #[arg(long, default_value = DEFAULT_START_NODE)]
    start_node: String,

    /// Maximum traversal depth
    #[arg(long, default_value_t = 10)]
    max_depth: usize,

    /// Export the procedure as cross-linked markdown
    #[arg(long)]
    export: bool,

    /// File stem for the exported document (timestamped when omitted)
    #[arg(long)]
    slug: Option<String>,

    /// Output directory for exported documents
    #[arg(long, default_value = "site_docs")]
    output_dir: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let store = match &args.graph_file {
        Some(path) => {
            let mut store = GraphStore::new();
            store.load_from_file(std::path::Path::new(path))?;
            store
        }
        None => sample_underwriting_graph(),
    };

    let parsed = parse_free_text_query(&args.query);
    let filters = parsed.filters();
    log::info!("Parsed query: {:?}", parsed);

    let steps = generate_procedure(&store, &args.start_node, &filters, args.max_depth);
    let annotated = annotate_steps(&store, &steps);

    if annotated.is_empty() {
        println!("No applicable steps found for this request.");
        return Ok(());
    }

    println!("Generated procedure ({} steps):", annotated.len());
    for (idx, step) in annotated.iter().enumerate() {
        let hint = step.hint();
        if hint.is_empty() {
            println!("{}. {}", idx + 1, step.label);
        } else {
            println!("{}. {} — {}", idx + 1, step.label, hint);
        }
    }

    if args.export {
        let base = std::path::PathBuf::from(&args.output_dir);
        let exporter = ProcedureExporter::new(base.join("generated"), base.join("reference"));
        let outfile = exporter.export(&args.query, &annotated, args.slug.as_deref())?;
        println!("\nExported to {}", outfile.display());
    }

    Ok(())
}
