use clap::{Parser, Subcommand};
use std::time::Instant;

use taxokmer::args::{BuildArgs, ClassifyArgs};
use taxokmer::build::{build_database, discover_reference_files};
use taxokmer::classify::{classify_stream, ClassifyConfig};
use taxokmer::io::open_record_reader;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: jemallocator::Jemalloc = jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[clap(author, version, about = "k-mer based taxonomic sequence classifier", long_about = None)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a fingerprint -> taxon database from reference sequences
    Build(BuildArgs),
    /// Classify reads against a built database
    Classify(ClassifyArgs),
}

fn run_build(args: BuildArgs) -> taxokmer::Result<()> {
    let params = args.kmer_params()?;
    let files = discover_reference_files(&args.source)?;
    if files.is_empty() {
        return Err(taxokmer::Error::config(format!(
            "no reference files found under {}",
            args.source.display()
        )));
    }
    taxokmer::util::ensure_fd_limit(files.len() + 16);
    log::info!("building database from {} reference file(s)", files.len());

    let database = build_database(&files, params)?;
    log::info!(
        "taxonomy: {} taxa, fingerprint map: {} entries",
        database.taxonomy.len(),
        database.kmers.len()
    );

    database.write(&args.database)?;
    log::info!("wrote database to {}", args.database.display());
    Ok(())
}

fn run_classify(args: ClassifyArgs) -> taxokmer::Result<()> {
    let database = taxokmer::Database::read(&args.database)?;
    log::info!("loaded database from {}", args.database.display());

    let config = ClassifyConfig {
        quality_threshold: args.quality_threshold,
        min_hits: args.min_hits,
        threads: args.threads,
    };

    let mut reader = open_record_reader(&args.input).map_err(|e| taxokmer::Error::io(&args.input, e))?;
    let count = classify_stream(reader.as_mut(), &database, &config, &args.output_dir, &args.prefix)?;
    log::info!("classified {} read(s)", count);
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let start = Instant::now();
    match cli.command {
        Commands::Build(args) => run_build(args)?,
        Commands::Classify(args) => run_classify(args)?,
    }
    log::info!("done in {:?}", start.elapsed());

    Ok(())
}
