//! `clap`-derive argument structs for the `build` and `classify` subcommands.

use crate::classify::{DEFAULT_MIN_HITS, DEFAULT_QUALITY_THRESHOLD};
use crate::extract::{KmerParams, MAX_K, MIN_K};
use clap::Parser;
use std::path::PathBuf;

/// Default k-mer length used when `--k-mer` is not given and `--shape` is
/// absent too.
const DEFAULT_K: u8 = 25;

#[derive(Parser, Debug, Clone)]
#[clap(version, about = "Build a k-mer taxonomy database from reference sequences")]
pub struct BuildArgs {
    /// Reference FASTA file or directory (scanned recursively for .fa/.fasta/.fna[.gz])
    #[arg(short, long, required = true)]
    pub source: PathBuf,

    /// Output database directory
    #[arg(short, long, required = true)]
    pub database: PathBuf,

    /// Length of k-mers, 1 <= k <= 31 (default 25); mutually exclusive with --shape
    #[clap(short, long, value_parser = clap::value_parser!(u8).range(MIN_K as i64..=MAX_K as i64))]
    pub k_mer: Option<u8>,

    /// Minimizer length, 0 disables minimizer mode (1 <= m < k)
    #[clap(short = 'm', long, default_value_t = 0)]
    pub minimizer_len: u8,

    /// Spaced k-mer shape, e.g. "OOO--OOO--OOO"; mutually exclusive with --k-mer
    #[clap(long)]
    pub shape: Option<String>,
}

impl BuildArgs {
    /// Resolves the CLI flags into a single [`KmerParams`], enforcing that
    /// `--shape` and an explicit `--k-mer` are not both supplied.
    pub fn kmer_params(&self) -> crate::error::Result<KmerParams> {
        use crate::error::Error;
        match (&self.shape, self.k_mer, self.minimizer_len) {
            (Some(_), Some(_), _) => {
                Err(Error::config("--shape cannot be combined with an explicit --k-mer"))
            }
            (Some(_), None, m) if m != 0 => {
                Err(Error::config("--shape cannot be combined with --minimizer-len"))
            }
            (Some(pattern), None, _) => KmerParams::shaped(pattern),
            (None, k, 0) => KmerParams::plain(k.unwrap_or(DEFAULT_K) as usize),
            (None, k, m) => KmerParams::minimizer(k.unwrap_or(DEFAULT_K) as usize, m as usize),
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[clap(version, about = "Classify reads against a built taxonomy database")]
pub struct ClassifyArgs {
    /// Database directory produced by `build`
    #[arg(short, long, required = true)]
    pub database: PathBuf,

    /// FASTQ query file, optionally gzip-compressed
    #[arg(short, long, required = true)]
    pub input: PathBuf,

    /// Output directory for `<prefix>_classification.txt` / `<prefix>_summary.txt`
    #[arg(short, long, required = true)]
    pub output_dir: PathBuf,

    /// Output file name prefix
    #[arg(long, default_value = "sample")]
    pub prefix: String,

    /// Minimum Phred+33 quality; bases below this are masked to N
    #[clap(long, default_value_t = DEFAULT_QUALITY_THRESHOLD)]
    pub quality_threshold: i32,

    /// Minimum total k-mer hits required to classify a read
    #[clap(long, default_value_t = DEFAULT_MIN_HITS)]
    pub min_hits: u64,

    /// Number of worker threads for classification (1 = sequential)
    #[clap(short = 'p', long, default_value_t = 1)]
    pub threads: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_args_parses_defaults() {
        let args = BuildArgs::try_parse_from(["taxokmer", "--source", "refs/", "--database", "db/"]).unwrap();
        assert_eq!(args.k_mer, None);
        assert_eq!(args.minimizer_len, 0);
        assert_eq!(args.shape, None);
        assert_eq!(args.kmer_params().unwrap(), KmerParams::plain(DEFAULT_K as usize).unwrap());
    }

    #[test]
    fn build_args_rejects_k_mer_out_of_range() {
        let result = BuildArgs::try_parse_from(["taxokmer", "--source", "refs/", "--database", "db/", "--k-mer", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn build_args_rejects_missing_required_flags() {
        let result = BuildArgs::try_parse_from(["taxokmer", "--source", "refs/"]);
        assert!(result.is_err());
    }

    #[test]
    fn build_args_shape_alone_is_accepted() {
        let args = BuildArgs::try_parse_from([
            "taxokmer",
            "--source",
            "refs/",
            "--database",
            "db/",
            "--shape",
            "OOO--OOO",
        ])
        .unwrap();
        assert!(args.kmer_params().is_ok());
    }

    #[test]
    fn build_args_shape_with_explicit_k_mer_is_a_config_error() {
        let args = BuildArgs::try_parse_from([
            "taxokmer",
            "--source",
            "refs/",
            "--database",
            "db/",
            "--shape",
            "OOO--OOO",
            "--k-mer",
            "31",
        ])
        .unwrap();
        assert!(args.kmer_params().is_err());
    }

    #[test]
    fn build_args_shape_with_minimizer_len_is_a_config_error() {
        let args = BuildArgs::try_parse_from([
            "taxokmer",
            "--source",
            "refs/",
            "--database",
            "db/",
            "--shape",
            "OOO--OOO",
            "--minimizer-len",
            "5",
        ])
        .unwrap();
        assert!(args.kmer_params().is_err());
    }

    #[test]
    fn classify_args_parses_defaults() {
        let args = ClassifyArgs::try_parse_from([
            "taxokmer",
            "--database",
            "db/",
            "--input",
            "reads.fq",
            "--output-dir",
            "out/",
        ])
        .unwrap();
        assert_eq!(args.prefix, "sample");
        assert_eq!(args.quality_threshold, DEFAULT_QUALITY_THRESHOLD);
        assert_eq!(args.min_hits, DEFAULT_MIN_HITS);
        assert_eq!(args.threads, 1);
    }
}
