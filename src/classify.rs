//! Read classification: quality masking, hit tallying, LCA tie-breaking and
//! confidence scoring.

use crate::database::Database;
use crate::error::{Error, Result};
use crate::extract;
use crate::lca::fold_lca;
use crate::taxonomy::TaxonId;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub const DEFAULT_QUALITY_THRESHOLD: i32 = 15;
pub const DEFAULT_MIN_HITS: u64 = 3;

#[derive(Debug, Clone)]
pub struct ClassifyConfig {
    pub quality_threshold: i32,
    pub min_hits: u64,
    pub threads: usize,
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self { quality_threshold: DEFAULT_QUALITY_THRESHOLD, min_hits: DEFAULT_MIN_HITS, threads: 1 }
    }
}

/// The outcome of classifying a single read.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub read_id: String,
    pub taxonomy: String,
    pub hit_count: u64,
    pub total_kmers: usize,
    pub confidence: f64,
}

pub const UNCLASSIFIED: &str = "no hits";

/// Replaces bases whose Phred+33 quality is below `threshold` with `N`.
/// If `qual`'s length doesn't match `seq`'s, the sequence is returned
/// unmodified (no masking is applied to malformed input).
pub fn mask_quality(seq: &[u8], qual: Option<&[u8]>, threshold: i32) -> Vec<u8> {
    match qual {
        Some(qual) if qual.len() == seq.len() => seq
            .iter()
            .zip(qual.iter())
            .map(|(&base, &q)| if (q as i32 - '!' as i32) < threshold { b'N' } else { base })
            .collect(),
        _ => seq.to_vec(),
    }
}

/// Classifies a single (already quality-masked) sequence against `db`.
pub fn classify_sequence(seq: &[u8], db: &Database, config: &ClassifyConfig) -> Classification {
    classify_impl(seq, db, config, String::new())
}

fn classify_impl(seq: &[u8], db: &Database, config: &ClassifyConfig, read_id: String) -> Classification {
    let fingerprints = extract::extract(seq, &db.params);
    if fingerprints.is_empty() {
        return Classification { read_id, taxonomy: UNCLASSIFIED.to_string(), hit_count: 0, total_kmers: 0, confidence: 0.0 };
    }

    let mut tally: HashMap<TaxonId, u64> = HashMap::new();
    for fingerprint in &fingerprints {
        if let Some(&taxon) = db.kmers.get(fingerprint) {
            *tally.entry(taxon).or_insert(0) += 1;
        }
    }
    let total_hits: u64 = tally.values().sum();

    if total_hits < config.min_hits {
        return Classification {
            read_id,
            taxonomy: UNCLASSIFIED.to_string(),
            hit_count: total_hits,
            total_kmers: fingerprints.len(),
            confidence: 0.0,
        };
    }

    let max_count = *tally.values().max().unwrap_or(&0);
    let tied: Vec<TaxonId> = tally.iter().filter(|&(_, &count)| count == max_count).map(|(&t, _)| t).collect();
    let winner = fold_lca(tied, &db.taxonomy);
    let taxonomy = db.taxonomy.name_of(winner).map(str::to_string).unwrap_or_else(|| "unclassified".to_string());
    let confidence = max_count as f64 / fingerprints.len() as f64;

    Classification { read_id, taxonomy, hit_count: max_count, total_kmers: fingerprints.len(), confidence }
}

/// A single taxonomy's aggregated summary row.
#[derive(Debug, Clone, Default)]
struct SummaryAccumulator {
    reads: u64,
    confidence_sum: f64,
    total_bases: u64,
}

/// Classifies every record yielded by `reader`, writing
/// `<prefix>_classification.txt` and `<prefix>_summary.txt` under `out_dir`.
pub fn classify_stream(
    reader: &mut dyn crate::io::RecordReader,
    db: &Database,
    config: &ClassifyConfig,
    out_dir: &Path,
    prefix: &str,
) -> Result<usize> {
    std::fs::create_dir_all(out_dir)?;
    let classification_path = out_dir.join(format!("{}_classification.txt", prefix));
    let summary_path = out_dir.join(format!("{}_summary.txt", prefix));

    let mut classification_writer =
        BufWriter::new(File::create(&classification_path).map_err(|e| Error::io(&classification_path, e))?);

    let mut summaries: HashMap<String, SummaryAccumulator> = HashMap::new();
    let mut batch = Vec::with_capacity(1024);
    let mut count = 0usize;

    loop {
        batch.clear();
        for _ in 0..1024 {
            match reader.next_record()? {
                Some(record) => batch.push(record),
                None => break,
            }
        }
        if batch.is_empty() {
            break;
        }

        let results: Vec<Classification> = if config.threads > 1 {
            classify_batch_parallel(&batch, db, config)
        } else {
            classify_batch_sequential(&batch, db, config)
        };

        for result in &results {
            writeln!(
                classification_writer,
                "{}\t{}\t{}\t{}",
                result.read_id, result.taxonomy, result.hit_count, result.total_kmers
            )?;
        }

        for (record, result) in batch.iter().zip(results.iter()) {
            let masked = mask_quality(&record.seq, record.qual.as_deref(), config.quality_threshold);
            let entry = summaries.entry(result.taxonomy.clone()).or_default();
            entry.reads += 1;
            entry.confidence_sum += result.confidence;
            entry.total_bases += masked.len() as u64;
        }

        count += results.len();
    }

    write_summary(&summary_path, &summaries)?;
    Ok(count)
}

fn classify_batch_sequential(batch: &[crate::io::Record], db: &Database, config: &ClassifyConfig) -> Vec<Classification> {
    batch
        .iter()
        .map(|record| {
            let masked = mask_quality(&record.seq, record.qual.as_deref(), config.quality_threshold);
            classify_impl(&masked, db, config, record.id.clone())
        })
        .collect()
}

fn classify_batch_parallel(batch: &[crate::io::Record], db: &Database, config: &ClassifyConfig) -> Vec<Classification> {
    use rayon::prelude::*;
    batch
        .par_iter()
        .map(|record| {
            let masked = mask_quality(&record.seq, record.qual.as_deref(), config.quality_threshold);
            classify_impl(&masked, db, config, record.id.clone())
        })
        .collect()
}

fn write_summary(path: &Path, summaries: &HashMap<String, SummaryAccumulator>) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path).map_err(|e| Error::io(path, e))?);
    writeln!(writer, "Taxonomy\tReads\tAvg_Score\tTotal_Bases")?;
    let mut rows: Vec<(&String, &SummaryAccumulator)> = summaries.iter().collect();
    rows.sort_by(|a, b| b.1.reads.cmp(&a.1.reads).then_with(|| a.0.cmp(b.0)));
    for (taxonomy, acc) in rows {
        let avg = if acc.reads > 0 { acc.confidence_sum / acc.reads as f64 } else { 0.0 };
        writeln!(writer, "{}\t{}\t{:.3}\t{}", taxonomy, acc.reads, avg, acc.total_bases)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::build_database;
    use crate::extract::KmerParams;

    fn sample_db() -> Database {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ref.fa");
        let mut f = File::create(&path).unwrap();
        writeln!(f, ">r1 d__B;p__P;c__C;o__O;f__F;g__G;s__S").unwrap();
        writeln!(f, "ACGTACGTACGTACGTACGTACGTA").unwrap();
        let params = KmerParams::plain(25).unwrap();
        build_database(&[path], params).unwrap()
    }

    #[test]
    fn mask_quality_replaces_low_quality_bases() {
        let seq = b"ACGT";
        let qual = b"!!!!"; // Phred 0 everywhere
        let masked = mask_quality(seq, Some(qual), 15);
        assert_eq!(masked, b"NNNN");
    }

    #[test]
    fn mask_quality_passes_through_on_length_mismatch() {
        let seq = b"ACGT";
        let qual = b"!!"; // mismatched length
        let masked = mask_quality(seq, Some(qual), 15);
        assert_eq!(masked, seq);
    }

    #[test]
    fn identical_read_classifies_with_full_confidence() {
        let db = sample_db();
        let config = ClassifyConfig { min_hits: 1, ..Default::default() };
        let result = classify_impl(b"ACGTACGTACGTACGTACGTACGTA", &db, &config, "q1".to_string());
        assert_eq!(result.taxonomy, "s__S");
        assert_eq!(result.hit_count, 1);
        assert!((result.confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn reverse_complement_classifies_identically() {
        let db = sample_db();
        let config = ClassifyConfig { min_hits: 1, ..Default::default() };
        let revcomp = b"TACGTACGTACGTACGTACGTACGT";
        let result = classify_impl(revcomp, &db, &config, "q1".to_string());
        assert_eq!(result.taxonomy, "s__S");
    }

    #[test]
    fn fully_masked_read_is_unclassified() {
        let db = sample_db();
        let config = ClassifyConfig::default();
        let seq = b"ACGTACGTACGTACGTACGTACGTA";
        let qual = vec![b'!'; seq.len()];
        let masked = mask_quality(seq, Some(&qual), config.quality_threshold);
        let result = classify_impl(&masked, &db, &config, "q1".to_string());
        assert_eq!(result.taxonomy, UNCLASSIFIED);
    }

    #[test]
    fn raising_min_hits_never_turns_no_hits_into_a_hit() {
        let db = sample_db();
        let lenient = ClassifyConfig { min_hits: 0, ..Default::default() };
        let strict = ClassifyConfig { min_hits: 1000, ..Default::default() };
        let seq = b"ACGTACGTACGTACGTACGTACGTA";
        let lenient_result = classify_impl(seq, &db, &lenient, "q1".to_string());
        let strict_result = classify_impl(seq, &db, &strict, "q1".to_string());
        if lenient_result.taxonomy == UNCLASSIFIED {
            assert_eq!(strict_result.taxonomy, UNCLASSIFIED);
        }
    }
}
