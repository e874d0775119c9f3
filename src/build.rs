//! Two-pass reference ingestion: collect taxonomy, then accumulate
//! fingerprints with LCA merging on collision.

use crate::database::Database;
use crate::error::{Error, Result};
use crate::extract::{self, KmerParams};
use crate::io::open_record_reader;
use crate::lca::lca;
use crate::taxonomy::{validate_lineage, Taxonomy, TaxonId};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A single reference FASTA file to ingest. Builders accept either one file
/// or a directory scanned with [`walkdir`] for matching extensions.
pub fn discover_reference_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(path)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            matches!(
                entry.path().extension().and_then(|e| e.to_str()),
                Some("fa") | Some("fasta") | Some("fna") | Some("gz")
            )
        })
        .map(|entry| entry.path().to_path_buf())
        .collect();
    files.sort();
    Ok(files)
}

/// Builds a [`Database`] from a set of reference FASTA files, each record's
/// comment field carrying the GTDB/SILVA lineage string.
pub fn build_database(files: &[PathBuf], params: KmerParams) -> Result<Database> {
    let lineages = collect_lineages(files)?;
    if lineages.is_empty() {
        return Err(Error::data("no valid taxonomy labels found in reference set"));
    }
    let taxonomy = Taxonomy::build(lineages.iter().map(|l| l.as_slice()));

    let kmers = accumulate_fingerprints(files, &params, &taxonomy)?;
    if kmers.is_empty() {
        return Err(Error::data("no fingerprints extracted from reference set"));
    }

    Ok(Database { params, taxonomy, kmers })
}

fn collect_lineages(files: &[PathBuf]) -> Result<Vec<Vec<String>>> {
    let mut seen = std::collections::HashSet::new();
    let mut lineages = Vec::new();
    for file in files {
        let mut reader = open_record_reader(file).map_err(|e| Error::io(file, e))?;
        while let Some(record) = reader.next_record().map_err(|e| Error::io(file, e))? {
            let Some(comment) = record.comment.as_deref() else {
                log::warn!("{}: record {} has no lineage comment, skipping", file.display(), record.id);
                continue;
            };
            match validate_lineage(comment) {
                Ok(levels) => {
                    let full = levels.join(";");
                    if seen.insert(full) {
                        lineages.push(levels);
                    }
                }
                Err(e) => {
                    log::warn!("{}: record {} has invalid lineage '{}': {}", file.display(), record.id, comment, e);
                }
            }
        }
    }
    Ok(lineages)
}

fn accumulate_fingerprints(
    files: &[PathBuf],
    params: &KmerParams,
    taxonomy: &Taxonomy,
) -> Result<HashMap<u64, TaxonId>> {
    let mut kmers: HashMap<u64, TaxonId> = HashMap::new();
    for file in files {
        let mut reader = open_record_reader(file).map_err(|e| Error::io(file, e))?;
        while let Some(record) = reader.next_record().map_err(|e| Error::io(file, e))? {
            let Some(comment) = record.comment.as_deref() else { continue };
            // Re-validate to get the same per-level-trimmed, semicolon-rejoined
            // key pass 1 stored as the lineage alias; a raw outer-trim of the
            // comment would miss internal whitespace pass 1 normalized away.
            let Ok(levels) = validate_lineage(comment) else {
                continue;
            };
            let key = levels.join(";");
            let Some(leaf) = taxonomy.id_of(&key) else {
                continue;
            };
            for fingerprint in extract::extract(&record.seq, params) {
                merge_fingerprint(&mut kmers, fingerprint, leaf, taxonomy);
            }
        }
    }
    Ok(kmers)
}

fn merge_fingerprint(kmers: &mut HashMap<u64, TaxonId>, fingerprint: u64, taxon: TaxonId, taxonomy: &Taxonomy) {
    kmers
        .entry(fingerprint)
        .and_modify(|existing| *existing = lca(*existing, taxon, taxonomy))
        .or_insert(taxon);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_fasta(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn single_reference_builds_one_kmer_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fasta(
            dir.path(),
            "ref.fa",
            ">r1 d__B;p__P;c__C;o__O;f__F;g__G;s__S\nACGTACGTACGTACGTACGTACGTA\n",
        );
        let params = KmerParams::plain(25).unwrap();
        let db = build_database(&[path], params).unwrap();
        assert_eq!(db.kmers.len(), 1);
        let species = db.taxonomy.id_of("s__S").unwrap();
        assert_eq!(*db.kmers.values().next().unwrap(), species);
    }

    #[test]
    fn shared_kmer_across_species_merges_to_genus() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fasta(
            dir.path(),
            "ref.fa",
            concat!(
                ">r1 d__B;p__P;c__C;o__O;f__F;g__G;s__S1\nAAAAAAAAAAAAAAAAAAAAAAAAA\n",
                ">r2 d__B;p__P;c__C;o__O;f__F;g__G;s__S2\nAAAAAAAAAAAAAAAAAAAAAAAAA\n",
            ),
        );
        let params = KmerParams::plain(25).unwrap();
        let db = build_database(&[path], params).unwrap();
        assert_eq!(db.kmers.len(), 1);
        let genus = db.taxonomy.id_of("g__G").unwrap();
        assert_eq!(*db.kmers.values().next().unwrap(), genus);
    }

    #[test]
    fn empty_reference_set_is_a_fatal_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fasta(dir.path(), "ref.fa", "");
        let params = KmerParams::plain(25).unwrap();
        assert!(build_database(&[path], params).is_err());
    }

    #[test]
    fn internal_whitespace_in_lineage_still_resolves_in_pass_two() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fasta(
            dir.path(),
            "ref.fa",
            ">r1 d__B; p__P;c__C;o__O;f__F;g__G;s__S\nACGTACGTACGTACGTACGTACGTA\n",
        );
        let params = KmerParams::plain(25).unwrap();
        let db = build_database(&[path], params).unwrap();
        assert_eq!(db.kmers.len(), 1);
        let species = db.taxonomy.id_of("s__S").unwrap();
        assert_eq!(*db.kmers.values().next().unwrap(), species);
    }
}
