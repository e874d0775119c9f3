//! On-disk database layout: `params.json`, `lineage.bin`, `kmers.bin`.

use crate::error::{Error, Result};
use crate::extract::KmerParams;
use crate::taxonomy::{Taxonomy, TaxonId};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

pub const VALUE_BITS: u32 = 24;

#[derive(Debug, Serialize, Deserialize)]
struct ShapeParams {
    pattern: String,
    window_size: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct ParamsFile {
    kmer_size: usize,
    minimizer_size: usize,
    value_bits: u32,
    num_kmers: usize,
    taxonomies: HashMap<String, TaxonId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    kmer_shape: Option<ShapeParams>,
}

/// The fully assembled database: extraction parameters, the taxonomy tree,
/// and the fingerprint -> taxon map built by [`crate::build`].
pub struct Database {
    pub params: KmerParams,
    pub taxonomy: Taxonomy,
    pub kmers: HashMap<u64, TaxonId>,
}

impl Database {
    pub fn write(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        self.write_params(&dir.join("params.json"))?;
        self.write_lineage(&dir.join("lineage.bin"))?;
        self.write_kmers(&dir.join("kmers.bin"))?;
        Ok(())
    }

    fn write_params(&self, path: &Path) -> Result<()> {
        let (minimizer_size, kmer_shape) = match &self.params.mode {
            crate::extract::KmerMode::Plain => (0, None),
            crate::extract::KmerMode::Minimizer { m } => (*m, None),
            crate::extract::KmerMode::Shaped { pattern } => (
                0,
                Some(ShapeParams {
                    pattern: pattern.iter().map(|&b| if b { 'O' } else { '-' }).collect(),
                    window_size: pattern.len(),
                }),
            ),
        };
        let taxonomies: HashMap<String, TaxonId> =
            self.taxonomy.alias_pairs().map(|(name, id)| (name.to_string(), id)).collect();
        let file = ParamsFile {
            kmer_size: self.params.k,
            minimizer_size,
            value_bits: VALUE_BITS,
            num_kmers: self.kmers.len(),
            taxonomies,
            kmer_shape,
        };
        let writer = BufWriter::new(File::create(path).map_err(|e| Error::io(path, e))?);
        serde_json::to_writer_pretty(writer, &file)?;
        Ok(())
    }

    fn write_lineage(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path).map_err(|e| Error::io(path, e))?);
        let pairs: Vec<(TaxonId, TaxonId)> = self.taxonomy.parent_pairs().collect();
        writer.write_u64::<LittleEndian>(pairs.len() as u64)?;
        for (child, parent) in pairs {
            writer.write_u32::<LittleEndian>(child)?;
            writer.write_u32::<LittleEndian>(parent)?;
        }
        Ok(())
    }

    fn write_kmers(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path).map_err(|e| Error::io(path, e))?);
        writer.write_u64::<LittleEndian>(self.kmers.len() as u64)?;
        for (&fingerprint, &taxon) in &self.kmers {
            writer.write_u64::<LittleEndian>(fingerprint)?;
            writer.write_u32::<LittleEndian>(taxon)?;
        }
        Ok(())
    }

    pub fn read(dir: &Path) -> Result<Self> {
        let params_path = dir.join("params.json");
        let reader = BufReader::new(File::open(&params_path).map_err(|e| Error::io(&params_path, e))?);
        let file: ParamsFile = serde_json::from_reader(reader)?;

        let params = if let Some(shape) = &file.kmer_shape {
            KmerParams::shaped(&shape.pattern)?
        } else if file.minimizer_size > 0 {
            KmerParams::minimizer(file.kmer_size, file.minimizer_size)?
        } else {
            KmerParams::plain(file.kmer_size)?
        };

        let names: HashMap<TaxonId, String> =
            file.taxonomies.iter().filter(|(name, _)| !name.contains(';')).map(|(n, &id)| (id, n.clone())).collect();
        let aliases: HashMap<String, TaxonId> = file.taxonomies.clone();

        let lineage_path = dir.join("lineage.bin");
        let mut lineage_reader =
            BufReader::new(File::open(&lineage_path).map_err(|e| Error::io(&lineage_path, e))?);
        let n = lineage_reader.read_u64::<LittleEndian>()?;
        let mut parents = Vec::with_capacity(n as usize);
        for _ in 0..n {
            let child = lineage_reader.read_u32::<LittleEndian>()?;
            let parent = lineage_reader.read_u32::<LittleEndian>()?;
            parents.push((child, parent));
        }

        let taxonomy = Taxonomy::from_parts(parents, names, aliases);

        let kmers_path = dir.join("kmers.bin");
        let mut kmers_reader =
            BufReader::new(File::open(&kmers_path).map_err(|e| Error::io(&kmers_path, e))?);
        let m = kmers_reader.read_u64::<LittleEndian>()?;
        let mut kmers = HashMap::with_capacity(m as usize);
        for _ in 0..m {
            let fingerprint = kmers_reader.read_u64::<LittleEndian>()?;
            let taxon = kmers_reader.read_u32::<LittleEndian>()?;
            kmers.insert(fingerprint, taxon);
        }

        Ok(Self { params, taxonomy, kmers })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::validate_lineage;

    #[test]
    fn database_round_trips_through_disk() {
        let lineage = validate_lineage("d__B;p__P;c__C;o__O;f__F;g__G;s__S").unwrap();
        let taxonomy = Taxonomy::build([lineage.as_slice()]);
        let species = taxonomy.id_of("s__S").unwrap();
        let params = KmerParams::plain(21).unwrap();
        let mut kmers = HashMap::new();
        kmers.insert(0xDEADBEEFu64, species);
        kmers.insert(0xC0FFEEu64, species);

        let db = Database { params, taxonomy, kmers };
        let dir = tempfile::tempdir().unwrap();
        db.write(dir.path()).unwrap();

        let loaded = Database::read(dir.path()).unwrap();
        assert_eq!(loaded.kmers, db.kmers);
        assert_eq!(loaded.params, db.params);
        assert_eq!(loaded.taxonomy.parent_of(species), db.taxonomy.parent_of(species));
    }
}
