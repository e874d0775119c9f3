//! GTDB/SILVA-style lineage parsing and the parent-pointer taxonomy tree.

use crate::error::{Error, Result};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

pub type TaxonId = u32;

pub const ROOT: TaxonId = 0;

const LEVEL_PREFIXES: [&str; 7] = ["d__", "p__", "c__", "o__", "f__", "g__", "s__"];

fn level_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9 _.()/:-]+$").expect("static regex"))
}

/// Splits a lineage string into its levels (without prefixes) and validates
/// it against the GTDB/SILVA convention: 1..=7 levels, the first tagged
/// `d__` or `k__`, the rest tagged by positional rank, each non-empty after
/// its prefix and containing only the allowed name characters.
pub fn validate_lineage(lineage: &str) -> Result<Vec<String>> {
    if lineage.trim().is_empty() {
        return Err(Error::data("lineage string is empty"));
    }
    let levels: Vec<&str> = lineage.split(';').map(str::trim).collect();
    if levels.is_empty() || levels.len() > LEVEL_PREFIXES.len() {
        return Err(Error::data(format!(
            "lineage has {} levels, expected 1..={}",
            levels.len(),
            LEVEL_PREFIXES.len()
        )));
    }
    let mut names = Vec::with_capacity(levels.len());
    for (idx, level) in levels.iter().enumerate() {
        if level.is_empty() {
            return Err(Error::data("empty lineage level"));
        }
        let expected_prefix = LEVEL_PREFIXES[idx];
        let matches_prefix = if idx == 0 {
            level.starts_with("d__") || level.starts_with("k__")
        } else {
            level.starts_with(expected_prefix)
        };
        if !matches_prefix {
            return Err(Error::data(format!(
                "level {} ('{}') does not start with expected prefix '{}'",
                idx, level, expected_prefix
            )));
        }
        let name = &level[3..];
        if name.is_empty() {
            return Err(Error::data(format!("level {} has no name after its prefix", idx)));
        }
        if !level_name_re().is_match(name) {
            return Err(Error::data(format!("level {} name '{}' contains invalid characters", idx, name)));
        }
        names.push(level.to_string());
    }
    Ok(names)
}

/// A parent-pointer taxonomy tree rooted at [`ROOT`], built from a set of
/// validated lineage strings.
#[derive(Debug, Default, Clone)]
pub struct Taxonomy {
    parents: HashMap<TaxonId, TaxonId>,
    names: HashMap<TaxonId, String>,
    ids: HashMap<String, TaxonId>,
    next_id: TaxonId,
}

impl Taxonomy {
    pub fn new() -> Self {
        let mut names = HashMap::new();
        let mut ids = HashMap::new();
        names.insert(ROOT, "root".to_string());
        ids.insert("root".to_string(), ROOT);
        Self { parents: HashMap::new(), names, ids, next_id: 1 }
    }

    /// Builds a taxonomy tree from already-validated lineages (as returned
    /// by [`validate_lineage`]). Each lineage's most specific level is
    /// recorded as an alias for the full joined lineage string, so the
    /// builder can resolve a reference's `TaxonId` directly from its raw
    /// lineage text.
    pub fn build<'a, I: IntoIterator<Item = &'a [String]>>(lineages: I) -> Self {
        let mut tree = Self::new();
        for levels in lineages {
            tree.insert_lineage(levels);
        }
        tree
    }

    pub fn insert_lineage(&mut self, levels: &[String]) -> TaxonId {
        let mut parent = ROOT;
        let mut leaf = ROOT;
        for level in levels {
            let id = self.intern(level, parent);
            parent = id;
            leaf = id;
        }
        let full = levels.join(";");
        self.ids.entry(full).or_insert(leaf);
        leaf
    }

    fn intern(&mut self, name: &str, parent: TaxonId) -> TaxonId {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.names.insert(id, name.to_string());
        self.ids.insert(name.to_string(), id);
        if id != parent {
            self.parents.insert(id, parent);
        }
        id
    }

    pub fn parent_of(&self, id: TaxonId) -> TaxonId {
        self.parents.get(&id).copied().unwrap_or(ROOT)
    }

    pub fn name_of(&self, id: TaxonId) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    /// Resolves a lineage string (or a single level's prefixed text) to its
    /// `TaxonId`, if known.
    pub fn id_of(&self, name: &str) -> Option<TaxonId> {
        self.ids.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.len() <= 1
    }

    pub fn parent_pairs(&self) -> impl Iterator<Item = (TaxonId, TaxonId)> + '_ {
        self.parents.iter().map(|(&child, &parent)| (child, parent))
    }

    pub fn name_pairs(&self) -> impl Iterator<Item = (TaxonId, &str)> + '_ {
        self.names.iter().map(|(&id, name)| (id, name.as_str()))
    }

    pub fn alias_pairs(&self) -> impl Iterator<Item = (&str, TaxonId)> + '_ {
        self.ids.iter().map(|(name, &id)| (name.as_str(), id))
    }

    /// Reconstructs a taxonomy from its serialized parent pairs and
    /// name/alias tables (used when loading a database back from disk).
    pub fn from_parts(
        parents: impl IntoIterator<Item = (TaxonId, TaxonId)>,
        names: impl IntoIterator<Item = (TaxonId, String)>,
        aliases: impl IntoIterator<Item = (String, TaxonId)>,
    ) -> Self {
        let parents: HashMap<_, _> = parents.into_iter().collect();
        let mut names: HashMap<_, _> = names.into_iter().collect();
        names.entry(ROOT).or_insert_with(|| "root".to_string());
        let mut ids: HashMap<_, _> = aliases.into_iter().collect();
        ids.entry("root".to_string()).or_insert(ROOT);
        let next_id = names.keys().copied().max().map(|m| m + 1).unwrap_or(1);
        Self { parents, names, ids, next_id }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_well_formed_lineage() {
        let levels = validate_lineage("d__Bacteria;p__Firmicutes;c__Bacilli;o__Lactobacillales;f__Streptococcaceae;g__Streptococcus;s__Streptococcus_pyogenes").unwrap();
        assert_eq!(levels.len(), 7);
    }

    #[test]
    fn rejects_missing_prefix() {
        assert!(validate_lineage("Bacteria;p__Firmicutes").is_err());
    }

    #[test]
    fn rejects_too_many_levels() {
        let lineage = "d__A;p__B;c__C;o__D;f__E;g__F;s__G;x__H";
        assert!(validate_lineage(lineage).is_err());
    }

    #[test]
    fn shared_prefix_shares_ids() {
        let lineage1 = validate_lineage("d__B;p__P;c__C;o__O;f__F;g__G;s__S1").unwrap();
        let lineage2 = validate_lineage("d__B;p__P;c__C;o__O;f__F;g__G;s__S2").unwrap();
        let tree = Taxonomy::build([lineage1.as_slice(), lineage2.as_slice()]);
        let genus1 = tree.id_of("g__G").unwrap();
        let species1 = tree.id_of("s__S1").unwrap();
        let species2 = tree.id_of("s__S2").unwrap();
        assert_eq!(tree.parent_of(species1), genus1);
        assert_eq!(tree.parent_of(species2), genus1);
        assert_ne!(species1, species2);
    }

    #[test]
    fn every_non_root_id_reaches_root() {
        let lineage = validate_lineage("d__B;p__P;c__C;o__O;f__F;g__G;s__S").unwrap();
        let tree = Taxonomy::build([lineage.as_slice()]);
        let mut id = tree.id_of("s__S").unwrap();
        let mut hops = 0;
        while id != ROOT {
            id = tree.parent_of(id);
            hops += 1;
            assert!(hops < 16, "taxonomy walk did not reach root");
        }
    }
}
