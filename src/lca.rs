//! Lowest-common-ancestor resolution over a parent-pointer taxonomy tree.

use crate::taxonomy::{Taxonomy, TaxonId, ROOT};
use std::collections::HashSet;

/// Defensive bound on ancestor-walk depth; the taxonomy tree built from
/// validated lineages never exceeds 7 levels, so this is generous headroom
/// against a corrupt or cyclic parent table rather than a real limit.
const MAX_WALK_DEPTH: usize = 256;

/// Returns the lowest common ancestor of `a` and `b` in `taxonomy`, or
/// [`ROOT`] if they share no ancestor within [`MAX_WALK_DEPTH`] hops.
pub fn lca(a: TaxonId, b: TaxonId, taxonomy: &Taxonomy) -> TaxonId {
    if a == b {
        return a;
    }
    let mut ancestors = HashSet::new();
    let mut cur = a;
    ancestors.insert(cur);
    let mut depth = 0;
    while cur != ROOT && depth < MAX_WALK_DEPTH {
        cur = taxonomy.parent_of(cur);
        ancestors.insert(cur);
        depth += 1;
    }

    let mut cur = b;
    if ancestors.contains(&cur) {
        return cur;
    }
    let mut depth = 0;
    while cur != ROOT && depth < MAX_WALK_DEPTH {
        cur = taxonomy.parent_of(cur);
        if ancestors.contains(&cur) {
            return cur;
        }
        depth += 1;
    }
    ROOT
}

/// Folds [`lca`] over an iterator of taxa, in iteration order. The result is
/// independent of order since LCA is associative and commutative.
pub fn fold_lca<I: IntoIterator<Item = TaxonId>>(taxa: I, taxonomy: &Taxonomy) -> TaxonId {
    let mut iter = taxa.into_iter();
    let first = match iter.next() {
        Some(t) => t,
        None => return ROOT,
    };
    iter.fold(first, |acc, t| lca(acc, t, taxonomy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::validate_lineage;

    fn sample_tree() -> Taxonomy {
        let l1 = validate_lineage("d__B;p__P;c__C;o__O;f__F;g__G;s__S1").unwrap();
        let l2 = validate_lineage("d__B;p__P;c__C;o__O;f__F;g__G;s__S2").unwrap();
        Taxonomy::build([l1.as_slice(), l2.as_slice()])
    }

    #[test]
    fn lca_is_reflexive() {
        let tree = sample_tree();
        let species = tree.id_of("s__S1").unwrap();
        assert_eq!(lca(species, species, &tree), species);
    }

    #[test]
    fn lca_is_commutative() {
        let tree = sample_tree();
        let a = tree.id_of("s__S1").unwrap();
        let b = tree.id_of("s__S2").unwrap();
        assert_eq!(lca(a, b, &tree), lca(b, a, &tree));
    }

    #[test]
    fn lca_of_siblings_is_their_genus() {
        let tree = sample_tree();
        let a = tree.id_of("s__S1").unwrap();
        let b = tree.id_of("s__S2").unwrap();
        let genus = tree.id_of("g__G").unwrap();
        assert_eq!(lca(a, b, &tree), genus);
    }

    #[test]
    fn lca_with_root_is_root() {
        let tree = sample_tree();
        let a = tree.id_of("s__S1").unwrap();
        assert_eq!(lca(a, ROOT, &tree), ROOT);
    }

    #[test]
    fn fold_lca_over_empty_set_is_root() {
        let tree = sample_tree();
        assert_eq!(fold_lca(std::iter::empty(), &tree), ROOT);
    }
}
