//! Document-order sorting and duplicate removal.

use crate::tree::{self, Tree};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Sort `elements` into document order and drop duplicates.
///
/// Uses the host comparator when the tree offers one, otherwise compares sibling-index paths
/// from the root. Elements of different roots (detached subtrees, other documents) are
/// grouped by the order in which their root first appears in the input.
pub fn unique_sort<T: Tree>(tree: &T, mut elements: Vec<T::Node>) -> Vec<T::Node> {
    if elements.len() < 2 {
        return elements;
    }

    let mut root_ranks: HashMap<T::Node, usize> = HashMap::new();
    let mut element_ranks: HashMap<T::Node, usize> = HashMap::with_capacity(elements.len());
    for &element in &elements {
        if element_ranks.contains_key(&element) {
            continue;
        }
        let root = tree::root_of(tree, element);
        let next = root_ranks.len();
        let rank = *root_ranks.entry(root).or_insert(next);
        element_ranks.insert(element, rank);
    }
    let rank_of = |node: &T::Node| element_ranks.get(node).copied().unwrap_or(usize::MAX);

    if tree.features().comparator {
        elements.sort_by(|a, b| {
            rank_of(a)
                .cmp(&rank_of(b))
                .then_with(|| tree.compare_position(*a, *b).unwrap_or(Ordering::Equal))
        });
    } else {
        elements.sort_by_cached_key(|node| (rank_of(node), document_path(tree, *node)));
    }
    elements.dedup();
    elements
}

/// Child indexes from the root down to `node`.
fn document_path<T: Tree>(tree: &T, node: T::Node) -> Vec<usize> {
    let mut path = Vec::new();
    let mut current = node;
    while tree.parent(current).is_some() {
        let mut index = 0;
        let mut sibling = tree.previous_sibling(current);
        while let Some(s) = sibling {
            index += 1;
            sibling = tree.previous_sibling(s);
        }
        path.push(index);
        match tree.parent(current) {
            Some(parent) => current = parent,
            None => break,
        }
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Document, NodeId};
    use crate::tree::HostFeatures;

    fn sample(features: HostFeatures) -> (Document, Vec<NodeId>) {
        let mut doc = Document::new().with_features(features);
        let root = doc.root();
        let a = doc.append_element(root, "div", &[]);
        let b = doc.append_element(a, "p", &[]);
        let c = doc.append_element(a, "p", &[]);
        let d = doc.append_element(root, "div", &[]);
        (doc, vec![a, b, c, d])
    }

    #[test]
    fn test_sorts_and_dedups_with_and_without_comparator() {
        for features in [HostFeatures::indexed(), HostFeatures::none()] {
            let (doc, n) = sample(features);
            let shuffled = vec![n[3], n[1], n[0], n[3], n[2], n[1]];
            assert_eq!(unique_sort(&doc, shuffled), n, "{features:?}");
        }
    }

    #[test]
    fn test_detached_roots_follow_first_appearance() {
        for features in [HostFeatures::indexed(), HostFeatures::none()] {
            let (mut doc, n) = sample(features);
            let loose = doc.create_element("section");
            let inner = doc.append_element(loose, "span", &[]);

            let sorted = unique_sort(&doc, vec![inner, n[2], loose, n[0]]);
            assert_eq!(sorted, vec![loose, inner, n[0], n[2]], "{features:?}");
        }
    }

    #[test]
    fn test_small_inputs_untouched() {
        let (doc, n) = sample(HostFeatures::none());
        assert!(unique_sort(&doc, Vec::new()).is_empty());
        assert_eq!(unique_sort(&doc, vec![n[2]]), vec![n[2]]);
    }
}
