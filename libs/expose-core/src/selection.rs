//! Client-declared field-selection trees.
//!
//! A selection tree is the parsed form of an expose definition: an ordered
//! mapping from field name to either a leaf (a scalar field, or an
//! association included bare) or a nested tree (an association with a
//! further restriction). Trees coming from several route definitions for
//! the same entity merge additively.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One entry of a [`SelectionTree`], keyed by field name in the tree.
///
/// Serialized form: `null` for a leaf, an object for a nested tree, so the
/// wire shape of a whole tree is `{"title": null, "author": {"name": null}}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SelectionNode {
    Tree(SelectionTree),
    Field,
}

impl SelectionNode {
    pub fn is_leaf(&self) -> bool {
        matches!(self, SelectionNode::Field)
    }

    pub fn as_tree(&self) -> Option<&SelectionTree> {
        match self {
            SelectionNode::Tree(t) => Some(t),
            SelectionNode::Field => None,
        }
    }
}

/// Ordered field-selection tree. Insertion order is preserved all the way
/// into the projection plan, so resolving the same tree twice yields
/// structurally identical output.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectionTree(IndexMap<String, SelectionNode>);

impl SelectionTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, name: &str) -> Option<&SelectionNode> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SelectionNode)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Select a scalar field (or an association bare, one level deep).
    pub fn insert_field(&mut self, name: impl Into<String>) {
        self.0.entry(name.into()).or_insert(SelectionNode::Field);
    }

    /// Select an association restricted to a nested tree.
    pub fn insert_tree(&mut self, name: impl Into<String>, tree: SelectionTree) {
        self.0.insert(name.into(), SelectionNode::Tree(tree));
    }

    /// Builder-style [`insert_field`](Self::insert_field).
    pub fn with_field(mut self, name: impl Into<String>) -> Self {
        self.insert_field(name);
        self
    }

    /// Builder-style [`insert_tree`](Self::insert_tree).
    pub fn with_tree(mut self, name: impl Into<String>, tree: SelectionTree) -> Self {
        self.insert_tree(name, tree);
        self
    }

    /// Recursive additive union with another tree.
    ///
    /// A name present on either side is present in the result. When both
    /// sides carry a nested tree the trees merge recursively; when one side
    /// is a leaf and the other a nested tree, the nested restriction wins.
    /// A bare re-expose never widens a restricted association back to its
    /// full row.
    pub fn merge(&mut self, other: SelectionTree) {
        use indexmap::map::Entry;

        for (name, node) in other.0 {
            match node {
                SelectionNode::Field => {
                    self.0.entry(name).or_insert(SelectionNode::Field);
                }
                SelectionNode::Tree(theirs) => match self.0.entry(name) {
                    Entry::Vacant(slot) => {
                        slot.insert(SelectionNode::Tree(theirs));
                    }
                    Entry::Occupied(mut slot) => match slot.get_mut() {
                        SelectionNode::Tree(mine) => mine.merge(theirs),
                        leaf @ SelectionNode::Field => *leaf = SelectionNode::Tree(theirs),
                    },
                },
            }
        }
    }
}

impl FromIterator<(String, SelectionNode)> for SelectionTree {
    fn from_iter<I: IntoIterator<Item = (String, SelectionNode)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a SelectionTree {
    type Item = (&'a String, &'a SelectionNode);
    type IntoIter = indexmap::map::Iter<'a, String, SelectionNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
