//! Weighted call-tree accumulation and merging.
//!
//! Each capture of a thread's stack walks one root-to-leaf path through its
//! bucket's forest, incrementing every node on the path exactly once. Nodes
//! are owned by their parent (roots by the bucket), children keyed by the
//! resolved [`MethodIdentity`] — a node is never removed and its identity
//! never mutates, so repeated captures only ever add weight or append
//! children.
//!
//! Merging is the export-time half: it folds forests into fresh nodes under
//! a [`MergeMode`], summing sample counts for equal-keyed nodes and carrying
//! unmatched children through unchanged. The fold is commutative and
//! associative in total sample counts, which is what makes snapshots from
//! separate runs combinable.

use std::collections::HashMap;
use std::str::FromStr;

use crate::domain::{MethodIdentity, StackFrame};

/// Policy for collapsing or preserving overload distinctions when trees are
/// combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeMode {
    /// All overloads of a method collapse into one node; samples sum.
    SameMethod,
    /// Nodes merge only on full identity, disambiguator included.
    #[default]
    SeparateMethod,
}

impl MergeMode {
    /// The identity two nodes must share to merge under this mode.
    fn key(self, identity: &MethodIdentity) -> MethodIdentity {
        match self {
            MergeMode::SameMethod => MethodIdentity::new(
                identity.class_name.clone(),
                identity.method_name.clone(),
                None,
            ),
            MergeMode::SeparateMethod => identity.clone(),
        }
    }
}

impl FromStr for MergeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "same-method" => Ok(MergeMode::SameMethod),
            "separate-method" => Ok(MergeMode::SeparateMethod),
            other => Err(format!("unknown merge mode '{other}'")),
        }
    }
}

/// One node of a bucket's call tree.
#[derive(Debug, Clone)]
pub struct CallTreeNode {
    identity: MethodIdentity,
    /// First observed call-site line, kept as the representative for export.
    line_number: Option<u32>,
    total_samples: u64,
    children: HashMap<MethodIdentity, CallTreeNode>,
}

impl CallTreeNode {
    fn new(identity: MethodIdentity, line_number: Option<u32>) -> Self {
        Self {
            identity,
            line_number,
            total_samples: 0,
            children: HashMap::new(),
        }
    }

    pub fn identity(&self) -> &MethodIdentity {
        &self.identity
    }

    pub fn line_number(&self) -> Option<u32> {
        self.line_number
    }

    /// Number of captures whose path passed through this node.
    pub fn total_samples(&self) -> u64 {
        self.total_samples
    }

    pub fn children(&self) -> impl Iterator<Item = &CallTreeNode> {
        self.children.values()
    }

    /// Look up a direct child by class and method name, any disambiguator.
    /// Returns the first match; meant for tests and diagnostics.
    pub fn find_child(&self, class_name: &str, method_name: &str) -> Option<&CallTreeNode> {
        self.children
            .values()
            .find(|n| n.identity.class_name == class_name && n.identity.method_name == method_name)
    }
}

/// Accumulation unit for all threads sharing one grouping key.
#[derive(Debug, Clone)]
pub struct ThreadBucket {
    group_key: String,
    roots: HashMap<MethodIdentity, CallTreeNode>,
}

impl ThreadBucket {
    pub fn new(group_key: impl Into<String>) -> Self {
        Self {
            group_key: group_key.into(),
            roots: HashMap::new(),
        }
    }

    pub fn group_key(&self) -> &str {
        &self.group_key
    }

    pub fn roots(&self) -> impl Iterator<Item = &CallTreeNode> {
        self.roots.values()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Fold one captured stack into the bucket.
    ///
    /// `frames` is outermost-first; `resolve` maps each frame to its merge
    /// key. Increments are applied root-to-leaf, one per node on the path.
    pub fn accumulate<F>(&mut self, frames: &[StackFrame], mut resolve: F)
    where
        F: FnMut(&StackFrame) -> MethodIdentity,
    {
        let mut cursor = &mut self.roots;
        for frame in frames {
            let identity = resolve(frame);
            let node = cursor
                .entry(identity.clone())
                .or_insert_with(|| CallTreeNode::new(identity, frame.line_number));
            node.total_samples += 1;
            cursor = &mut node.children;
        }
    }
}

/// A session's complete accumulation state: one bucket per grouping key.
pub type BucketMap = HashMap<String, ThreadBucket>;

/// Merge a forest of nodes into fresh nodes under `mode`.
///
/// Equal-keyed nodes sum their sample counts and merge children pairwise by
/// the same rule; unmatched children carry through unchanged. The inputs are
/// untouched, so this is safe to run against a live tree copy.
pub fn merge_forest<'a, I>(mode: MergeMode, nodes: I) -> Vec<CallTreeNode>
where
    I: IntoIterator<Item = &'a CallTreeNode>,
{
    let mut merged: HashMap<MethodIdentity, CallTreeNode> = HashMap::new();
    for node in nodes {
        fold_into(&mut merged, node, mode);
    }
    merged.into_values().collect()
}

fn fold_into(target: &mut HashMap<MethodIdentity, CallTreeNode>, node: &CallTreeNode, mode: MergeMode) {
    let key = mode.key(&node.identity);
    let entry = target
        .entry(key.clone())
        .or_insert_with(|| CallTreeNode::new(key, node.line_number));
    entry.total_samples += node.total_samples;
    if entry.line_number.is_none() {
        entry.line_number = node.line_number;
    }
    for child in node.children.values() {
        fold_into(&mut entry.children, child, mode);
    }
}

/// Fold the bucket sets of two completed runs into one.
///
/// Buckets sharing a group key have their forests merged under `mode`;
/// keys present in only one run carry through (re-keyed under `mode` so the
/// result is uniform).
pub fn merge_bucket_maps(mode: MergeMode, a: &BucketMap, b: &BucketMap) -> BucketMap {
    let mut out = BucketMap::new();
    for bucket in a.values().chain(b.values()) {
        let entry = out
            .entry(bucket.group_key.clone())
            .or_insert_with(|| ThreadBucket::new(bucket.group_key.clone()));
        let combined = merge_forest(mode, entry.roots.values().chain(bucket.roots.values()));
        entry.roots = combined
            .into_iter()
            .map(|n| (n.identity.clone(), n))
            .collect();
    }
    out
}
