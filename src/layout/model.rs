use crate::error::LayoutWarning;
use crate::types::{Gender, PersonId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical key of a couple (lowest id first) or of a single parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PairKey {
    Single(PersonId),
    Couple(PersonId, PersonId),
}

impl PairKey {
    pub fn couple(a: PersonId, b: PersonId) -> Self {
        if a <= b {
            PairKey::Couple(a, b)
        } else {
            PairKey::Couple(b, a)
        }
    }

    /// "3" for a single parent, "3x7" for a couple
    pub fn relation_id(&self) -> String {
        match self {
            PairKey::Single(id) => id.to_string(),
            PairKey::Couple(a, b) => format!("{}x{}", a, b),
        }
    }

    pub fn members(&self) -> Vec<PersonId> {
        match self {
            PairKey::Single(id) => vec![*id],
            PairKey::Couple(a, b) => vec![*a, *b],
        }
    }
}

/// Node of the drawing. A single parent's mountpoint is the person node itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeRef {
    Person(PersonId),
    Couple(PersonId, PersonId),
}

impl From<PairKey> for NodeRef {
    fn from(key: PairKey) -> Self {
        match key {
            PairKey::Single(id) => NodeRef::Person(id),
            PairKey::Couple(a, b) => NodeRef::Couple(a, b),
        }
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRef::Person(id) => write!(f, "P{}", id),
            NodeRef::Couple(a, b) => write!(f, "P{}x{}", a, b),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutNode {
    pub id: PersonId,
    /// HTML-like label body: bold full name, line break, lifespan
    pub label: String,
    pub gender: Gender,
    pub color: String,
}

impl LayoutNode {
    pub fn node_ref(&self) -> NodeRef {
        NodeRef::Person(self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mountpoint {
    pub key: PairKey,
    /// The couple has at least one child in the tree
    pub shared_children: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeRole {
    /// Person to mountpoint to partner
    Partner,
    /// Mountpoint down to a child
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutEdge {
    pub from: NodeRef,
    pub to: NodeRef,
    pub role: EdgeRole,
    /// Owner of the cluster the edge is drawn in
    pub cluster: PersonId,
}

/// Nodes that must be drawn on the same rank
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankGroup {
    pub key: PairKey,
    pub members: Vec<NodeRef>,
}

/// Invisible subgraph grouping everything wired for one person
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    pub owner: PersonId,
    pub parent: Option<PersonId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeLayout {
    pub root: PersonId,
    pub nodes: Vec<LayoutNode>,
    pub mountpoints: Vec<Mountpoint>,
    pub rank_groups: Vec<RankGroup>,
    pub clusters: Vec<Cluster>,
    pub edges: Vec<LayoutEdge>,
    pub warnings: Vec<LayoutWarning>,
}

impl TreeLayout {
    pub fn new(root: PersonId) -> Self {
        Self {
            root,
            nodes: Vec::new(),
            mountpoints: Vec::new(),
            rank_groups: Vec::new(),
            clusters: Vec::new(),
            edges: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn node(&self, id: PersonId) -> Option<&LayoutNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn contains(&self, id: PersonId) -> bool {
        self.node(id).is_some()
    }

    pub fn mountpoint(&self, key: PairKey) -> Option<&Mountpoint> {
        self.mountpoints.iter().find(|mountpoint| mountpoint.key == key)
    }

    pub fn edges_in(&self, cluster: PersonId) -> impl Iterator<Item = &LayoutEdge> {
        self.edges.iter().filter(move |edge| edge.cluster == cluster)
    }

    pub fn subclusters(&self, parent: Option<PersonId>) -> impl Iterator<Item = &Cluster> {
        self.clusters
            .iter()
            .filter(move |cluster| cluster.parent == parent)
    }

    /// Edges leading down to children
    pub fn child_edges(&self) -> impl Iterator<Item = &LayoutEdge> {
        self.edges.iter().filter(|edge| edge.role == EdgeRole::Child)
    }

    /// True when something was skipped or truncated
    pub fn is_partial(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn has_cycle(&self) -> bool {
        self.warnings
            .iter()
            .any(|warning| matches!(warning, LayoutWarning::CycleDetected { .. }))
    }
}

/// Escape text for an HTML-like graph label
pub fn escape_label(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_key_is_canonical() {
        assert_eq!(
            PairKey::couple(PersonId(7), PersonId(3)),
            PairKey::couple(PersonId(3), PersonId(7))
        );
        assert_eq!(PairKey::couple(PersonId(7), PersonId(3)).relation_id(), "3x7");
        assert_eq!(PairKey::Single(PersonId(4)).relation_id(), "4");
    }

    #[test]
    fn test_node_names() {
        let couple: NodeRef = PairKey::couple(PersonId(2), PersonId(1)).into();
        assert_eq!(couple.to_string(), "P1x2");
        let single: NodeRef = PairKey::Single(PersonId(5)).into();
        assert_eq!(single, NodeRef::Person(PersonId(5)));
        assert_eq!(single.to_string(), "P5");
    }

    #[test]
    fn test_escape_label() {
        assert_eq!(escape_label("Jan & <Piet>"), "Jan &amp; &lt;Piet&gt;");
    }
}
