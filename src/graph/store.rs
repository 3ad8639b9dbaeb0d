use crate::error::{FamilyError, FamilyResult, LayoutWarning};
use crate::types::{EdgeId, EdgeKind, Person, PersonId, RelationEdge};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Immutable adjacency index over people and their stored relations.
///
/// Each edge kind lives in its own petgraph `DiGraph`. Both graphs receive
/// the same nodes in the same order, so one `node_map` serves both.
#[derive(Debug, Clone)]
pub struct RelationStore {
    persons: Vec<Person>,
    node_map: HashMap<PersonId, NodeIndex>,
    parent_graph: DiGraph<PersonId, EdgeId>,
    partner_graph: DiGraph<PersonId, EdgeId>,
    edges: Vec<RelationEdge>,
}

impl RelationStore {
    /// Build a store, rejecting any edge that points at an unknown person
    pub fn build(persons: Vec<Person>, edges: Vec<RelationEdge>) -> FamilyResult<Self> {
        let (store, _) = Self::build_inner(persons, edges, true)?;
        Ok(store)
    }

    /// Build a store, skipping edges that point at an unknown person.
    ///
    /// Skipped edges come back as `DanglingReference` warnings. Self relations
    /// and duplicate person ids are still rejected.
    pub fn build_partial(
        persons: Vec<Person>,
        edges: Vec<RelationEdge>,
    ) -> FamilyResult<(Self, Vec<LayoutWarning>)> {
        Self::build_inner(persons, edges, false)
    }

    fn build_inner(
        mut persons: Vec<Person>,
        edges: Vec<RelationEdge>,
        strict: bool,
    ) -> FamilyResult<(Self, Vec<LayoutWarning>)> {
        persons.sort_by_key(|person| person.id);

        let mut parent_graph = DiGraph::new();
        let mut partner_graph = DiGraph::new();
        let mut node_map = HashMap::new();

        // First pass: one node per person, same index in both graphs
        for person in &persons {
            if node_map.contains_key(&person.id) {
                return Err(FamilyError::DuplicatePerson(person.id));
            }
            let node_index = parent_graph.add_node(person.id);
            partner_graph.add_node(person.id);
            node_map.insert(person.id, node_index);
        }

        // Second pass: edges
        let mut stored = Vec::new();
        let mut seen = HashSet::new();
        let mut warnings = Vec::new();

        for edge in edges {
            let edge = edge.canonical();

            if edge.is_self_relation() {
                return Err(FamilyError::InvalidEdge {
                    up: edge.up,
                    down: edge.down,
                    kind: edge.kind,
                    reason: "a person cannot be related to themselves".to_string(),
                });
            }

            let (up_index, down_index) = match (node_map.get(&edge.up), node_map.get(&edge.down)) {
                (Some(&up), Some(&down)) => (up, down),
                (up, _) => {
                    let missing = if up.is_none() { edge.up } else { edge.down };
                    if strict {
                        return Err(FamilyError::InvalidEdge {
                            up: edge.up,
                            down: edge.down,
                            kind: edge.kind,
                            reason: format!("unknown person {}", missing),
                        });
                    }
                    warn!(
                        "Skipping {} edge {} -> {}: person {} is unknown",
                        edge.kind, edge.up, edge.down, missing
                    );
                    warnings.push(LayoutWarning::DanglingReference {
                        up: edge.up,
                        down: edge.down,
                        kind: edge.kind,
                        missing,
                    });
                    continue;
                }
            };

            if !seen.insert(edge) {
                debug!("Merging duplicate {} edge {} -> {}", edge.kind, edge.up, edge.down);
                continue;
            }

            let edge_id = EdgeId(stored.len());
            match edge.kind {
                EdgeKind::Parent => parent_graph.add_edge(up_index, down_index, edge_id),
                EdgeKind::Partner => partner_graph.add_edge(up_index, down_index, edge_id),
            };
            stored.push(edge);
        }

        info!(
            "Relation store built with {} people and {} relations",
            persons.len(),
            stored.len()
        );

        let store = Self {
            persons,
            node_map,
            parent_graph,
            partner_graph,
            edges: stored,
        };
        Ok((store, warnings))
    }

    /// Get the number of people in the store
    pub fn person_count(&self) -> usize {
        self.persons.len()
    }

    /// Get the number of stored relations
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn contains(&self, id: PersonId) -> bool {
        self.node_map.contains_key(&id)
    }

    pub fn person(&self, id: PersonId) -> FamilyResult<&Person> {
        let node_index = self.index(id)?;
        Ok(&self.persons[node_index.index()])
    }

    /// All people, ordered by id
    pub fn persons(&self) -> impl Iterator<Item = &Person> {
        self.persons.iter()
    }

    pub fn edge(&self, edge_id: EdgeId) -> Option<&RelationEdge> {
        self.edges.get(edge_id.0)
    }

    pub fn edges(&self) -> &[RelationEdge] {
        &self.edges
    }

    /// Direct neighbours of `id` along one edge kind, with the backing edge.
    ///
    /// `Outgoing` follows `up -> down`, `Incoming` follows `down -> up`.
    pub(crate) fn neighbors(
        &self,
        id: PersonId,
        kind: EdgeKind,
        direction: Direction,
    ) -> FamilyResult<Vec<(PersonId, EdgeId)>> {
        let node_index = self.index(id)?;
        let graph = match kind {
            EdgeKind::Parent => &self.parent_graph,
            EdgeKind::Partner => &self.partner_graph,
        };

        let mut neighbors = Vec::new();
        for edge in graph.edges_directed(node_index, direction) {
            let other = match direction {
                Direction::Outgoing => edge.target(),
                Direction::Incoming => edge.source(),
            };
            if let Some(&person_id) = graph.node_weight(other) {
                neighbors.push((person_id, *edge.weight()));
            }
        }

        Ok(neighbors)
    }

    /// Groups of people that are recorded as their own ancestors
    pub fn parent_cycles(&self) -> Vec<Vec<PersonId>> {
        let mut cycles: Vec<Vec<PersonId>> = tarjan_scc(&self.parent_graph)
            .into_iter()
            .filter(|component| component.len() > 1)
            .map(|component| {
                let mut members: Vec<PersonId> = component
                    .into_iter()
                    .filter_map(|node_index| self.parent_graph.node_weight(node_index).copied())
                    .collect();
                members.sort();
                members
            })
            .collect();
        cycles.sort();

        if !cycles.is_empty() {
            debug!("Found {} parent cycles", cycles.len());
        }
        cycles
    }

    fn index(&self, id: PersonId) -> FamilyResult<NodeIndex> {
        self.node_map
            .get(&id)
            .copied()
            .ok_or(FamilyError::NotFound(id))
    }
}
