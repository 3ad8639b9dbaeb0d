use crate::config::LayoutSettings;
use crate::error::{FamilyResult, LayoutWarning};
use crate::graph::resolver::RelationResolver;
use crate::graph::store::RelationStore;
use crate::layout::model::{
    escape_label, Cluster, EdgeRole, LayoutEdge, LayoutNode, Mountpoint, NodeRef, PairKey,
    RankGroup, TreeLayout,
};
use crate::types::{Person, PersonId, RelationEdge};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Unvisited,
    Queued,
    Populated,
    /// Wiring started; the person is on the current descent path
    RelationsWired,
    Closed,
}

enum WireStep {
    Enter {
        person: PersonId,
        parent: Option<PersonId>,
    },
    Close(PersonId),
}

/// Per-build traversal state
struct BuildState {
    states: HashMap<PersonId, VisitState>,
    population_order: Vec<PersonId>,
    processed_pairs: HashSet<PairKey>,
    /// Children already hung below a mountpoint
    wired_children: HashSet<PersonId>,
    layout: TreeLayout,
}

impl BuildState {
    fn new(root: PersonId) -> Self {
        Self {
            states: HashMap::new(),
            population_order: Vec::new(),
            processed_pairs: HashSet::new(),
            wired_children: HashSet::new(),
            layout: TreeLayout::new(root),
        }
    }

    fn state(&self, id: PersonId) -> VisitState {
        self.states.get(&id).copied().unwrap_or(VisitState::Unvisited)
    }

    fn set_state(&mut self, id: PersonId, state: VisitState) {
        self.states.insert(id, state);
    }

    fn is_populated(&self, id: PersonId) -> bool {
        matches!(
            self.state(id),
            VisitState::Populated | VisitState::RelationsWired | VisitState::Closed
        )
    }

    fn add_mountpoint(&mut self, key: PairKey, shared_children: bool) -> bool {
        if !self.processed_pairs.insert(key) {
            return false;
        }
        self.layout.mountpoints.push(Mountpoint {
            key,
            shared_children,
        });
        true
    }

    fn add_edge(&mut self, from: NodeRef, to: NodeRef, role: EdgeRole, cluster: PersonId) {
        self.layout.edges.push(LayoutEdge {
            from,
            to,
            role,
            cluster,
        });
    }
}

/// Walks outward from a root person and produces a `TreeLayout`.
///
/// Population is breadth-first over partners and children; wiring is a
/// depth-first descent over children driven by an explicit stack.
pub struct TreeLayoutBuilder<'a> {
    resolver: RelationResolver<'a>,
    settings: &'a LayoutSettings,
}

impl<'a> TreeLayoutBuilder<'a> {
    pub fn new(store: &'a RelationStore, settings: &'a LayoutSettings) -> Self {
        Self {
            resolver: RelationResolver::new(store),
            settings,
        }
    }

    /// Build a layout straight from an edge list that may hold dangling references
    pub fn from_snapshot(
        persons: Vec<Person>,
        relations: Vec<RelationEdge>,
        settings: &LayoutSettings,
        root: PersonId,
    ) -> FamilyResult<TreeLayout> {
        let (store, mut warnings) = RelationStore::build_partial(persons, relations)?;
        let mut layout = TreeLayoutBuilder::new(&store, settings).build(root)?;
        warnings.append(&mut layout.warnings);
        layout.warnings = warnings;
        Ok(layout)
    }

    /// Build the layout for the tree below `root`
    #[instrument(skip(self))]
    pub fn build(&self, root: PersonId) -> FamilyResult<TreeLayout> {
        self.resolver.store().person(root)?;

        let mut state = BuildState::new(root);
        self.populate(root, &mut state)?;

        // Everything not reached by the descent from the root is wired afterwards
        let starts = state.population_order.clone();
        for start in starts {
            if state.state(start) == VisitState::Populated {
                self.wire_from(start, &mut state)?;
            }
        }

        let layout = state.layout;
        info!(
            "Tree layout for person {} built with {} people, {} mountpoints and {} warnings",
            root,
            layout.nodes.len(),
            layout.mountpoints.len(),
            layout.warnings.len()
        );
        Ok(layout)
    }

    /// Breadth-first population over partners and children
    fn populate(&self, root: PersonId, state: &mut BuildState) -> FamilyResult<()> {
        let mut queue = VecDeque::new();
        queue.push_back(root);
        state.set_state(root, VisitState::Queued);

        while let Some(current) = queue.pop_front() {
            if let Some(limit) = self.settings.max_nodes {
                if state.population_order.len() >= limit {
                    warn!("Node limit of {} reached, tree is truncated", limit);
                    state.set_state(current, VisitState::Unvisited);
                    for pending in queue.drain(..) {
                        state.set_state(pending, VisitState::Unvisited);
                    }
                    state
                        .layout
                        .warnings
                        .push(LayoutWarning::NodeLimitReached { limit });
                    break;
                }
            }

            let person = self.resolver.store().person(current)?;
            state.layout.nodes.push(self.layout_node(person));
            state.set_state(current, VisitState::Populated);
            state.population_order.push(current);

            let mut related = self.resolver.partner_ids(current)?;
            related.extend(self.resolver.children(current)?);
            for next in related {
                if state.state(next) == VisitState::Unvisited {
                    state.set_state(next, VisitState::Queued);
                    queue.push_back(next);
                }
            }
        }

        debug!("Populated {} people", state.population_order.len());
        Ok(())
    }

    fn wire_from(&self, start: PersonId, state: &mut BuildState) -> FamilyResult<()> {
        let mut stack = vec![WireStep::Enter {
            person: start,
            parent: None,
        }];

        while let Some(step) = stack.pop() {
            match step {
                WireStep::Close(person) => state.set_state(person, VisitState::Closed),
                WireStep::Enter { person, parent } => {
                    // Pushed by more than one parent; the first visit wins
                    if state.state(person) != VisitState::Populated {
                        continue;
                    }
                    state.set_state(person, VisitState::RelationsWired);
                    state.layout.clusters.push(Cluster {
                        owner: person,
                        parent,
                    });
                    stack.push(WireStep::Close(person));

                    self.wire_partners(person, state)?;
                    let descend = self.wire_children(person, state)?;
                    for child in descend.into_iter().rev() {
                        stack.push(WireStep::Enter {
                            person: child,
                            parent: Some(person),
                        });
                    }
                }
            }
        }

        Ok(())
    }

    /// One mountpoint and rank group per couple, or a self-mountpoint when single
    fn wire_partners(&self, person: PersonId, state: &mut BuildState) -> FamilyResult<()> {
        let partners: Vec<PersonId> = self
            .resolver
            .partner_ids(person)?
            .into_iter()
            .filter(|partner| state.is_populated(*partner))
            .collect();

        if partners.is_empty() {
            state.add_mountpoint(PairKey::Single(person), false);
            return Ok(());
        }

        // Alternate orientation so successive partners land on both sides
        let mut reverse = false;
        for partner in partners {
            let key = PairKey::couple(person, partner);
            let shared_children = self
                .resolver
                .shared_children(person, partner)?
                .into_iter()
                .any(|child| state.is_populated(child));

            if !state.add_mountpoint(key, shared_children) {
                continue;
            }

            let mut chain = vec![
                NodeRef::Person(person),
                NodeRef::from(key),
                NodeRef::Person(partner),
            ];
            if reverse {
                chain.reverse();
            }

            state.add_edge(chain[0], chain[1], EdgeRole::Partner, person);
            state.add_edge(chain[1], chain[2], EdgeRole::Partner, person);
            state.layout.rank_groups.push(RankGroup {
                key,
                members: chain,
            });
            reverse = !reverse;
        }

        Ok(())
    }

    /// Connect children to their parent pair's mountpoint; returns children to descend into
    fn wire_children(
        &self,
        person: PersonId,
        state: &mut BuildState,
    ) -> FamilyResult<Vec<PersonId>> {
        let mut descend = Vec::new();

        for child in self.resolver.children(person)? {
            match state.state(child) {
                VisitState::Unvisited | VisitState::Queued => continue,
                VisitState::RelationsWired => {
                    warn!(
                        "Person {} is recorded as a child of their own descendant {}",
                        child, person
                    );
                    state.layout.warnings.push(LayoutWarning::CycleDetected {
                        ancestor: child,
                        descendant: person,
                    });
                    continue;
                }
                VisitState::Populated => descend.push(child),
                VisitState::Closed => {}
            }

            if !state.wired_children.insert(child) {
                continue;
            }

            let key = self.mountpoint_key(person, child, state)?;
            if let PairKey::Single(_) = key {
                state.add_mountpoint(key, false);
            }
            state.add_edge(NodeRef::from(key), NodeRef::Person(child), EdgeRole::Child, person);
        }

        Ok(descend)
    }

    /// The child's first two populated parents, or `person` alone.
    ///
    /// Depends only on the child, so every parent agrees on it.
    fn mountpoint_key(
        &self,
        person: PersonId,
        child: PersonId,
        state: &BuildState,
    ) -> FamilyResult<PairKey> {
        let populated: Vec<PersonId> = self
            .resolver
            .parents(child)?
            .into_iter()
            .filter(|parent| state.is_populated(*parent))
            .take(2)
            .collect();

        Ok(match populated.as_slice() {
            [first, second] => PairKey::couple(*first, *second),
            [only] => PairKey::Single(*only),
            _ => PairKey::Single(person),
        })
    }

    fn layout_node(&self, person: &Person) -> LayoutNode {
        LayoutNode {
            id: person.id,
            label: format!(
                "<b>{}</b><BR/> {}",
                escape_label(&person.full_name()),
                escape_label(&person.lifespan())
            ),
            gender: person.gender,
            color: self
                .settings
                .colours
                .colour_for(person.gender)
                .to_string(),
        }
    }
}
