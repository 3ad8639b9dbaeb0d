use crate::error::FamilyResult;
use crate::graph::store::RelationStore;
use crate::types::{EdgeId, EdgeKind, PersonId};
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A partner of some person, either stored explicitly or inferred from a shared child
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnerLink {
    pub person: PersonId,
    /// Stored partner edge; `None` for inferred partners
    pub relation: Option<EdgeId>,
}

impl PartnerLink {
    pub fn is_inferred(&self) -> bool {
        self.relation.is_none()
    }
}

/// Family relation queries over a `RelationStore`.
///
/// Every query is a pure function of the store: the same id always yields
/// the same people in the same order.
#[derive(Debug, Clone, Copy)]
pub struct RelationResolver<'a> {
    store: &'a RelationStore,
}

impl<'a> RelationResolver<'a> {
    pub fn new(store: &'a RelationStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &'a RelationStore {
        self.store
    }

    /// Parents of `id`, oldest first
    pub fn parents(&self, id: PersonId) -> FamilyResult<Vec<PersonId>> {
        let parents = self.store.neighbors(id, EdgeKind::Parent, Direction::Incoming)?;
        Ok(self.birth_order(parents).into_iter().map(|(person, _)| person).collect())
    }

    /// Children of `id`, oldest first
    pub fn children(&self, id: PersonId) -> FamilyResult<Vec<PersonId>> {
        let children = self.store.neighbors(id, EdgeKind::Parent, Direction::Outgoing)?;
        Ok(self.birth_order(children).into_iter().map(|(person, _)| person).collect())
    }

    /// Partners recorded with a partner edge, in either direction
    pub fn explicit_partners(&self, id: PersonId) -> FamilyResult<Vec<PartnerLink>> {
        let mut partners = self.store.neighbors(id, EdgeKind::Partner, Direction::Outgoing)?;
        partners.extend(self.store.neighbors(id, EdgeKind::Partner, Direction::Incoming)?);

        Ok(self
            .birth_order(partners)
            .into_iter()
            .map(|(person, edge_id)| PartnerLink {
                person,
                relation: Some(edge_id),
            })
            .collect())
    }

    /// Other parents of `id`'s children that are not explicit partners
    pub fn inferred_partners(&self, id: PersonId) -> FamilyResult<Vec<PersonId>> {
        let explicit: HashSet<PersonId> = self
            .explicit_partners(id)?
            .into_iter()
            .map(|link| link.person)
            .collect();

        let mut inferred = Vec::new();
        for child in self.children(id)? {
            for parent in self.parents(child)? {
                if parent != id && !explicit.contains(&parent) && !inferred.contains(&parent) {
                    inferred.push(parent);
                }
            }
        }

        Ok(inferred)
    }

    /// Explicit partners followed by inferred partners
    pub fn partners(&self, id: PersonId) -> FamilyResult<Vec<PartnerLink>> {
        let mut partners = self.explicit_partners(id)?;
        partners.extend(
            self.inferred_partners(id)?
                .into_iter()
                .map(|person| PartnerLink {
                    person,
                    relation: None,
                }),
        );
        Ok(partners)
    }

    pub fn partner_ids(&self, id: PersonId) -> FamilyResult<Vec<PersonId>> {
        Ok(self.partners(id)?.into_iter().map(|link| link.person).collect())
    }

    /// Everyone sharing at least one parent with `id`
    pub fn siblings(&self, id: PersonId) -> FamilyResult<Vec<PersonId>> {
        let mut siblings = Vec::new();
        for parent in self.parents(id)? {
            for child in self.children(parent)? {
                if child != id && !siblings.contains(&child) {
                    siblings.push(child);
                }
            }
        }
        Ok(siblings)
    }

    /// Children with both `a` and `b` as parents, in `a`'s child order
    pub fn shared_children(&self, a: PersonId, b: PersonId) -> FamilyResult<Vec<PersonId>> {
        let mut shared = Vec::new();
        for child in self.children(a)? {
            if self.parents(child)?.contains(&b) {
                shared.push(child);
            }
        }
        Ok(shared)
    }

    /// Sort by earliest known birth year, unknown years last, then by id
    fn birth_order(&self, mut people: Vec<(PersonId, EdgeId)>) -> Vec<(PersonId, EdgeId)> {
        people.sort_by_key(|&(person, edge_id)| {
            let year = self
                .store
                .person(person)
                .ok()
                .and_then(|person| person.birth_year());
            (year.is_none(), year, person, edge_id)
        });
        people
    }
}
