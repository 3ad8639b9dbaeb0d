use crate::error::FamilyResult;
use crate::graph::resolver::RelationResolver;
use crate::graph::store::RelationStore;
use crate::types::{ClassifiedRelation, EdgeId, EdgeKind, Person, PersonId, RelationKind};
use petgraph::Direction;
use std::collections::HashMap;
use tracing::debug;

/// Builds the classified family set of a person.
///
/// Configured family surnames are handed in by the caller; a relative whose
/// last or married name matches one of them is tagged with it.
#[derive(Debug, Clone)]
pub struct FamilyClassifier<'a> {
    resolver: RelationResolver<'a>,
    families: Vec<String>,
}

impl<'a> FamilyClassifier<'a> {
    pub fn new(store: &'a RelationStore) -> Self {
        Self {
            resolver: RelationResolver::new(store),
            families: Vec::new(),
        }
    }

    pub fn with_families(mut self, families: Vec<String>) -> Self {
        self.families = families;
        self
    }

    /// Everyone related to `id`, each tagged with exactly one relation kind.
    ///
    /// Priority when several kinds match: parent, child, partner, sibling.
    pub fn classify(&self, id: PersonId) -> FamilyResult<Vec<ClassifiedRelation>> {
        let store = self.resolver.store();
        store.person(id)?;

        let parent_edges: HashMap<PersonId, EdgeId> = store
            .neighbors(id, EdgeKind::Parent, Direction::Incoming)?
            .into_iter()
            .collect();
        let child_edges: HashMap<PersonId, EdgeId> = store
            .neighbors(id, EdgeKind::Parent, Direction::Outgoing)?
            .into_iter()
            .collect();

        let mut candidates: Vec<(PersonId, RelationKind, Option<EdgeId>)> = Vec::new();
        for parent in self.resolver.parents(id)? {
            candidates.push((parent, RelationKind::Parent, parent_edges.get(&parent).copied()));
        }
        for child in self.resolver.children(id)? {
            candidates.push((child, RelationKind::Child, child_edges.get(&child).copied()));
        }
        for partner in self.resolver.partners(id)? {
            candidates.push((partner.person, RelationKind::Partner, partner.relation));
        }
        for sibling in self.resolver.siblings(id)? {
            candidates.push((sibling, RelationKind::Sibling, None));
        }

        // Candidates arrive in priority order, so the first entry per person wins
        let mut assigned: HashMap<PersonId, (RelationKind, Option<EdgeId>)> = HashMap::new();
        for (person, kind, relation) in candidates {
            if person == id {
                continue;
            }
            assigned.entry(person).or_insert((kind, relation));
        }

        let mut relations = Vec::with_capacity(assigned.len());
        for (person_id, (kind, relation)) in assigned {
            let person = store.person(person_id)?;
            relations.push(ClassifiedRelation {
                person: person_id,
                kind,
                ordering_key: person.birth_key(),
                relation,
                family: self.family_of(person),
            });
        }

        relations.sort_by_cached_key(|relation| {
            let name = store
                .person(relation.person)
                .map(Person::display_name)
                .unwrap_or_default();
            (
                relation.ordering_key.is_none(),
                relation.ordering_key,
                name,
                relation.person,
            )
        });

        debug!("Classified {} relatives of person {}", relations.len(), id);
        Ok(relations)
    }

    /// Everyone whose last or married name matches `surname`
    pub fn family_members(&self, surname: &str) -> Vec<PersonId> {
        let mut members: Vec<&Person> = self
            .resolver
            .store()
            .persons()
            .filter(|person| person.belongs_to_family(surname))
            .collect();

        members.sort_by_cached_key(|person| {
            let key = person.birth_key();
            (key.is_none(), key, person.display_name(), person.id)
        });
        members.into_iter().map(|person| person.id).collect()
    }

    fn family_of(&self, person: &Person) -> Option<String> {
        self.families
            .iter()
            .find(|family| person.belongs_to_family(family))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FamilyError;
    use crate::types::{PartialDate, RelationEdge};
    use std::collections::HashSet;

    fn create_test_store() -> RelationStore {
        let persons = vec![
            Person::new(1, "Jan", "Smith").born(PartialDate::year(1900)),
            Person::new(2, "Marie", "Jansen").born(PartialDate::year(1902)),
            Person::new(3, "Kees", "Smith").born(PartialDate::ymd(1930, 4, 1)),
            Person::new(4, "Anna", "Smith").born(PartialDate::ymd(1930, 2, 1)),
            Person::new(5, "Bram", "Smith"),
            Person::new(6, "Lies", "De Vries").born(PartialDate::year(1932)),
            Person::new(7, "Tom", "Smith").born(PartialDate::year(1960)),
        ];
        let edges = vec![
            RelationEdge::parent(1, 3),
            RelationEdge::parent(2, 3),
            RelationEdge::parent(1, 4),
            RelationEdge::parent(2, 4),
            RelationEdge::parent(1, 5),
            RelationEdge::partner(3, 6),
            RelationEdge::parent(3, 7),
            RelationEdge::parent(6, 7),
        ];
        RelationStore::build(persons, edges).unwrap()
    }

    #[test]
    fn test_classify_assigns_kinds_and_order() {
        let store = create_test_store();
        let classifier = FamilyClassifier::new(&store);
        let relations = classifier.classify(PersonId(3)).unwrap();

        let summary: Vec<(u64, RelationKind)> = relations
            .iter()
            .map(|relation| (relation.person.0, relation.kind))
            .collect();
        assert_eq!(
            summary,
            vec![
                (1, RelationKind::Parent),
                (2, RelationKind::Parent),
                (4, RelationKind::Sibling),
                (6, RelationKind::Partner),
                (7, RelationKind::Child),
                (5, RelationKind::Sibling),
            ]
        );
    }

    #[test]
    fn test_classify_keeps_explicit_relation_ids() {
        let store = create_test_store();
        let classifier = FamilyClassifier::new(&store);
        let relations = classifier.classify(PersonId(3)).unwrap();

        let partner = relations.iter().find(|r| r.person == PersonId(6)).unwrap();
        assert_eq!(partner.relation, Some(EdgeId(5)));
        let father = relations.iter().find(|r| r.person == PersonId(1)).unwrap();
        assert_eq!(father.relation, Some(EdgeId(0)));
        let sibling = relations.iter().find(|r| r.person == PersonId(4)).unwrap();
        assert_eq!(sibling.relation, None);
    }

    #[test]
    fn test_partner_wins_over_sibling() {
        // Data error: two siblings recorded as partners
        let store = RelationStore::build(
            vec![
                Person::new(1, "Parent", "Smith"),
                Person::new(2, "Anna", "Smith"),
                Person::new(3, "Bram", "Smith"),
            ],
            vec![
                RelationEdge::parent(1, 2),
                RelationEdge::parent(1, 3),
                RelationEdge::partner(2, 3),
            ],
        )
        .unwrap();
        let relations = FamilyClassifier::new(&store).classify(PersonId(2)).unwrap();

        let bram: Vec<_> = relations.iter().filter(|r| r.person == PersonId(3)).collect();
        assert_eq!(bram.len(), 1);
        assert_eq!(bram[0].kind, RelationKind::Partner);
    }

    #[test]
    fn test_parent_wins_over_partner() {
        let store = RelationStore::build(
            vec![Person::new(1, "A", "Smith"), Person::new(2, "B", "Smith")],
            vec![RelationEdge::parent(1, 2), RelationEdge::partner(1, 2)],
        )
        .unwrap();
        let relations = FamilyClassifier::new(&store).classify(PersonId(2)).unwrap();

        assert_eq!(relations.len(), 1);
        assert_eq!(relations[0].kind, RelationKind::Parent);
    }

    #[test]
    fn test_one_kind_per_person() {
        let store = create_test_store();
        let classifier = FamilyClassifier::new(&store);

        for person in store.persons() {
            let relations = classifier.classify(person.id).unwrap();
            let unique: HashSet<PersonId> = relations.iter().map(|r| r.person).collect();
            assert_eq!(unique.len(), relations.len());
            assert!(!unique.contains(&person.id));
        }
    }

    #[test]
    fn test_family_tagging() {
        let store = create_test_store();
        let classifier = FamilyClassifier::new(&store)
            .with_families(vec!["De Vries".to_string(), "Smith".to_string()]);
        let relations = classifier.classify(PersonId(3)).unwrap();

        let mother = relations.iter().find(|r| r.person == PersonId(2)).unwrap();
        assert_eq!(mother.family, None);
        let partner = relations.iter().find(|r| r.person == PersonId(6)).unwrap();
        assert_eq!(partner.family.as_deref(), Some("De Vries"));
        let father = relations.iter().find(|r| r.person == PersonId(1)).unwrap();
        assert_eq!(father.family.as_deref(), Some("Smith"));
    }

    #[test]
    fn test_family_members() {
        let store = create_test_store();
        let classifier = FamilyClassifier::new(&store);

        assert_eq!(
            classifier.family_members("smith"),
            vec![PersonId(1), PersonId(4), PersonId(3), PersonId(7), PersonId(5)]
        );
        assert!(classifier.family_members("Unknown").is_empty());
    }

    #[test]
    fn test_unknown_person() {
        let store = create_test_store();
        let result = FamilyClassifier::new(&store).classify(PersonId(42));
        assert!(matches!(result, Err(FamilyError::NotFound(PersonId(42)))));
    }
}
