use fmly_tree::config::LayoutSettings;
use fmly_tree::error::{FamilyError, LayoutWarning};
use fmly_tree::graph::{FamilyClassifier, RelationResolver, RelationStore};
use fmly_tree::layout::{LayoutSerializer, NodeRef, OutputFormat, PairKey, TreeLayoutBuilder};
use fmly_tree::snapshot::FamilySnapshot;
use fmly_tree::types::{Gender, PartialDate, Person, PersonId, RelationEdge, RelationKind};
use std::collections::HashSet;

const JACOB: u64 = 1;
const LEA: u64 = 2;
const RACHEL: u64 = 3;
const RUBEN: u64 = 4;
const JOZEF: u64 = 5;
const EFRAIM: u64 = 6;
const MANASSE: u64 = 7;
const ASNAT: u64 = 8;

fn ids(raw: &[u64]) -> Vec<PersonId> {
    raw.iter().map(|&id| PersonId(id)).collect()
}

fn jacob_family() -> (Vec<Person>, Vec<RelationEdge>) {
    let persons = vec![
        Person::new(JACOB, "Jacob", "Israel").with_gender(Gender::Male),
        Person::new(LEA, "Lea", "Israel").with_gender(Gender::Female),
        Person::new(RACHEL, "Rachel", "Israel").with_gender(Gender::Female),
        Person::new(RUBEN, "Ruben", "Israel").with_gender(Gender::Male),
        Person::new(JOZEF, "Jozef", "Israel").with_gender(Gender::Male),
        Person::new(EFRAIM, "Efraim", "Israel"),
        Person::new(MANASSE, "Manasse", "Israel"),
        Person::new(ASNAT, "Asnat", "Potifera").with_gender(Gender::Female),
    ];
    let edges = vec![
        RelationEdge::parent(JACOB, RUBEN),
        RelationEdge::parent(LEA, RUBEN),
        RelationEdge::parent(JACOB, JOZEF),
        RelationEdge::parent(RACHEL, JOZEF),
        RelationEdge::parent(JOZEF, EFRAIM),
        RelationEdge::parent(JOZEF, MANASSE),
        RelationEdge::parent(ASNAT, MANASSE),
        RelationEdge::partner(ASNAT, JOZEF),
    ];
    (persons, edges)
}

fn jacob_store() -> RelationStore {
    let (persons, edges) = jacob_family();
    RelationStore::build(persons, edges).unwrap()
}

#[test]
fn test_jacob_family_relations() {
    let store = jacob_store();
    let resolver = RelationResolver::new(&store);

    assert_eq!(resolver.children(PersonId(JACOB)).unwrap(), ids(&[RUBEN, JOZEF]));
    assert_eq!(resolver.partner_ids(PersonId(JACOB)).unwrap(), ids(&[LEA, RACHEL]));
    assert_eq!(resolver.parents(PersonId(RUBEN)).unwrap(), ids(&[JACOB, LEA]));
    assert_eq!(resolver.siblings(PersonId(RUBEN)).unwrap(), ids(&[JOZEF]));
    assert_eq!(resolver.siblings(PersonId(EFRAIM)).unwrap(), ids(&[MANASSE]));
    assert_eq!(resolver.children(PersonId(JOZEF)).unwrap(), ids(&[EFRAIM, MANASSE]));
    assert!(resolver.parents(PersonId(JACOB)).unwrap().is_empty());
}

#[test]
fn test_parent_child_inverse_consistency() {
    let store = jacob_store();
    let resolver = RelationResolver::new(&store);

    for person in store.persons() {
        for child in resolver.children(person.id).unwrap() {
            assert!(resolver.parents(child).unwrap().contains(&person.id));
        }
        for parent in resolver.parents(person.id).unwrap() {
            assert!(resolver.children(parent).unwrap().contains(&person.id));
        }
    }
}

#[test]
fn test_partner_and_sibling_symmetry() {
    let store = jacob_store();
    let resolver = RelationResolver::new(&store);

    for person in store.persons() {
        for partner in resolver.partner_ids(person.id).unwrap() {
            assert!(
                resolver.partner_ids(partner).unwrap().contains(&person.id),
                "{} lists {} as partner but not the reverse",
                person.id,
                partner
            );
        }
        for sibling in resolver.siblings(person.id).unwrap() {
            assert!(resolver.siblings(sibling).unwrap().contains(&person.id));
        }
    }
}

#[test]
fn test_no_person_is_related_to_themselves() {
    let store = jacob_store();
    let resolver = RelationResolver::new(&store);

    for person in store.persons() {
        let id = person.id;
        assert!(!resolver.parents(id).unwrap().contains(&id));
        assert!(!resolver.children(id).unwrap().contains(&id));
        assert!(!resolver.partner_ids(id).unwrap().contains(&id));
        assert!(!resolver.siblings(id).unwrap().contains(&id));
    }

    let result = RelationStore::build(
        vec![Person::new(1, "Solo", "Smith")],
        vec![RelationEdge::partner(1, 1)],
    );
    assert!(matches!(result, Err(FamilyError::InvalidEdge { .. })));
}

#[test]
fn test_classify_assigns_one_kind_per_person() {
    let store = jacob_store();
    let classifier = FamilyClassifier::new(&store);

    for person in store.persons() {
        let relations = classifier.classify(person.id).unwrap();
        let unique: HashSet<PersonId> = relations.iter().map(|r| r.person).collect();
        assert_eq!(unique.len(), relations.len());
        assert!(!unique.contains(&person.id));
    }

    // Jozef: parents first, then children, then his partner, then his brother
    let relations = classifier.classify(PersonId(JOZEF)).unwrap();
    let kind_of = |id: u64| {
        relations
            .iter()
            .find(|r| r.person == PersonId(id))
            .map(|r| r.kind)
    };
    assert_eq!(kind_of(JACOB), Some(RelationKind::Parent));
    assert_eq!(kind_of(RACHEL), Some(RelationKind::Parent));
    assert_eq!(kind_of(EFRAIM), Some(RelationKind::Child));
    assert_eq!(kind_of(ASNAT), Some(RelationKind::Partner));
    assert_eq!(kind_of(RUBEN), Some(RelationKind::Sibling));
    assert_eq!(kind_of(LEA), None);
}

#[test]
fn test_inferred_partner_without_partner_edge() {
    let store = RelationStore::build(
        vec![
            Person::new(1, "Piet", "Smith"),
            Person::new(2, "Greet", "Smith"),
            Person::new(3, "Kind", "Smith"),
        ],
        vec![RelationEdge::parent(1, 3), RelationEdge::parent(2, 3)],
    )
    .unwrap();
    let resolver = RelationResolver::new(&store);

    assert_eq!(resolver.inferred_partners(PersonId(1)).unwrap(), ids(&[2]));
    let partners = resolver.partners(PersonId(1)).unwrap();
    assert_eq!(partners.len(), 1);
    assert!(partners[0].is_inferred());
}

#[test]
fn test_ancestor_cycle_still_produces_tree() {
    let persons = vec![
        Person::new(1, "Grandparent", "Loop"),
        Person::new(2, "Parent", "Loop"),
        Person::new(3, "Child", "Loop"),
    ];
    let edges = vec![
        RelationEdge::parent(1, 2),
        RelationEdge::parent(2, 3),
        RelationEdge::parent(3, 1),
    ];
    let settings = LayoutSettings::default();

    let layout = TreeLayoutBuilder::from_snapshot(persons, edges, &settings, PersonId(1)).unwrap();

    assert!(!layout.nodes.is_empty());
    assert!(layout.has_cycle());
    let dot = LayoutSerializer::new(&settings)
        .serialize(&layout, OutputFormat::Dot)
        .unwrap();
    assert!(dot.starts_with("digraph G {"));
    assert!(dot.ends_with("}\n"));
}

#[test]
fn test_dangling_reference_is_skipped() {
    let snapshot = FamilySnapshot::from_json(
        r#"{
            "persons": [
                {"id": 1, "first_names": "Anna", "last_name": "Smith", "gender": "f"},
                {"id": 2, "first_names": "Bram", "last_name": "Smith", "gender": "m"}
            ],
            "relations": [
                {"up": 1, "down": 2, "type": "parent"},
                {"up": 1, "down": 404, "type": "parent"}
            ]
        }"#,
    )
    .unwrap();
    let settings = LayoutSettings::default();

    assert!(matches!(
        snapshot.clone().into_store(),
        Err(FamilyError::InvalidEdge { .. })
    ));

    let layout = TreeLayoutBuilder::from_snapshot(
        snapshot.persons,
        snapshot.relations,
        &settings,
        PersonId(1),
    )
    .unwrap();

    assert_eq!(layout.nodes.len(), 2);
    assert!(matches!(
        layout.warnings.as_slice(),
        [LayoutWarning::DanglingReference {
            missing: PersonId(404),
            ..
        }]
    ));
    assert!(layout
        .child_edges()
        .all(|edge| edge.to != NodeRef::Person(PersonId(404))));
}

#[test]
fn test_full_siblings_listed_once() {
    let persons = vec![
        Person::new(1, "Vader", "Smith"),
        Person::new(2, "Moeder", "Smith"),
        Person::new(3, "Eerste", "Smith").born(PartialDate::year(1950)),
        Person::new(4, "Tweede", "Smith").born(PartialDate::year(1952)),
    ];
    let edges = vec![
        RelationEdge::parent(1, 3),
        RelationEdge::parent(2, 3),
        RelationEdge::parent(1, 4),
        RelationEdge::parent(2, 4),
    ];
    let store = RelationStore::build(persons, edges).unwrap();
    let resolver = RelationResolver::new(&store);

    assert_eq!(resolver.siblings(PersonId(3)).unwrap(), ids(&[4]));
    assert_eq!(resolver.siblings(PersonId(4)).unwrap(), ids(&[3]));
}

#[test]
fn test_serialize_is_deterministic() {
    let settings = LayoutSettings::default();
    let serializer = LayoutSerializer::new(&settings);

    let render = || {
        let (persons, edges) = jacob_family();
        let layout =
            TreeLayoutBuilder::from_snapshot(persons, edges, &settings, PersonId(JACOB)).unwrap();
        (
            serializer.serialize(&layout, OutputFormat::Dot).unwrap(),
            serializer.serialize(&layout, OutputFormat::Json).unwrap(),
        )
    };

    let first = render();
    let second = render();
    assert_eq!(first, second);
}

#[test]
fn test_jacob_tree_layout() {
    let store = jacob_store();
    let settings = LayoutSettings::default();
    let layout = TreeLayoutBuilder::new(&store, &settings)
        .build(PersonId(JACOB))
        .unwrap();

    assert!(!layout.is_partial());
    assert_eq!(layout.nodes.len(), 8);

    // Every child is hung below exactly one mountpoint
    for child in [RUBEN, JOZEF, EFRAIM, MANASSE] {
        let incoming = layout
            .child_edges()
            .filter(|edge| edge.to == NodeRef::Person(PersonId(child)))
            .count();
        assert_eq!(incoming, 1, "child {} has {} incoming edges", child, incoming);
    }

    let dot = LayoutSerializer::new(&settings)
        .serialize(&layout, OutputFormat::Dot)
        .unwrap();
    assert!(dot.contains("P1x2 -> P4;"));
    assert!(dot.contains("P1x3 -> P5;"));
    assert!(dot.contains("P5 -> P6;"));
    assert!(dot.contains("P5x8 -> P7;"));

    // Jacob's partners land on alternating sides of him
    let group = |key: PairKey| {
        layout
            .rank_groups
            .iter()
            .find(|group| group.key == key)
            .map(|group| group.members.clone())
            .unwrap()
    };
    assert_eq!(
        group(PairKey::couple(PersonId(JACOB), PersonId(LEA))),
        vec![
            NodeRef::Person(PersonId(JACOB)),
            NodeRef::Couple(PersonId(JACOB), PersonId(LEA)),
            NodeRef::Person(PersonId(LEA)),
        ]
    );
    assert_eq!(
        group(PairKey::couple(PersonId(JACOB), PersonId(RACHEL))),
        vec![
            NodeRef::Person(PersonId(RACHEL)),
            NodeRef::Couple(PersonId(JACOB), PersonId(RACHEL)),
            NodeRef::Person(PersonId(JACOB)),
        ]
    );
}
