//! End-to-end: resolve a selection, pretend the store executed the plan,
//! shape the raw rows, and check that synthetic identifiers never leak.

use expose_core::{
    shape, EntityAliases, EntityDef, ProjectionSink, ResourceKind, Resolver, SchemaRegistry,
    SelectionTree,
};
use serde_json::json;

fn library_schema() -> SchemaRegistry {
    SchemaRegistry::builder()
        .entity(
            "Book",
            EntityDef::new()
                .identifier("id")
                .scalar("title")
                .scalar("year")
                .to_one("author", "Author")
                .to_many("chapters", "Chapter"),
        )
        .entity(
            "Author",
            EntityDef::new().identifier("authorId").scalar("name"),
        )
        .entity(
            "Chapter",
            EntityDef::new().identifier("id").scalar("heading"),
        )
        .build()
        .unwrap()
}

/// Collects the plan as text lines, the way a SQL builder would consume it.
#[derive(Default)]
struct DraftQuery {
    lines: Vec<String>,
}

impl ProjectionSink for DraftQuery {
    fn select_scalars(&mut self, alias: &str, fields: &[String]) {
        self.lines
            .push(format!("partial {alias}.{{{}}}", fields.join(", ")));
    }

    fn left_join(&mut self, parent_alias: &str, association: &str, alias: &str) {
        self.lines
            .push(format!("left join {parent_alias}.{association} {alias}"));
    }
}

#[test]
fn selection_to_envelope_round_trip() {
    let schema = library_schema();
    let tree = SelectionTree::new()
        .with_field("title")
        .with_tree("author", SelectionTree::new().with_field("name"));

    let resolved = Resolver::new(&schema).resolve(&tree, "Book").unwrap();

    // The plan is consumable by a query builder and projects identifiers
    // at both levels.
    let mut draft = DraftQuery::default();
    resolved.plan.apply(&mut draft);
    assert_eq!(draft.lines.len(), 3);
    assert!(draft.lines[0].contains("title, id"));
    assert!(draft.lines[1].starts_with("left join"));
    assert!(draft.lines[2].contains("name, authorId"));

    // What the store would hand back for that plan.
    let raw = json!({
        "title": "x",
        "id": 1,
        "author": {"name": "y", "authorId": 2}
    });

    let envelope = shape(
        raw,
        &resolved.synthetic,
        ResourceKind::Item,
        &EntityAliases::new("book", "books"),
        None,
    );

    assert_eq!(envelope.key(), "book");
    assert_eq!(envelope.data(), &json!({"title": "x", "author": {"name": "y"}}));
}

#[test]
fn collection_round_trip_keeps_only_requested_fields() {
    let schema = library_schema();
    let tree = SelectionTree::new()
        .with_field("title")
        .with_tree("chapters", SelectionTree::new().with_field("heading"));

    let resolved = Resolver::new(&schema).resolve(&tree, "Book").unwrap();

    let raw = json!([
        {
            "title": "a",
            "id": 1,
            "chapters": [
                {"heading": "one", "id": 10},
                {"heading": "two", "id": 11}
            ]
        },
        {
            "title": "b",
            "id": 2,
            "chapters": []
        }
    ]);

    let envelope = shape(
        raw,
        &resolved.synthetic,
        ResourceKind::Collection,
        &EntityAliases::new("book", "books"),
        None,
    );

    assert_eq!(envelope.key(), "books");
    assert_eq!(
        envelope.data(),
        &json!([
            {"title": "a", "chapters": [{"heading": "one"}, {"heading": "two"}]},
            {"title": "b", "chapters": []}
        ])
    );
}

#[test]
fn merged_route_selections_resolve_like_a_single_tree() {
    let schema = library_schema();

    let mut merged = SelectionTree::new().with_field("title");
    merged.merge(SelectionTree::new().with_tree(
        "author",
        SelectionTree::new().with_field("name"),
    ));
    merged.merge(SelectionTree::new().with_field("year"));

    let direct = SelectionTree::new()
        .with_field("title")
        .with_tree("author", SelectionTree::new().with_field("name"))
        .with_field("year");

    let resolver = Resolver::new(&schema);
    let from_merge = resolver.resolve(&merged, "Book").unwrap();
    let from_direct = resolver.resolve(&direct, "Book").unwrap();

    assert_eq!(from_merge.plan, from_direct.plan);
    assert_eq!(from_merge.synthetic, from_direct.synthetic);
}

#[test]
fn empty_selection_defers_to_the_store() {
    let schema = library_schema();
    let resolved = Resolver::new(&schema)
        .resolve(&SelectionTree::new(), "Book")
        .unwrap();

    assert!(resolved.plan.is_empty());

    let mut draft = DraftQuery::default();
    resolved.plan.apply(&mut draft);
    assert!(draft.lines.is_empty());

    // Full rows come back; nothing is synthetic, nothing is stripped.
    let raw = json!([{"id": 1, "title": "a", "year": 1969}]);
    let envelope = shape(
        raw.clone(),
        &resolved.synthetic,
        ResourceKind::Collection,
        &EntityAliases::new("book", "books"),
        None,
    );
    assert_eq!(envelope.data(), &raw);
}
