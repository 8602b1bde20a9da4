//! Selection tree → projection plan resolution.
//!
//! Purely structural: walks the client's selection against the schema and
//! emits a plan plus the bookkeeping needed to undo identifier injection.
//! Every identifier an entity declares must ride along in any partial
//! projection of it; identifiers the client did not ask for are recorded
//! here and stripped again by the shaper.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

use crate::plan::{join_alias, EntityProjection, ProjectionOp, ProjectionPlan, ROOT_FIELD};
use crate::schema::{Association, EntitySchema};
use crate::selection::{SelectionNode, SelectionTree};

/// What to do with a selection entry the schema does not recognize.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldPolicy {
    /// Drop the entry silently. The historical behavior; lets clients
    /// over-ask without breaking.
    #[default]
    Permissive,
    /// Reject the whole resolution with [`ResolveError::UnknownField`],
    /// catching client typos early.
    Strict,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveOptions {
    pub unknown_fields: FieldPolicy,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// An association targets an entity the schema has no definition for.
    /// A configuration bug, surfaced immediately and never retried.
    #[error("no schema definition for entity: {0}")]
    UnknownEntity(String),

    /// Strict mode only: the selection names a field that is neither a
    /// scalar nor an association of the entity.
    #[error("unknown field {field} on entity {entity}")]
    UnknownField { entity: String, field: String },
}

/* ---------- synthetic field bookkeeping ---------- */

/// Per-level record of identifier fields injected to keep a partial
/// projection valid. Mirrors the selection tree's nesting; built during
/// resolution, consumed exactly once by the shaper, then discarded.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyntheticFields {
    fields: Vec<String>,
    children: IndexMap<String, SyntheticFields>,
}

impl SyntheticFields {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.children.is_empty()
    }

    /// Was `field` injected (rather than requested) at this level?
    pub fn contains(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }

    /// Injected field names at this level.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Bookkeeping for a nested association, if any was recorded.
    pub fn child(&self, association: &str) -> Option<&SyntheticFields> {
        self.children.get(association)
    }
}

/// Output of a resolution: the plan to hand to the query builder and the
/// synthetic map to hand to the shaper. Both are per-request values.
#[derive(Clone, Debug)]
pub struct Resolved {
    pub plan: ProjectionPlan,
    pub synthetic: SyntheticFields,
}

/* ---------- resolver ---------- */

/// Resolves selection trees against a schema. Stateless across calls;
/// borrow it freely from concurrent requests.
pub struct Resolver<'s, S: EntitySchema> {
    schema: &'s S,
    options: ResolveOptions,
}

impl<'s, S: EntitySchema> Resolver<'s, S> {
    pub fn new(schema: &'s S) -> Self {
        Self {
            schema,
            options: ResolveOptions::default(),
        }
    }

    pub fn with_options(schema: &'s S, options: ResolveOptions) -> Self {
        Self { schema, options }
    }

    /// Resolve `tree` for `root_entity`.
    ///
    /// An empty tree yields an empty plan: no projection instructions at
    /// all, deferring to the store's default full-row behavior.
    pub fn resolve(
        &self,
        tree: &SelectionTree,
        root_entity: &str,
    ) -> Result<Resolved, ResolveError> {
        let (ops, synthetic) = self.resolve_entity(tree, root_entity)?;
        Ok(Resolved {
            plan: ProjectionPlan {
                root: EntityProjection {
                    entity: root_entity.to_string(),
                    alias: join_alias(root_entity, ROOT_FIELD),
                    ops,
                },
            },
            synthetic,
        })
    }

    fn resolve_entity(
        &self,
        tree: &SelectionTree,
        entity: &str,
    ) -> Result<(Vec<ProjectionOp>, SyntheticFields), ResolveError> {
        if tree.is_empty() {
            return Ok((Vec::new(), SyntheticFields::default()));
        }

        let unknown_entity = || ResolveError::UnknownEntity(entity.to_string());
        let scalars = self.schema.scalar_fields(entity).ok_or_else(unknown_entity)?;
        let associations = self.schema.associations(entity).ok_or_else(unknown_entity)?;
        let identifiers = self
            .schema
            .identifier_fields(entity)
            .ok_or_else(unknown_entity)?;

        // Partition the selection. Order within each group follows the tree.
        let mut selected: Vec<String> = Vec::new();
        let mut bare: Vec<(&str, &Association)> = Vec::new();
        let mut nested: Vec<(&str, &SelectionTree, &Association)> = Vec::new();
        for (name, node) in tree.iter() {
            match node {
                SelectionNode::Field if scalars.contains(name) => selected.push(name.to_string()),
                SelectionNode::Field => match associations.get(name) {
                    Some(assoc) => bare.push((name, assoc)),
                    None => self.unknown(entity, name)?,
                },
                SelectionNode::Tree(sub) => match associations.get(name) {
                    Some(assoc) => nested.push((name, sub, assoc)),
                    None => self.unknown(entity, name)?,
                },
            }
        }

        // Identifiers missing from the selection ride along and are the
        // only candidates for later removal.
        let mut synthetic = SyntheticFields::default();
        let added: Vec<String> = identifiers
            .iter()
            .filter(|id| !selected.iter().any(|s| s == *id))
            .cloned()
            .collect();
        if !added.is_empty() {
            synthetic.fields = added.clone();
            selected.extend(added);
        }

        let mut ops = Vec::new();
        if !selected.is_empty() {
            ops.push(ProjectionOp::SelectScalars(selected));
        }

        // Bare associations: join the full target row, one level deep.
        // Nothing synthetic to record, so nothing gets stripped back out.
        for (name, assoc) in bare {
            ops.push(ProjectionOp::Join {
                association: name.to_string(),
                target: EntityProjection {
                    entity: assoc.target.clone(),
                    alias: join_alias(&assoc.target, name),
                    ops: Vec::new(),
                },
            });
        }

        // Restricted associations: join and recurse.
        for (name, sub, assoc) in nested {
            let (child_ops, child_synthetic) = self.resolve_entity(sub, &assoc.target)?;
            ops.push(ProjectionOp::Join {
                association: name.to_string(),
                target: EntityProjection {
                    entity: assoc.target.clone(),
                    alias: join_alias(&assoc.target, name),
                    ops: child_ops,
                },
            });
            if !child_synthetic.is_empty() {
                synthetic
                    .children
                    .insert(name.to_string(), child_synthetic);
            }
        }

        Ok((ops, synthetic))
    }

    fn unknown(&self, entity: &str, field: &str) -> Result<(), ResolveError> {
        match self.options.unknown_fields {
            FieldPolicy::Permissive => {
                trace!(entity, field, "dropping unknown expose field");
                Ok(())
            }
            FieldPolicy::Strict => Err(ResolveError::UnknownField {
                entity: entity.to_string(),
                field: field.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EntityDef, SchemaRegistry};

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

    fn scalar_ops(projection: &EntityProjection) -> Option<&[String]> {
        projection.ops.iter().find_map(|op| match op {
            ProjectionOp::SelectScalars(fields) => Some(fields.as_slice()),
            _ => None,
        })
    }

    fn join_target<'a>(projection: &'a EntityProjection, name: &str) -> &'a EntityProjection {
        projection
            .ops
            .iter()
            .find_map(|op| match op {
                ProjectionOp::Join {
                    association,
                    target,
                } if association == name => Some(target),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn injects_identifiers_and_records_them() {
        let schema = library_schema();
        let tree = SelectionTree::new()
            .with_field("title")
            .with_tree("author", SelectionTree::new().with_field("name"));

        let resolved = Resolver::new(&schema).resolve(&tree, "Book").unwrap();

        let root = &resolved.plan.root;
        assert_eq!(scalar_ops(root).unwrap(), ["title", "id"]);
        assert_eq!(resolved.synthetic.fields(), ["id"]);

        let author = join_target(root, "author");
        assert_eq!(scalar_ops(author).unwrap(), ["name", "authorId"]);
        let author_synthetic = resolved.synthetic.child("author").unwrap();
        assert_eq!(author_synthetic.fields(), ["authorId"]);
    }

    #[test]
    fn requested_identifier_is_not_synthetic() {
        let schema = library_schema();
        let tree = SelectionTree::new().with_field("id").with_field("title");

        let resolved = Resolver::new(&schema).resolve(&tree, "Book").unwrap();

        assert_eq!(scalar_ops(&resolved.plan.root).unwrap(), ["id", "title"]);
        assert!(resolved.synthetic.is_empty());
    }

    #[test]
    fn empty_tree_yields_empty_plan() {
        let schema = library_schema();
        let resolved = Resolver::new(&schema)
            .resolve(&SelectionTree::new(), "Book")
            .unwrap();
        assert!(resolved.plan.is_empty());
        assert!(resolved.synthetic.is_empty());
    }

    #[test]
    fn bare_association_joins_full_row() {
        let schema = library_schema();
        let tree = SelectionTree::new().with_field("title").with_field("author");

        let resolved = Resolver::new(&schema).resolve(&tree, "Book").unwrap();

        let author = join_target(&resolved.plan.root, "author");
        assert_eq!(author.entity, "Author");
        assert!(author.ops.is_empty());
        assert!(resolved.synthetic.child("author").is_none());
    }

    #[test]
    fn unknown_fields_drop_by_default() {
        let schema = library_schema();
        let tree = SelectionTree::new()
            .with_field("title")
            .with_field("isbn")
            .with_tree("publisher", SelectionTree::new().with_field("name"));

        let resolved = Resolver::new(&schema).resolve(&tree, "Book").unwrap();
        assert_eq!(scalar_ops(&resolved.plan.root).unwrap(), ["title", "id"]);
        assert_eq!(resolved.plan.root.ops.len(), 1);
    }

    #[test]
    fn unknown_fields_reject_in_strict_mode() {
        let schema = library_schema();
        let tree = SelectionTree::new().with_field("isbn");
        let resolver = Resolver::with_options(
            &schema,
            ResolveOptions {
                unknown_fields: FieldPolicy::Strict,
            },
        );

        let err = resolver.resolve(&tree, "Book").unwrap_err();
        assert_eq!(
            err,
            ResolveError::UnknownField {
                entity: "Book".into(),
                field: "isbn".into(),
            }
        );
    }

    #[test]
    fn unknown_root_entity_is_a_configuration_error() {
        let schema = library_schema();
        let tree = SelectionTree::new().with_field("title");
        let err = Resolver::new(&schema).resolve(&tree, "Magazine").unwrap_err();
        assert_eq!(err, ResolveError::UnknownEntity("Magazine".into()));
    }

    #[test]
    fn resolution_is_idempotent() {
        let schema = library_schema();
        let tree = SelectionTree::new()
            .with_field("title")
            .with_tree("chapters", SelectionTree::new().with_field("heading"))
            .with_field("author");

        let resolver = Resolver::new(&schema);
        let first = resolver.resolve(&tree, "Book").unwrap();
        let second = resolver.resolve(&tree, "Book").unwrap();

        assert_eq!(first.plan, second.plan);
        assert_eq!(first.synthetic, second.synthetic);
    }

    #[test]
    fn every_projected_entity_carries_its_identifiers() {
        let schema = library_schema();
        let tree = SelectionTree::new()
            .with_field("title")
            .with_tree(
                "chapters",
                SelectionTree::new().with_field("heading"),
            )
            .with_tree("author", SelectionTree::new().with_field("name"));

        let resolved = Resolver::new(&schema).resolve(&tree, "Book").unwrap();

        fn check(projection: &EntityProjection, schema: &SchemaRegistry) {
            if let Some(fields) = projection.ops.iter().find_map(|op| match op {
                ProjectionOp::SelectScalars(f) => Some(f),
                _ => None,
            }) {
                for id in schema.entity(&projection.entity).unwrap().identifiers() {
                    assert!(
                        fields.contains(id),
                        "{} projection is missing identifier {id}",
                        projection.entity
                    );
                }
            }
            for op in &projection.ops {
                if let ProjectionOp::Join { target, .. } = op {
                    check(target, schema);
                }
            }
        }
        check(&resolved.plan.root, &schema);
    }
}
