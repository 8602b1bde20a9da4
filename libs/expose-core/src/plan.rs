//! Store-agnostic query projection plans.
//!
//! A plan says "select these scalar fields, left-join these associations,
//! recurse" without naming any query language. A relational query builder
//! consumes it through the [`ProjectionSink`] visitor; instructions arrive
//! in the exact order the resolver emitted them.

use sha2::{Digest, Sha256};

/// Reserved pseudo-field used to derive the root entity's alias.
pub const ROOT_FIELD: &str = "rt";

/// Deterministic, SQL-safe alias for an entity joined through `field`.
///
/// Lowercased entity stem plus a short content hash, so the same
/// (entity, field) pair aliases identically across requests while distinct
/// join paths to the same entity stay distinguishable.
pub fn join_alias(entity: &str, field: &str) -> String {
    let stem: String = entity
        .rsplit("::")
        .next()
        .unwrap_or(entity)
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_ascii_lowercase();

    let mut hasher = Sha256::new();
    hasher.update(entity.as_bytes());
    hasher.update(b".");
    hasher.update(field.as_bytes());
    let digest = hasher.finalize();
    let tag = hex::encode(&digest[..3]);

    if stem.is_empty() {
        format!("e_{tag}")
    } else {
        format!("{stem}_{tag}")
    }
}

/// One projection instruction at a given entity level.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProjectionOp {
    /// Project exactly these scalar fields on this level's alias.
    SelectScalars(Vec<String>),
    /// Left-join `association` and continue with the target's projection.
    /// A target with no ops of its own means "store default full row,
    /// one level", the shape a bare association expose produces.
    Join {
        association: String,
        target: EntityProjection,
    },
}

/// Projection of a single entity level: its alias and ordered instructions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityProjection {
    pub entity: String,
    pub alias: String,
    pub ops: Vec<ProjectionOp>,
}

impl EntityProjection {
    fn apply<S: ProjectionSink>(&self, sink: &mut S) {
        for op in &self.ops {
            match op {
                ProjectionOp::SelectScalars(fields) => sink.select_scalars(&self.alias, fields),
                ProjectionOp::Join {
                    association,
                    target,
                } => {
                    sink.left_join(&self.alias, association, &target.alias);
                    target.apply(sink);
                }
            }
        }
    }
}

/// Complete projection plan for a root entity. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProjectionPlan {
    pub root: EntityProjection,
}

impl ProjectionPlan {
    /// An empty plan defers to the store's default full-row behavior.
    pub fn is_empty(&self) -> bool {
        self.root.ops.is_empty()
    }

    /// Walk the plan depth-first in emission order, feeding each
    /// instruction to `sink`.
    pub fn apply<S: ProjectionSink>(&self, sink: &mut S) {
        self.root.apply(sink);
    }
}

/// The seam to the query-building collaborator. Implement this for your
/// store's query builder and pass it to [`ProjectionPlan::apply`].
pub trait ProjectionSink {
    fn select_scalars(&mut self, alias: &str, fields: &[String]);

    fn left_join(&mut self, parent_alias: &str, association: &str, alias: &str);
}
