//! Expose resolution for REST APIs over relational entities.
//!
//! Given a client-declared selection tree and an entity-relationship
//! schema, this crate builds a minimal store-agnostic projection plan,
//! tracks the identifier fields injected to keep partial queries valid,
//! and strips them back out of the nested result data before it leaves
//! the server.
//!
//! Everything here is synchronous and stateless across calls: selection
//! trees, synthetic maps and plans are per-request values. HTTP concerns
//! (representation negotiation, expose-string parsing) live in
//! `expose-http`.

pub mod plan;
pub mod resolve;
pub mod schema;
pub mod selection;
pub mod shape;

pub use plan::{join_alias, EntityProjection, ProjectionOp, ProjectionPlan, ProjectionSink};
pub use resolve::{
    FieldPolicy, Resolved, ResolveError, ResolveOptions, Resolver, SyntheticFields,
};
pub use schema::{
    Association, Cardinality, EntityDef, EntitySchema, SchemaError, SchemaRegistry,
    SchemaRegistryBuilder,
};
pub use selection::{SelectionNode, SelectionTree};
pub use shape::{shape, EntityAliases, Envelope, ResourceKind};
