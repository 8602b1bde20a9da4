//! Read-only entity-relationship schema descriptors.
//!
//! The engine never reflects over live entities. A [`SchemaRegistry`] is
//! built once at startup, validated, and frozen; every request thereafter
//! queries it read-only through the [`EntitySchema`] trait.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Cardinality of an association as declared by the ORM mapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cardinality {
    ToOne,
    ToMany,
}

/// A relation from one entity to another, keyed by field name on the
/// owning entity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Association {
    pub target: String,
    pub cardinality: Cardinality,
}

/// Per-entity descriptor: scalar fields, identifier fields (ordered), and
/// associations (ordered). Built with the chained methods below or
/// deserialized from configuration; either way validated by
/// [`SchemaRegistryBuilder::build`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityDef {
    scalars: IndexSet<String>,
    identifiers: Vec<String>,
    associations: IndexMap<String, Association>,
}

impl EntityDef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scalar(mut self, name: impl Into<String>) -> Self {
        self.scalars.insert(name.into());
        self
    }

    /// Declare an identifier field. Identifiers are scalar fields, so the
    /// name is added to the scalar set as well.
    pub fn identifier(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.scalars.insert(name.clone());
        self.identifiers.push(name);
        self
    }

    pub fn to_one(mut self, field: impl Into<String>, target: impl Into<String>) -> Self {
        self.associations.insert(
            field.into(),
            Association {
                target: target.into(),
                cardinality: Cardinality::ToOne,
            },
        );
        self
    }

    pub fn to_many(mut self, field: impl Into<String>, target: impl Into<String>) -> Self {
        self.associations.insert(
            field.into(),
            Association {
                target: target.into(),
                cardinality: Cardinality::ToMany,
            },
        );
        self
    }

    pub fn scalars(&self) -> &IndexSet<String> {
        &self.scalars
    }

    pub fn identifiers(&self) -> &[String] {
        &self.identifiers
    }

    pub fn associations(&self) -> &IndexMap<String, Association> {
        &self.associations
    }
}

/// Read-only view over an entity-relationship schema.
///
/// All three lookups return `None` for an entity the schema does not know;
/// the resolver surfaces that as a configuration error.
pub trait EntitySchema {
    fn scalar_fields(&self, entity: &str) -> Option<&IndexSet<String>>;

    fn associations(&self, entity: &str) -> Option<&IndexMap<String, Association>>;

    /// Identifier field names in declaration order.
    fn identifier_fields(&self, entity: &str) -> Option<&[String]>;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("duplicate entity definition: {0}")]
    DuplicateEntity(String),

    #[error("association {entity}.{field} targets unknown entity {target}")]
    UnknownAssociationTarget {
        entity: String,
        field: String,
        target: String,
    },

    #[error("identifier {entity}.{field} is not a scalar field of the entity")]
    IdentifierNotScalar { entity: String, field: String },

    #[error("entity {0} declares no identifier fields")]
    NoIdentifiers(String),
}

/// Immutable, validated entity schema. Cheap to share behind an `Arc`;
/// never mutated after [`SchemaRegistryBuilder::build`].
#[derive(Clone, Debug, Default)]
pub struct SchemaRegistry {
    entities: IndexMap<String, EntityDef>,
}

impl SchemaRegistry {
    pub fn builder() -> SchemaRegistryBuilder {
        SchemaRegistryBuilder::default()
    }

    pub fn entity(&self, name: &str) -> Option<&EntityDef> {
        self.entities.get(name)
    }
}

impl EntitySchema for SchemaRegistry {
    fn scalar_fields(&self, entity: &str) -> Option<&IndexSet<String>> {
        self.entity(entity).map(EntityDef::scalars)
    }

    fn associations(&self, entity: &str) -> Option<&IndexMap<String, Association>> {
        self.entity(entity).map(EntityDef::associations)
    }

    fn identifier_fields(&self, entity: &str) -> Option<&[String]> {
        self.entity(entity).map(EntityDef::identifiers)
    }
}

/// Collects entity definitions, then validates and freezes them.
///
/// Validation runs at startup so that a dangling association target or a
/// non-scalar identifier is a configuration error, not a per-request
/// surprise.
#[derive(Debug, Default)]
pub struct SchemaRegistryBuilder {
    entities: IndexMap<String, EntityDef>,
    duplicate: Option<String>,
}

impl SchemaRegistryBuilder {
    pub fn entity(mut self, name: impl Into<String>, def: EntityDef) -> Self {
        let name = name.into();
        if self.entities.contains_key(&name) && self.duplicate.is_none() {
            self.duplicate = Some(name.clone());
        }
        self.entities.insert(name, def);
        self
    }

    pub fn build(self) -> Result<SchemaRegistry, SchemaError> {
        if let Some(name) = self.duplicate {
            return Err(SchemaError::DuplicateEntity(name));
        }
        for (name, def) in &self.entities {
            if def.identifiers.is_empty() {
                return Err(SchemaError::NoIdentifiers(name.clone()));
            }
            for id in &def.identifiers {
                if !def.scalars.contains(id) {
                    return Err(SchemaError::IdentifierNotScalar {
                        entity: name.clone(),
                        field: id.clone(),
                    });
                }
            }
            for (field, assoc) in &def.associations {
                if !self.entities.contains_key(&assoc.target) {
                    return Err(SchemaError::UnknownAssociationTarget {
                        entity: name.clone(),
                        field: field.clone(),
                        target: assoc.target.clone(),
                    });
                }
            }
        }
        Ok(SchemaRegistry {
            entities: self.entities,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book() -> EntityDef {
        EntityDef::new()
            .identifier("id")
            .scalar("title")
            .to_one("author", "Author")
    }

    fn author() -> EntityDef {
        EntityDef::new().identifier("authorId").scalar("name")
    }

    #[test]
    fn builds_and_introspects() {
        let schema = SchemaRegistry::builder()
            .entity("Book", book())
            .entity("Author", author())
            .build()
            .unwrap();

        let scalars = schema.scalar_fields("Book").unwrap();
        assert!(scalars.contains("id"));
        assert!(scalars.contains("title"));

        let assocs = schema.associations("Book").unwrap();
        assert_eq!(assocs["author"].target, "Author");
        assert_eq!(assocs["author"].cardinality, Cardinality::ToOne);

        assert_eq!(schema.identifier_fields("Author").unwrap(), ["authorId"]);
        assert!(schema.scalar_fields("Publisher").is_none());
    }

    #[test]
    fn rejects_dangling_association_target() {
        let err = SchemaRegistry::builder()
            .entity("Book", book())
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            SchemaError::UnknownAssociationTarget { ref target, .. } if target == "Author"
        ));
    }

    #[test]
    fn rejects_duplicate_entity() {
        let err = SchemaRegistry::builder()
            .entity("Author", author())
            .entity("Author", author())
            .build()
            .unwrap_err();
        assert_eq!(err, SchemaError::DuplicateEntity("Author".into()));
    }

    #[test]
    fn rejects_entity_without_identifiers() {
        let err = SchemaRegistry::builder()
            .entity("Tag", EntityDef::new().scalar("label"))
            .build()
            .unwrap_err();
        assert_eq!(err, SchemaError::NoIdentifiers("Tag".into()));
    }

    #[test]
    fn rejects_identifier_outside_scalar_set() {
        // bypass the builder methods via deserialization
        let def: EntityDef = serde_json::from_value(serde_json::json!({
            "scalars": ["name"],
            "identifiers": ["id"],
            "associations": {}
        }))
        .unwrap();
        let err = SchemaRegistry::builder()
            .entity("Tag", def)
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::IdentifierNotScalar { .. }));
    }
}
