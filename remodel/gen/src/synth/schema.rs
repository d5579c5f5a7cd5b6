//! Schema conversion.
//!
//! Walks OpenAPI schemas and produces [`TypeRef`]s, registering a
//! [`ModelClassRecord`] for every component schema and for every inline
//! object or union that needs its own type.

use std::collections::{BTreeMap, BTreeSet};

use openapiv3::{
    AdditionalProperties, IntegerFormat, ObjectType, ReferenceOr, Schema, SchemaKind, Type,
    VariantOrUnknownOrEmpty,
};
use serde_json::Value;
use tracing::debug;

use super::location::SchemaLocation;
use super::records::{FieldRecord, IntegerWidth, ModelClassRecord, ModelKind, TypeRef};
use crate::document::ApiDocument;
use crate::errors::RemodelError;

/// A schema or a reference to one, boxed or not.
#[derive(Debug, Clone, Copy)]
pub(crate) enum SchemaRef<'a> {
    Reference(&'a str),
    Inline(&'a Schema),
}

impl<'a> From<&'a ReferenceOr<Schema>> for SchemaRef<'a> {
    fn from(value: &'a ReferenceOr<Schema>) -> Self {
        match value {
            ReferenceOr::Reference { reference } => Self::Reference(reference),
            ReferenceOr::Item(schema) => Self::Inline(schema),
        }
    }
}

impl<'a> From<&'a ReferenceOr<Box<Schema>>> for SchemaRef<'a> {
    fn from(value: &'a ReferenceOr<Box<Schema>>) -> Self {
        match value {
            ReferenceOr::Reference { reference } => Self::Reference(reference),
            ReferenceOr::Item(schema) => Self::Inline(schema),
        }
    }
}

impl SchemaRef<'_> {
    fn description(&self) -> Option<String> {
        match self {
            Self::Reference(_) => None,
            Self::Inline(schema) => schema.schema_data.description.clone(),
        }
    }
}

/// Converts schemas of one document, accumulating model records.
pub(crate) struct SchemaConverter<'d> {
    document: &'d ApiDocument,
    models: BTreeMap<String, ModelClassRecord>,
    /// Deep references currently being resolved.
    resolving: BTreeSet<SchemaLocation>,
}

impl<'d> SchemaConverter<'d> {
    pub(crate) fn new(document: &'d ApiDocument) -> Self {
        Self {
            document,
            models: BTreeMap::new(),
            resolving: BTreeSet::new(),
        }
    }

    pub(crate) fn api(&self) -> &str {
        &self.document.api
    }

    pub(crate) fn document(&self) -> &'d ApiDocument {
        self.document
    }

    pub(crate) fn into_models(self) -> BTreeMap<String, ModelClassRecord> {
        self.models
    }

    fn unsupported(&self, location: &SchemaLocation, construct: impl Into<String>) -> RemodelError {
        RemodelError::unsupported(self.api(), location.to_string(), construct)
    }

    fn unresolved(&self, reference: &str, reason: &str) -> RemodelError {
        RemodelError::DocumentParse {
            api: self.api().to_string(),
            origin: self.document.origin.clone(),
            reason: format!("cannot resolve reference `{reference}`: {reason}"),
        }
    }

    /// Registers the component schema `name` as a model.
    ///
    /// Objects and unions become the model directly; any other shape becomes
    /// a type alias with the component's canonical name.
    pub(crate) fn component(&mut self, name: &str, schema: SchemaRef<'_>) -> Result<(), RemodelError> {
        let location = SchemaLocation::component(name);
        let canonical = location.canonical_name();
        let ty = self.type_of(schema, &location)?;
        if ty.direct_model() == Some(canonical.as_str()) {
            return Ok(());
        }
        let record = ModelClassRecord {
            canonical_name: canonical,
            current_name: location.default_type_name(),
            description: schema.description(),
            kind: ModelKind::Alias(ty),
        };
        self.register(record);
        Ok(())
    }

    /// Returns the type of a schema found at `location`.
    pub(crate) fn type_of(
        &mut self,
        schema: SchemaRef<'_>,
        location: &SchemaLocation,
    ) -> Result<TypeRef, RemodelError> {
        match schema {
            SchemaRef::Reference(reference) => self.reference_type(reference, location),
            SchemaRef::Inline(schema) => self.inline_type(schema, location),
        }
    }

    fn reference_type(&mut self, reference: &str, from: &SchemaLocation) -> Result<TypeRef, RemodelError> {
        let Some(target) = SchemaLocation::from_reference(reference) else {
            return Err(self.unsupported(from, format!("external reference `{reference}`")));
        };

        if let Some(name) = target.component_name() {
            let Some(component) = self
                .document
                .openapi
                .components
                .as_ref()
                .and_then(|components| components.schemas.get(name))
            else {
                return Err(self.unresolved(reference, "no such component schema"));
            };
            let ty = TypeRef::Model(name.to_string());
            return Ok(match component {
                ReferenceOr::Item(schema) if is_nullable_model(schema) => ty.optional(),
                _ => ty,
            });
        }

        // A deep reference resolves to the schema at its target location, so it
        // shares the canonical name of that inline schema.
        if !self.resolving.insert(target.clone()) {
            return Err(self.unsupported(from, format!("circular reference `{reference}`")));
        }
        let result = self.resolve_deep(reference, &target);
        self.resolving.remove(&target);
        result
    }

    fn resolve_deep(&mut self, reference: &str, target: &SchemaLocation) -> Result<TypeRef, RemodelError> {
        let raw = self
            .document
            .raw
            .pointer(&target.json_pointer())
            .cloned()
            .ok_or_else(|| self.unresolved(reference, "no such node"))?;
        let schema: ReferenceOr<Schema> = serde_json::from_value(raw)
            .map_err(|e| self.unresolved(reference, &format!("not a schema: {e}")))?;
        debug!(reference, "resolved deep reference");
        self.type_of(SchemaRef::from(&schema), target)
    }

    fn inline_type(&mut self, schema: &Schema, location: &SchemaLocation) -> Result<TypeRef, RemodelError> {
        let ty = match &schema.schema_kind {
            SchemaKind::Type(Type::String(_)) => TypeRef::String,
            SchemaKind::Type(Type::Integer(integer)) => TypeRef::Integer(match integer.format {
                VariantOrUnknownOrEmpty::Item(IntegerFormat::Int32) => IntegerWidth::I32,
                _ => IntegerWidth::I64,
            }),
            SchemaKind::Type(Type::Number(_)) => TypeRef::Number,
            SchemaKind::Type(Type::Boolean(_)) => TypeRef::Boolean,
            SchemaKind::Type(Type::Array(array)) => {
                let items = match &array.items {
                    Some(items) => self.type_of(SchemaRef::from(items), &location.child("items"))?,
                    None => TypeRef::Any,
                };
                TypeRef::Sequence(Box::new(items))
            }
            SchemaKind::Type(Type::Object(object)) => self.object_type(schema, object, location)?,
            SchemaKind::OneOf { one_of } => self.union_type(schema, one_of, "oneOf", location)?,
            SchemaKind::AnyOf { any_of } => self.union_type(schema, any_of, "anyOf", location)?,
            SchemaKind::AllOf { all_of } => match all_of.as_slice() {
                [only] => self.type_of(SchemaRef::from(only), &location.child("allOf").child("0"))?,
                _ => return Err(self.unsupported(location, "allOf with multiple schemas")),
            },
            SchemaKind::Not { .. } => return Err(self.unsupported(location, "not")),
            SchemaKind::Any(_) => self.loose_type(schema, location)?,
        };

        Ok(if schema.schema_data.nullable {
            ty.optional()
        } else {
            ty
        })
    }

    /// Handles schemas without a `type` or with mixed keywords, which the
    /// OpenAPI parser reports as `SchemaKind::Any`.
    fn loose_type(&mut self, schema: &Schema, location: &SchemaLocation) -> Result<TypeRef, RemodelError> {
        let Ok(Value::Object(mut raw)) = serde_json::to_value(schema) else {
            return Ok(TypeRef::Any);
        };

        let has = |key: &str| match raw.get(key) {
            None | Some(Value::Null) => false,
            Some(Value::Array(items)) => !items.is_empty(),
            Some(Value::Object(entries)) => !entries.is_empty(),
            Some(_) => true,
        };

        if has("not") {
            return Err(self.unsupported(location, "not"));
        }
        if has("allOf") && has("properties") {
            return Err(self.unsupported(location, "allOf combined with properties"));
        }
        let normalized_type = if has("anyOf") || has("oneOf") {
            None
        } else if has("properties") || has("additionalProperties") {
            Some("object")
        } else if has("items") {
            Some("array")
        } else {
            return Ok(TypeRef::Any);
        };
        match normalized_type {
            Some(kind) => raw.insert("type".to_string(), Value::from(kind)),
            None => raw.remove("type"),
        };

        match serde_json::from_value::<Schema>(Value::Object(raw)) {
            Ok(normalized) if !matches!(normalized.schema_kind, SchemaKind::Any(_)) => {
                self.inline_type(&normalized, location)
            }
            _ => Ok(TypeRef::Any),
        }
    }

    fn object_type(
        &mut self,
        schema: &Schema,
        object: &ObjectType,
        location: &SchemaLocation,
    ) -> Result<TypeRef, RemodelError> {
        let additional = match &object.additional_properties {
            None | Some(AdditionalProperties::Any(false)) => None,
            Some(AdditionalProperties::Any(true)) => Some(TypeRef::Any),
            Some(AdditionalProperties::Schema(inner)) => Some(self.type_of(
                SchemaRef::from(&**inner),
                &location.child("additionalProperties"),
            )?),
        };

        if object.properties.is_empty() {
            return Ok(TypeRef::Mapping(Box::new(additional.unwrap_or(TypeRef::Any))));
        }

        let mut fields = Vec::with_capacity(object.properties.len());
        for (name, property) in &object.properties {
            let property = SchemaRef::from(property);
            let ty = self.type_of(property, &location.child("properties").child(name.as_str()))?;
            fields.push(FieldRecord {
                name: name.clone(),
                ty,
                required: object.required.iter().any(|required| required == name),
                description: property.description(),
            });
        }
        fields.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(self.register(ModelClassRecord {
            canonical_name: location.canonical_name(),
            current_name: location.default_type_name(),
            description: schema.schema_data.description.clone(),
            kind: ModelKind::Struct { fields, additional },
        }))
    }

    fn union_type(
        &mut self,
        schema: &Schema,
        variants: &[ReferenceOr<Schema>],
        keyword: &str,
        location: &SchemaLocation,
    ) -> Result<TypeRef, RemodelError> {
        let mut members = Vec::with_capacity(variants.len());
        for (index, variant) in variants.iter().enumerate() {
            let member_location = location.child(keyword).child(index.to_string());
            members.push(self.type_of(SchemaRef::from(variant), &member_location)?);
        }

        match members.len() {
            0 => Err(self.unsupported(location, format!("empty {keyword}"))),
            1 => Ok(members.remove(0)),
            _ => Ok(self.register(ModelClassRecord {
                canonical_name: location.canonical_name(),
                current_name: location.default_type_name(),
                description: schema.schema_data.description.clone(),
                kind: ModelKind::Union(members),
            })),
        }
    }

    /// Records a model (first registration wins) and returns a reference to it.
    fn register(&mut self, record: ModelClassRecord) -> TypeRef {
        let canonical = record.canonical_name.clone();
        self.models.entry(canonical.clone()).or_insert(record);
        TypeRef::Model(canonical)
    }
}

/// Returns `true` when a nullable component becomes a model of its own.
///
/// The component keeps the model name, so references to it carry the
/// nullability. Nullable aliases already render as `Option`.
fn is_nullable_model(schema: &Schema) -> bool {
    if !schema.schema_data.nullable {
        return false;
    }
    match &schema.schema_kind {
        SchemaKind::Type(Type::Object(object)) => !object.properties.is_empty(),
        SchemaKind::OneOf { one_of } => one_of.len() > 1,
        SchemaKind::AnyOf { any_of } => any_of.len() > 1,
        SchemaKind::Any(any) => {
            !any.properties.is_empty() || any.one_of.len() > 1 || any.any_of.len() > 1
        }
        _ => false,
    }
}
