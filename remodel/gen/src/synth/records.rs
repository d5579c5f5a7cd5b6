//! Records produced by the synthesizer and consumed by the merger.
//!
//! Records refer to models by canonical name only. Current names are a
//! merge-time concern and live in [`crate::merge::NameTable`].

use std::collections::{BTreeMap, BTreeSet};

use strum::{Display, EnumIter, EnumString};

/// Width of a generated integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegerWidth {
    I32,
    I64,
}

/// Type of a field, parameter, body or response.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeRef {
    String,
    Integer(IntegerWidth),
    Number,
    Boolean,
    /// Any JSON value.
    Any,
    Sequence(Box<TypeRef>),
    /// JSON object with arbitrary keys.
    Mapping(Box<TypeRef>),
    Optional(Box<TypeRef>),
    /// A generated model, by canonical name.
    Model(String),
}

impl TypeRef {
    /// Wraps in [`TypeRef::Optional`] unless already optional.
    pub fn optional(self) -> Self {
        match self {
            Self::Optional(_) => self,
            other => Self::Optional(Box::new(other)),
        }
    }

    /// Returns `true` for types that map to a single Rust scalar.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Self::String | Self::Integer(_) | Self::Number | Self::Boolean
        )
    }

    /// Canonical name of the model this type is, ignoring optionality.
    pub fn direct_model(&self) -> Option<&str> {
        match self {
            Self::Model(canonical) => Some(canonical),
            Self::Optional(inner) => inner.direct_model(),
            _ => None,
        }
    }

    /// Collects the canonical names of every model reachable from this type.
    pub fn collect_models(&self, out: &mut BTreeSet<String>) {
        match self {
            Self::Model(canonical) => {
                out.insert(canonical.clone());
            }
            Self::Sequence(inner) | Self::Mapping(inner) | Self::Optional(inner) => {
                inner.collect_models(out)
            }
            Self::String | Self::Integer(_) | Self::Number | Self::Boolean | Self::Any => {}
        }
    }
}

/// One property of a struct model.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRecord {
    /// Property name as it appears on the wire.
    pub name: String,
    pub ty: TypeRef,
    pub required: bool,
    pub description: Option<String>,
}

/// Shape of a generated model type.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelKind {
    /// Object with declared properties, optionally with additional properties.
    Struct {
        fields: Vec<FieldRecord>,
        additional: Option<TypeRef>,
    },
    /// Type alias for a component that is not an object or union.
    Alias(TypeRef),
    /// `oneOf`/`anyOf`, emitted as an untagged enum.
    Union(Vec<TypeRef>),
}

/// One generated model type.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelClassRecord {
    /// Stable identity: component name or schema location.
    pub canonical_name: String,
    /// Default type name derived from the schema location.
    pub current_name: String,
    pub description: Option<String>,
    pub kind: ModelKind,
}

impl ModelClassRecord {
    /// Canonical names of every model this one refers to.
    pub fn referenced_models(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        match &self.kind {
            ModelKind::Struct { fields, additional } => {
                for field in fields {
                    field.ty.collect_models(&mut out);
                }
                if let Some(additional) = additional {
                    additional.collect_models(&mut out);
                }
            }
            ModelKind::Alias(ty) => ty.collect_models(&mut out),
            ModelKind::Union(members) => {
                for member in members {
                    member.collect_models(&mut out);
                }
            }
        }
        out
    }
}

/// HTTP methods an OpenAPI path item can declare, in document order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter, EnumString,
)]
#[strum(serialize_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
    Trace,
}

impl HttpMethod {
    /// Lower-case form used as the path item key.
    pub fn key(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Put => "put",
            Self::Post => "post",
            Self::Delete => "delete",
            Self::Options => "options",
            Self::Head => "head",
            Self::Patch => "patch",
            Self::Trace => "trace",
        }
    }
}

/// Where a parameter travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
}

/// Serialization style of a query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryStyle {
    /// `name=value`, arrays repeated.
    #[default]
    Form,
    /// `name[key]=value`, nested.
    DeepObject,
}

/// One non-body parameter of an operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterRecord {
    /// Wire name.
    pub name: String,
    /// Argument identifier in the generated method.
    pub ident: String,
    pub location: ParameterLocation,
    pub style: QueryStyle,
    pub ty: TypeRef,
    pub required: bool,
    pub description: Option<String>,
}

/// JSON request body of an operation.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyRecord {
    pub ty: TypeRef,
    pub required: bool,
    pub description: Option<String>,
}

/// How a successful response is decoded.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseKind {
    Json(TypeRef),
    Text,
    Empty,
}

/// One client-callable operation.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationRecord {
    /// `METHOD path`, e.g. `GET /search`.
    pub canonical_id: String,
    pub method: HttpMethod,
    pub path: String,
    pub method_name: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub deprecated: bool,
    /// Path parameters in template order, then the rest as declared.
    pub parameters: Vec<ParameterRecord>,
    pub body: Option<BodyRecord>,
    pub response: ResponseKind,
}

impl OperationRecord {
    /// Canonical names of every model used by parameters, body or response.
    pub fn referenced_models(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        for parameter in &self.parameters {
            parameter.ty.collect_models(&mut out);
        }
        if let Some(body) = &self.body {
            body.ty.collect_models(&mut out);
        }
        if let ResponseKind::Json(ty) = &self.response {
            ty.collect_models(&mut out);
        }
        out
    }
}

/// Everything synthesized from one API document.
#[derive(Debug, Clone, PartialEq)]
pub struct Synthesis {
    /// Version label, e.g. `provider_data/v1`.
    pub api: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub document_version: String,
    /// First absolute server URL declared by the document.
    pub server_url: Option<String>,
    /// Models keyed by canonical name.
    pub models: BTreeMap<String, ModelClassRecord>,
    /// Operations ordered by (path, method).
    pub operations: Vec<OperationRecord>,
}
