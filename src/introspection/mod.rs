//! Schema introspection model: types, fields and nested type references.
//!
//! Types are fetched lazily by a [`TypeFetcher`] and kept in a caller-owned
//! [`TypeCache`] for the lifetime of a session.

mod cache;
mod client;
mod fetcher;

pub use cache::TypeCache;
pub use client::IntrospectionClient;
pub use fetcher::{StaticTypeFetcher, TypeFetcher};

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Result, TypegraphError};

/// Number of NON_NULL/LIST wrappers the introspection query requests,
/// the same depth as the standard `TypeRef` introspection fragment.
pub const MAX_TYPE_REF_DEPTH: usize = 7;

/// Scalar names that never count as relationship targets, even if a
/// server reports them with an object-like kind.
pub const KNOWN_SCALARS: &[&str] = &[
    "String",
    "Int",
    "Float",
    "Boolean",
    "ID",
    "DateTime",
    "Date",
    "Time",
    "JSON",
    "UUID",
    "Decimal",
    "BigInt",
    "GenericScalar",
];

/// Introspection `__TypeKind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TypeKind {
    Scalar,
    Object,
    Interface,
    Union,
    Enum,
    InputObject,
    List,
    NonNull,
    #[serde(other)]
    Other,
}

impl TypeKind {
    pub fn is_wrapper(self) -> bool {
        matches!(self, TypeKind::List | TypeKind::NonNull)
    }
}

/// A possibly wrapped reference to a named type, as returned by introspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeRef {
    pub kind: TypeKind,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "ofType")]
    pub of_type: Option<Box<TypeRef>>,
}

/// A [`TypeRef`] with its NON_NULL/LIST wrappers peeled off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnwrappedType {
    pub name: String,
    pub kind: TypeKind,
    pub is_list: bool,
    /// The field itself is non-null (a NON_NULL wrapper outside any LIST).
    pub is_non_null: bool,
}

impl TypeRef {
    /// Named type reference with no wrappers.
    pub fn named(kind: TypeKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: Some(name.into()),
            of_type: None,
        }
    }

    pub fn non_null(inner: TypeRef) -> Self {
        Self {
            kind: TypeKind::NonNull,
            name: None,
            of_type: Some(Box::new(inner)),
        }
    }

    pub fn list(inner: TypeRef) -> Self {
        Self {
            kind: TypeKind::List,
            name: None,
            of_type: Some(Box::new(inner)),
        }
    }

    /// Peel NON_NULL/LIST wrappers down to the named type.
    ///
    /// Strict form of [`TypeRef::unwrap_bounded`]: a wrapper chain that ends
    /// without a named type is also reported as
    /// [`TypegraphError::MalformedTypeRef`].
    pub fn unwrap_named(&self) -> Result<UnwrappedType> {
        self.unwrap_bounded()?.ok_or_else(|| {
            TypegraphError::MalformedTypeRef(format!(
                "wrapper chain truncated or deeper than {} NON_NULL/LIST wrappers",
                MAX_TYPE_REF_DEPTH
            ))
        })
    }

    /// Peel at most [`MAX_TYPE_REF_DEPTH`] wrappers.
    ///
    /// `Ok(None)` when the chain runs out first: a wrapper without `ofType`
    /// (the query depth truncated it) or more wrappers than the bound. Both
    /// are valid server data. A named kind without a name is a contract
    /// violation and the only error.
    pub fn unwrap_bounded(&self) -> Result<Option<UnwrappedType>> {
        let mut current = self;
        let mut is_list = false;
        let mut is_non_null = false;

        for _ in 0..=MAX_TYPE_REF_DEPTH {
            if !current.kind.is_wrapper() {
                let name = current.name.clone().ok_or_else(|| {
                    TypegraphError::MalformedTypeRef(format!(
                        "{:?} reference has neither name nor ofType",
                        current.kind
                    ))
                })?;
                return Ok(Some(UnwrappedType {
                    name,
                    kind: current.kind,
                    is_list,
                    is_non_null,
                }));
            }

            match current.kind {
                TypeKind::List => is_list = true,
                _ if !is_list => is_non_null = true,
                _ => {}
            }

            match current.of_type.as_deref() {
                Some(inner) => current = inner,
                None => return Ok(None),
            }
        }

        Ok(None)
    }
}

/// A field on an object or interface type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub type_ref: TypeRef,
}

impl Field {
    pub fn new(name: impl Into<String>, type_ref: TypeRef) -> Self {
        Self {
            name: name.into(),
            type_ref,
        }
    }

    /// The unwrapped target type if this field links to another graph node.
    ///
    /// Object and interface targets qualify unless the target is a known
    /// scalar or either name is a meta (`__`) name. With `include_scalars`
    /// scalar and enum targets qualify as well.
    pub fn relationship_target(&self, include_scalars: bool) -> Result<Option<UnwrappedType>> {
        if is_meta_name(&self.name) {
            return Ok(None);
        }
        let Some(target) = self.type_ref.unwrap_bounded()? else {
            log::debug!(
                "Field {} has a truncated or over-deep type reference, not followed",
                self.name
            );
            return Ok(None);
        };
        if is_meta_name(&target.name) {
            return Ok(None);
        }

        let is_object_like = matches!(target.kind, TypeKind::Object | TypeKind::Interface)
            && !is_known_scalar(&target.name);
        let is_scalar_like = matches!(target.kind, TypeKind::Scalar | TypeKind::Enum)
            || is_known_scalar(&target.name);

        if is_object_like || (include_scalars && is_scalar_like) {
            Ok(Some(target))
        } else {
            Ok(None)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceRef {
    pub name: String,
}

/// One introspected type. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntrospectionType {
    pub name: String,
    pub kind: TypeKind,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub fields: Vec<Field>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub interfaces: Vec<InterfaceRef>,
}

impl IntrospectionType {
    pub fn object(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Object,
            fields,
            interfaces: Vec::new(),
        }
    }
}

pub fn is_known_scalar(name: &str) -> bool {
    KNOWN_SCALARS.contains(&name)
}

pub fn is_meta_name(name: &str) -> bool {
    name.starts_with("__")
}

/// Introspection returns `null` rather than `[]` for fields/interfaces on
/// scalars and enums.
fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
