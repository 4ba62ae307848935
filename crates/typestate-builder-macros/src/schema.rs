//! Structural description of the annotated struct and per-field role
//! classification.

use proc_macro2::Span;
use syn::spanned::Spanned;
use syn::{
    Data, DeriveInput, Expr, Fields, GenericArgument, Generics, Ident, LitStr, PathArguments,
    Type, Visibility,
};
use thiserror::Error;

/// How a field participates in construction.
#[derive(Debug, Clone)]
pub enum FieldRole {
    /// Must receive a value before `finalize` becomes available.
    Required,
    /// Declared as `Option<Inner>`; absent unless set. Carries the inner type.
    Optional(Type),
    /// Pre-populated with the declared expression; overridable.
    Defaulted(Expr),
    /// Accumulated one element at a time through a setter named by `each`.
    Repeated { element: Type, setter: Ident },
}

/// A single field of the annotated struct.
#[derive(Debug)]
pub struct FieldSpec {
    pub name: Ident,
    pub ty: Type,
    pub role: FieldRole,
}

impl FieldSpec {
    pub fn is_required(&self) -> bool {
        matches!(self.role, FieldRole::Required)
    }
}

/// Everything the emitter needs to know about the annotated struct.
#[derive(Debug)]
pub struct RecordSchema {
    pub name: Ident,
    pub vis: Visibility,
    pub generics: Generics,
    pub fields: Vec<FieldSpec>,
}

impl RecordSchema {
    /// Extract the schema from a parsed derive input. Rejects anything that
    /// is not a struct with named fields.
    pub fn from_derive_input(input: &DeriveInput) -> syn::Result<Self> {
        let Data::Struct(struct_data) = &input.data else {
            return Err(syn::Error::new_spanned(
                input,
                "Builder can only be derived for structs",
            ));
        };
        let Fields::Named(named) = &struct_data.fields else {
            return Err(syn::Error::new_spanned(
                input,
                "Builder requires a struct with named fields",
            ));
        };

        let fields = named
            .named
            .iter()
            .map(|field| {
                let name = field.ident.as_ref().unwrap().clone();
                let role = classify(field)?;
                Ok(FieldSpec {
                    name,
                    ty: field.ty.clone(),
                    role,
                })
            })
            .collect::<syn::Result<Vec<_>>>()?;

        Ok(Self {
            name: input.ident.clone(),
            vis: input.vis.clone(),
            generics: input.generics.clone(),
            fields,
        })
    }

    /// Required fields in declared order. Their position here is the bit
    /// each one occupies in the state lattice.
    pub fn required(&self) -> Vec<&FieldSpec> {
        self.fields.iter().filter(|f| f.is_required()).collect()
    }
}

/// Classification failures. Converted to [`syn::Error`] at the macro
/// boundary so they surface as a `compile_error!` on the offending field
/// instead of silently falling back to a default role.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error(
        "conflicting `builder` attributes on field `{field}`: `value` and `each` cannot be combined"
    )]
    ConflictingAttributes { field: Ident, span: Span },
    #[error("`each` on field `{field}` requires a single-argument container type")]
    UnsupportedFieldType { field: Ident, span: Span },
}

impl SchemaError {
    fn span(&self) -> Span {
        match self {
            Self::ConflictingAttributes { span, .. } | Self::UnsupportedFieldType { span, .. } => {
                *span
            }
        }
    }
}

impl From<SchemaError> for syn::Error {
    fn from(err: SchemaError) -> Self {
        syn::Error::new(err.span(), err.to_string())
    }
}

/// Assign the field its role. Pure; priority is `value`, then `each`, then
/// `Option` detection, then required.
pub fn classify(field: &syn::Field) -> syn::Result<FieldRole> {
    let name = field.ident.as_ref().unwrap();
    let mut value: Option<Expr> = None;
    let mut each: Option<Ident> = None;

    for attr in &field.attrs {
        if !attr.path().is_ident("builder") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("value") {
                if value.is_some() {
                    return Err(meta.error("duplicate `value` attribute"));
                }
                value = Some(meta.value()?.parse()?);
                Ok(())
            } else if meta.path.is_ident("each") {
                if each.is_some() {
                    return Err(meta.error("duplicate `each` attribute"));
                }
                let lit: LitStr = meta.value()?.parse()?;
                each = Some(Ident::new(&lit.value(), lit.span()));
                Ok(())
            } else {
                Err(meta.error(
                    "unrecognized `builder` attribute; expected `value = <expr>` or `each = \"<name>\"`",
                ))
            }
        })?;
    }

    if value.is_some() && each.is_some() {
        return Err(SchemaError::ConflictingAttributes {
            field: name.clone(),
            span: name.span(),
        }
        .into());
    }
    if let Some(expr) = value {
        return Ok(FieldRole::Defaulted(expr));
    }
    if let Some(setter) = each {
        let element = single_type_argument(&field.ty).ok_or(SchemaError::UnsupportedFieldType {
            field: name.clone(),
            span: field.ty.span(),
        })?;
        return Ok(FieldRole::Repeated { element, setter });
    }
    if let Some(inner) = option_inner(&field.ty) {
        return Ok(FieldRole::Optional(inner));
    }
    Ok(FieldRole::Required)
}

/// `Option<T>` → `T`.
fn option_inner(ty: &Type) -> Option<Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != "Option" {
        return None;
    }
    single_type_argument(ty)
}

/// The single generic type argument of a one-argument container, if any.
fn single_type_argument(ty: &Type) -> Option<Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    if args.args.len() != 1 {
        return None;
    }
    match args.args.first() {
        Some(GenericArgument::Type(inner)) => Some(inner.clone()),
        _ => None,
    }
}
