//! Compile-time schema descriptors for ksql row types.
//!
//! `#[derive(KsqlSchema)]` implements `ksql::schema::KsqlSchema` for a
//! struct with named fields, so the column list is computed at build time
//! instead of being reflected at run time.
//!
//! ```ignore
//! use ksql::KsqlSchema;
//!
//! #[derive(KsqlSchema)]
//! #[ksql(name = "Movie")]
//! struct MovieRow {
//!     #[ksql(primary_key)]
//!     id: i32,
//!     title: String,
//!     #[ksql(rename = "Release_Year")]
//!     release_year: Option<i32>,
//!     #[ksql(decimal(10, 2))]
//!     price: rust_decimal::Decimal,
//!     #[ksql(skip)]
//!     cached: bool,
//! }
//! ```
//!
//! Field attributes: `key`, `primary_key`, `rename = "..."`,
//! `decimal(precision, scale)`, `skip`. Struct attribute: `name = "..."`.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::ext::IdentExt;
use syn::{
    parse_macro_input, Attribute, Data, DeriveInput, Fields, GenericArgument, LitInt, LitStr,
    PathArguments, Type,
};

#[proc_macro_derive(KsqlSchema, attributes(ksql))]
pub fn derive_ksql_schema(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

// ============================================================================
// Attributes
// ============================================================================

#[derive(Default)]
struct StructAttrs {
    name: Option<String>,
}

#[derive(Default)]
struct FieldAttrs {
    key: bool,
    primary_key: bool,
    rename: Option<String>,
    decimal: Option<(u8, u8)>,
    skip: bool,
}

fn struct_attrs(attrs: &[Attribute]) -> syn::Result<StructAttrs> {
    let mut out = StructAttrs::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("ksql")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let value: LitStr = meta.value()?.parse()?;
                out.name = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("expected `name = \"...\"`"))
            }
        })?;
    }
    Ok(out)
}

fn field_attrs(attrs: &[Attribute]) -> syn::Result<FieldAttrs> {
    let mut out = FieldAttrs::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("ksql")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("key") {
                out.key = true;
            } else if meta.path.is_ident("primary_key") {
                out.primary_key = true;
            } else if meta.path.is_ident("skip") {
                out.skip = true;
            } else if meta.path.is_ident("rename") {
                let value: LitStr = meta.value()?.parse()?;
                out.rename = Some(value.value());
            } else if meta.path.is_ident("decimal") {
                let content;
                syn::parenthesized!(content in meta.input);
                let precision: LitInt = content.parse()?;
                content.parse::<syn::Token![,]>()?;
                let scale: LitInt = content.parse()?;
                out.decimal = Some((precision.base10_parse()?, scale.base10_parse()?));
            } else {
                return Err(meta.error(
                    "expected one of `key`, `primary_key`, `rename`, `decimal`, `skip`",
                ));
            }
            Ok(())
        })?;
    }
    if out.key && out.primary_key {
        return Err(syn::Error::new(
            proc_macro2::Span::call_site(),
            "a column is either `key` or `primary_key`, not both",
        ));
    }
    Ok(out)
}

// ============================================================================
// Expansion
// ============================================================================

fn expand(input: DeriveInput) -> syn::Result<TokenStream2> {
    let ident = &input.ident;
    let attrs = struct_attrs(&input.attrs)?;
    let schema_name = attrs.name.unwrap_or_else(|| ident.unraw().to_string());

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    ident,
                    "KsqlSchema needs a struct with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                ident,
                "KsqlSchema can only be derived for structs",
            ));
        }
    };

    let mut columns = Vec::new();
    for field in fields {
        let attrs = field_attrs(&field.attrs)?;
        if attrs.skip {
            continue;
        }
        let Some(field_ident) = &field.ident else {
            continue;
        };
        let name = field_ident.unraw().to_string();
        let (inner, nullable) = unwrap_option(&field.ty);
        let kind = type_kind(inner, attrs.decimal)?;

        let mut column = quote! {
            ::ksql::schema::ColumnDescriptor::new(#name, #kind)
        };
        if let Some(rename) = &attrs.rename {
            column = quote! { #column.rename(#rename) };
        }
        if nullable {
            column = quote! { #column.nullable() };
        }
        if attrs.key {
            column = quote! { #column.key() };
        }
        if attrs.primary_key {
            column = quote! { #column.primary_key() };
        }
        columns.push(column);
    }

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    Ok(quote! {
        impl #impl_generics ::ksql::schema::KsqlSchema for #ident #ty_generics #where_clause {
            fn schema() -> ::ksql::schema::SchemaDescriptor {
                ::ksql::schema::SchemaDescriptor::new(#schema_name)
                    #(.column(#columns))*
            }
        }
    })
}

// ============================================================================
// Type mapping
// ============================================================================

/// Last path segment of a type, with its generic arguments.
fn last_segment(ty: &Type) -> Option<(String, Vec<&Type>)> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    let args = match &segment.arguments {
        PathArguments::AngleBracketed(args) => args
            .args
            .iter()
            .filter_map(|arg| match arg {
                GenericArgument::Type(ty) => Some(ty),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };
    Some((segment.ident.to_string(), args))
}

fn unwrap_option(ty: &Type) -> (&Type, bool) {
    match last_segment(ty) {
        Some((name, args)) if name == "Option" && args.len() == 1 => (args[0], true),
        _ => (ty, false),
    }
}

fn type_kind(ty: &Type, decimal: Option<(u8, u8)>) -> syn::Result<TokenStream2> {
    let kind = quote! { ::ksql::schema::TypeKind };
    match ty {
        Type::Reference(reference) => return type_kind(&reference.elem, decimal),
        Type::Array(array) => {
            let element = type_kind(&array.elem, decimal)?;
            return Ok(quote! { #kind::array(#element) });
        }
        Type::Slice(slice) => {
            let element = type_kind(&slice.elem, decimal)?;
            return Ok(quote! { #kind::array(#element) });
        }
        _ => {}
    }

    let Some((name, args)) = last_segment(ty) else {
        return Err(syn::Error::new_spanned(ty, "unsupported column type"));
    };
    let tokens = match (name.as_str(), args.as_slice()) {
        ("i8" | "i16" | "i32" | "u8" | "u16" | "u32", []) => quote! { #kind::Int },
        ("i64" | "u64" | "isize" | "usize", []) => quote! { #kind::BigInt },
        ("f32" | "f64", []) => quote! { #kind::Double },
        ("bool", []) => quote! { #kind::Boolean },
        ("String" | "str" | "char", []) => quote! { #kind::String },
        ("NaiveDate", []) => quote! { #kind::Date },
        ("NaiveTime", []) => quote! { #kind::Time },
        ("NaiveDateTime" | "DateTime", _) => quote! { #kind::Timestamp },
        ("Decimal", []) => {
            let Some((precision, scale)) = decimal else {
                return Err(syn::Error::new_spanned(
                    ty,
                    "decimal columns need #[ksql(decimal(precision, scale))]",
                ));
            };
            quote! { #kind::Decimal { precision: #precision, scale: #scale } }
        }
        ("Option" | "Box", [inner]) => type_kind(inner, decimal)?,
        ("Vec", [inner]) if is_u8(inner) => quote! { #kind::Bytes },
        ("Vec" | "VecDeque" | "HashSet" | "BTreeSet", [inner]) => {
            let element = type_kind(inner, decimal)?;
            quote! { #kind::array(#element) }
        }
        ("HashMap" | "BTreeMap", [key, value]) => {
            let key = type_kind(key, None)?;
            let value = type_kind(value, decimal)?;
            quote! { #kind::map(#key, #value) }
        }
        _ => quote! {
            #kind::Struct(<#ty as ::ksql::schema::KsqlSchema>::schema().columns)
        },
    };
    Ok(tokens)
}

fn is_u8(ty: &Type) -> bool {
    matches!(last_segment(ty), Some((name, args)) if name == "u8" && args.is_empty())
}
