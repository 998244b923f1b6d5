//! `#[derive(Record)]`: generates `objectstore_core::Record` for a struct,
//! replacing the original's runtime reflection over struct tags with
//! compile-time codegen.
//!
//! - Exactly one field must be marked `#[record(id)]`; it becomes `id()`
//!   `/set_id()` and must be of type `EntityId`.
//! - A field's exposed query-path name defaults to its Rust identifier;
//!   `#[record(rename = "...")]` overrides it.
//! - Fields of a small set of known leaf types (numeric, string, bool,
//!   `DateTime<Utc>`, `Decimal`) convert into `TypedValue` directly. Every
//!   other field type is assumed to itself implement `Record`, and a dotted
//!   sub-path is delegated to it. `Option<T>` fields deref transparently:
//!   `None` reads as `TypedValue::Null` at a leaf, or short-circuits to
//!   `Null` when a sub-path is requested but the option is empty.

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, Type};

const LEAF_TYPE_NAMES: &[&str] = &[
    "String", "str", "bool", "i8", "i16", "i32", "i64", "u8", "u16", "u32", "u64", "f32", "f64",
    "DateTime", "Decimal",
];

#[proc_macro_derive(Record, attributes(record))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(input: DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let struct_name = &input.ident;
    let entity_type = struct_name.to_string();

    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(&input, "Record can only be derived for structs"));
    };
    let Fields::Named(fields) = &data.fields else {
        return Err(syn::Error::new_spanned(&input, "Record requires named fields"));
    };

    let mut id_field = None;
    let mut arms = Vec::new();

    for field in &fields.named {
        let ident = field.ident.as_ref().expect("named field");
        let mut exposed = ident.to_string();
        let mut is_id = false;

        for attr in &field.attrs {
            if !attr.path().is_ident("record") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("id") {
                    is_id = true;
                    Ok(())
                } else if meta.path.is_ident("rename") {
                    let value = meta.value()?;
                    let lit: syn::LitStr = value.parse()?;
                    exposed = lit.value();
                    Ok(())
                } else {
                    Err(meta.error("unsupported #[record(..)] attribute"))
                }
            })?;
        }

        if is_id {
            if id_field.is_some() {
                return Err(syn::Error::new_spanned(ident, "only one field may be #[record(id)]"));
            }
            id_field = Some(ident.clone());
            continue;
        }

        arms.push(field_arm(ident, &exposed, &field.ty));
    }

    let Some(id_field) = id_field else {
        return Err(syn::Error::new_spanned(
            &input,
            "Record requires exactly one field marked #[record(id)]",
        ));
    };

    Ok(quote! {
        impl objectstore_core::Record for #struct_name {
            fn entity_type() -> &'static str {
                #entity_type
            }

            fn id(&self) -> &objectstore_core::EntityId {
                &self.#id_field
            }

            fn set_id(&mut self, id: objectstore_core::EntityId) {
                self.#id_field = id;
            }

            fn get_field(&self, path: &str) -> Result<objectstore_core::TypedValue, objectstore_core::FieldAccessError> {
                let (head, rest) = match path.split_once('.') {
                    Some((head, rest)) => (head, rest),
                    None => (path, ""),
                };
                match head {
                    "id" if rest.is_empty() => Ok(objectstore_core::TypedValue::from(&self.#id_field)),
                    #(#arms)*
                    _ => Err(objectstore_core::FieldAccessError::InvalidField(path.to_string())),
                }
            }
        }
    })
}

fn is_leaf_type(ty: &Type) -> bool {
    last_segment_ident(ty)
        .map(|name| LEAF_TYPE_NAMES.contains(&name.as_str()))
        .unwrap_or(false)
}

fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(type_path) = ty else { return None };
    let segment = type_path.path.segments.last()?;
    if segment.ident != "Option" {
        return None;
    }
    let syn::PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    args.args.iter().find_map(|arg| match arg {
        syn::GenericArgument::Type(ty) => Some(ty),
        _ => None,
    })
}

fn last_segment_ident(ty: &Type) -> Option<String> {
    match ty {
        Type::Path(type_path) => type_path.path.segments.last().map(|s| s.ident.to_string()),
        Type::Reference(r) => last_segment_ident(&r.elem),
        _ => None,
    }
}

fn field_arm(ident: &syn::Ident, exposed: &str, ty: &Type) -> proc_macro2::TokenStream {
    if let Some(inner) = option_inner(ty) {
        if is_leaf_type(inner) {
            quote! {
                #exposed => {
                    if rest.is_empty() {
                        Ok(match &self.#ident {
                            Some(v) => objectstore_core::TypedValue::from(v.clone()),
                            None => objectstore_core::TypedValue::Null,
                        })
                    } else {
                        Err(objectstore_core::FieldAccessError::InvalidField(path.to_string()))
                    }
                }
            }
        } else {
            quote! {
                #exposed => {
                    if rest.is_empty() {
                        Err(objectstore_core::FieldAccessError::InvalidField(path.to_string()))
                    } else {
                        match &self.#ident {
                            Some(v) => objectstore_core::Record::get_field(v, rest),
                            None => Ok(objectstore_core::TypedValue::Null),
                        }
                    }
                }
            }
        }
    } else if is_leaf_type(ty) {
        quote! {
            #exposed => {
                if rest.is_empty() {
                    Ok(objectstore_core::TypedValue::from(self.#ident.clone()))
                } else {
                    Err(objectstore_core::FieldAccessError::InvalidField(path.to_string()))
                }
            }
        }
    } else {
        quote! {
            #exposed => {
                if rest.is_empty() {
                    Err(objectstore_core::FieldAccessError::InvalidField(path.to_string()))
                } else {
                    objectstore_core::Record::get_field(&self.#ident, rest)
                }
            }
        }
    }
}
