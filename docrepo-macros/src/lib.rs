//! Procedural macros for the docrepo project.
//!
//! This crate provides the `Document` derive, which implements
//! `docrepo::document::Document` for a struct from its identity field and
//! collection name.

#[allow(unused_extern_crates)]
extern crate self as docrepo_macros;

use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, Ident, LitStr};

/// Derives `docrepo::document::Document`.
///
/// The identity is the field marked `#[document(id)]`, or else the field named
/// `id` or `_id`. It must be an `ObjectId` serialized as `_id`. The collection
/// name comes from `#[document(collection = "...")]` and otherwise defaults to
/// the lowercased struct name with an `s` appended unless it already ends in
/// one (`Widget` → `widgets`, `Status` → `status`). No other English plural
/// rules are applied.
///
/// ```ignore
/// #[derive(Debug, Clone, Serialize, Deserialize, Document)]
/// #[document(collection = "users")]
/// pub struct User {
///     #[serde(rename = "_id")]
///     pub id: ObjectId,
///     pub name: String,
/// }
/// ```
#[proc_macro_derive(Document, attributes(document))]
pub fn derive_document(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match expand_document(&input) {
        Ok(expanded) => expanded.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn expand_document(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let collection = collection_name(input)?;
    let id_field = id_field(input)?;

    Ok(quote! {
        impl #impl_generics ::docrepo::document::Document for #name #ty_generics #where_clause {
            fn id(&self) -> &::docrepo::bson::oid::ObjectId {
                &self.#id_field
            }

            fn collection_name() -> &'static str {
                #collection
            }
        }
    })
}

fn collection_name(input: &DeriveInput) -> syn::Result<LitStr> {
    let mut collection = None;

    for attr in input.attrs.iter().filter(|attr| attr.path().is_ident("document")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("collection") {
                collection = Some(meta.value()?.parse::<LitStr>()?);
                Ok(())
            } else {
                Err(meta.error("unsupported document attribute, expected `collection = \"...\"`"))
            }
        })?;
    }

    Ok(collection.unwrap_or_else(|| {
        let mut plural = input.ident.to_string().to_lowercase();
        if !plural.ends_with('s') {
            plural.push('s');
        }
        LitStr::new(&plural, Span::call_site())
    }))
}

fn id_field(input: &DeriveInput) -> syn::Result<Ident> {
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(&input.ident, "Document can only be derived for structs"));
    };
    let Fields::Named(fields) = &data.fields else {
        return Err(syn::Error::new_spanned(&input.ident, "Document requires named fields"));
    };

    let mut marked = None;
    for field in &fields.named {
        for attr in field.attrs.iter().filter(|attr| attr.path().is_ident("document")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("id") {
                    marked = field.ident.clone();
                    Ok(())
                } else {
                    Err(meta.error("unsupported field attribute, expected `id`"))
                }
            })?;
        }
    }

    marked
        .or_else(|| {
            fields
                .named
                .iter()
                .filter_map(|field| field.ident.clone())
                .find(|ident| ident == "id" || ident == "_id")
        })
        .ok_or_else(|| syn::Error::new_spanned(
            &input.ident,
            "no identity field; name it `id` or mark it with #[document(id)]",
        ))
}
