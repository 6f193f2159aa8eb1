//! Derive macros for queuebus.
//!
//! This crate provides the `#[derive(Event)]` macro for implementing the
//! `queuebus::Event` trait on structs and enums.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, LitStr};

/// Derives the Event trait for structs and enums.
///
/// The event type name defaults to the type's identifier. Override it with
/// `#[event(name = "...")]`.
///
/// # Examples
///
/// ## Basic struct
///
/// ```rust
/// use queuebus::Event;
///
/// #[derive(Event, Clone, Debug)]
/// struct UserLoggedIn {
///     user_id: u64,
/// }
///
/// assert_eq!(UserLoggedIn::event_type_name(), "UserLoggedIn");
/// ```
///
/// ## Enum events with a custom name
///
/// ```rust
/// use queuebus::Event;
///
/// #[derive(Event, Clone, Debug)]
/// #[event(name = "network")]
/// enum NetworkEvent {
///     Connected { peer_id: String },
///     Disconnected { peer_id: String, reason: String },
/// }
///
/// assert_eq!(NetworkEvent::event_type_name(), "network");
/// ```
#[proc_macro_derive(Event, attributes(event))]
pub fn derive_event(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    expand_event(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_event(input: &DeriveInput) -> syn::Result<TokenStream2> {
    if let Data::Union(data) = &input.data {
        return Err(syn::Error::new(
            data.union_token.span,
            "Event cannot be derived for union types",
        ));
    }

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let type_name = match event_name(input)? {
        Some(custom) => quote! { #custom },
        None => quote! { stringify!(#name) },
    };

    Ok(quote! {
        impl #impl_generics ::queuebus::Event for #name #ty_generics #where_clause {
            fn event_type_name() -> &'static str {
                #type_name
            }
        }
    })
}

/// Reads `#[event(name = "...")]`, rejecting unknown keys.
fn event_name(input: &DeriveInput) -> syn::Result<Option<LitStr>> {
    let mut name = None;

    for attr in input.attrs.iter().filter(|attr| attr.path().is_ident("event")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let value: LitStr = meta.value()?.parse()?;
                if value.value().is_empty() {
                    return Err(meta.error("event name must not be empty"));
                }
                name = Some(value);
                Ok(())
            } else {
                Err(meta.error("unsupported event attribute; expected `name`"))
            }
        })?;
    }

    Ok(name)
}
