//! Derive macros for intent-pay
//!
//! This crate provides procedural macros to reduce boilerplate when working
//! with the payment event enums.
//!
//! # Available Macros
//!
//! - `#[derive(Event)]` - Generates helpers for event enums (commands/results)
//!
//! # Example
//!
//! ```ignore
//! use intent_pay_macros::Event;
//!
//! #[derive(Event, Clone, Debug)]
//! enum PaymentEvent {
//!     #[command]
//!     HydrateOrder { refund_address: Option<String> },
//!
//!     #[result]
//!     OrderHydrated { order: HydratedOrder },
//! }
//!
//! // Generated methods:
//! assert!(PaymentEvent::HydrateOrder { refund_address: None }.is_command());
//! assert_eq!(PaymentEvent::HydrateOrder { refund_address: None }.name(), "hydrate_order");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use proc_macro::TokenStream;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Fields, parse_macro_input};

/// Derive macro for payment event enums
///
/// Generates helper methods for event enums:
/// - `is_command()` - Returns true if this variant is a command (a request to act)
/// - `is_result()` - Returns true if this variant is a result (a fact reported back)
/// - `name()` - Returns the variant's snake_case name, as used in dispatch logs
///
/// # Attributes
///
/// - `#[command]` - Mark a variant as a command
/// - `#[result]` - Mark a variant as a result
///
/// # Panics
///
/// This macro will produce a compile error (not a runtime panic) if:
/// - Applied to a non-enum type
/// - A variant has both `#[command]` and `#[result]` attributes
///
/// # Example
///
/// ```ignore
/// #[derive(Event, Clone, Debug)]
/// enum PaymentEvent {
///     #[command]
///     SetPayParams { params: PayParams },
///
///     #[command]
///     Reset,
///
///     #[result]
///     PreviewGenerated { order: DehydratedOrder },
/// }
///
/// // Usage:
/// assert!(PaymentEvent::Reset.is_command());
/// assert_eq!(PaymentEvent::Reset.name(), "reset");
/// ```
#[proc_macro_derive(Event, attributes(command, result))]
#[allow(clippy::expect_used)] // Proc macro panics become compile errors, not runtime panics
pub fn derive_event(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    let Data::Enum(data_enum) = &input.data else {
        return syn::Error::new_spanned(input, "#[derive(Event)] can only be used on enums")
            .to_compile_error()
            .into();
    };

    // Collect variants marked as commands or results
    let mut command_variants = Vec::new();
    let mut result_variants = Vec::new();

    for variant in &data_enum.variants {
        let variant_name = &variant.ident;
        let is_command = has_attribute(&variant.attrs, "command");
        let is_result = has_attribute(&variant.attrs, "result");

        if is_command && is_result {
            return syn::Error::new_spanned(
                variant,
                "Variant cannot be both #[command] and #[result]",
            )
            .to_compile_error()
            .into();
        }

        if is_command {
            command_variants.push(variant_name);
        }

        if is_result {
            result_variants.push(variant_name);
        }
    }

    // Build a map of variant names to their field types for efficient lookup
    let variant_map: std::collections::HashMap<_, _> = data_enum
        .variants
        .iter()
        .map(|v| (&v.ident, &v.fields))
        .collect();

    // Generate is_command() match arms
    let is_command_arms = command_variants.iter().map(|variant| {
        // SAFETY: We collected these variants from data_enum.variants above, so they must exist
        let fields = variant_map.get(variant).expect("variant must exist in map");
        match fields {
            Fields::Named(_) => quote! { Self::#variant { .. } => true, },
            Fields::Unnamed(_) => quote! { Self::#variant(..) => true, },
            Fields::Unit => quote! { Self::#variant => true, },
        }
    });

    // Generate is_result() match arms
    let is_result_arms = result_variants.iter().map(|variant| {
        // SAFETY: We collected these variants from data_enum.variants above, so they must exist
        let fields = variant_map.get(variant).expect("variant must exist in map");
        match fields {
            Fields::Named(_) => quote! { Self::#variant { .. } => true, },
            Fields::Unnamed(_) => quote! { Self::#variant(..) => true, },
            Fields::Unit => quote! { Self::#variant => true, },
        }
    });

    // Generate name() match arms for every variant
    let name_arms = data_enum.variants.iter().map(|variant| {
        let variant_name = &variant.ident;
        let label = snake_case(&variant_name.to_string());
        match &variant.fields {
            Fields::Named(_) => quote! { Self::#variant_name { .. } => #label, },
            Fields::Unnamed(_) => quote! { Self::#variant_name(..) => #label, },
            Fields::Unit => quote! { Self::#variant_name => #label, },
        }
    });

    let expanded = quote! {
        impl #name {
            /// Returns true if this event is a command
            #[must_use]
            pub const fn is_command(&self) -> bool {
                match self {
                    #(#is_command_arms)*
                    _ => false,
                }
            }

            /// Returns true if this event is a result
            #[must_use]
            pub const fn is_result(&self) -> bool {
                match self {
                    #(#is_result_arms)*
                    _ => false,
                }
            }

            /// Returns the variant's snake_case name, as used in dispatch logs
            #[must_use]
            pub const fn name(&self) -> &'static str {
                match self {
                    #(#name_arms)*
                }
            }
        }
    };

    TokenStream::from(expanded)
}

/// Convert a PascalCase identifier to snake_case.
fn snake_case(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len() + 4);
    for (i, c) in ident.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Helper function to check if an attribute list contains a specific attribute
fn has_attribute(attrs: &[Attribute], name: &str) -> bool {
    attrs.iter().any(|attr| attr.path().is_ident(name))
}
