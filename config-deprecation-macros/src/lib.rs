//! Proc macros for the config-deprecation crate.
//!
//! This crate provides the `#[derive(Plugin)]` macro

use proc_macro::TokenStream;
use quote::quote;
use syn::{DeriveInput, Expr, Lit, parse_macro_input, spanned::Spanned};

/// Plugin options parsed from the `#[plugin(...)]` attribute.
struct PluginOptions {
    path: String,
    order: u32,
}

impl PluginOptions {
    fn from_attrs(attrs: &[syn::Attribute]) -> syn::Result<Self> {
        let mut path = None;
        let mut order = None;

        for attr in attrs {
            if !attr.path().is_ident("plugin") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("path") {
                    let value: Expr = meta.value()?.parse()?;
                    match value {
                        Expr::Lit(syn::ExprLit {
                            lit: Lit::Str(lit_str),
                            ..
                        }) => path = Some(lit_str.value()),
                        other => {
                            return Err(syn::Error::new(
                                other.span(),
                                "path must be a string literal",
                            ));
                        }
                    }
                } else if meta.path.is_ident("order") {
                    let value: Expr = meta.value()?.parse()?;
                    match value {
                        Expr::Lit(syn::ExprLit {
                            lit: Lit::Int(lit_int),
                            ..
                        }) => order = Some(lit_int.base10_parse::<u32>()?),
                        other => {
                            return Err(syn::Error::new(
                                other.span(),
                                "order must be an integer literal",
                            ));
                        }
                    }
                } else {
                    return Err(syn::Error::new(
                        meta.path.span(),
                        format!("unknown plugin attribute: {:?}", meta.path.get_ident()),
                    ));
                }
                Ok(())
            })?;
        }

        let path = path.ok_or_else(|| {
            syn::Error::new(
                proc_macro2::Span::call_site(),
                "missing required attribute: #[plugin(path = \"...\")]",
            )
        })?;
        if path.split('.').any(str::is_empty) {
            return Err(syn::Error::new(
                proc_macro2::Span::call_site(),
                format!("plugin path \"{path}\" contains an empty segment"),
            ));
        }

        Ok(Self {
            path,
            order: order.unwrap_or(0),
        })
    }
}

/// Derive macro for the `Plugin` trait.
///
/// The type must also implement `DeprecationProvider` and `Default`. The
/// derive only fixes the config path the plugin's rules are resolved against
/// and its position among other plugins; registering it is left to
/// `RegistryBuilder::plugin` or `submit_plugin!`.
///
/// # Example
///
/// ```rust,ignore
/// use config_deprecation::{
///     Plugin, deprecations,
///     factory::ConfigDeprecationFactory,
///     registry::DeprecationProvider,
///     rule::Deprecation,
/// };
///
/// #[derive(Default, Plugin)]
/// #[plugin(path = "reporting", order = 200)]
/// struct ReportingDeprecations;
///
/// impl DeprecationProvider for ReportingDeprecations {
///     fn deprecations(&self, factory: &ConfigDeprecationFactory) -> Vec<Deprecation> {
///         deprecations![factory.unused("index")]
///     }
/// }
/// ```
///
/// This expands to roughly:
///
/// ```rust,ignore
/// impl config_deprecation::registry::Plugin for ReportingDeprecations {
///     const PATH: &'static str = "reporting";
///     const ORDER: u32 = 200;
/// }
/// ```
#[proc_macro_derive(Plugin, attributes(plugin))]
pub fn derive_plugin(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match derive_plugin_impl(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn derive_plugin_impl(input: DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let options = PluginOptions::from_attrs(&input.attrs)?;
    let name = &input.ident;
    let path = &options.path;
    let order = options.order;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::config_deprecation::registry::Plugin
            for #name #ty_generics #where_clause
        {
            const PATH: &'static str = #path;
            const ORDER: u32 = #order;
        }
    })
}
