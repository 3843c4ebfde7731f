use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::{parse_macro_input, DeriveInput, LitStr};

/// Derives a `controller_spec()` constructor from `#[strata(...)]` attributes.
///
/// # Usage
///
/// ```ignore
/// #[derive(ControllerMeta)]
/// #[strata(
///     stacked_type = "nested",
///     help = "manage users",
///     alias = "u",
///     default_command = "list"
/// )]
/// struct Users;
/// ```
///
/// This will generate:
///
/// ```ignore
/// impl Users {
///     pub fn controller_spec() -> strata::ControllerSpec {
///         strata::ControllerSpec::new("users")
///             .stacked_type("nested")
///             .help("manage users")
///             .alias("u")
///             .default_command("list")
///     }
/// }
/// ```
///
/// The label defaults to the type name in snake_case. Supported keys are
/// `label`, `stacked_on`, `stacked_type`, `help`, `description`, `epilog`,
/// `title`, `default_command`, `usage`, `alias` (repeatable) and the bare
/// flag `hidden`.
#[proc_macro_derive(ControllerMeta, attributes(strata))]
pub fn derive_controller_meta(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

#[derive(Default)]
struct Meta {
    label: Option<LitStr>,
    stacked_on: Option<LitStr>,
    stacked_type: Option<LitStr>,
    help: Option<LitStr>,
    description: Option<LitStr>,
    epilog: Option<LitStr>,
    title: Option<LitStr>,
    default_command: Option<LitStr>,
    usage: Option<LitStr>,
    aliases: Vec<LitStr>,
    hidden: bool,
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let meta = parse_meta(&input.attrs)?;
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let label = meta
        .label
        .unwrap_or_else(|| LitStr::new(&snake_case(&name.to_string()), Span::call_site()));

    let setters = [
        ("stacked_on", meta.stacked_on),
        ("stacked_type", meta.stacked_type),
        ("help", meta.help),
        ("description", meta.description),
        ("epilog", meta.epilog),
        ("title", meta.title),
        ("default_command", meta.default_command),
        ("usage", meta.usage),
    ]
    .into_iter()
    .filter_map(|(method, value)| {
        let method = syn::Ident::new(method, Span::call_site());
        value.map(|value| quote! { .#method(#value) })
    });

    let aliases = meta.aliases.iter();
    let hidden = meta.hidden.then(|| quote! { .hide() });

    Ok(quote! {
        impl #impl_generics #name #ty_generics #where_clause {
            pub fn controller_spec() -> ::strata::ControllerSpec {
                ::strata::ControllerSpec::new(#label)
                    #(#setters)*
                    #(.alias(#aliases))*
                    #hidden
            }
        }
    })
}

/// Collect every `#[strata(...)]` attribute into one [`Meta`].
fn parse_meta(attrs: &[syn::Attribute]) -> syn::Result<Meta> {
    let mut meta = Meta::default();

    for attr in attrs.iter().filter(|a| a.path().is_ident("strata")) {
        attr.parse_nested_meta(|nested| {
            if nested.path.is_ident("hidden") {
                meta.hidden = true;
                return Ok(());
            }
            if nested.path.is_ident("alias") {
                meta.aliases.push(nested.value()?.parse()?);
                return Ok(());
            }

            let slot = if nested.path.is_ident("label") {
                &mut meta.label
            } else if nested.path.is_ident("stacked_on") {
                &mut meta.stacked_on
            } else if nested.path.is_ident("stacked_type") {
                &mut meta.stacked_type
            } else if nested.path.is_ident("help") {
                &mut meta.help
            } else if nested.path.is_ident("description") {
                &mut meta.description
            } else if nested.path.is_ident("epilog") {
                &mut meta.epilog
            } else if nested.path.is_ident("title") {
                &mut meta.title
            } else if nested.path.is_ident("default_command") {
                &mut meta.default_command
            } else if nested.path.is_ident("usage") {
                &mut meta.usage
            } else {
                return Err(nested.error("unsupported strata attribute"));
            };

            if slot.is_some() {
                return Err(nested.error("duplicate strata attribute"));
            }
            *slot = Some(nested.value()?.parse()?);
            Ok(())
        })?;
    }

    Ok(meta)
}

/// `NestedController` -> `nested_controller`, `HTTPServer` -> `http_server`.
fn snake_case(ident: &str) -> String {
    let chars: Vec<char> = ident.chars().collect();
    let mut out = String::with_capacity(ident.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_lower)
            {
                out.push('_');
            }
        }
        out.extend(c.to_lowercase());
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snake_case() {
        assert_eq!(snake_case("Base"), "base");
        assert_eq!(snake_case("NestedController"), "nested_controller");
        assert_eq!(snake_case("HTTPServer"), "http_server");
        assert_eq!(snake_case("Users2Admin"), "users2_admin");
        assert_eq!(snake_case("already_snake"), "already_snake");
    }

    #[test]
    fn test_parse_meta() {
        let input: DeriveInput = syn::parse_quote! {
            #[strata(label = "users", stacked_type = "nested", alias = "u", alias = "usr", hidden)]
            struct Users;
        };
        let meta = parse_meta(&input.attrs).unwrap();

        assert_eq!(meta.label.unwrap().value(), "users");
        assert_eq!(meta.stacked_type.unwrap().value(), "nested");
        assert_eq!(meta.aliases.len(), 2);
        assert!(meta.hidden);
    }

    #[test]
    fn test_parse_usage() {
        let input: DeriveInput = syn::parse_quote! {
            #[strata(stacked_type = "nested", usage = "myapp db [options] <command>")]
            struct Db;
        };
        let meta = parse_meta(&input.attrs).unwrap();
        assert_eq!(meta.usage.unwrap().value(), "myapp db [options] <command>");
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let input: DeriveInput = syn::parse_quote! {
            #[strata(colour = "blue")]
            struct Users;
        };
        assert!(parse_meta(&input.attrs).is_err());
    }

    #[test]
    fn test_duplicate_key_is_rejected() {
        let input: DeriveInput = syn::parse_quote! {
            #[strata(help = "a", help = "b")]
            struct Users;
        };
        assert!(parse_meta(&input.attrs).is_err());
    }
}
