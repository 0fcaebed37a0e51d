//! Type helpers for field analysis.

/// The single type argument of `wrapper<T>`, matched on the last path
/// segment, so `Option<T>` and `std::option::Option<T>` both qualify.
fn single_generic<'a>(ty: &'a syn::Type, wrapper: &str) -> Option<&'a syn::Type> {
    let syn::Type::Path(path) = ty else {
        return None;
    };
    let last = path.path.segments.last()?;
    if last.ident != wrapper {
        return None;
    }
    match &last.arguments {
        syn::PathArguments::AngleBracketed(args) if args.args.len() == 1 => {
            match args.args.first()? {
                syn::GenericArgument::Type(inner) => Some(inner),
                _ => None,
            }
        }
        _ => None,
    }
}

/// `T` for `Option<T>`, `None` otherwise.
pub fn option_inner(ty: &syn::Type) -> Option<&syn::Type> {
    single_generic(ty, "Option")
}

/// The type an enum codec describes: `T` for both `T` and `Option<T>`.
pub fn enum_type(ty: &syn::Type) -> &syn::Type {
    option_inner(ty).unwrap_or(ty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quote::ToTokens;
    use syn::parse_quote;

    #[test]
    fn recognizes_option_paths() {
        let ty: syn::Type = parse_quote!(Option<String>);
        assert!(option_inner(&ty).is_some());
        let ty: syn::Type = parse_quote!(core::option::Option<i32>);
        assert!(option_inner(&ty).is_some());
        let ty: syn::Type = parse_quote!(Vec<String>);
        assert!(option_inner(&ty).is_none());
        let ty: syn::Type = parse_quote!(Option);
        assert!(option_inner(&ty).is_none());
    }

    #[test]
    fn enum_type_unwraps_option() {
        let ty: syn::Type = parse_quote!(Option<Status>);
        assert_eq!(enum_type(&ty).to_token_stream().to_string(), "Status");
        let ty: syn::Type = parse_quote!(Status);
        assert_eq!(enum_type(&ty).to_token_stream().to_string(), "Status");
    }
}
