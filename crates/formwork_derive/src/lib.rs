use proc_macro::TokenStream;
use proc_macro2::Span;
use proc_macro_crate::{FoundCrate, crate_name};
use quote::quote;
use syn::spanned::Spanned;
use syn::{Data, DeriveInput, Fields, Ident, parse_macro_input};

/// Derives `FormModel` for a struct with named fields.
///
/// For every field the macro emits a zero-sized lens type named
/// `{Model}{FieldPascalCase}Lens` plus a `{Model}Fields` accessor struct, so
/// controllers can address fields without stringly-typed lookups.
#[proc_macro_derive(FormModel)]
pub fn derive_form_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(input)
        .unwrap_or_else(|error| error.to_compile_error())
        .into()
}

struct LensPart {
    field: Ident,
    ty: syn::Type,
    lens: Ident,
}

fn expand(input: DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    if !input.generics.params.is_empty() || input.generics.where_clause.is_some() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "FormModel does not support generic models",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            other => {
                return Err(syn::Error::new(
                    other.span(),
                    "FormModel requires named struct fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "FormModel can only be derived for structs",
            ));
        }
    };

    let root = formwork_path();
    let vis = &input.vis;
    let model = &input.ident;
    let fields_ident = Ident::new(&format!("{model}Fields"), model.span());

    let parts: Vec<LensPart> = fields
        .iter()
        .map(|field| {
            let ident = field
                .ident
                .clone()
                .ok_or_else(|| syn::Error::new(field.span(), "FormModel fields must be named"))?;
            let lens = Ident::new(
                &format!("{model}{}Lens", pascal_case(&ident.to_string())),
                ident.span(),
            );
            Ok(LensPart {
                field: ident,
                ty: field.ty.clone(),
                lens,
            })
        })
        .collect::<syn::Result<_>>()?;

    let lens_types = parts.iter().map(|part| {
        let LensPart { field, ty, lens } = part;
        let key = field.to_string();
        quote! {
            #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
            #vis struct #lens;

            impl #root::validation::FieldLens<#model> for #lens {
                type Value = #ty;

                fn key(self) -> #root::controller::FieldKey {
                    #root::controller::FieldKey::new(#key)
                }

                fn get<'a>(self, model: &'a #model) -> &'a Self::Value {
                    &model.#field
                }

                fn set(self, model: &mut #model, value: Self::Value) {
                    model.#field = value;
                }
            }
        }
    });

    let accessors = parts.iter().map(|part| {
        let LensPart { field, lens, .. } = part;
        quote! {
            #vis const fn #field(&self) -> #lens {
                #lens
            }
        }
    });

    Ok(quote! {
        #(#lens_types)*

        #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
        #vis struct #fields_ident;

        impl #fields_ident {
            #(#accessors)*
        }

        impl #root::validation::FormModel for #model {
            type Fields = #fields_ident;

            fn fields() -> Self::Fields {
                #fields_ident
            }
        }
    })
}

fn formwork_path() -> proc_macro2::TokenStream {
    match crate_name("formwork") {
        Ok(FoundCrate::Itself) => quote!(crate),
        Ok(FoundCrate::Name(name)) => {
            let ident = Ident::new(&name, Span::call_site());
            quote!(::#ident)
        }
        Err(_) => quote!(::formwork),
    }
}

fn pascal_case(snake: &str) -> String {
    snake
        .split('_')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}
