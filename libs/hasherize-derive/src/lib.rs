use proc_macro::TokenStream;
use quote::quote;
use syn::{
    Data, DeriveInput, Fields, GenericArgument, LitStr, PathArguments, Type, parse_macro_input,
};

/// Derive macro for the `Hasherize` capability.
///
/// Generates on the annotated struct:
///
/// - `impl Hasherize`: `read_field` (field value by name) and `from_fields`
///   (default reconstruction from the decoded field map).
/// - `hasherize_fields() -> &'static [&'static str]`: every non-skipped field
///   name, in struct order, ready to pass to `Registry::declare`.
/// - `hasherize_declare(&mut Registry)`: declares those fields, marking
///   `object` fields as nested objects or collections of their inner type.
///
/// Plain fields go through serde (`Serialize` / `DeserializeOwned`).
///
/// # Example
///
/// ```ignore
/// #[derive(Hasherize)]
/// pub struct Owner {
///     pub file: String,
///     #[hasherize(rename = "sha")]
///     pub commit: Option<String>,
///     #[hasherize(object)]
///     pub items: Vec<Member>,
///     #[hasherize(skip)]
///     pub cache: Vec<u8>,
/// }
/// ```
///
/// `object` fields hold convertible types: `T`, `Option<T>` or `Vec<T>`.
/// `skip` fields are never read and are rebuilt with `Default::default()`.
#[proc_macro_derive(Hasherize, attributes(hasherize))]
pub fn derive_hasherize(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match derive_impl(&input) {
        Ok(tokens) => tokens,
        Err(e) => e.to_compile_error().into(),
    }
}

/// How a nested convertible field is shaped, with the convertible type it holds.
enum ObjectShape<'a> {
    Single(&'a Type),
    Optional(&'a Type),
    List(&'a Type),
}

fn derive_impl(input: &DeriveInput) -> Result<TokenStream, syn::Error> {
    let name = &input.ident;
    let name_str = name.to_string();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "Hasherize only supports structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "Hasherize only supports structs",
            ));
        }
    };

    let mut read_arms = Vec::new();
    let mut build_fields = Vec::new();
    let mut field_names = Vec::new();
    let mut declarations = Vec::new();

    for field in fields {
        let field_ident = field
            .ident
            .as_ref()
            .ok_or_else(|| syn::Error::new_spanned(field, "expected named field"))?;
        let field_ty = &field.ty;

        // Parse #[hasherize(...)] attribute.
        let mut key = field_ident.to_string();
        let mut object = false;
        let mut skip = false;

        for attr in &field.attrs {
            if !attr.path().is_ident("hasherize") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    let value: LitStr = meta.value()?.parse()?;
                    key = value.value();
                } else if meta.path.is_ident("object") {
                    object = true;
                } else if meta.path.is_ident("skip") {
                    skip = true;
                } else {
                    return Err(meta.error("unknown hasherize attribute (expected rename, object or skip)"));
                }
                Ok(())
            })?;
        }

        if skip {
            if object {
                return Err(syn::Error::new_spanned(
                    field_ident,
                    "`skip` and `object` are mutually exclusive",
                ));
            }
            build_fields.push(quote! {
                #field_ident: ::core::default::Default::default()
            });
            continue;
        }

        if object {
            let (read, build, declare) = match object_shape(field_ty) {
                ObjectShape::Single(inner) => (
                    quote! { ::hasherize::FieldRef::object(&self.#field_ident) },
                    quote! { __fields.take_object(#key)? },
                    quote! { registry.declare::<Self>([#key]).object::<#inner>(); },
                ),
                ObjectShape::Optional(inner) => (
                    quote! { ::hasherize::FieldRef::optional_object(self.#field_ident.as_ref()) },
                    quote! { __fields.take_optional_object(#key)? },
                    quote! { registry.declare::<Self>([#key]).object::<#inner>(); },
                ),
                ObjectShape::List(inner) => (
                    quote! { ::hasherize::FieldRef::objects(&self.#field_ident) },
                    quote! { __fields.take_objects(#key)? },
                    quote! { registry.declare::<Self>([#key]).collection::<#inner>(); },
                ),
            };
            read_arms.push(quote! { #key => ::core::result::Result::Ok(#read), });
            build_fields.push(quote! { #field_ident: #build });
            declarations.push(declare);
        } else {
            read_arms.push(quote! {
                #key => ::hasherize::FieldRef::serialize(&self.#field_ident),
            });
            build_fields.push(quote! { #field_ident: __fields.take(#key)? });
            declarations.push(quote! { registry.declare::<Self>([#key]); });
        }
        field_names.push(key);
    }

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let expanded = quote! {
        impl #impl_generics ::hasherize::Hasherize for #name #ty_generics #where_clause {
            fn read_field(
                &self,
                __name: &str,
            ) -> ::core::result::Result<::hasherize::FieldRef<'_>, ::hasherize::HashError> {
                match __name {
                    #(#read_arms)*
                    _ => ::core::result::Result::Err(::hasherize::HashError::UnreadableField {
                        type_name: #name_str.to_string(),
                        field: __name.to_string(),
                    }),
                }
            }

            #[allow(unused_mut)]
            fn from_fields(
                mut __fields: ::hasherize::Fields,
            ) -> ::core::result::Result<Self, ::hasherize::HashError> {
                ::core::result::Result::Ok(Self {
                    #(#build_fields),*
                })
            }
        }

        impl #impl_generics #name #ty_generics #where_clause {
            pub fn hasherize_fields() -> &'static [&'static str] {
                &[#(#field_names),*]
            }

            pub fn hasherize_declare(registry: &mut ::hasherize::Registry) {
                #(#declarations)*
            }
        }
    };

    Ok(TokenStream::from(expanded))
}

/// Classify an `object` field by the last path segment of its type.
fn object_shape(ty: &Type) -> ObjectShape<'_> {
    let Type::Path(type_path) = ty else {
        return ObjectShape::Single(ty);
    };
    let Some(segment) = type_path.path.segments.last() else {
        return ObjectShape::Single(ty);
    };
    let inner = match &segment.arguments {
        PathArguments::AngleBracketed(args) => args.args.iter().find_map(|arg| match arg {
            GenericArgument::Type(inner) => Some(inner),
            _ => None,
        }),
        _ => None,
    };
    match (segment.ident.to_string().as_str(), inner) {
        ("Vec", Some(inner)) => ObjectShape::List(inner),
        ("Option", Some(inner)) => ObjectShape::Optional(inner),
        _ => ObjectShape::Single(ty),
    }
}
