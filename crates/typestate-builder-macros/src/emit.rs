//! Emission of the builder type, its per-state impls, and `finalize`.
//!
//! Every required field contributes one `const _: bool` parameter to the
//! generated builder, so each lattice point is a distinct Rust type. Setter
//! availability is then ordinary method resolution: required setters are
//! emitted per point with the successor instantiation as their return type,
//! and `finalize` exists only on the all-`true` instantiation.

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{DeriveInput, GenericParam, Generics, Ident, parse2};

use crate::lattice::{LatticePoint, StateLattice};
use crate::schema::{FieldRole, RecordSchema};

/// Entry point for the derive macro.
pub fn derive(input: TokenStream) -> TokenStream {
    let input: DeriveInput = match parse2(input) {
        Ok(ast) => ast,
        Err(e) => return e.to_compile_error(),
    };

    match generate(&input) {
        Ok(tokens) => tokens,
        Err(e) => e.to_compile_error(),
    }
}

/// Generates the builder type and associated impls.
pub fn generate(input: &DeriveInput) -> syn::Result<TokenStream> {
    let schema = RecordSchema::from_derive_input(input)?;
    let rank = schema.required().len();
    if rank > StateLattice::MAX_RANK {
        return Err(syn::Error::new(
            schema.name.span(),
            format!(
                "Builder supports at most {} required fields, found {rank}",
                StateLattice::MAX_RANK
            ),
        ));
    }
    let lattice = StateLattice::new(rank);
    let emitter = Emitter::new(&schema, lattice);

    let builder_struct = emitter.builder_struct();
    let entry_point = emitter.entry_point();
    let state_impls = emitter.state_impls();
    let shared_setters = emitter.shared_setters();
    let finalize = emitter.finalize_impl();

    Ok(quote! {
        #builder_struct
        #entry_point
        #(#state_impls)*
        #shared_setters
        #finalize
    })
}

struct Emitter<'a> {
    schema: &'a RecordSchema,
    lattice: StateLattice,
    builder_name: Ident,
    /// The struct's generics plus one `const _: bool` parameter per
    /// required field, in declared order.
    builder_generics: Generics,
    /// The struct's own generic parameters as arguments (`'a`, `T`, ...).
    base_args: Vec<TokenStream>,
    phantom_decls: Vec<TokenStream>,
    phantom_inits: Vec<TokenStream>,
}

impl<'a> Emitter<'a> {
    fn new(schema: &'a RecordSchema, lattice: StateLattice) -> Self {
        let builder_name = format_ident!("{}Builder", schema.name);

        let mut builder_generics = schema.generics.clone();
        for field in schema.required() {
            let param = const_param_ident(&field.name);
            builder_generics
                .params
                .push(syn::parse_quote! { const #param: bool });
        }

        let base_args = schema
            .generics
            .params
            .iter()
            .map(|param| match param {
                GenericParam::Lifetime(lt) => {
                    let lifetime = &lt.lifetime;
                    quote! { #lifetime }
                }
                GenericParam::Type(ty) => {
                    let ident = &ty.ident;
                    quote! { #ident }
                }
                GenericParam::Const(c) => {
                    let ident = &c.ident;
                    quote! { #ident }
                }
            })
            .collect();

        // PhantomData keeps lifetime parameters alive in builder states where
        // no stored field mentions them yet.
        let phantom_decls = schema
            .generics
            .params
            .iter()
            .filter_map(|param| {
                if let GenericParam::Lifetime(lt) = param {
                    let lifetime = &lt.lifetime;
                    let name = format_ident!("_phantom_{}", lifetime.ident);
                    Some(quote! { #name: ::core::marker::PhantomData<&#lifetime ()> })
                } else {
                    None
                }
            })
            .collect();
        let phantom_inits = schema
            .generics
            .params
            .iter()
            .filter_map(|param| {
                if let GenericParam::Lifetime(lt) = param {
                    let name = format_ident!("_phantom_{}", lt.lifetime.ident);
                    Some(quote! { #name: ::core::marker::PhantomData })
                } else {
                    None
                }
            })
            .collect();

        Self {
            schema,
            lattice,
            builder_name,
            builder_generics,
            base_args,
            phantom_decls,
            phantom_inits,
        }
    }

    /// The builder type instantiated at `point`.
    fn builder_ty_at(&self, point: LatticePoint) -> TokenStream {
        let name = &self.builder_name;
        let mut args = self.base_args.clone();
        for index in 0..self.lattice.rank() {
            let flag = point.is_set(index);
            args.push(quote! { #flag });
        }
        if args.is_empty() {
            quote! { #name }
        } else {
            quote! { #name<#(#args),*> }
        }
    }

    /// Generate the builder struct definition. All fields are stored in
    /// every state; only the operation set varies by state.
    fn builder_struct(&self) -> TokenStream {
        let vis = &self.schema.vis;
        let builder_name = &self.builder_name;
        let (impl_generics, _ty_generics, where_clause) = self.builder_generics.split_for_impl();

        let builder_fields = self.schema.fields.iter().map(|field| {
            let name = &field.name;
            let ty = &field.ty;
            match &field.role {
                FieldRole::Required => quote! { #name: ::core::option::Option<#ty> },
                // Optional fields already carry their own `Option`; defaulted
                // and repeated fields always hold a value.
                FieldRole::Optional(_) | FieldRole::Defaulted(_) | FieldRole::Repeated { .. } => {
                    quote! { #name: #ty }
                }
            }
        });
        let phantom_decls = &self.phantom_decls;

        quote! {
            #[derive(Clone)]
            #vis struct #builder_name #impl_generics #where_clause {
                #(#builder_fields,)*
                #(#phantom_decls,)*
            }
        }
    }

    /// Generate the `::builder()` method on the original struct, returning
    /// the all-unset instantiation.
    fn entry_point(&self) -> TokenStream {
        let record = &self.schema.name;
        let builder_name = &self.builder_name;
        let (impl_generics, ty_generics, where_clause) = self.schema.generics.split_for_impl();
        let initial_ty = self.builder_ty_at(self.lattice.initial());

        let field_inits = self.schema.fields.iter().map(|field| {
            let name = &field.name;
            match &field.role {
                FieldRole::Required | FieldRole::Optional(_) => {
                    quote! { #name: ::core::option::Option::None }
                }
                FieldRole::Defaulted(expr) => quote! { #name: #expr },
                FieldRole::Repeated { .. } => {
                    let ty = &field.ty;
                    quote! { #name: <#ty>::new() }
                }
            }
        });
        let phantom_inits = &self.phantom_inits;

        quote! {
            impl #impl_generics #record #ty_generics #where_clause {
                /// Create a builder with every field in its initial state.
                #[must_use]
                pub fn builder() -> #initial_ty {
                    #builder_name {
                        #(#field_inits,)*
                        #(#phantom_inits,)*
                    }
                }
            }
        }
    }

    /// Generate one impl block per lattice point carrying the required-field
    /// setters. Each setter consumes the builder and returns the successor
    /// instantiation; on an already-set field that successor is the same
    /// type and the previous value is overwritten.
    fn state_impls(&self) -> Vec<TokenStream> {
        let required = self.schema.required();
        if required.is_empty() {
            return Vec::new();
        }
        let (impl_generics, _ty_generics, where_clause) = self.schema.generics.split_for_impl();

        self.lattice
            .points()
            .map(|point| {
                let self_ty = self.builder_ty_at(point);
                let setters = required.iter().enumerate().map(|(index, field)| {
                    let name = &field.name;
                    let ty = &field.ty;
                    let successor_ty =
                        self.builder_ty_at(self.lattice.successor(point, index));
                    let rebuild = self.rebuild_literal();
                    quote! {
                        #[must_use]
                        pub fn #name(mut self, value: #ty) -> #successor_ty {
                            self.#name = ::core::option::Option::Some(value);
                            #rebuild
                        }
                    }
                });
                quote! {
                    impl #impl_generics #self_ty #where_clause {
                        #(#setters)*
                    }
                }
            })
            .collect()
    }

    /// Moving between instantiations changes the type, so the storage is
    /// rewrapped field by field.
    fn rebuild_literal(&self) -> TokenStream {
        let builder_name = &self.builder_name;
        let moves = self.schema.fields.iter().map(|field| {
            let name = &field.name;
            quote! { #name: self.#name }
        });
        let phantom_inits = &self.phantom_inits;
        quote! {
            #builder_name {
                #(#moves,)*
                #(#phantom_inits,)*
            }
        }
    }

    /// Generate the setters that exist on every lattice point: optional,
    /// defaulted, and repeated fields never change the state.
    fn shared_setters(&self) -> TokenStream {
        let builder_name = &self.builder_name;
        let (impl_generics, ty_generics, where_clause) = self.builder_generics.split_for_impl();

        let setters: Vec<TokenStream> = self
            .schema
            .fields
            .iter()
            .filter_map(|field| {
                let name = &field.name;
                match &field.role {
                    FieldRole::Required => None,
                    FieldRole::Optional(inner) => Some(quote! {
                        #[must_use]
                        pub fn #name(mut self, value: #inner) -> Self {
                            self.#name = ::core::option::Option::Some(value);
                            self
                        }
                    }),
                    FieldRole::Defaulted(_) => {
                        let ty = &field.ty;
                        Some(quote! {
                            #[must_use]
                            pub fn #name(mut self, value: #ty) -> Self {
                                self.#name = value;
                                self
                            }
                        })
                    }
                    FieldRole::Repeated { element, setter } => Some(quote! {
                        #[must_use]
                        pub fn #setter(mut self, value: #element) -> Self {
                            self.#name.push(value);
                            self
                        }
                    }),
                }
            })
            .collect();

        if setters.is_empty() {
            return TokenStream::new();
        }
        quote! {
            impl #impl_generics #builder_name #ty_generics #where_clause {
                #(#setters)*
            }
        }
    }

    /// Generate `finalize` on the terminal instantiation only. Assembling
    /// the record needs no validation: a required field without a value is
    /// unrepresentable here, so that match arm is an emitter defect.
    fn finalize_impl(&self) -> TokenStream {
        let record = &self.schema.name;
        let (impl_generics, ty_generics, where_clause) = self.schema.generics.split_for_impl();
        let terminal_ty = self.builder_ty_at(self.lattice.terminal());

        let field_values = self.schema.fields.iter().map(|field| {
            let name = &field.name;
            match &field.role {
                FieldRole::Required => {
                    let message = format!("field `{name}` unset in terminal builder state");
                    quote! {
                        #name: match self.#name {
                            ::core::option::Option::Some(value) => value,
                            ::core::option::Option::None => ::core::unreachable!(#message),
                        }
                    }
                }
                FieldRole::Optional(_) | FieldRole::Defaulted(_) | FieldRole::Repeated { .. } => {
                    quote! { #name: self.#name }
                }
            }
        });

        quote! {
            impl #impl_generics #terminal_ty #where_clause {
                /// Consume the builder and assemble the finished value.
                pub fn finalize(
                    self,
                ) -> ::core::result::Result<#record #ty_generics, ::core::convert::Infallible> {
                    ::core::result::Result::Ok(#record {
                        #(#field_values,)*
                    })
                }
            }
        }
    }
}

/// `bar` → `BAR_SET`. The suffix keeps the const parameters clear of user
/// type-parameter names.
fn const_param_ident(field: &Ident) -> Ident {
    let upper = field.to_string().trim_start_matches("r#").to_uppercase();
    format_ident!("{}_SET", upper)
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::{File, ImplItem, Item, ItemImpl, ReturnType, Type, parse_quote};

    fn expand(input: &DeriveInput) -> File {
        let tokens = generate(input).expect("expansion succeeds");
        syn::parse2(tokens).expect("emitted code parses")
    }

    fn impls(file: &File) -> Vec<&ItemImpl> {
        file.items
            .iter()
            .filter_map(|item| match item {
                Item::Impl(item_impl) => Some(item_impl),
                _ => None,
            })
            .collect()
    }

    fn impl_for<'f>(file: &'f File, self_ty: &Type) -> &'f ItemImpl {
        impls(file)
            .into_iter()
            .find(|item| *item.self_ty == *self_ty)
            .expect("impl block for type")
    }

    fn method<'i>(item: &'i ItemImpl, name: &str) -> &'i syn::ImplItemFn {
        item.items
            .iter()
            .find_map(|item| match item {
                ImplItem::Fn(f) if f.sig.ident == name => Some(f),
                _ => None,
            })
            .expect("method present")
    }

    fn finalize_count(file: &File) -> usize {
        impls(file)
            .iter()
            .flat_map(|item| &item.items)
            .filter(|item| matches!(item, ImplItem::Fn(f) if f.sig.ident == "finalize"))
            .count()
    }

    fn finalize_impl<'f>(file: &'f File) -> &'f ItemImpl {
        impls(file)
            .into_iter()
            .find(|item| {
                item.items
                    .iter()
                    .any(|i| matches!(i, ImplItem::Fn(f) if f.sig.ident == "finalize"))
            })
            .expect("finalize impl present")
    }

    #[test]
    fn two_required_fields_emit_the_full_lattice() {
        let input: DeriveInput = parse_quote! {
            struct Record {
                bar: u32,
                baz: u32,
                qux: Option<u32>,
            }
        };
        let file = expand(&input);
        // struct + entry + 2^2 state impls + shared setters + terminal
        assert_eq!(file.items.len(), 8);
        assert_eq!(impls(&file).len(), 7);
        assert_eq!(finalize_count(&file), 1);
    }

    #[test]
    fn finalize_lives_on_the_all_set_instantiation() {
        let input: DeriveInput = parse_quote! {
            struct Record {
                bar: u32,
                baz: u32,
            }
        };
        let file = expand(&input);
        let terminal: Type = parse_quote!(RecordBuilder<true, true>);
        assert_eq!(*finalize_impl(&file).self_ty, terminal);
    }

    #[test]
    fn required_setter_returns_the_successor_instantiation() {
        let input: DeriveInput = parse_quote! {
            struct Record {
                bar: u32,
                baz: u32,
            }
        };
        let file = expand(&input);
        let initial: Type = parse_quote!(RecordBuilder<false, false>);
        let setter = method(impl_for(&file, &initial), "baz");
        let ReturnType::Type(_, ty) = &setter.sig.output else {
            panic!("setter returns a type");
        };
        let expected: Type = parse_quote!(RecordBuilder<false, true>);
        assert_eq!(**ty, expected);
    }

    #[test]
    fn required_setter_on_set_field_is_a_self_loop() {
        let input: DeriveInput = parse_quote! {
            struct Record {
                bar: u32,
            }
        };
        let file = expand(&input);
        let terminal: Type = parse_quote!(RecordBuilder<true>);
        let setter = method(impl_for(&file, &terminal), "bar");
        let ReturnType::Type(_, ty) = &setter.sig.output else {
            panic!("setter returns a type");
        };
        assert_eq!(**ty, terminal);
    }

    #[test]
    fn rank_zero_has_finalize_on_the_sole_variant() {
        let input: DeriveInput = parse_quote! {
            struct Record {
                qux: Option<u32>,
                #[builder(value = 1)]
                quxx: u32,
            }
        };
        let file = expand(&input);
        assert_eq!(finalize_count(&file), 1);
        let sole: Type = parse_quote!(RecordBuilder);
        assert_eq!(*finalize_impl(&file).self_ty, sole);
    }

    #[test]
    fn repeated_setter_is_named_by_the_attribute() {
        let input: DeriveInput = parse_quote! {
            struct Record {
                #[builder(each = "arg")]
                args: Vec<String>,
            }
        };
        let file = expand(&input);
        let sole: Type = parse_quote!(RecordBuilder);
        let item = impl_for(&file, &sole);
        method(item, "arg");
        assert!(
            !item
                .items
                .iter()
                .any(|i| matches!(i, ImplItem::Fn(f) if f.sig.ident == "args")),
            "repeated field must not get a whole-collection setter"
        );
    }

    #[test]
    fn generics_are_carried_onto_the_builder() {
        let input: DeriveInput = parse_quote! {
            struct Wrapper<'a, T>
            where
                T: Clone,
            {
                value: T,
                tag: Option<&'a str>,
            }
        };
        let file = expand(&input);
        let terminal: Type = parse_quote!(WrapperBuilder<'a, T, true>);
        let item = finalize_impl(&file);
        assert_eq!(*item.self_ty, terminal);
        assert!(item.generics.where_clause.is_some());
    }

    #[test]
    fn conflicting_attributes_abort_expansion() {
        let input: DeriveInput = parse_quote! {
            struct Record {
                #[builder(value = Vec::new(), each = "item")]
                items: Vec<u32>,
            }
        };
        let err = generate(&input).unwrap_err();
        assert!(err.to_string().contains("conflicting `builder` attributes"));
    }

    #[test]
    fn each_on_scalar_aborts_expansion() {
        let input: DeriveInput = parse_quote! {
            struct Record {
                #[builder(each = "item")]
                total: u32,
            }
        };
        let err = generate(&input).unwrap_err();
        assert!(err.to_string().contains("single-argument container"));
    }

    #[test]
    fn too_many_required_fields_abort_expansion() {
        let fields: String = (0..=StateLattice::MAX_RANK)
            .map(|i| format!("f{i}: u32,"))
            .collect();
        let input: DeriveInput =
            syn::parse_str(&format!("struct Record {{ {fields} }}")).unwrap();
        let err = generate(&input).unwrap_err();
        assert!(err.to_string().contains("at most 32 required fields"));
    }

    #[test]
    fn derive_on_enum_aborts_expansion() {
        let input: DeriveInput = parse_quote! {
            enum Never { A }
        };
        let err = generate(&input).unwrap_err();
        assert!(err.to_string().contains("structs"));
    }

    #[test]
    fn const_param_idents_are_shouted_with_suffix() {
        let ident = const_param_ident(&parse_quote!(bar));
        assert_eq!(ident, "BAR_SET");
    }
}
