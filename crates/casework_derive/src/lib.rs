//! Registration macros for casework test variants.
//!
//! These macros generate the glue a variant needs to be registered and discovered:
//! - `CaseState`: implements `casework::CaseState` (variant name, context construction and access)
//! - `suite`: implements `casework::TestCase` from an inherent `impl` block, listing its own declared methods

use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::{
    Data, DeriveInput, Error, Fields, FnArg, ImplItem, ImplItemFn, ItemImpl, ReturnType, Type, parse_macro_input,
};

/// Names of the lifecycle hooks; these are forwarded to the trait, never listed as methods.
const SET_UP: &str = "set_up";
const TEAR_DOWN: &str = "tear_down";
/// Methods with this prefix are tests and must have a runnable shape.
const TEST_PREFIX: &str = "test";

/// Implements `casework::CaseState` for a struct holding a `CaseContext`.
///
/// The context field is the one marked `#[case(context)]`, or else the single field whose type is named
/// `CaseContext`. Every other field is built with `Default::default()`.
///
/// # Example
/// ```ignore
/// #[derive(CaseState)]
/// struct NetworkTests {
///     cx: CaseContext,
///     attempts: usize,
/// }
///
/// // Generates:
/// impl casework::CaseState for NetworkTests {
///     fn variant_name() -> &'static str { "NetworkTests" }
///     fn with_context(context: casework::CaseContext) -> Self {
///         Self { cx: context, attempts: Default::default() }
///     }
///     fn context(&mut self) -> &mut casework::CaseContext { &mut self.cx }
/// }
/// ```
#[proc_macro_derive(CaseState, attributes(case))]
pub fn derive_case_state(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_case_state(&input).unwrap_or_else(Error::into_compile_error).into()
}

fn expand_case_state(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let name_str = name.to_string();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(Error::new_spanned(
                    name,
                    "CaseState can only be derived for structs with named fields",
                ));
            }
        },
        _ => return Err(Error::new_spanned(name, "CaseState can only be derived for structs")),
    };

    let marked: Vec<_> = fields.iter().filter(|f| has_context_marker(f)).collect();
    let context_field = match marked.as_slice() {
        [field] => *field,
        [] => {
            let by_type: Vec<_> = fields.iter().filter(|f| is_case_context(&f.ty)).collect();
            match by_type.as_slice() {
                [field] => *field,
                [] => {
                    return Err(Error::new_spanned(
                        name,
                        "CaseState needs a `CaseContext` field (or one marked `#[case(context)]`)",
                    ));
                }
                _ => {
                    return Err(Error::new_spanned(
                        name,
                        "several `CaseContext` fields; mark the one to use with `#[case(context)]`",
                    ));
                }
            }
        }
        _ => return Err(Error::new_spanned(name, "only one field may be marked `#[case(context)]`")),
    };

    // Named fields always carry an ident.
    let context_ident = context_field
        .ident
        .as_ref()
        .ok_or_else(|| Error::new(Span::call_site(), "unnamed context field"))?;

    let initializers = fields.iter().filter_map(|f| {
        let ident = f.ident.as_ref()?;
        if ident == context_ident {
            Some(quote! { #ident: context })
        } else {
            Some(quote! { #ident: ::core::default::Default::default() })
        }
    });

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::casework::CaseState for #name #ty_generics #where_clause {
            fn variant_name() -> &'static str {
                #name_str
            }

            fn with_context(context: ::casework::CaseContext) -> Self {
                Self { #(#initializers),* }
            }

            fn context(&mut self) -> &mut ::casework::CaseContext {
                &mut self.#context_ident
            }
        }
    })
}

fn has_context_marker(field: &syn::Field) -> bool {
    field.attrs.iter().any(|attr| {
        attr.path().is_ident("case")
            && attr
                .parse_args::<syn::Ident>()
                .is_ok_and(|arg| arg == "context")
    })
}

fn is_case_context(ty: &Type) -> bool {
    match ty {
        Type::Path(path) => path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == "CaseContext"),
        _ => false,
    }
}

/// Implements `casework::TestCase` from an inherent `impl` block.
///
/// Every method in the block shaped `fn name(&mut self)` or `fn name(&self)` (no other arguments, no return value,
/// not async, not generic) is listed in declaration order; discovery later keeps the ones whose name starts with
/// `test`. Methods named `set_up` / `tear_down` become the lifecycle hooks instead. A `test*` method or hook of any
/// other shape is a compile error. Only the methods written in this block are listed, so a type that wraps or derefs
/// to another variant does not inherit its tests.
///
/// # Example
/// ```ignore
/// #[suite]
/// impl NetworkTests {
///     fn set_up(&mut self) { /* ... */ }
///     fn test_fetch(&mut self) { /* ... */ }
///     fn helper(&mut self) { /* listed, but not a test */ }
/// }
/// ```
#[proc_macro_attribute]
pub fn suite(args: TokenStream, input: TokenStream) -> TokenStream {
    let args = proc_macro2::TokenStream::from(args);
    if !args.is_empty() {
        return Error::new_spanned(args, "#[suite] takes no arguments")
            .into_compile_error()
            .into();
    }
    let item = parse_macro_input!(input as ItemImpl);
    expand_suite(&item).unwrap_or_else(Error::into_compile_error).into()
}

fn expand_suite(item: &ItemImpl) -> syn::Result<proc_macro2::TokenStream> {
    if let Some((_, path, _)) = &item.trait_ {
        return Err(Error::new_spanned(path, "#[suite] goes on an inherent impl block, not a trait impl"));
    }

    let self_ty = &item.self_ty;
    let mut hooks = Vec::new();
    let mut methods = Vec::new();

    for impl_item in &item.items {
        let ImplItem::Fn(method) = impl_item else {
            continue;
        };
        let ident = &method.sig.ident;
        let name = ident.to_string();
        let is_hook = name == SET_UP || name == TEAR_DOWN;
        let receiver = match method_shape(method) {
            Some(receiver) => receiver,
            // A misshapen helper is fine; a misshapen test or hook would silently never run.
            None if is_hook || name.starts_with(TEST_PREFIX) => {
                return Err(Error::new_spanned(
                    &method.sig,
                    format!("`{name}` must be `fn {name}(&mut self)` or `fn {name}(&self)` with no return value"),
                ));
            }
            None => continue,
        };
        if is_hook {
            hooks.push(quote! {
                fn #ident(&mut self) {
                    <#self_ty>::#ident(self)
                }
            });
        } else {
            methods.push(match receiver {
                Receiver::Mut => quote! {
                    ::casework::TestMethod::new(#name, <#self_ty>::#ident)
                },
                Receiver::Shared => quote! {
                    ::casework::TestMethod::new(#name, |case: &mut Self| <#self_ty>::#ident(case))
                },
            });
        }
    }

    let (impl_generics, _, where_clause) = item.generics.split_for_impl();

    Ok(quote! {
        #item

        impl #impl_generics ::casework::TestCase for #self_ty #where_clause {
            #(#hooks)*

            fn declared_methods() -> ::std::vec::Vec<::casework::TestMethod<Self>> {
                ::std::vec![#(#methods),*]
            }
        }
    })
}

/// How a listed method borrows the variant.
enum Receiver {
    Mut,
    Shared,
}

/// `fn name(&mut self)` or `fn name(&self)` with nothing else: no arguments, no return value, not async, not
/// generic. Anything else is `None`.
fn method_shape(method: &ImplItemFn) -> Option<Receiver> {
    let sig = &method.sig;
    let receiver = match sig.inputs.first() {
        Some(FnArg::Receiver(receiver)) if receiver.reference.is_some() => {
            if receiver.mutability.is_some() {
                Receiver::Mut
            } else {
                Receiver::Shared
            }
        }
        _ => return None,
    };
    let returns_unit = match &sig.output {
        ReturnType::Default => true,
        ReturnType::Type(_, ty) => matches!(&**ty, Type::Tuple(tuple) if tuple.elems.is_empty()),
    };
    let plain = sig.inputs.len() == 1
        && returns_unit
        && sig.asyncness.is_none()
        && sig.generics.params.is_empty()
        && sig.variadic.is_none();
    plain.then_some(receiver)
}
