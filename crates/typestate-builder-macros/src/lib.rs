extern crate proc_macro;

use proc_macro::TokenStream;

/// Derive macro that generates a typestate builder for structs.
///
/// Usage:
/// ```ignore
/// #[derive(Builder)]
/// pub struct Request<'a> {
///     pub url: &'a str,
///     pub depth: u32,
///     pub label: Option<&'a str>,
///     #[builder(value = 3)]
///     pub retries: u32,
///     #[builder(each = "header")]
///     pub headers: Vec<String>,
/// }
/// ```
///
/// This generates:
/// - `RequestBuilder<'a, const URL_SET: bool, const DEPTH_SET: bool>` – one
///   distinct builder type per combination of already-set required fields.
/// - `Request::builder()` – entry point at the all-unset combination, with
///   `label` absent, `retries` pre-populated with `3`, and `headers` empty.
/// - one consuming setter per field: `url` and `depth` move the builder to
///   the successor combination (setting them again overwrites the value and
///   keeps the combination); `label`, `retries`, and `header` keep it.
/// - `finalize` – defined only on the all-set combination, returns the
///   finished `Request`. Calling it while a required field is unset is a
///   missing-method type error, never a runtime failure.
#[proc_macro_derive(Builder, attributes(builder))]
pub fn derive_builder(input: TokenStream) -> TokenStream {
    emit::derive(input.into()).into()
}

mod emit;
mod lattice;
mod schema;
