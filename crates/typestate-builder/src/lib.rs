//! Typestate builders for structs.
//!
//! `#[derive(Builder)]` generates a companion builder whose type tracks
//! which required fields have already been set, one `const _: bool`
//! parameter per required field. `finalize` is only defined once every
//! required field has a value, so an incomplete construction is a type
//! error instead of a runtime failure.
//!
//! Field roles are inferred from the declaration:
//!
//! - plain fields are **required**;
//! - `Option<T>` fields are **optional** (absent unless set; the setter
//!   takes `T`);
//! - `#[builder(value = <expr>)]` fields are **defaulted** (pre-populated,
//!   overridable);
//! - `#[builder(each = "<name>")]` fields are **repeated** (one element per
//!   call of the named setter, in call order).
//!
//! # Example
//!
//! ```
//! use typestate_builder::Builder;
//!
//! #[derive(Debug, PartialEq, Builder)]
//! pub struct Request {
//!     pub url: String,
//!     pub depth: u32,
//!     pub label: Option<String>,
//!     #[builder(value = 3)]
//!     pub retries: u32,
//!     #[builder(each = "header")]
//!     pub headers: Vec<String>,
//! }
//!
//! let request = Request::builder()
//!     .url(String::from("https://example.com"))
//!     .depth(2)
//!     .header(String::from("accept: text/html"))
//!     .finalize()
//!     .unwrap();
//!
//! assert_eq!(request.retries, 3);
//! assert_eq!(request.label, None);
//! assert_eq!(request.headers.len(), 1);
//! ```
//!
//! Leaving `url` unset and calling `finalize` does not compile: the method
//! simply does not exist on that builder state.

pub use typestate_builder_macros::Builder;
