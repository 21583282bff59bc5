//! Object wrappers for the Honeycomb C API boundary.
//!
//! Objects cross the boundary as plain C structures of function pointers. This crate
//! implements both directions of that translation:
//!
//! - [`cpptoc`]: wraps a local object into a structure that the other side can call into.
//! - [`ctocpp`]: wraps a structure received from the other side into a local object.
//!
//! Each direction comes in a reference counted flavor, for objects implementing
//! [`BaseRefCounted`](ref_count::BaseRefCounted), and a scoped flavor, for uniquely owned
//! objects implementing [`BaseScoped`](scoped::BaseScoped).
#![warn(missing_docs, rust_2018_idioms, rustdoc::broken_intra_doc_links)]

#[macro_use]
mod macros;

pub mod config;
pub mod error;
pub mod ffi;
pub mod panic;
pub mod ref_count;
pub mod scoped;
pub mod shutdown;
pub mod wrapper_types;

pub mod cpptoc;
pub mod ctocpp;


pub use ref_count::{BaseRefCounted, RefCount, RefPtr};
pub use scoped::{BaseScoped, OwnPtr, RawPtr};
pub use wrapper_types::WrapperType;
