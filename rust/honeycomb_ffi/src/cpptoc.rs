//! Wrappers exposing local objects to the other side of the boundary.
//!
//! A local object is wrapped into a heap allocated block that embeds the C structure handed
//! across the boundary as its last member. Calls made by the other side through the function
//! pointers of the structure receive a pointer to the structure, from which the block, and
//! with it the local object, is recovered by subtracting the fixed offset of the structure
//! inside the block.
//!
//! ```text
//! +--------------+--------+---------+-----------+
//! | wrapper type | object | wrapper | structure |
//! +--------------+--------+---------+-----------+
//!                                   ^ handed to the other side
//! ```
mod ref_counted;
mod scoped;

pub use ref_counted::{CppToCRefCounted, CppToCRefCountedWrapper};
pub use scoped::{CppToCScoped, CppToCScopedWrapper, RawWrapper};
