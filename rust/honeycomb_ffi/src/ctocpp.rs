//! Proxies for structures received from the other side of the boundary.
//!
//! A proxy is a local object implementing an interface by calling into the function pointers
//! of the structure it wraps. Each proxy class embeds a wrapper struct, holding its tag and
//! the structure pointer, and implements the interface by forwarding to it.
mod ref_counted;
mod scoped;

pub use ref_counted::{CToCppRefCounted, RefCountedWrapperStruct};
pub use scoped::{CToCppScoped, ScopedWrapperStruct};
