//! Uniquely owned objects.
use crate::wrapper_types::WrapperType;

/// An object with a single owner.
///
/// Ownership is expressed with [`OwnPtr`]. Borrowed access, that does not transfer ownership,
/// is expressed with [`RawPtr`].
pub trait BaseScoped {
    /// Returns the type of the wrapper if the object is a proxy for a structure received from
    /// the other side of the boundary.
    fn wrapper_type(&self) -> Option<WrapperType> {
        None
    }
}

/// An owning pointer to a scoped object.
pub type OwnPtr<T> = Box<T>;

/// A borrowed pointer to a scoped object.
pub type RawPtr<'a, T> = &'a T;
