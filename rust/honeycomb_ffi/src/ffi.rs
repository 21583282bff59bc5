//! Raw C ABI of the structures exchanged across the boundary.
//!
//! Every structure begins with a `size` field holding its size in bytes, as known by the side
//! that allocated it, followed by the members of its base structure. Interface structures
//! nest their base as the first member, so that a pointer to the derived structure is also a
//! valid pointer to each of its bases.
//!
//! Members added in newer revisions of an interface are appended to its end. Before calling an
//! optional member, its presence must be checked with [`member_exists!`](crate::member_exists)
//! or [`member_missing!`](crate::member_missing).
use static_assertions::{assert_eq_align, assert_eq_size, const_assert_eq};
use std::{ffi::c_int, mem::MaybeUninit, ptr::NonNull};

/// Base structure of all reference counted structures.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawBaseRefCounted {
    /// Size of the structure in bytes.
    pub size: usize,
    /// Increments the reference count.
    pub add_ref: Option<unsafe extern "C" fn(this: *mut RawBaseRefCounted)>,
    /// Decrements the reference count.
    ///
    /// Returns `1` if the resulting count is zero.
    pub release: Option<unsafe extern "C" fn(this: *mut RawBaseRefCounted) -> c_int>,
    /// Returns `1` if the current reference count is exactly one.
    pub has_one_ref: Option<unsafe extern "C" fn(this: *mut RawBaseRefCounted) -> c_int>,
    /// Returns `1` if the current reference count is at least one.
    pub has_at_least_one_ref: Option<unsafe extern "C" fn(this: *mut RawBaseRefCounted) -> c_int>,
}

/// Base structure of all scoped structures.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawBaseScoped {
    /// Size of the structure in bytes.
    pub size: usize,
    /// Deletes the object.
    ///
    /// Only present if ownership of the object was transferred with the structure.
    pub del: Option<unsafe extern "C" fn(this: *mut RawBaseScoped)>,
}

assert_eq_size!(RawBaseRefCounted, [usize; 5]);
assert_eq_align!(RawBaseRefCounted, usize);
assert_eq_size!(RawBaseScoped, [usize; 2]);
assert_eq_align!(RawBaseScoped, usize);
const_assert_eq!(std::mem::offset_of!(RawBaseRefCounted, size), 0);
const_assert_eq!(std::mem::offset_of!(RawBaseScoped, size), 0);

/// A structure that can be exchanged across the boundary.
///
/// # Safety
///
/// The type must be `#[repr(C)]`, must not exceed the alignment of a pointer, and the all-zero
/// bit pattern must be a valid instance of it.
pub unsafe trait RawStruct: Sized + Send + 'static {
    /// Returns an instance with all members set to zero.
    fn zeroed() -> Self {
        // Safety: Guaranteed by the implementor.
        unsafe { MaybeUninit::zeroed().assume_init() }
    }
}

/// A structure deriving from [`RawBaseRefCounted`].
///
/// # Safety
///
/// In addition to the requirements of [`RawStruct`], the first member of the type must be a
/// [`RawBaseRefCounted`] or another structure implementing this trait.
pub unsafe trait RefCountedStruct: RawStruct {}

/// A structure deriving from [`RawBaseScoped`].
///
/// # Safety
///
/// In addition to the requirements of [`RawStruct`], the first member of the type must be a
/// [`RawBaseScoped`] or another structure implementing this trait.
pub unsafe trait ScopedStruct: RawStruct {}

// Safety: `RawBaseRefCounted` consists of an integer and optional function pointers.
unsafe impl RawStruct for RawBaseRefCounted {}

// Safety: Trivially starts with itself.
unsafe impl RefCountedStruct for RawBaseRefCounted {}

// Safety: `RawBaseScoped` consists of an integer and an optional function pointer.
unsafe impl RawStruct for RawBaseScoped {}

// Safety: Trivially starts with itself.
unsafe impl ScopedStruct for RawBaseScoped {}

/// Returns a pointer to the [`RawBaseRefCounted`] of a structure.
pub fn base_ref_counted<S: RefCountedStruct>(s: NonNull<S>) -> NonNull<RawBaseRefCounted> {
    s.cast()
}

/// Returns a pointer to the [`RawBaseScoped`] of a structure.
pub fn base_scoped<S: ScopedStruct>(s: NonNull<S>) -> NonNull<RawBaseScoped> {
    s.cast()
}

/// Reads the `size` member of a structure.
///
/// # Safety
///
/// `s` must point to a live structure beginning with a `size` member.
pub unsafe fn struct_size<S>(s: NonNull<S>) -> usize {
    // Safety: Guaranteed by the caller.
    unsafe { s.cast::<usize>().read() }
}

/// # Safety
///
/// `s` must point to a live structure, and `member` must point into the same allocation.
#[doc(hidden)]
pub unsafe fn __member_exists<S, F>(s: NonNull<S>, member: *const F) -> bool {
    let offset = member.addr() - s.as_ptr().addr();
    // Safety: Guaranteed by the caller.
    offset + size_of::<F>() <= unsafe { struct_size(s) }
}

/// Checks whether a member is contained in a structure.
///
/// The check uses the `size` member recorded by the side that allocated the structure, so
/// that members appended in a newer revision of the interface are reported as absent when the
/// structure originates from an older revision.
///
/// The structure pointer must be a live [`NonNull`] structure pointer.
///
/// # Examples
///
/// ```
/// use honeycomb_ffi::{ffi::RawBaseRefCounted, member_exists};
/// use std::ptr::NonNull;
///
/// let mut base = RawBaseRefCounted {
///     size: std::mem::offset_of!(RawBaseRefCounted, has_one_ref),
///     add_ref: None,
///     release: None,
///     has_one_ref: None,
///     has_at_least_one_ref: None,
/// };
/// let ptr = NonNull::from(&mut base);
/// assert!(member_exists!(ptr, release));
/// assert!(!member_exists!(ptr, has_one_ref));
/// ```
#[macro_export]
macro_rules! member_exists {
    ($s:expr, $($member:ident).+) => {{
        let s: ::core::ptr::NonNull<_> = $s;
        // Safety: The caller guarantees that `s` points to a live structure.
        unsafe {
            $crate::ffi::__member_exists(
                s,
                ::core::ptr::addr_of!((*s.as_ptr()).$($member).+),
            )
        }
    }};
}

/// Checks whether a function member is absent from a structure or set to null.
///
/// See [`member_exists!`](crate::member_exists).
#[macro_export]
macro_rules! member_missing {
    ($s:expr, $($member:ident).+) => {{
        let s: ::core::ptr::NonNull<_> = $s;
        !$crate::member_exists!(s, $($member).+)
            // Safety: The member is contained in the structure.
            || unsafe { (*s.as_ptr()).$($member).+ }.is_none()
    }};
}
