//! Intrusive reference counting.
use crate::wrapper_types::WrapperType;
use std::{
    fmt::{Debug, Formatter, Pointer},
    marker::PhantomData,
    ops::Deref,
    ptr::NonNull,
    sync::atomic::{self, AtomicUsize, Ordering},
};

/// A soft limit on the amount of references that may be made to an object.
const MAX_REFCOUNT: usize = (isize::MAX) as usize;

/// A thread-safe reference count.
///
/// Starts at zero. The first [`RefPtr`] taken to the owning object raises it to one.
pub struct RefCount {
    count: AtomicUsize,
}

impl RefCount {
    /// Constructs a new count of zero.
    pub const fn new() -> Self {
        Self {
            count: AtomicUsize::new(0),
        }
    }

    /// Increments the count.
    pub fn add_ref(&self) {
        // Using a relaxed ordering is alright here, as knowledge of the
        // original reference prevents other threads from erroneously deleting
        // the object.
        let old_count = self.count.fetch_add(1, Ordering::Relaxed);

        if old_count > MAX_REFCOUNT {
            std::process::abort();
        }
    }

    /// Decrements the count.
    ///
    /// Returns `true` if this released the last reference, in which case the caller is
    /// responsible for destroying the owning object.
    pub fn release(&self) -> bool {
        let old_count = self.count.fetch_sub(1, Ordering::Release);
        dcheck!(old_count != 0, "reference count underflow");
        if old_count != 1 {
            return false;
        }

        // Synchronizes with all previous releases, so that every use of the object happens
        // before it is destroyed.
        atomic::fence(Ordering::Acquire);
        true
    }

    /// Returns `true` if the count is exactly one.
    pub fn has_one_ref(&self) -> bool {
        self.count.load(Ordering::Acquire) == 1
    }

    /// Returns `true` if the count is at least one.
    pub fn has_at_least_one_ref(&self) -> bool {
        self.count.load(Ordering::Acquire) > 0
    }
}

impl Default for RefCount {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for RefCount {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("RefCount")
            .field(&self.count.load(Ordering::Relaxed))
            .finish()
    }
}

/// An intrusively reference counted object.
///
/// # Safety
///
/// Objects are shared through [`RefPtr`], which reclaims the allocation once
/// [`release`](BaseRefCounted::release) reports that the last reference was given up. An
/// implementor must therefore return `true` from `release` exactly once, when the count drops
/// to zero, and must be allocated in a [`Box`] whenever it is referenced by a [`RefPtr`].
pub unsafe trait BaseRefCounted: Send + Sync {
    /// Increments the reference count.
    fn add_ref(&self);

    /// Decrements the reference count, returning `true` if it reached zero.
    ///
    /// The object must not be used after this returns `true`.
    fn release(&self) -> bool;

    /// Returns `true` if the reference count is exactly one.
    fn has_one_ref(&self) -> bool;

    /// Returns `true` if the reference count is at least one.
    fn has_at_least_one_ref(&self) -> bool;

    /// Returns the type of the wrapper if the object is a proxy for a structure received from
    /// the other side of the boundary.
    fn wrapper_type(&self) -> Option<WrapperType> {
        None
    }
}

/// Implements [`BaseRefCounted`] for a type by delegating to a [`RefCount`] member.
///
/// # Examples
///
/// ```
/// use honeycomb_ffi::{implement_ref_counting, RefCount, RefPtr};
///
/// struct Counter {
///     ref_count: RefCount,
/// }
///
/// implement_ref_counting!(Counter, ref_count);
///
/// let counter = RefPtr::new(Counter { ref_count: RefCount::new() });
/// assert!(counter.ref_count.has_one_ref());
/// ```
#[macro_export]
macro_rules! implement_ref_counting {
    ($ty:ty, $member:ident) => {
        // Safety: `release` reports the last reference exactly once.
        unsafe impl $crate::ref_count::BaseRefCounted for $ty {
            fn add_ref(&self) {
                self.$member.add_ref()
            }

            fn release(&self) -> bool {
                self.$member.release()
            }

            fn has_one_ref(&self) -> bool {
                self.$member.has_one_ref()
            }

            fn has_at_least_one_ref(&self) -> bool {
                self.$member.has_at_least_one_ref()
            }
        }
    };
}

/// Releases a reference to an object, destroying it if it was the last one.
///
/// Returns `true` if the object was destroyed.
///
/// # Safety
///
/// `ptr` must point to a live object allocated in a [`Box`], and the caller must own the
/// reference that is released.
pub unsafe fn release_raw<T: ?Sized + BaseRefCounted>(ptr: NonNull<T>) -> bool {
    // Safety: Guaranteed by the caller.
    let last = unsafe { ptr.as_ref().release() };
    if last {
        // Safety: The last reference was released, so we have exclusive access.
        drop(unsafe { Box::from_raw(ptr.as_ptr()) });
    }
    last
}

/// A strong reference to an intrusively reference counted object.
#[repr(transparent)]
pub struct RefPtr<T: ?Sized + BaseRefCounted> {
    ptr: NonNull<T>,
    _phantom: PhantomData<T>,
}

// Safety: `BaseRefCounted` objects are `Send + Sync`.
unsafe impl<T: ?Sized + BaseRefCounted> Send for RefPtr<T> {}

// Safety: `BaseRefCounted` objects are `Send + Sync`.
unsafe impl<T: ?Sized + BaseRefCounted> Sync for RefPtr<T> {}

impl<T: BaseRefCounted> RefPtr<T> {
    /// Moves the value to the heap and takes the first reference to it.
    pub fn new(value: T) -> Self {
        Self::from_box(Box::new(value))
    }
}

impl<T: ?Sized + BaseRefCounted> RefPtr<T> {
    /// Takes the first reference to a boxed object.
    pub fn from_box(value: Box<T>) -> Self {
        let ptr = NonNull::from(Box::leak(value));
        // Safety: The box is live and leaked into the reference count.
        unsafe { Self::retain(ptr) }
    }

    /// Acquires a new reference to an object.
    ///
    /// # Safety
    ///
    /// `ptr` must point to a live object allocated in a [`Box`].
    pub unsafe fn retain(ptr: NonNull<T>) -> Self {
        // Safety: Guaranteed by the caller.
        unsafe { ptr.as_ref().add_ref() };
        Self {
            ptr,
            _phantom: PhantomData,
        }
    }

    /// Adopts a reference previously leaked with [`RefPtr::into_raw`].
    ///
    /// # Safety
    ///
    /// `ptr` must point to a live object allocated in a [`Box`], and the caller must own one
    /// of its references, which is transferred to the returned handle.
    pub unsafe fn from_raw(ptr: NonNull<T>) -> Self {
        Self {
            ptr,
            _phantom: PhantomData,
        }
    }

    /// Leaks the reference owned by the handle.
    pub fn into_raw(this: Self) -> NonNull<T> {
        let ptr = this.ptr;
        std::mem::forget(this);
        ptr
    }

    /// Returns a pointer to the object without affecting the reference count.
    pub fn as_ptr(this: &Self) -> NonNull<T> {
        this.ptr
    }

    /// Returns `true` if both handles point to the same object.
    pub fn ptr_eq<U: ?Sized + BaseRefCounted>(this: &Self, other: &RefPtr<U>) -> bool {
        this.ptr.cast::<u8>() == other.ptr.cast::<u8>()
    }
}

impl<T: ?Sized + BaseRefCounted> Clone for RefPtr<T> {
    fn clone(&self) -> Self {
        // Safety: We own a reference, so the object is live.
        unsafe { Self::retain(self.ptr) }
    }
}

impl<T: ?Sized + BaseRefCounted> Drop for RefPtr<T> {
    fn drop(&mut self) {
        // Safety: We own a reference.
        unsafe { release_raw(self.ptr) };
    }
}

impl<T: ?Sized + BaseRefCounted> Deref for RefPtr<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        // Safety: We own a reference, so the object is live.
        unsafe { self.ptr.as_ref() }
    }
}

impl<T: ?Sized + BaseRefCounted> Debug for RefPtr<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("RefPtr").field(&self.ptr).finish()
    }
}

impl<T: ?Sized + BaseRefCounted> Pointer for RefPtr<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Pointer::fmt(&self.ptr, f)
    }
}
