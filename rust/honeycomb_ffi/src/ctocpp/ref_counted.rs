use crate::{
    ffi::{self, RawBaseRefCounted, RefCountedStruct},
    ref_count::{BaseRefCounted, RefCount, RefPtr},
    shutdown,
    wrapper_types::WrapperType,
};
use std::ptr::{self, NonNull};

/// State shared by all proxies of reference counted structures.
///
/// The proxy keeps its own reference count. Each of its references holds one reference to
/// the structure, which is released through the base members of the structure.
#[repr(C)]
pub struct RefCountedWrapperStruct<S: RefCountedStruct> {
    wrapper_type: WrapperType,
    structure: NonNull<S>,
    ref_count: RefCount,
}

// Safety: Reference counted structures are thread-safe.
unsafe impl<S: RefCountedStruct> Send for RefCountedWrapperStruct<S> {}

// Safety: Reference counted structures are thread-safe.
unsafe impl<S: RefCountedStruct> Sync for RefCountedWrapperStruct<S> {}

impl<S: RefCountedStruct> RefCountedWrapperStruct<S> {
    /// Constructs the state of a new proxy.
    ///
    /// Does not acquire a reference to the structure.
    pub fn new(wrapper_type: WrapperType, structure: NonNull<S>) -> Self {
        shutdown::assert_not_shutdown();
        Self {
            wrapper_type,
            structure,
            ref_count: RefCount::new(),
        }
    }

    /// Returns the tag of the proxy.
    pub fn wrapper_type(&self) -> WrapperType {
        self.wrapper_type
    }

    /// Returns the wrapped structure.
    pub fn get_struct(&self) -> NonNull<S> {
        self.structure
    }

    /// Returns the reference count of the proxy itself.
    pub fn ref_count(&self) -> &RefCount {
        &self.ref_count
    }

    /// Increments the reference count of the proxy and of the structure.
    pub fn add_ref(&self) {
        self.underlying_add_ref();
        self.ref_count.add_ref();
    }

    /// Decrements the reference count of the proxy and of the structure.
    ///
    /// Returns `true` if the count of the proxy reached zero.
    pub fn release(&self) -> bool {
        self.underlying_release();
        self.ref_count.release()
    }

    /// Returns `true` if the structure has exactly one reference.
    pub fn has_one_ref(&self) -> bool {
        self.underlying_has_one_ref()
    }

    /// Returns `true` if the structure has at least one reference.
    pub fn has_at_least_one_ref(&self) -> bool {
        self.underlying_has_at_least_one_ref()
    }

    /// Increments the reference count of the structure.
    ///
    /// Does nothing if the `add_ref` member is null.
    pub fn underlying_add_ref(&self) {
        let base = self.base();
        // Safety: The structure is live while the proxy holds a reference to it.
        if let Some(add_ref) = unsafe { (*base).add_ref } {
            // Safety: See above.
            unsafe { add_ref(base) };
        }
    }

    /// Decrements the reference count of the structure.
    ///
    /// Returns `true` if its count reached zero, and `false` if the `release` member is null.
    pub fn underlying_release(&self) -> bool {
        let base = self.base();
        // Safety: The structure is live while the proxy holds a reference to it.
        match unsafe { (*base).release } {
            // Safety: See above.
            Some(release) => (unsafe { release(base) }) != 0,
            None => false,
        }
    }

    /// Returns `true` if the structure has exactly one reference.
    ///
    /// Returns `false` if the `has_one_ref` member is null.
    pub fn underlying_has_one_ref(&self) -> bool {
        let base = self.base();
        // Safety: The structure is live while the proxy holds a reference to it.
        match unsafe { (*base).has_one_ref } {
            // Safety: See above.
            Some(has_one_ref) => (unsafe { has_one_ref(base) }) != 0,
            None => false,
        }
    }

    /// Returns `true` if the structure has at least one reference.
    ///
    /// Returns `false` if the `has_at_least_one_ref` member is null.
    pub fn underlying_has_at_least_one_ref(&self) -> bool {
        let base = self.base();
        // Safety: The structure is live while the proxy holds a reference to it.
        match unsafe { (*base).has_at_least_one_ref } {
            // Safety: See above.
            Some(has_at_least_one_ref) => (unsafe { has_at_least_one_ref(base) }) != 0,
            None => false,
        }
    }

    fn base(&self) -> *mut RawBaseRefCounted {
        ffi::base_ref_counted(self.structure).as_ptr()
    }
}

impl<S: RefCountedStruct> Drop for RefCountedWrapperStruct<S> {
    fn drop(&mut self) {
        shutdown::assert_not_shutdown();
    }
}

impl<S: RefCountedStruct> std::fmt::Debug for RefCountedWrapperStruct<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefCountedWrapperStruct")
            .field("wrapper_type", &self.wrapper_type)
            .field("structure", &self.structure)
            .field("ref_count", &self.ref_count)
            .finish()
    }
}

/// A proxy class for reference counted structures of type [`Struct`](CToCppRefCounted::Struct).
///
/// # Safety
///
/// [`WRAPPER_TYPE`](CToCppRefCounted::WRAPPER_TYPE) must be unique among all classes. The
/// [`BaseRefCounted`] implementation must forward to the
/// [`RefCountedWrapperStruct`] of the proxy, including
/// [`wrapper_type`](BaseRefCounted::wrapper_type), so that only proxies of type `Self` report
/// the tag of the class. [`into_base`](CToCppRefCounted::into_base) must only perform an
/// unsizing coercion.
pub unsafe trait CToCppRefCounted: BaseRefCounted + Sized + 'static {
    /// Interface implemented by the proxy.
    type Base: ?Sized + BaseRefCounted + 'static;

    /// Structure wrapped by the proxy.
    type Struct: RefCountedStruct;

    /// Tag identifying the class.
    const WRAPPER_TYPE: WrapperType;

    /// Constructs a proxy from its state.
    fn from_wrapper_struct(wrapper_struct: RefCountedWrapperStruct<Self::Struct>) -> Self;

    /// Returns the state of the proxy.
    fn wrapper_struct(&self) -> &RefCountedWrapperStruct<Self::Struct>;

    /// Converts a pointer to the proxy into a pointer to its interface.
    fn into_base(this: NonNull<Self>) -> NonNull<Self::Base>;

    /// Unwraps a proxy of a class deriving from this one.
    ///
    /// The default implementation reports the tag as unexpected and returns null.
    fn unwrap_derived(ty: WrapperType, c: RefPtr<Self::Base>) -> *mut Self::Struct {
        drop(c);
        notreached!("unexpected class type {ty}");
        ptr::null_mut()
    }

    /// Wraps a structure received from the other side.
    ///
    /// Takes ownership of the reference carried by `s`. Returns `None` if `s` is null.
    ///
    /// # Safety
    ///
    /// `s` must be null or point to a live structure of type `Struct`, and the caller must
    /// own one of its references.
    unsafe fn wrap(s: *mut Self::Struct) -> Option<RefPtr<Self::Base>> {
        let s = NonNull::new(s)?;

        let wrapper = Box::new(Self::from_wrapper_struct(RefCountedWrapperStruct::new(
            Self::WRAPPER_TYPE,
            s,
        )));
        let wrapper = NonNull::from(Box::leak(wrapper));

        // Safety: The proxy was just allocated in a box.
        let handle = unsafe { RefPtr::retain(Self::into_base(wrapper)) };

        // The handle acquired its own reference to the structure, so the one transferred by
        // the caller is released.
        // Safety: The handle keeps the proxy alive.
        unsafe { wrapper.as_ref() }
            .wrapper_struct()
            .underlying_release();

        tracing::trace!(wrapper_type = %Self::WRAPPER_TYPE, "wrapped foreign structure");
        Some(handle)
    }

    /// Retrieves the structure wrapped by a proxy, to pass it back to the other side.
    ///
    /// The returned structure carries one reference, which is owned by the receiver. A proxy
    /// of a derived class is unwrapped through [`CToCppRefCounted::unwrap_derived`]. Returns
    /// null if `c` is `None`, or if `c` is not a proxy.
    fn unwrap(c: Option<RefPtr<Self::Base>>) -> *mut Self::Struct {
        let Some(c) = c else {
            return ptr::null_mut();
        };
        shutdown::assert_not_shutdown();

        match c.wrapper_type() {
            Some(ty) if ty == Self::WRAPPER_TYPE => {
                // Safety: Only proxies of type `Self` report the tag of the class.
                let this = unsafe { RefPtr::as_ptr(&c).cast::<Self>().as_ref() };
                this.wrapper_struct().underlying_add_ref();
                tracing::trace!(wrapper_type = %Self::WRAPPER_TYPE, "unwrapped foreign structure");
                this.get_struct().as_ptr()
            }
            Some(ty) => Self::unwrap_derived(ty, c),
            None => {
                notreached!("object is not a proxy of class {}", Self::WRAPPER_TYPE);
                ptr::null_mut()
            }
        }
    }

    /// Returns the wrapped structure.
    fn get_struct(&self) -> NonNull<Self::Struct> {
        self.wrapper_struct().get_struct()
    }

    /// Converts a handle to a proxy of type `Self`, given through another interface.
    ///
    /// # Safety
    ///
    /// The object referenced by `c` must be a proxy of type `Self`.
    unsafe fn cast_proxy<B: ?Sized + BaseRefCounted>(c: RefPtr<B>) -> RefPtr<Self::Base> {
        let this = RefPtr::into_raw(c).cast::<Self>();
        // Safety: The reference of `c` is transferred to the new handle.
        unsafe { RefPtr::from_raw(Self::into_base(this)) }
    }
}
