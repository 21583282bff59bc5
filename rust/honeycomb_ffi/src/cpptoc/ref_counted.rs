use crate::{
    ffi::{RawBaseRefCounted, RawStruct, RefCountedStruct},
    ref_count::{self, BaseRefCounted, RefCount, RefPtr},
    shutdown,
    wrapper_types::WrapperType,
};
use std::{
    ffi::c_int,
    mem::offset_of,
    ptr::{self, NonNull},
};

/// A class exposing local reference counted objects through structures of type
/// [`Struct`](CppToCRefCounted::Struct).
///
/// Implemented by a marker type for each interface. The marker only provides the static
/// description of the class, while the wrappers themselves are instances of
/// [`CppToCRefCountedWrapper`].
///
/// # Safety
///
/// [`WRAPPER_TYPE`](CppToCRefCounted::WRAPPER_TYPE) must be unique among all classes, and
/// [`init_struct`](CppToCRefCounted::init_struct) must not modify the base members of the
/// structure.
pub unsafe trait CppToCRefCounted: Sized + 'static {
    /// Interface of the wrapped objects.
    type Base: ?Sized + BaseRefCounted + 'static;

    /// Structure handed to the other side.
    type Struct: RefCountedStruct;

    /// Tag identifying the class.
    const WRAPPER_TYPE: WrapperType;

    /// Populates the interface specific members of a new structure.
    ///
    /// The structure is zeroed, and its base members are initialized.
    fn init_struct(s: &mut Self::Struct);

    /// Unwraps a structure created by a class deriving from this one.
    ///
    /// The default implementation reports the tag as unexpected and returns `None`.
    ///
    /// # Safety
    ///
    /// `s` must point to a structure created by the class identified by `ty`, and the caller
    /// must own one of its references.
    unsafe fn unwrap_derived(
        ty: WrapperType,
        s: NonNull<Self::Struct>,
    ) -> Option<RefPtr<Self::Base>> {
        let _ = s;
        notreached!("unexpected class type {ty}");
        None
    }

    /// Shorthand for [`CppToCRefCountedWrapper::wrap`].
    fn wrap(c: Option<RefPtr<Self::Base>>) -> *mut Self::Struct {
        CppToCRefCountedWrapper::<Self>::wrap(c)
    }

    /// Shorthand for [`CppToCRefCountedWrapper::unwrap`].
    ///
    /// # Safety
    ///
    /// See [`CppToCRefCountedWrapper::unwrap`].
    unsafe fn unwrap(s: *mut Self::Struct) -> Option<RefPtr<Self::Base>> {
        // Safety: Guaranteed by the caller.
        unsafe { CppToCRefCountedWrapper::<Self>::unwrap(s) }
    }

    /// Shorthand for [`CppToCRefCountedWrapper::get`].
    ///
    /// # Safety
    ///
    /// See [`CppToCRefCountedWrapper::get`].
    unsafe fn get<'a>(s: NonNull<Self::Struct>) -> Option<&'a Self::Base> {
        // Safety: Guaranteed by the caller.
        unsafe { CppToCRefCountedWrapper::<Self>::get(s) }
    }
}

#[repr(C)]
struct WrapperStruct<C: CppToCRefCounted> {
    wrapper_type: WrapperType,
    object: NonNull<C::Base>,
    wrapper: NonNull<CppToCRefCountedWrapper<C>>,
    structure: C::Struct,
}

/// Wrapper exposing a local reference counted object.
///
/// The wrapper keeps its own reference count. Each of its references holds one reference to
/// the wrapped object, and the wrapper is destroyed once its count reaches zero.
#[repr(C)]
pub struct CppToCRefCountedWrapper<C: CppToCRefCounted> {
    wrapper_struct: WrapperStruct<C>,
    ref_count: RefCount,
}

impl<C: CppToCRefCounted> CppToCRefCountedWrapper<C> {
    const STRUCT_OFFSET: usize = offset_of!(WrapperStruct<C>, structure);

    fn new(object: NonNull<C::Base>) -> NonNull<Self> {
        shutdown::assert_not_shutdown();

        let mut structure = C::Struct::zeroed();
        {
            // Safety: Every `RefCountedStruct` begins with a `RawBaseRefCounted`.
            let base = unsafe { &mut *ptr::from_mut(&mut structure).cast::<RawBaseRefCounted>() };
            base.size = size_of::<C::Struct>();
            base.add_ref = Some(struct_add_ref::<C>);
            base.release = Some(struct_release::<C>);
            base.has_one_ref = Some(struct_has_one_ref::<C>);
            base.has_at_least_one_ref = Some(struct_has_at_least_one_ref::<C>);
        }
        C::init_struct(&mut structure);

        let wrapper = Box::new(Self {
            wrapper_struct: WrapperStruct {
                wrapper_type: C::WRAPPER_TYPE,
                object,
                wrapper: NonNull::dangling(),
                structure,
            },
            ref_count: RefCount::new(),
        });
        let wrapper = NonNull::from(Box::leak(wrapper));

        // Safety: The wrapper is live and not shared yet.
        unsafe { (*wrapper.as_ptr()).wrapper_struct.wrapper = wrapper };
        wrapper
    }

    /// Wraps a local object, returning the structure to hand to the other side.
    ///
    /// Returns null if `c` is `None`. The returned structure carries one reference, which is
    /// owned by the receiver.
    pub fn wrap(c: Option<RefPtr<C::Base>>) -> *mut C::Struct {
        let Some(c) = c else {
            return ptr::null_mut();
        };

        let wrapper = Self::new(RefPtr::as_ptr(&c));
        // Safety: The wrapper was just created.
        let wrapper = unsafe { wrapper.as_ref() };
        wrapper.add_ref();

        tracing::trace!(wrapper_type = %C::WRAPPER_TYPE, "wrapped local object");
        wrapper.get_struct().as_ptr()
    }

    /// Retrieves the local object from a structure returned by the other side.
    ///
    /// Takes ownership of the reference carried by `s`. A structure created by a derived
    /// class is unwrapped through [`CppToCRefCounted::unwrap_derived`]. Returns `None` if `s`
    /// is null.
    ///
    /// # Safety
    ///
    /// `s` must be null or point to a live structure created by [`Self::wrap`] of this class,
    /// or a class deriving from it. The caller must own one of its references.
    pub unsafe fn unwrap(s: *mut C::Struct) -> Option<RefPtr<C::Base>> {
        let s = NonNull::new(s)?;
        shutdown::assert_not_shutdown();

        // Safety: Guaranteed by the caller.
        let ty = unsafe { Self::wrapper_type_of(s) };
        if ty != C::WRAPPER_TYPE {
            // Safety: Guaranteed by the caller.
            return unsafe { C::unwrap_derived(ty, s) };
        }

        // Safety: The tag matches, so the block belongs to this class.
        let (object, wrapper) = unsafe {
            let wrapper_struct = Self::wrapper_struct(s).as_ptr();
            ((*wrapper_struct).object, (*wrapper_struct).wrapper)
        };

        // Acquire our reference before releasing the one held by the structure.
        // Safety: The wrapper holds a reference to the object.
        let object = unsafe { RefPtr::retain(object) };
        // Safety: The caller transferred the reference of the structure to us.
        unsafe { Self::release(wrapper) };

        tracing::trace!(wrapper_type = %C::WRAPPER_TYPE, "unwrapped local object");
        Some(object)
    }

    /// Returns the local object behind a structure without affecting any reference count.
    ///
    /// Returns `None` if the structure was not created by this class.
    ///
    /// # Safety
    ///
    /// `s` must point to a live structure created by [`Self::wrap`], and the object must not
    /// be used after the last reference to the structure is released.
    pub unsafe fn get<'a>(s: NonNull<C::Struct>) -> Option<&'a C::Base> {
        shutdown::assert_not_shutdown();

        // Safety: Guaranteed by the caller.
        let wrapper = unsafe { Self::get_wrapper(s)? };
        // Safety: The wrapper is live.
        Some(unsafe { wrapper.as_ref() }.object())
    }

    /// Returns the wrapper owning a structure.
    ///
    /// Returns `None` if the structure was not created by this class.
    ///
    /// # Safety
    ///
    /// `s` must point to a live structure created by [`Self::wrap`].
    pub unsafe fn get_wrapper(s: NonNull<C::Struct>) -> Option<NonNull<Self>> {
        // Safety: Guaranteed by the caller.
        let ty = unsafe { Self::wrapper_type_of(s) };
        dcheck_eq!(ty, C::WRAPPER_TYPE);
        if ty != C::WRAPPER_TYPE {
            return None;
        }

        // Safety: The tag matches, so the block belongs to this class.
        Some(unsafe { (*Self::wrapper_struct(s).as_ptr()).wrapper })
    }

    /// Returns the offset of the structure inside of the wrapper.
    pub const fn struct_offset() -> usize {
        Self::STRUCT_OFFSET
    }

    /// Returns the structure handed to the other side.
    pub fn get_struct(&self) -> NonNull<C::Struct> {
        let this = self.wrapper_struct.wrapper.as_ptr();
        // Safety: `wrapper` points to `self` and spans the whole allocation.
        unsafe { NonNull::new_unchecked(ptr::addr_of_mut!((*this).wrapper_struct.structure)) }
    }

    /// Returns the tag of the wrapper.
    pub fn wrapper_type(&self) -> WrapperType {
        self.wrapper_struct.wrapper_type
    }

    /// Returns the wrapped object.
    pub fn object(&self) -> &C::Base {
        // Safety: The wrapper holds a reference to the object while it is live.
        unsafe { self.wrapper_struct.object.as_ref() }
    }

    /// Returns the reference count of the wrapper itself.
    pub fn ref_count(&self) -> &RefCount {
        &self.ref_count
    }

    /// Increments the reference count of the wrapper and of the object.
    pub fn add_ref(&self) {
        self.underlying_add_ref();
        self.ref_count.add_ref();
    }

    /// Decrements the reference count of the wrapper and of the object.
    ///
    /// Destroys the wrapper and returns `true` if its count reached zero.
    ///
    /// # Safety
    ///
    /// `this` must point to a live wrapper, and the caller must own one of its references.
    pub unsafe fn release(this: NonNull<Self>) -> bool {
        // Safety: Guaranteed by the caller.
        let wrapper = unsafe { this.as_ref() };
        wrapper.underlying_release();
        if !wrapper.ref_count.release() {
            return false;
        }

        // Safety: The last reference was released, so we have exclusive access.
        drop(unsafe { Box::from_raw(this.as_ptr()) });
        true
    }

    /// Returns `true` if the object has exactly one reference.
    pub fn has_one_ref(&self) -> bool {
        self.object().has_one_ref()
    }

    /// Returns `true` if the object has at least one reference.
    pub fn has_at_least_one_ref(&self) -> bool {
        self.object().has_at_least_one_ref()
    }

    fn underlying_add_ref(&self) {
        self.object().add_ref();
    }

    fn underlying_release(&self) {
        // Safety: Each reference of the wrapper owns one reference to the object.
        unsafe { ref_count::release_raw(self.wrapper_struct.object) };
    }

    /// # Safety
    ///
    /// `s` must point to a live structure created by this class or a class deriving from it.
    unsafe fn wrapper_struct(s: NonNull<C::Struct>) -> NonNull<WrapperStruct<C>> {
        // Safety: The structure is embedded at `STRUCT_OFFSET` inside of its block.
        unsafe { s.byte_sub(Self::STRUCT_OFFSET) }.cast()
    }

    /// # Safety
    ///
    /// `s` must point to a live structure created by this class or a class deriving from it.
    unsafe fn wrapper_type_of(s: NonNull<C::Struct>) -> WrapperType {
        // Safety: Guaranteed by the caller.
        let wrapper_struct = unsafe { Self::wrapper_struct(s) }.as_ptr();
        // Safety: The tag is at the same position for all classes.
        unsafe { ptr::addr_of!((*wrapper_struct).wrapper_type).read() }
    }
}

impl<C: CppToCRefCounted> Drop for CppToCRefCountedWrapper<C> {
    fn drop(&mut self) {
        shutdown::assert_not_shutdown();
    }
}

impl<C: CppToCRefCounted> std::fmt::Debug for CppToCRefCountedWrapper<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CppToCRefCountedWrapper")
            .field("wrapper_type", &self.wrapper_struct.wrapper_type)
            .field("object", &self.wrapper_struct.object.cast::<u8>())
            .field("ref_count", &self.ref_count)
            .finish_non_exhaustive()
    }
}

/// # Safety
///
/// `base` must point to the base of a structure created by the class `C`.
unsafe fn from_base<C: CppToCRefCounted>(
    base: *mut RawBaseRefCounted,
) -> Option<NonNull<CppToCRefCountedWrapper<C>>> {
    dcheck!(!base.is_null());
    let base = NonNull::new(base)?;
    // Safety: Guaranteed by the caller.
    unsafe { CppToCRefCountedWrapper::<C>::get_wrapper(base.cast()) }
}

unsafe extern "C" fn struct_add_ref<C: CppToCRefCounted>(base: *mut RawBaseRefCounted) {
    // Safety: The function is only installed into structures of the class `C`.
    if let Some(wrapper) = unsafe { from_base::<C>(base) } {
        // Safety: The caller holds a reference.
        unsafe { wrapper.as_ref() }.add_ref();
    }
}

unsafe extern "C" fn struct_release<C: CppToCRefCounted>(base: *mut RawBaseRefCounted) -> c_int {
    // Safety: The function is only installed into structures of the class `C`.
    match unsafe { from_base::<C>(base) } {
        // Safety: The caller gives up one of its references.
        Some(wrapper) => unsafe { CppToCRefCountedWrapper::release(wrapper) }.into(),
        None => 0,
    }
}

unsafe extern "C" fn struct_has_one_ref<C: CppToCRefCounted>(
    base: *mut RawBaseRefCounted,
) -> c_int {
    // Safety: The function is only installed into structures of the class `C`.
    match unsafe { from_base::<C>(base) } {
        // Safety: The caller holds a reference.
        Some(wrapper) => unsafe { wrapper.as_ref() }.has_one_ref().into(),
        None => 0,
    }
}

unsafe extern "C" fn struct_has_at_least_one_ref<C: CppToCRefCounted>(
    base: *mut RawBaseRefCounted,
) -> c_int {
    // Safety: The function is only installed into structures of the class `C`.
    match unsafe { from_base::<C>(base) } {
        // Safety: The caller holds a reference.
        Some(wrapper) => unsafe { wrapper.as_ref() }.has_at_least_one_ref().into(),
        None => 0,
    }
}
