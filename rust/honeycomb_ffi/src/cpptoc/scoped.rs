use crate::{
    ffi::{RawBaseScoped, RawStruct, ScopedStruct},
    scoped::{BaseScoped, OwnPtr, RawPtr},
    shutdown,
    wrapper_types::WrapperType,
};
use std::{
    marker::PhantomData,
    mem::offset_of,
    ptr::{self, NonNull},
};

/// A class exposing local scoped objects through structures of type
/// [`Struct`](CppToCScoped::Struct).
///
/// # Safety
///
/// [`WRAPPER_TYPE`](CppToCScoped::WRAPPER_TYPE) must be unique among all classes, and
/// [`init_struct`](CppToCScoped::init_struct) must not modify the base members of the
/// structure.
pub unsafe trait CppToCScoped: Sized + 'static {
    /// Interface of the wrapped objects.
    type Base: ?Sized + BaseScoped + 'static;

    /// Structure handed to the other side.
    type Struct: ScopedStruct;

    /// Tag identifying the class.
    const WRAPPER_TYPE: WrapperType;

    /// Populates the interface specific members of a new structure.
    ///
    /// The structure is zeroed, and its base members are initialized.
    fn init_struct(s: &mut Self::Struct);

    /// Takes ownership of an object wrapped by a class deriving from this one.
    ///
    /// # Safety
    ///
    /// `s` must point to a structure created by [`CppToCScopedWrapper::wrap_own`] of the class
    /// identified by `ty`.
    unsafe fn unwrap_derived_own(
        ty: WrapperType,
        s: NonNull<Self::Struct>,
    ) -> Option<OwnPtr<Self::Base>> {
        let _ = s;
        notreached!("unexpected class type {ty}");
        None
    }

    /// Borrows an object wrapped by a class deriving from this one.
    ///
    /// # Safety
    ///
    /// `s` must point to a live structure created by the class identified by `ty`.
    unsafe fn unwrap_derived_raw<'a>(
        ty: WrapperType,
        s: NonNull<Self::Struct>,
    ) -> Option<RawPtr<'a, Self::Base>> {
        let _ = s;
        notreached!("unexpected class type {ty}");
        None
    }

    /// Shorthand for [`CppToCScopedWrapper::wrap_own`].
    fn wrap_own(c: Option<OwnPtr<Self::Base>>) -> *mut Self::Struct {
        CppToCScopedWrapper::<Self>::wrap_own(c)
    }

    /// Shorthand for [`CppToCScopedWrapper::wrap_raw`].
    fn wrap_raw(c: Option<RawPtr<'_, Self::Base>>) -> Option<RawWrapper<'_, Self>> {
        CppToCScopedWrapper::<Self>::wrap_raw(c)
    }

    /// Shorthand for [`CppToCScopedWrapper::unwrap_own`].
    ///
    /// # Safety
    ///
    /// See [`CppToCScopedWrapper::unwrap_own`].
    unsafe fn unwrap_own(s: *mut Self::Struct) -> Option<OwnPtr<Self::Base>> {
        // Safety: Guaranteed by the caller.
        unsafe { CppToCScopedWrapper::<Self>::unwrap_own(s) }
    }

    /// Shorthand for [`CppToCScopedWrapper::unwrap_raw`].
    ///
    /// # Safety
    ///
    /// See [`CppToCScopedWrapper::unwrap_raw`].
    unsafe fn unwrap_raw<'a>(s: *mut Self::Struct) -> Option<RawPtr<'a, Self::Base>> {
        // Safety: Guaranteed by the caller.
        unsafe { CppToCScopedWrapper::<Self>::unwrap_raw(s) }
    }

    /// Shorthand for [`CppToCScopedWrapper::get`].
    ///
    /// # Safety
    ///
    /// See [`CppToCScopedWrapper::get`].
    unsafe fn get<'a>(s: NonNull<Self::Struct>) -> Option<&'a Self::Base> {
        // Safety: Guaranteed by the caller.
        unsafe { CppToCScopedWrapper::<Self>::get(s) }
    }
}

#[repr(C)]
struct WrapperStruct<C: CppToCScoped> {
    wrapper_type: WrapperType,
    object: Option<NonNull<C::Base>>,
    wrapper: NonNull<CppToCScopedWrapper<C>>,
    structure: C::Struct,
}

/// Wrapper exposing a local scoped object.
///
/// An owning wrapper is destroyed by the other side through the `del` member of its
/// structure, which also destroys the object. A borrowing wrapper is destroyed by dropping
/// the [`RawWrapper`] returned from [`CppToCScopedWrapper::wrap_raw`].
#[repr(C)]
pub struct CppToCScopedWrapper<C: CppToCScoped> {
    wrapper_struct: WrapperStruct<C>,
    owned: bool,
}

impl<C: CppToCScoped> CppToCScopedWrapper<C> {
    const STRUCT_OFFSET: usize = offset_of!(WrapperStruct<C>, structure);

    fn new(object: NonNull<C::Base>, owned: bool) -> NonNull<Self> {
        shutdown::assert_not_shutdown();

        let mut structure = C::Struct::zeroed();
        {
            // Safety: Every `ScopedStruct` begins with a `RawBaseScoped`.
            let base = unsafe { &mut *ptr::from_mut(&mut structure).cast::<RawBaseScoped>() };
            base.size = size_of::<C::Struct>();
            if owned {
                base.del = Some(struct_del::<C>);
            }
        }
        C::init_struct(&mut structure);

        let wrapper = Box::new(Self {
            wrapper_struct: WrapperStruct {
                wrapper_type: C::WRAPPER_TYPE,
                object: Some(object),
                wrapper: NonNull::dangling(),
                structure,
            },
            owned,
        });
        let wrapper = NonNull::from(Box::leak(wrapper));

        // Safety: The wrapper is live and not shared yet.
        unsafe { (*wrapper.as_ptr()).wrapper_struct.wrapper = wrapper };
        wrapper
    }

    /// Wraps a local object, transferring its ownership to the other side.
    ///
    /// The other side destroys the object by calling the `del` member of the structure, or
    /// passes the structure back to [`Self::unwrap_own`]. Returns null if `c` is `None`.
    pub fn wrap_own(c: Option<OwnPtr<C::Base>>) -> *mut C::Struct {
        let Some(c) = c else {
            return ptr::null_mut();
        };

        let wrapper = Self::new(NonNull::from(Box::leak(c)), true);
        tracing::trace!(wrapper_type = %C::WRAPPER_TYPE, "wrapped owned local object");
        // Safety: The wrapper was just created.
        unsafe { wrapper.as_ref() }.get_struct().as_ptr()
    }

    /// Wraps a borrowed local object.
    ///
    /// The structure of the returned wrapper is valid until the wrapper is dropped, and its
    /// `del` member is null. Returns `None` if `c` is `None`.
    pub fn wrap_raw(c: Option<RawPtr<'_, C::Base>>) -> Option<RawWrapper<'_, C>> {
        let c = c?;
        let wrapper = Self::new(NonNull::from(c), false);
        tracing::trace!(wrapper_type = %C::WRAPPER_TYPE, "wrapped borrowed local object");
        Some(RawWrapper {
            wrapper,
            _phantom: PhantomData,
        })
    }

    /// Takes back ownership of an object wrapped by [`Self::wrap_own`].
    ///
    /// Destroys the wrapper. A structure created by a derived class is unwrapped through
    /// [`CppToCScoped::unwrap_derived_own`]. Returns `None` if `s` is null, or if the structure
    /// does not own its object.
    ///
    /// # Safety
    ///
    /// `s` must be null or point to a live structure created by this class, or a class
    /// deriving from it. The structure must not be used afterwards.
    pub unsafe fn unwrap_own(s: *mut C::Struct) -> Option<OwnPtr<C::Base>> {
        let s = NonNull::new(s)?;
        shutdown::assert_not_shutdown();

        // Safety: Guaranteed by the caller.
        let ty = unsafe { Self::wrapper_type_of(s) };
        if ty != C::WRAPPER_TYPE {
            // Safety: Guaranteed by the caller.
            return unsafe { C::unwrap_derived_own(ty, s) };
        }

        // Safety: The tag matches, so the block belongs to this class.
        let wrapper = unsafe { (*Self::wrapper_struct(s).as_ptr()).wrapper };
        // Safety: The wrapper is live.
        let owned = unsafe { wrapper.as_ref() }.owned;
        dcheck!(owned, "structure does not own its object");
        if !owned {
            return None;
        }

        // Safety: The ownership of owning wrappers is transferred with their structure.
        let mut wrapper = unsafe { Box::from_raw(wrapper.as_ptr()) };
        let object = wrapper.wrapper_struct.object.take();
        drop(wrapper);

        tracing::trace!(wrapper_type = %C::WRAPPER_TYPE, "unwrapped owned local object");
        // Safety: The object was leaked by `wrap_own`.
        object.map(|object| unsafe { Box::from_raw(object.as_ptr()) })
    }

    /// Borrows the local object behind a structure.
    ///
    /// A structure created by a derived class is unwrapped through
    /// [`CppToCScoped::unwrap_derived_raw`]. Returns `None` if `s` is null.
    ///
    /// # Safety
    ///
    /// `s` must be null or point to a live structure created by this class, or a class
    /// deriving from it. The object must not be used after the structure is destroyed.
    pub unsafe fn unwrap_raw<'a>(s: *mut C::Struct) -> Option<RawPtr<'a, C::Base>> {
        let s = NonNull::new(s)?;

        // Safety: Guaranteed by the caller.
        let ty = unsafe { Self::wrapper_type_of(s) };
        if ty != C::WRAPPER_TYPE {
            // Safety: Guaranteed by the caller.
            return unsafe { C::unwrap_derived_raw(ty, s) };
        }

        // Safety: Guaranteed by the caller.
        unsafe { Self::get(s) }
    }

    /// Returns the local object behind a structure.
    ///
    /// Returns `None` if the structure was not created by this class.
    ///
    /// # Safety
    ///
    /// `s` must point to a live structure created by this class, and the object must not be
    /// used after the structure is destroyed.
    pub unsafe fn get<'a>(s: NonNull<C::Struct>) -> Option<&'a C::Base> {
        shutdown::assert_not_shutdown();

        // Safety: Guaranteed by the caller.
        let wrapper = unsafe { Self::get_wrapper(s)? };
        // Safety: The wrapper is live.
        let object = unsafe { wrapper.as_ref() }.wrapper_struct.object?;
        // Safety: The wrapper either owns or borrows the object.
        Some(unsafe { object.as_ref() })
    }

    /// Returns the wrapper owning a structure.
    ///
    /// Returns `None` if the structure was not created by this class.
    ///
    /// # Safety
    ///
    /// `s` must point to a live structure created by this class.
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

    /// Returns whether the wrapper owns its object.
    pub fn is_owned(&self) -> bool {
        self.owned
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

impl<C: CppToCScoped> Drop for CppToCScopedWrapper<C> {
    fn drop(&mut self) {
        shutdown::assert_not_shutdown();
        if !self.owned {
            return;
        }

        if let Some(object) = self.wrapper_struct.object.take() {
            // Safety: The object was leaked by `wrap_own`.
            drop(unsafe { Box::from_raw(object.as_ptr()) });
        }
    }
}

impl<C: CppToCScoped> std::fmt::Debug for CppToCScopedWrapper<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CppToCScopedWrapper")
            .field("wrapper_type", &self.wrapper_struct.wrapper_type)
            .field("owned", &self.owned)
            .finish_non_exhaustive()
    }
}

/// A borrowing wrapper created by [`CppToCScopedWrapper::wrap_raw`].
///
/// Dropping the value destroys the wrapper. The structure must not be used by the other side
/// afterwards.
pub struct RawWrapper<'a, C: CppToCScoped> {
    wrapper: NonNull<CppToCScopedWrapper<C>>,
    _phantom: PhantomData<&'a C::Base>,
}

impl<C: CppToCScoped> RawWrapper<'_, C> {
    /// Returns the structure to hand to the other side.
    pub fn get_struct(&self) -> NonNull<C::Struct> {
        // Safety: We own the wrapper.
        unsafe { self.wrapper.as_ref() }.get_struct()
    }
}

impl<C: CppToCScoped> Drop for RawWrapper<'_, C> {
    fn drop(&mut self) {
        // Safety: Borrowing wrappers are owned by their `RawWrapper`.
        drop(unsafe { Box::from_raw(self.wrapper.as_ptr()) });
    }
}

impl<C: CppToCScoped> std::fmt::Debug for RawWrapper<'_, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("RawWrapper").field(&self.get_struct()).finish()
    }
}

unsafe extern "C" fn struct_del<C: CppToCScoped>(base: *mut RawBaseScoped) {
    dcheck!(!base.is_null());
    let Some(base) = NonNull::new(base) else {
        return;
    };

    // Safety: The function is only installed into owning structures of the class `C`.
    let Some(wrapper) = (unsafe { CppToCScopedWrapper::<C>::get_wrapper(base.cast()) }) else {
        return;
    };
    // Safety: The other side gives up the structure, and with it the wrapper.
    drop(unsafe { Box::from_raw(wrapper.as_ptr()) });
}
