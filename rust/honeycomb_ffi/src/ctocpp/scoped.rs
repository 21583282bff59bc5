use crate::{
    ffi::{self, ScopedStruct},
    scoped::{BaseScoped, OwnPtr, RawPtr},
    shutdown,
    wrapper_types::WrapperType,
};
use std::ptr::{self, NonNull};

/// State shared by all proxies of scoped structures.
///
/// Dropping the state deletes the structure through its `del` member, unless the structure
/// was unwrapped before.
#[repr(C)]
pub struct ScopedWrapperStruct<S: ScopedStruct> {
    wrapper_type: WrapperType,
    structure: Option<NonNull<S>>,
}

impl<S: ScopedStruct> ScopedWrapperStruct<S> {
    /// Constructs the state of a new proxy.
    pub fn new(wrapper_type: WrapperType, structure: NonNull<S>) -> Self {
        shutdown::assert_not_shutdown();
        Self {
            wrapper_type,
            structure: Some(structure),
        }
    }

    /// Returns the tag of the proxy.
    pub fn wrapper_type(&self) -> WrapperType {
        self.wrapper_type
    }

    /// Returns the wrapped structure, if it was not unwrapped.
    pub fn get_struct(&self) -> Option<NonNull<S>> {
        self.structure
    }

    /// Releases the structure from the proxy, without deleting it.
    pub fn take_struct(&mut self) -> Option<NonNull<S>> {
        self.structure.take()
    }
}

impl<S: ScopedStruct> Drop for ScopedWrapperStruct<S> {
    fn drop(&mut self) {
        shutdown::assert_not_shutdown();
        let Some(structure) = self.structure.take() else {
            return;
        };

        let base = ffi::base_scoped(structure).as_ptr();
        // Safety: The proxy owns the structure.
        if let Some(del) = unsafe { (*base).del } {
            // Safety: See above.
            unsafe { del(base) };
        }
    }
}

impl<S: ScopedStruct> std::fmt::Debug for ScopedWrapperStruct<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedWrapperStruct")
            .field("wrapper_type", &self.wrapper_type)
            .field("structure", &self.structure)
            .finish()
    }
}

/// A proxy class for scoped structures of type [`Struct`](CToCppScoped::Struct).
///
/// # Safety
///
/// [`WRAPPER_TYPE`](CToCppScoped::WRAPPER_TYPE) must be unique among all classes. The
/// [`BaseScoped`] implementation must report the tag of the [`ScopedWrapperStruct`] of the
/// proxy, so that only proxies of type `Self` report the tag of the class.
/// [`into_base`](CToCppScoped::into_base) and [`as_base`](CToCppScoped::as_base) must only
/// perform an unsizing coercion.
pub unsafe trait CToCppScoped: BaseScoped + Sized + 'static {
    /// Interface implemented by the proxy.
    type Base: ?Sized + BaseScoped + 'static;

    /// Structure wrapped by the proxy.
    type Struct: ScopedStruct;

    /// Tag identifying the class.
    const WRAPPER_TYPE: WrapperType;

    /// Constructs a proxy from its state.
    fn from_wrapper_struct(wrapper_struct: ScopedWrapperStruct<Self::Struct>) -> Self;

    /// Returns the state of the proxy.
    fn wrapper_struct(&self) -> &ScopedWrapperStruct<Self::Struct>;

    /// Returns the state of the proxy.
    fn wrapper_struct_mut(&mut self) -> &mut ScopedWrapperStruct<Self::Struct>;

    /// Converts an owned proxy into its interface.
    fn into_base(this: OwnPtr<Self>) -> OwnPtr<Self::Base>;

    /// Borrows the proxy as its interface.
    fn as_base(&self) -> &Self::Base;

    /// Unwraps an owned proxy of a class deriving from this one.
    ///
    /// The default implementation reports the tag as unexpected and returns null.
    fn unwrap_derived_own(ty: WrapperType, c: OwnPtr<Self::Base>) -> *mut Self::Struct {
        drop(c);
        notreached!("unexpected class type {ty}");
        ptr::null_mut()
    }

    /// Unwraps a borrowed proxy of a class deriving from this one.
    ///
    /// The default implementation reports the tag as unexpected and returns null.
    fn unwrap_derived_raw(ty: WrapperType, c: RawPtr<'_, Self::Base>) -> *mut Self::Struct {
        let _ = c;
        notreached!("unexpected class type {ty}");
        ptr::null_mut()
    }

    /// Wraps a structure received from the other side.
    ///
    /// The proxy deletes the structure when dropped. Returns `None` if `s` is null.
    ///
    /// # Safety
    ///
    /// `s` must be null or point to a live structure of type `Struct`, whose ownership is
    /// transferred to the proxy.
    unsafe fn wrap(s: *mut Self::Struct) -> Option<OwnPtr<Self::Base>> {
        let s = NonNull::new(s)?;
        let wrapper = Box::new(Self::from_wrapper_struct(ScopedWrapperStruct::new(
            Self::WRAPPER_TYPE,
            s,
        )));
        tracing::trace!(wrapper_type = %Self::WRAPPER_TYPE, "wrapped foreign structure");
        Some(Self::into_base(wrapper))
    }

    /// Retrieves the structure owned by a proxy, destroying the proxy.
    ///
    /// The ownership of the structure is transferred to the caller. A proxy of a derived class
    /// is unwrapped through [`CToCppScoped::unwrap_derived_own`]. Returns null if `c` is
    /// `None`, or if `c` is not a proxy.
    fn unwrap_own(c: Option<OwnPtr<Self::Base>>) -> *mut Self::Struct {
        let Some(c) = c else {
            return ptr::null_mut();
        };
        shutdown::assert_not_shutdown();

        match c.wrapper_type() {
            Some(ty) if ty == Self::WRAPPER_TYPE => {
                // Safety: Only proxies of type `Self` report the tag of the class.
                let mut this = unsafe { Self::cast_own(c) };
                let structure = this.wrapper_struct_mut().take_struct();
                dcheck!(structure.is_some(), "proxy no longer owns its structure");
                if let Some(structure) = structure {
                    // Safety: We owned the structure until now.
                    let has_del = unsafe { (*ffi::base_scoped(structure).as_ptr()).del.is_some() };
                    dcheck!(has_del, "structure is not owned by the proxy");
                }
                tracing::trace!(wrapper_type = %Self::WRAPPER_TYPE, "unwrapped foreign structure");
                structure.map_or(ptr::null_mut(), NonNull::as_ptr)
            }
            Some(ty) => Self::unwrap_derived_own(ty, c),
            None => {
                notreached!("object is not a proxy of class {}", Self::WRAPPER_TYPE);
                ptr::null_mut()
            }
        }
    }

    /// Retrieves the structure wrapped by a borrowed proxy.
    ///
    /// The ownership of the structure remains with the proxy. A proxy of a derived class is
    /// unwrapped through [`CToCppScoped::unwrap_derived_raw`]. Returns null if `c` is `None`,
    /// or if `c` is not a proxy.
    fn unwrap_raw(c: Option<RawPtr<'_, Self::Base>>) -> *mut Self::Struct {
        let Some(c) = c else {
            return ptr::null_mut();
        };
        shutdown::assert_not_shutdown();

        match c.wrapper_type() {
            Some(ty) if ty == Self::WRAPPER_TYPE => {
                // Safety: Only proxies of type `Self` report the tag of the class.
                let this = unsafe { Self::cast_raw(c) };
                this.get_struct().map_or(ptr::null_mut(), NonNull::as_ptr)
            }
            Some(ty) => Self::unwrap_derived_raw(ty, c),
            None => {
                notreached!("object is not a proxy of class {}", Self::WRAPPER_TYPE);
                ptr::null_mut()
            }
        }
    }

    /// Returns the wrapped structure, if it was not unwrapped.
    fn get_struct(&self) -> Option<NonNull<Self::Struct>> {
        self.wrapper_struct().get_struct()
    }

    /// Converts an owned proxy of type `Self`, given through another interface.
    ///
    /// # Safety
    ///
    /// The object must be a proxy of type `Self`.
    unsafe fn cast_own<B: ?Sized>(c: OwnPtr<B>) -> OwnPtr<Self> {
        let this = Box::into_raw(c).cast::<Self>();
        // Safety: Guaranteed by the caller.
        unsafe { Box::from_raw(this) }
    }

    /// Converts a borrowed proxy of type `Self`, given through another interface.
    ///
    /// # Safety
    ///
    /// The object must be a proxy of type `Self`.
    unsafe fn cast_raw<B: ?Sized>(c: RawPtr<'_, B>) -> RawPtr<'_, Self> {
        // Safety: Guaranteed by the caller.
        unsafe { &*ptr::from_ref(c).cast::<Self>() }
    }
}
