use super::{
    RawTranslatorTestScopedClient, RawTranslatorTestScopedClientChild, TranslatorTestScopedClient,
    TranslatorTestScopedClientChild,
};
use crate::{
    cpptoc::CppToCScoped,
    ctocpp::{CToCppScoped, ScopedWrapperStruct},
    scoped::{BaseScoped, OwnPtr, RawPtr},
    shutdown,
    wrapper_types::WrapperType,
};
use std::{
    ffi::c_int,
    ptr::{self, NonNull},
};

/// Exposes local [`TranslatorTestScopedClient`] objects.
#[derive(Debug)]
pub struct TranslatorTestScopedClientCppToC;

// Safety: The tag is unique and `init_struct` only sets interface members.
unsafe impl CppToCScoped for TranslatorTestScopedClientCppToC {
    type Base = dyn TranslatorTestScopedClient;
    type Struct = RawTranslatorTestScopedClient;
    const WRAPPER_TYPE: WrapperType = WrapperType::TRANSLATOR_TEST_SCOPED_CLIENT;

    fn init_struct(s: &mut Self::Struct) {
        s.get_value = Some(translator_test_scoped_client_get_value);
    }

    unsafe fn unwrap_derived_own(
        ty: WrapperType,
        s: NonNull<Self::Struct>,
    ) -> Option<OwnPtr<Self::Base>> {
        if ty == WrapperType::TRANSLATOR_TEST_SCOPED_CLIENT_CHILD {
            let s = s.cast::<RawTranslatorTestScopedClientChild>();
            // Safety: The tag identifies the structure as a child structure.
            let child = unsafe { TranslatorTestScopedClientChildCppToC::unwrap_own(s.as_ptr()) }?;
            let this: OwnPtr<dyn TranslatorTestScopedClient> = child;
            return Some(this);
        }

        notreached!("unexpected class type {ty}");
        None
    }

    unsafe fn unwrap_derived_raw<'a>(
        ty: WrapperType,
        s: NonNull<Self::Struct>,
    ) -> Option<RawPtr<'a, Self::Base>> {
        if ty == WrapperType::TRANSLATOR_TEST_SCOPED_CLIENT_CHILD {
            let s = s.cast::<RawTranslatorTestScopedClientChild>();
            // Safety: The tag identifies the structure as a child structure.
            let child = unsafe { TranslatorTestScopedClientChildCppToC::unwrap_raw(s.as_ptr()) }?;
            let this: RawPtr<'a, dyn TranslatorTestScopedClient> = child;
            return Some(this);
        }

        notreached!("unexpected class type {ty}");
        None
    }
}

unsafe extern "C" fn translator_test_scoped_client_get_value(
    this: *mut RawTranslatorTestScopedClient,
) -> c_int {
    shutdown::assert_not_shutdown();
    dcheck!(!this.is_null());
    let Some(this) = NonNull::new(this) else {
        return 0;
    };

    // Safety: The function is only installed by `TranslatorTestScopedClientCppToC`.
    match unsafe { TranslatorTestScopedClientCppToC::get(this) } {
        Some(this) => this.get_value(),
        None => 0,
    }
}

/// Exposes local [`TranslatorTestScopedClientChild`] objects.
#[derive(Debug)]
pub struct TranslatorTestScopedClientChildCppToC;

// Safety: The tag is unique and `init_struct` only sets interface members.
unsafe impl CppToCScoped for TranslatorTestScopedClientChildCppToC {
    type Base = dyn TranslatorTestScopedClientChild;
    type Struct = RawTranslatorTestScopedClientChild;
    const WRAPPER_TYPE: WrapperType = WrapperType::TRANSLATOR_TEST_SCOPED_CLIENT_CHILD;

    fn init_struct(s: &mut Self::Struct) {
        s.base.get_value = Some(translator_test_scoped_client_child_get_value);
        s.get_other_value = Some(translator_test_scoped_client_child_get_other_value);
    }
}

unsafe extern "C" fn translator_test_scoped_client_child_get_value(
    this: *mut RawTranslatorTestScopedClient,
) -> c_int {
    shutdown::assert_not_shutdown();
    dcheck!(!this.is_null());
    let Some(this) = NonNull::new(this.cast::<RawTranslatorTestScopedClientChild>()) else {
        return 0;
    };

    // Safety: The function is only installed by `TranslatorTestScopedClientChildCppToC`.
    match unsafe { TranslatorTestScopedClientChildCppToC::get(this) } {
        Some(this) => this.get_value(),
        None => 0,
    }
}

unsafe extern "C" fn translator_test_scoped_client_child_get_other_value(
    this: *mut RawTranslatorTestScopedClientChild,
) -> c_int {
    shutdown::assert_not_shutdown();
    dcheck!(!this.is_null());
    let Some(this) = NonNull::new(this) else {
        return 0;
    };

    // Safety: The function is only installed by `TranslatorTestScopedClientChildCppToC`.
    match unsafe { TranslatorTestScopedClientChildCppToC::get(this) } {
        Some(this) => this.get_other_value(),
        None => 0,
    }
}

/// Proxy for [`RawTranslatorTestScopedClient`] structures.
#[derive(Debug)]
pub struct TranslatorTestScopedClientCToCpp(ScopedWrapperStruct<RawTranslatorTestScopedClient>);

impl BaseScoped for TranslatorTestScopedClientCToCpp {
    fn wrapper_type(&self) -> Option<WrapperType> {
        Some(self.0.wrapper_type())
    }
}

// Safety: The tag is unique and the base implementation reports the tag of the wrapper struct.
unsafe impl CToCppScoped for TranslatorTestScopedClientCToCpp {
    type Base = dyn TranslatorTestScopedClient;
    type Struct = RawTranslatorTestScopedClient;
    const WRAPPER_TYPE: WrapperType = WrapperType::TRANSLATOR_TEST_SCOPED_CLIENT;

    fn from_wrapper_struct(wrapper_struct: ScopedWrapperStruct<Self::Struct>) -> Self {
        Self(wrapper_struct)
    }

    fn wrapper_struct(&self) -> &ScopedWrapperStruct<Self::Struct> {
        &self.0
    }

    fn wrapper_struct_mut(&mut self) -> &mut ScopedWrapperStruct<Self::Struct> {
        &mut self.0
    }

    fn into_base(this: OwnPtr<Self>) -> OwnPtr<Self::Base> {
        this
    }

    fn as_base(&self) -> &Self::Base {
        self
    }

    fn unwrap_derived_own(ty: WrapperType, c: OwnPtr<Self::Base>) -> *mut Self::Struct {
        if ty == WrapperType::TRANSLATOR_TEST_SCOPED_CLIENT_CHILD {
            // Safety: The tag identifies the object as a child proxy.
            let child = unsafe { TranslatorTestScopedClientChildCToCpp::cast_own(c) };
            let child = TranslatorTestScopedClientChildCToCpp::into_base(child);
            return TranslatorTestScopedClientChildCToCpp::unwrap_own(Some(child)).cast();
        }

        drop(c);
        notreached!("unexpected class type {ty}");
        ptr::null_mut()
    }

    fn unwrap_derived_raw(ty: WrapperType, c: RawPtr<'_, Self::Base>) -> *mut Self::Struct {
        if ty == WrapperType::TRANSLATOR_TEST_SCOPED_CLIENT_CHILD {
            // Safety: The tag identifies the object as a child proxy.
            let child = unsafe { TranslatorTestScopedClientChildCToCpp::cast_raw(c) };
            return TranslatorTestScopedClientChildCToCpp::unwrap_raw(Some(child.as_base())).cast();
        }

        notreached!("unexpected class type {ty}");
        ptr::null_mut()
    }
}

impl TranslatorTestScopedClient for TranslatorTestScopedClientCToCpp {
    fn get_value(&self) -> i32 {
        shutdown::assert_not_shutdown();
        let Some(s) = self.get_struct() else {
            return 0;
        };
        if crate::member_missing!(s, get_value) {
            return 0;
        }

        // Safety: The member is present, and the proxy owns the structure.
        unsafe { (*s.as_ptr()).get_value.unwrap_unchecked()(s.as_ptr()) }
    }
}

/// Proxy for [`RawTranslatorTestScopedClientChild`] structures.
#[derive(Debug)]
pub struct TranslatorTestScopedClientChildCToCpp(
    ScopedWrapperStruct<RawTranslatorTestScopedClientChild>,
);

impl BaseScoped for TranslatorTestScopedClientChildCToCpp {
    fn wrapper_type(&self) -> Option<WrapperType> {
        Some(self.0.wrapper_type())
    }
}

// Safety: The tag is unique and the base implementation reports the tag of the wrapper struct.
unsafe impl CToCppScoped for TranslatorTestScopedClientChildCToCpp {
    type Base = dyn TranslatorTestScopedClientChild;
    type Struct = RawTranslatorTestScopedClientChild;
    const WRAPPER_TYPE: WrapperType = WrapperType::TRANSLATOR_TEST_SCOPED_CLIENT_CHILD;

    fn from_wrapper_struct(wrapper_struct: ScopedWrapperStruct<Self::Struct>) -> Self {
        Self(wrapper_struct)
    }

    fn wrapper_struct(&self) -> &ScopedWrapperStruct<Self::Struct> {
        &self.0
    }

    fn wrapper_struct_mut(&mut self) -> &mut ScopedWrapperStruct<Self::Struct> {
        &mut self.0
    }

    fn into_base(this: OwnPtr<Self>) -> OwnPtr<Self::Base> {
        this
    }

    fn as_base(&self) -> &Self::Base {
        self
    }
}

impl TranslatorTestScopedClient for TranslatorTestScopedClientChildCToCpp {
    fn get_value(&self) -> i32 {
        shutdown::assert_not_shutdown();
        let Some(s) = self.get_struct() else {
            return 0;
        };
        let s = s.cast::<RawTranslatorTestScopedClient>();
        if crate::member_missing!(s, get_value) {
            return 0;
        }

        // Safety: The member is present, and the proxy owns the structure.
        unsafe { (*s.as_ptr()).get_value.unwrap_unchecked()(s.as_ptr()) }
    }
}

impl TranslatorTestScopedClientChild for TranslatorTestScopedClientChildCToCpp {
    fn get_other_value(&self) -> i32 {
        shutdown::assert_not_shutdown();
        let Some(s) = self.get_struct() else {
            return 0;
        };
        if crate::member_missing!(s, get_other_value) {
            return 0;
        }

        // Safety: The member is present, and the proxy owns the structure.
        unsafe { (*s.as_ptr()).get_other_value.unwrap_unchecked()(s.as_ptr()) }
    }
}
