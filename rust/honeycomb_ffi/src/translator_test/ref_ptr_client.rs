use super::{
    RawTranslatorTestRefPtrClient, RawTranslatorTestRefPtrClientChild, TranslatorTestRefPtrClient,
    TranslatorTestRefPtrClientChild,
};
use crate::{
    cpptoc::CppToCRefCounted,
    ctocpp::{CToCppRefCounted, RefCountedWrapperStruct},
    ref_count::{BaseRefCounted, RefPtr},
    shutdown,
    wrapper_types::WrapperType,
};
use std::{
    ffi::c_int,
    ptr::{self, NonNull},
};

/// Exposes local [`TranslatorTestRefPtrClient`] objects.
#[derive(Debug)]
pub struct TranslatorTestRefPtrClientCppToC;

// Safety: The tag is unique and `init_struct` only sets interface members.
unsafe impl CppToCRefCounted for TranslatorTestRefPtrClientCppToC {
    type Base = dyn TranslatorTestRefPtrClient;
    type Struct = RawTranslatorTestRefPtrClient;
    const WRAPPER_TYPE: WrapperType = WrapperType::TRANSLATOR_TEST_REF_PTR_CLIENT;

    fn init_struct(s: &mut Self::Struct) {
        s.get_value = Some(translator_test_ref_ptr_client_get_value);
    }

    unsafe fn unwrap_derived(
        ty: WrapperType,
        s: NonNull<Self::Struct>,
    ) -> Option<RefPtr<Self::Base>> {
        if ty == WrapperType::TRANSLATOR_TEST_REF_PTR_CLIENT_CHILD {
            let s = s.cast::<RawTranslatorTestRefPtrClientChild>();
            // Safety: The tag identifies the structure as a child structure.
            let child = unsafe { TranslatorTestRefPtrClientChildCppToC::unwrap(s.as_ptr()) }?;
            let child = RefPtr::into_raw(child);
            let this: NonNull<dyn TranslatorTestRefPtrClient> = child;
            // Safety: The reference of `child` is transferred.
            return Some(unsafe { RefPtr::from_raw(this) });
        }

        notreached!("unexpected class type {ty}");
        None
    }
}

unsafe extern "C" fn translator_test_ref_ptr_client_get_value(
    this: *mut RawTranslatorTestRefPtrClient,
) -> c_int {
    shutdown::assert_not_shutdown();
    dcheck!(!this.is_null());
    let Some(this) = NonNull::new(this) else {
        return 0;
    };

    // Safety: The function is only installed by `TranslatorTestRefPtrClientCppToC`.
    match unsafe { TranslatorTestRefPtrClientCppToC::get(this) } {
        Some(this) => this.get_value(),
        None => 0,
    }
}

/// Exposes local [`TranslatorTestRefPtrClientChild`] objects.
#[derive(Debug)]
pub struct TranslatorTestRefPtrClientChildCppToC;

// Safety: The tag is unique and `init_struct` only sets interface members.
unsafe impl CppToCRefCounted for TranslatorTestRefPtrClientChildCppToC {
    type Base = dyn TranslatorTestRefPtrClientChild;
    type Struct = RawTranslatorTestRefPtrClientChild;
    const WRAPPER_TYPE: WrapperType = WrapperType::TRANSLATOR_TEST_REF_PTR_CLIENT_CHILD;

    fn init_struct(s: &mut Self::Struct) {
        s.base.get_value = Some(translator_test_ref_ptr_client_child_get_value);
        s.get_other_value = Some(translator_test_ref_ptr_client_child_get_other_value);
    }
}

unsafe extern "C" fn translator_test_ref_ptr_client_child_get_value(
    this: *mut RawTranslatorTestRefPtrClient,
) -> c_int {
    shutdown::assert_not_shutdown();
    dcheck!(!this.is_null());
    let Some(this) = NonNull::new(this.cast::<RawTranslatorTestRefPtrClientChild>()) else {
        return 0;
    };

    // Safety: The function is only installed by `TranslatorTestRefPtrClientChildCppToC`.
    match unsafe { TranslatorTestRefPtrClientChildCppToC::get(this) } {
        Some(this) => this.get_value(),
        None => 0,
    }
}

unsafe extern "C" fn translator_test_ref_ptr_client_child_get_other_value(
    this: *mut RawTranslatorTestRefPtrClientChild,
) -> c_int {
    shutdown::assert_not_shutdown();
    dcheck!(!this.is_null());
    let Some(this) = NonNull::new(this) else {
        return 0;
    };

    // Safety: The function is only installed by `TranslatorTestRefPtrClientChildCppToC`.
    match unsafe { TranslatorTestRefPtrClientChildCppToC::get(this) } {
        Some(this) => this.get_other_value(),
        None => 0,
    }
}

/// Proxy for [`RawTranslatorTestRefPtrClient`] structures.
#[derive(Debug)]
pub struct TranslatorTestRefPtrClientCToCpp(RefCountedWrapperStruct<RawTranslatorTestRefPtrClient>);

// Safety: Forwards to the wrapper struct.
unsafe impl BaseRefCounted for TranslatorTestRefPtrClientCToCpp {
    fn add_ref(&self) {
        self.0.add_ref()
    }

    fn release(&self) -> bool {
        self.0.release()
    }

    fn has_one_ref(&self) -> bool {
        self.0.has_one_ref()
    }

    fn has_at_least_one_ref(&self) -> bool {
        self.0.has_at_least_one_ref()
    }

    fn wrapper_type(&self) -> Option<WrapperType> {
        Some(self.0.wrapper_type())
    }
}

// Safety: The tag is unique and the base implementation forwards to the wrapper struct.
unsafe impl CToCppRefCounted for TranslatorTestRefPtrClientCToCpp {
    type Base = dyn TranslatorTestRefPtrClient;
    type Struct = RawTranslatorTestRefPtrClient;
    const WRAPPER_TYPE: WrapperType = WrapperType::TRANSLATOR_TEST_REF_PTR_CLIENT;

    fn from_wrapper_struct(wrapper_struct: RefCountedWrapperStruct<Self::Struct>) -> Self {
        Self(wrapper_struct)
    }

    fn wrapper_struct(&self) -> &RefCountedWrapperStruct<Self::Struct> {
        &self.0
    }

    fn into_base(this: NonNull<Self>) -> NonNull<Self::Base> {
        this
    }

    fn unwrap_derived(ty: WrapperType, c: RefPtr<Self::Base>) -> *mut Self::Struct {
        if ty == WrapperType::TRANSLATOR_TEST_REF_PTR_CLIENT_CHILD {
            // Safety: The tag identifies the object as a child proxy.
            let child = unsafe { TranslatorTestRefPtrClientChildCToCpp::cast_proxy(c) };
            return TranslatorTestRefPtrClientChildCToCpp::unwrap(Some(child)).cast();
        }

        drop(c);
        notreached!("unexpected class type {ty}");
        ptr::null_mut()
    }
}

impl TranslatorTestRefPtrClient for TranslatorTestRefPtrClientCToCpp {
    fn get_value(&self) -> i32 {
        shutdown::assert_not_shutdown();
        let s = self.get_struct();
        if crate::member_missing!(s, get_value) {
            return 0;
        }

        // Safety: The member is present, and the structure is live while we hold a reference.
        unsafe { (*s.as_ptr()).get_value.unwrap_unchecked()(s.as_ptr()) }
    }
}

/// Proxy for [`RawTranslatorTestRefPtrClientChild`] structures.
#[derive(Debug)]
pub struct TranslatorTestRefPtrClientChildCToCpp(
    RefCountedWrapperStruct<RawTranslatorTestRefPtrClientChild>,
);

// Safety: Forwards to the wrapper struct.
unsafe impl BaseRefCounted for TranslatorTestRefPtrClientChildCToCpp {
    fn add_ref(&self) {
        self.0.add_ref()
    }

    fn release(&self) -> bool {
        self.0.release()
    }

    fn has_one_ref(&self) -> bool {
        self.0.has_one_ref()
    }

    fn has_at_least_one_ref(&self) -> bool {
        self.0.has_at_least_one_ref()
    }

    fn wrapper_type(&self) -> Option<WrapperType> {
        Some(self.0.wrapper_type())
    }
}

// Safety: The tag is unique and the base implementation forwards to the wrapper struct.
unsafe impl CToCppRefCounted for TranslatorTestRefPtrClientChildCToCpp {
    type Base = dyn TranslatorTestRefPtrClientChild;
    type Struct = RawTranslatorTestRefPtrClientChild;
    const WRAPPER_TYPE: WrapperType = WrapperType::TRANSLATOR_TEST_REF_PTR_CLIENT_CHILD;

    fn from_wrapper_struct(wrapper_struct: RefCountedWrapperStruct<Self::Struct>) -> Self {
        Self(wrapper_struct)
    }

    fn wrapper_struct(&self) -> &RefCountedWrapperStruct<Self::Struct> {
        &self.0
    }

    fn into_base(this: NonNull<Self>) -> NonNull<Self::Base> {
        this
    }
}

impl TranslatorTestRefPtrClient for TranslatorTestRefPtrClientChildCToCpp {
    fn get_value(&self) -> i32 {
        shutdown::assert_not_shutdown();
        let s = self.get_struct().cast::<RawTranslatorTestRefPtrClient>();
        if crate::member_missing!(s, get_value) {
            return 0;
        }

        // Safety: The member is present, and the structure is live while we hold a reference.
        unsafe { (*s.as_ptr()).get_value.unwrap_unchecked()(s.as_ptr()) }
    }
}

impl TranslatorTestRefPtrClientChild for TranslatorTestRefPtrClientChildCToCpp {
    fn get_other_value(&self) -> i32 {
        shutdown::assert_not_shutdown();
        let s = self.get_struct();
        if crate::member_missing!(s, get_other_value) {
            return 0;
        }

        // Safety: The member is present, and the structure is live while we hold a reference.
        unsafe { (*s.as_ptr()).get_other_value.unwrap_unchecked()(s.as_ptr()) }
    }
}
