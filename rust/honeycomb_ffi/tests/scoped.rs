mod common;

use honeycomb_ffi::{
    config::Config,
    cpptoc::{CppToCScoped, CppToCScopedWrapper},
    ctocpp::CToCppScoped,
    ffi::RawBaseScoped,
    translator_test::{
        RawTranslatorTestScopedClient, TranslatorTestScopedClient,
        TranslatorTestScopedClientCToCpp, TranslatorTestScopedClientCppToC,
    },
    BaseScoped, OwnPtr, WrapperType,
};
use std::{
    ffi::c_int,
    ptr::NonNull,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

fn init() {
    common::init(Config::builder());
}

struct Client {
    value: i32,
    drops: Arc<AtomicUsize>,
}

impl BaseScoped for Client {}

impl TranslatorTestScopedClient for Client {
    fn get_value(&self) -> i32 {
        self.value
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

fn client(value: i32) -> (OwnPtr<dyn TranslatorTestScopedClient>, Arc<AtomicUsize>) {
    let drops = Arc::new(AtomicUsize::new(0));
    let obj = Box::new(Client {
        value,
        drops: drops.clone(),
    });
    (obj, drops)
}

/// A scoped structure implemented by hand, as the other side of the boundary would.
#[repr(C)]
struct Foreign {
    raw: RawTranslatorTestScopedClient,
    value: i32,
    deletes: Arc<AtomicUsize>,
}

unsafe extern "C" fn foreign_del(base: *mut RawBaseScoped) {
    // Safety: The function is only installed into owned `Foreign` structures.
    let this = unsafe { Box::from_raw(base.cast::<Foreign>()) };
    this.deletes.fetch_add(1, Ordering::SeqCst);
}

unsafe extern "C" fn foreign_get_value(this: *mut RawTranslatorTestScopedClient) -> c_int {
    // Safety: The function is only installed into `Foreign` structures.
    unsafe { &*this.cast::<Foreign>() }.value
}

fn foreign(value: i32, owned: bool) -> (NonNull<Foreign>, Arc<AtomicUsize>) {
    let deletes = Arc::new(AtomicUsize::new(0));
    let this = Box::new(Foreign {
        raw: RawTranslatorTestScopedClient {
            base: RawBaseScoped {
                size: size_of::<RawTranslatorTestScopedClient>(),
                del: if owned { Some(foreign_del) } else { None },
            },
            get_value: Some(foreign_get_value),
        },
        value,
        deletes: deletes.clone(),
    });
    (NonNull::from(Box::leak(this)), deletes)
}

#[test]
fn owned_wrapper_deletes_object() {
    init();
    let (obj, drops) = client(1);
    let s = TranslatorTestScopedClientCppToC::wrap_own(Some(obj));
    let s = NonNull::new(s).unwrap();

    // Safety: The structure is live.
    let wrapper = unsafe {
        CppToCScopedWrapper::<TranslatorTestScopedClientCppToC>::get_wrapper(s)
            .unwrap()
            .as_ref()
    };
    assert!(wrapper.is_owned());
    assert_eq!(wrapper.get_struct(), s);
    assert_eq!(
        wrapper.wrapper_type(),
        WrapperType::TRANSLATOR_TEST_SCOPED_CLIENT
    );

    let base = s.cast::<RawBaseScoped>().as_ptr();
    // Safety: The structure is owned and not used afterwards.
    unsafe { (*base).del.unwrap()(base) };
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

#[test]
fn borrowed_wrapper_keeps_object() {
    init();
    let (obj, drops) = client(2);
    let wrapper = TranslatorTestScopedClientCppToC::wrap_raw(Some(&*obj)).unwrap();
    let s = wrapper.get_struct();

    // Safety: The structure is live while `wrapper` is.
    let borrowed = unsafe { TranslatorTestScopedClientCppToC::get(s) }.unwrap();
    assert_eq!(borrowed.get_value(), 2);
    // Safety: See above.
    assert!(unsafe { (*s.as_ptr()).base.del }.is_none());

    drop(wrapper);
    assert_eq!(drops.load(Ordering::SeqCst), 0);
    assert_eq!(obj.get_value(), 2);
}

#[test]
fn foreign_owned_struct_deleted_by_proxy() {
    init();
    let (s, deletes) = foreign(3, true);
    let raw = s.cast::<RawTranslatorTestScopedClient>();

    // Safety: The ownership of the structure is transferred.
    let proxy = unsafe { TranslatorTestScopedClientCToCpp::wrap(raw.as_ptr()) }.unwrap();
    assert_eq!(proxy.get_value(), 3);
    assert_eq!(
        proxy.wrapper_type(),
        Some(WrapperType::TRANSLATOR_TEST_SCOPED_CLIENT)
    );
    drop(proxy);
    assert_eq!(deletes.load(Ordering::SeqCst), 1);
}

#[test]
fn foreign_struct_released_by_unwrap() {
    init();
    let (s, deletes) = foreign(4, true);
    let raw = s.cast::<RawTranslatorTestScopedClient>();

    // Safety: The ownership of the structure is transferred.
    let proxy = unsafe { TranslatorTestScopedClientCToCpp::wrap(raw.as_ptr()) }.unwrap();
    let back = TranslatorTestScopedClientCToCpp::unwrap_own(Some(proxy));
    assert_eq!(back, raw.as_ptr());
    assert_eq!(deletes.load(Ordering::SeqCst), 0);

    let base = back.cast::<RawBaseScoped>();
    // Safety: The ownership was transferred back to us.
    unsafe { (*base).del.unwrap()(base) };
    assert_eq!(deletes.load(Ordering::SeqCst), 1);
}

#[test]
fn foreign_borrowed_struct_not_deleted() {
    init();
    let (s, deletes) = foreign(5, false);
    let raw = s.cast::<RawTranslatorTestScopedClient>();

    // Safety: The structure outlives the proxy.
    let proxy = unsafe { TranslatorTestScopedClientCToCpp::wrap(raw.as_ptr()) }.unwrap();
    assert_eq!(proxy.get_value(), 5);
    assert_eq!(
        TranslatorTestScopedClientCToCpp::unwrap_raw(Some(&*proxy)),
        raw.as_ptr()
    );
    drop(proxy);
    assert_eq!(deletes.load(Ordering::SeqCst), 0);

    // Safety: The structure is no longer used.
    drop(unsafe { Box::from_raw(s.as_ptr()) });
}

#[test]
fn null_handling() {
    init();
    assert!(TranslatorTestScopedClientCppToC::wrap_own(None).is_null());
    assert!(TranslatorTestScopedClientCppToC::wrap_raw(None).is_none());
    // Safety: Null is always accepted.
    unsafe {
        assert!(TranslatorTestScopedClientCppToC::unwrap_own(std::ptr::null_mut()).is_none());
        assert!(TranslatorTestScopedClientCppToC::unwrap_raw(std::ptr::null_mut()).is_none());
        assert!(TranslatorTestScopedClientCToCpp::wrap(std::ptr::null_mut()).is_none());
    }
    assert!(TranslatorTestScopedClientCToCpp::unwrap_own(None).is_null());
    assert!(TranslatorTestScopedClientCToCpp::unwrap_raw(None).is_null());
}
