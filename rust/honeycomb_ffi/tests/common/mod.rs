#![allow(dead_code)]

use honeycomb_ffi::{
    config::ConfigBuilder,
    ffi::RawBaseRefCounted,
    implement_ref_counting,
    translator_test::{
        RawTranslatorTestRefPtrClient, RawTranslatorTestRefPtrClientChild,
        TranslatorTestRefPtrClient, TranslatorTestRefPtrClientChild,
    },
    RefCount, RefPtr,
};
use std::{
    ffi::c_int,
    ptr::NonNull,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Once,
    },
};
use tracing_subscriber::EnvFilter;

/// Installs the subscriber and the configuration of the test binary.
pub fn init(config: ConfigBuilder) {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
        config.install().expect("configuration was already installed");
    });
}

pub struct Client {
    ref_count: RefCount,
    value: i32,
    drops: Arc<AtomicUsize>,
}

implement_ref_counting!(Client, ref_count);

impl TranslatorTestRefPtrClient for Client {
    fn get_value(&self) -> i32 {
        self.value
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn client(value: i32) -> (RefPtr<dyn TranslatorTestRefPtrClient>, Arc<AtomicUsize>) {
    let drops = Arc::new(AtomicUsize::new(0));
    let obj: Box<dyn TranslatorTestRefPtrClient> = Box::new(Client {
        ref_count: RefCount::new(),
        value,
        drops: drops.clone(),
    });
    (RefPtr::from_box(obj), drops)
}

pub struct ClientChild {
    ref_count: RefCount,
    value: i32,
    other_value: i32,
}

implement_ref_counting!(ClientChild, ref_count);

impl TranslatorTestRefPtrClient for ClientChild {
    fn get_value(&self) -> i32 {
        self.value
    }
}

impl TranslatorTestRefPtrClientChild for ClientChild {
    fn get_other_value(&self) -> i32 {
        self.other_value
    }
}

pub fn client_child(value: i32, other_value: i32) -> RefPtr<dyn TranslatorTestRefPtrClientChild> {
    let obj: Box<dyn TranslatorTestRefPtrClientChild> = Box::new(ClientChild {
        ref_count: RefCount::new(),
        value,
        other_value,
    });
    RefPtr::from_box(obj)
}

/// Bookkeeping of a [`Foreign`] structure, that outlives it.
#[derive(Debug, Default)]
pub struct ForeignState {
    pub refs: AtomicUsize,
    pub freed: AtomicBool,
}

/// A child structure implemented by hand, as the other side of the boundary would.
#[repr(C)]
pub struct Foreign {
    pub raw: RawTranslatorTestRefPtrClientChild,
    state: Arc<ForeignState>,
    value: i32,
    other_value: i32,
}

impl Foreign {
    /// Allocates a structure carrying one reference.
    pub fn new(value: i32, other_value: i32) -> (NonNull<Foreign>, Arc<ForeignState>) {
        let state = Arc::new(ForeignState {
            refs: AtomicUsize::new(1),
            freed: AtomicBool::new(false),
        });
        let this = Box::new(Foreign {
            raw: RawTranslatorTestRefPtrClientChild {
                base: RawTranslatorTestRefPtrClient {
                    base: RawBaseRefCounted {
                        size: size_of::<RawTranslatorTestRefPtrClientChild>(),
                        add_ref: Some(foreign_add_ref),
                        release: Some(foreign_release),
                        has_one_ref: Some(foreign_has_one_ref),
                        has_at_least_one_ref: Some(foreign_has_at_least_one_ref),
                    },
                    get_value: Some(foreign_get_value),
                },
                get_other_value: Some(foreign_get_other_value),
            },
            state: state.clone(),
            value,
            other_value,
        });
        (NonNull::from(Box::leak(this)), state)
    }
}

unsafe extern "C" fn foreign_add_ref(base: *mut RawBaseRefCounted) {
    // Safety: The function is only installed into `Foreign` structures.
    let this = unsafe { &*base.cast::<Foreign>() };
    this.state.refs.fetch_add(1, Ordering::SeqCst);
}

unsafe extern "C" fn foreign_release(base: *mut RawBaseRefCounted) -> c_int {
    let this = base.cast::<Foreign>();
    // Safety: The function is only installed into `Foreign` structures.
    if unsafe { &*this }.state.refs.fetch_sub(1, Ordering::SeqCst) != 1 {
        return 0;
    }

    // Safety: The last reference was released.
    let this = unsafe { Box::from_raw(this) };
    this.state.freed.store(true, Ordering::SeqCst);
    1
}

unsafe extern "C" fn foreign_has_one_ref(base: *mut RawBaseRefCounted) -> c_int {
    // Safety: The function is only installed into `Foreign` structures.
    let this = unsafe { &*base.cast::<Foreign>() };
    (this.state.refs.load(Ordering::SeqCst) == 1).into()
}

unsafe extern "C" fn foreign_has_at_least_one_ref(base: *mut RawBaseRefCounted) -> c_int {
    // Safety: The function is only installed into `Foreign` structures.
    let this = unsafe { &*base.cast::<Foreign>() };
    (this.state.refs.load(Ordering::SeqCst) >= 1).into()
}

unsafe extern "C" fn foreign_get_value(this: *mut RawTranslatorTestRefPtrClient) -> c_int {
    // Safety: The function is only installed into `Foreign` structures.
    unsafe { &*this.cast::<Foreign>() }.value
}

unsafe extern "C" fn foreign_get_other_value(this: *mut RawTranslatorTestRefPtrClientChild) -> c_int {
    // Safety: The function is only installed into `Foreign` structures.
    unsafe { &*this.cast::<Foreign>() }.other_value
}
