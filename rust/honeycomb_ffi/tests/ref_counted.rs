mod common;

use common::{client, client_child, Foreign};
use honeycomb_ffi::{
    config::Config,
    cpptoc::{CppToCRefCounted, CppToCRefCountedWrapper},
    ctocpp::CToCppRefCounted,
    ffi::RawBaseRefCounted,
    translator_test::{
        RawTranslatorTestRefPtrClient, RawTranslatorTestRefPtrClientChild,
        TranslatorTestRefPtrClient, TranslatorTestRefPtrClientCToCpp,
        TranslatorTestRefPtrClientChildCToCpp,
        TranslatorTestRefPtrClientChildCppToC, TranslatorTestRefPtrClientCppToC,
    },
    RefPtr, WrapperType,
};
use std::{
    collections::HashSet,
    ptr::NonNull,
    sync::atomic::Ordering,
    thread,
};

type ClientWrapper = CppToCRefCountedWrapper<TranslatorTestRefPtrClientCppToC>;

fn init() {
    common::init(Config::builder());
}

#[test]
fn single_release_destroys_wrapper() {
    init();
    let (obj, drops) = client(1);
    let s = TranslatorTestRefPtrClientCppToC::wrap(Some(obj.clone()));
    assert!(!obj.has_one_ref());

    let base = s.cast::<RawBaseRefCounted>();
    // Safety: We own the single reference of the structure.
    let destroyed = unsafe { (*base).release.unwrap()(base) };
    assert_eq!(destroyed, 1);
    assert!(obj.has_one_ref());

    drop(obj);
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

#[test]
fn object_outlives_its_handles() {
    init();
    let (obj, drops) = client(2);
    let s = TranslatorTestRefPtrClientCppToC::wrap(Some(obj));
    assert_eq!(drops.load(Ordering::SeqCst), 0);

    // Safety: The structure is live.
    assert_eq!(unsafe { (*s).get_value.unwrap()(s) }, 2);

    // Safety: We own the reference of the structure.
    let obj = unsafe { TranslatorTestRefPtrClientCppToC::unwrap(s) }.unwrap();
    assert!(obj.has_one_ref());
    drop(obj);
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

#[test]
fn every_wrap_creates_a_new_wrapper() {
    init();
    let (obj, drops) = client(3);
    let structs = (0..8)
        .map(|_| TranslatorTestRefPtrClientCppToC::wrap(Some(obj.clone())))
        .collect::<Vec<_>>();

    let unique = structs.iter().copied().collect::<HashSet<_>>();
    assert_eq!(unique.len(), structs.len());

    for s in structs {
        // Safety: We own the reference of the structure.
        let unwrapped = unsafe { TranslatorTestRefPtrClientCppToC::unwrap(s) }.unwrap();
        assert!(RefPtr::ptr_eq(&obj, &unwrapped));
    }
    assert!(obj.has_one_ref());
    drop(obj);
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

#[test]
fn wrapper_counts_follow_struct_references() {
    init();
    let (obj, _drops) = client(4);
    let s = TranslatorTestRefPtrClientCppToC::wrap(Some(obj.clone()));
    let base = s.cast::<RawBaseRefCounted>();

    // Safety: The structure is live while we own a reference.
    let wrapper = unsafe {
        ClientWrapper::get_wrapper(NonNull::new(s).unwrap())
            .unwrap()
            .as_ref()
    };
    assert!(wrapper.ref_count().has_one_ref());

    // Safety: The structure is live while we own a reference.
    unsafe {
        (*base).add_ref.unwrap()(base);
        (*base).add_ref.unwrap()(base);
    }
    assert!(!wrapper.ref_count().has_one_ref());

    // Safety: We own three references.
    unsafe {
        assert_eq!((*base).release.unwrap()(base), 0);
        assert_eq!((*base).release.unwrap()(base), 0);
    }
    assert!(wrapper.ref_count().has_one_ref());

    // Safety: We own the last reference.
    unsafe { assert_eq!((*base).release.unwrap()(base), 1) };
    assert!(obj.has_one_ref());
}

#[test]
fn concurrent_struct_references() {
    const THREADS: usize = 8;
    const ITERATIONS: usize = 500;

    init();
    let (obj, drops) = client(5);
    let s = TranslatorTestRefPtrClientCppToC::wrap(Some(obj.clone()));
    let addr = s.expose_provenance();

    let handles = (0..THREADS)
        .map(|_| {
            thread::spawn(move || {
                let base = std::ptr::with_exposed_provenance_mut::<RawBaseRefCounted>(addr);
                for _ in 0..ITERATIONS {
                    // Safety: The main thread keeps one reference until all threads finish.
                    unsafe {
                        (*base).add_ref.unwrap()(base);
                        assert_eq!((*base).has_at_least_one_ref.unwrap()(base), 1);
                        assert_eq!((*base).release.unwrap()(base), 0);
                    }
                }
            })
        })
        .collect::<Vec<_>>();
    for handle in handles {
        handle.join().unwrap();
    }

    // Safety: We own the last reference.
    let unwrapped = unsafe { TranslatorTestRefPtrClientCppToC::unwrap(s) }.unwrap();
    drop(unwrapped);
    assert!(obj.has_one_ref());
    drop(obj);
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

#[test]
fn derived_struct_through_parent() {
    init();
    let child = client_child(6, 7);
    let s = TranslatorTestRefPtrClientChildCppToC::wrap(Some(child.clone()));

    // Safety: We own the reference of the structure.
    let parent = unsafe {
        TranslatorTestRefPtrClientCppToC::unwrap(s.cast::<RawTranslatorTestRefPtrClient>())
    }
    .unwrap();
    assert_eq!(parent.get_value(), 6);
    assert!(RefPtr::ptr_eq(&parent, &child));
    drop(parent);
    assert!(child.has_one_ref());
}

#[test]
fn foreign_struct_round_trip() {
    init();
    let (foreign, state) = Foreign::new(8, 9);
    let s = foreign.cast::<RawTranslatorTestRefPtrClientChild>();

    // Safety: We own the reference of the structure.
    let proxy = unsafe { TranslatorTestRefPtrClientChildCToCpp::wrap(s.as_ptr()) }.unwrap();
    assert_eq!(state.refs.load(Ordering::SeqCst), 1);
    assert_eq!(
        proxy.wrapper_type(),
        Some(WrapperType::TRANSLATOR_TEST_REF_PTR_CLIENT_CHILD)
    );
    assert_eq!(proxy.get_value(), 8);
    assert_eq!(proxy.get_other_value(), 9);
    assert!(proxy.has_one_ref());

    let clones = vec![proxy.clone(), proxy.clone()];
    assert_eq!(state.refs.load(Ordering::SeqCst), 3);
    drop(clones);
    assert_eq!(state.refs.load(Ordering::SeqCst), 1);

    // The parent class unwraps the child proxy to the child structure.
    let parent = RefPtr::into_raw(proxy.clone());
    let parent: NonNull<dyn TranslatorTestRefPtrClient> = parent;
    // Safety: The reference of the clone is transferred.
    let parent = unsafe { RefPtr::from_raw(parent) };
    let parent_s = TranslatorTestRefPtrClientCToCpp::unwrap(Some(parent));
    assert_eq!(parent_s, s.as_ptr().cast::<RawTranslatorTestRefPtrClient>());
    assert_eq!(state.refs.load(Ordering::SeqCst), 2);

    let base = parent_s.cast::<RawBaseRefCounted>();
    // Safety: We own the reference returned by `unwrap`.
    unsafe { assert_eq!((*base).release.unwrap()(base), 0) };

    drop(proxy);
    assert!(state.freed.load(Ordering::SeqCst));
}

#[test]
fn missing_base_members_are_skipped() {
    init();
    let (foreign, state) = Foreign::new(10, 11);
    // Safety: The structure is live and not shared yet.
    unsafe {
        let base = &mut (*foreign.as_ptr()).raw.base.base;
        base.add_ref = None;
        base.release = None;
        base.has_one_ref = None;
        base.has_at_least_one_ref = None;
    }

    let s = foreign.cast::<RawTranslatorTestRefPtrClientChild>();
    // Safety: We own the reference of the structure.
    let proxy = unsafe { TranslatorTestRefPtrClientChildCToCpp::wrap(s.as_ptr()) }.unwrap();
    assert!(!proxy.has_one_ref());
    assert!(!proxy.has_at_least_one_ref());
    assert_eq!(proxy.get_value(), 10);

    let clone = proxy.clone();
    drop(clone);
    drop(proxy);
    assert_eq!(state.refs.load(Ordering::SeqCst), 1);
    assert!(!state.freed.load(Ordering::SeqCst));

    // Safety: The structure was never released.
    drop(unsafe { Box::from_raw(foreign.as_ptr()) });
}

#[test]
fn wrapper_offset_recovers_block() {
    init();
    let (obj, _drops) = client(12);
    let s = NonNull::new(TranslatorTestRefPtrClientCppToC::wrap(Some(obj.clone()))).unwrap();

    // Safety: The structure is live while we own a reference.
    let wrapper = unsafe { ClientWrapper::get_wrapper(s) }.unwrap();
    // Safety: See above.
    let wrapper_ref = unsafe { wrapper.as_ref() };
    assert_eq!(wrapper_ref.get_struct(), s);
    assert_eq!(
        wrapper_ref.wrapper_type(),
        TranslatorTestRefPtrClientCppToC::WRAPPER_TYPE
    );
    assert_eq!(
        s.addr().get() - wrapper.addr().get(),
        ClientWrapper::struct_offset()
    );
    assert_eq!(wrapper_ref.object().get_value(), 12);

    // Safety: We own the reference of the structure.
    drop(unsafe { TranslatorTestRefPtrClientCppToC::unwrap(s.as_ptr()) });
    assert!(obj.has_one_ref());
}
