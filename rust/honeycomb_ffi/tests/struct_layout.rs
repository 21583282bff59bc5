mod common;

use honeycomb_ffi::{
    config::Config,
    cpptoc::{CppToCRefCounted, CppToCRefCountedWrapper},
    ffi::{RawBaseRefCounted, RawStruct, RefCountedStruct},
    implement_ref_counting, BaseRefCounted, RefCount, RefPtr, WrapperType,
};
use paste::paste;
use std::{
    ffi::c_int,
    ptr::NonNull,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

trait Table: BaseRefCounted {
    fn call(&self, index: usize) -> i32;
}

struct Object {
    ref_count: RefCount,
    calls: Arc<AtomicUsize>,
}

implement_ref_counting!(Object, ref_count);

impl Table for Object {
    fn call(&self, index: usize) -> i32 {
        self.calls.fetch_add(1, Ordering::SeqCst);
        index as i32
    }
}

fn object() -> (RefPtr<dyn Table>, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let obj: Box<dyn Table> = Box::new(Object {
        ref_count: RefCount::new(),
        calls: calls.clone(),
    });
    (RefPtr::from_box(obj), calls)
}

/// Offset of the structure in a wrapper of `dyn Table` objects: the tag padded to a pointer,
/// the object pointer and the wrapper pointer.
fn expected_offset() -> usize {
    size_of::<usize>() + size_of::<NonNull<dyn Table>>() + size_of::<usize>()
}

macro_rules! table_struct {
    ($name:ident, $tag:literal, [$($index:literal)+]) => {
        paste! {
            #[repr(C)]
            struct [<Raw $name>] {
                base: RawBaseRefCounted,
                $([<f $index>]: Option<unsafe extern "C" fn(this: *mut [<Raw $name>]) -> c_int>,)+
            }

            // Safety: The structure consists of integers and optional function pointers.
            unsafe impl RawStruct for [<Raw $name>] {}

            // Safety: The structure begins with `RawBaseRefCounted`.
            unsafe impl RefCountedStruct for [<Raw $name>] {}

            struct [<$name CppToC>];

            // Safety: The tag is unique in this binary.
            unsafe impl CppToCRefCounted for [<$name CppToC>] {
                type Base = dyn Table;
                type Struct = [<Raw $name>];
                const WRAPPER_TYPE: WrapperType = WrapperType($tag);

                fn init_struct(s: &mut Self::Struct) {
                    $(s.[<f $index>] = Some([<$name:snake _f $index>]);)+
                }
            }

            $(
                unsafe extern "C" fn [<$name:snake _f $index>](this: *mut [<Raw $name>]) -> c_int {
                    let this = NonNull::new(this).unwrap();
                    // Safety: The function is only installed by the class.
                    unsafe { [<$name CppToC>]::get(this) }.unwrap().call($index)
                }
            )+

            #[test]
            fn [<$name:snake _layout>]() {
                common::init(Config::builder());
                type Wrapper = CppToCRefCountedWrapper<[<$name CppToC>]>;

                let (obj, calls) = object();
                let s = [<$name CppToC>]::wrap(Some(obj.clone()));
                let s = NonNull::new(s).unwrap();
                assert_eq!(Wrapper::struct_offset(), expected_offset());

                // Safety: The structure is live while we own a reference.
                let wrapper = unsafe { Wrapper::get_wrapper(s) }.unwrap();
                assert_eq!(s.addr().get() - wrapper.addr().get(), Wrapper::struct_offset());

                // Safety: The structure is live while we own a reference.
                unsafe {
                    let raw = s.as_ptr();
                    assert_eq!((*raw).base.size, size_of::<[<Raw $name>]>());
                    $(assert_eq!((*raw).[<f $index>].unwrap()(raw), $index);)+
                }
                assert_eq!(calls.load(Ordering::SeqCst), [$($index),+].len());

                // Safety: We own the reference of the structure.
                let unwrapped = unsafe { [<$name CppToC>]::unwrap(s.as_ptr()) }.unwrap();
                assert!(RefPtr::ptr_eq(&obj, &unwrapped));
                drop(unwrapped);
                assert!(obj.has_one_ref());
            }
        }
    };
}

table_struct!(Narrow, 1001, [0]);
table_struct!(Medium, 1002, [0 1 2 3 4 5 6 7 8 9]);
table_struct!(
    Large,
    1003,
    [
        0 1 2 3 4 5 6 7 8 9 10 11 12 13 14 15 16 17 18 19 20 21 22 23 24 25 26 27 28 29 30 31
        32 33 34 35 36 37 38 39 40 41 42 43 44 45 46 47 48 49 50 51 52 53 54 55 56 57 58 59 60
        61 62 63
    ]
);
