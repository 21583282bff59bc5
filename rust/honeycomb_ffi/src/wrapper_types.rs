//! Wrapper type tags.
use std::fmt::{Display, Formatter};

/// Tag identifying the concrete class of a wrapper.
///
/// Every wrapper class, in either direction, is assigned a unique tag. The tag is stored at a
/// fixed position in each wrapper, which allows a wrapper received through a pointer to its
/// base interface to be dispatched to its concrete class.
///
/// The type mirrors a C enumeration. It is represented as an integer newtype, so that an
/// unknown value read from the other side of the boundary remains representable.
///
/// The values are shared by both sides of the boundary, so the table lists every interface
/// of the API, including those without a class in this crate. Tags are assigned in
/// alphabetical order and must not be renumbered.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WrapperType(pub i32);

macro_rules! wrapper_types {
    ($($name:ident = $value:literal),+ $(,)?) => {
        impl WrapperType {
            $(
                #[allow(missing_docs)]
                pub const $name: Self = Self($value);
            )+

            /// Returns the name of a known tag.
            pub const fn name(self) -> Option<&'static str> {
                match self.0 {
                    $($value => Some(stringify!($name)),)+
                    _ => None,
                }
            }
        }
    };
}

wrapper_types! {
    BASE_REF_COUNTED = 1,
    BASE_SCOPED = 2,
    ACCESSIBILITY_HANDLER = 3,
    APP = 4,
    BINARY_VALUE = 5,
    BUTTON_DELEGATE = 6,
    COOKIE_ACCESS_FILTER = 7,
    DEV_TOOLS_MESSAGE_OBSERVER = 8,
    DICTIONARY_VALUE = 9,
    DOWNLOAD_HANDLER = 10,
    DRAG_HANDLER = 11,
    FILE_DIALOG_CALLBACK = 12,
    FIND_HANDLER = 13,
    JSDIALOG_HANDLER = 14,
    KEYBOARD_HANDLER = 15,
    LIST_VALUE = 16,
    MEDIA_OBSERVER = 17,
    MEDIA_ROUTE = 18,
    MENU_BUTTON_DELEGATE = 19,
    PERMISSION_HANDLER = 20,
    PREFERENCE_REGISTRAR = 21,
    PRINT_SETTINGS = 22,
    RESOLVE_CALLBACK = 23,
    RESPONSE = 24,
    RESPONSE_FILTER = 25,
    RUN_QUICK_MENU_CALLBACK = 26,
    SCROLL_VIEW = 27,
    SHARED_PROCESS_MESSAGE_BUILDER = 28,
    TRANSLATOR_TEST_REF_PTR_CLIENT = 29,
    TRANSLATOR_TEST_REF_PTR_CLIENT_CHILD = 30,
    TRANSLATOR_TEST_SCOPED_CLIENT = 31,
    TRANSLATOR_TEST_SCOPED_CLIENT_CHILD = 32,
    URLREQUEST_CLIENT = 33,
    V8HANDLER = 34,
    V8STACK_FRAME = 35,
    WRITE_HANDLER = 36,
    X509CERTIFICATE = 37,
    X509CERT_PRINCIPAL = 38,
    XML_READER = 39,
}

impl Display for WrapperType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "WrapperType({})", self.0),
        }
    }
}
