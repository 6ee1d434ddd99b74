//! JSON Pointer (RFC 6901) helpers used to build operation paths.

use std::borrow::Cow;

/// Escapes a JSON Pointer path component.
///
/// Per RFC 6901, `~` is replaced with `~0` and then `/` with `~1`. Components
/// without either character are returned borrowed.
///
/// # Example
///
/// ```
/// use json_patch_observer::escape_path_component;
///
/// assert_eq!(escape_path_component("a~b"), "a~0b");
/// assert_eq!(escape_path_component("c/d"), "c~1d");
/// assert_eq!(escape_path_component("~/"), "~0~1");
/// assert_eq!(escape_path_component("plain"), "plain");
/// ```
pub fn escape_path_component(component: &str) -> Cow<'_, str> {
    if !component.contains('/') && !component.contains('~') {
        return Cow::Borrowed(component);
    }
    // Order matters: ~ must be escaped before /
    Cow::Owned(component.replace('~', "~0").replace('/', "~1"))
}

/// Unescapes a JSON Pointer path component.
///
/// # Example
///
/// ```
/// use json_patch_observer::unescape_path_component;
///
/// assert_eq!(unescape_path_component("a~0b"), "a~b");
/// assert_eq!(unescape_path_component("c~1d"), "c/d");
/// assert_eq!(unescape_path_component("~01"), "~1");
/// ```
pub fn unescape_path_component(component: &str) -> Cow<'_, str> {
    if !component.contains('~') {
        return Cow::Borrowed(component);
    }
    Cow::Owned(component.replace("~1", "/").replace("~0", "~"))
}

/// Formats unescaped path segments into a JSON Pointer string.
///
/// Returns an empty string for the root (no segments).
///
/// # Example
///
/// ```
/// use json_patch_observer::format_pointer;
///
/// assert_eq!(format_pointer(Vec::<&str>::new()), "");
/// assert_eq!(format_pointer(["phoneNumbers", "0", "number"]), "/phoneNumbers/0/number");
/// assert_eq!(format_pointer(["/name/first"]), "/~1name~1first");
/// ```
pub fn format_pointer<I, S>(segments: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for segment in segments {
        out.push('/');
        out.push_str(&escape_path_component(segment.as_ref()));
    }
    out
}

/// Parses a JSON Pointer string into unescaped path segments.
///
/// # Example
///
/// ```
/// use json_patch_observer::parse_pointer;
///
/// assert_eq!(parse_pointer(""), Vec::<String>::new());
/// assert_eq!(parse_pointer("/"), vec![""]);
/// assert_eq!(parse_pointer("/a~0b/c~1d"), vec!["a~b", "c/d"]);
/// ```
pub fn parse_pointer(pointer: &str) -> Vec<String> {
    if pointer.is_empty() {
        return Vec::new();
    }
    pointer
        .strip_prefix('/')
        .unwrap_or(pointer)
        .split('/')
        .map(|component| unescape_path_component(component).into_owned())
        .collect()
}

/// Checks whether a key is a canonical, non-negative integer array index.
///
/// Leading zeros, signs and fractions are rejected, so `"01"` or `"-1"` are
/// plain properties when set on an array.
///
/// # Example
///
/// ```
/// use json_patch_observer::is_array_index;
///
/// assert!(is_array_index("0"));
/// assert!(is_array_index("42"));
/// assert!(!is_array_index("042"));
/// assert!(!is_array_index("-1"));
/// assert!(!is_array_index("length"));
/// ```
pub fn is_array_index(key: &str) -> bool {
    if key.is_empty() {
        return false;
    }
    let bytes = key.as_bytes();
    if bytes.len() > 1 && bytes[0] == b'0' {
        return false;
    }
    bytes.iter().all(|b| b.is_ascii_digit())
}

/// Parses an array index key, `None` for anything [`is_array_index`] rejects
/// or that overflows `usize`.
pub(crate) fn parse_array_index(key: &str) -> Option<usize> {
    if !is_array_index(key) {
        return None;
    }
    key.parse().ok()
}
