//! Title to storage key normalization.

/// Derive the storage key for a note title.
///
/// Every character outside `[A-Za-z0-9 ]` is dropped, spaces become hyphens
/// and the result is lowercased. Titles without any kept character produce an
/// empty slug, which the store refuses as a key.
///
/// Two titles can normalize to the same slug ("Hello, World" and
/// "Hello World"); saving the second overwrites the first.
///
/// # Examples
///
/// ```
/// use aen_core::slug;
///
/// assert_eq!(slug("My First Note"), "my-first-note");
/// assert_eq!(slug("!\"§$%&/()=?Hello World!"), "hello-world");
/// ```
pub fn slug(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ')
        .map(|c| if c == ' ' { '-' } else { c.to_ascii_lowercase() })
        .collect()
}
