//! Person name helpers.

/// Split a full name into first and last name.
///
/// The first whitespace-separated token is the first name; everything after
/// it, with runs of whitespace collapsed, is the last name.
///
/// ```
/// use brightpath_core::split_name;
///
/// assert_eq!(split_name("Amina  Yusuf Khan"), ("Amina".to_string(), Some("Yusuf Khan".to_string())));
/// assert_eq!(split_name("Cher"), ("Cher".to_string(), None));
/// ```
#[must_use]
pub fn split_name(full: &str) -> (String, Option<String>) {
    let mut parts = full.split_whitespace();
    let first = parts.next().unwrap_or_default().to_string();
    let rest = parts.collect::<Vec<_>>().join(" ");
    let last = (!rest.is_empty()).then_some(rest);
    (first, last)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_name() {
        assert_eq!(split_name("   "), (String::new(), None));
    }

    #[test]
    fn test_two_parts() {
        assert_eq!(
            split_name("John Smith"),
            ("John".to_string(), Some("Smith".to_string()))
        );
    }
}
