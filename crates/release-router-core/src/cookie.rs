use crate::event::CfRequest;

/// Default name of the cookie that pins a viewer to a release.
pub const RELEASE_COOKIE: &str = "release";

/// Find the value of the `name` cookie in the request's first `cookie` header.
///
/// Entries are split on `;` and trimmed; the name match is case-sensitive and
/// the first matching entry wins. The value is the text between the first and
/// the second `=`, so `release=a=b` yields `a`. An empty value counts as absent.
pub fn find_cookie<'a>(request: &'a CfRequest, name: &str) -> Option<&'a str> {
    let header = request.header("cookie")?;
    cookie_value(header, name)
}

/// Same as [`find_cookie`] but over a raw `Cookie` header value.
pub fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    let value = header
        .split(';')
        .map(str::trim)
        .find_map(|entry| {
            let mut parts = entry.split('=');
            match parts.next() {
                Some(entry_name) if entry_name == name => Some(parts.next().unwrap_or("")),
                _ => None,
            }
        })?;

    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
