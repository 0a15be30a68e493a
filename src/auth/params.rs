//! Redirect parameter extraction
//!
//! The implicit grant hands the token back as URL parameters on the redirect
//! URI. Both the startup check and the embedded browser callback read them
//! through [`parameter_by_name`].

/// Look up a URL parameter by name.
///
/// Returns `None` when the parameter does not occur, `Some("")` when it
/// occurs without a value (`?a&b`, `?a=&b`), and the decoded value otherwise.
/// The name must follow a `?` or `&`; the value runs to the next `&`, `#` or
/// the end of the string. `+` decodes to a space, `%2B` to a literal `+`.
pub fn parameter_by_name(name: &str, url: &str) -> Option<String> {
    for (i, c) in url.char_indices() {
        if c != '?' && c != '&' {
            continue;
        }
        let Some(after) = url[i + 1..].strip_prefix(name) else {
            continue;
        };
        match after.chars().next() {
            None | Some('&') | Some('#') => return Some(String::new()),
            Some('=') => {
                let raw = &after[1..];
                let end = raw.find(|c: char| c == '&' || c == '#').unwrap_or(raw.len());
                return Some(decode(&raw[..end]));
            }
            Some(_) => {}
        }
    }
    None
}

fn decode(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    // form decoding maps '+' to space before percent-decoding
    url::form_urlencoded::parse(format!("v={}", raw).as_bytes())
        .next()
        .map(|(_, v)| v.into_owned())
        .unwrap_or_default()
}

/// Parse `expires_in` the way a lenient integer parser would: skip leading
/// whitespace, accept a sign, read the leading run of digits. Anything without
/// digits is `None`.
pub fn parse_expires_in(raw: Option<&str>) -> Option<i64> {
    let s = raw?.trim_start();
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    digits[..end].parse::<i64>().ok().map(|n| sign * n)
}

/// Token parameters carried by an OAuth redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectParams {
    pub access_token: String,
    pub expires_in: Option<i64>,
}

impl RedirectParams {
    /// Extract redirect parameters from `url`. `None` unless a non-empty
    /// `access_token` is present.
    pub fn from_url(url: &str) -> Option<Self> {
        let access_token = lookup("access_token", url).filter(|t| !t.is_empty())?;
        let expires_in = parse_expires_in(lookup("expires_in", url).as_deref());
        Some(Self {
            access_token,
            expires_in,
        })
    }
}

/// Query first, then the trailing fragment read as a query string.
fn lookup(name: &str, url: &str) -> Option<String> {
    let from_query = parameter_by_name(name, url);
    if from_query.as_deref().is_some_and(|v| !v.is_empty()) {
        return from_query;
    }
    let from_fragment = url
        .rfind('#')
        .and_then(|idx| parameter_by_name(name, &format!("?{}", &url[idx + 1..])));
    from_fragment.or(from_query)
}
