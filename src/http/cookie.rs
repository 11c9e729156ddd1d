use std::collections::HashMap;
use std::fmt;

/// Common cookie attribute names.
pub mod attributes {
    pub const DOMAIN: &str = "Domain";
    pub const EXPIRES: &str = "Expires";
    pub const HTTP_ONLY: &str = "HttpOnly";
    pub const MAX_AGE: &str = "Max-Age";
    pub const PATH: &str = "Path";
    pub const SECURE: &str = "Secure";
}

/// A cookie set by a response.
///
/// Serializes as `key=value; Attr; Attr2=val2`. Attributes with an empty
/// value are written as bare flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub key: String,
    pub value: String,
    pub attributes: Vec<(String, String)>,
}

impl Cookie {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            attributes: Vec::new(),
        }
    }

    /// Sets an attribute, replacing an earlier one with the same name.
    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        match self
            .attributes
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
        self
    }

    pub fn path(self, path: impl Into<String>) -> Self {
        self.attribute(attributes::PATH, path)
    }

    pub fn domain(self, domain: impl Into<String>) -> Self {
        self.attribute(attributes::DOMAIN, domain)
    }

    pub fn expires(self, date: impl Into<String>) -> Self {
        self.attribute(attributes::EXPIRES, date)
    }

    pub fn max_age(self, seconds: u64) -> Self {
        self.attribute(attributes::MAX_AGE, seconds.to_string())
    }

    pub fn http_only(self) -> Self {
        self.attribute(attributes::HTTP_ONLY, "")
    }

    pub fn secure(self) -> Self {
        self.attribute(attributes::SECURE, "")
    }
}

impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)?;
        for (name, value) in &self.attributes {
            if value.is_empty() {
                write!(f, "; {}", name)?;
            } else {
                write!(f, "; {}={}", name, value)?;
            }
        }
        Ok(())
    }
}

/// Parses the values of `Cookie` request headers into a key/value map.
///
/// Pairs are separated by `"; "`. A pair without `=` is skipped. Later
/// occurrences of a key win.
pub fn parse_cookie_header<'a>(values: impl IntoIterator<Item = &'a str>) -> HashMap<String, String> {
    let mut cookies = HashMap::new();

    for header in values {
        for pair in header.split("; ") {
            if let Some((key, value)) = pair.split_once('=') {
                cookies.insert(key.to_string(), value.to_string());
            }
        }
    }

    cookies
}
