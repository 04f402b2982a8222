use std::fmt;

/// Caller identity for rate limiting: `"{ip}:{token-hash-prefix}"` for
/// authenticated requests, bare IP otherwise.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct ClientKey(pub String);

impl fmt::Display for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Rate-limit policy class an endpoint belongs to.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum EndpointClass {
    General,
    Auth,
    Sensitive,
}

impl fmt::Display for EndpointClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EndpointClass::General => "general",
            EndpointClass::Auth => "auth",
            EndpointClass::Sensitive => "sensitive",
        };
        write!(f, "{name}")
    }
}
