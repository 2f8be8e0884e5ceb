use serde::Deserialize;

/// Proxying protocol a candidate speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialType {
    Http,
    Socks5,
}

impl DialType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DialType::Http => "http",
            DialType::Socks5 => "socks5",
        }
    }

    /// Exact match only: the inventory speaks lowercase tags
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "http" => Some(DialType::Http),
            "socks5" => Some(DialType::Socks5),
            _ => None,
        }
    }
}

impl std::fmt::Display for DialType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A proxy offered by the inventory for validation in the current cycle
///
/// Missing fields decode to their zero value so that one sloppy item does not
/// sink the whole batch; such candidates simply fail validation later.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Candidate {
    /// Inventory-assigned id, only used when reporting back
    #[serde(default)]
    pub id: i64,
    /// `host:port`, optionally prefixed with `user:pass@`
    #[serde(default)]
    pub address: String,
    /// Stored as the raw tag so unknown values can be logged verbatim
    #[serde(default)]
    pub dial_type: String,
    #[serde(default)]
    pub provider: String,
}

impl Candidate {
    pub fn new(id: i64, address: &str, dial_type: &str, provider: &str) -> Self {
        Self {
            id,
            address: address.to_string(),
            dial_type: dial_type.to_string(),
            provider: provider.to_string(),
        }
    }

    /// Get the dial type enum
    pub fn dial_type_enum(&self) -> Option<DialType> {
        DialType::from_str(&self.dial_type)
    }
}

/// Body of the inventory's `require` endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct RequireResponse {
    #[serde(default)]
    pub data: Option<Vec<Candidate>>,
}

impl RequireResponse {
    pub fn into_candidates(self) -> Vec<Candidate> {
        self.data.unwrap_or_default()
    }
}
