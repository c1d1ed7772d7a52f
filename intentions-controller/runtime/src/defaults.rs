use anyhow::{anyhow, Error, Result};

/// The decision applied to a connection when no intention covers it.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum DefaultDecision {
    #[default]
    Allow,
    Deny,
}

// === impl DefaultDecision ===

impl DefaultDecision {
    pub fn is_allow(self) -> bool {
        self == Self::Allow
    }
}

impl std::str::FromStr for DefaultDecision {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "allow" => Ok(Self::Allow),
            "deny" => Ok(Self::Deny),
            s => Err(anyhow!("invalid default decision: {:?}", s)),
        }
    }
}

impl std::fmt::Display for DefaultDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Allow => "allow".fmt(f),
            Self::Deny => "deny".fmt(f),
        }
    }
}
