//! Default toolkits - statically registered in-process tool groups.
//!
//! A request selects toolkits by name; when it names none the selection is
//! [`ToolkitSelection::All`].

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::core::error::DomainError;

/// A group of built-in tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Toolkit {
    /// Chart and table tools that produce canvas artifacts
    Visualization,
    /// Outbound HTTP fetch
    Http,
    /// Current time and date arithmetic
    Clock,
}

impl Toolkit {
    pub const ALL: [Toolkit; 3] = [Toolkit::Visualization, Toolkit::Http, Toolkit::Clock];

    pub fn as_str(&self) -> &'static str {
        match self {
            Toolkit::Visualization => "visualization",
            Toolkit::Http => "http",
            Toolkit::Clock => "clock",
        }
    }
}

impl std::fmt::Display for Toolkit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Toolkit {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "visualization" | "chart" | "charts" => Ok(Toolkit::Visualization),
            "http" | "web" => Ok(Toolkit::Http),
            "clock" | "time" => Ok(Toolkit::Clock),
            other => Err(DomainError::UnknownToolkit(other.to_string())),
        }
    }
}

/// Which toolkits a request enables.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ToolkitSelection {
    #[default]
    All,
    Only(Vec<Toolkit>),
}

impl ToolkitSelection {
    /// Parse a list of toolkit names.
    ///
    /// `None` selects every toolkit. Unknown names are returned separately so
    /// the caller can log them; they never fail the request.
    pub fn from_names(names: Option<&[String]>) -> (Self, Vec<String>) {
        let Some(names) = names else {
            return (ToolkitSelection::All, Vec::new());
        };

        let mut selected = Vec::new();
        let mut unknown = Vec::new();
        for name in names {
            if name.eq_ignore_ascii_case("all") {
                return (ToolkitSelection::All, unknown);
            }
            match name.parse::<Toolkit>() {
                Ok(toolkit) if !selected.contains(&toolkit) => selected.push(toolkit),
                Ok(_) => {}
                Err(_) => unknown.push(name.clone()),
            }
        }
        (ToolkitSelection::Only(selected), unknown)
    }

    pub fn includes(&self, toolkit: Toolkit) -> bool {
        match self {
            ToolkitSelection::All => true,
            ToolkitSelection::Only(list) => list.contains(&toolkit),
        }
    }

    /// Selected toolkits in stable order
    pub fn toolkits(&self) -> Vec<Toolkit> {
        Toolkit::ALL
            .into_iter()
            .filter(|t| self.includes(*t))
            .collect()
    }
}
