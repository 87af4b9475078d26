//! Annotation kinds attached to methods.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TrimreachError;
use crate::method::NodeId;

/// Category used when a configuration entry names none.
pub const DEFAULT_CATEGORY: &str = "Uncategorized";

/// Category given to unresolved reflective calls the scanner did not bucket.
pub const UNANALYZED_CATEGORY: &str = "LinkerUnanalyzed";

/// The readiness dimension an annotation applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Aspect {
    AssemblyTrimming,
    TypeTrimming,
    MemberTrimming,
    SingleFile,
}

impl FromStr for Aspect {
    type Err = TrimreachError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AssemblyTrimming" => Ok(Self::AssemblyTrimming),
            "TypeTrimming" => Ok(Self::TypeTrimming),
            "MemberTrimming" => Ok(Self::MemberTrimming),
            "SingleFile" => Ok(Self::SingleFile),
            other => Err(TrimreachError::invalid_argument(format!(
                "unknown aspect '{}'",
                other
            ))),
        }
    }
}

/// One reflective call site whose target could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct UnanalyzedCall {
    /// The reflection API invoked at the call site
    pub reflection_method: NodeId,
    pub message: String,
    pub category: String,
    pub aspect: Aspect,
}

/// Judgment attached to a method.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ApiAnnotation {
    /// Unsafe to trim; reported with `message`.
    Warn {
        category: String,
        message: String,
        aspect: Aspect,
    },
    /// Findings rooted here are dropped from reporting.
    Suppress {
        category: String,
        reason: String,
        aspect: Aspect,
    },
    /// Grows by one call per unresolved reflective call site. Never empty.
    Unanalyzed { calls: Vec<UnanalyzedCall> },
}

impl ApiAnnotation {
    pub fn warn(category: impl Into<String>, message: impl Into<String>, aspect: Aspect) -> Self {
        Self::Warn {
            category: category.into(),
            message: message.into(),
            aspect,
        }
    }

    pub fn suppress(category: impl Into<String>, reason: impl Into<String>, aspect: Aspect) -> Self {
        Self::Suppress {
            category: category.into(),
            reason: reason.into(),
            aspect,
        }
    }

    pub fn category(&self) -> &str {
        match self {
            Self::Warn { category, .. } | Self::Suppress { category, .. } => category,
            Self::Unanalyzed { calls } => calls
                .first()
                .map(|c| c.category.as_str())
                .unwrap_or(UNANALYZED_CATEGORY),
        }
    }

    pub fn aspect(&self) -> Aspect {
        match self {
            Self::Warn { aspect, .. } | Self::Suppress { aspect, .. } => *aspect,
            Self::Unanalyzed { calls } => calls
                .first()
                .map(|c| c.aspect)
                .unwrap_or(Aspect::MemberTrimming),
        }
    }

    pub fn is_warn(&self) -> bool {
        matches!(self, Self::Warn { .. })
    }

    pub fn is_suppress(&self) -> bool {
        matches!(self, Self::Suppress { .. })
    }

    pub fn is_unanalyzed(&self) -> bool {
        matches!(self, Self::Unanalyzed { .. })
    }
}

impl fmt::Display for ApiAnnotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warn {
                category, message, ..
            } => write!(f, "{}: {}", category, message),
            Self::Suppress {
                category, reason, ..
            } => write!(f, "{}: {}", category, reason),
            Self::Unanalyzed { calls } => {
                write!(f, "{}: ", self.category())?;
                for (i, call) in calls.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" | ")?;
                    }
                    f.write_str(&call.message)?;
                }
                Ok(())
            }
        }
    }
}
