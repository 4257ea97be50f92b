//! Tiered admission control: how many jobs may be queued at once.
//!
//! Only pending and downloading jobs count against the limit. The check is
//! purely evaluative; the queue engine decides what to do with a denial.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Subscription plan; each tier maps to a maximum number of queued jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    #[default]
    Free,
    Pro,
    Unlimited,
}

impl PlanTier {
    pub fn as_str(self) -> &'static str {
        match self {
            PlanTier::Free => "free",
            PlanTier::Pro => "pro",
            PlanTier::Unlimited => "unlimited",
        }
    }

    /// Parse a tier name, falling back to `Free` for anything unknown.
    pub fn from_str_lossy(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl fmt::Display for PlanTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(PlanTier::Free),
            "pro" => Ok(PlanTier::Pro),
            "unlimited" => Ok(PlanTier::Unlimited),
            other => Err(format!("unknown plan tier: {other} (expected free, pro or unlimited)")),
        }
    }
}

/// Finite limits for the bounded tiers (optional `[limits]` section in config.toml).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierLimits {
    pub free: usize,
    pub pro: usize,
}

impl Default for TierLimits {
    fn default() -> Self {
        Self { free: 10, pro: 100 }
    }
}

impl TierLimits {
    /// Maximum queued jobs for `tier`; `None` means unbounded.
    pub fn limit_for(&self, tier: PlanTier) -> Option<usize> {
        match tier {
            PlanTier::Free => Some(self.free),
            PlanTier::Pro => Some(self.pro),
            PlanTier::Unlimited => None,
        }
    }

    /// Admit when unbounded or when `queued` is strictly below the limit.
    pub fn check(&self, tier: PlanTier, queued: usize) -> Result<(), AdmissionError> {
        match self.limit_for(tier) {
            Some(limit) if queued >= limit => Err(AdmissionError {
                limit,
                current: queued,
            }),
            _ => Ok(()),
        }
    }
}

/// Whether one more job may enter the queue under the default tier limits.
pub fn can_admit(tier: PlanTier, queued: usize) -> bool {
    TierLimits::default().check(tier, queued).is_ok()
}

/// Admission denied: the plan's queue limit is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("queue limit reached ({limit}). Upgrade to add more downloads")]
pub struct AdmissionError {
    pub limit: usize,
    pub current: usize,
}

impl AdmissionError {
    /// Stable code for front ends rendering upgrade prompts.
    pub const CODE: &'static str = "QUEUE_LIMIT";

    pub fn code(&self) -> &'static str {
        Self::CODE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limits() {
        let limits = TierLimits::default();
        assert_eq!(limits.limit_for(PlanTier::Free), Some(10));
        assert_eq!(limits.limit_for(PlanTier::Pro), Some(100));
        assert_eq!(limits.limit_for(PlanTier::Unlimited), None);
    }

    #[test]
    fn admits_strictly_below_limit() {
        assert!(can_admit(PlanTier::Free, 0));
        assert!(can_admit(PlanTier::Free, 9));
        assert!(!can_admit(PlanTier::Free, 10));
        assert!(!can_admit(PlanTier::Free, 11));
        assert!(can_admit(PlanTier::Pro, 99));
        assert!(!can_admit(PlanTier::Pro, 100));
    }

    #[test]
    fn unlimited_always_admits() {
        assert!(can_admit(PlanTier::Unlimited, 0));
        assert!(can_admit(PlanTier::Unlimited, 1_000_000));
    }

    #[test]
    fn denial_carries_limit_and_current() {
        let limits = TierLimits { free: 2, pro: 5 };
        let err = limits.check(PlanTier::Free, 2).unwrap_err();
        assert_eq!(err, AdmissionError { limit: 2, current: 2 });
        assert_eq!(err.code(), "QUEUE_LIMIT");
        assert_eq!(
            err.to_string(),
            "queue limit reached (2). Upgrade to add more downloads"
        );
    }

    #[test]
    fn tier_parsing() {
        assert_eq!("Pro".parse::<PlanTier>().unwrap(), PlanTier::Pro);
        assert_eq!(" unlimited ".parse::<PlanTier>().unwrap(), PlanTier::Unlimited);
        assert!("gold".parse::<PlanTier>().is_err());
        assert_eq!(PlanTier::from_str_lossy("gold"), PlanTier::Free);
    }
}
