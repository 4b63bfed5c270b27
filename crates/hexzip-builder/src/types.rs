// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Core identifier and error types for hierarchy building.
*/

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::audit::BuildAudit;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// 5-digit ZIP Code Tabulation Area code
    ZctaId
);
string_id!(
    /// Health Service Area identifier
    HsaId
);
string_id!(
    /// Hospital Referral Region identifier
    HrrId
);
string_id!(
    /// USPS ZIP code
    ZipCode
);

/// Result type for hierarchy operations
pub type BuildResult<T> = Result<T, BuildError>;

/// Errors that can occur while building or repairing the hierarchy
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Invalid geometry for ZCTA {zcta}: {reason}")]
    InvalidGeometry { zcta: String, reason: String },

    #[error("Invalid coordinate: lat={lat}, lng={lng}")]
    InvalidCoordinate { lat: f64, lng: f64 },

    #[error("Invalid cell index: {0}")]
    InvalidCell(String),

    #[error("Unknown ZCTA: {0}")]
    UnknownZcta(ZctaId),

    #[error("ZCTA {0} is registered twice")]
    DuplicateZcta(ZctaId),

    #[error("HSA {hsa} already belongs to HRR {existing}, refusing HRR {requested}")]
    ConflictingParent {
        hsa: HsaId,
        existing: HrrId,
        requested: HrrId,
    },

    #[error("Required supporting data is missing: {0}")]
    MissingSupportingData(String),

    #[error("{remaining} cells still have more than one owner after duplicate resolution")]
    UnresolvedDuplicates { remaining: usize },

    #[error("Repair did not converge after {iterations} iterations ({remaining} violations left)")]
    NotConverged { iterations: usize, remaining: usize },

    #[error("Final validation reported {violations} violations")]
    Inconsistent { violations: usize },

    #[error("Invalid build options: {0}")]
    InvalidOptions(String),

    #[error("Worker pool error: {0}")]
    WorkerPool(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Build failed: {source}")]
    BuildFailed {
        audit: Box<BuildAudit>,
        source: Box<BuildError>,
    },
}

impl BuildError {
    /// Audit record attached to a failed build, if any
    pub fn audit(&self) -> Option<&BuildAudit> {
        match self {
            BuildError::BuildFailed { audit, .. } => Some(audit),
            _ => None,
        }
    }

    /// Whether this error only concerns a single input item (the build can continue)
    pub fn is_per_item(&self) -> bool {
        matches!(
            self,
            BuildError::InvalidGeometry { .. }
                | BuildError::InvalidCoordinate { .. }
                | BuildError::UnknownZcta(_)
                | BuildError::DuplicateZcta(_)
                | BuildError::ConflictingParent { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_serialize_transparently() {
        let zcta = ZctaId::from("02139");
        assert_eq!(serde_json::to_string(&zcta).unwrap(), "\"02139\"");
        assert_eq!(zcta.to_string(), "02139");
    }

    #[test]
    fn test_ids_order_lexicographically() {
        let mut ids = vec![ZctaId::from("10002"), ZctaId::from("01001"), ZctaId::from("10001")];
        ids.sort();
        assert_eq!(ids[0].as_str(), "01001");
        assert_eq!(ids[2].as_str(), "10002");
    }

    #[test]
    fn test_per_item_classification() {
        assert!(BuildError::UnknownZcta(ZctaId::from("99999")).is_per_item());
        assert!(!BuildError::MissingSupportingData("zip crosswalk".into()).is_per_item());
        assert!(!BuildError::NotConverged { iterations: 3, remaining: 1 }.is_per_item());
    }
}
