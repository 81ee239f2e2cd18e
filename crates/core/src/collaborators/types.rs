//! Types shared by collaborator contracts.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Invoice category produced by the prediction step.
///
/// Each category has a local working folder, a remote folder it is published
/// to and a pair of tables in the relational store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentCategory {
    Corrective,
    Preventive,
}

impl DocumentCategory {
    pub const ALL: [DocumentCategory; 2] = [Self::Corrective, Self::Preventive];

    /// Short code used for local folders and table suffixes.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Corrective => "corr",
            Self::Preventive => "prev",
        }
    }

    /// Remote folder the processed documents are published to.
    pub fn remote_folder(&self) -> &'static str {
        match self {
            Self::Corrective => "correctivos",
            Self::Preventive => "preventivos",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "corr" => Some(Self::Corrective),
            "prev" => Some(Self::Preventive),
            _ => None,
        }
    }
}

impl fmt::Display for DocumentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Summary returned by the preprocessing step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreprocessReport {
    pub train_samples: usize,
    pub test_samples: usize,
}

/// One purchase order extracted by the recognition step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedOrder {
    pub order_id: i64,
    /// Creation date as printed on the invoice.
    pub date: String,
    pub items: Vec<String>,
    pub quantities: Vec<String>,
    /// Line totals, possibly with thousands separators.
    pub totals: Vec<String>,
    pub total: String,
}
