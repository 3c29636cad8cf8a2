use serde::Serialize;
use std::path::PathBuf;

use super::attachment::AttachmentRecord;
use super::format::SupportedFormat;
use crate::validation::ConversionRejection;

/// One attachment paired with the format it should be converted to.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub target: SupportedFormat,
    pub attachment: AttachmentRecord,
}

impl ConversionRequest {
    pub fn new(target: SupportedFormat, attachment: AttachmentRecord) -> Self {
        Self { target, attachment }
    }
}

/// Everything the caller needs to carry out an accepted conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionPlan {
    pub source_format: SupportedFormat,
    pub target_format: SupportedFormat,
    pub new_url: String,
    pub new_path: PathBuf,
    pub new_mime_type: &'static str,
}

/// Outcome of validating a [`ConversionRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionDecision {
    Accepted(ConversionPlan),
    Rejected(ConversionRejection),
}

impl ConversionDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ConversionDecision::Accepted(_))
    }

    pub fn into_result(self) -> Result<ConversionPlan, ConversionRejection> {
        match self {
            ConversionDecision::Accepted(plan) => Ok(plan),
            ConversionDecision::Rejected(reason) => Err(reason),
        }
    }
}
