//! Barcode scan results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::book::BookView;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum BarcodeFormat {
    #[serde(rename = "ISBN-13")]
    Isbn13,
    #[serde(rename = "ISBN-10")]
    Isbn10,
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

/// Where a detected code came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ScanSource {
    Camera,
    Manual,
}

/// Entry of the scan history
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ScanRecord {
    pub code: String,
    pub format: BarcodeFormat,
    pub source: ScanSource,
    pub timestamp: DateTime<Utc>,
}

/// Detected code resolved against the catalog
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ScanOutcome {
    pub code: String,
    pub formatted: String,
    pub source: ScanSource,
    pub book: Option<BookView>,
}

/// Typed fallback when the camera is unavailable
#[derive(Debug, Deserialize, ToSchema)]
pub struct ManualScanRequest {
    pub code: String,
}
