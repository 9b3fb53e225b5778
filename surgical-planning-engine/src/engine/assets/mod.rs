//! Asset definitions for the scan being planned on.

/// Scan manifest naming the converted model and its calibration.
pub mod scan_manifest;
