/// Scan manifest produced by the ingestion pipeline.
pub const RELATIVE_MANIFEST_PATH: &str = "scan/manifest.scan.json";
