pub mod ingest_service;

pub use ingest_service::{IngestError, IngestRequest, IngestResult, IngestService, SheetListing};
