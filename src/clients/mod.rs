//! Clients - HTTP Clients for External APIs
//! 
//! This module contains the HTTP client for the journey system of record.

pub mod system_of_record_client;

// Re-export main types for convenience
pub use system_of_record_client::{RemoteSyncClient, SystemOfRecordClient};
