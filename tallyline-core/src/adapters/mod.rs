//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - chrono / chrono-tz for the Normalizer port
//! - the csv crate for the FileReader port
//! - in-memory and JSON-lines sinks for the PayloadPublisher port
//! - built-in format definitions for the registry
//! - a deterministic demo importer for the ApiImporter port

pub mod csv_reader;
pub mod demo;
pub mod mappers;
pub mod normalizer;
pub mod publisher;
