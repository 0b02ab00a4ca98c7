//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external collaborators. The core depends
//! only on these traits, not on concrete implementations.

mod file_reader;
mod importer;
mod normalizer;
mod publisher;

pub use file_reader::{FileReader, TabularFile, INITIAL_ROWS};
pub use importer::ApiImporter;
pub use normalizer::{AmountOptions, Normalizer};
pub use publisher::{PayloadPublisher, API_IMPORT_FINISHED, CSV_IMPORT_FINISHED};
