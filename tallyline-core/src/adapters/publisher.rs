//! Payload publishers

use std::io::Write;
use std::sync::Mutex;

use serde::Serialize;

use crate::domain::result::{Error, Result};
use crate::domain::CommitPayload;
use crate::ports::PayloadPublisher;

/// Keeps every published payload in memory
#[derive(Debug, Default)]
pub struct MemoryPublisher {
    published: Mutex<Vec<(String, CommitPayload)>>,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Published `(routing_key, payload)` pairs, oldest first
    pub fn published(&self) -> Vec<(String, CommitPayload)> {
        self.published
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    pub fn last(&self) -> Option<CommitPayload> {
        self.published().pop().map(|(_, payload)| payload)
    }
}

impl PayloadPublisher for MemoryPublisher {
    fn publish(&self, routing_key: &str, payload: &CommitPayload) -> Result<()> {
        let mut published = self
            .published
            .lock()
            .map_err(|_| Error::Config("publisher lock poisoned".to_string()))?;
        published.push((routing_key.to_string(), payload.clone()));
        Ok(())
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    routing_key: &'a str,
    payload: &'a CommitPayload,
}

/// Writes one JSON document per payload, newline separated
pub struct JsonLinesPublisher<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesPublisher<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|_| Error::Config("publisher lock poisoned".to_string()))
    }
}

impl<W: Write + Send> PayloadPublisher for JsonLinesPublisher<W> {
    fn publish(&self, routing_key: &str, payload: &CommitPayload) -> Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| Error::Config("publisher lock poisoned".to_string()))?;
        serde_json::to_writer(&mut *writer, &Envelope { routing_key, payload })?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}
