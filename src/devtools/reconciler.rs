//! Observer-side reconciliation of `Start`/`Response` pairs.
//!
//! Records move `absent -> pending -> resolved` per correlation id. A
//! `Response` is overlaid onto the record opened by the `Start` with the same
//! id; a `Response` without one is dropped. A repeated `Response` overlays
//! again. `MessageKey` updates the mirrored key whether or not recording is on.

use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::config::DevtoolsConfig;
use crate::wire::DevtoolsMessage;

/// One request/response record, as a flat field map.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledRecord {
    fields: Map<String, Value>,
}

impl ReconciledRecord {
    fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn id(&self) -> Option<&str> {
        self.fields.get("id").and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// True once a `Response` has been overlaid.
    pub fn is_resolved(&self) -> bool {
        self.fields.get("type").and_then(Value::as_str) == Some("Response")
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }

    fn overlay(&mut self, incoming: Map<String, Value>) {
        for (key, value) in incoming {
            self.fields.insert(key, value);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    NotRecording,
    UnmatchedResponse,
}

/// What applying one message did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Appended,
    Merged,
    Dropped(DropReason),
    MessageKeyUpdated,
    Ignored,
}

#[derive(Debug)]
pub struct ResponseReconciler {
    records: Vec<ReconciledRecord>,
    index: HashMap<String, usize>,
    message_key: Option<String>,
    recording: bool,
}

impl ResponseReconciler {
    pub fn new(recording: bool) -> Self {
        Self {
            records: Vec::new(),
            index: HashMap::new(),
            message_key: None,
            recording,
        }
    }

    pub fn apply(&mut self, message: DevtoolsMessage) -> ApplyOutcome {
        match message {
            DevtoolsMessage::MessageKey { message_key } => {
                self.message_key = Some(message_key);
                ApplyOutcome::MessageKeyUpdated
            }
            DevtoolsMessage::RequestMessageKey => ApplyOutcome::Ignored,
            message @ DevtoolsMessage::Start(_) => {
                if !self.recording {
                    return ApplyOutcome::Dropped(DropReason::NotRecording);
                }
                let record = ReconciledRecord::new(message.to_fields());
                if let Some(id) = record.id() {
                    // Duplicate starts keep pointing at the first record.
                    self.index
                        .entry(id.to_string())
                        .or_insert(self.records.len());
                }
                self.records.push(record);
                ApplyOutcome::Appended
            }
            message @ DevtoolsMessage::Response(_) => {
                if !self.recording {
                    return ApplyOutcome::Dropped(DropReason::NotRecording);
                }
                let position = message.id().and_then(|id| self.index.get(id)).copied();
                match position {
                    Some(position) => {
                        self.records[position].overlay(message.to_fields());
                        ApplyOutcome::Merged
                    }
                    None => {
                        trace!(id = ?message.id(), "Dropping response without a recorded start");
                        ApplyOutcome::Dropped(DropReason::UnmatchedResponse)
                    }
                }
            }
        }
    }

    pub fn records(&self) -> &[ReconciledRecord] {
        &self.records
    }

    pub fn record(&self, id: &str) -> Option<&ReconciledRecord> {
        self.index.get(id).map(|position| &self.records[*position])
    }

    /// Mirrored gateway message key, once announced.
    pub fn message_key(&self) -> Option<&str> {
        self.message_key.as_deref()
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn set_recording(&mut self, recording: bool) {
        self.recording = recording;
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.index.clear();
    }
}

impl Default for ResponseReconciler {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Reconciler shared between a port connection and its readers. Each message
/// is applied under the lock, start to finish.
#[derive(Debug, Clone, Default)]
pub struct SharedReconciler(Arc<Mutex<ResponseReconciler>>);

impl SharedReconciler {
    pub fn new(inner: ResponseReconciler) -> Self {
        Self(Arc::new(Mutex::new(inner)))
    }

    /// Empty reconciler whose recording starts as `config.recording`.
    pub fn from_config(config: &DevtoolsConfig) -> Self {
        Self::new(ResponseReconciler::new(config.recording))
    }

    pub fn apply(&self, message: DevtoolsMessage) -> ApplyOutcome {
        self.0.lock().apply(message)
    }

    pub fn records(&self) -> Vec<ReconciledRecord> {
        self.0.lock().records().to_vec()
    }

    pub fn message_key(&self) -> Option<String> {
        self.0.lock().message_key().map(str::to_string)
    }

    pub fn is_recording(&self) -> bool {
        self.0.lock().is_recording()
    }

    pub fn set_recording(&self, recording: bool) {
        debug!(recording, "Devtools recording toggled");
        self.0.lock().set_recording(recording);
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }
}
