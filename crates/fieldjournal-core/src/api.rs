//! Request payloads accepted by the admin REST surface.
//!
//! Payloads are deserialized leniently (ids as strings, counters as signed
//! integers) and then validated into typed values, so a malformed request is
//! rejected with a field-level message before any store call is made.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::types::{PhotoOrder, Telemetry};

/// Parse a UUID path or body parameter.
pub fn parse_id(field: &str, raw: &str) -> Result<Uuid, ValidationError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| ValidationError::new(field, format!("'{raw}' is not a valid UUID")))
}

/// `{photoIds[], isPublished}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchPublishRequest {
    pub photo_ids: Vec<String>,
    pub is_published: bool,
}

impl BatchPublishRequest {
    /// Validate and return the parsed photo ids.
    pub fn validate(&self) -> Result<Vec<Uuid>, ValidationError> {
        if self.photo_ids.is_empty() {
            return Err(ValidationError::new("photoIds", "must contain at least one id"));
        }
        self.photo_ids
            .iter()
            .enumerate()
            .map(|(i, raw)| parse_id(&format!("photoIds[{i}]"), raw))
            .collect()
    }
}

/// One `{id, displayOrder}` entry as received.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderEntry {
    pub id: String,
    pub display_order: i64,
}

/// `{orders:[{id, displayOrder}]}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReorderRequest {
    pub orders: Vec<ReorderEntry>,
}

impl ReorderRequest {
    /// Validate into typed orders: known-good UUIDs, positive orders that fit
    /// an `i32`, and no photo listed twice.
    pub fn validate(&self) -> Result<Vec<PhotoOrder>, ValidationError> {
        if self.orders.is_empty() {
            return Err(ValidationError::new("orders", "must contain at least one entry"));
        }

        let mut seen = HashSet::with_capacity(self.orders.len());
        let mut parsed = Vec::with_capacity(self.orders.len());
        for (i, entry) in self.orders.iter().enumerate() {
            let id = parse_id(&format!("orders[{i}].id"), &entry.id)?;
            if !seen.insert(id) {
                return Err(ValidationError::new(
                    format!("orders[{i}].id"),
                    format!("photo {id} appears more than once"),
                ));
            }
            let display_order = i32::try_from(entry.display_order)
                .ok()
                .filter(|order| *order >= 1)
                .ok_or_else(|| {
                    ValidationError::new(
                        format!("orders[{i}].displayOrder"),
                        format!("{} is out of range", entry.display_order),
                    )
                })?;
            parsed.push(PhotoOrder { id, display_order });
        }
        Ok(parsed)
    }
}

/// `{views?, likes?, shares?, downloads?}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelemetryPatch {
    pub views: Option<i64>,
    pub likes: Option<i64>,
    pub shares: Option<i64>,
    pub downloads: Option<i64>,
}

impl TelemetryPatch {
    fn fields(&self) -> [(&'static str, Option<i64>); 4] {
        [
            ("views", self.views),
            ("likes", self.likes),
            ("shares", self.shares),
            ("downloads", self.downloads),
        ]
    }

    /// Reject negative counters and empty patches.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.fields().iter().all(|(_, v)| v.is_none()) {
            return Err(ValidationError::new("telemetry", "at least one counter is required"));
        }
        for (name, value) in self.fields() {
            if let Some(v) = value {
                if v < 0 {
                    return Err(ValidationError::new(name, "must be >= 0"));
                }
            }
        }
        Ok(())
    }

    /// Merge into current counters. A counter never goes down.
    pub fn apply(&self, current: Telemetry) -> Telemetry {
        let merge = |current: u64, incoming: Option<i64>| match incoming {
            Some(v) => current.max(u64::try_from(v).unwrap_or(0)),
            None => current,
        };
        Telemetry {
            views: merge(current.views, self.views),
            likes: merge(current.likes, self.likes),
            shares: merge(current.shares, self.shares),
            downloads: merge(current.downloads, self.downloads),
        }
    }
}
