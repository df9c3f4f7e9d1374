//! Core record type for the pilltrack application.
//!
//! The serialized field names (`nombre`, `cantidad`, `tiempo`, `tomada`) are the
//! ones already stored on disk by earlier versions of the tracker and must not change.
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Represents a single tracked medication
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicationRecord {
    /// Unique identifier, never changes after creation
    pub id: String,
    /// Medication name as entered
    #[serde(rename = "nombre")]
    pub name: String,
    /// Number of pills per dose
    #[serde(rename = "cantidad")]
    pub quantity: u32,
    /// Free-form schedule ("08:00", "morning"), only used for ordering
    #[serde(rename = "tiempo")]
    pub scheduled_time: String,
    /// Whether the dose was taken since the last daily reset
    #[serde(rename = "tomada")]
    pub taken_today: bool,
}

impl MedicationRecord {
    /// Creates a pending record with the given id
    pub fn new(id: String, name: String, quantity: u32, scheduled_time: String) -> Self {
        MedicationRecord {
            id,
            name,
            quantity,
            scheduled_time,
            taken_today: false,
        }
    }

    pub fn status_label(&self) -> &'static str {
        if self.taken_today {
            "Taken"
        } else {
            "Pending"
        }
    }
}

/// Generates an id from the current time in milliseconds
pub fn generate_id(existing: &[MedicationRecord]) -> String {
    unique_id_from(Utc::now().timestamp_millis(), existing)
}

/// Renders `millis` as an id, bumping it until it no longer clashes with `existing`
pub fn unique_id_from(millis: i64, existing: &[MedicationRecord]) -> String {
    let mut candidate = millis;
    loop {
        let id = candidate.to_string();
        if !existing.iter().any(|r| r.id == id) {
            return id;
        }
        candidate += 1;
    }
}
