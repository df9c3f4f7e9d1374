//! Daily dose tracking.
//!
//! The free functions in this module are pure: they take the current [`AppState`]
//! by reference and hand back the next one. [`Tracker`] binds that state to a
//! [`KeyValueStore`] and writes the collection through after every change.
use std::sync::Arc;

use log::{debug, info};

use crate::{
    generate_id, parse_quantity, read_item, require_fields, DoseSummary, KeyValueStore,
    MedicationRecord, PendingWrite, PillError, Result, RECORDS_KEY, RESET_MARKER_KEY,
};

/// Form inputs as typed, plus the record being edited if any
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormState {
    pub name: String,
    pub quantity: String,
    pub scheduled_time: String,
    pub editing_id: Option<String>,
}

/// Whether a submit will append a record or rewrite one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode<'a> {
    Adding,
    Editing(&'a str),
}

impl FormState {
    pub fn mode(&self) -> FormMode<'_> {
        match &self.editing_id {
            Some(id) => FormMode::Editing(id),
            None => FormMode::Adding,
        }
    }
}

/// Everything the screen holds between events
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppState {
    /// Records in insertion order
    pub records: Vec<MedicationRecord>,
    pub form: FormState,
}

impl AppState {
    pub fn with_records(records: Vec<MedicationRecord>) -> Self {
        AppState {
            records,
            form: FormState::default(),
        }
    }

    pub fn find(&self, id: &str) -> Option<&MedicationRecord> {
        self.records.iter().find(|r| r.id == id)
    }
}

/// Result of comparing the stored marker with today
#[derive(Debug)]
pub struct ResetOutcome {
    pub records: Vec<MedicationRecord>,
    /// True when the taken flags were cleared and both entries need rewriting
    pub cleared: bool,
}

/// Clears every taken flag unless the marker already says `today`
pub fn apply_daily_reset(
    mut records: Vec<MedicationRecord>,
    stored_marker: Option<&str>,
    today: &str,
) -> ResetOutcome {
    if stored_marker == Some(today) {
        return ResetOutcome {
            records,
            cleared: false,
        };
    }

    for record in records.iter_mut() {
        record.taken_today = false;
    }

    ResetOutcome {
        records,
        cleared: true,
    }
}

/// Validates the form and applies it.
///
/// In Editing mode the bound record gets the new name, quantity and time; an id
/// that no longer exists leaves the collection as it was. In Adding mode a new
/// pending record is appended with an id from `new_id`. Either way the form is
/// cleared afterwards. Validation failures leave `state` untouched.
pub fn submit_form<F>(state: &AppState, new_id: F) -> Result<AppState>
where
    F: FnOnce(&[MedicationRecord]) -> String,
{
    let form = &state.form;
    require_fields(&[&form.name, &form.quantity, &form.scheduled_time])?;
    let quantity = parse_quantity(&form.quantity)?;

    let records = match form.mode() {
        FormMode::Editing(id) => state
            .records
            .iter()
            .map(|r| {
                if r.id == id {
                    MedicationRecord {
                        name: form.name.clone(),
                        quantity,
                        scheduled_time: form.scheduled_time.clone(),
                        ..r.clone()
                    }
                } else {
                    r.clone()
                }
            })
            .collect(),
        FormMode::Adding => {
            let mut records = state.records.clone();
            let id = new_id(&records);
            records.push(MedicationRecord::new(
                id,
                form.name.clone(),
                quantity,
                form.scheduled_time.clone(),
            ));
            records
        }
    };

    Ok(AppState {
        records,
        form: FormState::default(),
    })
}

/// Flips the taken flag of the matching record
pub fn toggle_taken(state: &AppState, id: &str) -> AppState {
    let records = state
        .records
        .iter()
        .map(|r| {
            if r.id == id {
                MedicationRecord {
                    taken_today: !r.taken_today,
                    ..r.clone()
                }
            } else {
                r.clone()
            }
        })
        .collect();

    AppState {
        records,
        form: state.form.clone(),
    }
}

pub fn delete_record(state: &AppState, id: &str) -> AppState {
    AppState {
        records: state
            .records
            .iter()
            .filter(|r| r.id != id)
            .cloned()
            .collect(),
        form: state.form.clone(),
    }
}

/// Loads `record` into the form and binds the form to it
pub fn prepare_edit(state: &AppState, record: &MedicationRecord) -> AppState {
    AppState {
        records: state.records.clone(),
        form: FormState {
            name: record.name.clone(),
            quantity: record.quantity.to_string(),
            scheduled_time: record.scheduled_time.clone(),
            editing_id: Some(record.id.clone()),
        },
    }
}

/// Records ordered by scheduled time; equal times keep insertion order
pub fn sorted_for_display(records: &[MedicationRecord]) -> Vec<&MedicationRecord> {
    let mut sorted: Vec<&MedicationRecord> = records.iter().collect();
    sorted.sort_by(|a, b| a.scheduled_time.cmp(&b.scheduled_time));
    sorted
}

pub fn summarize(records: &[MedicationRecord]) -> DoseSummary {
    let taken = records.iter().filter(|r| r.taken_today).count();
    DoseSummary {
        total: records.len(),
        taken,
        pending: records.len() - taken,
    }
}

/// Owns the screen state and writes it through to the store.
pub struct Tracker {
    store: Arc<dyn KeyValueStore>,
    state: AppState,
}

impl Tracker {
    /// Reads the store and runs the daily reset against `today`.
    ///
    /// Writes made here are awaited before returning, so the store is consistent
    /// with the returned tracker.
    pub async fn load(store: Arc<dyn KeyValueStore>, today: &str) -> Result<Self> {
        let stored = read_item(&store, RECORDS_KEY).await?;
        let marker = read_item(&store, RESET_MARKER_KEY).await?;

        let records = match stored {
            None => {
                debug!("No stored records, marking {} as the last reset", today);
                PendingWrite::spawn(Arc::clone(&store), RESET_MARKER_KEY, today.to_string())
                    .wait()
                    .await?;
                Vec::new()
            }
            Some(raw) => {
                let records: Vec<MedicationRecord> = serde_json::from_str(&raw)?;
                let outcome = apply_daily_reset(records, marker.as_deref(), today);

                if outcome.cleared {
                    info!(
                        "New day ({} -> {}), cleared taken flags on {} records",
                        marker.as_deref().unwrap_or("never"),
                        today,
                        outcome.records.len()
                    );
                    let json = serde_json::to_string(&outcome.records)?;
                    PendingWrite::spawn(Arc::clone(&store), RECORDS_KEY, json)
                        .wait()
                        .await?;
                    PendingWrite::spawn(Arc::clone(&store), RESET_MARKER_KEY, today.to_string())
                        .wait()
                        .await?;
                }

                outcome.records
            }
        };

        debug!("Loaded {} records", records.len());
        Ok(Self {
            store,
            state: AppState::with_records(records),
        })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn records(&self) -> &[MedicationRecord] {
        &self.state.records
    }

    pub fn form(&self) -> &FormState {
        &self.state.form
    }

    pub fn sorted(&self) -> Vec<&MedicationRecord> {
        sorted_for_display(&self.state.records)
    }

    pub fn summary(&self) -> DoseSummary {
        summarize(&self.state.records)
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.state.form.name = name.into();
    }

    pub fn set_quantity(&mut self, quantity: impl Into<String>) {
        self.state.form.quantity = quantity.into();
    }

    pub fn set_scheduled_time(&mut self, scheduled_time: impl Into<String>) {
        self.state.form.scheduled_time = scheduled_time.into();
    }

    /// Binds the form to the record with `id`
    pub fn prepare_edit(&mut self, id: &str) -> Result<()> {
        let record = self
            .state
            .find(id)
            .cloned()
            .ok_or_else(|| PillError::RecordNotFound { id: id.to_string() })?;

        self.state = prepare_edit(&self.state, &record);
        Ok(())
    }

    /// Applies the form. On a validation error nothing changes and nothing is written.
    pub fn submit(&mut self) -> Result<PendingWrite> {
        let next = submit_form(&self.state, generate_id)?;
        self.state = next;
        self.persist()
    }

    pub fn toggle_taken(&mut self, id: &str) -> Result<PendingWrite> {
        self.state = toggle_taken(&self.state, id);
        self.persist()
    }

    pub fn delete(&mut self, id: &str) -> Result<PendingWrite> {
        self.state = delete_record(&self.state, id);
        self.persist()
    }

    /// Starts writing the whole collection to the store
    pub fn persist(&self) -> Result<PendingWrite> {
        let json = serde_json::to_string(&self.state.records)?;
        Ok(PendingWrite::spawn(
            Arc::clone(&self.store),
            RECORDS_KEY,
            json,
        ))
    }
}
