//! Donor registration.
//!
//! A form is either being edited (possibly showing an error from the last
//! attempt) or has been submitted. Submitting validates presence of every
//! field, asks the geocoder for coordinates, and writes one donor document.
//! Nothing here fails the caller: every error ends up as a message on the
//! `Editing` state.

use std::sync::Arc;

use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::geocode::{Coordinates, Geocoder};
use crate::models::BloodGroup;
use crate::store::{DataStore, DocumentId, NewDocument, Record, DONORS_COLLECTION};

/// Shown when any field is left empty.
pub const MISSING_FIELDS_MESSAGE: &str = "Please fill out all the fields.";

/// Shown after a successful registration.
pub const SUCCESS_MESSAGE: &str = "You are now a registered donor!";

/// Field the store stamps with its own creation time.
pub const TIMESTAMP_FIELD: &str = "timestamp";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please fill out all the fields.")]
    MissingFields,
}

/// Raw form input.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationForm {
    pub name: String,
    pub blood_group: Option<BloodGroup>,
    pub contact: String,
    pub location: String,
}

impl Default for RegistrationForm {
    /// Empty text fields; the blood group selector starts on its first option.
    fn default() -> Self {
        Self {
            name: String::new(),
            blood_group: Some(BloodGroup::ALL[0]),
            contact: String::new(),
            location: String::new(),
        }
    }
}

/// A form that passed the presence check.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidRegistration {
    pub name: String,
    pub blood_group: BloodGroup,
    pub contact: String,
    pub location: String,
}

impl RegistrationForm {
    pub fn validate(&self) -> Result<ValidRegistration, ValidationError> {
        let present = |s: &str| !s.is_empty();

        match self.blood_group {
            Some(blood_group)
                if present(self.name.as_str())
                    && present(self.contact.as_str())
                    && present(self.location.as_str()) =>
            {
                Ok(ValidRegistration {
                    name: self.name.clone(),
                    blood_group,
                    contact: self.contact.clone(),
                    location: self.location.clone(),
                })
            }
            _ => Err(ValidationError::MissingFields),
        }
    }
}

impl ValidRegistration {
    /// Donor document with coordinates and the server timestamp marker.
    pub fn into_document(self, coords: Coordinates) -> NewDocument {
        let mut fields = Record::new();
        fields.insert("name".to_string(), Value::String(self.name));
        fields.insert("blood_group".to_string(), json!(self.blood_group.label()));
        fields.insert("contact".to_string(), Value::String(self.contact));
        fields.insert("location".to_string(), Value::String(self.location));
        fields.insert("lat".to_string(), json!(coords.lat));
        fields.insert("lon".to_string(), json!(coords.lon));
        NewDocument::new(fields).with_server_timestamp(TIMESTAMP_FIELD)
    }
}

/// Registration form state for one page view.
#[derive(Debug, Clone, PartialEq)]
pub enum FormState {
    Editing { error: Option<String> },
    Submitted { document_id: DocumentId },
}

impl Default for FormState {
    fn default() -> Self {
        FormState::Editing { error: None }
    }
}

impl FormState {
    pub fn is_submitted(&self) -> bool {
        matches!(self, FormState::Submitted { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            FormState::Editing { error } => error.as_deref(),
            FormState::Submitted { .. } => None,
        }
    }
}

/// Writes new donors through an injected store and geocoder.
#[derive(Clone)]
pub struct RegistrationHandler {
    store: Arc<dyn DataStore>,
    geocoder: Arc<dyn Geocoder>,
}

impl RegistrationHandler {
    pub fn new(store: Arc<dyn DataStore>, geocoder: Arc<dyn Geocoder>) -> Self {
        Self { store, geocoder }
    }

    pub async fn submit(&self, form: &RegistrationForm) -> FormState {
        let valid = match form.validate() {
            Ok(valid) => valid,
            Err(e) => {
                debug!("Registration rejected: missing fields");
                return FormState::Editing {
                    error: Some(e.to_string()),
                };
            }
        };

        let coords = match self.geocoder.geocode(&valid.location).await {
            Ok(coords) => coords,
            Err(e) => {
                error!(error = %e, location = %valid.location, "Geocoding failed");
                return FormState::Editing {
                    error: Some(format!("An error occurred: {}", e)),
                };
            }
        };

        let blood_group = valid.blood_group;
        match self.store.insert(DONORS_COLLECTION, valid.into_document(coords)).await {
            Ok(document_id) => {
                info!(id = %document_id, %blood_group, "Donor registered");
                FormState::Submitted { document_id }
            }
            Err(e) => {
                error!(error = %e, "Donor registration write failed");
                FormState::Editing {
                    error: Some(format!("An error occurred: {}", e)),
                }
            }
        }
    }
}
