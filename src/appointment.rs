// src/appointment.rs

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{error::BookingError, lookup::RegionLookup, store::AppointmentStore};

/// Flag given to appointments created without one.
pub const DEFAULT_PARTICIPANT_FLAG: char = 'N';

/* -------------------------
   DB Row Model
--------------------------*/

/// One `appointment` row as stored. Text columns may be NULL here;
/// `Appointment::fill` is the only place they get turned into strings.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AppointmentRow {
    pub appointment_id: i32,
    pub module_id: i32,
    pub appointment_type_id: i32,
    pub title: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub city: Option<String>,
    pub region_id: Option<i32>,
    pub postal_code: Option<String>,
    pub phone: Option<String>,
    pub additional_address_info: Option<String>,
    pub contact_street: Option<String>,
    pub contact_phone: Option<String>,
    pub requestor_name: Option<String>,
    pub requestor_phone_type: Option<String>,
    pub requestor_phone: Option<String>,
    pub requestor_email: Option<String>,
    pub requestor_alt_phone_type: Option<String>,
    pub requestor_alt_phone: Option<String>,
    pub start_date_time: NaiveDateTime,
    pub end_date_time: NaiveDateTime,
    pub number_of_participants: i32,
    pub participant_gender: Option<String>,
    pub participant_flag: Option<String>,
    pub participant_instructions: Option<String>,
    pub number_of_special_participants: i32,
    pub is_accepted: Option<bool>,
    pub is_featured: bool,
    pub created_by: i32,
    pub creation_date: DateTime<Utc>,
    pub revising_user: i32,
    pub revision_date: DateTime<Utc>,
}

/* -------------------------
   Entity
--------------------------*/

/// Where an appointment stands in the approval workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AcceptanceStatus {
    Pending,
    Accepted,
    Declined,
}

impl From<Option<bool>> for AcceptanceStatus {
    fn from(is_accepted: Option<bool>) -> Self {
        match is_accepted {
            None => AcceptanceStatus::Pending,
            Some(true) => AcceptanceStatus::Accepted,
            Some(false) => AcceptanceStatus::Declined,
        }
    }
}

/// A booking request: what is happening, where, who asked for it and how
/// many people take part.
///
/// Fields are declared in their wire order (1 through 28); `module_id` and
/// `is_featured` trail the ordered block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    appointment_id: Option<i32>,
    pub title: String,
    pub description: String,
    pub notes: String,
    pub address1: String,
    pub address2: String,
    pub city: String,
    pub region_id: Option<i32>,
    pub postal_code: String,
    pub phone: String,
    pub start_date_time: NaiveDateTime,
    pub end_date_time: NaiveDateTime,
    pub appointment_type_id: i32,
    pub additional_address_info: String,
    pub contact_street: String,
    pub contact_phone: String,
    pub requestor_name: String,
    pub requestor_phone_type: String,
    pub requestor_phone: String,
    pub requestor_email: String,
    pub requestor_alt_phone_type: String,
    pub requestor_alt_phone: String,
    pub number_of_participants: i32,
    pub participant_gender: String,
    pub participant_instructions: String,
    pub number_of_special_participants: i32,
    pub is_accepted: Option<bool>,
    pub participant_flag: char,
    module_id: i32,
    #[serde(default)]
    pub is_featured: bool,
}

impl Appointment {
    /// A new, not yet persisted appointment owned by `module_id`.
    pub fn new(
        module_id: i32,
        appointment_type_id: i32,
        start_date_time: NaiveDateTime,
        end_date_time: NaiveDateTime,
    ) -> Self {
        Self {
            appointment_id: None,
            title: String::new(),
            description: String::new(),
            notes: String::new(),
            address1: String::new(),
            address2: String::new(),
            city: String::new(),
            region_id: None,
            postal_code: String::new(),
            phone: String::new(),
            start_date_time,
            end_date_time,
            appointment_type_id,
            additional_address_info: String::new(),
            contact_street: String::new(),
            contact_phone: String::new(),
            requestor_name: String::new(),
            requestor_phone_type: String::new(),
            requestor_phone: String::new(),
            requestor_email: String::new(),
            requestor_alt_phone_type: String::new(),
            requestor_alt_phone: String::new(),
            number_of_participants: 0,
            participant_gender: String::new(),
            participant_instructions: String::new(),
            number_of_special_participants: 0,
            is_accepted: None,
            participant_flag: DEFAULT_PARTICIPANT_FLAG,
            module_id,
            is_featured: false,
        }
    }

    /// `None` until the appointment has been saved once.
    pub fn appointment_id(&self) -> Option<i32> {
        self.appointment_id
    }

    pub fn module_id(&self) -> i32 {
        self.module_id
    }

    pub fn is_new(&self) -> bool {
        self.appointment_id.is_none()
    }

    pub fn status(&self) -> AcceptanceStatus {
        self.is_accepted.into()
    }

    /// Builds an appointment from a stored row.
    ///
    /// NULL text columns become empty strings. `region_id` and `is_accepted`
    /// keep their NULLs. The participant flag is the first character of the
    /// stored value; a row without one is rejected.
    pub fn fill(row: AppointmentRow) -> Result<Self, BookingError> {
        let participant_flag = row
            .participant_flag
            .as_deref()
            .and_then(|flag| flag.chars().next())
            .ok_or_else(|| BookingError::MalformedRow {
                appointment_id: row.appointment_id,
                reason: "participant_flag is empty".into(),
            })?;

        Ok(Self {
            appointment_id: Some(row.appointment_id),
            title: row.title.unwrap_or_default(),
            description: row.description.unwrap_or_default(),
            notes: row.notes.unwrap_or_default(),
            address1: row.address1.unwrap_or_default(),
            address2: row.address2.unwrap_or_default(),
            city: row.city.unwrap_or_default(),
            region_id: row.region_id,
            postal_code: row.postal_code.unwrap_or_default(),
            phone: row.phone.unwrap_or_default(),
            start_date_time: row.start_date_time,
            end_date_time: row.end_date_time,
            appointment_type_id: row.appointment_type_id,
            additional_address_info: row.additional_address_info.unwrap_or_default(),
            contact_street: row.contact_street.unwrap_or_default(),
            contact_phone: row.contact_phone.unwrap_or_default(),
            requestor_name: row.requestor_name.unwrap_or_default(),
            requestor_phone_type: row.requestor_phone_type.unwrap_or_default(),
            requestor_phone: row.requestor_phone.unwrap_or_default(),
            requestor_email: row.requestor_email.unwrap_or_default(),
            requestor_alt_phone_type: row.requestor_alt_phone_type.unwrap_or_default(),
            requestor_alt_phone: row.requestor_alt_phone.unwrap_or_default(),
            number_of_participants: row.number_of_participants,
            participant_gender: row.participant_gender.unwrap_or_default(),
            participant_instructions: row.participant_instructions.unwrap_or_default(),
            number_of_special_participants: row.number_of_special_participants,
            is_accepted: row.is_accepted,
            participant_flag,
            module_id: row.module_id,
            is_featured: row.is_featured,
        })
    }

    pub fn validate(&self) -> Result<(), BookingError> {
        if self.number_of_participants < 0 {
            return Err(BookingError::Validation(
                "number_of_participants must be >= 0".into(),
            ));
        }
        if self.number_of_special_participants < 0 {
            return Err(BookingError::Validation(
                "number_of_special_participants must be >= 0".into(),
            ));
        }
        if self.end_date_time < self.start_date_time {
            return Err(BookingError::Validation(
                "end_date_time must be >= start_date_time".into(),
            ));
        }
        Ok(())
    }

    /// Display name of the region, or an empty string when there is none or
    /// the lookup fails.
    pub async fn region(&self, lookup: &dyn RegionLookup) -> String {
        let Some(region_id) = self.region_id else {
            return String::new();
        };

        match lookup.resolve_list_entry(region_id).await {
            Ok(text) => text.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(region_id, error = %e, "region lookup failed");
                String::new()
            }
        }
    }

    /* -------------------------
       Persistence
    --------------------------*/

    /// `Ok(None)` when no appointment has that id.
    pub async fn load(
        store: &dyn AppointmentStore,
        appointment_id: i32,
    ) -> Result<Option<Self>, BookingError> {
        store
            .get_appointment(appointment_id)
            .await?
            .map(Self::fill)
            .transpose()
    }

    /// Inserts the appointment if it has never been saved, updates it otherwise.
    pub async fn save(
        &mut self,
        store: &dyn AppointmentStore,
        revising_user: i32,
    ) -> Result<(), BookingError> {
        self.validate()?;

        match self.appointment_id {
            None => {
                let appointment_id = store.insert_appointment(self, revising_user).await?;
                self.appointment_id = Some(appointment_id);
                tracing::info!(
                    appointment_id,
                    module_id = self.module_id,
                    revising_user,
                    "appointment created"
                );
            }
            Some(appointment_id) => {
                if !store.update_appointment(self, revising_user).await? {
                    return Err(BookingError::NotFound(appointment_id));
                }
                tracing::info!(appointment_id, revising_user, "appointment updated");
            }
        }
        Ok(())
    }

    /// Deleting an id that does not exist is not an error.
    pub async fn delete(store: &dyn AppointmentStore, appointment_id: i32) -> Result<(), BookingError> {
        if store.delete_appointment(appointment_id).await? {
            tracing::info!(appointment_id, "appointment deleted");
        } else {
            tracing::debug!(appointment_id, "delete of unknown appointment ignored");
        }
        Ok(())
    }

    pub async fn accept(
        store: &dyn AppointmentStore,
        appointment_id: i32,
        revising_user: i32,
    ) -> Result<(), BookingError> {
        Self::set_acceptance(store, appointment_id, true, revising_user).await
    }

    pub async fn decline(
        store: &dyn AppointmentStore,
        appointment_id: i32,
        revising_user: i32,
    ) -> Result<(), BookingError> {
        Self::set_acceptance(store, appointment_id, false, revising_user).await
    }

    /// Accepts every listed appointment; unknown ids are skipped.
    /// Returns how many appointments were changed.
    pub async fn accept_many(
        store: &dyn AppointmentStore,
        appointment_ids: &[i32],
        revising_user: i32,
    ) -> Result<u64, BookingError> {
        Self::set_acceptance_many(store, appointment_ids, true, revising_user).await
    }

    pub async fn decline_many(
        store: &dyn AppointmentStore,
        appointment_ids: &[i32],
        revising_user: i32,
    ) -> Result<u64, BookingError> {
        Self::set_acceptance_many(store, appointment_ids, false, revising_user).await
    }

    async fn set_acceptance(
        store: &dyn AppointmentStore,
        appointment_id: i32,
        accepted: bool,
        revising_user: i32,
    ) -> Result<(), BookingError> {
        let changed = store
            .set_acceptance(&[appointment_id], accepted, revising_user)
            .await?;
        if changed == 0 {
            return Err(BookingError::NotFound(appointment_id));
        }
        tracing::info!(appointment_id, accepted, revising_user, "appointment reviewed");
        Ok(())
    }

    async fn set_acceptance_many(
        store: &dyn AppointmentStore,
        appointment_ids: &[i32],
        accepted: bool,
        revising_user: i32,
    ) -> Result<u64, BookingError> {
        if appointment_ids.is_empty() {
            return Err(BookingError::Validation("appointment_ids must not be empty".into()));
        }
        let changed = store
            .set_acceptance(appointment_ids, accepted, revising_user)
            .await?;
        tracing::info!(
            requested = appointment_ids.len(),
            changed,
            accepted,
            revising_user,
            "appointments reviewed"
        );
        Ok(changed)
    }
}
