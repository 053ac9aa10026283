// src/store/memory.rs

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    appointment::{Appointment, AppointmentRow},
    error::BookingError,
    listing::{ListingQuery, Page},
    store::{persisted_id, AppointmentStore},
};

/// Process-local store. Used when no database is configured and in tests.
#[derive(Debug, Default)]
pub struct MemoryAppointmentStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    last_id: i32,
    rows: BTreeMap<i32, AppointmentRow>,
}

fn text(value: &str) -> Option<String> {
    Some(value.to_string())
}

/// Copies the editable columns of `appointment` onto `row`.
fn write_columns(row: &mut AppointmentRow, appointment: &Appointment) {
    row.appointment_type_id = appointment.appointment_type_id;
    row.title = text(&appointment.title);
    row.description = text(&appointment.description);
    row.notes = text(&appointment.notes);
    row.address1 = text(&appointment.address1);
    row.address2 = text(&appointment.address2);
    row.city = text(&appointment.city);
    row.region_id = appointment.region_id;
    row.postal_code = text(&appointment.postal_code);
    row.phone = text(&appointment.phone);
    row.additional_address_info = text(&appointment.additional_address_info);
    row.contact_street = text(&appointment.contact_street);
    row.contact_phone = text(&appointment.contact_phone);
    row.requestor_name = text(&appointment.requestor_name);
    row.requestor_phone_type = text(&appointment.requestor_phone_type);
    row.requestor_phone = text(&appointment.requestor_phone);
    row.requestor_email = text(&appointment.requestor_email);
    row.requestor_alt_phone_type = text(&appointment.requestor_alt_phone_type);
    row.requestor_alt_phone = text(&appointment.requestor_alt_phone);
    row.start_date_time = appointment.start_date_time;
    row.end_date_time = appointment.end_date_time;
    row.number_of_participants = appointment.number_of_participants;
    row.participant_gender = text(&appointment.participant_gender);
    row.participant_flag = Some(appointment.participant_flag.to_string());
    row.participant_instructions = text(&appointment.participant_instructions);
    row.number_of_special_participants = appointment.number_of_special_participants;
    row.is_accepted = appointment.is_accepted;
    row.is_featured = appointment.is_featured;
}

impl MemoryAppointmentStore {
    /// Stores `row` as-is under the next identity and returns that identity.
    #[cfg(test)]
    pub(crate) async fn insert_raw(&self, mut row: AppointmentRow) -> i32 {
        let mut inner = self.inner.write().await;
        inner.last_id += 1;
        row.appointment_id = inner.last_id;
        inner.rows.insert(row.appointment_id, row);
        inner.last_id
    }

    #[cfg(test)]
    pub(crate) async fn row(&self, appointment_id: i32) -> Option<AppointmentRow> {
        self.inner.read().await.rows.get(&appointment_id).cloned()
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.inner.read().await.rows.len()
    }
}

#[async_trait]
impl AppointmentStore for MemoryAppointmentStore {
    async fn get_appointments(&self, query: &ListingQuery) -> Result<Page<AppointmentRow>, BookingError> {
        let inner = self.inner.read().await;

        let mut matching: Vec<&AppointmentRow> = inner
            .rows
            .values()
            .filter(|row| row.module_id == query.module_id)
            .filter(|row| query.mode.matches(row, query.as_of))
            .filter(|row| !query.featured_only || row.is_featured)
            .collect();
        matching.sort_by(|a, b| query.sort.compare(a, b));

        let total_records = matching.len() as i64;
        let items = match query.page.offset_limit() {
            Some((offset, limit)) => matching
                .into_iter()
                .skip(offset as usize)
                .take(limit as usize)
                .cloned()
                .collect(),
            None => matching.into_iter().cloned().collect(),
        };

        Ok(Page { total_records, items })
    }

    async fn get_appointment(&self, appointment_id: i32) -> Result<Option<AppointmentRow>, BookingError> {
        Ok(self.inner.read().await.rows.get(&appointment_id).cloned())
    }

    async fn insert_appointment(
        &self,
        appointment: &Appointment,
        revising_user: i32,
    ) -> Result<i32, BookingError> {
        let mut inner = self.inner.write().await;
        inner.last_id += 1;
        let appointment_id = inner.last_id;
        let now = Utc::now();

        let mut row = AppointmentRow {
            appointment_id,
            module_id: appointment.module_id(),
            appointment_type_id: appointment.appointment_type_id,
            title: None,
            description: None,
            notes: None,
            address1: None,
            address2: None,
            city: None,
            region_id: None,
            postal_code: None,
            phone: None,
            additional_address_info: None,
            contact_street: None,
            contact_phone: None,
            requestor_name: None,
            requestor_phone_type: None,
            requestor_phone: None,
            requestor_email: None,
            requestor_alt_phone_type: None,
            requestor_alt_phone: None,
            start_date_time: appointment.start_date_time,
            end_date_time: appointment.end_date_time,
            number_of_participants: 0,
            participant_gender: None,
            participant_flag: None,
            participant_instructions: None,
            number_of_special_participants: 0,
            is_accepted: None,
            is_featured: false,
            created_by: revising_user,
            creation_date: now,
            revising_user,
            revision_date: now,
        };
        write_columns(&mut row, appointment);
        inner.rows.insert(appointment_id, row);

        Ok(appointment_id)
    }

    async fn update_appointment(
        &self,
        appointment: &Appointment,
        revising_user: i32,
    ) -> Result<bool, BookingError> {
        let appointment_id = persisted_id(appointment)?;
        let mut inner = self.inner.write().await;

        let Some(row) = inner.rows.get_mut(&appointment_id) else {
            return Ok(false);
        };
        write_columns(row, appointment);
        row.revising_user = revising_user;
        row.revision_date = Utc::now();
        Ok(true)
    }

    async fn delete_appointment(&self, appointment_id: i32) -> Result<bool, BookingError> {
        Ok(self.inner.write().await.rows.remove(&appointment_id).is_some())
    }

    async fn set_acceptance(
        &self,
        appointment_ids: &[i32],
        accepted: bool,
        revising_user: i32,
    ) -> Result<u64, BookingError> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();
        let mut changed = 0;

        // each row counts once, however often its id is repeated
        let unique: BTreeSet<i32> = appointment_ids.iter().copied().collect();
        for appointment_id in unique {
            if let Some(row) = inner.rows.get_mut(&appointment_id) {
                row.is_accepted = Some(accepted);
                row.revising_user = revising_user;
                row.revision_date = now;
                changed += 1;
            }
        }
        Ok(changed)
    }
}
