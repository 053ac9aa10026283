// src/store/mod.rs

use async_trait::async_trait;

use crate::{
    appointment::{Appointment, AppointmentRow},
    error::BookingError,
    listing::{ListingQuery, Page},
};

pub mod memory;
pub mod postgres;

/// The persistence boundary for appointments. Only the entity and listing
/// layers call it; nothing else reaches storage.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// Rows of one module matching the query, ordered and paged, plus the
    /// number of rows matching before paging.
    async fn get_appointments(&self, query: &ListingQuery) -> Result<Page<AppointmentRow>, BookingError>;

    async fn get_appointment(&self, appointment_id: i32) -> Result<Option<AppointmentRow>, BookingError>;

    /// Stores a new appointment and returns its identity.
    async fn insert_appointment(
        &self,
        appointment: &Appointment,
        revising_user: i32,
    ) -> Result<i32, BookingError>;

    /// `false` when the row no longer exists.
    async fn update_appointment(
        &self,
        appointment: &Appointment,
        revising_user: i32,
    ) -> Result<bool, BookingError>;

    /// `false` when there was nothing to delete.
    async fn delete_appointment(&self, appointment_id: i32) -> Result<bool, BookingError>;

    /// Status-only write. Returns how many of the ids existed and were updated.
    async fn set_acceptance(
        &self,
        appointment_ids: &[i32],
        accepted: bool,
        revising_user: i32,
    ) -> Result<u64, BookingError>;
}

pub(crate) fn persisted_id(appointment: &Appointment) -> Result<i32, BookingError> {
    appointment
        .appointment_id()
        .ok_or_else(|| BookingError::Validation("appointment has not been saved yet".into()))
}
