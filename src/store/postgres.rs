// src/store/postgres.rs

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    appointment::{Appointment, AppointmentRow},
    error::BookingError,
    listing::{ListingMode, ListingQuery, Page, SortExpression},
    store::{persisted_id, AppointmentStore},
};

const APPOINTMENT_COLUMNS: &str = r#"
  appointment_id,
  module_id,
  appointment_type_id,
  title,
  description,
  notes,
  address1,
  address2,
  city,
  region_id,
  postal_code,
  phone,
  additional_address_info,
  contact_street,
  contact_phone,
  requestor_name,
  requestor_phone_type,
  requestor_phone,
  requestor_email,
  requestor_alt_phone_type,
  requestor_alt_phone,
  start_date_time,
  end_date_time,
  number_of_participants,
  participant_gender,
  participant_flag,
  participant_instructions,
  number_of_special_participants,
  is_accepted,
  is_featured,
  created_by,
  creation_date,
  revising_user,
  revision_date
"#;

#[derive(Clone)]
pub struct PgAppointmentStore {
    pool: PgPool,
}

impl PgAppointmentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &ListingQuery) {
    qb.push(" WHERE module_id = ").push_bind(query.module_id);

    match query.mode {
        ListingMode::All => {}
        ListingMode::Pending => {
            qb.push(" AND is_accepted IS NULL");
        }
        ListingMode::Accepted => {
            qb.push(" AND is_accepted = TRUE");
        }
        ListingMode::Declined => {
            qb.push(" AND is_accepted = FALSE");
        }
        ListingMode::Upcoming => {
            qb.push(" AND end_date_time >= ").push_bind(query.as_of);
        }
        ListingMode::Past => {
            qb.push(" AND end_date_time < ").push_bind(query.as_of);
        }
    }

    if query.featured_only {
        qb.push(" AND is_featured = TRUE");
    }
}

/// ORDER BY built from the allow-listed columns only.
fn push_order(qb: &mut QueryBuilder<'_, Postgres>, sort: &SortExpression) {
    qb.push(" ORDER BY ");
    let mut separated = qb.separated(", ");
    for key in sort.keys() {
        separated.push(format!("{} {}", key.column.order_expression(), key.direction.sql()));
    }
}

#[async_trait]
impl AppointmentStore for PgAppointmentStore {
    async fn get_appointments(&self, query: &ListingQuery) -> Result<Page<AppointmentRow>, BookingError> {
        // count and page read the same snapshot
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM appointment");
        push_filters(&mut count, query);
        let total_records: i64 = count.build_query_scalar::<i64>().fetch_one(&mut *tx).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointment"
        ));
        push_filters(&mut select, query);
        push_order(&mut select, &query.sort);
        if let Some((offset, limit)) = query.page.offset_limit() {
            select.push(" LIMIT ").push_bind(limit);
            select.push(" OFFSET ").push_bind(offset);
        }
        let items: Vec<AppointmentRow> = select
            .build_query_as::<AppointmentRow>()
            .fetch_all(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Page { total_records, items })
    }

    async fn get_appointment(&self, appointment_id: i32) -> Result<Option<AppointmentRow>, BookingError> {
        let row = sqlx::query_as::<_, AppointmentRow>(&format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointment WHERE appointment_id = $1"
        ))
        .bind(appointment_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn insert_appointment(
        &self,
        appointment: &Appointment,
        revising_user: i32,
    ) -> Result<i32, BookingError> {
        let appointment_id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO appointment (
              module_id,
              appointment_type_id,
              title,
              description,
              notes,
              address1,
              address2,
              city,
              region_id,
              postal_code,
              phone,
              additional_address_info,
              contact_street,
              contact_phone,
              requestor_name,
              requestor_phone_type,
              requestor_phone,
              requestor_email,
              requestor_alt_phone_type,
              requestor_alt_phone,
              start_date_time,
              end_date_time,
              number_of_participants,
              participant_gender,
              participant_flag,
              participant_instructions,
              number_of_special_participants,
              is_accepted,
              is_featured,
              created_by,
              revising_user
            )
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19,$20,
                    $21,$22,$23,$24,$25,$26,$27,$28,$29,$30,$30)
            RETURNING appointment_id
            "#,
        )
        .bind(appointment.module_id())
        .bind(appointment.appointment_type_id)
        .bind(&appointment.title)
        .bind(&appointment.description)
        .bind(&appointment.notes)
        .bind(&appointment.address1)
        .bind(&appointment.address2)
        .bind(&appointment.city)
        .bind(appointment.region_id)
        .bind(&appointment.postal_code)
        .bind(&appointment.phone)
        .bind(&appointment.additional_address_info)
        .bind(&appointment.contact_street)
        .bind(&appointment.contact_phone)
        .bind(&appointment.requestor_name)
        .bind(&appointment.requestor_phone_type)
        .bind(&appointment.requestor_phone)
        .bind(&appointment.requestor_email)
        .bind(&appointment.requestor_alt_phone_type)
        .bind(&appointment.requestor_alt_phone)
        .bind(appointment.start_date_time)
        .bind(appointment.end_date_time)
        .bind(appointment.number_of_participants)
        .bind(&appointment.participant_gender)
        .bind(appointment.participant_flag.to_string())
        .bind(&appointment.participant_instructions)
        .bind(appointment.number_of_special_participants)
        .bind(appointment.is_accepted)
        .bind(appointment.is_featured)
        .bind(revising_user)
        .fetch_one(&self.pool)
        .await?;

        Ok(appointment_id)
    }

    async fn update_appointment(
        &self,
        appointment: &Appointment,
        revising_user: i32,
    ) -> Result<bool, BookingError> {
        let appointment_id = persisted_id(appointment)?;

        let result = sqlx::query(
            r#"
            UPDATE appointment
            SET
              appointment_type_id = $2,
              title = $3,
              description = $4,
              notes = $5,
              address1 = $6,
              address2 = $7,
              city = $8,
              region_id = $9,
              postal_code = $10,
              phone = $11,
              additional_address_info = $12,
              contact_street = $13,
              contact_phone = $14,
              requestor_name = $15,
              requestor_phone_type = $16,
              requestor_phone = $17,
              requestor_email = $18,
              requestor_alt_phone_type = $19,
              requestor_alt_phone = $20,
              start_date_time = $21,
              end_date_time = $22,
              number_of_participants = $23,
              participant_gender = $24,
              participant_flag = $25,
              participant_instructions = $26,
              number_of_special_participants = $27,
              is_accepted = $28,
              is_featured = $29,
              revising_user = $30,
              revision_date = now()
            WHERE appointment_id = $1
            "#,
        )
        .bind(appointment_id)
        .bind(appointment.appointment_type_id)
        .bind(&appointment.title)
        .bind(&appointment.description)
        .bind(&appointment.notes)
        .bind(&appointment.address1)
        .bind(&appointment.address2)
        .bind(&appointment.city)
        .bind(appointment.region_id)
        .bind(&appointment.postal_code)
        .bind(&appointment.phone)
        .bind(&appointment.additional_address_info)
        .bind(&appointment.contact_street)
        .bind(&appointment.contact_phone)
        .bind(&appointment.requestor_name)
        .bind(&appointment.requestor_phone_type)
        .bind(&appointment.requestor_phone)
        .bind(&appointment.requestor_email)
        .bind(&appointment.requestor_alt_phone_type)
        .bind(&appointment.requestor_alt_phone)
        .bind(appointment.start_date_time)
        .bind(appointment.end_date_time)
        .bind(appointment.number_of_participants)
        .bind(&appointment.participant_gender)
        .bind(appointment.participant_flag.to_string())
        .bind(&appointment.participant_instructions)
        .bind(appointment.number_of_special_participants)
        .bind(appointment.is_accepted)
        .bind(appointment.is_featured)
        .bind(revising_user)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_appointment(&self, appointment_id: i32) -> Result<bool, BookingError> {
        let result = sqlx::query(r#"DELETE FROM appointment WHERE appointment_id = $1"#)
            .bind(appointment_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_acceptance(
        &self,
        appointment_ids: &[i32],
        accepted: bool,
        revising_user: i32,
    ) -> Result<u64, BookingError> {
        let result = sqlx::query(
            r#"
            UPDATE appointment
            SET is_accepted = $2,
                revising_user = $3,
                revision_date = now()
            WHERE appointment_id = ANY($1)
            "#,
        )
        .bind(appointment_ids.to_vec())
        .bind(accepted)
        .bind(revising_user)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
