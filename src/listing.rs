// src/listing.rs

use std::cmp::Ordering;

use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::{
    appointment::{Appointment, AppointmentRow},
    error::BookingError,
    store::AppointmentStore,
};

/* ============================================================
   Listing mode
   ============================================================ */

/// Which appointments of a module a listing shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingMode {
    #[default]
    All,
    Pending,
    Accepted,
    Declined,
    /// Not finished yet: ends at or after the reference time.
    Upcoming,
    /// Ended before the reference time.
    Past,
}

impl ListingMode {
    pub fn matches(self, row: &AppointmentRow, as_of: NaiveDateTime) -> bool {
        match self {
            ListingMode::All => true,
            ListingMode::Pending => row.is_accepted.is_none(),
            ListingMode::Accepted => row.is_accepted == Some(true),
            ListingMode::Declined => row.is_accepted == Some(false),
            ListingMode::Upcoming => row.end_date_time >= as_of,
            ListingMode::Past => row.end_date_time < as_of,
        }
    }
}

/* ============================================================
   Sorting
   ============================================================ */

/// Columns a listing may be ordered by. Anything else is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    AppointmentId,
    Title,
    StartDateTime,
    EndDateTime,
    AppointmentTypeId,
    City,
    RequestorName,
    NumberOfParticipants,
    IsAccepted,
}

impl SortColumn {
    /// Accepts `Id`, `StartDateTime`, `start_date_time` and the like, ignoring case.
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized: String = name
            .chars()
            .filter(|c| *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();

        let column = match normalized.as_str() {
            "id" | "appointmentid" => SortColumn::AppointmentId,
            "title" => SortColumn::Title,
            "start" | "startdatetime" => SortColumn::StartDateTime,
            "end" | "enddatetime" => SortColumn::EndDateTime,
            "appointmenttypeid" => SortColumn::AppointmentTypeId,
            "city" => SortColumn::City,
            "requestorname" => SortColumn::RequestorName,
            "numberofparticipants" => SortColumn::NumberOfParticipants,
            "isaccepted" => SortColumn::IsAccepted,
            _ => return None,
        };
        Some(column)
    }

    /// SQL ordering expression. Text columns order case-insensitively.
    pub fn order_expression(self) -> &'static str {
        match self {
            SortColumn::AppointmentId => "appointment_id",
            SortColumn::Title => "lower(title)",
            SortColumn::StartDateTime => "start_date_time",
            SortColumn::EndDateTime => "end_date_time",
            SortColumn::AppointmentTypeId => "appointment_type_id",
            SortColumn::City => "lower(city)",
            SortColumn::RequestorName => "lower(requestor_name)",
            SortColumn::NumberOfParticipants => "number_of_participants",
            SortColumn::IsAccepted => "is_accepted",
        }
    }

    /// Ascending comparison; NULLs sort first.
    fn compare(self, a: &AppointmentRow, b: &AppointmentRow) -> Ordering {
        match self {
            SortColumn::AppointmentId => a.appointment_id.cmp(&b.appointment_id),
            SortColumn::Title => folded(&a.title).cmp(&folded(&b.title)),
            SortColumn::StartDateTime => a.start_date_time.cmp(&b.start_date_time),
            SortColumn::EndDateTime => a.end_date_time.cmp(&b.end_date_time),
            SortColumn::AppointmentTypeId => a.appointment_type_id.cmp(&b.appointment_type_id),
            SortColumn::City => folded(&a.city).cmp(&folded(&b.city)),
            SortColumn::RequestorName => {
                folded(&a.requestor_name).cmp(&folded(&b.requestor_name))
            }
            SortColumn::NumberOfParticipants => {
                a.number_of_participants.cmp(&b.number_of_participants)
            }
            SortColumn::IsAccepted => a.is_accepted.cmp(&b.is_accepted),
        }
    }
}

fn folded(value: &Option<String>) -> Option<String> {
    value.as_deref().map(str::to_lowercase)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC NULLS FIRST",
            SortDirection::Desc => "DESC NULLS LAST",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub column: SortColumn,
    pub direction: SortDirection,
}

/// A parsed `"Title ASC, StartDateTime DESC"` style ordering.
///
/// Always ends with `appointment_id` so pages stay stable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortExpression {
    keys: Vec<SortKey>,
}

impl Default for SortExpression {
    fn default() -> Self {
        Self {
            keys: vec![SortKey {
                column: SortColumn::AppointmentId,
                direction: SortDirection::Asc,
            }],
        }
    }
}

impl SortExpression {
    pub fn parse(expression: &str) -> Result<Self, BookingError> {
        let mut keys: Vec<SortKey> = vec![];

        for clause in expression.split(',').map(str::trim).filter(|c| !c.is_empty()) {
            let mut words = clause.split_whitespace();
            let name = words.next().unwrap_or_default();
            let column = SortColumn::from_name(name)
                .ok_or_else(|| BookingError::InvalidSort(name.to_string()))?;

            let direction = match words.next().map(str::to_ascii_uppercase).as_deref() {
                None | Some("ASC") => SortDirection::Asc,
                Some("DESC") => SortDirection::Desc,
                Some(_) => return Err(BookingError::InvalidSort(clause.to_string())),
            };
            if words.next().is_some() {
                return Err(BookingError::InvalidSort(clause.to_string()));
            }

            if keys.iter().any(|k| k.column == column) {
                continue;
            }
            keys.push(SortKey { column, direction });
        }

        if !keys.iter().any(|k| k.column == SortColumn::AppointmentId) {
            keys.push(SortKey {
                column: SortColumn::AppointmentId,
                direction: SortDirection::Asc,
            });
        }
        Ok(Self { keys })
    }

    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    pub fn compare(&self, a: &AppointmentRow, b: &AppointmentRow) -> Ordering {
        for key in &self.keys {
            let ordering = match key.direction {
                SortDirection::Asc => key.column.compare(a, b),
                SortDirection::Desc => key.column.compare(b, a),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

/* ============================================================
   Paging
   ============================================================ */

/// Page size and zero-based index. With no size the whole set is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageRequest {
    pub size: Option<u32>,
    pub index: u32,
}

impl PageRequest {
    pub fn all() -> Self {
        Self::default()
    }

    /// Validates a requested page: a size of zero is refused, sizes above
    /// `max_size` are clamped. A missing index means the first page.
    pub fn bounded(size: Option<u32>, index: Option<u32>, max_size: u32) -> Result<Self, BookingError> {
        let size = match size {
            Some(0) => {
                return Err(BookingError::Validation("page_size must be > 0".into()));
            }
            Some(s) => Some(s.min(max_size.max(1))),
            None => None,
        };
        Ok(Self {
            size,
            index: index.unwrap_or(0),
        })
    }

    /// `(offset, limit)` when paging applies.
    pub fn offset_limit(&self) -> Option<(i64, i64)> {
        self.size
            .map(|size| (i64::from(self.index) * i64::from(size), i64::from(size)))
    }
}

/// Zero-based page index from a 1-based `page` query value.
/// Missing, non-numeric or non-positive values mean the first page.
pub fn page_index_from_query(page: Option<&str>) -> u32 {
    page.and_then(|p| p.trim().parse::<i64>().ok())
        .filter(|p| *p >= 1)
        .map(|p| u32::try_from(p - 1).unwrap_or(u32::MAX))
        .unwrap_or(0)
}

/* ============================================================
   Query + results
   ============================================================ */

#[derive(Debug, Clone)]
pub struct ListingQuery {
    pub module_id: i32,
    pub mode: ListingMode,
    pub featured_only: bool,
    pub sort: SortExpression,
    pub page: PageRequest,
    /// Reference time for `Upcoming` and `Past`.
    pub as_of: NaiveDateTime,
}

impl ListingQuery {
    /// Every appointment of the module, ordered by id.
    pub fn all_for_module(module_id: i32) -> Self {
        Self {
            module_id,
            mode: ListingMode::All,
            featured_only: false,
            sort: SortExpression::default(),
            page: PageRequest::all(),
            as_of: chrono::Utc::now().naive_utc(),
        }
    }
}

/// One page of results plus the size of the whole matching set.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub total_records: i64,
    pub items: Vec<T>,
}

/// A page of appointments ready for a listing.
#[derive(Debug, Clone)]
pub struct AppointmentCollection {
    pub total_records: i64,
    pub appointments: Vec<Appointment>,
}

impl AppointmentCollection {
    pub async fn load(store: &dyn AppointmentStore, query: &ListingQuery) -> Result<Self, BookingError> {
        let page = store.get_appointments(query).await?;
        let appointments = page
            .items
            .into_iter()
            .map(Appointment::fill)
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            module_id = query.module_id,
            mode = ?query.mode,
            total = page.total_records,
            returned = appointments.len(),
            "appointments listed"
        );

        Ok(Self {
            total_records: page.total_records,
            appointments,
        })
    }
}
