// src/routes/appointment_routes.rs

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDateTime;
use serde::{de::Deserializer, Deserialize, Serialize};

use crate::{
    appointment::{AcceptanceStatus, Appointment},
    error::ApiError,
    listing::{
        page_index_from_query, AppointmentCollection, ListingMode, ListingQuery, PageRequest,
        SortExpression,
    },
    middleware::revising_user::RevisingUser,
    models::{ApiOk, AppState, OkData},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/modules/{module_id}/appointments",
            get(list_appointments).post(create_appointment),
        )
        .route("/appointments/accept", post(accept_appointments))
        .route("/appointments/decline", post(decline_appointments))
        .route(
            "/appointments/{appointment_id}",
            get(get_appointment).put(update_appointment).delete(delete_appointment),
        )
        .route("/appointments/{appointment_id}/accept", post(accept_appointment))
        .route("/appointments/{appointment_id}/decline", post(decline_appointment))
}

/* ============================================================
   Response DTOs
   ============================================================ */

/// An appointment as the listing and detail views show it.
#[derive(Debug, Serialize)]
pub struct AppointmentView {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub status: AcceptanceStatus,
    pub region: String,
}

#[derive(Debug, Serialize)]
pub struct AppointmentPageDto {
    pub total_records: i64,
    pub current_page: u32,
    pub page_size: Option<u32>,
    pub appointments: Vec<AppointmentView>,
}

#[derive(Debug, Serialize)]
pub struct ReviewDto {
    pub appointment_id: i32,
    pub status: AcceptanceStatus,
}

#[derive(Debug, Serialize)]
pub struct BulkReviewDto {
    pub requested: usize,
    pub updated: u64,
}

async fn to_view(state: &AppState, appointment: Appointment) -> AppointmentView {
    let region = appointment.region(state.regions.as_ref()).await;
    AppointmentView {
        status: appointment.status(),
        appointment,
        region,
    }
}

/* ============================================================
   GET /modules/{module_id}/appointments
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub mode: Option<ListingMode>,
    pub sort: Option<String>,
    /// 1-based; anything unparseable means the first page.
    pub page: Option<String>,
    pub page_size: Option<u32>,
    /// Return every matching appointment without paging.
    pub all: Option<bool>,
    pub featured: Option<bool>,
}

pub async fn list_appointments(
    State(state): State<AppState>,
    Path(module_id): Path<i32>,
    Query(q): Query<ListQuery>,
) -> Result<Json<ApiOk<AppointmentPageDto>>, ApiError> {
    let sort = match q.sort.as_deref() {
        Some(expr) => SortExpression::parse(expr)?,
        None => SortExpression::default(),
    };

    let page = if q.all.unwrap_or(false) {
        PageRequest::all()
    } else {
        PageRequest::bounded(
            Some(q.page_size.unwrap_or(state.paging.default_page_size)),
            Some(page_index_from_query(q.page.as_deref())),
            state.paging.max_page_size,
        )?
    };

    let query = ListingQuery {
        module_id,
        mode: q.mode.unwrap_or_default(),
        featured_only: q.featured.unwrap_or(false),
        sort,
        page,
        as_of: chrono::Utc::now().naive_utc(),
    };

    let collection = AppointmentCollection::load(state.store.as_ref(), &query).await?;

    let mut appointments = Vec::with_capacity(collection.appointments.len());
    for appointment in collection.appointments {
        appointments.push(to_view(&state, appointment).await);
    }

    Ok(Json(ApiOk {
        data: AppointmentPageDto {
            total_records: collection.total_records,
            current_page: page.index.saturating_add(1),
            page_size: page.size,
            appointments,
        },
    }))
}

/* ============================================================
   GET /appointments/{id}
   ============================================================ */

pub async fn get_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<i32>,
) -> Result<Json<ApiOk<AppointmentView>>, ApiError> {
    let appointment = Appointment::load(state.store.as_ref(), appointment_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("NOT_FOUND", "appointment not found".into()))?;

    Ok(Json(ApiOk {
        data: to_view(&state, appointment).await,
    }))
}

/* ============================================================
   POST /modules/{module_id}/appointments (create)
   PUT  /appointments/{id} (update)
   ============================================================ */

fn deserialize_double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    // only called when the field is present: null => Some(None)
    let inner = Option::<T>::deserialize(deserializer)?;
    Ok(Some(inner))
}

#[derive(Debug, Deserialize)]
pub struct AppointmentRequest {
    pub appointment_type_id: i32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub address1: String,
    #[serde(default)]
    pub address2: String,
    #[serde(default)]
    pub city: String,
    pub region_id: Option<i32>,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub phone: String,
    pub start_date_time: NaiveDateTime,
    pub end_date_time: NaiveDateTime,
    #[serde(default)]
    pub additional_address_info: String,
    #[serde(default)]
    pub contact_street: String,
    #[serde(default)]
    pub contact_phone: String,
    #[serde(default)]
    pub requestor_name: String,
    #[serde(default)]
    pub requestor_phone_type: String,
    #[serde(default)]
    pub requestor_phone: String,
    #[serde(default)]
    pub requestor_email: String,
    #[serde(default)]
    pub requestor_alt_phone_type: String,
    #[serde(default)]
    pub requestor_alt_phone: String,
    #[serde(default)]
    pub number_of_participants: i32,
    #[serde(default)]
    pub participant_gender: String,
    #[serde(default)]
    pub participant_instructions: String,
    #[serde(default)]
    pub number_of_special_participants: i32,
    /// absent = leave as is, null = pending
    #[serde(default, deserialize_with = "deserialize_double_option")]
    pub is_accepted: Option<Option<bool>>,
    /// absent = leave as is
    pub participant_flag: Option<char>,
    pub is_featured: Option<bool>,
}

impl AppointmentRequest {
    fn apply_to(self, appointment: &mut Appointment) {
        appointment.appointment_type_id = self.appointment_type_id;
        appointment.title = self.title;
        appointment.description = self.description;
        appointment.notes = self.notes;
        appointment.address1 = self.address1;
        appointment.address2 = self.address2;
        appointment.city = self.city;
        appointment.region_id = self.region_id;
        appointment.postal_code = self.postal_code;
        appointment.phone = self.phone;
        appointment.start_date_time = self.start_date_time;
        appointment.end_date_time = self.end_date_time;
        appointment.additional_address_info = self.additional_address_info;
        appointment.contact_street = self.contact_street;
        appointment.contact_phone = self.contact_phone;
        appointment.requestor_name = self.requestor_name;
        appointment.requestor_phone_type = self.requestor_phone_type;
        appointment.requestor_phone = self.requestor_phone;
        appointment.requestor_email = self.requestor_email;
        appointment.requestor_alt_phone_type = self.requestor_alt_phone_type;
        appointment.requestor_alt_phone = self.requestor_alt_phone;
        appointment.number_of_participants = self.number_of_participants;
        appointment.participant_gender = self.participant_gender;
        appointment.participant_instructions = self.participant_instructions;
        appointment.number_of_special_participants = self.number_of_special_participants;
        if let Some(is_accepted) = self.is_accepted {
            appointment.is_accepted = is_accepted;
        }
        if let Some(flag) = self.participant_flag {
            appointment.participant_flag = flag;
        }
        if let Some(is_featured) = self.is_featured {
            appointment.is_featured = is_featured;
        }
    }
}

pub async fn create_appointment(
    State(state): State<AppState>,
    Path(module_id): Path<i32>,
    reviser: RevisingUser,
    Json(req): Json<AppointmentRequest>,
) -> Result<Json<ApiOk<AppointmentView>>, ApiError> {
    let mut appointment = Appointment::new(
        module_id,
        req.appointment_type_id,
        req.start_date_time,
        req.end_date_time,
    );
    req.apply_to(&mut appointment);
    appointment.save(state.store.as_ref(), reviser.user_id).await?;

    Ok(Json(ApiOk {
        data: to_view(&state, appointment).await,
    }))
}

pub async fn update_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<i32>,
    reviser: RevisingUser,
    Json(req): Json<AppointmentRequest>,
) -> Result<Json<ApiOk<AppointmentView>>, ApiError> {
    let mut appointment = Appointment::load(state.store.as_ref(), appointment_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("NOT_FOUND", "appointment not found".into()))?;

    req.apply_to(&mut appointment);
    appointment.save(state.store.as_ref(), reviser.user_id).await?;

    Ok(Json(ApiOk {
        data: to_view(&state, appointment).await,
    }))
}

/* ============================================================
   DELETE /appointments/{id}
   ============================================================ */

pub async fn delete_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<i32>,
    reviser: RevisingUser,
) -> Result<Json<ApiOk<OkData>>, ApiError> {
    tracing::debug!(appointment_id, revising_user = reviser.user_id, "delete requested");
    Appointment::delete(state.store.as_ref(), appointment_id).await?;

    Ok(Json(ApiOk {
        data: OkData { ok: true },
    }))
}

/* ============================================================
   Review (accept / decline)
   ============================================================ */

pub async fn accept_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<i32>,
    reviser: RevisingUser,
) -> Result<Json<ApiOk<ReviewDto>>, ApiError> {
    Appointment::accept(state.store.as_ref(), appointment_id, reviser.user_id).await?;

    Ok(Json(ApiOk {
        data: ReviewDto {
            appointment_id,
            status: AcceptanceStatus::Accepted,
        },
    }))
}

pub async fn decline_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<i32>,
    reviser: RevisingUser,
) -> Result<Json<ApiOk<ReviewDto>>, ApiError> {
    Appointment::decline(state.store.as_ref(), appointment_id, reviser.user_id).await?;

    Ok(Json(ApiOk {
        data: ReviewDto {
            appointment_id,
            status: AcceptanceStatus::Declined,
        },
    }))
}

#[derive(Debug, Deserialize)]
pub struct BulkReviewRequest {
    pub appointment_ids: Vec<i32>,
}

pub async fn accept_appointments(
    State(state): State<AppState>,
    reviser: RevisingUser,
    Json(req): Json<BulkReviewRequest>,
) -> Result<Json<ApiOk<BulkReviewDto>>, ApiError> {
    let updated =
        Appointment::accept_many(state.store.as_ref(), &req.appointment_ids, reviser.user_id).await?;

    Ok(Json(ApiOk {
        data: BulkReviewDto {
            requested: req.appointment_ids.len(),
            updated,
        },
    }))
}

pub async fn decline_appointments(
    State(state): State<AppState>,
    reviser: RevisingUser,
    Json(req): Json<BulkReviewRequest>,
) -> Result<Json<ApiOk<BulkReviewDto>>, ApiError> {
    let updated =
        Appointment::decline_many(state.store.as_ref(), &req.appointment_ids, reviser.user_id).await?;

    Ok(Json(ApiOk {
        data: BulkReviewDto {
            requested: req.appointment_ids.len(),
            updated,
        },
    }))
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::{config::PagingConfig, lookup::StaticRegionLookup, models::AppState, routes};

    fn test_app() -> Router {
        let regions = StaticRegionLookup::from_entries([(3, "North Shore".to_string())]);
        routes::router(AppState::in_memory(
            regions,
            PagingConfig {
                default_page_size: 2,
                max_page_size: 3,
            },
        ))
    }

    fn make_request(method: &str, uri: &str, user: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(u) = user {
            builder = builder.header("X-Revising-User", u);
        }
        match body {
            Some(b) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    fn birthday_party() -> Value {
        json!({
            "appointment_type_id": 1,
            "title": "Birthday Party",
            "start_date_time": "2024-06-01T10:00:00",
            "end_date_time": "2024-06-01T12:00:00",
            "region_id": 3,
            "number_of_participants": 12,
            "participant_flag": "Y"
        })
    }

    async fn create(app: &Router, module_id: i32, body: Value) -> i64 {
        let uri = format!("/api/v1/modules/{module_id}/appointments");
        let (status, created) = send(app, make_request("POST", &uri, Some("7"), Some(body))).await;
        assert_eq!(status, StatusCode::OK, "{created}");
        created["data"]["appointment_id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn health_is_open() {
        let app = test_app();
        let (status, _) = send(&app, make_request("GET", "/health", None, None)).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn birthday_party_lifecycle() {
        let app = test_app();
        let id = create(&app, 5, birthday_party()).await;

        let (status, loaded) =
            send(&app, make_request("GET", &format!("/api/v1/appointments/{id}"), None, None)).await;
        assert_eq!(status, StatusCode::OK);
        let data = &loaded["data"];
        assert_eq!(data["title"], "Birthday Party");
        assert_eq!(data["module_id"], 5);
        assert_eq!(data["start_date_time"], "2024-06-01T10:00:00");
        assert_eq!(data["end_date_time"], "2024-06-01T12:00:00");
        assert_eq!(data["is_accepted"], Value::Null);
        assert_eq!(data["status"], "pending");
        assert_eq!(data["region"], "North Shore");
        assert_eq!(data["notes"], "");

        let (status, reviewed) = send(
            &app,
            make_request("POST", &format!("/api/v1/appointments/{id}/accept"), Some("7"), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(reviewed["data"]["status"], "accepted");

        let (_, loaded) =
            send(&app, make_request("GET", &format!("/api/v1/appointments/{id}"), None, None)).await;
        assert_eq!(loaded["data"]["is_accepted"], true);
        assert_eq!(loaded["data"]["title"], "Birthday Party");

        let (status, _) = send(
            &app,
            make_request("DELETE", &format!("/api/v1/appointments/{id}"), Some("7"), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) =
            send(&app, make_request("GET", &format!("/api/v1/appointments/{id}"), None, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn writes_require_a_revising_user() {
        let app = test_app();

        for user in [None, Some("nobody")] {
            let (status, body) = send(
                &app,
                make_request("POST", "/api/v1/modules/5/appointments", user, Some(birthday_party())),
            )
            .await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(body["error"]["code"], "REVISING_USER_REQUIRED");
        }

        let (status, _) =
            send(&app, make_request("POST", "/api/v1/appointments/1/accept", None, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn invalid_appointment_is_a_bad_request() {
        let app = test_app();
        let mut body = birthday_party();
        body["end_date_time"] = json!("2024-06-01T09:00:00");

        let (status, response) = send(
            &app,
            make_request("POST", "/api/v1/modules/5/appointments", Some("7"), Some(body)),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn update_keeps_identity_and_status_unless_sent() {
        let app = test_app();
        let id = create(&app, 5, birthday_party()).await;
        send(
            &app,
            make_request("POST", &format!("/api/v1/appointments/{id}/decline"), Some("8"), None),
        )
        .await;

        let mut body = birthday_party();
        body["title"] = json!("Birthday Party (garden)");
        let (status, updated) = send(
            &app,
            make_request("PUT", &format!("/api/v1/appointments/{id}"), Some("8"), Some(body)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["data"]["appointment_id"], id);
        assert_eq!(updated["data"]["title"], "Birthday Party (garden)");
        assert_eq!(updated["data"]["is_accepted"], false);

        let mut body = birthday_party();
        body["is_accepted"] = Value::Null;
        let (_, reset) = send(
            &app,
            make_request("PUT", &format!("/api/v1/appointments/{id}"), Some("8"), Some(body)),
        )
        .await;
        assert_eq!(reset["data"]["status"], "pending");
    }

    #[tokio::test]
    async fn update_without_featured_flag_keeps_it() {
        let app = test_app();
        let mut body = birthday_party();
        body["is_featured"] = json!(true);
        let id = create(&app, 5, body).await;

        let mut body = birthday_party();
        body["title"] = json!("Birthday Party (moved)");
        let (status, updated) = send(
            &app,
            make_request("PUT", &format!("/api/v1/appointments/{id}"), Some("8"), Some(body)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["data"]["is_featured"], true);

        let mut body = birthday_party();
        body["is_featured"] = json!(false);
        let (_, cleared) = send(
            &app,
            make_request("PUT", &format!("/api/v1/appointments/{id}"), Some("8"), Some(body)),
        )
        .await;
        assert_eq!(cleared["data"]["is_featured"], false);
    }

    #[tokio::test]
    async fn update_of_missing_appointment_is_not_found() {
        let app = test_app();
        let (status, _) = send(
            &app,
            make_request("PUT", "/api/v1/appointments/77", Some("8"), Some(birthday_party())),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            &app,
            make_request("POST", "/api/v1/appointments/77/decline", Some("8"), None),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn listing_pages_sorts_and_counts() {
        let app = test_app();
        for title in ["Carol", "Alice", "Bob"] {
            let mut body = birthday_party();
            body["title"] = json!(title);
            create(&app, 5, body).await;
        }
        create(&app, 6, birthday_party()).await;

        let (status, first) = send(
            &app,
            make_request("GET", "/api/v1/modules/5/appointments?sort=Title%20ASC", None, None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["data"]["total_records"], 3);
        assert_eq!(first["data"]["current_page"], 1);
        assert_eq!(first["data"]["page_size"], 2);
        let titles: Vec<&str> = first["data"]["appointments"]
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, ["Alice", "Bob"]);

        let (_, second) = send(
            &app,
            make_request("GET", "/api/v1/modules/5/appointments?sort=Title&page=2", None, None),
        )
        .await;
        assert_eq!(second["data"]["current_page"], 2);
        assert_eq!(second["data"]["appointments"][0]["title"], "Carol");

        let (_, garbage_page) = send(
            &app,
            make_request("GET", "/api/v1/modules/5/appointments?page=abc&page_size=50", None, None),
        )
        .await;
        assert_eq!(garbage_page["data"]["current_page"], 1);
        assert_eq!(garbage_page["data"]["page_size"], 3);
        assert_eq!(garbage_page["data"]["appointments"].as_array().unwrap().len(), 3);

        let (_, all) = send(
            &app,
            make_request("GET", "/api/v1/modules/5/appointments?all=true", None, None),
        )
        .await;
        assert_eq!(all["data"]["page_size"], Value::Null);
        assert_eq!(all["data"]["appointments"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn listing_refuses_unknown_sort_columns() {
        let app = test_app();
        let (status, body) = send(
            &app,
            make_request(
                "GET",
                "/api/v1/modules/5/appointments?sort=requestor_email%3B%20DROP",
                None,
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_SORT");

        let (status, _) = send(
            &app,
            make_request("GET", "/api/v1/modules/5/appointments?page_size=0", None, None),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn bulk_review_and_mode_filters() {
        let app = test_app();
        let a = create(&app, 5, birthday_party()).await;
        let b = create(&app, 5, birthday_party()).await;
        let c = create(&app, 5, birthday_party()).await;

        let (status, accepted) = send(
            &app,
            make_request(
                "POST",
                "/api/v1/appointments/accept",
                Some("3"),
                Some(json!({ "appointment_ids": [a, b, 999] })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(accepted["data"]["requested"], 3);
        assert_eq!(accepted["data"]["updated"], 2);

        let (_, pending) = send(
            &app,
            make_request("GET", "/api/v1/modules/5/appointments?mode=pending&all=true", None, None),
        )
        .await;
        assert_eq!(pending["data"]["total_records"], 1);
        assert_eq!(pending["data"]["appointments"][0]["appointment_id"], c);

        let (_, declined) = send(
            &app,
            make_request(
                "POST",
                "/api/v1/appointments/decline",
                Some("3"),
                Some(json!({ "appointment_ids": [a] })),
            ),
        )
        .await;
        assert_eq!(declined["data"]["updated"], 1);

        let (_, accepted_list) = send(
            &app,
            make_request("GET", "/api/v1/modules/5/appointments?mode=accepted", None, None),
        )
        .await;
        assert_eq!(accepted_list["data"]["total_records"], 1);

        let (status, _) = send(
            &app,
            make_request(
                "POST",
                "/api/v1/appointments/accept",
                Some("3"),
                Some(json!({ "appointment_ids": [] })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn featured_listing_only_shows_featured() {
        let app = test_app();
        let mut featured = birthday_party();
        featured["is_featured"] = json!(true);
        let id = create(&app, 5, featured).await;
        create(&app, 5, birthday_party()).await;

        let (_, listed) = send(
            &app,
            make_request("GET", "/api/v1/modules/5/appointments?featured=true", None, None),
        )
        .await;
        assert_eq!(listed["data"]["total_records"], 1);
        assert_eq!(listed["data"]["appointments"][0]["appointment_id"], id);
        assert_eq!(listed["data"]["appointments"][0]["is_featured"], true);
    }
}
