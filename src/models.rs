use std::sync::Arc;

use serde::Serialize;

use crate::{
    config::PagingConfig,
    lookup::{PgRegionLookup, RegionLookup, StaticRegionLookup},
    store::{memory::MemoryAppointmentStore, postgres::PgAppointmentStore, AppointmentStore},
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn AppointmentStore>,
    pub regions: Arc<dyn RegionLookup>,
    pub paging: PagingConfig,
}

impl AppState {
    pub fn postgres(pool: sqlx::PgPool, paging: PagingConfig) -> Self {
        Self {
            store: Arc::new(PgAppointmentStore::new(pool.clone())),
            regions: Arc::new(PgRegionLookup::new(pool)),
            paging,
        }
    }

    pub fn in_memory(regions: StaticRegionLookup, paging: PagingConfig) -> Self {
        Self {
            store: Arc::new(MemoryAppointmentStore::default()),
            regions: Arc::new(regions),
            paging,
        }
    }
}

/* -------------------------
   API DTOs
--------------------------*/

#[derive(Debug, Serialize)]
pub struct ApiOk<T> {
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct OkData {
    pub ok: bool,
}
