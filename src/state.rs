use std::sync::Arc;

use sqlx::PgPool;

use crate::services::{MediaStore, ReportRenderer};

/// Shared by every handler; cloned per request
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub media: Arc<dyn MediaStore>,
    pub reports: Arc<dyn ReportRenderer>,
}

impl AppState {
    pub fn new(pool: PgPool, media: Arc<dyn MediaStore>, reports: Arc<dyn ReportRenderer>) -> Self {
        Self { pool, media, reports }
    }
}
