pub mod postgres;
pub mod reporting;

use async_trait::async_trait;
use axum::{Json, http::StatusCode, response::IntoResponse};
use common::Result;
use std::fmt;
use std::str::FromStr;

use crate::api::models::ApiResponse;
use crate::models::{
    DiceRow, DrillDownRow, OrderRow, ProductRow, RiderRow, RollupRow, SalesSummaryRow, SliceRow,
    UserRow,
};

pub use postgres::PgReportingStore;
pub use reporting::ReportingService;

/// Validated `OFFSET`/`LIMIT` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: i64,
    pub limit: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    pub city: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RiderFilter {
    pub vehicle_type: Option<String>,
    pub courier: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SalesGrouping {
    #[default]
    Category,
    Product,
    User,
    Rider,
}

impl SalesGrouping {
    pub fn as_str(&self) -> &'static str {
        match self {
            SalesGrouping::Category => "category",
            SalesGrouping::Product => "product",
            SalesGrouping::User => "user",
            SalesGrouping::Rider => "rider",
        }
    }
}

impl fmt::Display for SalesGrouping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SalesGrouping {
    type Err = common::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "category" => Ok(SalesGrouping::Category),
            "product" => Ok(SalesGrouping::Product),
            "user" => Ok(SalesGrouping::User),
            "rider" => Ok(SalesGrouping::Rider),
            other => Err(common::Error::InvalidInput(format!(
                "group_by must be one of category, product, user, rider (got '{}')",
                other
            ))),
        }
    }
}

/// Read side of the star schema.
#[async_trait]
pub trait ReportingStore: Send + Sync {
    async fn ping(&self) -> Result<()>;

    async fn products(&self, filter: &ProductFilter, page: Page) -> Result<Vec<ProductRow>>;

    async fn users(&self, filter: &UserFilter, page: Page) -> Result<Vec<UserRow>>;

    async fn user(&self, user_id: i32) -> Result<Option<UserRow>>;

    async fn riders(&self, filter: &RiderFilter, page: Page) -> Result<Vec<RiderRow>>;

    async fn orders(&self, page: Page) -> Result<Vec<OrderRow>>;

    async fn sales_summary(&self, group_by: SalesGrouping, page: Page)
    -> Result<Vec<SalesSummaryRow>>;

    /// Revenue by year, quarter and month including every subtotal level.
    async fn rollup(&self) -> Result<Vec<RollupRow>>;

    async fn drill_down(&self) -> Result<Vec<DrillDownRow>>;

    async fn slice(&self, city: &str) -> Result<Vec<SliceRow>>;

    async fn dice(&self, cities: &[String], categories: &[String]) -> Result<Vec<DiceRow>>;

    async fn cities(&self, query: Option<&str>) -> Result<Vec<String>>;

    async fn categories(&self) -> Result<Vec<String>>;
}

pub struct AppError(pub common::Error);

impl AppError {
    pub fn bad_request(message: String) -> Self {
        AppError(common::Error::InvalidInput(message))
    }

    pub fn not_found(message: String) -> Self {
        AppError(common::Error::NotFound(message))
    }

    pub fn status_code(&self) -> StatusCode {
        match self.0 {
            common::Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            common::Error::NotFound(_) => StatusCode::NOT_FOUND,
            common::Error::Connectivity(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status_code = self.status_code();
        if status_code.is_server_error() {
            tracing::error!(status = status_code.as_u16(), error = %self.0, "Request failed");
        }

        let body = Json(ApiResponse::<()>::error(self.0.to_string()));
        (status_code, body).into_response()
    }
}

impl From<common::Error> for AppError {
    fn from(err: common::Error) -> Self {
        AppError(err)
    }
}
