use axum::{
    Json, Router,
    extract::rejection::{PathRejection, QueryRejection},
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::models::{
    ApiResponse, CityQuery, DiceQuery, PageQuery, ProductQuery, RiderQuery, SalesSummaryQuery,
    UserQuery,
};
use crate::models::UserRow;
use crate::services::{
    AppError, ProductFilter, ReportingService, RiderFilter, SalesGrouping, UserFilter,
};

type ApiResult = Result<Response, AppError>;

fn query<T>(extracted: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    extracted
        .map(|Query(params)| params)
        .map_err(|e| AppError::bad_request(e.body_text()))
}

fn path<T>(extracted: Result<Path<T>, PathRejection>) -> Result<T, AppError> {
    extracted
        .map(|Path(params)| params)
        .map_err(|e| AppError::bad_request(e.body_text()))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn list<T: serde::Serialize>(rows: Vec<T>) -> Response {
    Json(ApiResponse::list(rows)).into_response()
}

pub async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "message": "Sales OLAP API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "/api/health",
            "products": "/api/products",
            "users": "/api/users",
            "riders": "/api/riders",
            "orders": "/api/orders",
            "sales-summary": "/api/sales-summary",
            "rollup": "/api/rollup",
            "drill-down": "/api/drillDown",
            "slice": "/api/slice/{city}",
            "dice": "/api/dice",
            "cities": "/api/cities",
            "categories": "/api/categories"
        }
    }))
}

pub async fn health(State(service): State<Arc<ReportingService>>) -> ApiResult {
    service.health().await?;
    Ok(Json(ApiResponse::success(json!({
        "status": "healthy",
        "database": "connected"
    })))
    .into_response())
}

pub async fn products(
    State(service): State<Arc<ReportingService>>,
    params: Result<Query<ProductQuery>, QueryRejection>,
) -> ApiResult {
    let params = query(params)?;
    let page = service.page(params.skip, params.limit)?;
    let filter = ProductFilter {
        category: non_blank(params.category),
    };
    Ok(list(service.products(&filter, page).await?))
}

pub async fn users(
    State(service): State<Arc<ReportingService>>,
    params: Result<Query<UserQuery>, QueryRejection>,
) -> ApiResult {
    let params = query(params)?;
    let page = service.page(params.skip, params.limit)?;
    let filter = UserFilter {
        city: non_blank(params.city),
        country: non_blank(params.country),
    };
    let users = service.users(&filter, page).await?;
    Ok(list(users.iter().map(UserRow::view).collect()))
}

pub async fn user_by_id(
    State(service): State<Arc<ReportingService>>,
    user_id: Result<Path<i32>, PathRejection>,
) -> ApiResult {
    let user = service.user(path(user_id)?).await?;
    Ok(Json(ApiResponse::success(user.view())).into_response())
}

pub async fn riders(
    State(service): State<Arc<ReportingService>>,
    params: Result<Query<RiderQuery>, QueryRejection>,
) -> ApiResult {
    let params = query(params)?;
    let page = service.page(params.skip, params.limit)?;
    let filter = RiderFilter {
        vehicle_type: non_blank(params.vehicle_type),
        courier: non_blank(params.courier),
    };
    Ok(list(service.riders(&filter, page).await?))
}

pub async fn orders(
    State(service): State<Arc<ReportingService>>,
    params: Result<Query<PageQuery>, QueryRejection>,
) -> ApiResult {
    let params = query(params)?;
    let page = service.page(params.skip, params.limit)?;
    Ok(list(service.orders(page).await?))
}

pub async fn sales_summary(
    State(service): State<Arc<ReportingService>>,
    params: Result<Query<SalesSummaryQuery>, QueryRejection>,
) -> ApiResult {
    let params = query(params)?;
    let page = service.page(params.skip, params.limit)?;
    let group_by = match non_blank(params.group_by) {
        Some(raw) => raw.parse::<SalesGrouping>()?,
        None => SalesGrouping::default(),
    };
    Ok(list(service.sales_summary(group_by, page).await?))
}

pub async fn rollup(State(service): State<Arc<ReportingService>>) -> ApiResult {
    Ok(list(service.rollup().await?))
}

pub async fn drill_down(State(service): State<Arc<ReportingService>>) -> ApiResult {
    Ok(list(service.drill_down().await?))
}

pub async fn slice(
    State(service): State<Arc<ReportingService>>,
    city: Result<Path<String>, PathRejection>,
) -> ApiResult {
    Ok(list(service.slice(&path(city)?).await?))
}

pub async fn dice(
    State(service): State<Arc<ReportingService>>,
    params: Result<Query<DiceQuery>, QueryRejection>,
) -> ApiResult {
    let params = query(params)?;
    let cities = params.cities.unwrap_or_default();
    let categories = params.categories.unwrap_or_default();
    Ok(list(service.dice(&cities, &categories).await?))
}

/// Two cities by two categories, the form the dashboard links to.
pub async fn dice_pair(
    State(service): State<Arc<ReportingService>>,
    segments: Result<Path<(String, String, String, String)>, PathRejection>,
) -> ApiResult {
    let (city_1, city_2, category_1, category_2) = path(segments)?;
    let cities = format!("{},{}", city_1, city_2);
    let categories = format!("{},{}", category_1, category_2);
    Ok(list(service.dice(&cities, &categories).await?))
}

pub async fn cities(
    State(service): State<Arc<ReportingService>>,
    params: Result<Query<CityQuery>, QueryRejection>,
) -> ApiResult {
    let params = query(params)?;
    Ok(list(service.cities(params.q.as_deref()).await?))
}

pub async fn categories(State(service): State<Arc<ReportingService>>) -> ApiResult {
    Ok(list(service.categories().await?))
}

// Define all API routes
pub fn routes(service: Arc<ReportingService>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/health", get(health))
        .route("/api/products", get(products))
        .route("/api/users", get(users))
        .route("/api/users/{id}", get(user_by_id))
        .route("/api/riders", get(riders))
        .route("/api/orders", get(orders))
        .route("/api/sales-summary", get(sales_summary))
        .route("/api/rollup", get(rollup))
        .route("/api/drillDown", get(drill_down))
        .route("/api/slice/{city}", get(slice))
        .route("/api/dice", get(dice))
        .route(
            "/api/dice/{city_1}/{city_2}/{category_1}/{category_2}",
            get(dice_pair),
        )
        .route("/api/cities", get(cities))
        .route("/api/categories", get(categories))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}
