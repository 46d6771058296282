use std::sync::Arc;

use common::config::ApiConfig;
use common::{Error, Result};

use crate::models::{
    DiceRow, DrillDownRow, OrderRow, ProductRow, RiderRow, RollupRow, SalesSummaryRow, SliceRow,
    UserRow,
};
use crate::services::{
    Page, ProductFilter, ReportingStore, RiderFilter, SalesGrouping, UserFilter,
};

pub const DEFAULT_LIMIT: i64 = 100;

/// Request validation in front of a [`ReportingStore`].
pub struct ReportingService {
    store: Arc<dyn ReportingStore>,
    max_page_size: i64,
}

impl ReportingService {
    pub fn new(store: Arc<dyn ReportingStore>, config: &ApiConfig) -> Self {
        Self {
            store,
            max_page_size: i64::from(config.max_page_size.max(1)),
        }
    }

    pub fn max_page_size(&self) -> i64 {
        self.max_page_size
    }

    /// `skip` must be non-negative, `limit` within `1..=max_page_size`.
    pub fn page(&self, skip: Option<i64>, limit: Option<i64>) -> Result<Page> {
        let offset = skip.unwrap_or(0);
        if offset < 0 {
            return Err(Error::InvalidInput("skip must be 0 or greater".into()));
        }

        let limit = limit.unwrap_or(DEFAULT_LIMIT.min(self.max_page_size));
        if !(1..=self.max_page_size).contains(&limit) {
            return Err(Error::InvalidInput(format!(
                "limit must be between 1 and {}",
                self.max_page_size
            )));
        }

        Ok(Page { offset, limit })
    }

    pub async fn health(&self) -> Result<()> {
        self.store.ping().await.map_err(|e| match e {
            Error::Connectivity(_) => e,
            other => Error::Connectivity(format!("warehouse unreachable: {}", other)),
        })
    }

    pub async fn products(&self, filter: &ProductFilter, page: Page) -> Result<Vec<ProductRow>> {
        self.store.products(filter, page).await
    }

    pub async fn users(&self, filter: &UserFilter, page: Page) -> Result<Vec<UserRow>> {
        self.store.users(filter, page).await
    }

    pub async fn user(&self, user_id: i32) -> Result<UserRow> {
        self.store
            .user(user_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("user {} not found", user_id)))
    }

    pub async fn riders(&self, filter: &RiderFilter, page: Page) -> Result<Vec<RiderRow>> {
        self.store.riders(filter, page).await
    }

    pub async fn orders(&self, page: Page) -> Result<Vec<OrderRow>> {
        self.store.orders(page).await
    }

    pub async fn sales_summary(
        &self,
        group_by: SalesGrouping,
        page: Page,
    ) -> Result<Vec<SalesSummaryRow>> {
        self.store.sales_summary(group_by, page).await
    }

    pub async fn rollup(&self) -> Result<Vec<RollupRow>> {
        self.store.rollup().await
    }

    pub async fn drill_down(&self) -> Result<Vec<DrillDownRow>> {
        self.store.drill_down().await
    }

    pub async fn slice(&self, city: &str) -> Result<Vec<SliceRow>> {
        let city = city.trim();
        if city.is_empty() {
            return Err(Error::InvalidInput("city must not be empty".into()));
        }
        self.store.slice(city).await
    }

    /// Both lists are comma separated and must name at least one value.
    pub async fn dice(&self, cities: &str, categories: &str) -> Result<Vec<DiceRow>> {
        let cities = split_list(cities);
        let categories = split_list(categories);
        if cities.is_empty() || categories.is_empty() {
            return Err(Error::InvalidInput(
                "dice needs at least one city and one category".into(),
            ));
        }
        self.store.dice(&cities, &categories).await
    }

    pub async fn cities(&self, query: Option<&str>) -> Result<Vec<String>> {
        let query = query.map(str::trim).filter(|q| !q.is_empty());
        self.store.cities(query).await
    }

    pub async fn categories(&self) -> Result<Vec<String>> {
        self.store.categories().await
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}
