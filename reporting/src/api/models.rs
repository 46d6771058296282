use serde::{Deserialize, Serialize};

// Request models
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub category: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub city: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RiderQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub vehicle_type: Option<String>,
    pub courier: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SalesSummaryQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub group_by: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DiceQuery {
    /// Comma separated.
    pub cities: Option<String>,
    /// Comma separated.
    pub categories: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CityQuery {
    pub q: Option<String>,
}

// Response models
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            count: None,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            count: None,
            data: None,
            error: Some(message),
        }
    }
}

impl<T> ApiResponse<Vec<T>> {
    pub fn list(data: Vec<T>) -> Self {
        Self {
            success: true,
            count: Some(data.len()),
            data: Some(data),
            error: None,
        }
    }
}
