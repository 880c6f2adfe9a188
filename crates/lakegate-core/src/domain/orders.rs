//! Order records and pagination DTOs for the sample dataset.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row of the synced orders table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub o_orderkey: i64,
    pub o_custkey: i64,
    pub o_orderstatus: String,
    pub o_totalprice: Decimal,
    pub o_orderdate: NaiveDate,
    pub o_orderpriority: String,
    pub o_clerk: String,
    pub o_shippriority: i32,
    pub o_comment: String,
}

#[derive(Debug, Serialize)]
pub struct OrderCount {
    pub total_orders: i64,
}

#[derive(Debug, Serialize)]
pub struct OrderSample {
    pub sample_order_keys: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub struct OrderStatusUpdate {
    pub o_orderstatus: String,
}

#[derive(Debug, Serialize)]
pub struct OrderStatusUpdateResponse {
    pub o_orderkey: i64,
    pub o_orderstatus: String,
    pub message: String,
}

/// Page-based pagination info. `total_pages`/`total_count` are -1 when
/// the caller opted out of the count query.
#[derive(Debug, Serialize)]
pub struct PageInfo {
    pub page: u64,
    pub page_size: u64,
    pub total_pages: i64,
    pub total_count: i64,
    pub has_next: bool,
    pub has_previous: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_cursor: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct OrderPage {
    pub orders: Vec<Order>,
    pub pagination: PageInfo,
}

#[derive(Debug, Serialize)]
pub struct CursorPageInfo {
    pub page_size: u64,
    pub has_next: bool,
    pub has_previous: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_cursor: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct OrderCursorPage {
    pub orders: Vec<Order>,
    pub pagination: CursorPageInfo,
}
