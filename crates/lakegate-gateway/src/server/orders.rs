//! Sample-dataset order endpoints.
//!
//! Simple parameterized queries over the pool. Mounted only when the
//! managed resource is ready (see the route registry). Every handler
//! resolves a credential for the active auth mode, checks out a
//! connection, and runs under the per-command timeout.

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::Json;
use serde::Deserialize;
use tracing::info;

use lakegate_core::{
    CursorPageInfo, GatewayError, Order, OrderCount, OrderCursorPage, OrderPage, OrderSample,
    OrderStatusUpdate, OrderStatusUpdateResponse, PageInfo,
};

use super::error::ApiResult;
use super::state::OrdersState;

const ORDER_COLUMNS: &str = "o_orderkey, o_custkey, o_orderstatus, o_totalprice, o_orderdate, \
                             o_orderpriority, o_clerk, o_shippriority, o_comment";

const MAX_PAGE_SIZE: u64 = 1000;

fn validate_page_size(page_size: u64) -> Result<(), GatewayError> {
    if page_size == 0 || page_size > MAX_PAGE_SIZE {
        return Err(GatewayError::InvalidRequest(format!(
            "page_size must be between 1 and {}",
            MAX_PAGE_SIZE
        )));
    }
    Ok(())
}

/// Offset for page-based pagination. Absurd page numbers that would
/// overflow the offset are rejected rather than wrapped.
fn page_offset(page: u64, page_size: u64) -> Result<i64, GatewayError> {
    page.checked_sub(1)
        .and_then(|p| p.checked_mul(page_size))
        .and_then(|offset| i64::try_from(offset).ok())
        .ok_or_else(|| GatewayError::InvalidRequest("page is out of range".to_string()))
}

fn validate_order_key(order_key: i64) -> Result<(), GatewayError> {
    if order_key <= 0 {
        return Err(GatewayError::InvalidRequest(
            "Invalid order key provided".to_string(),
        ));
    }
    Ok(())
}

/// Total order count.
pub async fn count(
    State(state): State<OrdersState>,
    headers: HeaderMap,
) -> ApiResult<Json<OrderCount>> {
    let credential = state.db.credential_for(&headers)?;
    let mut conn = state.db.pool.acquire(&credential).await?;

    let sql = format!("SELECT COUNT(*) FROM {}", state.settings.orders_relation());
    let result = state
        .db
        .pool
        .run_query(sqlx::query_scalar::<_, i64>(&sql).fetch_one(&mut *conn))
        .await;

    match result {
        Ok(total_orders) => Ok(Json(OrderCount { total_orders })),
        Err(e) => {
            conn.discard();
            Err(e.into())
        }
    }
}

/// A handful of order keys for testing.
pub async fn sample(
    State(state): State<OrdersState>,
    headers: HeaderMap,
) -> ApiResult<Json<OrderSample>> {
    let credential = state.db.credential_for(&headers)?;
    let mut conn = state.db.pool.acquire(&credential).await?;

    let sql = format!(
        "SELECT o_orderkey FROM {} LIMIT 5",
        state.settings.orders_relation()
    );
    let result = state
        .db
        .pool
        .run_query(sqlx::query_scalar::<_, i64>(&sql).fetch_all(&mut *conn))
        .await;

    match result {
        Ok(sample_order_keys) => Ok(Json(OrderSample { sample_order_keys })),
        Err(e) => {
            conn.discard();
            Err(e.into())
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    #[serde(default = "default_include_count")]
    pub include_count: bool,
}

fn default_page() -> u64 {
    1
}

fn default_page_size() -> u64 {
    100
}

fn default_include_count() -> bool {
    true
}

/// Page-based pagination. Fetches one extra row to detect `has_next`
/// without a second count query.
pub async fn pages(
    State(state): State<OrdersState>,
    headers: HeaderMap,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<OrderPage>> {
    validate_page_size(params.page_size)?;
    if params.page == 0 {
        return Err(GatewayError::InvalidRequest("page must be >= 1".to_string()).into());
    }
    let offset = page_offset(params.page, params.page_size)?;

    let credential = state.db.credential_for(&headers)?;
    let mut conn = state.db.pool.acquire(&credential).await?;
    let relation = state.settings.orders_relation();

    let (total_count, total_pages) = if params.include_count {
        let sql = format!("SELECT COUNT(*) FROM {}", relation);
        let count = state
            .db
            .pool
            .run_query(sqlx::query_scalar::<_, i64>(&sql).fetch_one(&mut *conn))
            .await;
        match count {
            Ok(count) => {
                let pages = (count + params.page_size as i64 - 1) / params.page_size as i64;
                (count, pages)
            }
            Err(e) => {
                conn.discard();
                return Err(e.into());
            }
        }
    } else {
        (-1, -1)
    };

    let sql = format!(
        "SELECT {} FROM {} ORDER BY o_orderkey OFFSET $1 LIMIT $2",
        ORDER_COLUMNS, relation
    );
    let result = state
        .db
        .pool
        .run_query(
            sqlx::query_as::<_, Order>(&sql)
                .bind(offset)
                .bind(params.page_size as i64 + 1)
                .fetch_all(&mut *conn),
        )
        .await;

    let mut orders = match result {
        Ok(orders) => orders,
        Err(e) => {
            conn.discard();
            return Err(e.into());
        }
    };

    let has_next = orders.len() as u64 > params.page_size;
    orders.truncate(params.page_size as usize);
    let has_previous = params.page > 1;

    let next_cursor = if has_next {
        orders.last().map(|o| o.o_orderkey)
    } else {
        None
    };
    let previous_cursor = if has_previous {
        orders
            .first()
            .map(|o| (o.o_orderkey - params.page_size as i64).max(0))
    } else {
        None
    };

    Ok(Json(OrderPage {
        orders,
        pagination: PageInfo {
            page: params.page,
            page_size: params.page_size,
            total_pages,
            total_count,
            has_next,
            has_previous,
            next_cursor,
            previous_cursor,
        },
    }))
}

#[derive(Debug, Deserialize)]
pub struct CursorParams {
    #[serde(default)]
    pub cursor: i64,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

/// Keyset pagination: records strictly after the cursor key.
pub async fn stream(
    State(state): State<OrdersState>,
    headers: HeaderMap,
    Query(params): Query<CursorParams>,
) -> ApiResult<Json<OrderCursorPage>> {
    validate_page_size(params.page_size)?;
    if params.cursor < 0 {
        return Err(GatewayError::InvalidRequest("cursor must be >= 0".to_string()).into());
    }

    let credential = state.db.credential_for(&headers)?;
    let mut conn = state.db.pool.acquire(&credential).await?;

    let sql = format!(
        "SELECT {} FROM {} WHERE o_orderkey > $1 ORDER BY o_orderkey LIMIT $2",
        ORDER_COLUMNS,
        state.settings.orders_relation()
    );
    let result = state
        .db
        .pool
        .run_query(
            sqlx::query_as::<_, Order>(&sql)
                .bind(params.cursor)
                .bind(params.page_size as i64 + 1)
                .fetch_all(&mut *conn),
        )
        .await;

    let mut orders = match result {
        Ok(orders) => orders,
        Err(e) => {
            conn.discard();
            return Err(e.into());
        }
    };

    let has_next = orders.len() as u64 > params.page_size;
    orders.truncate(params.page_size as usize);
    let has_previous = params.cursor > 0;

    let next_cursor = if has_next {
        orders.last().map(|o| o.o_orderkey)
    } else {
        None
    };
    let previous_cursor = if has_previous {
        Some((params.cursor - params.page_size as i64).max(0))
    } else {
        None
    };

    Ok(Json(OrderCursorPage {
        orders,
        pagination: CursorPageInfo {
            page_size: params.page_size,
            has_next,
            has_previous,
            next_cursor,
            previous_cursor,
        },
    }))
}

/// Fetch a single order by key.
pub async fn get_order(
    State(state): State<OrdersState>,
    headers: HeaderMap,
    Path(order_key): Path<i64>,
) -> ApiResult<Json<Order>> {
    validate_order_key(order_key)?;

    let credential = state.db.credential_for(&headers)?;
    let mut conn = state.db.pool.acquire(&credential).await?;

    let sql = format!(
        "SELECT {} FROM {} WHERE o_orderkey = $1",
        ORDER_COLUMNS,
        state.settings.orders_relation()
    );
    let result = state
        .db
        .pool
        .run_query(
            sqlx::query_as::<_, Order>(&sql)
                .bind(order_key)
                .fetch_optional(&mut *conn),
        )
        .await;

    match result {
        Ok(Some(order)) => Ok(Json(order)),
        Ok(None) => Err(GatewayError::NotFound(format!(
            "Order with key '{}' not found",
            order_key
        ))
        .into()),
        Err(e) => {
            conn.discard();
            Err(e.into())
        }
    }
}

/// Update the status of a single order.
pub async fn update_status(
    State(state): State<OrdersState>,
    headers: HeaderMap,
    Path(order_key): Path<i64>,
    Json(update): Json<OrderStatusUpdate>,
) -> ApiResult<Json<OrderStatusUpdateResponse>> {
    validate_order_key(order_key)?;

    let credential = state.db.credential_for(&headers)?;
    let mut conn = state.db.pool.acquire(&credential).await?;

    let sql = format!(
        "UPDATE {} SET o_orderstatus = $1 WHERE o_orderkey = $2",
        state.settings.orders_relation()
    );
    let result = state
        .db
        .pool
        .run_query(
            sqlx::query(&sql)
                .bind(&update.o_orderstatus)
                .bind(order_key)
                .execute(&mut *conn),
        )
        .await;

    match result {
        Ok(done) if done.rows_affected() == 0 => Err(GatewayError::NotFound(format!(
            "Order with key '{}' not found",
            order_key
        ))
        .into()),
        Ok(_) => {
            info!(
                "[Gateway] Updated order {} status to {}",
                order_key, update.o_orderstatus
            );
            Ok(Json(OrderStatusUpdateResponse {
                o_orderkey: order_key,
                o_orderstatus: update.o_orderstatus,
                message: "Order status updated successfully".to_string(),
            }))
        }
        Err(e) => {
            conn.discard();
            Err(e.into())
        }
    }
}
