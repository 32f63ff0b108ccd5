// MiniCore Commissions - Web Server
// REST API with Axum

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use minicore_commissions::{
    calculate_commissions, get_active_salespeople, get_active_tiers, get_salesperson, insert_sale,
    insert_salesperson, open_database, report::parse_date_bound, validation, AppConfig,
    CommissionQuery, Sale, Salesperson,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;

/// Shared application state
#[derive(Clone)]
struct AppState {
    db: Arc<Mutex<Connection>>,
}

impl AppState {
    fn new(conn: Connection) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
        }
    }

    /// Everything one request reads happens under this guard, so tiers and
    /// sales come from the same snapshot.
    fn db(&self) -> Result<MutexGuard<'_, Connection>, ApiError> {
        self.db
            .lock()
            .map_err(|_| ApiError::internal("Database unavailable", "connection lock poisoned"))
    }
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            error: None,
        }
    }

    fn created(data: T, message: &str) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message.to_string()),
            error: None,
        }
    }
}

/// Failed request: status plus the `{success: false, ...}` body
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
    error: Option<String>,
}

impl ApiError {
    fn bad_request(message: &str, error: impl ToString) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.to_string(),
            error: Some(error.to_string()),
        }
    }

    fn internal(message: &str, error: impl ToString) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.to_string(),
            error: Some(error.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(message = %self.message, error = ?self.error, "request failed");
        }

        let body = ApiResponse::<()> {
            success: false,
            data: None,
            message: Some(self.message),
            error: self.error,
        };

        (self.status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), ApiError>;

// ============================================================================
// Request bodies
// ============================================================================

#[derive(Debug, Deserialize)]
struct NewSalesperson {
    first_name: String,
    last_name: String,
    email: String,
}

#[derive(Debug, Deserialize)]
struct NewSale {
    salesperson_id: String,
    amount: f64,
    /// Defaults to now
    date: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommissionParams {
    start_date: Option<String>,
    end_date: Option<String>,
    salesperson_id: Option<String>,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::<()> {
        success: true,
        data: None,
        message: Some("API running".to_string()),
        error: None,
    })
}

/// GET /api/salespeople - Active salespeople
async fn list_salespeople(State(state): State<AppState>) -> ApiResult<Vec<Salesperson>> {
    let conn = state.db()?;

    let people = get_active_salespeople(&conn)
        .map_err(|e| ApiError::internal("Error fetching salespeople", e))?;

    Ok((StatusCode::OK, Json(ApiResponse::ok(people))))
}

/// POST /api/salespeople - Register a salesperson
async fn create_salesperson(
    State(state): State<AppState>,
    body: Result<Json<NewSalesperson>, JsonRejection>,
) -> ApiResult<Salesperson> {
    let Json(body) = body.map_err(|rejection| {
        ApiError::bad_request("Error creating salesperson", rejection.body_text())
    })?;
    let person = Salesperson::new(&body.first_name, &body.last_name, &body.email);
    validation::validate_salesperson(&person).map_err(|errors| {
        ApiError::bad_request("Error creating salesperson", validation::describe(&errors))
    })?;

    let conn = state.db()?;
    insert_salesperson(&conn, &person)
        .map_err(|e| ApiError::bad_request("Error creating salesperson", e))?;

    tracing::info!(id = %person.id, email = %person.email, "salesperson created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::created(person, "Salesperson created")),
    ))
}

/// POST /api/sales - Record a sale
async fn create_sale(
    State(state): State<AppState>,
    body: Result<Json<NewSale>, JsonRejection>,
) -> ApiResult<Sale> {
    let Json(body) =
        body.map_err(|rejection| ApiError::bad_request("Error creating sale", rejection.body_text()))?;

    let date = match body.date.as_deref() {
        Some(text) => parse_date_bound(text, false).ok_or_else(|| {
            ApiError::bad_request("Error creating sale", format!("invalid date: {}", text))
        })?,
        None => Utc::now(),
    };

    let sale = Sale::new(
        body.salesperson_id.trim(),
        body.amount,
        date,
        validation::clean_description(body.description.as_deref()),
    );
    validation::validate_sale(&sale).map_err(|errors| {
        ApiError::bad_request("Error creating sale", validation::describe(&errors))
    })?;

    let conn = state.db()?;

    let known = get_salesperson(&conn, &sale.salesperson_id)
        .map_err(|e| ApiError::internal("Error creating sale", e))?;
    if known.is_none() {
        return Err(ApiError::bad_request(
            "Error creating sale",
            format!("unknown salesperson: {}", sale.salesperson_id),
        ));
    }

    insert_sale(&conn, &sale).map_err(|e| ApiError::internal("Error creating sale", e))?;

    tracing::info!(id = %sale.id, amount = sale.amount, "sale created");

    Ok((StatusCode::CREATED, Json(ApiResponse::created(sale, "Sale created"))))
}

/// GET /api/sales/commissions - Commission report for a date range
async fn get_commissions(
    State(state): State<AppState>,
    params: Result<Query<CommissionParams>, QueryRejection>,
) -> Response {
    let params = match params {
        Ok(Query(params)) => params,
        Err(rejection) => {
            return ApiError::bad_request("Invalid query parameters", rejection.body_text())
                .into_response()
        }
    };

    let query = match CommissionQuery::parse(
        params.start_date.as_deref(),
        params.end_date.as_deref(),
        params.salesperson_id.as_deref(),
    ) {
        Ok(query) => query,
        Err(e) => return ApiError::bad_request("Invalid date range", e).into_response(),
    };

    let conn = match state.db() {
        Ok(conn) => conn,
        Err(e) => return e.into_response(),
    };

    match calculate_commissions(&conn, &query) {
        Ok(report) => (StatusCode::OK, Json(ApiResponse::ok(report))).into_response(),
        Err(e) if e.is_client_error() => {
            ApiError::bad_request("Invalid date range", e).into_response()
        }
        Err(e) => ApiError::internal("Error calculating commissions", e).into_response(),
    }
}

/// GET /api/tiers - Active tiers in resolution order
async fn list_tiers(
    State(state): State<AppState>,
) -> ApiResult<Vec<minicore_commissions::CommissionTier>> {
    let conn = state.db()?;

    let tiers =
        get_active_tiers(&conn).map_err(|e| ApiError::internal("Error fetching tiers", e))?;

    Ok((StatusCode::OK, Json(ApiResponse::ok(tiers))))
}

fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/salespeople", get(list_salespeople).post(create_salesperson))
        .route("/sales", post(create_sale))
        .route("/sales/commissions", get(get_commissions))
        .route("/tiers", get(list_tiers))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env();
    minicore_commissions::logging::init_logger(config.log_format, false);

    let conn = open_database(&config.db_path)?;
    tracing::info!(path = ?config.db_path, "database opened");

    let app = build_router(AppState::new(conn));

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(%addr, "server running");
    println!("🚀 Server running on http://{}", addr);
    println!("   API: http://{}/api/sales/commissions", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
