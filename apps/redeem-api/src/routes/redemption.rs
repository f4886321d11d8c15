//! Coupon redemption handlers.

use axum::extract::{Path, State};
use axum::response::Html;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use veranda_core::RedeemOutcome;
use veranda_db::CodeLookup;

use crate::error::ApiError;
use crate::state::AppState;

/// The static redemption page served to venue terminals.
pub async fn page() -> Html<&'static str> {
    Html(include_str!("../../static/redeem.html"))
}

#[derive(Debug, Serialize)]
pub struct RedemptionResponse {
    pub code: String,
    pub outcome: RedeemOutcome,
    pub definition_name: Option<String>,
    pub redeemed_at: Option<DateTime<Utc>>,
    pub redeemed_by: Option<String>,
}

impl RedemptionResponse {
    fn from_lookup(code: String, lookup: CodeLookup) -> Self {
        let (redeemed_at, redeemed_by) = lookup
            .coupon
            .map(|c| (c.redeemed_at, c.redeemed_by))
            .unwrap_or((None, None));
        RedemptionResponse {
            code,
            outcome: lookup.outcome,
            definition_name: lookup.definition_name,
            redeemed_at,
            redeemed_by,
        }
    }
}

/// `GET /api/coupon-redemption/{code}` - status peek, never mutates.
pub async fn lookup(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<RedemptionResponse>, ApiError> {
    let code = normalize(&code)?;
    let lookup = state.db.coupons().lookup_code(&code).await?;
    Ok(Json(RedemptionResponse::from_lookup(code, lookup)))
}

#[derive(Debug, Deserialize)]
pub struct RedeemRequest {
    pub code: String,
    /// Venue terminal identifier; falls back to the configured default.
    pub redeemed_by: Option<String>,
}

/// `POST /api/coupon-redemption/redeem` - marks the code redeemed.
/// Double redemption is guarded in the database; the second caller
/// gets `already_redeemed`, never a second success.
pub async fn redeem(
    State(state): State<AppState>,
    Json(request): Json<RedeemRequest>,
) -> Result<Json<RedemptionResponse>, ApiError> {
    let code = normalize(&request.code)?;
    let redeemed_by = request
        .redeemed_by
        .unwrap_or_else(|| state.config.default_venue_id.clone());

    let lookup = state.db.coupons().redeem_code(&code, &redeemed_by).await?;
    info!(code = %code, outcome = ?lookup.outcome, "Redemption attempt");
    Ok(Json(RedemptionResponse::from_lookup(code, lookup)))
}

fn normalize(code: &str) -> Result<String, ApiError> {
    let code = code.trim().to_uppercase();
    if code.is_empty() || code.len() > 32 {
        return Err(ApiError::BadRequest("Invalid coupon code".to_string()));
    }
    Ok(code)
}

// =============================================================================
// Route Tests
// =============================================================================
