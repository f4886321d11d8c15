//! Cookie-presence gate for `/api` routes.
//!
//! Not an authentication scheme: the POS shell sets a `pos_user`
//! cookie when a staff member is signed in, and this middleware only
//! checks the cookie exists. The API listens on the venue LAN behind
//! the shell; anything stronger is out of scope here.

use axum::extract::Request;
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;

use crate::error::ApiError;

pub async fn require_pos_user(req: Request, next: Next) -> Result<Response, ApiError> {
    let present = req
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(|cookies| {
            cookies
                .split(';')
                .any(|c| c.trim_start().starts_with("pos_user="))
        })
        .unwrap_or(false);

    if !present {
        return Err(ApiError::Unauthorized);
    }
    Ok(next.run(req).await)
}
