use crate::caller::CallerIdentity;
use crate::error::ApiError;
use crate::models::{LONG_URL_LEN, RegisterParams, SHORT_PATH_LEN};
use crate::routes;
use crate::state::AppState;
use crate::store::CreateOutcome;
use axum::{
    extract::{Query, State},
    http::{StatusCode, Uri},
};

/// /api/regist handler - Register a new short path
///
/// Preconditions are checked in order and the first failure decides the
/// status: caller allow-list (401), parameters present (400), lengths (400),
/// then a create-if-absent write (409 on an existing key, 500 on store failure).
#[utoipa::path(
    post,
    path = routes::REGISTER,
    params(RegisterParams),
    responses(
        (status = 201, description = "Short path registered"),
        (status = 400, description = "Missing parameter or length out of bounds"),
        (status = 401, description = "Caller is not allow-listed"),
        (status = 409, description = "Short path already registered"),
        (status = 500, description = "Store write failed")
    ),
    tag = "register"
)]
pub async fn register_handler(
    State(state): State<AppState>,
    caller: CallerIdentity,
    uri: Uri,
) -> Result<StatusCode, ApiError> {
    if !caller.is(state.config.allowed_caller_ip) {
        tracing::debug!("Caller {:?} is not allow-listed", caller.0);
        return Err(ApiError::Unauthorized);
    }

    // Parsed here rather than as an extractor so a bad query cannot pre-empt the 401.
    let Query(params) = Query::<RegisterParams>::try_from_uri(&uri)
        .map_err(|e| ApiError::MissingParams(format!("unreadable query string: {}", e)))?;

    let (Some(short_path), Some(long_url)) = (params.s, params.l) else {
        return Err(ApiError::MissingParams(
            "both 's' and 'l' are required".to_string(),
        ));
    };

    check_length("s", &short_path, &SHORT_PATH_LEN)?;
    check_length("l", &long_url, &LONG_URL_LEN)?;

    match state.store.create(&short_path, &long_url).await? {
        CreateOutcome::Created => {
            tracing::info!("Registered '{}' -> {}", short_path, long_url);
            Ok(StatusCode::CREATED)
        }
        CreateOutcome::Conflict => Err(ApiError::Conflict(short_path)),
    }
}

fn check_length(
    param: &'static str,
    value: &str,
    bounds: &std::ops::RangeInclusive<usize>,
) -> Result<(), ApiError> {
    let len = value.chars().count();
    if bounds.contains(&len) {
        Ok(())
    } else {
        Err(ApiError::InvalidLength { param, len })
    }
}
