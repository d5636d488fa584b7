use serde::Deserialize;
use std::ops::RangeInclusive;

/// Allowed length of a registered short path, in characters
pub const SHORT_PATH_LEN: RangeInclusive<usize> = 4..=20;

/// Allowed length of a registered long URL, in characters
pub const LONG_URL_LEN: RangeInclusive<usize> = 4..=255;

/// Query parameters for the registration endpoint
#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RegisterParams {
    /// New short path, 4-20 characters
    pub s: Option<String>,
    /// Redirect target, 4-255 characters
    pub l: Option<String>,
}
