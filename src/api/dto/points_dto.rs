//! Point addition, deduction, and balance DTOs.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{PointEvent, order_key_for};
use crate::error::PointsError;

/// Request body for `POST /user/{name}/points`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AddPointsRequest {
    /// Payer contributing the points (1 to 63 characters, not blank).
    #[serde(default)]
    pub payer: Option<String>,
    /// Points to add; negative values deduct from this payer.
    #[serde(default)]
    pub points: Option<i64>,
    /// When the points were granted (ISO-8601). Defaults to now.
    #[serde(default)]
    pub date: Option<String>,
}

impl AddPointsRequest {
    /// Validates every field and builds the corresponding [`PointEvent`].
    ///
    /// # Errors
    ///
    /// Returns [`PointsError::ValidationFailed`] listing every invalid field.
    pub fn into_event(self, payer_max_len: usize) -> Result<PointEvent, PointsError> {
        let mut errors = Vec::new();

        let payer = match self.payer {
            Some(payer) if !payer.trim().is_empty() => {
                if payer.chars().count() > payer_max_len {
                    errors.push(format!(
                        "payer must be between 1 and {payer_max_len} characters long"
                    ));
                }
                Some(payer)
            }
            _ => {
                errors.push("payer must not be null or blank".to_string());
                None
            }
        };

        if self.points.is_none() {
            errors.push("points must not be null".to_string());
        }

        let order_key = match order_key_for(self.date.as_deref()) {
            Ok(key) => Some(key),
            Err(err) => {
                errors.push(err.to_string());
                None
            }
        };

        match (payer, self.points, order_key) {
            (Some(payer), Some(points), Some(order_key)) if errors.is_empty() => {
                Ok(PointEvent::new(payer, points, order_key))
            }
            _ => Err(PointsError::ValidationFailed(errors)),
        }
    }
}

/// Request body for `DELETE /user/{name}/points`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct DeductPointsRequest {
    /// Points to spend, oldest first across payers. Must be at least 1.
    #[serde(default)]
    pub points: Option<i64>,
}

impl DeductPointsRequest {
    /// Returns the validated, positive amount.
    ///
    /// # Errors
    ///
    /// Returns [`PointsError::ValidationFailed`] if `points` is missing or
    /// below 1.
    pub fn amount(&self) -> Result<i64, PointsError> {
        match self.points {
            None => Err(PointsError::ValidationFailed(vec![
                "points must not be null".to_string(),
            ])),
            Some(points) if points < 1 => Err(PointsError::ValidationFailed(vec![
                "points must be positive".to_string(),
            ])),
            Some(points) => Ok(points),
        }
    }
}

/// One payer's points, as returned by balance and deduction endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PayerPoints {
    /// Payer name.
    pub payer: String,
    /// Point total (balances) or negated slice (deductions).
    pub points: i64,
}

impl From<&PointEvent> for PayerPoints {
    fn from(event: &PointEvent) -> Self {
        Self {
            payer: event.payer().to_string(),
            points: event.points(),
        }
    }
}

/// Validates a user name taken from the request path.
///
/// # Errors
///
/// Returns [`PointsError::ValidationFailed`] if the name is blank.
pub fn validate_user(name: &str) -> Result<&str, PointsError> {
    if name.trim().is_empty() {
        return Err(PointsError::ValidationFailed(vec![
            "user name must not be blank".to_string(),
        ]));
    }
    Ok(name)
}
