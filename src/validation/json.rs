use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use garde::Validate;
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// A JSON body that has been deserialized and validated.
///
/// Malformed JSON and failed rules both surface as `AppError::Validation`.
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    T::Context: Default,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| AppError::Validation(rejection.body_text()))?;

        value
            .validate()
            .map_err(|report| AppError::Validation(report.to_string().trim().to_string()))?;

        Ok(Self(value))
    }
}
