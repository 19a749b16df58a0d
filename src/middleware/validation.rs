// src/middleware/validation.rs

use axum::{
    body::{Body, Bytes},
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::common::{error::AppError, sanitize::Sanitize};

/// JSON body that has been deserialized, sanitized and validated, in that order.
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + Sanitize,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(mut payload) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;

        payload.sanitize();
        payload.validate()?;

        Ok(ValidatedJson(payload))
    }
}

/// Like `ValidatedJson`, but an empty body stands for `T::default()`.
pub struct OptionalValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for OptionalValidatedJson<T>
where
    T: DeserializeOwned + Validate + Sanitize + Default,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let (parts, body) = req.into_parts();
        let bytes = Bytes::from_request(Request::new(body), state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            let mut payload = T::default();
            payload.sanitize();
            payload.validate()?;
            return Ok(OptionalValidatedJson(payload));
        }

        let req = Request::from_parts(parts, Body::from(bytes));
        let ValidatedJson(payload) = ValidatedJson::<T>::from_request(req, state).await?;
        Ok(OptionalValidatedJson(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::sanitize::clean_string;
    use axum::{body::Body, http::Request as HttpRequest};
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize, Validate)]
    struct Note {
        #[validate(length(max = 5, message = "Too long."))]
        text: Option<String>,
    }

    impl Sanitize for Note {
        fn sanitize(&mut self) {
            crate::common::sanitize::clean_opt(&mut self.text);
        }
    }

    #[derive(Debug, Deserialize, Validate)]
    struct Greeting {
        #[validate(length(min = 2, message = "Name is too short."))]
        name: String,
    }

    impl Sanitize for Greeting {
        fn sanitize(&mut self) {
            clean_string(&mut self.name);
        }
    }

    fn json_request(body: &str) -> Request {
        HttpRequest::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn sanitizes_before_validating() {
        let ValidatedJson(greeting) = ValidatedJson::<Greeting>::from_request(json_request(r#"{"name":"  Asha  "}"#), &())
            .await
            .unwrap();
        assert_eq!(greeting.name, "Asha");

        // Trimmed below the minimum length.
        let err = ValidatedJson::<Greeting>::from_request(json_request(r#"{"name":"   a "}"#), &())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request() {
        let err = ValidatedJson::<Greeting>::from_request(json_request("{not json"), &())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn empty_body_falls_back_to_default() {
        let bare = HttpRequest::builder()
            .method("POST")
            .uri("/")
            .body(Body::empty())
            .unwrap();
        let OptionalValidatedJson(note) = OptionalValidatedJson::<Note>::from_request(bare, &())
            .await
            .unwrap();
        assert!(note.text.is_none());
    }

    #[tokio::test]
    async fn present_body_is_still_validated() {
        let OptionalValidatedJson(note) =
            OptionalValidatedJson::<Note>::from_request(json_request(r#"{"text":" ok "}"#), &())
                .await
                .unwrap();
        assert_eq!(note.text.as_deref(), Some("ok"));

        let err = OptionalValidatedJson::<Note>::from_request(json_request(r#"{"text":"far too long"}"#), &())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, AppError::ValidationError(_)));
    }
}
