use sealmail_crypto::CryptoError;
use sealmail_rest::{EntityRestError, RestError, SetupMultipleError};
use sealmail_types::{Entity, TypeRef};
use std::time::Duration;

#[test]
fn from_status_covers_known_codes() {
    let cases = [
        (400, "bad request"),
        (401, "not authenticated"),
        (403, "not authorized"),
        (404, "not found"),
        (405, "method not allowed"),
        (409, "conflict"),
        (412, "precondition failed"),
        (413, "payload too large"),
        (500, "internal server error"),
        (503, "service unavailable"),
    ];
    for (status, prefix) in cases {
        let err = RestError::from_status(status, "msg", None);
        assert!(err.to_string().starts_with(prefix), "{status}: {err}");
    }
    assert_eq!(
        RestError::from_status(502, "gateway", None).to_string(),
        "HTTP 502: gateway"
    );
}

#[test]
fn retry_after_only_for_rate_limits() {
    let limited = RestError::from_status(429, "", Some(12));
    assert_eq!(limited.retry_after(), Some(Duration::from_secs(12)));
    assert_eq!(RestError::from_status(429, "", None).retry_after(), None);
    assert_eq!(RestError::NotFound("x".into()).retry_after(), None);
}

#[test]
fn payload_too_large_seen_through_client_error() {
    let err: EntityRestError = RestError::PayloadTooLarge("big".into()).into();
    assert!(err.is_payload_too_large());

    let err: EntityRestError = RestError::BadRequest("no".into()).into();
    assert!(!err.is_payload_too_large());

    let err: EntityRestError = CryptoError::Migration("x".into()).into();
    assert!(!err.is_payload_too_large());
}

#[test]
fn rest_errors_display_transparently() {
    let err: EntityRestError = RestError::NotAuthenticated("auth headers are empty".into()).into();
    assert_eq!(err.to_string(), "not authenticated: auth headers are empty");
}

#[test]
fn setup_multiple_error_summarizes_counts() {
    let failure = SetupMultipleError {
        errors: vec![RestError::InternalServerError("boom".into()).into()],
        failed_instances: vec![
            Entity::new(TypeRef::new("tutanota", "Contact")),
            Entity::new(TypeRef::new("tutanota", "Contact")),
        ],
    };
    assert_eq!(
        failure.to_string(),
        "setup multiple entities failed: 1 error(s), 2 instance(s) not created"
    );

    let err: EntityRestError = failure.into();
    assert!(matches!(err, EntityRestError::SetupMultiple(ref f) if f.failed_instances.len() == 2));
}
