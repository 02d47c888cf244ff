use super::*;

// =============================================================================
// ApiError
// =============================================================================

#[test]
fn api_error_codes() {
    assert_eq!(ApiError::Request("x".into()).error_code(), "E_API_REQUEST");
    assert_eq!(ApiError::Status { status: 404, body: String::new() }.error_code(), "E_API_STATUS");
    assert_eq!(ApiError::Decode("x".into()).error_code(), "E_API_DECODE");
    assert_eq!(ApiError::HttpClientBuild("x".into()).error_code(), "E_HTTP_CLIENT_BUILD");
    assert_eq!(ApiError::InvalidUrl("x".into()).error_code(), "E_INVALID_URL");
}

#[test]
fn api_error_retryable_on_transport_and_server_errors() {
    assert!(ApiError::Request("reset".into()).retryable());
    assert!(ApiError::Status { status: 503, body: String::new() }.retryable());
    assert!(ApiError::Status { status: 429, body: String::new() }.retryable());
    assert!(!ApiError::Status { status: 404, body: String::new() }.retryable());
    assert!(!ApiError::Decode("bad".into()).retryable());
}

// =============================================================================
// LoadError
// =============================================================================

#[test]
fn load_error_wraps_api_error() {
    let err: LoadError = ApiError::Status { status: 500, body: String::new() }.into();
    assert_eq!(err.error_code(), "E_TEMPLATE_FETCH");
    assert!(err.retryable());
    assert_eq!(err.to_string(), "template fetch failed: unexpected response status 500");
}

#[test]
fn load_error_malformed_is_not_retryable() {
    let err = LoadError::Malformed("missing x".into());
    assert_eq!(err.error_code(), "E_TEMPLATE_MALFORMED");
    assert!(!err.retryable());
}

// =============================================================================
// RenderFailure
// =============================================================================

#[test]
fn render_failure_display_is_the_user_message() {
    assert_eq!(RenderFailure::submission().to_string(), SUBMIT_FAILED);
    assert_eq!(RenderFailure::polling().to_string(), POLL_FAILED);
    assert_eq!(RenderFailure::unexpected().to_string(), UNEXPECTED_RESPONSE);
    assert_eq!(RenderFailure::timed_out().to_string(), TIMED_OUT);
}

#[test]
fn job_failure_prefers_backend_message() {
    assert_eq!(RenderFailure::job(Some("bad font")).message(), "bad font");
    assert_eq!(RenderFailure::job(Some("  ")).message(), JOB_FAILED);
    assert_eq!(RenderFailure::job(None).message(), JOB_FAILED);
}

#[test]
fn render_failure_codes() {
    assert_eq!(RenderFailure::job(None).error_code(), "E_RENDER_JOB_FAILED");
    assert_eq!(RenderFailure::timed_out().error_code(), "E_RENDER_TIMEOUT");
    assert!(RenderFailure::polling().retryable());
    assert!(!RenderFailure::unexpected().retryable());
}

#[test]
fn config_error_code() {
    let err = ConfigError::InvalidUrl { var: "RESUME_API_BASE_URL", value: "nope".into() };
    assert_eq!(err.error_code(), "E_CONFIG_URL");
    assert_eq!(err.to_string(), "invalid URL in RESUME_API_BASE_URL: nope");
}
