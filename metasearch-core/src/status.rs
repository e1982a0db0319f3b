//! HTTP status checks applied when `raise_for_httperror` is set.
//!
//! Challenge pages are recognised before the generic status check so that a
//! CAPTCHA served with a 403 or 503 suspends the engine for the CAPTCHA time
//! rather than as a plain HTTP failure.

use crate::error::{EngineChallenge, SearchError, TransportError};
use crate::http::RawResponse;
use std::time::Duration;

/// Suspension applied after a Google reCAPTCHA page (one week).
pub const RECAPTCHA_SUSPENDED_TIME: Duration = Duration::from_secs(604_800);

/// Fail on status codes `>= 300`, mapping known refusals to challenges.
///
/// # Errors
///
/// - [`EngineChallenge::Captcha`] for Cloudflare challenge and reCAPTCHA pages
/// - [`EngineChallenge::AccessDenied`] for the Cloudflare firewall, 402 and 403
/// - [`EngineChallenge::TooManyRequests`] for 429
/// - [`TransportError::Http`] with response context for any other status >= 300
pub fn raise_for_httperror(response: &RawResponse) -> Result<(), SearchError> {
    if response.status < 300 {
        return Ok(());
    }
    if response.status >= 400 {
        raise_for_captcha(response)?;
        match response.status {
            402 | 403 => {
                return Err(
                    EngineChallenge::access_denied(format!("HTTP error {}", response.status)).into(),
                );
            }
            429 => return Err(EngineChallenge::too_many_requests("HTTP error 429").into()),
            _ => {}
        }
    }
    Err(TransportError::Http {
        message: format!(
            "{} {} for url {}",
            response.status, response.reason, response.url
        ),
        context: response.context(),
    }
    .into())
}

fn raise_for_captcha(response: &RawResponse) -> Result<(), SearchError> {
    let served_by_cloudflare = response
        .header("Server")
        .is_some_and(|server| server.starts_with("cloudflare"));
    if served_by_cloudflare {
        let body = response.text();
        if is_cloudflare_challenge(response.status, &body) {
            return Err(EngineChallenge::captcha("Cloudflare CAPTCHA").into());
        }
        if is_cloudflare_firewall(response.status, &body) {
            return Err(EngineChallenge::access_denied("Cloudflare Firewall").into());
        }
    }
    if response.status == 503 && response.text().contains("\"https://www.google.com/recaptcha/") {
        return Err(EngineChallenge::Captcha {
            message: "ReCAPTCHA".into(),
            suspended_time: Some(RECAPTCHA_SUSPENDED_TIME),
        }
        .into());
    }
    Ok(())
}

fn is_cloudflare_challenge(status: u16, body: &str) -> bool {
    match status {
        429 | 503 => {
            body.contains("__cf_chl_jschl_tk__=")
                || (body.contains("/cdn-cgi/challenge-platform/")
                    && body.contains("orchestrate/jsch/v1")
                    && body.contains("window._cf_chl_enter("))
        }
        403 => body.contains("__cf_chl_captcha_tk__="),
        _ => false,
    }
}

fn is_cloudflare_firewall(status: u16, body: &str) -> bool {
    status == 403 && body.contains("<span class=\"cf-error-code\">1020</span>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{classify, FailureKind};
    use crate::error::CAPTCHA_SUSPENDED_TIME;

    fn response(status: u16, body: &str) -> RawResponse {
        RawResponse::new(status, "https://search.example.com/?q=x", body)
    }

    fn kind_of(response: &RawResponse) -> FailureKind {
        let err = raise_for_httperror(response).expect_err("status should fail");
        classify(&err).kind
    }

    #[test]
    fn success_and_informational_pass() {
        assert!(raise_for_httperror(&response(200, "")).is_ok());
        assert!(raise_for_httperror(&response(204, "")).is_ok());
    }

    #[test]
    fn redirect_status_is_an_http_error() {
        let err = raise_for_httperror(&response(302, "")).expect_err("302 fails");
        let ctx = err.context();
        assert_eq!(ctx.status_code, Some(302));
        assert_eq!(ctx.hostname, "search.example.com");
        assert_eq!(classify(&err).kind, FailureKind::Transport);
    }

    #[test]
    fn refusals_map_to_challenges() {
        assert_eq!(kind_of(&response(402, "")), FailureKind::AccessDenied);
        assert_eq!(kind_of(&response(403, "")), FailureKind::AccessDenied);
        assert_eq!(kind_of(&response(429, "")), FailureKind::TooManyRequests);
        assert_eq!(kind_of(&response(500, "")), FailureKind::Transport);
        assert_eq!(kind_of(&response(404, "")), FailureKind::Transport);
    }

    #[test]
    fn cloudflare_challenge_is_captcha() {
        let resp = response(503, "<a href=\"/?__cf_chl_jschl_tk__=abc\">")
            .with_header("Server", "cloudflare");
        let err = raise_for_httperror(&resp).expect_err("challenge");
        let c = classify(&err);
        assert_eq!(c.kind, FailureKind::Captcha);
        assert_eq!(c.suspended_time, Some(CAPTCHA_SUSPENDED_TIME));
    }

    #[test]
    fn cloudflare_markers_ignored_without_cloudflare_server() {
        let resp = response(503, "__cf_chl_jschl_tk__=abc").with_header("Server", "nginx");
        assert_eq!(kind_of(&resp), FailureKind::Transport);
    }

    #[test]
    fn cloudflare_firewall_is_access_denied() {
        let resp = response(403, "<span class=\"cf-error-code\">1020</span>")
            .with_header("server", "cloudflare");
        let err = raise_for_httperror(&resp).expect_err("firewall");
        assert_eq!(err.to_string(), "access denied: Cloudflare Firewall");
    }

    #[test]
    fn recaptcha_suspends_for_a_week() {
        let resp = response(503, "<script src=\"https://www.google.com/recaptcha/api.js\">");
        let c = classify(&raise_for_httperror(&resp).expect_err("recaptcha"));
        assert_eq!(c.kind, FailureKind::Captcha);
        assert_eq!(c.suspended_time, Some(RECAPTCHA_SUSPENDED_TIME));
    }
}
