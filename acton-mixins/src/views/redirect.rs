//! Redirect to a computed URL

use axum::response::{IntoResponse, Redirect, Response};
use axum_htmx::HxRedirect;

use super::{not_found, ViewRequest};

/// A view that redirects elsewhere
pub trait RedirectView {
    /// Target URL; empty when there is nowhere to go
    fn redirect_url(&self) -> String;

    /// Redirect to [`RedirectView::redirect_url`], or 404 if it is empty
    fn dispatch_redirect(&self, request: &ViewRequest) -> Response {
        redirect_response(&self.redirect_url(), request.is_htmx)
    }
}

/// 303 to `url`, an `HX-Redirect` for htmx requests, or 404 when `url` is empty
#[must_use]
pub fn redirect_response(url: &str, is_htmx: bool) -> Response {
    if url.is_empty() {
        tracing::debug!("empty redirect target");
        return not_found();
    }
    tracing::debug!(url, is_htmx, "redirecting");
    if is_htmx {
        (HxRedirect(url.to_string()), ()).into_response()
    } else {
        Redirect::to(url).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    struct Target(&'static str);

    impl RedirectView for Target {
        fn redirect_url(&self) -> String {
            self.0.to_string()
        }
    }

    #[test]
    fn test_redirect_location_is_exact() {
        let url = "/posts/7?tab=comments#top";
        let response = Target(url).dispatch_redirect(&ViewRequest::get());
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], url);
    }

    #[test]
    fn test_empty_target_is_not_found() {
        let response = Target("").dispatch_redirect(&ViewRequest::post([("a", "b")]));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().get("location").is_none());
    }

    #[test]
    fn test_htmx_redirect_header() {
        let response = Target("/posts").dispatch_redirect(&ViewRequest::get().htmx());
        assert_eq!(response.headers()["hx-redirect"], "/posts");
        assert!(response.headers().get("location").is_none());
    }
}
