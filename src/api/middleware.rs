//! API middleware layers.
//!
//! Answers every `OPTIONS` request with `200 {}`. The inner stack still runs
//! so the CORS layer can attach its preflight headers, which are kept.

use axum::extract::Request;
use axum::http::{header, Method};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;

pub async fn answer_options(request: Request, next: Next) -> Response {
    if request.method() != Method::OPTIONS {
        return next.run(request).await;
    }

    let inner = next.run(request).await;
    let mut response = Json(serde_json::json!({})).into_response();
    let headers = response.headers_mut();
    for (name, value) in inner.headers() {
        if name != header::CONTENT_LENGTH && name != header::CONTENT_TYPE {
            headers.append(name.clone(), value.clone());
        }
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::StatusCode;
    use axum::middleware;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route("/test", get(|| async { "ok" }))
            .fallback(|| async { StatusCode::NOT_FOUND })
            .layer(middleware::from_fn(answer_options))
    }

    #[tokio::test]
    async fn test_options_answered_for_any_path() {
        for uri in ["/test", "/no/such/path"] {
            let resp = app()
                .oneshot(
                    axum::http::Request::builder()
                        .method(Method::OPTIONS)
                        .uri(uri)
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();

            assert_eq!(resp.status(), StatusCode::OK);
            let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
            assert_eq!(&bytes[..], b"{}");
        }
    }

    #[tokio::test]
    async fn test_inner_headers_are_kept() {
        let app = Router::new()
            .route("/test", get(|| async { "ok" }))
            .layer(middleware::from_fn(
                |req: Request, next: Next| async move {
                    let mut resp = next.run(req).await;
                    resp.headers_mut()
                        .insert("x-inner", axum::http::HeaderValue::from_static("1"));
                    resp
                },
            ))
            .layer(middleware::from_fn(answer_options));

        let resp = app
            .oneshot(
                axum::http::Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/test")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get("x-inner").unwrap(), "1");
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[tokio::test]
    async fn test_other_methods_pass_through() {
        let resp = app()
            .oneshot(axum::http::Request::get("/test").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"ok");
    }
}
