use std::future::{Ready, ready};

use actix_web::{
    Error, HttpMessage,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::header::{HeaderName, HeaderValue},
};
use futures_util::future::LocalBoxFuture;
use uuid::Uuid;

pub const CORRELATION_HEADER: &str = "x-correlation-id";

/// Correlation id of the current request, stored in request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationId(pub String);

/// Tags every request with a correlation id, reusing the caller's
/// `X-Correlation-ID` when present, and echoes it on the response.
pub struct RequestId;

impl<S, B> Transform<S, ServiceRequest> for RequestId
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestIdService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestIdService { service }))
    }
}

pub struct RequestIdService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for RequestIdService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let correlation_id = req
            .headers()
            .get(CORRELATION_HEADER)
            .and_then(|h| h.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        req.extensions_mut()
            .insert(CorrelationId(correlation_id.clone()));

        let fut = self.service.call(req);

        Box::pin(async move {
            let mut res = fut.await?;
            if let Ok(value) = HeaderValue::from_str(&correlation_id) {
                res.headers_mut()
                    .insert(HeaderName::from_static(CORRELATION_HEADER), value);
            }
            Ok(res)
        })
    }
}

pub trait RequestIdExt {
    fn correlation_id(&self) -> Option<String>;
}

impl RequestIdExt for actix_web::HttpRequest {
    fn correlation_id(&self) -> Option<String> {
        self.extensions()
            .get::<CorrelationId>()
            .map(|id| id.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, HttpRequest, HttpResponse, test, web};

    async fn echo(req: HttpRequest) -> HttpResponse {
        HttpResponse::Ok().body(req.correlation_id().unwrap_or_default())
    }

    #[actix_web::test]
    async fn reuses_the_callers_correlation_id() {
        let app = test::init_service(
            App::new()
                .wrap(RequestId)
                .route("/", web::get().to(echo)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/")
            .insert_header(("X-Correlation-ID", "abc-123"))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.headers().get(CORRELATION_HEADER).unwrap(), "abc-123");
        assert_eq!(test::read_body(res).await, "abc-123");
    }

    #[actix_web::test]
    async fn generates_an_id_when_missing() {
        let app = test::init_service(
            App::new()
                .wrap(RequestId)
                .route("/", web::get().to(echo)),
        )
        .await;

        let res = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        let header = res.headers().get(CORRELATION_HEADER).unwrap().to_str().unwrap();
        assert!(Uuid::parse_str(header).is_ok());
    }
}
