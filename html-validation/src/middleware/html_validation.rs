//! Middleware that hands outgoing HTML bodies to the validation dispatcher.
//!
//! Only responses whose `Content-Type` mentions `text/html` and whose body is
//! non-empty are inspected. The body is buffered, passed on as a
//! [`ValidationJob`], and returned to the client unchanged. Validation
//! failures are logged and never alter the response.

use std::sync::Arc;
use std::task::{Context, Poll};

use actix_web::Error;
use actix_web::body::{self, BodySize, EitherBody, MessageBody};
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::CONTENT_TYPE;
use futures_util::future::{LocalBoxFuture, Ready, ready};
use tracing::{debug, warn};

use crate::domain::ports::ValidationQueue;
use crate::domain::{
    PageSlug, ResponseValidationService, Submission, ValidationDispatcher, ValidationJob,
};

/// Validation middleware factory.
///
/// # Examples
/// ```rust,ignore
/// use actix_web::App;
/// use html_validation::HtmlValidation;
///
/// let app = App::new().wrap(HtmlValidation::inline(service));
/// ```
#[derive(Debug, Clone)]
pub struct HtmlValidation {
    dispatcher: ValidationDispatcher,
    unique_names: bool,
    max_body_bytes: Option<u64>,
}

impl HtmlValidation {
    /// Wrap an existing dispatcher.
    #[must_use]
    pub fn new(dispatcher: ValidationDispatcher) -> Self {
        Self {
            dispatcher,
            unique_names: false,
            max_body_bytes: None,
        }
    }

    /// Validate each page before the response is returned.
    #[must_use]
    pub fn inline(service: Arc<ResponseValidationService>) -> Self {
        Self::new(ValidationDispatcher::Inline(service))
    }

    /// Enqueue each page and return the response immediately.
    #[must_use]
    pub fn background(queue: Arc<dyn ValidationQueue>) -> Self {
        Self::new(ValidationDispatcher::Background(queue))
    }

    /// Append a random token to every slug so repeated requests for one path
    /// do not overwrite each other's saved page.
    #[must_use]
    pub fn with_unique_names(mut self, enabled: bool) -> Self {
        self.unique_names = enabled;
        self
    }

    /// Skip bodies larger than `limit` bytes. `None` disables the limit.
    #[must_use]
    pub fn with_max_body_bytes(mut self, limit: Option<u64>) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// Dispatcher receiving validation jobs.
    #[must_use]
    pub fn dispatcher(&self) -> &ValidationDispatcher {
        &self.dispatcher
    }

    fn should_buffer<B: MessageBody>(&self, res: &ServiceResponse<B>) -> bool {
        if !is_html(res) {
            return false;
        }
        match res.response().body().size() {
            BodySize::None | BodySize::Sized(0) => false,
            BodySize::Sized(len) => self.within_limit(len),
            BodySize::Stream => true,
        }
    }

    fn within_limit(&self, len: u64) -> bool {
        let allowed = self.max_body_bytes.is_none_or(|max| len <= max);
        if !allowed {
            debug!(bytes = len, "html response exceeds validation size limit");
        }
        allowed
    }

    fn slug_for(&self, path: &str) -> PageSlug {
        let slug = PageSlug::from_request_path(path);
        if self.unique_names {
            slug.with_random_suffix(&mut rand::thread_rng())
        } else {
            slug
        }
    }

    async fn submit(&self, job: ValidationJob) {
        let id = job.id;
        let slug = job.slug.clone();
        match self.dispatcher.submit(job).await {
            Ok(Submission::Completed(outcome)) => {
                debug!(
                    job_id = %id,
                    slug = %slug,
                    passed = outcome.passed(),
                    "html response validated"
                );
            }
            Ok(Submission::Queued(_)) => {
                debug!(job_id = %id, slug = %slug, "html response queued for validation");
            }
            Err(error) => {
                warn!(
                    %error,
                    job_id = %id,
                    slug = %slug,
                    mode = self.dispatcher.mode(),
                    "html response validation failed"
                );
            }
        }
    }
}

fn is_html<B>(res: &ServiceResponse<B>) -> bool {
    res.headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.to_ascii_lowercase().contains("text/html"))
}

impl<S, B> Transform<S, ServiceRequest> for HtmlValidation
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = HtmlValidationMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(HtmlValidationMiddleware {
            service,
            validation: self.clone(),
        }))
    }
}

/// Service wrapper produced by [`HtmlValidation`].
///
/// Applications should not use this type directly.
pub struct HtmlValidationMiddleware<S> {
    service: S,
    validation: HtmlValidation,
}

impl<S, B> Service<ServiceRequest> for HtmlValidationMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let validation = self.validation.clone();
        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            if !validation.should_buffer(&res) {
                return Ok(res.map_into_left_body());
            }

            let slug = validation.slug_for(res.request().path());
            let (request, response) = res.into_parts();
            let (head, payload) = response.into_parts();
            let bytes = body::to_bytes(payload).await.map_err(|error| {
                let error: Box<dyn std::error::Error> = error.into();
                actix_web::error::ErrorInternalServerError(error)
            })?;
            let response = head.set_body(bytes.clone());

            let len = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
            if !bytes.is_empty() && validation.within_limit(len) {
                validation.submit(ValidationJob::new(slug, bytes)).await;
            }

            Ok(ServiceResponse::new(request, response)
                .map_into_boxed_body()
                .map_into_right_body())
        })
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for response selection and job construction.

    use actix_web::http::StatusCode;
    use actix_web::web::Bytes;
    use actix_web::{App, HttpResponse, test, web};
    use futures_util::stream;
    use rstest::rstest;

    use super::*;
    use crate::domain::ports::{JobDispatchError, MockValidationQueue};
    use crate::test_support::RecordingQueue;

    const BROKEN_PAGE: &str = "<asdfghjkl></asdfghjkl>";

    async fn call(
        validation: HtmlValidation,
        path: &str,
        response: fn() -> HttpResponse,
    ) -> (StatusCode, Bytes) {
        let app = test::init_service(
            App::new()
                .wrap(validation)
                .default_service(web::to(move || async move { response() })),
        )
        .await;
        let req = test::TestRequest::get().uri(path).to_request();
        let res = test::call_service(&app, req).await;
        let status = res.status();
        (status, test::read_body(res).await)
    }

    fn html_page() -> HttpResponse {
        HttpResponse::Ok()
            .content_type("text/html; charset=utf-8")
            .body(BROKEN_PAGE)
    }

    #[actix_web::test]
    async fn html_body_is_submitted_and_returned_unchanged() {
        let queue = Arc::new(RecordingQueue::default());
        let validation = HtmlValidation::background(queue.clone());

        let (status, body) = call(validation, "/test-process-response-with-errors", html_page).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Bytes::from_static(BROKEN_PAGE.as_bytes()));
        let jobs = queue.jobs();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].slug.as_str(), "test-process-response-with-errors");
        assert_eq!(jobs[0].body, Bytes::from_static(BROKEN_PAGE.as_bytes()));
    }

    #[rstest]
    #[case("application/json")]
    #[case("json/application")]
    #[case("text/plain")]
    #[actix_web::test]
    async fn non_html_responses_are_ignored(#[case] content_type: &'static str) {
        let queue = Arc::new(RecordingQueue::default());
        let app = test::init_service(
            App::new()
                .wrap(HtmlValidation::background(queue.clone()))
                .default_service(web::to(move || async move {
                    HttpResponse::Ok().content_type(content_type).body("{}")
                })),
        )
        .await;

        let res = test::call_service(&app, test::TestRequest::get().uri("/api").to_request()).await;

        assert_eq!(test::read_body(res).await, Bytes::from_static(b"{}"));
        assert!(queue.jobs().is_empty());
    }

    #[actix_web::test]
    async fn content_type_match_is_case_insensitive() {
        let queue = Arc::new(RecordingQueue::default());
        let (_, body) = call(HtmlValidation::background(queue.clone()), "/", || {
            HttpResponse::Ok()
                .insert_header((CONTENT_TYPE, "TEXT/HTML"))
                .body("<p>")
        })
        .await;

        assert_eq!(body, Bytes::from_static(b"<p>"));
        assert_eq!(queue.jobs()[0].slug.as_str(), "index");
    }

    #[actix_web::test]
    async fn missing_content_type_is_not_html() {
        let queue = Arc::new(RecordingQueue::default());
        call(HtmlValidation::background(queue.clone()), "/", || {
            HttpResponse::Ok().body("<p>")
        })
        .await;
        assert!(queue.jobs().is_empty());
    }

    #[actix_web::test]
    async fn empty_html_bodies_are_ignored() {
        let queue = Arc::new(RecordingQueue::default());
        let (status, _) = call(HtmlValidation::background(queue.clone()), "/", || {
            HttpResponse::NoContent().content_type("text/html").finish()
        })
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(queue.jobs().is_empty());
    }

    #[actix_web::test]
    async fn oversized_bodies_are_skipped() {
        let queue = Arc::new(RecordingQueue::default());
        let validation = HtmlValidation::background(queue.clone()).with_max_body_bytes(Some(4));

        let (_, body) = call(validation, "/", html_page).await;

        assert_eq!(body, Bytes::from_static(BROKEN_PAGE.as_bytes()));
        assert!(queue.jobs().is_empty());
    }

    #[actix_web::test]
    async fn streamed_bodies_are_buffered() {
        let queue = Arc::new(RecordingQueue::default());
        let (_, body) = call(HtmlValidation::background(queue.clone()), "/stream", || {
            let chunks = stream::iter(vec![
                Ok::<_, actix_web::Error>(Bytes::from_static(b"<!DOCTYPE html>")),
                Ok(Bytes::from_static(b"<title>t</title>")),
            ]);
            HttpResponse::Ok().content_type("text/html").streaming(chunks)
        })
        .await;

        let expected = Bytes::from_static(b"<!DOCTYPE html><title>t</title>");
        assert_eq!(body, expected);
        assert_eq!(queue.jobs()[0].body, expected);
    }

    #[actix_web::test]
    async fn unique_names_add_a_random_suffix() {
        let queue = Arc::new(RecordingQueue::default());
        let validation = HtmlValidation::background(queue.clone()).with_unique_names(true);

        call(validation.clone(), "/about", html_page).await;
        call(validation, "/about", html_page).await;

        let jobs = queue.jobs();
        assert_eq!(jobs.len(), 2);
        for job in &jobs {
            assert!(job.slug.as_str().starts_with("about-"));
            assert_eq!(job.slug.as_str().len(), "about-".len() + 8);
        }
        assert_ne!(jobs[0].slug, jobs[1].slug);
    }

    #[actix_web::test]
    async fn queue_failures_do_not_affect_the_response() {
        let mut queue = MockValidationQueue::new();
        queue
            .expect_enqueue()
            .times(1)
            .returning(|_| Err(JobDispatchError::saturated(1_usize)));

        let (status, body) = call(HtmlValidation::background(Arc::new(queue)), "/", html_page).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Bytes::from_static(BROKEN_PAGE.as_bytes()));
    }
}
