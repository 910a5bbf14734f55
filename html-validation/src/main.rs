//! Demo server: serves a valid page, an invalid page, and a JSON endpoint
//! behind the HTML validation middleware.

use std::env;

use actix_web::{App, HttpResponse, HttpServer, Responder, get, web};
use ortho_config::OrthoConfig as _;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use html_validation::{HtmlValidation, HtmlValidationSettings, build_html_validation};

const DEFAULT_BIND: &str = "127.0.0.1:8080";

const VALID_PAGE: &str = "<!DOCTYPE html>\n\
<html lang=\"en\">\n\
<head><title>html-validation demo</title></head>\n\
<body><p>This page is valid.</p></body>\n\
</html>\n";

const BROKEN_PAGE: &str = "<!DOCTYPE html>\n\
<html lang=\"en\">\n\
<head><title>html-validation demo</title></head>\n\
<body><asdfghjkl></asdfghjkl></body>\n\
</html>\n";

#[derive(Serialize)]
struct Status {
    mode: &'static str,
    report_dir: String,
}

#[get("/")]
async fn index() -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(VALID_PAGE)
}

#[get("/broken")]
async fn broken() -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(BROKEN_PAGE)
}

#[get("/api/status")]
async fn status(state: web::Data<Status>) -> impl Responder {
    HttpResponse::Ok().json(state.get_ref())
}

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = HtmlValidationSettings::load_from_iter(env::args_os())
        .map_err(|e| std::io::Error::other(format!("failed to load settings: {e}")))?;
    let stack = build_html_validation(&settings).map_err(std::io::Error::other)?;
    let state = web::Data::new(Status {
        mode: stack.middleware.dispatcher().mode(),
        report_dir: stack.layout.report_dir().display().to_string(),
    });

    let bind = env::var("HTML_VALIDATION_BIND").unwrap_or_else(|_| DEFAULT_BIND.into());
    let middleware = stack.middleware.clone();
    let server = HttpServer::new(move || build_app(middleware.clone(), state.clone()))
        .bind(bind.as_str())?;
    info!(%bind, "demo server listening");
    server.run().await?;

    drop(stack.middleware);
    if let Some(worker) = stack.worker {
        if let Err(e) = worker.join().await {
            warn!(error = %e, "validation worker did not stop cleanly");
        }
    }
    Ok(())
}

fn build_app(
    validation: HtmlValidation,
    state: web::Data<Status>,
) -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse<impl actix_web::body::MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(state)
        .wrap(validation)
        .service(index)
        .service(broken)
        .service(status)
}
