use actix_multipart::Multipart;
use actix_web::{
    HttpRequest, HttpResponse, HttpServer, ResponseError,
    error::PayloadError,
    get,
    http::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap},
    post, web,
};
use bytes::{Bytes, BytesMut};
use futures_util::{Stream, TryStreamExt};

use crate::{
    aggregator::aggregate,
    config::ServerConfig,
    error::{ClassifyError, ClassifyResult},
    prediction::ClassificationResult,
    state::AppState,
    storage::periodic_sweep,
};

const INDEX_HTML: &str = include_str!("../static/index.html");
const IMAGE_FIELD: &str = "image";

struct Upload {
    filename: String,
    bytes: BytesMut,
}

#[get("/")]
pub async fn index() -> HttpResponse {
    log::info!("Index page requested");
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(INDEX_HTML)
}

#[get("/health")]
pub async fn health(_req: HttpRequest, _: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().body("Ok")
}

#[post("/classify")]
pub async fn classify(
    req: HttpRequest,
    payload: web::Payload,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ClassifyError> {
    log::info!("Image classification requested");
    match classify_upload(&req, payload, &app_state).await {
        Ok(result) => Ok(HttpResponse::Ok().json(result)),
        Err(e) => {
            if e.status_code().is_server_error() {
                log::error!("Error during classification: {}", e);
            } else {
                log::warn!("Rejected classification request: {}", e);
            }
            Err(e)
        }
    }
}

#[get("/uploads/{filename}")]
pub async fn uploaded_file(
    path: web::Path<String>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ClassifyError> {
    let filename = path.into_inner();
    log::info!("Serving uploaded file: {}", filename);
    let file_path = app_state.store.open(&filename).await?;
    let bytes = tokio::fs::read(&file_path)
        .await
        .map_err(|source| ClassifyError::ReadUpload {
            name: filename.clone(),
            source,
        })?;
    let mime = mime_guess::from_path(&file_path).first_or_octet_stream();
    Ok(HttpResponse::Ok()
        .content_type(mime.to_string())
        .body(bytes))
}

async fn classify_upload(
    req: &HttpRequest,
    payload: web::Payload,
    app_state: &AppState,
) -> ClassifyResult<ClassificationResult> {
    let upload = read_upload(req.headers(), payload, app_state.max_upload_bytes).await?;
    let stored = app_state.store.save(&upload.filename, &upload.bytes).await?;
    log::info!("Image saved as {}", stored.path.display());

    let registry = app_state.classifiers.clone();
    web::block(move || aggregate(&registry, &stored))
        .await
        .map_err(|e| ClassifyError::Inference(format!("inference task failed: {}", e)))?
}

/// Pull the `image` part out of a multipart body.
///
/// Every byte read counts toward `limit`, including parts that are skipped.
async fn read_upload<S>(headers: &HeaderMap, payload: S, limit: usize) -> ClassifyResult<Upload>
where
    S: Stream<Item = Result<Bytes, PayloadError>> + 'static,
{
    let is_multipart = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.to_ascii_lowercase().starts_with("multipart/form-data"));
    if !is_multipart {
        return Err(no_image());
    }
    let declared_len = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared_len.is_some_and(|len| len > limit) {
        return Err(ClassifyError::PayloadTooLarge { limit });
    }

    let mut received = 0usize;
    let mut count = |len: usize| {
        received = received.saturating_add(len);
        if received > limit {
            Err(ClassifyError::PayloadTooLarge { limit })
        } else {
            Ok(())
        }
    };

    let mut multipart = Multipart::new(headers, payload);
    while let Some(mut field) = multipart.try_next().await.map_err(malformed)? {
        if field.name() != Some(IMAGE_FIELD) {
            while let Some(chunk) = field.try_next().await.map_err(malformed)? {
                count(chunk.len())?;
            }
            continue;
        }
        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .unwrap_or_default()
            .to_string();
        let mut bytes = BytesMut::new();
        while let Some(chunk) = field.try_next().await.map_err(malformed)? {
            count(chunk.len())?;
            bytes.extend_from_slice(&chunk);
        }
        return Ok(Upload { filename, bytes });
    }
    Err(no_image())
}

fn no_image() -> ClassifyError {
    ClassifyError::Validation("No image uploaded".to_string())
}

fn malformed(err: actix_multipart::MultipartError) -> ClassifyError {
    ClassifyError::Validation(format!("Malformed multipart body: {}", err))
}

/// Register every route on an actix `App`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(index)
        .service(health)
        .service(classify)
        .service(uploaded_file);
}

pub async fn startup(config: ServerConfig, app_state: AppState) -> std::io::Result<()> {
    if let Some(ttl) = config.upload_ttl {
        log::info!(
            "Removing uploads older than {:?} every {:?}",
            ttl,
            config.sweep_interval
        );
        tokio::spawn(periodic_sweep(
            app_state.store.clone(),
            ttl,
            config.sweep_interval,
        ));
    }

    let app_state = web::Data::new(app_state);
    log::info!("Starting server at {}:{}", config.host, config.port);

    HttpServer::new(move || {
        actix_web::App::new()
            .wrap(actix_web::middleware::Logger::default())
            .app_data(app_state.clone())
            .configure(configure)
    })
    .bind((config.host, config.port))?
    .run()
    .await
}
