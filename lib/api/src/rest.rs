use actix_cors::Cors;
use actix_web::{web, App, HttpResponse, HttpServer, Result as ActixResult};
use fieldrecon_core::{Error, TypeHints};
use fieldrecon_similarity::{CanonicalModel, CompareOptions, Reconciler};
use fieldrecon_storage::ModelRepository;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub reconciler: Arc<Reconciler>,
    pub repository: Arc<ModelRepository>,
}

#[derive(Deserialize)]
struct PutModelRequest {
    document: Value,
    #[serde(default)]
    type_hints: Option<TypeHints>,
}

#[derive(Deserialize)]
struct CompareRequest {
    api: Value,
    model: Value,
    #[serde(default)]
    options: CompareOptions,
}

#[derive(Deserialize)]
struct AutoCompareRequest {
    api: Value,
    /// Restrict the candidates to these stored models
    #[serde(default)]
    model_ids: Option<Vec<String>>,
    #[serde(default)]
    options: CompareOptions,
}

pub struct RestApi;

impl RestApi {
    pub async fn start(state: AppState, port: u16) -> std::io::Result<()> {
        HttpServer::new(move || {
            let cors = Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
                .max_age(3600);

            App::new()
                .wrap(cors)
                .app_data(web::Data::new(state.clone()))
                .app_data(json_config())
                .configure(configure)
        })
        .bind(("0.0.0.0", port))?
        .run()
        .await
    }
}

/// Register every route; shared by the server and the tests
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/models", web::get().to(list_models))
        .route("/models/{id}", web::get().to(get_model))
        .route("/models/{id}", web::put().to(put_model))
        .route("/models/{id}", web::delete().to(delete_model))
        .route("/compare", web::post().to(compare))
        .route("/compare/auto", web::post().to(compare_auto));
}

/// Malformed JSON bodies get the same error shape as every other 400
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(16 * 1024 * 1024)
        .error_handler(|err, _req| {
            let response = HttpResponse::BadRequest().json(json!({ "error": err.to_string() }));
            actix_web::error::InternalError::from_response(err, response).into()
        })
}

fn error_response(err: &Error) -> HttpResponse {
    let body = json!({ "error": err.to_string() });
    match err {
        Error::ModelNotFound(_) => HttpResponse::NotFound().json(body),
        Error::InvalidDocument(_) | Error::InvalidOption(_) | Error::Serialization(_) => {
            HttpResponse::BadRequest().json(body)
        }
        _ => {
            tracing::warn!(error = %err, "request failed");
            HttpResponse::InternalServerError().json(body)
        }
    }
}

async fn health(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "models": state.repository.len(),
        "cache": state.reconciler.cache_stats(),
    })))
}

async fn list_models(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.repository.list()))
}

async fn get_model(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ActixResult<HttpResponse> {
    let id = path.into_inner();
    match state.repository.require(&id) {
        Ok(record) => Ok(HttpResponse::Ok().json(record)),
        Err(e) => Ok(error_response(&e)),
    }
}

async fn put_model(
    state: web::Data<AppState>,
    path: web::Path<String>,
    req: web::Json<PutModelRequest>,
) -> ActixResult<HttpResponse> {
    let id = path.into_inner();
    let req = req.into_inner();
    match state.repository.put(&id, req.document, req.type_hints) {
        Ok((record, true)) => Ok(HttpResponse::Created().json(record)),
        Ok((record, false)) => Ok(HttpResponse::Ok().json(record)),
        Err(e) => Ok(error_response(&e)),
    }
}

async fn delete_model(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ActixResult<HttpResponse> {
    let id = path.into_inner();
    match state.repository.delete(&id) {
        Ok(true) => Ok(HttpResponse::Ok().json(json!({ "deleted": true }))),
        Ok(false) => Ok(error_response(&Error::ModelNotFound(id))),
        Err(e) => Ok(error_response(&e)),
    }
}

async fn compare(
    state: web::Data<AppState>,
    req: web::Json<CompareRequest>,
) -> ActixResult<HttpResponse> {
    match state
        .reconciler
        .compare(&req.api, &req.model, &req.options)
        .await
    {
        Ok(result) => Ok(HttpResponse::Ok().json(result.as_ref())),
        Err(e) => Ok(error_response(&e)),
    }
}

async fn compare_auto(
    state: web::Data<AppState>,
    req: web::Json<AutoCompareRequest>,
) -> ActixResult<HttpResponse> {
    let outcome = match &req.model_ids {
        Some(ids) => {
            let models: Result<Vec<CanonicalModel>, Error> = ids
                .iter()
                .map(|id| state.repository.require(id).map(|r| r.model))
                .collect();
            match models {
                Ok(models) => {
                    state
                        .reconciler
                        .compare_candidates(&req.api, &models, &req.options)
                        .await
                }
                Err(e) => Err(e),
            }
        }
        None => {
            state
                .reconciler
                .compare_with_source(&req.api, state.repository.as_ref(), &req.options)
                .await
        }
    };

    match outcome {
        Ok(comparison) => Ok(HttpResponse::Ok().json(comparison)),
        Err(e) => Ok(error_response(&e)),
    }
}
