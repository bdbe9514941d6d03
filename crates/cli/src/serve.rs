//! HTTP host for the interceptor.
//!
//! The interceptor runs as middleware in front of a fallback that serves an
//! optional public directory, so a pass-through really does reach "the next
//! handler".

use axum::Router;
use axum::extract::{Request, State};
use axum::http::{StatusCode, Uri, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use getsmart_api::{CacheInspector, Outcome, ScriptRequest, join_request_path};
use getsmart_core::{InterceptorConfig, ScriptInterceptor};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

pub fn run(
    config: InterceptorConfig,
    public: Option<PathBuf>,
    addr: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let interceptor = getsmart_runtime::build_default_interceptor(config)?;
    rt.block_on(serve(interceptor, public, addr))
}

async fn serve(
    interceptor: Arc<ScriptInterceptor>,
    public: Option<PathBuf>,
    addr: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = interceptor.config();
    info!(
        "Serving scripts from {} (production: {}, compress: {})",
        config.src.display(),
        config.is_production,
        config.compress
    );
    if config.is_production {
        info!("Production mode: restart the server after deploying new scripts");
    }
    if let Some(dest) = &config.dest {
        info!("Built scripts are written to {}", dest.display());
    }

    let app = router(interceptor.clone(), public);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("GetSmart listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    let stats = interceptor.cache().stats();
    info!(
        "Shutting down: {} cached ({} files, {} sources, {} bundles), {} hits, {} stale, {} misses",
        stats.entries,
        stats.single_files,
        stats.alternate_sources,
        stats.bundles,
        stats.hits,
        stats.stale,
        stats.misses
    );
    Ok(())
}

pub fn router(interceptor: Arc<ScriptInterceptor>, public: Option<PathBuf>) -> Router {
    Router::new()
        .fallback(serve_public)
        .with_state(public.map(Arc::new))
        .layer(middleware::from_fn_with_state(interceptor, intercept))
}

async fn intercept(
    State(interceptor): State<Arc<ScriptInterceptor>>,
    req: Request,
    next: Next,
) -> Response {
    let request = ScriptRequest::new(req.method().as_str(), req.uri().path());
    if !interceptor.accepts(&request.method, request.path_without_query()) {
        return next.run(req).await;
    }

    let path = request.path.clone();
    let worker = interceptor.clone();
    let outcome = tokio::task::spawn_blocking(move || worker.handle(&request)).await;

    match outcome {
        Ok(Ok(outcome)) => match outcome_response(outcome) {
            Some(response) => response,
            None => next.run(req).await,
        },
        Ok(Err(e)) => {
            error!("GetSmart failed for {}: {}", path, e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
        Err(e) => {
            error!("GetSmart worker for {} did not finish: {}", path, e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// `None` for a pass-through
pub fn outcome_response(outcome: Outcome) -> Option<Response> {
    match outcome {
        Outcome::Serve(script) => {
            let status = StatusCode::from_u16(script.status).unwrap_or(StatusCode::OK);
            Some(
                (
                    status,
                    [(header::CONTENT_TYPE, script.content_type)],
                    script.body.to_string(),
                )
                    .into_response(),
            )
        }
        Outcome::NotFound => Some(StatusCode::NOT_FOUND.into_response()),
        Outcome::PassThrough => None,
    }
}

async fn serve_public(State(public): State<Option<Arc<PathBuf>>>, uri: Uri) -> Response {
    let Some(root) = public else {
        return StatusCode::NOT_FOUND.into_response();
    };
    if uri.path().split('/').any(|segment| segment == "..") {
        return StatusCode::NOT_FOUND.into_response();
    }

    let path = join_request_path(&root, uri.path());
    match tokio::fs::read(&path).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, content_type_for(&path))], bytes).into_response(),
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("js") => "application/javascript",
        Some("css") => "text/css",
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("json") => "application/json",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}
