//! Native HTTP server: actix-web in front of the same handlers the Spin
//! component runs.

use std::net::SocketAddr;
use std::sync::Arc;

use actix_web::dev::Server;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use tracing::{error, info};

use crate::config::MAX_REQUEST_BYTES;
use crate::context::AppContext;
use crate::routes::handle_request;

mod adapter {
    use actix_web::HttpRequest;
    use spin_sdk::http::{Method, Request, Response};

    pub fn actix_to_spin_request(req: &HttpRequest, body: actix_web::web::Bytes) -> Request {
        let method = match req.method().as_str() {
            "GET" => Method::Get,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "DELETE" => Method::Delete,
            "HEAD" => Method::Head,
            "OPTIONS" => Method::Options,
            "PATCH" => Method::Patch,
            _ => Method::Get,
        };

        let mut builder = Request::builder();
        builder.method(method).uri(req.uri().to_string());
        for (name, value) in req.headers() {
            if let Ok(value) = value.to_str() {
                builder.header(name.as_str(), value);
            }
        }
        builder.body(body.to_vec()).build()
    }

    pub fn spin_to_actix_response(spin_resp: Response) -> actix_web::HttpResponse {
        let status = actix_web::http::StatusCode::from_u16(*spin_resp.status())
            .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR);

        let mut response = actix_web::HttpResponse::build(status);
        for (name, value) in spin_resp.headers() {
            if let Some(value) = value.as_str() {
                response.insert_header((name.to_string(), value.to_string()));
            }
        }
        response.body(spin_resp.body().to_vec())
    }
}

/// Bind the server without starting it. Returns the bound addresses, which
/// matters when binding port 0.
pub fn bind_server(ctx: Arc<AppContext>, bind: &str) -> std::io::Result<(Server, Vec<SocketAddr>)> {
    let data = web::Data::from(ctx);
    let server = HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .app_data(web::PayloadConfig::new(MAX_REQUEST_BYTES))
            .default_service(web::route().to(handle_all))
    })
    .bind(bind)?;

    let addrs = server.addrs();
    Ok((server.run(), addrs))
}

pub async fn run(ctx: Arc<AppContext>, bind: &str) -> std::io::Result<()> {
    let (server, addrs) = bind_server(ctx, bind)?;
    for addr in &addrs {
        info!("Server listening on http://{}", addr);
    }
    server.await
}

async fn handle_all(ctx: web::Data<AppContext>, req: HttpRequest, body: web::Bytes) -> HttpResponse {
    let spin_req = adapter::actix_to_spin_request(&req, body);
    let ctx = ctx.into_inner();

    // Handlers block on storage and the generator, keep them off the reactor.
    match web::block(move || handle_request(&ctx, &spin_req)).await {
        Ok(spin_resp) => adapter::spin_to_actix_response(spin_resp),
        Err(e) => {
            error!(error = %e, "handler panicked");
            HttpResponse::InternalServerError()
                .json(serde_json::json!({"success": false, "message": "An internal error occurred"}))
        }
    }
}
