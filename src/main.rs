use actix_web::{get, middleware, web::Data, App, HttpRequest, HttpResponse, HttpServer, Responder};
pub use apimachinery::{self, telemetry, Config, State};
use prometheus::{Encoder, TextEncoder};
use tracing::*;

#[get("/metrics")]
async fn metrics(c: Data<State>, _req: HttpRequest) -> impl Responder {
    let metrics = c.metrics();
    let encoder = TextEncoder::new();
    let mut buffer = vec![];
    match encoder.encode(&metrics, &mut buffer) {
        Ok(()) => HttpResponse::Ok().body(buffer),
        Err(e) => {
            error!("failed to encode metrics: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[get("/health")]
async fn health(_: HttpRequest) -> impl Responder {
    HttpResponse::Ok().json("healthy")
}

#[get("/")]
async fn index(c: Data<State>, _req: HttpRequest) -> impl Responder {
    let d = c.diagnostics().await;
    HttpResponse::Ok().json(&d)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init().await?;
    let config = Config::from_env()?;
    info!(kinds = ?config.kinds, bind = %config.bind_address, "starting phase sync");

    // Initialize Kubernetes controller state
    let state = State::new(&config);

    // Start web server
    let server = HttpServer::new({
        let state = state.clone();
        move || {
            App::new()
                .app_data(Data::new(state.clone()))
                .wrap(middleware::Logger::default().exclude("/health"))
                .service(index)
                .service(health)
                .service(metrics)
        }
    })
    .bind(&config.bind_address)?
    .shutdown_timeout(config.shutdown_timeout_seconds)
    .run();
    let handle = server.handle();

    // A failing controller takes the web server down with it
    let controller = async move {
        let result = apimachinery::run(state, config).await;
        if result.is_err() {
            handle.stop(true).await;
        }
        result
    };

    // Both runtimes implements graceful shutdown, so poll until both are done
    let (controller, server) = tokio::join!(controller, server);
    server?;
    controller?;
    Ok(())
}
