use crate::configuration::Settings;
use crate::connectors::UserServiceConnector;
use crate::routes;
use crate::services::{AccessContextFactory, SessionRegistry};
use actix_cors::Cors;
use actix_web::{dev::Server, error, http, web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;
use tracing_actix_web::TracingLogger;

pub async fn run(
    listener: TcpListener,
    settings: Settings,
    user_service: Arc<dyn UserServiceConnector>,
) -> Result<Server, std::io::Error> {
    let guard = settings
        .access
        .route_guard()
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidInput, err))?;
    tracing::info!(routes = guard.table().len(), "Route table loaded");

    let registry = web::Data::new(
        SessionRegistry::new(AccessContextFactory {
            connector: user_service,
            guard: Arc::new(guard),
            gate_config: settings.access.gate_config(),
            resolve_policy: settings.access.resolve_policy,
        })
        .with_limits(settings.access.registry_limits()),
    );
    start_idle_sweeper(registry.clone(), settings.access.sweep_interval());

    let json_config = web::JsonConfig::default().error_handler(|err, _req| {
        let msg: String = match err {
            error::JsonPayloadError::Deserialize(err) => format!(
                "{{\"kind\":\"deserialize\",\"line\":{}, \"column\":{}, \"msg\":\"{}\"}}",
                err.line(),
                err.column(),
                err
            ),
            _ => format!("{{\"kind\":\"other\",\"msg\":\"{}\"}}", err),
        };
        error::InternalError::new(msg, http::StatusCode::BAD_REQUEST).into()
    });

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .wrap(Cors::permissive())
            .service(web::scope("/health_check").service(routes::health_check))
            .service(
                web::scope("/session")
                    .service(routes::session::establish_handler)
                    .service(routes::session::sign_out_handler),
            )
            .service(
                web::scope("/access")
                    .service(routes::access::snapshot_handler)
                    .service(routes::access::refresh_handler)
                    .service(routes::access::check_handler)
                    .service(routes::access::route_handler)
                    .service(routes::access::features_handler),
            )
            .service(
                web::scope("/onboarding")
                    .service(routes::onboarding::navigate_handler)
                    .service(routes::onboarding::state_handler),
            )
            .service(
                web::scope("/tenant")
                    .service(routes::tenant::memberships_handler)
                    .service(routes::tenant::repair_handler),
            )
            .app_data(json_config.clone())
            .app_data(registry.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}

fn start_idle_sweeper(registry: web::Data<SessionRegistry>, sweep_interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        loop {
            ticker.tick().await;
            let expired = registry.sweep_idle().await;
            tracing::debug!(expired, remaining = registry.len(), "Idle session sweep");
        }
    });
}
