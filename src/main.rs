use accessgate::configuration::get_configuration;
use accessgate::connectors;
use accessgate::startup::run;
use accessgate::telemetry::{get_subscriber, init_subscriber};
use std::net::TcpListener;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = get_subscriber("accessgate".into(), "info".into());
    init_subscriber(subscriber);

    let settings = get_configuration()?;
    let user_service = connectors::init_user_service(&settings.connectors)?;

    let address = format!("{}:{}", settings.app_host, settings.app_port);
    tracing::info!("Start server at {:?}", &address);
    let listener = TcpListener::bind(&address)?;

    run(listener, settings, user_service).await?.await?;
    Ok(())
}
