use std::time::Duration;

use actix_web::web::{self, Data, JsonConfig, PathConfig, ServiceConfig};
use actix_web::{App, HttpServer, ResponseError};
use tracing::info;
use tracing_actix_web::TracingLogger;

pub mod activity;
pub mod campaign;
pub mod config;
pub mod contact;
pub mod database;
pub mod dispatch;
pub mod error;
pub mod seed;
pub mod sender;
pub mod status;
pub mod typedid;

use config::Config;
use dispatch::{Dispatcher, Engine};
use error::Error;

/// Registers every endpoint along with the JSON error formatting. The
/// caller provides the [`Dispatcher`] as app data.
pub fn configure(cfg: &mut ServiceConfig) {
    cfg.app_data(JsonConfig::default().error_handler(|err, _req| {
        // format json errors with custom format
        Error::InvalidJson(err).into()
    }))
    .app_data(PathConfig::default().error_handler(|err, _req| {
        // format path errors with custom format
        Error::InvalidPath(err).into()
    }))
    .service(dispatch::endpoints::tick)
    .service(activity::endpoints::get_logs)
    .service(campaign::endpoints::get_campaigns)
    .service(campaign::endpoints::get_campaign_by_id)
    .service(campaign::endpoints::save_campaign)
    .service(campaign::endpoints::set_campaign_status)
    .service(campaign::endpoints::reset_campaign_stats)
    .service(campaign::endpoints::delete_campaign)
    .service(sender::endpoints::get_senders)
    .service(sender::endpoints::create_sender)
    .service(sender::endpoints::delete_sender)
    .service(contact::endpoints::get_contacts)
    .service(contact::endpoints::create_contact)
    .service(contact::endpoints::import_contacts)
    .service(contact::endpoints::delete_contact)
    .service(status::ping)
    .service(status::get_status)
    .default_service(web::to(|| async { Error::PathDoesNotExist.error_response() }));
}

pub async fn run(config: Config) -> Result<(), Error> {
    config.validate()?;

    let store = database::open(&config.storage).await?;
    if config.seed {
        seed::seed(&*store).await?;
    }

    let engine = Engine::new(store, &config.dispatch)?;
    let dispatcher = Dispatcher::start(engine).await?;

    let autotick = config
        .dispatch
        .autotick_ms
        .map(|ms| dispatch::spawn_autotick(dispatcher.clone(), Duration::from_millis(ms)));

    info!("listening on {}", config.server.bind_address);
    let dispatcher = Data::new(dispatcher);
    let result = HttpServer::new(move || {
        App::new()
            .app_data(dispatcher.clone())
            .wrap(TracingLogger::default())
            .configure(configure)
    })
    .bind(&config.server.bind_address)?
    .run()
    .await;

    if let Some(autotick) = autotick {
        autotick.abort();
    }

    Ok(result?)
}
