use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

use omnisend::config::Config;
use omnisend::error::Error;

#[actix_web::main]
async fn main() -> Result<(), Error> {
    let config = Config::load()?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .map_err(|err| Error::InvalidConfig(format!("invalid log filter: {}", err)))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::NEW)
        .compact()
        .init();

    omnisend::run(config).await
}
