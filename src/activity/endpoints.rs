use actix_web::get;
use actix_web::web::{Data, Json};

use crate::dispatch::Dispatcher;
use crate::error::Error;

use super::LogEntry;

/// The most recent deliveries, newest first.
#[get("/logs")]
#[tracing::instrument(skip(dispatcher))]
pub async fn get_logs(dispatcher: Data<Dispatcher>) -> Result<Json<Vec<LogEntry>>, Error> {
    let snapshot = dispatcher.snapshot();

    Ok(Json(snapshot.logs.clone()))
}
