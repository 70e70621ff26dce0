use actix_web::get;
use actix_web::web::{Data, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::dispatch::Dispatcher;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PingBody {
    pub message: String,
    pub timestamp: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusBody {
    pub online: bool,
    pub storage_writable: bool,
    pub version: String,
}

#[get("/ping")]
pub async fn ping() -> Json<PingBody> {
    Json(PingBody {
        message: "pong".to_string(),
        timestamp: Utc::now().timestamp(),
    })
}

#[get("/status")]
#[tracing::instrument(skip(dispatcher))]
pub async fn get_status(dispatcher: Data<Dispatcher>) -> Json<StatusBody> {
    let storage_writable = match dispatcher.store().ping().await {
        Ok(()) => true,
        Err(err) => {
            warn!("store health check failed: {}", err);
            false
        }
    };

    Json(StatusBody {
        online: true,
        storage_writable,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
