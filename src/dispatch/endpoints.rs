use actix_web::post;
use actix_web::web::{Data, Json};
use serde::{Deserialize, Serialize};

use crate::error::Error;

use super::Dispatcher;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TickBody {
    pub processed: u32,
}

#[post("/dispatch/tick")]
#[tracing::instrument(skip(dispatcher))]
pub async fn tick(dispatcher: Data<Dispatcher>) -> Result<Json<TickBody>, Error> {
    let outcome = dispatcher.tick().await?;

    Ok(Json(TickBody {
        processed: outcome.processed(),
    }))
}
