use actix_web::web::{Data, Json, Path};
use actix_web::{delete, get, post, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::database::Record;
use crate::dispatch::Dispatcher;
use crate::error::Error;

use super::{manager, SenderId, SenderNode};

/// Fields that are accepted on create but never sent back out.
const SECRET_FIELDS: &[&str] = &["pass", "password"];

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SenderBody {
    pub id: SenderId,
    pub name: String,
    #[serde(flatten)]
    pub settings: Record,
}

impl SenderBody {
    pub fn render(sender: SenderNode) -> SenderBody {
        let mut settings = sender.settings;
        for field in SECRET_FIELDS {
            settings.remove(*field);
        }

        SenderBody {
            id: sender.id,
            name: sender.name,
            settings,
        }
    }
}

#[get("/senders")]
#[tracing::instrument(skip(dispatcher))]
pub async fn get_senders(dispatcher: Data<Dispatcher>) -> Result<Json<Vec<SenderBody>>, Error> {
    let senders = manager::get_senders(dispatcher.store()).await?;

    Ok(Json(senders.into_iter().map(SenderBody::render).collect()))
}

#[post("/senders")]
#[tracing::instrument(skip(dispatcher, body))]
pub async fn create_sender(
    dispatcher: Data<Dispatcher>,
    body: Json<Record>,
) -> Result<Json<SenderBody>, Error> {
    let sender = dispatcher.create_sender(body.into_inner()).await?;

    Ok(Json(SenderBody::render(sender)))
}

#[delete("/senders/{sender_id}")]
#[tracing::instrument(skip(dispatcher))]
pub async fn delete_sender(
    dispatcher: Data<Dispatcher>,
    params: Path<String>,
) -> Result<HttpResponse, Error> {
    let sender_id = SenderId::from_path(params.into_inner())?;

    dispatcher.delete_sender(sender_id).await?;

    Ok(HttpResponse::NoContent().finish())
}
