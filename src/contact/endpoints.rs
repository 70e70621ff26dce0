use actix_web::web::{Data, Json, Path};
use actix_web::{delete, get, post, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::database::Record;
use crate::dispatch::Dispatcher;
use crate::error::Error;

use super::{manager, Contact, ContactId};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImportContactsBody {
    #[serde(default)]
    pub contacts: Vec<Record>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImportedBody {
    pub imported: usize,
}

#[get("/contacts")]
#[tracing::instrument(skip(dispatcher))]
pub async fn get_contacts(dispatcher: Data<Dispatcher>) -> Result<Json<Vec<Contact>>, Error> {
    let contacts = manager::get_contacts(dispatcher.store()).await?;

    Ok(Json(contacts))
}

#[post("/contacts")]
#[tracing::instrument(skip(dispatcher, body))]
pub async fn create_contact(
    dispatcher: Data<Dispatcher>,
    body: Json<Record>,
) -> Result<Json<Contact>, Error> {
    let contact = dispatcher.create_contact(body.into_inner()).await?;

    Ok(Json(contact))
}

#[post("/contacts/import")]
#[tracing::instrument(skip(dispatcher, body))]
pub async fn import_contacts(
    dispatcher: Data<Dispatcher>,
    body: Json<ImportContactsBody>,
) -> Result<Json<ImportedBody>, Error> {
    let imported = dispatcher
        .import_contacts(body.into_inner().contacts)
        .await?;

    Ok(Json(ImportedBody { imported }))
}

#[delete("/contacts/{contact_id}")]
#[tracing::instrument(skip(dispatcher))]
pub async fn delete_contact(
    dispatcher: Data<Dispatcher>,
    params: Path<String>,
) -> Result<HttpResponse, Error> {
    let contact_id = ContactId::from_path(params.into_inner())?;

    dispatcher.delete_contact(contact_id).await?;

    Ok(HttpResponse::NoContent().finish())
}
