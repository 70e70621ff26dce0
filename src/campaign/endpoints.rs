use actix_web::web::{Data, Json, Path};
use actix_web::{delete, get, post, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::database::Record;
use crate::dispatch::Dispatcher;
use crate::error::Error;

use super::manager::find_campaign;
use super::{CampaignId, CampaignStatus};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatusBody {
    pub status: CampaignStatus,
}

#[get("/campaigns")]
#[tracing::instrument(skip(dispatcher))]
pub async fn get_campaigns(dispatcher: Data<Dispatcher>) -> Result<Json<Vec<Record>>, Error> {
    let snapshot = dispatcher.snapshot();

    Ok(Json(snapshot.campaigns.clone()))
}

#[get("/campaigns/{campaign_id}")]
#[tracing::instrument(skip(dispatcher))]
pub async fn get_campaign_by_id(
    dispatcher: Data<Dispatcher>,
    params: Path<String>,
) -> Result<Json<Record>, Error> {
    let campaign_id = CampaignId::from_path(params.into_inner())?;

    let campaign = find_campaign(&dispatcher.snapshot().campaigns, &campaign_id)?;

    Ok(Json(campaign))
}

#[post("/campaigns")]
#[tracing::instrument(skip(dispatcher, body))]
pub async fn save_campaign(
    dispatcher: Data<Dispatcher>,
    body: Json<Record>,
) -> Result<Json<Record>, Error> {
    let campaign = dispatcher.save_campaign(body.into_inner()).await?;

    Ok(Json(campaign))
}

#[post("/campaigns/{campaign_id}/status")]
#[tracing::instrument(skip(dispatcher))]
pub async fn set_campaign_status(
    dispatcher: Data<Dispatcher>,
    params: Path<String>,
    body: Json<StatusBody>,
) -> Result<Json<Record>, Error> {
    let campaign_id = CampaignId::from_path(params.into_inner())?;

    let campaign = dispatcher
        .transition_campaign(campaign_id, body.into_inner().status)
        .await?;

    Ok(Json(campaign))
}

#[post("/campaigns/{campaign_id}/reset")]
#[tracing::instrument(skip(dispatcher))]
pub async fn reset_campaign_stats(
    dispatcher: Data<Dispatcher>,
    params: Path<String>,
) -> Result<Json<Record>, Error> {
    let campaign_id = CampaignId::from_path(params.into_inner())?;

    let campaign = dispatcher.reset_campaign_stats(campaign_id).await?;

    Ok(Json(campaign))
}

#[delete("/campaigns/{campaign_id}")]
#[tracing::instrument(skip(dispatcher))]
pub async fn delete_campaign(
    dispatcher: Data<Dispatcher>,
    params: Path<String>,
) -> Result<HttpResponse, Error> {
    let campaign_id = CampaignId::from_path(params.into_inner())?;

    dispatcher.delete_campaign(campaign_id).await?;

    Ok(HttpResponse::NoContent().finish())
}
