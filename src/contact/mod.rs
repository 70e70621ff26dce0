use serde::{Deserialize, Serialize};

use crate::database::Record;
use crate::typedid::{TypedId, TypedIdMarker};

pub mod endpoints;
pub mod manager;
pub use endpoints::*;

pub type ContactId = TypedId<Contact>;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Contact {
    pub id: ContactId,
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub status: ContactStatus,
    #[serde(flatten)]
    pub extra: Record,
}

impl TypedIdMarker for Contact {
    fn tag() -> &'static str {
        "CNT"
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactStatus {
    #[default]
    Active,
    Unsubscribed,
    Bounced,
}
