use serde::{Deserialize, Serialize};

use crate::database::Record;
use crate::typedid::{TypedId, TypedIdMarker};

pub mod endpoints;
pub mod manager;
pub use endpoints::*;

pub type SenderId = TypedId<SenderNode>;

/// A sending identity in the rotation pool. Host and credential fields are
/// kept opaque; the dispatcher only needs the id and display name.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct SenderNode {
    pub id: SenderId,
    pub name: String,
    #[serde(flatten)]
    pub settings: Record,
}

impl TypedIdMarker for SenderNode {
    fn tag() -> &'static str {
        "SND"
    }
}
