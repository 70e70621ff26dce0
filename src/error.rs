use std::fmt::{Debug, Display};
use std::io::Error as IoError;

use actix_web::error::{JsonPayloadError, PathError};
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use derivative::Derivative;
use mongodb::error::Error as DatabaseError;
use serde::{Serialize, Serializer};
use serde_json::Error as JsonError;
use toml::de::Error as TomlError;

use crate::campaign::{CampaignId, CampaignStatus};
use crate::contact::ContactId;
use crate::database::Collection;
use crate::sender::SenderId;

#[derive(Debug, Serialize, Derivative)]
#[derivative(PartialEq, Eq)]
#[serde(untagged)]
pub enum Error {
    // 400
    #[serde(serialize_with = "display")]
    InvalidJson(#[derivative(PartialEq = "ignore")] JsonPayloadError),
    #[serde(serialize_with = "display")]
    InvalidPath(#[derivative(PartialEq = "ignore")] PathError),
    InvalidId {
        id: String,
    },
    MissingField {
        field: &'static str,
    },
    InvalidField {
        field: &'static str,
        #[serde(serialize_with = "display")]
        #[derivative(PartialEq = "ignore")]
        reason: JsonError,
    },
    MalformedRecord {
        #[serde(serialize_with = "display")]
        #[derivative(PartialEq = "ignore")]
        reason: JsonError,
    },

    // 404
    PathDoesNotExist,
    CampaignDoesNotExist {
        campaign_id: CampaignId,
    },
    SenderDoesNotExist {
        sender_id: SenderId,
    },
    ContactDoesNotExist {
        contact_id: ContactId,
    },

    // 409
    IllegalStatusTransition {
        campaign_id: CampaignId,
        from: CampaignStatus,
        to: CampaignStatus,
    },

    // 500
    ExistentialState(String),
    InvalidConfig(String),
    DispatcherUnavailable,
    StoreUnavailable {
        collection: Collection,
    },
    CorruptCollection {
        collection: Collection,
        #[serde(serialize_with = "display")]
        #[derivative(PartialEq = "ignore")]
        reason: JsonError,
    },
    #[serde(serialize_with = "display")]
    FailedDatabaseCall(#[derivative(PartialEq = "ignore")] DatabaseError),
    #[serde(serialize_with = "display")]
    FailedToSerialize(#[derivative(PartialEq = "ignore")] JsonError),
    #[serde(serialize_with = "display")]
    IoError(#[derivative(PartialEq = "ignore")] IoError),
}

impl Error {
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::InvalidJson(_) => "E4001000",
            Error::InvalidPath(_) => "E4001001",
            Error::InvalidId { .. } => "E4001002",
            Error::MissingField { .. } => "E4001003",
            Error::InvalidField { .. } => "E4001004",
            Error::MalformedRecord { .. } => "E4001005",
            Error::PathDoesNotExist => "E4041000",
            Error::CampaignDoesNotExist { .. } => "E4041001",
            Error::SenderDoesNotExist { .. } => "E4041002",
            Error::ContactDoesNotExist { .. } => "E4041003",
            Error::IllegalStatusTransition { .. } => "E4091000",
            Error::ExistentialState(_) => "E5001000",
            Error::InvalidConfig(_) => "E5001001",
            Error::DispatcherUnavailable => "E5001002",
            Error::StoreUnavailable { .. } => "E5001003",
            Error::CorruptCollection { .. } => "E5001004",
            Error::FailedDatabaseCall(_) => "E5001005",
            Error::FailedToSerialize(_) => "E5001006",
            Error::IoError(_) => "E5001007",
        }
    }

    pub fn error_message(&self) -> &'static str {
        match self {
            Error::InvalidJson(_) => "The given json could not be parsed",
            Error::InvalidPath(_) => "The given path could not be parsed",
            Error::InvalidId { .. } => "The given identifier is not valid",
            Error::MissingField { .. } => "A required field was missing or empty",
            Error::InvalidField { .. } => "A field had an unexpected value",
            Error::MalformedRecord { .. } => "The resulting record is not well formed",
            Error::PathDoesNotExist => "The requested path does not exist",
            Error::CampaignDoesNotExist { .. } => "The requested campaign does not exist",
            Error::SenderDoesNotExist { .. } => "The requested sender does not exist",
            Error::ContactDoesNotExist { .. } => "The requested contact does not exist",
            Error::IllegalStatusTransition { .. } => {
                "The campaign cannot move from its current status to the requested one"
            }
            Error::ExistentialState(_) => "The server detected an invalid state",
            Error::InvalidConfig(_) => "The server configuration is invalid",
            Error::DispatcherUnavailable => "The dispatch worker is not running",
            Error::StoreUnavailable { .. } => "The record store could not be reached",
            Error::CorruptCollection { .. } => "A stored collection could not be parsed",
            Error::FailedDatabaseCall(_) => {
                "An error occurred when communicating with the database"
            }
            Error::FailedToSerialize(_) => "An error occurred when serializing a record",
            Error::IoError(_) => "An error occurred during an I/O operation",
        }
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidJson(_) => StatusCode::BAD_REQUEST,
            Error::InvalidPath(_) => StatusCode::BAD_REQUEST,
            Error::InvalidId { .. } => StatusCode::BAD_REQUEST,
            Error::MissingField { .. } => StatusCode::BAD_REQUEST,
            Error::InvalidField { .. } => StatusCode::BAD_REQUEST,
            Error::MalformedRecord { .. } => StatusCode::BAD_REQUEST,
            Error::PathDoesNotExist => StatusCode::NOT_FOUND,
            Error::CampaignDoesNotExist { .. } => StatusCode::NOT_FOUND,
            Error::SenderDoesNotExist { .. } => StatusCode::NOT_FOUND,
            Error::ContactDoesNotExist { .. } => StatusCode::NOT_FOUND,
            Error::IllegalStatusTransition { .. } => StatusCode::CONFLICT,
            Error::ExistentialState(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::InvalidConfig(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::DispatcherUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
            Error::StoreUnavailable { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::CorruptCollection { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::FailedDatabaseCall(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::FailedToSerialize(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        #[derive(Serialize)]
        struct Dummy<'a> {
            error_code: &'static str,
            error_message: &'static str,
            error_meta: &'a Error,
        }

        HttpResponse::build(self.status_code()).json(&Dummy {
            error_code: self.error_code(),
            error_message: self.error_message(),
            error_meta: self,
        })
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        Debug::fmt(self, f)
    }
}

impl From<DatabaseError> for Error {
    fn from(error: DatabaseError) -> Error {
        Error::FailedDatabaseCall(error)
    }
}

impl From<JsonError> for Error {
    fn from(error: JsonError) -> Error {
        Error::FailedToSerialize(error)
    }
}

impl From<IoError> for Error {
    fn from(error: IoError) -> Error {
        Error::IoError(error)
    }
}

impl From<TomlError> for Error {
    fn from(error: TomlError) -> Error {
        Error::InvalidConfig(error.to_string())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::InvalidJson(err) => Some(err),
            Error::InvalidPath(err) => Some(err),
            Error::InvalidField { reason, .. } => Some(reason),
            Error::MalformedRecord { reason } => Some(reason),
            Error::CorruptCollection { reason, .. } => Some(reason),
            Error::FailedDatabaseCall(err) => Some(err),
            Error::FailedToSerialize(err) => Some(err),
            Error::IoError(err) => Some(err),
            _ => None,
        }
    }
}

fn display<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Display,
    S: Serializer,
{
    serializer.collect_str(value)
}
