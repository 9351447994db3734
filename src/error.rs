use std::fmt::{Debug, Display};
use std::io::Error as IoError;

use actix_web::error::{JsonPayloadError, PathError, QueryPayloadError};
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use config::ConfigError;
use derivative::Derivative;
use mongodb::bson::ser::Error as BsonError;
use mongodb::error::Error as DatabaseError;
use serde::{Serialize, Serializer};

use crate::campaign::CampaignId;
use crate::recipient::RecipientId;

#[derive(Debug, Serialize, Derivative)]
#[derivative(PartialEq, Eq)]
#[serde(untagged)]
pub enum Error {
    // 400
    #[serde(serialize_with = "display")]
    InvalidJson(#[derivative(PartialEq = "ignore")] JsonPayloadError),
    #[serde(serialize_with = "display")]
    InvalidPath(#[derivative(PartialEq = "ignore")] PathError),
    #[serde(serialize_with = "display")]
    InvalidQuery(#[derivative(PartialEq = "ignore")] QueryPayloadError),
    InvalidCampaign {
        reason: &'static str,
    },

    // 404
    PathNotFound,
    CampaignNotFound {
        campaign_id: CampaignId,
    },
    RecipientNotFound {
        campaign_id: CampaignId,
        recipient_id: RecipientId,
    },

    // 409
    RecipientAlreadySent {
        campaign_id: CampaignId,
        recipient_id: RecipientId,
    },
    NoNextRecipient {
        campaign_id: CampaignId,
        cursor: usize,
    },
    CampaignHasNoRecipients {
        campaign_id: CampaignId,
    },

    // 503
    TransientWriteFailure {
        recipient_id: RecipientId,
        #[derivative(PartialEq = "ignore")]
        reason: String,
    },

    // 500
    ExistentialState(String),
    #[serde(serialize_with = "display")]
    FailedDatabaseCall(#[derivative(PartialEq = "ignore")] DatabaseError),
    #[serde(serialize_with = "display")]
    FailedToSerializeToBson(#[derivative(PartialEq = "ignore")] BsonError),
    #[serde(serialize_with = "display")]
    IoError(#[derivative(PartialEq = "ignore")] IoError),
    #[serde(serialize_with = "display")]
    InvalidConfig(#[derivative(PartialEq = "ignore")] ConfigError),
}

impl Error {
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::InvalidJson(_) => "E4001000",
            Error::InvalidPath(_) => "E4001001",
            Error::InvalidQuery(_) => "E4001003",
            Error::InvalidCampaign { .. } => "E4001004",
            Error::PathNotFound => "E4041000",
            Error::CampaignNotFound { .. } => "E4041001",
            Error::RecipientNotFound { .. } => "E4041002",
            Error::RecipientAlreadySent { .. } => "E4091000",
            Error::NoNextRecipient { .. } => "E4091001",
            Error::CampaignHasNoRecipients { .. } => "E4091002",
            Error::TransientWriteFailure { .. } => "E5031000",
            Error::ExistentialState(_) => "E5001000",
            Error::FailedDatabaseCall(_) => "E5001001",
            Error::FailedToSerializeToBson(_) => "E5001002",
            Error::IoError(_) => "E5001003",
            Error::InvalidConfig(_) => "E5001004",
        }
    }

    pub fn error_message(&self) -> &'static str {
        match self {
            Error::InvalidJson(_) => "The given json could not be parsed",
            Error::InvalidPath(_) => "The given path could not be parsed",
            Error::InvalidQuery(_) => "The given query could not be parsed",
            Error::InvalidCampaign { .. } => "The given campaign is not valid",
            Error::PathNotFound => "The requested path was not found",
            Error::CampaignNotFound { .. } => "The requested campaign was not found",
            Error::RecipientNotFound { .. } => {
                "The requested recipient was not found in the campaign"
            }
            Error::RecipientAlreadySent { .. } => {
                "The current recipient has already been sent their message"
            }
            Error::NoNextRecipient { .. } => "There is no recipient after the current one",
            Error::CampaignHasNoRecipients { .. } => "The requested campaign has no recipients",
            Error::TransientWriteFailure { .. } => {
                "The recipient status could not be saved, nothing was changed"
            }
            Error::ExistentialState(_) => "The server detected an invalid state",
            Error::FailedDatabaseCall(_) => {
                "An error occurred when communicating with the database"
            }
            Error::FailedToSerializeToBson(_) => {
                "An error occurred when serializing an object to bson"
            }
            Error::IoError(_) => "An error occurred during an I/O operation",
            Error::InvalidConfig(_) => "The server configuration could not be loaded",
        }
    }

    /// Transitions the workflow refuses without touching any state.
    pub fn is_invalid_transition(&self) -> bool {
        matches!(
            self,
            Error::RecipientAlreadySent { .. }
                | Error::NoNextRecipient { .. }
                | Error::CampaignHasNoRecipients { .. }
        )
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidJson(_) => StatusCode::BAD_REQUEST,
            Error::InvalidPath(_) => StatusCode::BAD_REQUEST,
            Error::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            Error::InvalidCampaign { .. } => StatusCode::BAD_REQUEST,
            Error::PathNotFound => StatusCode::NOT_FOUND,
            Error::CampaignNotFound { .. } => StatusCode::NOT_FOUND,
            Error::RecipientNotFound { .. } => StatusCode::NOT_FOUND,
            Error::RecipientAlreadySent { .. } => StatusCode::CONFLICT,
            Error::NoNextRecipient { .. } => StatusCode::CONFLICT,
            Error::CampaignHasNoRecipients { .. } => StatusCode::CONFLICT,
            Error::TransientWriteFailure { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Error::ExistentialState(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::FailedDatabaseCall(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::FailedToSerializeToBson(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::InvalidConfig(_) => StatusCode::INTERNAL_SERVER_ERROR,
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

impl From<BsonError> for Error {
    fn from(error: BsonError) -> Error {
        Error::FailedToSerializeToBson(error)
    }
}

impl From<IoError> for Error {
    fn from(error: IoError) -> Error {
        Error::IoError(error)
    }
}

impl From<ConfigError> for Error {
    fn from(error: ConfigError) -> Error {
        Error::InvalidConfig(error)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::InvalidJson(err) => Some(err),
            Error::InvalidPath(err) => Some(err),
            Error::InvalidQuery(err) => Some(err),
            Error::FailedDatabaseCall(err) => Some(err),
            Error::FailedToSerializeToBson(err) => Some(err),
            Error::IoError(err) => Some(err),
            Error::InvalidConfig(err) => Some(err),
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
