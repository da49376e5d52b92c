use anyhow::{anyhow, Context};
use serde_json::json;

#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Unknown error: {0}")]
    Unknown(String),

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Null byte in string is not allowed {0:?}")]
    NullByteInString(String),

    #[error("Empty {0} identifier")]
    EmptyIdentifier(String),

    #[error("No such actor {0:?}")]
    NoSuchActor(String),

    #[error("No such section {0:?}")]
    NoSuchSection(String),

    #[error("No such thread {0:?}")]
    NoSuchThread(String),

    #[error("Delivery does not match the shape of view {0}")]
    ViewMismatch(String),

    #[error("Corrupt session state: {0}")]
    CorruptState(String),
}

impl Error {
    pub fn status_code(&self) -> http::StatusCode {
        use http::StatusCode;
        match self {
            Error::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::PermissionDenied => StatusCode::FORBIDDEN,
            Error::NullByteInString(_) => StatusCode::BAD_REQUEST,
            Error::EmptyIdentifier(_) => StatusCode::BAD_REQUEST,
            Error::NoSuchActor(_) => StatusCode::NOT_FOUND,
            Error::NoSuchSection(_) => StatusCode::NOT_FOUND,
            Error::NoSuchThread(_) => StatusCode::NOT_FOUND,
            Error::ViewMismatch(_) => StatusCode::BAD_REQUEST,
            Error::CorruptState(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn contents(&self) -> Vec<u8> {
        serde_json::to_vec(&match self {
            Error::Unknown(msg) => json!({
                "message": msg,
                "type": "unknown",
            }),
            Error::PermissionDenied => json!({
                "message": "permission denied",
                "type": "permission-denied",
            }),
            Error::NullByteInString(s) => json!({
                "message": "there was a null byte in argument string",
                "type": "null-byte",
                "string": s,
            }),
            Error::EmptyIdentifier(kind) => json!({
                "message": "an identifier was empty",
                "type": "empty-identifier",
                "kind": kind,
            }),
            Error::NoSuchActor(id) => json!({
                "message": "no such actor",
                "type": "no-such-actor",
                "id": id,
            }),
            Error::NoSuchSection(name) => json!({
                "message": "no such section",
                "type": "no-such-section",
                "name": name,
            }),
            Error::NoSuchThread(id) => json!({
                "message": "no such thread",
                "type": "no-such-thread",
                "id": id,
            }),
            Error::ViewMismatch(view) => json!({
                "message": "delivered items do not match the feed view",
                "type": "view-mismatch",
                "view": view,
            }),
            Error::CorruptState(msg) => json!({
                "message": msg,
                "type": "corrupt-state",
            }),
        })
        .expect("serializing error contents")
    }

    pub fn parse(body: &[u8]) -> anyhow::Result<Error> {
        let data: serde_json::Value =
            serde_json::from_slice(body).context("parsing error contents")?;
        let field = |name: &str| -> anyhow::Result<String> {
            data.get(name)
                .and_then(|f| f.as_str())
                .map(String::from)
                .ok_or_else(|| anyhow!("error contents is missing the {name:?} field"))
        };
        Ok(
            match data
                .get("type")
                .and_then(|t| t.as_str())
                .ok_or_else(|| anyhow!("error type is not a string"))?
            {
                "unknown" => Error::Unknown(field("message").unwrap_or_default()),
                "permission-denied" => Error::PermissionDenied,
                "null-byte" => Error::NullByteInString(field("string")?),
                "empty-identifier" => Error::EmptyIdentifier(field("kind")?),
                "no-such-actor" => Error::NoSuchActor(field("id")?),
                "no-such-section" => Error::NoSuchSection(field("name")?),
                "no-such-thread" => Error::NoSuchThread(field("id")?),
                "view-mismatch" => Error::ViewMismatch(field("view")?),
                "corrupt-state" => Error::CorruptState(field("message")?),
                _ => return Err(anyhow!("error contents has unknown type")),
            },
        )
    }
}
