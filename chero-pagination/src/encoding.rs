use crate::{api::Error, DiscardIds};

/// Bumped whenever the shape of `DiscardIds` changes. Sessions saved with
/// another version are dropped, not migrated.
pub const ENCODING_VERSION: u32 = 1;

#[derive(serde::Serialize)]
struct EnvelopeRef<'a> {
    version: u32,
    discard: &'a DiscardIds,
}

#[derive(serde::Deserialize)]
struct Envelope {
    version: u32,
    discard: serde_json::Value,
}

impl DiscardIds {
    pub fn encode(&self) -> Vec<u8> {
        serde_json::to_vec(&EnvelopeRef {
            version: ENCODING_VERSION,
            discard: self,
        })
        .expect("serializing discard ids")
    }

    /// Empty input is a session that never recorded anything
    pub fn decode(bytes: &[u8]) -> Result<DiscardIds, Error> {
        if bytes.is_empty() {
            return Ok(DiscardIds::new());
        }
        let envelope: Envelope = serde_json::from_slice(bytes)
            .map_err(|e| Error::CorruptState(format!("parsing envelope: {e}")))?;
        if envelope.version != ENCODING_VERSION {
            return Err(Error::CorruptState(format!(
                "unsupported version {}",
                envelope.version
            )));
        }
        serde_json::from_value(envelope.discard)
            .map_err(|e| Error::CorruptState(format!("parsing discard ids: {e}")))
    }

    /// Like `decode`, but starts over from an empty store on corrupt input:
    /// the user may see some items twice, but can keep browsing
    pub fn decode_or_fresh(bytes: &[u8]) -> DiscardIds {
        match DiscardIds::decode(bytes) {
            Ok(d) => d,
            Err(err) => {
                tracing::warn!(?err, "dropping corrupt discard ids");
                DiscardIds::new()
            }
        }
    }
}
