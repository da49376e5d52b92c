mod encoding;
pub use encoding::ENCODING_VERSION;

mod format;

mod record;

mod store;
pub use store::{Delivery, DiscardIds, DiscardKey, DiscardSet};

pub mod api {
    pub use chero_api::*;
}
