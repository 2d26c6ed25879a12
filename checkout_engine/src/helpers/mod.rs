mod clock;
mod event_signature;

pub use clock::{Clock, SystemClock};
pub use event_signature::{
    sign_event_payload,
    verify_event_signature,
    EventSignatureError,
    SignatureHeader,
    SIGNATURE_TOLERANCE_SECS,
};
