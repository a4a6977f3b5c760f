//! Vehicle recognition: HTTP client, result schema and cancellable submission.
//!
//! Submissions never retry on their own. A failed or cancelled attempt has to
//! be started again by the caller.

mod client;
mod error;
mod fixed;
mod result;
mod submit;

pub use client::{
    RecognitionClient, API_KEY_ENV, DEFAULT_BASE_URL, DEFAULT_TIMEOUT, RECOGNIZE_PATH,
};
pub use error::RecognitionError;
pub use fixed::{FixedRecognizer, DEFAULT_FIXED_DELAY};
pub use result::{parse_response, ConfidenceLevel, RecognitionResult, VehicleAttributes};
pub use submit::{submit, Recognizer};
