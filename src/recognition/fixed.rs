//! Offline recognizer that always answers with the same vehicle.

use std::time::Duration;

use async_trait::async_trait;

use super::error::RecognitionError;
use super::result::{RecognitionResult, VehicleAttributes};
use super::submit::Recognizer;
use crate::payload::ImagePayload;

/// Default simulated service latency.
pub const DEFAULT_FIXED_DELAY: Duration = Duration::from_secs(3);

/// Answers every request with a fixed result after a delay.
#[derive(Debug, Clone)]
pub struct FixedRecognizer {
    result: RecognitionResult,
    delay: Duration,
}

impl FixedRecognizer {
    pub fn new(result: RecognitionResult, delay: Duration) -> Self {
        Self { result, delay }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for FixedRecognizer {
    /// A 2023 Tesla Model S after three seconds.
    fn default() -> Self {
        Self::new(
            RecognitionResult {
                make: "Tesla".to_string(),
                model: "Model S".to_string(),
                year: 2023,
                confidence: 0.92,
                vehicle_type: "Electric Sedan".to_string(),
                attributes: VehicleAttributes {
                    engine: Some("Dual Motor".to_string()),
                    horsepower: Some(670),
                    transmission: Some("Single-Speed".to_string()),
                    price: Some("89,990".to_string()),
                    ..VehicleAttributes::default()
                },
            },
            DEFAULT_FIXED_DELAY,
        )
    }
}

#[async_trait]
impl Recognizer for FixedRecognizer {
    async fn recognize(
        &self,
        payload: &ImagePayload,
    ) -> Result<RecognitionResult, RecognitionError> {
        log::debug!("fixed recognizer answering for {}", payload.digest());
        tokio::time::sleep(self.delay).await;
        Ok(self.result.clone())
    }
}
