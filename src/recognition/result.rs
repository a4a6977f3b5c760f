//! Recognition result and response schema validation.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::RecognitionError;

/// Vehicle identified by the recognition service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecognitionResult {
    pub make: String,
    pub model: String,
    pub year: i32,
    /// 0.0 to 1.0
    pub confidence: f64,
    #[serde(rename = "type")]
    pub vehicle_type: String,
    #[serde(flatten)]
    pub attributes: VehicleAttributes,
}

/// Optional attributes. Unknown keys from the service land in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VehicleAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub horsepower: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transmission: Option<String>,
    /// Estimated price as the service formats it, e.g. `"89,990"`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Coarse confidence band for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceLevel {
    /// 80% and up
    High,
    /// 60% to 80%
    Medium,
    Low,
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfidenceLevel::High => write!(f, "high"),
            ConfidenceLevel::Medium => write!(f, "medium"),
            ConfidenceLevel::Low => write!(f, "low"),
        }
    }
}

impl RecognitionResult {
    pub fn confidence_level(&self) -> ConfidenceLevel {
        if self.confidence >= 0.8 {
            ConfidenceLevel::High
        } else if self.confidence >= 0.6 {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }

    /// Confidence as a rounded percentage.
    pub fn confidence_percent(&self) -> u8 {
        (self.confidence * 100.0).round().clamp(0.0, 100.0) as u8
    }

    /// `"2023 Tesla Model S"`
    pub fn title(&self) -> String {
        format!("{} {} {}", self.year, self.make, self.model)
    }

    /// Labelled attributes that are present, in display order.
    pub fn specs(&self) -> Vec<(&'static str, String)> {
        let attrs = &self.attributes;
        let mut specs = vec![("Type", self.vehicle_type.clone())];
        if let Some(engine) = &attrs.engine {
            specs.push(("Engine", engine.clone()));
        }
        if let Some(hp) = attrs.horsepower {
            specs.push(("Power", format!("{} HP", hp)));
        }
        if let Some(transmission) = &attrs.transmission {
            specs.push(("Transmission", transmission.clone()));
        }
        specs
    }
}

/// Response body as the service sends it. Everything optional so that
/// missing fields become `InvalidResponse` rather than a serde message.
#[derive(Debug, Deserialize)]
struct RecognitionResponse {
    make: Option<String>,
    model: Option<String>,
    year: Option<i64>,
    confidence: Option<f64>,
    #[serde(rename = "type")]
    vehicle_type: Option<String>,
    engine: Option<String>,
    horsepower: Option<u32>,
    transmission: Option<String>,
    price: Option<serde_json::Value>,
    #[serde(flatten)]
    extra: BTreeMap<String, serde_json::Value>,
}

/// Parse and validate a service response body.
pub fn parse_response(body: &[u8]) -> Result<RecognitionResult, RecognitionError> {
    let response: RecognitionResponse = serde_json::from_slice(body)
        .map_err(|e| RecognitionError::InvalidResponse(e.to_string()))?;
    response.validate()
}

fn required_text(value: Option<String>, field: &str) -> Result<String, RecognitionError> {
    match value {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(RecognitionError::InvalidResponse(format!(
            "missing field `{}`",
            field
        ))),
    }
}

impl RecognitionResponse {
    fn validate(self) -> Result<RecognitionResult, RecognitionError> {
        let make = required_text(self.make, "make")?;
        let model = required_text(self.model, "model")?;
        let vehicle_type = required_text(self.vehicle_type, "type")?;

        let year = self
            .year
            .ok_or_else(|| RecognitionError::InvalidResponse("missing field `year`".to_string()))?;
        let year = i32::try_from(year).map_err(|_| {
            RecognitionError::InvalidResponse(format!("year {} out of range", year))
        })?;

        let confidence = self.confidence.ok_or_else(|| {
            RecognitionError::InvalidResponse("missing field `confidence`".to_string())
        })?;
        if !(0.0..=1.0).contains(&confidence) {
            return Err(RecognitionError::InvalidResponse(format!(
                "confidence {} outside [0, 1]",
                confidence
            )));
        }

        let price = match self.price {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(s)) => Some(s),
            Some(serde_json::Value::Number(n)) => Some(n.to_string()),
            Some(other) => {
                return Err(RecognitionError::InvalidResponse(format!(
                    "price must be a string or number, got {}",
                    other
                )))
            }
        };

        Ok(RecognitionResult {
            make,
            model,
            year,
            confidence,
            vehicle_type,
            attributes: VehicleAttributes {
                engine: self.engine,
                horsepower: self.horsepower,
                transmission: self.transmission,
                price,
                extra: self.extra,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> Result<RecognitionResult, RecognitionError> {
        parse_response(value.to_string().as_bytes())
    }

    fn tesla() -> serde_json::Value {
        json!({
            "make": "Tesla",
            "model": "Model S",
            "year": 2023,
            "confidence": 0.92,
            "type": "Electric Sedan"
        })
    }

    #[test]
    fn test_parse_required_fields() {
        let result = parse(tesla()).unwrap();
        assert_eq!(result.make, "Tesla");
        assert_eq!(result.model, "Model S");
        assert_eq!(result.year, 2023);
        assert_eq!(result.confidence, 0.92);
        assert_eq!(result.vehicle_type, "Electric Sedan");
        assert_eq!(result.attributes, VehicleAttributes::default());
    }

    #[test]
    fn test_parse_optional_and_unknown_attributes() {
        let mut body = tesla();
        body["engine"] = json!("Dual Motor");
        body["horsepower"] = json!(670);
        body["transmission"] = json!("Single-Speed");
        body["price"] = json!(89990);
        body["color"] = json!("red");

        let result = parse(body).unwrap();
        assert_eq!(result.attributes.engine.as_deref(), Some("Dual Motor"));
        assert_eq!(result.attributes.horsepower, Some(670));
        assert_eq!(result.attributes.price.as_deref(), Some("89990"));
        assert_eq!(result.attributes.extra.get("color"), Some(&json!("red")));
    }

    #[test]
    fn test_missing_make_is_invalid() {
        let mut body = tesla();
        body.as_object_mut().unwrap().remove("make");
        assert_eq!(
            parse(body),
            Err(RecognitionError::InvalidResponse(
                "missing field `make`".to_string()
            ))
        );
    }

    #[test]
    fn test_blank_model_is_invalid() {
        let mut body = tesla();
        body["model"] = json!("   ");
        assert!(matches!(parse(body), Err(RecognitionError::InvalidResponse(_))));
    }

    #[test]
    fn test_text_fields_are_kept_verbatim() {
        let mut body = tesla();
        body["model"] = json!("Model S ");
        body["type"] = json!(" Electric Sedan");

        let result = parse(body).unwrap();
        assert_eq!(result.model, "Model S ");
        assert_eq!(result.vehicle_type, " Electric Sedan");
    }

    #[test]
    fn test_confidence_out_of_range_is_invalid() {
        for bad in [json!(1.2), json!(-0.1)] {
            let mut body = tesla();
            body["confidence"] = bad;
            assert!(matches!(parse(body), Err(RecognitionError::InvalidResponse(_))));
        }
    }

    #[test]
    fn test_confidence_bounds_are_inclusive() {
        for ok in [json!(0.0), json!(1.0), json!(1)] {
            let mut body = tesla();
            body["confidence"] = ok;
            assert!(parse(body).is_ok());
        }
    }

    #[test]
    fn test_fractional_year_is_invalid() {
        let mut body = tesla();
        body["year"] = json!(2023.5);
        assert!(matches!(parse(body), Err(RecognitionError::InvalidResponse(_))));
    }

    #[test]
    fn test_non_json_is_invalid() {
        assert!(matches!(
            parse_response(b"<html>502 Bad Gateway</html>"),
            Err(RecognitionError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_confidence_levels() {
        let mut result = parse(tesla()).unwrap();
        assert_eq!(result.confidence_level(), ConfidenceLevel::High);
        assert_eq!(result.confidence_percent(), 92);
        result.confidence = 0.6;
        assert_eq!(result.confidence_level(), ConfidenceLevel::Medium);
        result.confidence = 0.59;
        assert_eq!(result.confidence_level(), ConfidenceLevel::Low);
    }

    #[test]
    fn test_title_and_specs() {
        let mut body = tesla();
        body["horsepower"] = json!(670);
        let result = parse(body).unwrap();
        assert_eq!(result.title(), "2023 Tesla Model S");
        assert_eq!(
            result.specs(),
            vec![
                ("Type", "Electric Sedan".to_string()),
                ("Power", "670 HP".to_string()),
            ]
        );
    }

    #[test]
    fn test_serialize_uses_type_key() {
        let result = parse(tesla()).unwrap();
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["type"], json!("Electric Sedan"));
        assert!(value.get("engine").is_none());
    }
}
