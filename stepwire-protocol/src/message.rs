//! Protobuf envelope and payload types.
//!
//! Only the step-metadata exchanges carry typed payloads here; the full
//! message-type catalog is kept so that any tag the host may send decodes
//! to a known variant.

use crate::error::ProtocolError;
use bytes::Bytes;
use prost::Message;

/// Message type tag carried by every envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ApiMessageType {
    GetProjectRootRequest = 0,
    GetProjectRootResponse = 1,
    GetInstallationRootRequest = 2,
    GetInstallationRootResponse = 3,
    GetAllStepsRequest = 4,
    GetAllStepResponse = 5,
    SpecsRequest = 6,
    SpecsResponse = 7,
    GetStepValueRequest = 8,
    GetStepValueResponse = 9,
    GetLanguagePluginLibPathRequest = 10,
    GetLanguagePluginLibPathResponse = 11,
    ErrorResponse = 12,
    GetAllConceptsRequest = 13,
    GetAllConceptsResponse = 14,
    PerformRefactoringRequest = 15,
    PerformRefactoringResponse = 16,
    ExtractConceptRequest = 17,
    ExtractConceptResponse = 18,
    FormatSpecsRequest = 19,
    FormatSpecsResponse = 20,
    UnsupportedApiMessageResponse = 21,
}

impl ApiMessageType {
    /// Returns the response type a host answers this request type with.
    pub fn response_type(self) -> Option<ApiMessageType> {
        match self {
            ApiMessageType::GetProjectRootRequest => Some(ApiMessageType::GetProjectRootResponse),
            ApiMessageType::GetInstallationRootRequest => {
                Some(ApiMessageType::GetInstallationRootResponse)
            }
            ApiMessageType::GetAllStepsRequest => Some(ApiMessageType::GetAllStepResponse),
            ApiMessageType::SpecsRequest => Some(ApiMessageType::SpecsResponse),
            ApiMessageType::GetStepValueRequest => Some(ApiMessageType::GetStepValueResponse),
            ApiMessageType::GetLanguagePluginLibPathRequest => {
                Some(ApiMessageType::GetLanguagePluginLibPathResponse)
            }
            ApiMessageType::GetAllConceptsRequest => Some(ApiMessageType::GetAllConceptsResponse),
            ApiMessageType::PerformRefactoringRequest => {
                Some(ApiMessageType::PerformRefactoringResponse)
            }
            ApiMessageType::ExtractConceptRequest => Some(ApiMessageType::ExtractConceptResponse),
            ApiMessageType::FormatSpecsRequest => Some(ApiMessageType::FormatSpecsResponse),
            _ => None,
        }
    }
}

/// The envelope exchanged over a connection.
#[derive(Clone, PartialEq, Message)]
pub struct ApiMessage {
    #[prost(enumeration = "ApiMessageType", tag = "1")]
    pub message_type: i32,
    #[prost(int64, tag = "2")]
    pub message_id: i64,
    #[prost(message, optional, tag = "7")]
    pub all_steps_request: Option<GetAllStepsRequest>,
    #[prost(message, optional, tag = "8")]
    pub all_steps_response: Option<GetAllStepsResponse>,
    #[prost(message, optional, tag = "11")]
    pub step_value_request: Option<GetStepValueRequest>,
    #[prost(message, optional, tag = "12")]
    pub step_value_response: Option<GetStepValueResponse>,
    #[prost(message, optional, tag = "15")]
    pub error: Option<ErrorResponse>,
    #[prost(message, optional, tag = "24")]
    pub unsupported_api_message_response: Option<UnsupportedApiMessageResponse>,
}

#[derive(Clone, PartialEq, Message)]
pub struct GetStepValueRequest {
    #[prost(string, tag = "1")]
    pub step_text: String,
    #[prost(bool, tag = "2")]
    pub has_inline_table: bool,
}

#[derive(Clone, PartialEq, Message)]
pub struct GetStepValueResponse {
    #[prost(message, optional, tag = "1")]
    pub step_value: Option<ProtoStepValue>,
}

#[derive(Clone, Copy, PartialEq, Message)]
pub struct GetAllStepsRequest {}

#[derive(Clone, PartialEq, Message)]
pub struct GetAllStepsResponse {
    #[prost(message, repeated, tag = "1")]
    pub all_steps: Vec<ProtoStepValue>,
}

/// Step metadata: the display form of a step pattern and its parameters.
#[derive(Clone, PartialEq, Eq, Hash, Message)]
pub struct ProtoStepValue {
    /// Pattern with parameter names stripped, e.g. `say {} to {}`.
    #[prost(string, tag = "1")]
    pub step_value: String,
    /// Pattern with parameter placeholders kept, e.g. `say <greeting> to <someone>`.
    #[prost(string, tag = "2")]
    pub parameterized_step_value: String,
    #[prost(string, repeated, tag = "3")]
    pub parameters: Vec<String>,
}

impl ProtoStepValue {
    pub fn new(step_value: impl Into<String>) -> Self {
        Self {
            step_value: step_value.into(),
            ..Default::default()
        }
    }

    pub fn with_parameterized(mut self, text: impl Into<String>, parameters: Vec<String>) -> Self {
        self.parameterized_step_value = text.into();
        self.parameters = parameters;
        self
    }
}

#[derive(Clone, PartialEq, Message)]
pub struct ErrorResponse {
    #[prost(string, tag = "1")]
    pub error: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct UnsupportedApiMessageResponse {
    #[prost(string, tag = "1")]
    pub message: String,
}

/// Wire form of a tabular step parameter.
#[derive(Clone, PartialEq, Message)]
pub struct ProtoTable {
    #[prost(message, optional, tag = "1")]
    pub headers: Option<ProtoTableRow>,
    #[prost(message, repeated, tag = "2")]
    pub rows: Vec<ProtoTableRow>,
}

#[derive(Clone, PartialEq, Message)]
pub struct ProtoTableRow {
    #[prost(string, repeated, tag = "1")]
    pub cells: Vec<String>,
}

impl ApiMessage {
    fn envelope(message_type: ApiMessageType, message_id: i64) -> Self {
        Self {
            message_type: message_type as i32,
            message_id,
            ..Default::default()
        }
    }

    pub fn step_value_request(
        message_id: i64,
        step_text: impl Into<String>,
        has_inline_table: bool,
    ) -> Self {
        Self {
            step_value_request: Some(GetStepValueRequest {
                step_text: step_text.into(),
                has_inline_table,
            }),
            ..Self::envelope(ApiMessageType::GetStepValueRequest, message_id)
        }
    }

    pub fn step_value_response(message_id: i64, step_value: ProtoStepValue) -> Self {
        Self {
            step_value_response: Some(GetStepValueResponse {
                step_value: Some(step_value),
            }),
            ..Self::envelope(ApiMessageType::GetStepValueResponse, message_id)
        }
    }

    pub fn all_steps_request(message_id: i64) -> Self {
        Self {
            all_steps_request: Some(GetAllStepsRequest {}),
            ..Self::envelope(ApiMessageType::GetAllStepsRequest, message_id)
        }
    }

    pub fn all_steps_response(message_id: i64, all_steps: Vec<ProtoStepValue>) -> Self {
        Self {
            all_steps_response: Some(GetAllStepsResponse { all_steps }),
            ..Self::envelope(ApiMessageType::GetAllStepResponse, message_id)
        }
    }

    pub fn error_response(message_id: i64, error: impl Into<String>) -> Self {
        Self {
            error: Some(ErrorResponse {
                error: error.into(),
            }),
            ..Self::envelope(ApiMessageType::ErrorResponse, message_id)
        }
    }

    pub fn unsupported_response(message_id: i64, message: impl Into<String>) -> Self {
        Self {
            unsupported_api_message_response: Some(UnsupportedApiMessageResponse {
                message: message.into(),
            }),
            ..Self::envelope(ApiMessageType::UnsupportedApiMessageResponse, message_id)
        }
    }

    /// Returns the decoded message type, rejecting tags outside the catalog.
    pub fn kind(&self) -> Result<ApiMessageType, ProtocolError> {
        ApiMessageType::try_from(self.message_type)
            .map_err(|_| ProtocolError::UnknownMessageType(self.message_type))
    }

    /// Serializes the envelope to protobuf bytes.
    pub fn to_bytes(&self) -> Bytes {
        Bytes::from(self.encode_to_vec())
    }

    /// Parses an envelope and validates its message type tag.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let message = Self::decode(bytes)?;
        message.kind()?;
        Ok(message)
    }

    /// Fails unless this envelope carries the `expected` message type.
    pub fn expect_kind(&self, expected: ApiMessageType) -> Result<(), ProtocolError> {
        let actual = self.kind()?;
        if actual != expected {
            return Err(ProtocolError::UnexpectedMessageType { expected, actual });
        }
        Ok(())
    }

    /// Unwraps the step value from a `GetStepValueResponse` envelope.
    pub fn into_step_value(self) -> Result<ProtoStepValue, ProtocolError> {
        self.expect_kind(ApiMessageType::GetStepValueResponse)?;
        self.step_value_response
            .and_then(|response| response.step_value)
            .ok_or(ProtocolError::MissingPayload(
                ApiMessageType::GetStepValueResponse,
            ))
    }

    /// Unwraps the step list from a `GetAllStepResponse` envelope.
    pub fn into_all_steps(self) -> Result<Vec<ProtoStepValue>, ProtocolError> {
        self.expect_kind(ApiMessageType::GetAllStepResponse)?;
        // An empty step list may arrive with no body at all.
        Ok(self
            .all_steps_response
            .map(|response| response.all_steps)
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_value_request_wire_bytes() {
        let msg = ApiMessage::step_value_request(5, "hi", true);
        let bytes = msg.to_bytes();

        // field 1 varint 8, field 2 varint 5, field 11 length-delimited
        assert_eq!(
            &bytes[..],
            &[0x08, 0x08, 0x10, 0x05, 0x5A, 0x06, 0x0A, 0x02, b'h', b'i', 0x10, 0x01]
        );
    }

    #[test]
    fn test_envelope_roundtrip() {
        let msg = ApiMessage::step_value_request(42, "say <greeting> to <someone>", false);
        let decoded = ApiMessage::from_bytes(&msg.to_bytes()).unwrap();

        assert_eq!(decoded, msg);
        assert_eq!(decoded.kind().unwrap(), ApiMessageType::GetStepValueRequest);
        let request = decoded.step_value_request.unwrap();
        assert_eq!(request.step_text, "say <greeting> to <someone>");
        assert!(!request.has_inline_table);
    }

    #[test]
    fn test_unknown_message_type_rejected() {
        let msg = ApiMessage {
            message_type: 99,
            message_id: 1,
            ..Default::default()
        };
        let result = ApiMessage::from_bytes(&msg.to_bytes());
        assert!(matches!(result, Err(ProtocolError::UnknownMessageType(99))));
    }

    #[test]
    fn test_garbage_payload_rejected() {
        let result = ApiMessage::from_bytes(&[0xFF, 0xFF, 0xFF]);
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_into_step_value() {
        let msg = ApiMessage::step_value_response(3, ProtoStepValue::new("say {} to {}"));
        assert_eq!(msg.into_step_value().unwrap().step_value, "say {} to {}");
    }

    #[test]
    fn test_into_step_value_wrong_type() {
        let msg = ApiMessage::all_steps_response(3, vec![ProtoStepValue::new("a step")]);
        let result = msg.into_step_value();
        assert!(matches!(
            result,
            Err(ProtocolError::UnexpectedMessageType {
                expected: ApiMessageType::GetStepValueResponse,
                actual: ApiMessageType::GetAllStepResponse,
            })
        ));
    }

    #[test]
    fn test_into_step_value_missing_payload() {
        let msg = ApiMessage {
            message_type: ApiMessageType::GetStepValueResponse as i32,
            message_id: 3,
            ..Default::default()
        };
        assert!(matches!(
            msg.into_step_value(),
            Err(ProtocolError::MissingPayload(_))
        ));
    }

    #[test]
    fn test_into_all_steps_preserves_order() {
        let steps = vec![
            ProtoStepValue::new("first step"),
            ProtoStepValue::new("second step {}").with_parameterized(
                "second step <name>",
                vec!["name".to_string()],
            ),
        ];
        let msg = ApiMessage::all_steps_response(9, steps.clone());
        let decoded = ApiMessage::from_bytes(&msg.to_bytes()).unwrap();
        assert_eq!(decoded.into_all_steps().unwrap(), steps);
    }

    #[test]
    fn test_into_all_steps_without_body() {
        let msg = ApiMessage {
            message_type: ApiMessageType::GetAllStepResponse as i32,
            message_id: 1,
            ..Default::default()
        };
        assert!(msg.into_all_steps().unwrap().is_empty());
    }

    #[test]
    fn test_response_type_pairs() {
        assert_eq!(
            ApiMessageType::GetStepValueRequest.response_type(),
            Some(ApiMessageType::GetStepValueResponse)
        );
        assert_eq!(
            ApiMessageType::GetAllStepsRequest.response_type(),
            Some(ApiMessageType::GetAllStepResponse)
        );
        assert_eq!(ApiMessageType::ErrorResponse.response_type(), None);
    }
}
