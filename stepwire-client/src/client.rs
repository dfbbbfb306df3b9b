//! High-level client API.

use crate::config::ConnectionConfig;
use crate::connection::Connection;
use crate::error::ClientError;
use std::sync::Arc;
use stepwire_core::{BoundSteps, StepRegistry};
use stepwire_protocol::{ApiMessage, ApiMessageType, ProtoStepValue};

/// Client for a host's step-metadata API.
///
/// Cloning is cheap; clones share one connection and their requests are
/// serialized on it.
#[derive(Clone)]
pub struct Client {
    conn: Arc<Connection>,
}

impl Client {
    /// Connects to the host listening on `port` on the loopback interface.
    pub async fn connect(port: u16) -> Result<Self, ClientError> {
        Self::connect_with(ConnectionConfig::new(port)).await
    }

    /// Connects using an explicit configuration.
    pub async fn connect_with(config: ConnectionConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let conn = Connection::open(config).await?;
        Ok(Self {
            conn: Arc::new(conn),
        })
    }

    /// Connects to the port named by the `GAUGE_API_PORT` environment variable.
    pub async fn from_env() -> Result<Self, ClientError> {
        Self::connect_with(ConnectionConfig::from_env()?).await
    }

    /// Returns whether the client is connected.
    pub fn is_connected(&self) -> bool {
        self.conn.is_connected()
    }

    /// Closes the connection.
    pub async fn close(&self) -> Result<(), ClientError> {
        self.conn.close().await
    }

    /// Returns the underlying connection.
    pub fn connection(&self) -> Arc<Connection> {
        self.conn.clone()
    }

    /// Sends a raw envelope and returns the host's reply as-is.
    pub async fn send_and_receive(&self, request: &ApiMessage) -> Result<ApiMessage, ClientError> {
        self.conn.send_and_receive(request).await
    }

    // =========================================================================
    // Helper methods
    // =========================================================================

    async fn request(
        &self,
        request: ApiMessage,
        expected: ApiMessageType,
    ) -> Result<ApiMessage, ClientError> {
        let response = self.conn.send_and_receive(&request).await?;

        match response.kind()? {
            ApiMessageType::ErrorResponse => Err(ClientError::Host {
                message: response.error.map(|e| e.error).unwrap_or_default(),
            }),
            ApiMessageType::UnsupportedApiMessageResponse => Err(ClientError::Unsupported {
                message: response
                    .unsupported_api_message_response
                    .map(|r| r.message)
                    .unwrap_or_default(),
            }),
            _ => {
                response.expect_kind(expected)?;
                Ok(response)
            }
        }
    }

    // =========================================================================
    // Step operations
    // =========================================================================

    /// Asks the host for the normalised form of a step's text.
    ///
    /// Parameter placeholders are replaced by the host's generic marker, so
    /// `say <greeting> to <someone>` comes back as `say {} to {}`.
    pub async fn get_step_value(
        &self,
        step_text: &str,
        has_inline_table: bool,
    ) -> Result<String, ClientError> {
        let details = self
            .get_step_value_details(step_text, has_inline_table)
            .await?;
        Ok(details.step_value)
    }

    /// Like [`get_step_value`](Self::get_step_value), returning the full
    /// record including parameter names.
    pub async fn get_step_value_details(
        &self,
        step_text: &str,
        has_inline_table: bool,
    ) -> Result<ProtoStepValue, ClientError> {
        let id = self.conn.next_message_id();
        let request = ApiMessage::step_value_request(id, step_text, has_inline_table);
        let response = self
            .request(request, ApiMessageType::GetStepValueResponse)
            .await?;
        Ok(response.into_step_value()?)
    }

    /// Resolves several step texts, one request each, in order.
    pub async fn get_step_values<I, S>(
        &self,
        step_texts: I,
        has_inline_table: bool,
    ) -> Result<Vec<String>, ClientError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut values = Vec::new();
        for text in step_texts {
            values.push(self.get_step_value(text.as_ref(), has_inline_table).await?);
        }
        Ok(values)
    }

    /// Lists every step the host knows about, in the host's order.
    pub async fn get_all_steps(&self) -> Result<Vec<ProtoStepValue>, ClientError> {
        let id = self.conn.next_message_id();
        let response = self
            .request(
                ApiMessage::all_steps_request(id),
                ApiMessageType::GetAllStepResponse,
            )
            .await?;
        let steps = response.into_all_steps()?;
        tracing::debug!("Host reported {} steps", steps.len());
        Ok(steps)
    }

    /// Resolves every pattern in `registry` and binds the implementations to
    /// their step values.
    pub async fn bind_steps(&self, registry: &StepRegistry) -> Result<BoundSteps, ClientError> {
        let values = self.get_step_values(registry.patterns(), false).await?;
        Ok(registry.bind(values)?)
    }
}
