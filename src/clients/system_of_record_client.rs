//! Cliente HTTP para el sistema de registro de jornadas
//!
//! Este módulo define el contrato consumido por las sesiones de jornada y su
//! implementación con `reqwest`.

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};

use crate::dto::sync_dto::{
    FinalizePayload, JourneyRecord, RegisterEventPayload, RemoteEnvelope, StartJourneyPayload,
    StartJourneyResponse,
};
use crate::utils::errors::RemoteError;

/// Contrato del sistema de registro remoto
#[async_trait::async_trait]
pub trait RemoteSyncClient: Send + Sync {
    /// Registrar el inicio de una jornada y obtener su id
    async fn start_journey(
        &self,
        payload: &StartJourneyPayload,
    ) -> Result<StartJourneyResponse, RemoteError>;

    /// Registrar un hito de pausa
    async fn register_event(
        &self,
        journey_id: &str,
        event: &RegisterEventPayload,
    ) -> Result<(), RemoteError>;

    /// Cerrar la jornada
    async fn finalize_journey(
        &self,
        journey_id: &str,
        payload: &FinalizePayload,
    ) -> Result<(), RemoteError>;

    /// Jornada activa del conductor, si existe
    async fn fetch_active_journey(
        &self,
        driver_id: &str,
    ) -> Result<Option<JourneyRecord>, RemoteError>;
}

/// Cliente HTTP del sistema de registro
#[derive(Clone)]
pub struct SystemOfRecordClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl SystemOfRecordClient {
    /// Crear nuevo cliente HTTP con timeout configurable
    pub fn new(
        base_url: String,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header("Accept", "application/json");
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Desenvolver `{success, data, message}` tratando `success=false` como rechazo
    async fn read_envelope<T: DeserializeOwned>(
        response: Response,
    ) -> Result<Option<T>, RemoteError> {
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RemoteError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: RemoteEnvelope<T> = response.json().await?;
        if !envelope.success {
            return Err(RemoteError::Rejected {
                status: status.as_u16(),
                message: envelope
                    .message
                    .unwrap_or_else(|| "request not accepted".to_string()),
            });
        }

        Ok(envelope.data)
    }
}

#[async_trait::async_trait]
impl RemoteSyncClient for SystemOfRecordClient {
    async fn start_journey(
        &self,
        payload: &StartJourneyPayload,
    ) -> Result<StartJourneyResponse, RemoteError> {
        info!(
            "🚚 Iniciando jornada remota: conductor {} vehículo {}",
            payload.driver_id, payload.vehicle_id
        );

        let response = self
            .authorize(self.client.post(self.url("/journeys")))
            .json(payload)
            .send()
            .await?;

        Self::read_envelope::<StartJourneyResponse>(response)
            .await?
            .ok_or_else(|| RemoteError::InvalidResponse("missing journeyId".to_string()))
    }

    async fn register_event(
        &self,
        journey_id: &str,
        event: &RegisterEventPayload,
    ) -> Result<(), RemoteError> {
        debug!("📨 Evento {} para jornada {}", event.event_type.as_str(), journey_id);

        let path = format!("/journeys/{}/events", urlencoding::encode(journey_id));
        let response = self
            .authorize(self.client.post(self.url(&path)))
            .json(event)
            .send()
            .await?;

        Self::read_envelope::<serde_json::Value>(response).await?;
        Ok(())
    }

    async fn finalize_journey(
        &self,
        journey_id: &str,
        payload: &FinalizePayload,
    ) -> Result<(), RemoteError> {
        info!("🏁 Finalizando jornada remota {}", journey_id);

        let path = format!("/journeys/{}/finalize", urlencoding::encode(journey_id));
        let response = self
            .authorize(self.client.post(self.url(&path)))
            .json(payload)
            .send()
            .await?;

        Self::read_envelope::<serde_json::Value>(response).await?;
        Ok(())
    }

    async fn fetch_active_journey(
        &self,
        driver_id: &str,
    ) -> Result<Option<JourneyRecord>, RemoteError> {
        let path = format!("/drivers/{}/journeys/active", urlencoding::encode(driver_id));
        let response = self
            .authorize(self.client.get(self.url(&path)))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!("🔍 Sin jornada activa remota para {}", driver_id);
            return Ok(None);
        }

        Self::read_envelope::<JourneyRecord>(response).await
    }
}
