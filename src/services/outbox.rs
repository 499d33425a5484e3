//! Outbox de eventos de pausa
//!
//! Los comandos de pausa/reanudación aplican primero la transición local y
//! después publican un mensaje aquí. El worker lo entrega una sola vez al
//! sistema remoto; un fallo se registra en el log y el mensaje se descarta.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clients::RemoteSyncClient;
use crate::dto::sync_dto::{JourneyEventType, RegisterEventPayload};

/// Evento pendiente de notificar
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboxMessage {
    pub id: Uuid,
    pub driver_id: String,
    pub journey_id: String,
    pub event_type: JourneyEventType,
    pub location: String,
    pub occurred_at: DateTime<Utc>,
}

impl OutboxMessage {
    pub fn new(
        driver_id: &str,
        journey_id: &str,
        event_type: JourneyEventType,
        location: &str,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            driver_id: driver_id.to_string(),
            journey_id: journey_id.to_string(),
            event_type,
            location: location.to_string(),
            occurred_at,
        }
    }
}

/// Resultado de una entrega
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    Dropped,
}

/// Extremo emisor, compartido por todas las sesiones
#[derive(Debug, Clone)]
pub struct Outbox {
    tx: mpsc::UnboundedSender<OutboxMessage>,
}

impl Outbox {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<OutboxMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Publicar sin bloquear; si el worker ya no existe el evento se pierde
    pub fn publish(&self, message: OutboxMessage) {
        let event = message.event_type.as_str();
        let journey_id = message.journey_id.clone();
        if self.tx.send(message).is_err() {
            warn!(
                "⚠️ Outbox cerrado, evento {} de la jornada {} descartado",
                event, journey_id
            );
        }
    }
}

/// Worker que entrega los eventos al sistema remoto
pub struct OutboxWorker {
    rx: mpsc::UnboundedReceiver<OutboxMessage>,
    remote: Arc<dyn RemoteSyncClient>,
}

impl OutboxWorker {
    pub fn new(rx: mpsc::UnboundedReceiver<OutboxMessage>, remote: Arc<dyn RemoteSyncClient>) -> Self {
        Self { rx, remote }
    }

    /// Procesar mensajes hasta que se cierren todos los emisores
    pub async fn run(mut self) {
        info!("📮 Outbox worker iniciado");
        while let Some(message) = self.rx.recv().await {
            self.deliver(&message).await;
        }
        info!("📮 Outbox worker detenido");
    }

    /// Entregar lo que ya está en cola y volver (usado en tests y al apagar)
    pub async fn run_until_idle(&mut self) -> Vec<Delivery> {
        let mut deliveries = Vec::new();
        while let Ok(message) = self.rx.try_recv() {
            deliveries.push(self.deliver(&message).await);
        }
        deliveries
    }

    async fn deliver(&self, message: &OutboxMessage) -> Delivery {
        let event = RegisterEventPayload {
            event_type: message.event_type,
            location: message.location.clone(),
            occurred_at: message.occurred_at,
        };

        match self.remote.register_event(&message.journey_id, &event).await {
            Ok(()) => {
                debug!(
                    "✅ Evento {} registrado para jornada {}",
                    message.event_type.as_str(),
                    message.journey_id
                );
                Delivery::Delivered
            }
            Err(e) => {
                warn!(
                    "⚠️ Evento {} de la jornada {} (conductor {}) no registrado: {}",
                    message.event_type.as_str(),
                    message.journey_id,
                    message.driver_id,
                    e
                );
                Delivery::Dropped
            }
        }
    }
}
