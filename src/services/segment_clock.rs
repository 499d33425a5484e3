//! Reloj de segmentos
//!
//! Matemática de tiempo pura y la fuente de "ahora" inyectable en las sesiones.

use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex};

/// Fuente de la hora actual
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Reloj del sistema
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Reloj manual para tests y reproducción de eventos
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now = instant;
    }

    pub fn advance_secs(&self, seconds: i64) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += Duration::seconds(seconds);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Segundos transcurridos entre `start` y `now`.
///
/// Trabaja sobre timestamps Unix en segundos enteros para que la suma de
/// segmentos consecutivos sea exactamente el total. Un reloj que retrocede
/// produce 0, nunca un valor negativo.
pub fn elapsed_seconds(start: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    u64::try_from(now.timestamp() - start.timestamp()).unwrap_or(0)
}
