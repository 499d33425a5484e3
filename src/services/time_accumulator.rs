//! Acumulador de tiempos de conducción, descanso y comida

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::duty_status::{Bucket, DutyStatus};
use crate::services::segment_clock::elapsed_seconds;

/// Totales acumulados en segundos
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accumulated {
    pub drive: u64,
    pub rest: u64,
    pub meal: u64,
}

impl Accumulated {
    pub fn get(&self, bucket: Bucket) -> u64 {
        match bucket {
            Bucket::Drive => self.drive,
            Bucket::Rest => self.rest,
            Bucket::Meal => self.meal,
        }
    }

    fn add(&mut self, bucket: Bucket, seconds: u64) {
        let slot = match bucket {
            Bucket::Drive => &mut self.drive,
            Bucket::Rest => &mut self.rest,
            Bucket::Meal => &mut self.meal,
        };
        *slot = slot.saturating_add(seconds);
    }
}

/// Tres totales más el inicio del segmento en curso.
///
/// `current_segment_start` está definido si y solo si el estado actual acumula.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeAccumulator {
    pub accumulated: Accumulated,
    pub current_segment_start: Option<DateTime<Utc>>,
}

impl TimeAccumulator {
    /// Cerrar el segmento de `from` y abrir el de `to` en el instante `now`
    pub fn on_transition(&mut self, from: DutyStatus, to: DutyStatus, now: DateTime<Utc>) {
        if let Some(start) = self.current_segment_start.take() {
            if let Some(bucket) = from.bucket() {
                self.accumulated.add(bucket, elapsed_seconds(start, now));
            }
        }

        self.current_segment_start = to.is_accruing().then_some(now);
    }

    /// Total del acumulador incluyendo el segmento vivo, sin mutar nada
    pub fn live_seconds(&self, status: DutyStatus, bucket: Bucket, now: DateTime<Utc>) -> u64 {
        let live = match (status.bucket(), self.current_segment_start) {
            (Some(current), Some(start)) if current == bucket => elapsed_seconds(start, now),
            _ => 0,
        };
        self.accumulated.get(bucket).saturating_add(live)
    }
}
