//! Services module
//!
//! Este módulo contiene la lógica de negocio de la jornada: reloj y
//! acumulador de tiempo, store durable, sesión por conductor, outbox de
//! eventos y sonda de reconciliación.

pub mod in_flight;
pub mod journey_session;
pub mod journey_store;
pub mod outbox;
pub mod reconciliation_probe;
pub mod segment_clock;
pub mod time_accumulator;

pub use in_flight::{InFlightGuard, InFlightRegistry};
pub use journey_session::{CommandOutcome, JourneySession, RestoreSource, SessionDeps, StartJourneyCommand};
pub use journey_store::{JourneyStore, PendingFinalize, StoredJourney};
pub use outbox::{Delivery, Outbox, OutboxMessage, OutboxWorker};
pub use reconciliation_probe::{ProbeOutcome, ReconciliationPolicy, ReconciliationProbe};
pub use segment_clock::{Clock, ManualClock, SystemClock};
pub use time_accumulator::{Accumulated, TimeAccumulator};
