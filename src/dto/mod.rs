//! DTOs
//! 
//! Requests/responses de la API HTTP y formas del sistema de registro remoto.

pub mod journey_dto;
pub mod sync_dto;
