//! Seguimiento de la jornada de servicio de un conductor: selección de
//! vehículo, inspección, conducción, pausas y cierre, con reparto del tiempo
//! por categoría, persistencia local y sincronización con el sistema de
//! registro.

pub mod cache;
pub mod clients;
pub mod config;
pub mod controllers;
pub mod dto;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;
