//! Configuración del proyecto
//! 
//! Este módulo contiene las variables de entorno y la configuración
//! derivada para el store y el sistema de registro.

pub mod environment;

pub use environment::*;
