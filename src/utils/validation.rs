//! Utilidades de validación
//!
//! Este módulo contiene funciones helper para validar los datos de entrada
//! de los comandos antes de cualquier llamada remota.

use rust_decimal::Decimal;
use std::str::FromStr;
use validator::ValidationError;

use crate::utils::errors::{validation_error, AppError};

/// Validar que un string no esté vacío
pub fn validate_not_empty(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("not_empty");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

/// Validar y convertir la lectura del odómetro (decimal no negativo)
pub fn validate_odometer(value: &str) -> Result<Decimal, ValidationError> {
    let parsed = Decimal::from_str(value.trim()).map_err(|_| {
        let mut error = ValidationError::new("odometer");
        error.add_param("value".into(), &value.to_string());
        error
    })?;

    if parsed.is_sign_negative() {
        let mut error = ValidationError::new("odometer_negative");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }

    Ok(parsed)
}

/// Identidad del conductor requerida para hablar con el sistema remoto
pub fn require_driver_id(driver_id: &str) -> Result<(), AppError> {
    validate_not_empty(driver_id)
        .map_err(|_| validation_error("driver_id", "driver identity is required"))
}

/// Odómetro numérico requerido para iniciar o finalizar
pub fn require_odometer(value: &str) -> Result<Decimal, AppError> {
    validate_odometer(value)
        .map_err(|_| validation_error("odometer", "must be a non-negative number"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_odometer() {
        assert_eq!(validate_odometer("12345").unwrap(), Decimal::from(12345));
        assert!(validate_odometer(" 1200.5 ").is_ok());
        assert!(validate_odometer("12a45").is_err());
        assert!(validate_odometer("").is_err());
        assert!(validate_odometer("-3").is_err());
    }

    #[test]
    fn test_require_driver_id() {
        assert!(require_driver_id("A187518").is_ok());
        assert!(matches!(require_driver_id("   "), Err(AppError::Validation(_))));
    }
}
