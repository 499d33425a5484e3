//! Checklist de inspección del vehículo
//!
//! Cada ítem pasa de `Unanswered` a `Passed` o `Failed { note }`. Volver a
//! evaluar un ítem sobrescribe la evaluación anterior.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Resultado de la evaluación de un ítem
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Evaluation {
    #[default]
    Unanswered,
    Passed,
    Failed { note: String },
}

/// Un ítem inspeccionado
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: String,
    pub evaluation: Evaluation,
}

/// Lista de ítems evaluados durante la inspección
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Checklist {
    items: Vec<ChecklistItem>,
}

/// Checklist tal como se envía al sistema remoto
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistPayload {
    pub items: BTreeMap<String, bool>,
    pub notes: String,
    #[serde(default)]
    pub has_problems: bool,
    #[serde(default)]
    pub rejected_items: Vec<String>,
}

impl Checklist {
    /// Crear checklist con todos los ítems sin responder
    pub fn from_template<S: AsRef<str>>(ids: &[S]) -> Self {
        let mut checklist = Self::default();
        for id in ids {
            checklist.evaluate(id.as_ref(), Evaluation::Unanswered);
        }
        checklist
    }

    /// Registrar (o sobrescribir) la evaluación de un ítem
    pub fn evaluate(&mut self, id: &str, evaluation: Evaluation) {
        match self.items.iter_mut().find(|item| item.id == id) {
            Some(item) => item.evaluation = evaluation,
            None => self.items.push(ChecklistItem {
                id: id.to_string(),
                evaluation,
            }),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Evaluation> {
        self.items
            .iter()
            .find(|item| item.id == id)
            .map(|item| &item.evaluation)
    }

    pub fn items(&self) -> &[ChecklistItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Ítems rechazados, recalculados a partir de las evaluaciones actuales
    pub fn rejected_items(&self) -> Vec<&ChecklistItem> {
        self.items
            .iter()
            .filter(|item| matches!(item.evaluation, Evaluation::Failed { .. }))
            .collect()
    }

    /// Construir el payload remoto junto con el flag declarado en la inspección
    pub fn to_payload(&self, has_problems: bool) -> ChecklistPayload {
        let mut items = BTreeMap::new();
        let mut notes = Vec::new();

        for item in &self.items {
            match &item.evaluation {
                Evaluation::Unanswered => {}
                Evaluation::Passed => {
                    items.insert(item.id.clone(), true);
                }
                Evaluation::Failed { note } => {
                    items.insert(item.id.clone(), false);
                    if !note.trim().is_empty() {
                        notes.push(format!("{}: {}", item.id, note.trim()));
                    }
                }
            }
        }

        ChecklistPayload {
            items,
            notes: notes.join("; "),
            has_problems,
            rejected_items: self
                .rejected_items()
                .into_iter()
                .map(|item| item.id.clone())
                .collect(),
        }
    }

    /// Reconstruir un checklist desde el payload del sistema remoto.
    /// Las notas individuales no se pueden recuperar del texto concatenado.
    pub fn from_payload(payload: &ChecklistPayload) -> Self {
        let mut checklist = Self::default();
        for (id, passed) in &payload.items {
            let evaluation = if *passed {
                Evaluation::Passed
            } else {
                Evaluation::Failed {
                    note: String::new(),
                }
            };
            checklist.evaluate(id, evaluation);
        }
        checklist
    }
}
