//! Professors, disciplines, rooms and classes: the reference entities an
//! administrator maintains outside the grid.

use serde_json::{Map, Value};
use std::time::Duration;

use super::gateway::{Confirmation, DeleteOutcome};
use super::remote;
use crate::api::{fetch_all, Discipline, Entity, Professor, RecordId, RecordStore, Room, SchoolClass, Select};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistryKind {
    Professors,
    Disciplines,
    Rooms,
    Classes,
}

impl RegistryKind {
    pub const ALL: [RegistryKind; 4] = [
        RegistryKind::Professors,
        RegistryKind::Disciplines,
        RegistryKind::Rooms,
        RegistryKind::Classes,
    ];

    pub fn entity(self) -> Entity {
        match self {
            RegistryKind::Professors => Entity::Professors,
            RegistryKind::Disciplines => Entity::Disciplines,
            RegistryKind::Rooms => Entity::Rooms,
            RegistryKind::Classes => Entity::Classes,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            RegistryKind::Professors => "Professors",
            RegistryKind::Disciplines => "Disciplines",
            RegistryKind::Rooms => "Rooms",
            RegistryKind::Classes => "Classes",
        }
    }

    pub fn primary_label(self) -> &'static str {
        match self {
            RegistryKind::Professors => "Professor name",
            RegistryKind::Disciplines => "Discipline name",
            RegistryKind::Rooms => "Room name/number",
            RegistryKind::Classes => "Code (e.g. 1AGROA)",
        }
    }

    pub fn extra_label(self) -> Option<&'static str> {
        match self {
            RegistryKind::Rooms => Some("Type (Lab, Room...)"),
            RegistryKind::Classes => Some("Course name"),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryRecord {
    Professor { name: String },
    Discipline { name: String },
    Room { name: String, kind: Option<String> },
    Class { code: String, course: Option<String> },
}

impl RegistryRecord {
    /// Build from the two registry form inputs; a blank extra means "not set"
    pub fn from_form(kind: RegistryKind, primary: &str, extra: &str) -> Self {
        let primary = primary.trim().to_string();
        let extra = Some(extra.trim().to_string()).filter(|s| !s.is_empty());
        match kind {
            RegistryKind::Professors => RegistryRecord::Professor { name: primary },
            RegistryKind::Disciplines => RegistryRecord::Discipline { name: primary },
            RegistryKind::Rooms => RegistryRecord::Room { name: primary, kind: extra },
            RegistryKind::Classes => RegistryRecord::Class { code: primary, course: extra },
        }
    }

    pub fn kind(&self) -> RegistryKind {
        match self {
            RegistryRecord::Professor { .. } => RegistryKind::Professors,
            RegistryRecord::Discipline { .. } => RegistryKind::Disciplines,
            RegistryRecord::Room { .. } => RegistryKind::Rooms,
            RegistryRecord::Class { .. } => RegistryKind::Classes,
        }
    }

    fn primary(&self) -> &str {
        match self {
            RegistryRecord::Professor { name }
            | RegistryRecord::Discipline { name }
            | RegistryRecord::Room { name, .. } => name,
            RegistryRecord::Class { code, .. } => code,
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.primary().trim().is_empty() {
            return Err(AppError::Validation(format!(
                "{} is required",
                self.kind().primary_label()
            )));
        }
        Ok(())
    }

    /// The store payload. Unset optional fields are left out entirely.
    pub fn to_record(&self) -> Value {
        let mut obj = Map::new();
        let mut put = |key: &str, value: &str| {
            obj.insert(key.to_string(), Value::String(value.to_string()));
        };
        match self {
            RegistryRecord::Professor { name } | RegistryRecord::Discipline { name } => put("nome", name),
            RegistryRecord::Room { name, kind } => {
                put("nome", name);
                if let Some(kind) = kind {
                    put("tipo", kind);
                }
            }
            RegistryRecord::Class { code, course } => {
                put("codigo", code);
                if let Some(course) = course {
                    put("curso", course);
                }
            }
        }
        Value::Object(obj)
    }
}

/// A registry row in uniform shape for listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    pub id: RecordId,
    pub primary: String,
    pub extra: Option<String>,
}

pub(crate) async fn list<S: RecordStore + ?Sized>(
    store: &S,
    kind: RegistryKind,
    timeout: Duration,
) -> AppResult<Vec<RegistryEntry>> {
    let query = Select::all(kind.entity());
    let entries = match kind {
        RegistryKind::Professors => remote(timeout, fetch_all::<Professor, S>(store, &query))
            .await?
            .into_iter()
            .map(|p| RegistryEntry { id: p.id, primary: p.name, extra: None })
            .collect(),
        RegistryKind::Disciplines => remote(timeout, fetch_all::<Discipline, S>(store, &query))
            .await?
            .into_iter()
            .map(|d| RegistryEntry { id: d.id, primary: d.name, extra: None })
            .collect(),
        RegistryKind::Rooms => remote(timeout, fetch_all::<Room, S>(store, &query))
            .await?
            .into_iter()
            .map(|r| RegistryEntry { id: r.id, primary: r.name, extra: r.kind })
            .collect(),
        RegistryKind::Classes => remote(timeout, fetch_all::<SchoolClass, S>(store, &query))
            .await?
            .into_iter()
            .map(|c| RegistryEntry { id: c.id, primary: c.code, extra: c.course })
            .collect(),
    };
    Ok(entries)
}

pub(crate) async fn create<S: RecordStore + ?Sized>(
    store: &S,
    record: &RegistryRecord,
    timeout: Duration,
) -> AppResult<()> {
    record.validate()?;
    let entity = record.kind().entity();
    remote(timeout, store.insert(entity, record.to_record())).await?;
    tracing::info!(table = entity.table(), "registry entry created");
    Ok(())
}

pub(crate) async fn update<S: RecordStore + ?Sized>(
    store: &S,
    id: &str,
    record: &RegistryRecord,
    timeout: Duration,
) -> AppResult<()> {
    record.validate()?;
    let entity = record.kind().entity();
    remote(timeout, store.update(entity, id, record.to_record())).await?;
    tracing::info!(table = entity.table(), %id, "registry entry updated");
    Ok(())
}

pub(crate) async fn delete<S: RecordStore + ?Sized>(
    store: &S,
    kind: RegistryKind,
    id: &str,
    confirmation: Confirmation,
    timeout: Duration,
) -> AppResult<DeleteOutcome> {
    if confirmation == Confirmation::No {
        return Ok(DeleteOutcome::Cancelled);
    }
    let entity = kind.entity();
    match remote(timeout, store.delete(entity, id)).await {
        Ok(()) => {
            tracing::info!(table = entity.table(), %id, "registry entry deleted");
            Ok(DeleteOutcome::Deleted)
        }
        Err(AppError::Backend(message)) => Err(AppError::Backend(format!(
            "Could not delete; check whether it is still used by scheduled lessons ({})",
            message
        ))),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_payload_uses_code_and_optional_course() {
        let record = RegistryRecord::from_form(RegistryKind::Classes, " 1AGROA ", "");
        assert_eq!(record, RegistryRecord::Class { code: "1AGROA".into(), course: None });
        assert_eq!(record.to_record(), serde_json::json!({"codigo": "1AGROA"}));

        let record = RegistryRecord::from_form(RegistryKind::Classes, "1AGROA", "Agropecuária");
        assert_eq!(record.to_record(), serde_json::json!({"codigo": "1AGROA", "curso": "Agropecuária"}));
    }

    #[test]
    fn room_payload_carries_kind_and_professor_ignores_extra() {
        let room = RegistryRecord::from_form(RegistryKind::Rooms, "Lab 2", "Lab");
        assert_eq!(room.to_record(), serde_json::json!({"nome": "Lab 2", "tipo": "Lab"}));

        let professor = RegistryRecord::from_form(RegistryKind::Professors, "Ana", "ignored");
        assert_eq!(professor.to_record(), serde_json::json!({"nome": "Ana"}));
    }

    #[test]
    fn blank_primary_field_is_a_validation_error() {
        let record = RegistryRecord::from_form(RegistryKind::Disciplines, "   ", "");
        assert!(matches!(record.validate(), Err(AppError::Validation(_))));
    }
}
