//! The generic record-store contract the whole editor is written against.
//!
//! Payloads cross this boundary as `serde_json::Value`; typed records are
//! converted with [`fetch_all`] and [`to_record`] right at the edge.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use super::types::{ConflictCandidate, ConflictDescriptor, LessonConflict};

/// Lesson columns plus one level of foreign-key display names
pub const LESSON_COLUMNS: &str = "id,dia_semana,horario_id,professor_id,sala_id,disciplina_id,turma_id,\
professor:professores(nome),sala:salas(nome),disciplina:disciplinas(nome),turma:turmas(codigo)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Entity {
    Professors,
    Rooms,
    Disciplines,
    Classes,
    TimeSlots,
    Lessons,
}

impl Entity {
    pub fn table(self) -> &'static str {
        match self {
            Entity::Professors => "professores",
            Entity::Rooms => "salas",
            Entity::Disciplines => "disciplinas",
            Entity::Classes => "turmas",
            Entity::TimeSlots => "slots_horarios",
            Entity::Lessons => "grade_aulas",
        }
    }

    /// Column each list is ordered by
    pub fn sort_key(self) -> Option<&'static str> {
        match self {
            Entity::Professors | Entity::Rooms | Entity::Disciplines => Some("nome"),
            Entity::Classes => Some("codigo"),
            Entity::TimeSlots => Some("ordem"),
            Entity::Lessons => None,
        }
    }

    pub fn columns(self) -> &'static str {
        match self {
            Entity::Lessons => LESSON_COLUMNS,
            _ => "*",
        }
    }
}

/// A single-table read: optional equality filter, ordered by the entity's sort key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Select {
    pub entity: Entity,
    pub filter: Option<(&'static str, String)>,
}

impl Select {
    pub fn all(entity: Entity) -> Self {
        Self { entity, filter: None }
    }

    pub fn where_eq(entity: Entity, column: &'static str, value: impl Into<String>) -> Self {
        Self {
            entity,
            filter: Some((column, value.into())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("request failed ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{0}")]
    Rejected(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn select(&self, query: &Select) -> StoreResult<Vec<Value>>;

    async fn insert(&self, entity: Entity, record: Value) -> StoreResult<()>;

    async fn update(&self, entity: Entity, id: &str, fields: Value) -> StoreResult<()>;

    async fn delete(&self, entity: Entity, id: &str) -> StoreResult<()>;

    /// `verificar_conflito`: clashes a single candidate lesson would cause
    async fn check_conflict(&self, candidate: &ConflictCandidate) -> StoreResult<Vec<ConflictDescriptor>>;

    /// `buscar_conflitos_turma`: every clash touching the lessons of one class
    async fn class_conflicts(&self, class_id: &str) -> StoreResult<Vec<LessonConflict>>;
}

/// Select and decode rows into `T`
pub async fn fetch_all<T, S>(store: &S, query: &Select) -> StoreResult<Vec<T>>
where
    T: DeserializeOwned,
    S: RecordStore + ?Sized,
{
    let rows = store.select(query).await?;
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(StoreError::from))
        .collect()
}

pub fn to_record<T: Serialize>(value: &T) -> StoreResult<Value> {
    Ok(serde_json::to_value(value)?)
}
