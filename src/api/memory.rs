//! In-memory record store.
//!
//! Backs the offline demo and the test suite. Rows are kept as JSON so the
//! same typed conversions run as against the real backend. Conflict results
//! are scripted, never computed: the backend owns that logic.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use super::store::{Entity, RecordStore, Select, StoreError, StoreResult};
use super::types::{ConflictCandidate, ConflictDescriptor, LessonConflict};

/// One call received by the store, in arrival order
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    Select(Select),
    Insert(Entity, Value),
    Update(Entity, String, Value),
    Delete(Entity, String),
    CheckConflict(ConflictCandidate),
    ClassConflicts(String),
}

impl StoreCall {
    pub fn is_mutation(&self) -> bool {
        matches!(self, StoreCall::Insert(..) | StoreCall::Update(..) | StoreCall::Delete(..))
    }
}

#[derive(Default)]
struct MemoryData {
    tables: HashMap<Entity, Vec<Value>>,
    next_id: u64,
    conflicts: Vec<ConflictDescriptor>,
    class_conflicts: HashMap<String, Vec<LessonConflict>>,
    failing: HashSet<Entity>,
    mutation_failure: Option<String>,
    latency: Option<Duration>,
    calls: Vec<StoreCall>,
}

#[derive(Default)]
pub struct MemoryStore {
    data: Mutex<MemoryData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryData> {
        // A panicking test thread must not hide the data from the others
        self.data.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add typed rows to a table
    pub fn seed<T: Serialize>(&self, entity: Entity, rows: &[T]) {
        let values: Vec<Value> = rows
            .iter()
            .filter_map(|row| serde_json::to_value(row).ok())
            .collect();
        self.lock().tables.entry(entity).or_default().extend(values);
    }

    /// Answer every `verificar_conflito` call with these descriptors
    pub fn set_conflicts(&self, conflicts: Vec<ConflictDescriptor>) {
        self.lock().conflicts = conflicts;
    }

    pub fn set_class_conflicts(&self, class_id: &str, conflicts: Vec<LessonConflict>) {
        self.lock().class_conflicts.insert(class_id.to_string(), conflicts);
    }

    /// Make every select of `entity` fail
    pub fn fail_entity(&self, entity: Entity) {
        self.lock().failing.insert(entity);
    }

    /// Make every insert/update/delete fail with `message`; `None` restores normal behavior
    pub fn fail_mutations(&self, message: Option<&str>) {
        self.lock().mutation_failure = message.map(String::from);
    }

    pub fn set_latency(&self, latency: Option<Duration>) {
        self.lock().latency = latency;
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    pub fn mutation_calls(&self) -> Vec<StoreCall> {
        self.lock().calls.iter().filter(|c| c.is_mutation()).cloned().collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn rows(&self, entity: Entity) -> Vec<Value> {
        self.lock().tables.get(&entity).cloned().unwrap_or_default()
    }

    async fn delay(&self) {
        let latency = self.lock().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    /// A small school used by the offline demo
    pub fn demo() -> Self {
        let store = Self::new();
        store.seed(Entity::Professors, &[
            serde_json::json!({"id": "p1", "nome": "Ana Souza"}),
            serde_json::json!({"id": "p2", "nome": "Bruno Lima"}),
            serde_json::json!({"id": "p3", "nome": "Carla Mendes"}),
        ]);
        store.seed(Entity::Rooms, &[
            serde_json::json!({"id": "r1", "nome": "Sala 101", "tipo": "Sala"}),
            serde_json::json!({"id": "r2", "nome": "Lab Informática", "tipo": "Lab"}),
        ]);
        store.seed(Entity::Disciplines, &[
            serde_json::json!({"id": "d1", "nome": "Matemática"}),
            serde_json::json!({"id": "d2", "nome": "Português"}),
            serde_json::json!({"id": "d3", "nome": "Programação"}),
        ]);
        store.seed(Entity::Classes, &[
            serde_json::json!({"id": "c1", "codigo": "1INFOA", "curso": "Informática"}),
            serde_json::json!({"id": "c2", "codigo": "2AGROA", "curso": "Agropecuária"}),
        ]);
        store.seed(Entity::TimeSlots, &[
            serde_json::json!({"id": "s1", "rotulo": "07:30 - 08:20", "inicio": "07:30", "ordem": 1, "periodo": "Manhã"}),
            serde_json::json!({"id": "s2", "rotulo": "08:20 - 09:10", "inicio": "08:20", "ordem": 2, "periodo": "Manhã"}),
            serde_json::json!({"id": "s3", "rotulo": "09:30 - 10:20", "inicio": "09:30", "ordem": 3, "periodo": "Manhã"}),
            serde_json::json!({"id": "s4", "rotulo": "13:00 - 13:50", "inicio": "13:00", "ordem": 4, "periodo": "Tarde"}),
        ]);
        store.seed(Entity::Lessons, &[
            serde_json::json!({"id": "l1", "dia_semana": "Segunda", "horario_id": "s1", "turma_id": "c1",
                "professor_id": "p1", "sala_id": "r1", "disciplina_id": "d1"}),
            serde_json::json!({"id": "l2", "dia_semana": "Terça", "horario_id": "s2", "turma_id": "c1",
                "professor_id": "p3", "sala_id": "r2", "disciplina_id": "d3"}),
        ]);
        store
    }
}

fn field<'a>(row: &'a Value, column: &str) -> Option<&'a Value> {
    row.get(column)
}

fn matches_filter(row: &Value, filter: &Option<(&'static str, String)>) -> bool {
    match filter {
        None => true,
        Some((column, expected)) => match field(row, column) {
            Some(Value::String(s)) => s == expected,
            Some(Value::Number(n)) => n.to_string() == *expected,
            _ => false,
        },
    }
}

fn compare_by(a: &Value, b: &Value, column: &str) -> Ordering {
    match (field(a, column), field(b, column)) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

fn find_by_id<'a>(rows: Option<&'a Vec<Value>>, id: Option<&Value>) -> Option<&'a Value> {
    let id = id?.as_str()?;
    rows?.iter().find(|r| r.get("id").and_then(|v| v.as_str()) == Some(id))
}

/// Join the display names a lesson select asks for
fn embed_lesson(data: &MemoryData, row: &Value) -> Value {
    let mut out = row.clone();
    let Some(obj) = out.as_object_mut() else {
        return out;
    };
    let joins = [
        ("professor", "professor_id", Entity::Professors, "nome"),
        ("sala", "sala_id", Entity::Rooms, "nome"),
        ("disciplina", "disciplina_id", Entity::Disciplines, "nome"),
        ("turma", "turma_id", Entity::Classes, "codigo"),
    ];
    for (alias, fk, entity, column) in joins {
        let related = find_by_id(data.tables.get(&entity), row.get(fk));
        let embedded = related
            .and_then(|r| r.get(column))
            .map(|v| {
                let mut m = Map::new();
                m.insert(column.to_string(), v.clone());
                Value::Object(m)
            })
            .unwrap_or(Value::Null);
        obj.insert(alias.to_string(), embedded);
    }
    out
}

/// Lesson foreign key that points at rows of `entity`
fn lesson_reference_column(entity: Entity) -> Option<&'static str> {
    match entity {
        Entity::Professors => Some("professor_id"),
        Entity::Rooms => Some("sala_id"),
        Entity::Disciplines => Some("disciplina_id"),
        Entity::Classes => Some("turma_id"),
        Entity::TimeSlots => Some("horario_id"),
        Entity::Lessons => None,
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn select(&self, query: &Select) -> StoreResult<Vec<Value>> {
        self.delay().await;
        let mut data = self.lock();
        data.calls.push(StoreCall::Select(query.clone()));

        if data.failing.contains(&query.entity) {
            return Err(StoreError::Rejected(format!(
                "relation \"{}\" is unavailable",
                query.entity.table()
            )));
        }

        let mut rows: Vec<Value> = data
            .tables
            .get(&query.entity)
            .map(|rows| {
                rows.iter()
                    .filter(|row| matches_filter(row, &query.filter))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(column) = query.entity.sort_key() {
            rows.sort_by(|a, b| compare_by(a, b, column));
        }
        if query.entity == Entity::Lessons {
            rows = rows.iter().map(|row| embed_lesson(&data, row)).collect();
        }
        Ok(rows)
    }

    async fn insert(&self, entity: Entity, record: Value) -> StoreResult<()> {
        self.delay().await;
        let mut data = self.lock();
        data.calls.push(StoreCall::Insert(entity, record.clone()));

        if let Some(message) = &data.mutation_failure {
            return Err(StoreError::Rejected(message.clone()));
        }
        let Value::Object(mut obj) = record else {
            return Err(StoreError::Rejected("insert payload must be an object".to_string()));
        };

        data.next_id += 1;
        let id = format!("{}-{}", entity.table(), data.next_id);
        obj.insert("id".to_string(), Value::String(id));
        data.tables.entry(entity).or_default().push(Value::Object(obj));
        Ok(())
    }

    async fn update(&self, entity: Entity, id: &str, fields: Value) -> StoreResult<()> {
        self.delay().await;
        let mut data = self.lock();
        data.calls.push(StoreCall::Update(entity, id.to_string(), fields.clone()));

        if let Some(message) = &data.mutation_failure {
            return Err(StoreError::Rejected(message.clone()));
        }
        let Value::Object(fields) = fields else {
            return Err(StoreError::Rejected("update payload must be an object".to_string()));
        };

        // PostgREST answers a PATCH matching no rows with success, so do we
        if let Some(row) = data
            .tables
            .get_mut(&entity)
            .and_then(|rows| rows.iter_mut().find(|r| r.get("id").and_then(|v| v.as_str()) == Some(id)))
        {
            if let Some(obj) = row.as_object_mut() {
                for (key, value) in fields {
                    obj.insert(key, value);
                }
            }
        }
        Ok(())
    }

    async fn delete(&self, entity: Entity, id: &str) -> StoreResult<()> {
        self.delay().await;
        let mut data = self.lock();
        data.calls.push(StoreCall::Delete(entity, id.to_string()));

        if let Some(message) = &data.mutation_failure {
            return Err(StoreError::Rejected(message.clone()));
        }

        if let Some(column) = lesson_reference_column(entity) {
            let in_use = data
                .tables
                .get(&Entity::Lessons)
                .map(|lessons| lessons.iter().any(|l| l.get(column).and_then(|v| v.as_str()) == Some(id)))
                .unwrap_or(false);
            if in_use {
                return Err(StoreError::Rejected(format!(
                    "update or delete on table \"{}\" violates foreign key constraint on table \"grade_aulas\"",
                    entity.table()
                )));
            }
        }

        if let Some(rows) = data.tables.get_mut(&entity) {
            rows.retain(|r| r.get("id").and_then(|v| v.as_str()) != Some(id));
        }
        Ok(())
    }

    async fn check_conflict(&self, candidate: &ConflictCandidate) -> StoreResult<Vec<ConflictDescriptor>> {
        self.delay().await;
        let mut data = self.lock();
        data.calls.push(StoreCall::CheckConflict(candidate.clone()));
        Ok(data.conflicts.clone())
    }

    async fn class_conflicts(&self, class_id: &str) -> StoreResult<Vec<LessonConflict>> {
        self.delay().await;
        let mut data = self.lock();
        data.calls.push(StoreCall::ClassConflicts(class_id.to_string()));
        Ok(data.class_conflicts.get(class_id).cloned().unwrap_or_default())
    }
}
