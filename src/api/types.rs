use serde::{Deserialize, Serialize};
use std::fmt;

pub type RecordId = String;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Professor {
    pub id: RecordId,
    #[serde(rename = "nome")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RecordId,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "tipo", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discipline {
    pub id: RecordId,
    #[serde(rename = "nome")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchoolClass {
    pub id: RecordId,
    #[serde(rename = "codigo")]
    pub code: String,
    #[serde(rename = "curso", default, skip_serializing_if = "Option::is_none")]
    pub course: Option<String>,
}

impl SchoolClass {
    /// "1AGROA - Agropecuária", or just the code when no course is set
    pub fn display_name(&self) -> String {
        match self.course.as_deref().filter(|c| !c.is_empty()) {
            Some(course) => format!("{} - {}", self.code, course),
            None => self.code.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub id: RecordId,
    #[serde(rename = "rotulo")]
    pub label: String,
    #[serde(rename = "inicio", default)]
    pub start_time: String,
    #[serde(rename = "ordem")]
    pub order: i32,
    #[serde(rename = "periodo", default)]
    pub period: String,
}

/// The five school days, stored by the backend under their Portuguese names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Weekday {
    #[serde(rename = "Segunda")]
    Monday,
    #[serde(rename = "Terça")]
    Tuesday,
    #[serde(rename = "Quarta")]
    Wednesday,
    #[serde(rename = "Quinta")]
    Thursday,
    #[serde(rename = "Sexta")]
    Friday,
}

impl Weekday {
    pub const ALL: [Weekday; 5] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
    ];

    /// Value stored in `dia_semana` and sent as `p_dia`
    pub fn stored_name(self) -> &'static str {
        match self {
            Weekday::Monday => "Segunda",
            Weekday::Tuesday => "Terça",
            Weekday::Wednesday => "Quarta",
            Weekday::Thursday => "Quinta",
            Weekday::Friday => "Sexta",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// `{nome}` from a one-level foreign-key embed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameRef {
    #[serde(rename = "nome")]
    pub name: String,
}

/// `{codigo}` from the class embed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeRef {
    #[serde(rename = "codigo")]
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: RecordId,
    #[serde(rename = "dia_semana")]
    pub weekday: Weekday,
    #[serde(rename = "horario_id")]
    pub time_slot_id: RecordId,
    #[serde(rename = "turma_id")]
    pub class_id: RecordId,
    pub professor_id: RecordId,
    #[serde(rename = "sala_id")]
    pub room_id: RecordId,
    #[serde(rename = "disciplina_id")]
    pub discipline_id: RecordId,

    // Display names joined in by the lesson select
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub professor: Option<NameRef>,
    #[serde(rename = "sala", default, skip_serializing_if = "Option::is_none")]
    pub room: Option<NameRef>,
    #[serde(rename = "disciplina", default, skip_serializing_if = "Option::is_none")]
    pub discipline: Option<NameRef>,
    #[serde(rename = "turma", default, skip_serializing_if = "Option::is_none")]
    pub class: Option<CodeRef>,
}

impl Lesson {
    pub fn professor_name(&self) -> &str {
        self.professor.as_ref().map(|p| p.name.as_str()).unwrap_or("")
    }

    pub fn room_name(&self) -> &str {
        self.room.as_ref().map(|r| r.name.as_str()).unwrap_or("")
    }

    pub fn discipline_name(&self) -> &str {
        self.discipline.as_ref().map(|d| d.name.as_str()).unwrap_or("")
    }

    pub fn class_code(&self) -> &str {
        self.class.as_ref().map(|c| c.code.as_str()).unwrap_or("")
    }
}

/// Insert payload for `grade_aulas`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLesson {
    #[serde(rename = "dia_semana")]
    pub weekday: Weekday,
    #[serde(rename = "horario_id")]
    pub time_slot_id: RecordId,
    #[serde(rename = "turma_id")]
    pub class_id: RecordId,
    pub professor_id: RecordId,
    #[serde(rename = "sala_id")]
    pub room_id: RecordId,
    #[serde(rename = "disciplina_id")]
    pub discipline_id: RecordId,
}

impl NewLesson {
    pub fn candidate(&self) -> ConflictCandidate {
        ConflictCandidate {
            weekday: self.weekday,
            time_slot_id: self.time_slot_id.clone(),
            professor_id: self.professor_id.clone(),
            room_id: self.room_id.clone(),
            class_id: self.class_id.clone(),
        }
    }
}

/// Update payload for an existing lesson. Its cell is not editable through the form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonFields {
    pub professor_id: RecordId,
    #[serde(rename = "sala_id")]
    pub room_id: RecordId,
    #[serde(rename = "disciplina_id")]
    pub discipline_id: RecordId,
}

/// Arguments of the `verificar_conflito` procedure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictCandidate {
    #[serde(rename = "p_dia")]
    pub weekday: Weekday,
    #[serde(rename = "p_horario_id")]
    pub time_slot_id: RecordId,
    #[serde(rename = "p_professor_id")]
    pub professor_id: RecordId,
    #[serde(rename = "p_sala_id")]
    pub room_id: RecordId,
    #[serde(rename = "p_turma_id")]
    pub class_id: RecordId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictDescriptor {
    #[serde(rename = "descricao")]
    pub description: String,
}

/// One row of `buscar_conflitos_turma`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonConflict {
    #[serde(rename = "aula_id")]
    pub lesson_id: RecordId,
    #[serde(rename = "descricao")]
    pub description: String,
}
