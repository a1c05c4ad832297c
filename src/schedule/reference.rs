use serde::de::DeserializeOwned;
use std::time::Duration;

use super::grid::ViewKind;
use super::remote;
use crate::api::{fetch_all, Discipline, Entity, Professor, RecordStore, Room, SchoolClass, Select, TimeSlot};

/// The small, mostly static lists every grid needs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceData {
    pub professors: Vec<Professor>,
    pub rooms: Vec<Room>,
    pub disciplines: Vec<Discipline>,
    pub classes: Vec<SchoolClass>,
    pub time_slots: Vec<TimeSlot>,
}

impl ReferenceData {
    /// Fetch all five lists. Each fetch stands alone: one that fails leaves
    /// its list empty and the others still load.
    pub async fn load_all<S: RecordStore + ?Sized>(store: &S, timeout: Duration) -> Self {
        let (professors, rooms, disciplines, classes, time_slots) = tokio::join!(
            load_list::<Professor, S>(store, Entity::Professors, timeout),
            load_list::<Room, S>(store, Entity::Rooms, timeout),
            load_list::<Discipline, S>(store, Entity::Disciplines, timeout),
            load_list::<SchoolClass, S>(store, Entity::Classes, timeout),
            load_list::<TimeSlot, S>(store, Entity::TimeSlots, timeout),
        );

        let data = Self {
            professors,
            rooms,
            disciplines,
            classes,
            time_slots,
        };
        tracing::info!(
            professors = data.professors.len(),
            rooms = data.rooms.len(),
            disciplines = data.disciplines.len(),
            classes = data.classes.len(),
            time_slots = data.time_slots.len(),
            "reference data loaded"
        );
        data
    }

    pub fn professor(&self, id: &str) -> Option<&Professor> {
        self.professors.iter().find(|p| p.id == id)
    }

    pub fn room(&self, id: &str) -> Option<&Room> {
        self.rooms.iter().find(|r| r.id == id)
    }

    pub fn discipline(&self, id: &str) -> Option<&Discipline> {
        self.disciplines.iter().find(|d| d.id == id)
    }

    pub fn class(&self, id: &str) -> Option<&SchoolClass> {
        self.classes.iter().find(|c| c.id == id)
    }

    pub fn time_slot(&self, id: &str) -> Option<&TimeSlot> {
        self.time_slots.iter().find(|s| s.id == id)
    }

    /// (id, label) pairs for the item selector of a view kind
    pub fn options_for(&self, kind: ViewKind) -> Vec<(String, String)> {
        match kind {
            ViewKind::Class => self.classes.iter().map(|c| (c.id.clone(), c.display_name())).collect(),
            ViewKind::Professor => self.professors.iter().map(|p| (p.id.clone(), p.name.clone())).collect(),
            ViewKind::Room => self
                .rooms
                .iter()
                .map(|r| {
                    let label = match &r.kind {
                        Some(kind) if !kind.is_empty() => format!("{} ({})", r.name, kind),
                        _ => r.name.clone(),
                    };
                    (r.id.clone(), label)
                })
                .collect(),
        }
    }
}

async fn load_list<T, S>(store: &S, entity: Entity, timeout: Duration) -> Vec<T>
where
    T: DeserializeOwned,
    S: RecordStore + ?Sized,
{
    match remote(timeout, fetch_all::<T, S>(store, &Select::all(entity))).await {
        Ok(rows) => rows,
        Err(e) => {
            tracing::warn!(table = entity.table(), error = %e, "reference list failed to load");
            Vec::new()
        }
    }
}
