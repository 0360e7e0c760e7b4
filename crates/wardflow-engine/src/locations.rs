//! Bed management across the hospital's points of care.
//!
//! Each configured point of care holds a set of occupied bed names. Beds are
//! created on demand, so a point of care never runs out: asking for an
//! available bed walks `Bed 1`, `Bed 2`, ... until a free name is found.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use wardflow_core::ir::PatientLocation;
use wardflow_core::metrics::names;
use wardflow_core::{CoreError, MetricsSink, Result};

/// Key of the emergency department definition. Admissions that arrive
/// without a prior admission step fall back to this location, so every
/// configuration must define it.
pub const ED: &str = "ED";

/// Static description of a point of care. Definitions are keyed by point of
/// care name; an unset `poc` field inherits the key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationDefinition {
    pub poc: String,
    pub facility: String,
    pub building: String,
    pub floor: String,
    pub room: String,
    pub location_type: String,
}

struct Room {
    definition: LocationDefinition,
    occupied: HashSet<String>,
}

/// Tracks which beds are occupied in which point of care.
pub struct LocationManager {
    rooms: Mutex<HashMap<String, Room>>,
    metrics: Arc<dyn MetricsSink>,
}

impl std::fmt::Debug for LocationManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocationManager").finish_non_exhaustive()
    }
}

impl LocationManager {
    pub fn new(
        definitions: HashMap<String, LocationDefinition>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Result<Self> {
        if !definitions.contains_key(ED) {
            return Err(CoreError::configuration(
                "no ED location defined; this is a required location",
            ));
        }
        let rooms = definitions
            .into_iter()
            .map(|(name, mut definition)| {
                if definition.poc.is_empty() {
                    definition.poc = name.clone();
                }
                (
                    name,
                    Room {
                        definition,
                        occupied: HashSet::new(),
                    },
                )
            })
            .collect();
        Ok(Self {
            rooms: Mutex::new(rooms),
            metrics,
        })
    }

    /// The emergency department as a patient location, without a bed.
    pub fn ed_location(&self) -> PatientLocation {
        let rooms = self.rooms.lock();
        // Construction guarantees the ED definition exists.
        let definition = rooms
            .get(ED)
            .map(|room| room.definition.clone())
            .unwrap_or_default();
        PatientLocation {
            poc: definition.poc,
            facility: definition.facility,
            location_type: definition.location_type,
            building: definition.building,
            ..Default::default()
        }
    }

    /// Occupies the first free bed in the point of care.
    pub fn occupy_available_bed(&self, poc: &str) -> Result<PatientLocation> {
        let mut rooms = self.rooms.lock();
        let room = rooms
            .get_mut(poc)
            .ok_or_else(|| CoreError::unknown_location(poc))?;
        let mut number = 1u64;
        let bed = loop {
            let candidate = format!("Bed {number}");
            if !room.occupied.contains(&candidate) {
                break candidate;
            }
            number += 1;
        };
        room.occupied.insert(bed.clone());
        self.metrics
            .gauge_add(names::OCCUPIED_BEDS, &[("poc", poc)], 1.0);
        Ok(location_with_bed(&room.definition, bed))
    }

    /// Occupies the named bed in the point of care.
    pub fn occupy_specific_bed(&self, poc: &str, bed: &str) -> Result<PatientLocation> {
        let mut rooms = self.rooms.lock();
        let room = rooms
            .get_mut(poc)
            .ok_or_else(|| CoreError::unknown_location(poc))?;
        if room.occupied.contains(bed) {
            return Err(CoreError::bed_occupied(bed, poc));
        }
        room.occupied.insert(bed.to_string());
        self.metrics
            .gauge_add(names::OCCUPIED_BEDS, &[("poc", poc)], 1.0);
        Ok(location_with_bed(&room.definition, bed.to_string()))
    }

    /// Frees the bed the location names.
    pub fn free_bed(&self, location: &PatientLocation) -> Result<()> {
        if !location.is_bed() {
            return Err(CoreError::NotABed(location.name()));
        }
        let mut rooms = self.rooms.lock();
        let room = rooms
            .get_mut(&location.poc)
            .ok_or_else(|| CoreError::unknown_location(&location.poc))?;
        if !room.occupied.remove(&location.bed) {
            return Err(CoreError::BedAlreadyFree(location.name()));
        }
        self.metrics
            .gauge_add(names::OCCUPIED_BEDS, &[("poc", &location.poc)], -1.0);
        Ok(())
    }

    /// Whether the location belongs to the named point of care. Compares the
    /// static parts only; the bed does not matter.
    pub fn matches(&self, poc: &str, location: &PatientLocation) -> Result<bool> {
        let rooms = self.rooms.lock();
        let definition = &rooms
            .get(poc)
            .ok_or_else(|| CoreError::unknown_location(poc))?
            .definition;
        Ok(definition.poc == location.poc
            && definition.facility == location.facility
            && definition.building == location.building
            && definition.floor == location.floor
            && definition.room == location.room)
    }

    /// How many beds are occupied in the point of care. Zero for unknown
    /// points of care.
    pub fn occupied_beds(&self, poc: &str) -> usize {
        self.rooms
            .lock()
            .get(poc)
            .map_or(0, |room| room.occupied.len())
    }
}

fn location_with_bed(definition: &LocationDefinition, bed: String) -> PatientLocation {
    PatientLocation {
        poc: definition.poc.clone(),
        room: definition.room.clone(),
        bed,
        facility: definition.facility.clone(),
        location_type: definition.location_type.clone(),
        building: definition.building.clone(),
        floor: definition.floor.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wardflow_core::{NullSink, RecordingSink};

    fn definitions() -> HashMap<String, LocationDefinition> {
        let mut map = HashMap::new();
        map.insert(
            ED.to_string(),
            LocationDefinition {
                facility: "NORTH".to_string(),
                location_type: "ED".to_string(),
                ..Default::default()
            },
        );
        map.insert(
            "Renal".to_string(),
            LocationDefinition {
                facility: "NORTH".to_string(),
                location_type: "BED".to_string(),
                ..Default::default()
            },
        );
        map
    }

    fn manager() -> LocationManager {
        LocationManager::new(definitions(), Arc::new(NullSink)).unwrap()
    }

    #[test]
    fn test_requires_ed_definition() {
        let mut defs = definitions();
        defs.remove(ED);
        let err = LocationManager::new(defs, Arc::new(NullSink)).unwrap_err();
        assert!(err.to_string().contains("ED"));
    }

    #[test]
    fn test_available_beds_are_numbered_from_one() {
        let manager = manager();
        let first = manager.occupy_available_bed("Renal").unwrap();
        let second = manager.occupy_available_bed("Renal").unwrap();
        assert_eq!(first.bed, "Bed 1");
        assert_eq!(second.bed, "Bed 2");
        assert_eq!(first.poc, "Renal");
        assert_eq!(manager.occupied_beds("Renal"), 2);
    }

    #[test]
    fn test_freed_bed_is_reused() {
        let manager = manager();
        let first = manager.occupy_available_bed("Renal").unwrap();
        manager.occupy_available_bed("Renal").unwrap();
        manager.free_bed(&first).unwrap();
        let next = manager.occupy_available_bed("Renal").unwrap();
        assert_eq!(next.bed, "Bed 1");
    }

    #[test]
    fn test_specific_bed_conflicts() {
        let manager = manager();
        manager.occupy_specific_bed("Renal", "Bed 7").unwrap();
        let err = manager.occupy_specific_bed("Renal", "Bed 7").unwrap_err();
        assert_eq!(
            err.to_string(),
            "bed Bed 7 in location Renal already occupied"
        );
        assert!(manager.occupy_specific_bed("ICU", "Bed 1").is_err());
    }

    #[test]
    fn test_free_bed_errors() {
        let manager = manager();
        let no_bed = manager.ed_location();
        assert!(matches!(
            manager.free_bed(&no_bed),
            Err(CoreError::NotABed(_))
        ));

        let occupied = manager.occupy_available_bed("Renal").unwrap();
        manager.free_bed(&occupied).unwrap();
        assert!(matches!(
            manager.free_bed(&occupied),
            Err(CoreError::BedAlreadyFree(_))
        ));
    }

    #[test]
    fn test_matches_compares_static_parts() {
        let manager = manager();
        let location = manager.occupy_available_bed("Renal").unwrap();
        assert!(manager.matches("Renal", &location).unwrap());
        assert!(!manager.matches("ED", &location).unwrap());
        assert!(manager.matches("ICU", &location).is_err());
    }

    #[test]
    fn test_occupancy_gauge_tracks_beds() {
        let metrics = Arc::new(RecordingSink::default());
        let manager = LocationManager::new(definitions(), metrics.clone()).unwrap();
        let location = manager.occupy_available_bed("Renal").unwrap();
        assert_eq!(
            metrics.gauge(names::OCCUPIED_BEDS, &[("poc", "Renal")]),
            1.0
        );
        manager.free_bed(&location).unwrap();
        assert_eq!(
            metrics.gauge(names::OCCUPIED_BEDS, &[("poc", "Renal")]),
            0.0
        );
    }
}
