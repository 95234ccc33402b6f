//! Campus buildings for realistic test fixtures.
//!
//! Coordinates are taken from OpenStreetMap for university buildings in
//! central Munich plus one outlying research campus.

use openhouse_planner::models::{Coordinates, Location};

/// A named building with coordinates.
#[derive(Debug, Clone, Copy)]
pub struct Building {
    pub id: &'static str,
    pub name: &'static str,
    pub institution: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl Building {
    pub const fn new(
        id: &'static str,
        name: &'static str,
        institution: &'static str,
        lat: f64,
        lng: f64,
    ) -> Self {
        Self { id, name, institution, lat, lng }
    }

    pub fn coords(&self) -> Coordinates {
        Coordinates { latitude: self.lat, longitude: self.lng }
    }

    pub fn location(&self) -> Location {
        Location {
            id: self.id.to_string(),
            name: self.name.to_string(),
            institution_id: Some(self.institution.to_string()),
            coordinates: self.coords(),
        }
    }
}

// ============================================================================
// City campus (walkable, under ~1.5 km apart)
// ============================================================================

pub const TECH_MAIN: Building =
    Building::new("tech-main", "Technical University Main Building", "tech", 48.1497, 11.5679);
pub const TECH_AUDIMAX: Building =
    Building::new("tech-audimax", "Audimax", "tech", 48.1503, 11.5688);
pub const ART_MUSEUM: Building =
    Building::new("pinakothek", "Pinakothek der Moderne", "tech", 48.1471, 11.5721);
pub const UNI_MAIN: Building =
    Building::new("uni-main", "University Main Building", "uni", 48.1508, 11.5803);
pub const UNI_LIBRARY: Building =
    Building::new("uni-library", "University Library", "uni", 48.1503, 11.5810);
pub const APPLIED_LOTH: Building =
    Building::new("applied-loth", "Applied Sciences Lothstrasse", "applied", 48.1545, 11.5545);

// ============================================================================
// Research campus (~15 km north, not walkable between talks)
// ============================================================================

pub const RESEARCH_CAMPUS: Building =
    Building::new("research", "Research Campus Garching", "tech", 48.2650, 11.6710);

pub const CITY_CAMPUS: &[Building] =
    &[TECH_MAIN, TECH_AUDIMAX, ART_MUSEUM, UNI_MAIN, UNI_LIBRARY, APPLIED_LOTH];
