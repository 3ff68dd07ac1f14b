//! Feature classification.
//!
//! A single ordered pass over the rule table folds a property bag and a
//! geometry kind into one [`Environment`] category. The first matching rule
//! wins; rule order is part of the contract and covered by tests.

use ahash::AHashMap as HashMap;

use crate::GeometryKind;

/// Category a feature renders as. `Unknown` features are dropped by the
/// renderer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Environment {
    Unknown,
    Road,
    Highway,
    Water,
    Border,
    PopulatedPlace,
    Railway,
    Forest,
    Civilian,
    Plain,
    Lakes,
    Buildings,
    Mountains,
    Desert,
    NationalPark,
}

/// Owned key/value bag for one feature. Duplicate keys collapse to the last
/// occurrence.
#[derive(Debug, Default)]
pub struct PropertySet {
    entries: HashMap<String, String>,
}

impl PropertySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn insert(&mut self, key: String, value: String) {
        self.entries.insert(key, value);
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn any_key_starts_with(&self, prefix: &str) -> bool {
        self.entries.keys().any(|key| key.starts_with(prefix))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PropertySet {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut set = Self::new();
        for (key, value) in iter {
            set.insert(key.into(), value.into());
        }

        set
    }
}

/// Road-like `highway` values, matched by prefix. Motorway and trunk rank
/// higher and are handled before this set applies.
const HIGHWAY_TYPES: &[&str] = &[
    "primary",
    "secondary",
    "tertiary",
    "residential",
    "service",
    "unclassified",
    "living_street",
    "pedestrian",
    "track",
    "road",
    "footway",
    "path",
    "cycleway",
];

const CIVILIAN_LANDUSE: &[&str] = &[
    "residential",
    "cemetery",
    "industrial",
    "commercial",
    "square",
    "construction",
    "military",
    "quarry",
    "brownfield",
];

const PLAIN_LANDUSE: &[&str] = &[
    "farm",
    "meadow",
    "grass",
    "greenfield",
    "recreation_ground",
    "winter_sports",
    "allotments",
];

const PLACE_TYPES: &[&str] = &["city", "town", "locality", "hamlet"];

fn starts_with_any(value: &str, prefixes: &[&str]) -> bool {
    prefixes.iter().any(|prefix| value.starts_with(prefix))
}

fn equals_any(value: &str, set: &[&str]) -> bool {
    set.iter().any(|entry| value == *entry)
}

/// Fold `(geometry, properties)` into a category. Comparisons are byte-exact
/// ASCII; prefix matching only where a rule calls for it.
pub fn classify(properties: &PropertySet, geometry: GeometryKind) -> Environment {
    if let Some(highway) = properties.value("highway") {
        if highway == "motorway" || highway == "trunk" {
            return Environment::Highway;
        }

        if starts_with_any(highway, HIGHWAY_TYPES) {
            return Environment::Road;
        }
    }

    if geometry != GeometryKind::Point && properties.any_key_starts_with("water") {
        return Environment::Water;
    }

    if properties.value("boundary") == Some("administrative")
        && properties.value("admin_level") == Some("2")
    {
        return Environment::Border;
    }

    if geometry == GeometryKind::Point
        && let Some(place) = properties.value("place")
        && starts_with_any(place, PLACE_TYPES)
    {
        return Environment::PopulatedPlace;
    }

    if properties.any_key_starts_with("railway") {
        return Environment::Railway;
    }

    if geometry == GeometryKind::Polygon && properties.any_key_starts_with("natural") {
        return match properties.value("natural") {
            Some("fell" | "grassland" | "heath" | "moor" | "scrub" | "wetland") => {
                Environment::Plain
            }
            Some("wood" | "tree_row") => Environment::Forest,
            Some("bare_rock" | "rock" | "scree") => Environment::Mountains,
            Some("beach" | "sand") => Environment::Desert,
            Some("water") => Environment::Lakes,
            _ => Environment::Unknown,
        };
    }

    if let Some(boundary) = properties.value("boundary")
        && boundary.starts_with("forest")
    {
        return Environment::Forest;
    }

    let landuse = properties.value("landuse");

    if let Some(landuse) = landuse
        && (landuse.starts_with("forest") || landuse.starts_with("orchard"))
    {
        return Environment::Forest;
    }

    if geometry == GeometryKind::Polygon
        && let Some(landuse) = landuse
    {
        if starts_with_any(landuse, CIVILIAN_LANDUSE) {
            return Environment::Civilian;
        }

        if equals_any(landuse, PLAIN_LANDUSE) {
            return Environment::Plain;
        }

        if landuse == "reservoir" || landuse == "basin" {
            return Environment::Lakes;
        }
    }

    if geometry == GeometryKind::Polygon {
        if properties.any_key_starts_with("building") {
            return Environment::Buildings;
        }

        if properties.any_key_starts_with("leisure") {
            return Environment::NationalPark;
        }

        if properties.any_key_starts_with("amenity") {
            return Environment::Buildings;
        }
    }

    Environment::Unknown
}
