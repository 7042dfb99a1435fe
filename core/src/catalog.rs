//! Curated Malawi catalogs used by the default generator configuration.
//!
//! Lists are static so a default config is reproducible without any data
//! files on disk. Order matters: uniform location sampling indexes into
//! `locations()`, so reordering changes every generated dataset.

/// Catalog of Malawian place names (districts and cities).
pub struct MalawiCatalog;

impl MalawiCatalog {
    /// The 21 districts and cities a synthetic user can live in.
    pub fn locations() -> &'static [&'static str] {
        &[
            "Lilongwe", "Blantyre", "Mzuzu", "Zomba", "Kasungu", "Mangochi", "Karonga",
            "Salima", "Nkhotakota", "Liwonde", "Dedza", "Mchinji", "Mulanje", "Thyolo",
            "Balaka", "Mwanza", "Ntcheu", "Rumphi", "Chitipa", "Nsanje", "Chikhwawa",
        ]
    }

    /// The three cities that get the urban engagement multiplier.
    pub fn urban_locations() -> &'static [&'static str] {
        &["Lilongwe", "Blantyre", "Mzuzu"]
    }

    /// Device classes with their market-share weights.
    pub fn devices() -> &'static [(&'static str, f64)] {
        &[
            ("Android", 0.65),
            ("iOS", 0.20),
            ("KaiOS", 0.08),
            ("Feature Phone", 0.05),
            ("Tablet", 0.01),
            ("Other", 0.01),
        ]
    }

    /// Mobile network operators with subscriber-share weights.
    pub fn networks() -> &'static [(&'static str, f64)] {
        &[("Airtel", 0.55), ("TNM", 0.40), ("MTL", 0.05)]
    }

    pub fn genders() -> &'static [(&'static str, f64)] {
        &[("M", 0.52), ("F", 0.48)]
    }

    pub fn is_urban(location: &str) -> bool {
        Self::urban_locations().contains(&location)
    }
}
