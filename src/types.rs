//! Shared types and enums used across parcelsat.
//! Includes the spectral `Band`s read from a scene, the `SpectralIndex` family
//! computed from them, and the `SelectionMode` used to pick a scene.
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Spectral bands of a Sentinel-2 L2A scene, keyed by their STAC asset names.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    Blue,
    Green,
    Red,
    Nir,
    Swir16,
}

impl Band {
    /// STAC asset key holding this band.
    pub fn asset_key(&self) -> &'static str {
        match self {
            Band::Blue => "blue",
            Band::Green => "green",
            Band::Red => "red",
            Band::Nir => "nir",
            Band::Swir16 => "swir16",
        }
    }
}

impl std::fmt::Display for Band {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.asset_key())
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpectralIndex {
    Ndvi,
    Ndwi,
    Ndmi,
    Evi,
    Savi,
}

impl SpectralIndex {
    pub const ALL: [SpectralIndex; 5] = [
        SpectralIndex::Ndvi,
        SpectralIndex::Ndwi,
        SpectralIndex::Ndmi,
        SpectralIndex::Evi,
        SpectralIndex::Savi,
    ];

    /// Bands the index formula reads.
    pub fn required_bands(&self) -> &'static [Band] {
        match self {
            SpectralIndex::Ndvi | SpectralIndex::Savi => &[Band::Red, Band::Nir],
            SpectralIndex::Ndwi => &[Band::Green, Band::Nir],
            SpectralIndex::Ndmi => &[Band::Nir, Band::Swir16],
            SpectralIndex::Evi => &[Band::Blue, Band::Red, Band::Nir],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SpectralIndex::Ndvi => "ndvi",
            SpectralIndex::Ndwi => "ndwi",
            SpectralIndex::Ndmi => "ndmi",
            SpectralIndex::Evi => "evi",
            SpectralIndex::Savi => "savi",
        }
    }
}

impl std::fmt::Display for SpectralIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// How the best scene is picked from catalog search results.
#[derive(
    Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// Least cloud cover first, most recent breaks ties.
    #[default]
    #[value(alias = "least_cloud")]
    LeastCloud,
    /// Most recent first, least cloud cover breaks ties.
    #[value(alias = "most_recent")]
    MostRecent,
    /// Weighted score of cloud cover and scene age.
    Balanced,
}

impl std::fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectionMode::LeastCloud => write!(f, "least_cloud"),
            SelectionMode::MostRecent => write!(f, "most_recent"),
            SelectionMode::Balanced => write!(f, "balanced"),
        }
    }
}
