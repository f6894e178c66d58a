//! The fixed filter taxonomy: category → group → type.
//!
//! Each level is a plain enum with constant lookups; children know their
//! parent and parents list their children. Adding a filter type means
//! touching the tables here and the dispatch in [`crate::engine`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterCategory {
    /// Geometric filters driven by face landmarks.
    Sizes,
    /// Color filters composited through the hair mask.
    Hair,
}

impl FilterCategory {
    pub const ALL: [FilterCategory; 2] = [FilterCategory::Sizes, FilterCategory::Hair];

    pub fn name(&self) -> &'static str {
        match self {
            FilterCategory::Sizes => "Sizes",
            FilterCategory::Hair => "Hair",
        }
    }

    pub fn groups(&self) -> &'static [FilterGroup] {
        match self {
            FilterCategory::Sizes => &[FilterGroup::Head],
            FilterCategory::Hair => &[
                FilterGroup::HairColors,
                FilterGroup::Temperature,
                FilterGroup::Tint,
                FilterGroup::Saturation,
                FilterGroup::OtherColorEffects,
            ],
        }
    }

    pub fn filter_types(&self) -> impl Iterator<Item = FilterType> {
        self.groups().iter().flat_map(|g| g.filter_types().iter().copied())
    }
}

impl fmt::Display for FilterCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterGroup {
    Head,
    HairColors,
    Temperature,
    Tint,
    Saturation,
    OtherColorEffects,
}

impl FilterGroup {
    pub const ALL: [FilterGroup; 6] = [
        FilterGroup::Head,
        FilterGroup::HairColors,
        FilterGroup::Temperature,
        FilterGroup::Tint,
        FilterGroup::Saturation,
        FilterGroup::OtherColorEffects,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FilterGroup::Head => "Head",
            FilterGroup::HairColors => "Hair Colors",
            FilterGroup::Temperature => "Temperature",
            FilterGroup::Tint => "Tint",
            FilterGroup::Saturation => "Saturation",
            FilterGroup::OtherColorEffects => "Other Color Effects",
        }
    }

    pub fn category(&self) -> FilterCategory {
        match self {
            FilterGroup::Head => FilterCategory::Sizes,
            FilterGroup::HairColors
            | FilterGroup::Temperature
            | FilterGroup::Tint
            | FilterGroup::Saturation
            | FilterGroup::OtherColorEffects => FilterCategory::Hair,
        }
    }

    pub fn filter_types(&self) -> &'static [FilterType] {
        use FilterType::*;
        match self {
            FilterGroup::Head => &[HeadSize],
            FilterGroup::HairColors => &[
                HairColorBlack,
                HairColorDarkBrown,
                HairColorBrown,
                HairColorLightBrown,
                HairColorBlonde,
                HairColorPlatinumBlonde,
                HairColorRed,
                HairColorAuburn,
                HairColorCopper,
                HairColorBurgundy,
            ],
            FilterGroup::Temperature => &[Warmth, Coolness, Balance],
            FilterGroup::Tint => &[MagentaGreen, TintBalance, ColorCast],
            FilterGroup::Saturation => &[Vibrance, Intensity, Richness],
            FilterGroup::OtherColorEffects => &[Hue, ColorTone, Highlights],
        }
    }
}

impl fmt::Display for FilterGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Closed hair color palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HairColor {
    Black,
    DarkBrown,
    Brown,
    LightBrown,
    Blonde,
    PlatinumBlonde,
    Red,
    Auburn,
    Copper,
    Burgundy,
}

impl HairColor {
    /// Target color as linear-ish RGB in [0, 1].
    pub fn rgb(&self) -> [f32; 3] {
        match self {
            HairColor::Black => [0.1, 0.05, 0.05],
            HairColor::DarkBrown => [0.2, 0.1, 0.05],
            HairColor::Brown => [0.4, 0.25, 0.15],
            HairColor::LightBrown => [0.5, 0.35, 0.2],
            HairColor::Blonde => [0.8, 0.7, 0.5],
            HairColor::PlatinumBlonde => [0.9, 0.9, 0.85],
            HairColor::Red => [0.7, 0.2, 0.1],
            HairColor::Auburn => [0.5, 0.2, 0.1],
            HairColor::Copper => [0.7, 0.35, 0.15],
            HairColor::Burgundy => [0.4, 0.1, 0.15],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            HairColor::Black => "Black",
            HairColor::DarkBrown => "Dark Brown",
            HairColor::Brown => "Brown",
            HairColor::LightBrown => "Light Brown",
            HairColor::Blonde => "Blonde",
            HairColor::PlatinumBlonde => "Platinum Blonde",
            HairColor::Red => "Red",
            HairColor::Auburn => "Auburn",
            HairColor::Copper => "Copper",
            HairColor::Burgundy => "Burgundy",
        }
    }
}

/// Leaf filter identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterType {
    HeadSize,

    HairColorBlack,
    HairColorDarkBrown,
    HairColorBrown,
    HairColorLightBrown,
    HairColorBlonde,
    HairColorPlatinumBlonde,
    HairColorRed,
    HairColorAuburn,
    HairColorCopper,
    HairColorBurgundy,

    Warmth,
    Coolness,
    Balance,

    MagentaGreen,
    TintBalance,
    ColorCast,

    Vibrance,
    Intensity,
    Richness,

    Hue,
    ColorTone,
    Highlights,
}

impl FilterType {
    pub const ALL: [FilterType; 23] = [
        FilterType::HeadSize,
        FilterType::HairColorBlack,
        FilterType::HairColorDarkBrown,
        FilterType::HairColorBrown,
        FilterType::HairColorLightBrown,
        FilterType::HairColorBlonde,
        FilterType::HairColorPlatinumBlonde,
        FilterType::HairColorRed,
        FilterType::HairColorAuburn,
        FilterType::HairColorCopper,
        FilterType::HairColorBurgundy,
        FilterType::Warmth,
        FilterType::Coolness,
        FilterType::Balance,
        FilterType::MagentaGreen,
        FilterType::TintBalance,
        FilterType::ColorCast,
        FilterType::Vibrance,
        FilterType::Intensity,
        FilterType::Richness,
        FilterType::Hue,
        FilterType::ColorTone,
        FilterType::Highlights,
    ];

    /// Stable snake_case identifier.
    pub fn key(&self) -> &'static str {
        match self {
            FilterType::HeadSize => "head_size",
            FilterType::HairColorBlack => "hair_color_black",
            FilterType::HairColorDarkBrown => "hair_color_dark_brown",
            FilterType::HairColorBrown => "hair_color_brown",
            FilterType::HairColorLightBrown => "hair_color_light_brown",
            FilterType::HairColorBlonde => "hair_color_blonde",
            FilterType::HairColorPlatinumBlonde => "hair_color_platinum_blonde",
            FilterType::HairColorRed => "hair_color_red",
            FilterType::HairColorAuburn => "hair_color_auburn",
            FilterType::HairColorCopper => "hair_color_copper",
            FilterType::HairColorBurgundy => "hair_color_burgundy",
            FilterType::Warmth => "warmth",
            FilterType::Coolness => "coolness",
            FilterType::Balance => "balance",
            FilterType::MagentaGreen => "magenta_green",
            FilterType::TintBalance => "tint_balance",
            FilterType::ColorCast => "color_cast",
            FilterType::Vibrance => "vibrance",
            FilterType::Intensity => "intensity",
            FilterType::Richness => "richness",
            FilterType::Hue => "hue",
            FilterType::ColorTone => "color_tone",
            FilterType::Highlights => "highlights",
        }
    }

    /// Title-cased key, e.g. "Hair Color Dark Brown".
    pub fn display_name(&self) -> String {
        self.key()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn group(&self) -> FilterGroup {
        use FilterType::*;
        match self {
            HeadSize => FilterGroup::Head,
            HairColorBlack | HairColorDarkBrown | HairColorBrown | HairColorLightBrown
            | HairColorBlonde | HairColorPlatinumBlonde | HairColorRed | HairColorAuburn
            | HairColorCopper | HairColorBurgundy => FilterGroup::HairColors,
            Warmth | Coolness | Balance => FilterGroup::Temperature,
            MagentaGreen | TintBalance | ColorCast => FilterGroup::Tint,
            Vibrance | Intensity | Richness => FilterGroup::Saturation,
            Hue | ColorTone | Highlights => FilterGroup::OtherColorEffects,
        }
    }

    pub fn category(&self) -> FilterCategory {
        self.group().category()
    }

    /// Palette entry for hair color filters.
    pub fn hair_color(&self) -> Option<HairColor> {
        Some(match self {
            FilterType::HairColorBlack => HairColor::Black,
            FilterType::HairColorDarkBrown => HairColor::DarkBrown,
            FilterType::HairColorBrown => HairColor::Brown,
            FilterType::HairColorLightBrown => HairColor::LightBrown,
            FilterType::HairColorBlonde => HairColor::Blonde,
            FilterType::HairColorPlatinumBlonde => HairColor::PlatinumBlonde,
            FilterType::HairColorRed => HairColor::Red,
            FilterType::HairColorAuburn => HairColor::Auburn,
            FilterType::HairColorCopper => HairColor::Copper,
            FilterType::HairColorBurgundy => HairColor::Burgundy,
            _ => return None,
        })
    }
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for FilterType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        FilterType::ALL
            .into_iter()
            .find(|t| t.key() == key)
            .ok_or_else(|| Error::UnknownFilter(s.to_string()))
    }
}

/// A filter selection as passed to the engine. Intensity is not clamped here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterConfiguration {
    pub filter: FilterType,
    pub intensity: f32,
}

impl FilterConfiguration {
    pub fn new(filter: FilterType, intensity: f32) -> Self {
        Self { filter, intensity }
    }

    pub fn update_intensity(&mut self, intensity: f32) {
        self.intensity = intensity;
    }

    pub fn category(&self) -> FilterCategory {
        self.filter.category()
    }
}

/// A user-facing filter slot with bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub id: Uuid,
    pub filter_type: FilterType,
    pub name: String,
    intensity: f32,
    pub min_value: f32,
    pub max_value: f32,
    pub default_value: f32,
}

impl Filter {
    pub fn new(filter_type: FilterType) -> Self {
        Self::with_intensity(filter_type, 0.0)
    }

    /// Create a filter with an initial intensity, clamped to the bounds.
    pub fn with_intensity(filter_type: FilterType, intensity: f32) -> Self {
        let mut filter = Self {
            id: Uuid::new_v4(),
            filter_type,
            name: filter_type.display_name(),
            intensity: 0.0,
            min_value: -1.0,
            max_value: 1.0,
            default_value: 0.0,
        };
        filter.update_intensity(intensity);
        filter
    }

    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    pub fn group(&self) -> FilterGroup {
        self.filter_type.group()
    }

    pub fn category(&self) -> FilterCategory {
        self.filter_type.category()
    }

    pub fn is_active(&self) -> bool {
        self.intensity != self.default_value
    }

    pub fn update_intensity(&mut self, value: f32) {
        self.intensity = value.clamp(self.min_value, self.max_value);
    }

    pub fn reset(&mut self) {
        self.intensity = self.default_value;
    }

    pub fn configuration(&self) -> FilterConfiguration {
        FilterConfiguration::new(self.filter_type, self.intensity)
    }
}
