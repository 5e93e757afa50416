//! Feature styling resolved per mode.

use crate::common::property;
use crate::feature::{Feature, Geometry};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Serializable RGB color, written as a `#rrggbb` hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl HexColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const fn white() -> Self {
        Self::new(255, 255, 255)
    }

    /// The default drawing blue.
    pub const fn blue() -> Self {
        Self::new(0x3f, 0x97, 0xe0)
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for HexColor {
    type Err = String;

    /// Accepts `#rgb` and `#rrggbb`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .strip_prefix('#')
            .ok_or_else(|| format!("color '{s}' must start with '#'"))?;
        if !hex.is_ascii() {
            return Err(format!("invalid color '{s}'"));
        }
        let channel = |h: &str| u8::from_str_radix(h, 16).map_err(|_| format!("invalid color '{s}'"));
        match hex.len() {
            3 => {
                let expand = |i: usize| channel(&hex[i..i + 1].repeat(2));
                Ok(Self::new(expand(0)?, expand(1)?, expand(2)?))
            }
            6 => Ok(Self::new(channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?)),
            _ => Err(format!("invalid color '{s}'")),
        }
    }
}

impl TryFrom<String> for HexColor {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HexColor> for String {
    fn from(color: HexColor) -> Self {
        color.to_string()
    }
}

/// Fully resolved style handed to the adapter for one feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureStyle {
    pub point_color: HexColor,
    pub point_width: f64,
    pub point_outline_color: HexColor,
    pub point_outline_width: f64,
    pub polygon_fill_color: HexColor,
    pub polygon_fill_opacity: f64,
    pub polygon_outline_color: HexColor,
    pub polygon_outline_width: f64,
    pub line_string_color: HexColor,
    pub line_string_width: f64,
    pub z_index: i32,
}

impl Default for FeatureStyle {
    fn default() -> Self {
        Self {
            point_color: HexColor::blue(),
            point_width: 6.0,
            point_outline_color: HexColor::white(),
            point_outline_width: 0.0,
            polygon_fill_color: HexColor::blue(),
            polygon_fill_opacity: 0.3,
            polygon_outline_color: HexColor::blue(),
            polygon_outline_width: 4.0,
            line_string_color: HexColor::blue(),
            line_string_width: 4.0,
            z_index: 0,
        }
    }
}

/// Overrides for point-shaped features in one role.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PointStyle {
    pub color: Option<HexColor>,
    pub width: Option<f64>,
    pub outline_color: Option<HexColor>,
    pub outline_width: Option<f64>,
}

/// Style overrides a mode exposes through its options. Unset values fall
/// back to [`FeatureStyle::default`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StyleOptions {
    pub fill_color: Option<HexColor>,
    pub fill_opacity: Option<f64>,
    pub outline_color: Option<HexColor>,
    pub outline_width: Option<f64>,
    pub line_color: Option<HexColor>,
    pub line_width: Option<f64>,
    pub z_index: Option<i32>,
    pub point: PointStyle,
    pub closing_point: PointStyle,
    pub coordinate_point: PointStyle,
    pub snapping_point: PointStyle,
    pub selection_point: PointStyle,
    pub mid_point: PointStyle,
}

/// Guidance points draw above the geometry they belong to.
const GUIDANCE_Z_OFFSET: i32 = 10;

impl StyleOptions {
    fn role_point_style(&self, feature: &Feature) -> &PointStyle {
        if feature.flag(property::CLOSING_POINT) {
            &self.closing_point
        } else if feature.flag(property::SNAPPING_POINT) {
            &self.snapping_point
        } else if feature.flag(property::SELECTION_POINT) {
            &self.selection_point
        } else if feature.flag(property::MID_POINT) {
            &self.mid_point
        } else if feature.flag(property::COORDINATE_POINT) {
            &self.coordinate_point
        } else {
            &self.point
        }
    }

    /// Resolve the style of `feature`, applying role overrides for guidance
    /// points.
    pub fn resolve(&self, feature: &Feature) -> FeatureStyle {
        let mut style = FeatureStyle::default();
        if let Some(c) = self.fill_color {
            style.polygon_fill_color = c;
        }
        if let Some(o) = self.fill_opacity {
            style.polygon_fill_opacity = o.clamp(0.0, 1.0);
        }
        if let Some(c) = self.outline_color {
            style.polygon_outline_color = c;
        }
        if let Some(w) = self.outline_width {
            style.polygon_outline_width = w;
        }
        if let Some(c) = self.line_color {
            style.line_string_color = c;
        }
        if let Some(w) = self.line_width {
            style.line_string_width = w;
        }
        if let Some(z) = self.z_index {
            style.z_index = z;
        }

        if matches!(feature.geometry, Geometry::Point(_)) {
            let point = self.role_point_style(feature);
            if let Some(c) = point.color.or(self.point.color) {
                style.point_color = c;
            }
            if let Some(w) = point.width.or(self.point.width) {
                style.point_width = w;
            }
            if let Some(c) = point.outline_color.or(self.point.outline_color) {
                style.point_outline_color = c;
            }
            if let Some(w) = point.outline_width.or(self.point.outline_width) {
                style.point_outline_width = w;
            }
            if feature.is_guidance() {
                style.z_index += GUIDANCE_Z_OFFSET;
            }
        }
        style
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{properties, FeatureId};
    use serde_json::json;

    #[test]
    fn test_hex_color_parsing() {
        assert_eq!("#ff0000".parse::<HexColor>(), Ok(HexColor::new(255, 0, 0)));
        assert_eq!("#0f0".parse::<HexColor>(), Ok(HexColor::new(0, 255, 0)));
        assert!("ff0000".parse::<HexColor>().is_err());
        assert!("#12345".parse::<HexColor>().is_err());
        assert_eq!(HexColor::blue().to_string(), "#3f97e0");
    }

    #[test]
    fn test_color_serde() {
        let options: StyleOptions = serde_json::from_value(json!({
            "fillColor": "#00ff00",
            "closingPoint": { "color": "#ffffff", "width": 8.0 }
        }))
        .unwrap();
        assert_eq!(options.fill_color, Some(HexColor::new(0, 255, 0)));
        assert_eq!(serde_json::to_value(options.fill_color).unwrap(), json!("#00ff00"));

        let bad: Result<StyleOptions, _> = serde_json::from_value(json!({ "fillColor": "green" }));
        assert!(bad.is_err());
    }

    #[test]
    fn test_role_overrides() {
        let options = StyleOptions {
            point: PointStyle {
                color: Some(HexColor::new(1, 2, 3)),
                ..Default::default()
            },
            closing_point: PointStyle {
                width: Some(10.0),
                ..Default::default()
            },
            ..Default::default()
        };
        let closing = Feature::new(
            FeatureId::from(1),
            Geometry::Point([0.0, 0.0]),
            properties([(property::CLOSING_POINT, json!(true))]),
        );
        let style = options.resolve(&closing);
        assert_eq!(style.point_width, 10.0);
        // Falls back to the generic point override
        assert_eq!(style.point_color, HexColor::new(1, 2, 3));
        assert_eq!(style.z_index, GUIDANCE_Z_OFFSET);
    }
}
