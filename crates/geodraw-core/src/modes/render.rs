//! Display-only layer for features added through the API.

use super::{merge_options, validate_owned, DrawMode, ModeBase, ModeContext};
use crate::common::{ModeType, UpdateType};
use crate::error::DrawResult;
use crate::feature::{Feature, GeometryType};
use crate::styling::{FeatureStyle, StyleOptions};
use crate::validation::{Validation, ValidationContext};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct RenderOptions {
    /// Geometry types this layer accepts.
    pub geometry_types: Vec<GeometryType>,
    pub styles: StyleOptions,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            geometry_types: vec![GeometryType::Point, GeometryType::LineString, GeometryType::Polygon],
            styles: StyleOptions::default(),
        }
    }
}

/// Renders features but reacts to no input. Register one per layer, each
/// under its own name.
pub struct RenderMode {
    base: ModeBase,
    options: RenderOptions,
}

impl RenderMode {
    pub fn new(name: impl Into<String>, options: RenderOptions) -> Self {
        Self {
            base: ModeBase::new(name),
            options,
        }
    }
}

impl DrawMode for RenderMode {
    fn base(&self) -> &ModeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ModeBase {
        &mut self.base
    }

    fn mode_type(&self) -> ModeType {
        ModeType::Render
    }

    fn start(&mut self, _ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        self.base.set_started()
    }

    fn cleanup(&mut self, _ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        Ok(())
    }

    fn style_feature(&self, feature: &Feature) -> FeatureStyle {
        self.options.styles.resolve(feature)
    }

    fn validate_feature(&self, feature: &Feature, ctx: &ValidationContext<'_>) -> Validation {
        let geometry_type = feature.geometry.geometry_type();
        if !self.options.geometry_types.contains(&geometry_type) {
            return Validation::invalid(format!("{geometry_type} is not rendered by '{}'", self.name()));
        }
        // Loaded shapes are trusted not to self-intersect
        let ctx = ValidationContext {
            update_type: UpdateType::Provisional,
            ..*ctx
        };
        validate_owned(feature, self.name(), geometry_type, &ctx)
    }

    fn update_options(&mut self, partial: &Value) -> DrawResult<()> {
        self.options = merge_options(self.name(), &self.options, partial)?;
        Ok(())
    }

    fn options(&self) -> Value {
        serde_json::to_value(&self.options).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::HeadlessAdapter;
    use crate::common::property;
    use crate::feature::{properties, FeatureId, Geometry};
    use serde_json::json;

    #[test]
    fn test_render_accepts_configured_types_only() {
        let mode = RenderMode::new(
            "background",
            RenderOptions {
                geometry_types: vec![GeometryType::Polygon],
                ..Default::default()
            },
        );
        let adapter = HeadlessAdapter::default();
        let ctx = ValidationContext::new(&adapter, UpdateType::Commit);
        let props = properties([(property::MODE, json!("background"))]);
        let point = Feature::new(FeatureId::from(1), Geometry::Point([0.0, 0.0]), props.clone());
        let square = Feature::new(
            FeatureId::from(2),
            Geometry::Polygon(vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]),
            props,
        );
        assert!(!mode.validate_feature(&point, &ctx).valid);
        assert!(mode.validate_feature(&square, &ctx).valid);
        assert_eq!(mode.mode_type(), ModeType::Render);
    }
}
