//! The mode active before any other is chosen. It ignores all input.

use super::{DrawMode, ModeBase, ModeContext};
use crate::common::{Cursor, ModeType};
use crate::error::DrawResult;
use crate::feature::Feature;
use crate::styling::FeatureStyle;
use crate::validation::{Validation, ValidationContext};
use serde_json::{json, Value};

pub const STATIC_MODE_NAME: &str = "static";

#[derive(Debug)]
pub struct StaticMode {
    base: ModeBase,
}

impl Default for StaticMode {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticMode {
    pub fn new() -> Self {
        Self {
            base: ModeBase::new(STATIC_MODE_NAME),
        }
    }
}

impl DrawMode for StaticMode {
    fn base(&self) -> &ModeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ModeBase {
        &mut self.base
    }

    fn mode_type(&self) -> ModeType {
        ModeType::Static
    }

    fn start(&mut self, ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        self.base.set_started()?;
        ctx.set_cursor(Cursor::Unset);
        Ok(())
    }

    fn cleanup(&mut self, _ctx: &mut ModeContext<'_>) -> DrawResult<()> {
        Ok(())
    }

    fn style_feature(&self, _feature: &Feature) -> FeatureStyle {
        FeatureStyle::default()
    }

    fn validate_feature(&self, _feature: &Feature, _ctx: &ValidationContext<'_>) -> Validation {
        Validation::invalid("The static mode owns no features")
    }

    fn update_options(&mut self, _partial: &Value) -> DrawResult<()> {
        Ok(())
    }

    fn options(&self) -> Value {
        json!({})
    }
}
