//! Feature validation.
//!
//! Validators are plain functions over a candidate feature. They report
//! invalid data through [`Validation`] and never fail the call.

mod rules;

pub use rules::{
    validate_linestring, validate_max_area, validate_min_area, validate_non_self_intersecting,
    validate_point, validate_polygon, AreaLimits, REASON_INVALID_COORDINATES, REASON_NOT_A_LINESTRING,
    REASON_NOT_A_POINT, REASON_NOT_A_POLYGON, REASON_SELF_INTERSECTS, REASON_TOO_LARGE,
    REASON_TOO_SMALL,
};

use crate::adapter::DrawAdapter;
use crate::common::UpdateType;
use crate::feature::{Feature, FeatureId, Position};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// Verdict of a validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validation {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Validation {
    pub fn valid() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: Some(reason.into()),
        }
    }

    /// Run `next` only if `self` passed.
    pub fn and_then(self, next: impl FnOnce() -> Validation) -> Validation {
        if self.valid { next() } else { self }
    }
}

/// Per-feature outcome of `add_features`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureValidationResult {
    pub id: FeatureId,
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl FeatureValidationResult {
    pub fn new(id: FeatureId, validation: &Validation) -> Self {
        Self {
            id,
            valid: validation.valid,
            reason: validation.reason.clone(),
        }
    }
}

/// What a validator may consult besides the feature itself.
pub struct ValidationContext<'a> {
    pub adapter: &'a dyn DrawAdapter,
    pub coordinate_precision: u32,
    pub update_type: UpdateType,
}

impl<'a> ValidationContext<'a> {
    pub fn new(adapter: &'a dyn DrawAdapter, update_type: UpdateType) -> Self {
        Self {
            adapter,
            coordinate_precision: adapter.coordinate_precision(),
            update_type,
        }
    }

    pub fn project(&self, lng: f64, lat: f64) -> Point {
        self.adapter.project(lng, lat)
    }

    pub fn unproject(&self, x: f64, y: f64) -> Option<Position> {
        self.adapter.unproject(x, y)
    }
}

/// A user supplied validator, composed with a mode's built-in checks.
pub type Validator = Rc<dyn Fn(&Feature, &ValidationContext<'_>) -> Validation>;

/// Built-in check first, then the optional user validator. Both must pass.
pub fn compose(
    builtin: Validation,
    user: Option<&Validator>,
    feature: &Feature,
    ctx: &ValidationContext<'_>,
) -> Validation {
    builtin.and_then(|| match user {
        Some(validator) => validator(feature, ctx),
        None => Validation::valid(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::HeadlessAdapter;
    use crate::feature::{Geometry, Properties};

    #[test]
    fn test_compose_requires_both() {
        let adapter = HeadlessAdapter::default();
        let ctx = ValidationContext::new(&adapter, UpdateType::Finish);
        let feature = Feature::new(FeatureId::from(1), Geometry::Point([0.0, 0.0]), Properties::new());
        let reject: Validator = Rc::new(|_, _| Validation::invalid("user says no"));

        assert!(compose(Validation::valid(), None, &feature, &ctx).valid);
        let result = compose(Validation::valid(), Some(&reject), &feature, &ctx);
        assert_eq!(result.reason.as_deref(), Some("user says no"));

        // Built-in failure short-circuits the user validator
        let result = compose(Validation::invalid("builtin"), Some(&reject), &feature, &ctx);
        assert_eq!(result.reason.as_deref(), Some("builtin"));
    }

    #[test]
    fn test_context_exposes_precision() {
        let adapter = HeadlessAdapter::default();
        let ctx = ValidationContext::new(&adapter, UpdateType::Provisional);
        assert_eq!(ctx.coordinate_precision, adapter.coordinate_precision());
        let p = ctx.project(0.0, 0.0);
        let back = ctx.unproject(p.x, p.y).unwrap();
        assert!(back[0].abs() < 1e-9 && back[1].abs() < 1e-9);
    }
}
