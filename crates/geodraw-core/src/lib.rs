//! GeoDraw Core Library
//!
//! Renderer-agnostic engine for drawing and editing GeoJSON points, lines and
//! polygons on a map. A map renderer plugs in through [`DrawAdapter`].

pub mod adapter;
pub mod behaviors;
pub mod common;
pub mod draw;
pub mod error;
pub mod events;
pub mod feature;
pub mod geometry;
pub mod modes;
pub mod store;
pub mod styling;
pub mod validation;

pub use adapter::{DrawAdapter, HeadlessAdapter, RenderChangeset, Viewport};
pub use behaviors::FeatureQueryOptions;
pub use common::{
    property, Cursor, DrawKeyboardEvent, DrawPointerEvent, FinishAction, FinishContext, ModeType, MouseButton,
    UpdateType,
};
pub use draw::{DrawConfig, GeoDraw};
pub use error::{DrawError, DrawResult};
pub use events::{DrawEvent, DrawEventKind, EventRegistry, Listener};
pub use feature::{Feature, FeatureId, Geometry, GeometryType, Position, Properties};
pub use modes::{DrawMode, Mode, ModeState};
pub use store::{ChangeKind, GeoJsonStore, IdStrategy, IncrementingStrategy, Origin, UuidStrategy};
pub use styling::{FeatureStyle, HexColor, StyleOptions};
pub use validation::{FeatureValidationResult, Validation, ValidationContext, Validator};
