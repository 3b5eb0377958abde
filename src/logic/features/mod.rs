//! Features Module - flow feature schema, vectors and scaling

pub mod layout;
pub mod scaler;
pub mod vector;

pub use layout::{feature_index, layout_hash, LayoutInfo, SchemaMismatch, FEATURE_COUNT, FEATURE_LAYOUT};
pub use scaler::FeatureScaler;
pub use vector::{FeatureVector, FeatureVectorBuilder};
