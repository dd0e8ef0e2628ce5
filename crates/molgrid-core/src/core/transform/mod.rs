//! Rigid transformations applied to coordinates before gridding.

pub mod quaternion;
pub mod transform;

pub use quaternion::Quaternion;
pub use transform::Transform;
