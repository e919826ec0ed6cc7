//! Scene-facing rendering types.
//!
//! Scenes are external collaborators: the scheduler only hands them a
//! [`SceneFrame`] (open render pass + camera) and lets them record whatever
//! they draw.

mod camera;
mod ctx;

pub use camera::Camera;
pub use ctx::SceneFrame;
