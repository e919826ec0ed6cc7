/// Camera handed to a scene for one draw.
///
/// Column-major view-projection matrix, ready to be copied into a uniform
/// buffer.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Camera {
    pub view_proj: [[f32; 4]; 4],
}

impl Camera {
    pub const IDENTITY: Camera = Camera {
        view_proj: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// Orbit camera looking at the origin from `yaw` radians around +Y,
    /// squashed by `aspect` so the scene keeps its proportions.
    pub fn orbit(yaw: f32, aspect: f32) -> Self {
        let (s, c) = yaw.sin_cos();
        let aspect = if aspect.is_finite() && aspect > 0.0 { aspect } else { 1.0 };
        Camera {
            view_proj: [
                [c / aspect, 0.0, -s, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [s / aspect, 0.0, c, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::IDENTITY
    }
}
