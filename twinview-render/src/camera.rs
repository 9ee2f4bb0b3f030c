//! Perspective camera

use nalgebra::{Isometry3, Matrix4, Perspective3, Point3, Translation3, UnitQuaternion, Vector3};

/// Maps OpenGL clip depth `-1..1` to the `0..1` range wgpu uses
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.5,
    0.0, 0.0, 0.0, 1.0,
);

/// Position and orientation of a camera
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub position: Point3<f32>,
    pub rotation: UnitQuaternion<f32>,
}

/// A perspective camera looking down its local -Z axis
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Point3<f32>,
    pub rotation: UnitQuaternion<f32>,
    pub up: Vector3<f32>,
    /// Vertical field of view in degrees
    pub fov: f32,
    pub aspect_ratio: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    /// Create a camera at `position` looking at `target`
    pub fn new(
        position: Point3<f32>,
        target: Point3<f32>,
        up: Vector3<f32>,
        fov: f32,
        aspect_ratio: f32,
        near: f32,
        far: f32,
    ) -> Self {
        let mut camera = Self {
            position,
            rotation: UnitQuaternion::identity(),
            up,
            fov,
            aspect_ratio: 1.0,
            near,
            far,
        };
        camera.set_aspect_ratio(aspect_ratio);
        camera.look_at(&target);
        camera
    }

    /// Orient the camera so it faces `target`
    pub fn look_at(&mut self, target: &Point3<f32>) {
        let back = self.position - target;
        if back.norm_squared() <= f32::EPSILON {
            return;
        }
        // face_towards degenerates when looking straight along the up axis
        let up = if back.cross(&self.up).norm_squared() <= f32::EPSILON {
            Vector3::z()
        } else {
            self.up
        };
        self.rotation = UnitQuaternion::face_towards(&back, &up);
    }

    /// Update the aspect ratio, ignoring degenerate values
    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        if aspect_ratio.is_finite() && aspect_ratio > 0.0 {
            self.aspect_ratio = aspect_ratio;
        }
    }

    pub fn forward(&self) -> Vector3<f32> {
        self.rotation * -Vector3::z()
    }

    pub fn right(&self) -> Vector3<f32> {
        self.rotation * Vector3::x()
    }

    /// Camera-space up axis in world coordinates
    pub fn up_axis(&self) -> Vector3<f32> {
        self.rotation * Vector3::y()
    }

    pub fn pose(&self) -> CameraPose {
        CameraPose {
            position: self.position,
            rotation: self.rotation,
        }
    }

    pub fn set_pose(&mut self, pose: CameraPose) {
        self.position = pose.position;
        self.rotation = pose.rotation;
    }

    /// Get the view matrix
    pub fn view_matrix(&self) -> Matrix4<f32> {
        Isometry3::from_parts(Translation3::from(self.position.coords), self.rotation)
            .inverse()
            .to_homogeneous()
    }

    /// Get the projection matrix, with wgpu depth conventions
    pub fn projection_matrix(&self) -> Matrix4<f32> {
        let perspective = Perspective3::new(self.aspect_ratio, self.fov.to_radians(), self.near, self.far);
        OPENGL_TO_WGPU_MATRIX * perspective.to_homogeneous()
    }

    pub fn view_projection_matrix(&self) -> Matrix4<f32> {
        self.projection_matrix() * self.view_matrix()
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(
            Point3::new(0.0, 0.0, 3.0),
            Point3::origin(),
            Vector3::y(),
            45.0,
            1.0,
            0.1,
            1000.0,
        )
    }
}
