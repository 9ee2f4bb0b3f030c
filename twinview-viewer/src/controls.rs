//! Damped orbit camera controller
//!
//! Orbits the camera around a target point in spherical coordinates with Y up.
//! Input (drag, pan, wheel) only accumulates deltas; [`OrbitControls::update`]
//! applies a fraction of them each frame and lets the rest decay, which gives
//! the camera its inertia.

use std::f32::consts::PI;

use nalgebra::{Point3, UnitQuaternion, Vector3};
use twinview_render::Camera;

use crate::config::ControlsConfig;

const EPS: f32 = 1e-6;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct SphericalDelta {
    theta: f32,
    phi: f32,
}

/// Orbit, pan and dolly controller for a perspective camera
#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub config: ControlsConfig,
    pub target: Point3<f32>,

    target0: Point3<f32>,
    position0: Point3<f32>,

    spherical_delta: SphericalDelta,
    pan_offset: Vector3<f32>,
    scale: f32,

    last_position: Point3<f32>,
    last_rotation: UnitQuaternion<f32>,
}

impl OrbitControls {
    /// Create a controller orbiting `target`, remembering the camera's current
    /// position as the state [`reset`](Self::reset) returns to
    pub fn new(camera: &Camera, target: Point3<f32>, config: ControlsConfig) -> Self {
        Self {
            config,
            target,
            target0: target,
            position0: camera.position,
            spherical_delta: SphericalDelta::default(),
            pan_offset: Vector3::zeros(),
            scale: 1.0,
            last_position: camera.position,
            last_rotation: camera.rotation,
        }
    }

    /// Rotate by a pointer drag of `dx`, `dy` pixels inside a viewport `height` pixels tall
    pub fn rotate(&mut self, dx: f32, dy: f32, height: f32) {
        if height <= 0.0 {
            return;
        }
        self.spherical_delta.theta -= 2.0 * PI * dx / height * self.config.rotate_speed;
        self.spherical_delta.phi -= 2.0 * PI * dy / height * self.config.rotate_speed;
    }

    /// Move the target in screen space by a drag of `dx`, `dy` pixels
    pub fn pan(&mut self, dx: f32, dy: f32, height: f32, camera: &Camera) {
        if height <= 0.0 {
            return;
        }
        let target_distance = (camera.position - self.target).norm() * (camera.fov.to_radians() / 2.0).tan();
        let dx = dx * self.config.pan_speed;
        let dy = dy * self.config.pan_speed;

        self.pan_offset -= camera.right() * (2.0 * dx * target_distance / height);
        self.pan_offset += camera.up_axis() * (2.0 * dy * target_distance / height);
    }

    /// Dolly towards the target by `steps` wheel notches; negative steps move away
    pub fn zoom(&mut self, steps: f32) {
        self.scale *= self.zoom_scale().powf(steps);
    }

    fn zoom_scale(&self) -> f32 {
        0.95f32.powf(self.config.zoom_speed)
    }

    /// True while damped motion is still being applied
    pub fn is_moving(&self) -> bool {
        self.spherical_delta.theta.abs() > EPS
            || self.spherical_delta.phi.abs() > EPS
            || self.pan_offset.norm_squared() > EPS * EPS
            || (self.scale - 1.0).abs() > EPS
    }

    /// Advance the controller by `dt` seconds and move `camera` accordingly.
    ///
    /// Returns whether the camera pose changed noticeably since the last reported change.
    pub fn update(&mut self, camera: &mut Camera, dt: f32) -> bool {
        // Work in a frame where the camera's up vector is +Y
        let to_y_up = UnitQuaternion::rotation_between(&camera.up, &Vector3::y()).unwrap_or_else(UnitQuaternion::identity);

        let offset = to_y_up * (camera.position - self.target);
        let mut radius = offset.norm();
        let mut theta = offset.x.atan2(offset.z);
        let mut phi = if radius > 0.0 {
            (offset.y / radius).clamp(-1.0, 1.0).acos()
        } else {
            0.0
        };

        if self.config.auto_rotate && self.config.auto_rotate_period > 0.0 {
            self.spherical_delta.theta -= 2.0 * PI * dt.max(0.0) / self.config.auto_rotate_period;
        }

        let damping = if self.config.enable_damping {
            self.config.damping_factor
        } else {
            1.0
        };

        theta += self.spherical_delta.theta * damping;
        phi += self.spherical_delta.phi * damping;
        phi = phi.clamp(EPS, PI - EPS);

        radius = (radius * self.scale).clamp(self.config.min_distance, self.config.max_distance);

        self.target += self.pan_offset * damping;

        let offset = Vector3::new(
            radius * phi.sin() * theta.sin(),
            radius * phi.cos(),
            radius * phi.sin() * theta.cos(),
        );
        camera.position = self.target + to_y_up.inverse() * offset;
        camera.look_at(&self.target);

        if self.config.enable_damping {
            let decay = 1.0 - self.config.damping_factor;
            self.spherical_delta.theta *= decay;
            self.spherical_delta.phi *= decay;
            self.pan_offset *= decay;
        } else {
            self.spherical_delta = SphericalDelta::default();
            self.pan_offset = Vector3::zeros();
        }
        self.scale = 1.0;

        let moved = (self.last_position - camera.position).norm_squared() > EPS;
        let turned = 8.0 * (1.0 - self.last_rotation.coords.dot(&camera.rotation.coords).abs()) > EPS;
        if moved || turned {
            self.acknowledge(camera);
            true
        } else {
            false
        }
    }

    /// Return the target and camera to the saved state and drop pending motion
    pub fn reset(&mut self, camera: &mut Camera) {
        self.target = self.target0;
        camera.position = self.position0;
        camera.look_at(&self.target);

        self.spherical_delta = SphericalDelta::default();
        self.pan_offset = Vector3::zeros();
        self.scale = 1.0;

        self.update(camera, 0.0);
        self.acknowledge(camera);
    }

    /// Take over a pose another controller produced without reporting it as a change
    pub fn follow(&mut self, target: Point3<f32>, camera: &Camera) {
        self.target = target;
        self.spherical_delta = SphericalDelta::default();
        self.pan_offset = Vector3::zeros();
        self.scale = 1.0;
        self.acknowledge(camera);
    }

    /// Treat the camera's current pose as already reported
    pub fn acknowledge(&mut self, camera: &Camera) {
        self.last_position = camera.position;
        self.last_rotation = camera.rotation;
    }
}
