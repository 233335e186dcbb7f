// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Viewer description consumed by the scene tree each frame.

use glam::{Mat4, Vec3};

/// A viewer: the world-to-view matrix and its inverse.
///
/// Projection is not needed by the scene tree and is not modelled here.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    world_to_view: Mat4,
    view_to_world: Mat4,
}

impl Default for Camera {
    fn default() -> Self {
        Self::from_world_to_view(Mat4::IDENTITY)
    }
}

impl Camera {
    /// Camera with an explicit world-to-view matrix.
    pub fn from_world_to_view(world_to_view: Mat4) -> Self {
        Self {
            world_to_view,
            view_to_world: world_to_view.inverse(),
        }
    }

    /// Right-handed camera at `eye` looking at `target`.
    pub fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Self {
        Self::from_world_to_view(Mat4::look_at_rh(eye, target, up))
    }

    /// World-to-view matrix.
    pub fn world_to_view(&self) -> Mat4 {
        self.world_to_view
    }

    /// View-to-world matrix.
    pub fn view_to_world(&self) -> Mat4 {
        self.view_to_world
    }

    /// Eye position in world space.
    pub fn position(&self) -> Vec3 {
        self.view_to_world.w_axis.truncate()
    }
}
