//! # App Surface Module
//!
//! Contract between the world and whatever process actually owns the
//! external application surfaces.
//!
//! The world never captures or composites app content. It knows apps only
//! as opaque handles anchored in space, and asks the host three questions:
//! how far the camera should sit when an app takes focus, how the quad is
//! rotated about its anchor, and it tells the host when focus changes. A
//! real host would bridge to a window-capture backend; the in-process
//! [`StubSurfaceHost`] is enough to drive the shell end to end.

use log::info;

use super::app_registry::AppHandle;

/// Host-side view of the application surfaces the world anchors.
pub trait AppSurfaceHost {
    /// Preferred camera distance from the anchor when `handle` is focused.
    fn view_distance(&self, handle: AppHandle) -> f32;

    /// Yaw of the quad about its anchor, radians counterclockwise from +z.
    fn anchor_rotation(&self, handle: AppHandle) -> f32;

    /// Focus moved to `handle`, or to the open world when `None`.
    fn focus_changed(&mut self, handle: Option<AppHandle>);
}

/// In-process host with fixed answers, backing the demo binary.
pub struct StubSurfaceHost {
    view_distance: f32,
    focused: Option<AppHandle>,
}

impl StubSurfaceHost {
    /// Creates a host whose apps all prefer the given focus distance.
    pub fn new(view_distance: f32) -> Self {
        Self {
            view_distance,
            focused: None,
        }
    }

    /// The handle currently holding focus, if any.
    pub fn focused(&self) -> Option<AppHandle> {
        self.focused
    }
}

impl AppSurfaceHost for StubSurfaceHost {
    fn view_distance(&self, _handle: AppHandle) -> f32 {
        self.view_distance
    }

    fn anchor_rotation(&self, _handle: AppHandle) -> f32 {
        0.0
    }

    fn focus_changed(&mut self, handle: Option<AppHandle>) {
        match handle {
            Some(handle) => info!("focus moved to app {}", handle.0),
            None => info!("focus returned to the world"),
        }
        self.focused = handle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_host_tracks_focus() {
        let mut host = StubSurfaceHost::new(1.5);
        assert_eq!(host.focused(), None);

        host.focus_changed(Some(AppHandle(3)));
        assert_eq!(host.focused(), Some(AppHandle(3)));
        assert_eq!(host.view_distance(AppHandle(3)), 1.5);

        host.focus_changed(None);
        assert_eq!(host.focused(), None);
    }
}
