//! Pointer and keyboard input.
//!
//! Tracks the pointer (mouse or touch) in pixels and normalized device
//! coordinates, turns a press/release pair into either a drag or a click,
//! and collects per-frame scroll and key events. The frame driver calls
//! [`Input::begin_frame`] after consuming a frame's events.

use glam::Vec2;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, TouchPhase, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::picking::screen_to_ndc;

/// Pointer travel in pixels beyond which a press becomes a drag.
pub const CLICK_SLOP: f32 = 5.0;

/// Input state tracking for the pointer and the keys the scene reacts to.
#[derive(Debug, Default)]
pub struct Input {
    pointer: Vec2,
    pointer_ndc: Vec2,
    pointer_inside: bool,

    // Press in progress
    pressed_at: Option<Vec2>,
    dragging: bool,

    // Per-frame
    drag_delta: Vec2,
    scroll_delta: f32,
    clicked: Option<Vec2>,
    escape_pressed: bool,
    gesture: bool,

    window_size: Vec2,
}

impl Input {
    pub fn new() -> Self {
        Self {
            window_size: Vec2::new(800.0, 600.0),
            ..Default::default()
        }
    }

    /// Pointer position in window pixels, origin top-left.
    pub fn pointer(&self) -> Vec2 {
        self.pointer
    }

    /// Pointer position in normalized device coordinates (-1 to 1, Y up).
    pub fn pointer_ndc(&self) -> Vec2 {
        self.pointer_ndc
    }

    /// Whether the pointer is over the window.
    pub fn pointer_inside(&self) -> bool {
        self.pointer_inside
    }

    /// Pixels dragged this frame while the primary button was held.
    pub fn drag_delta(&self) -> Vec2 {
        self.drag_delta
    }

    /// Scroll this frame; positive scrolls toward the scene.
    pub fn scroll_delta(&self) -> f32 {
        self.scroll_delta
    }

    /// Pixel position of a click released this frame.
    pub fn clicked(&self) -> Option<Vec2> {
        self.clicked
    }

    pub fn escape_pressed(&self) -> bool {
        self.escape_pressed
    }

    /// A click or scroll happened this frame.
    pub fn user_gesture(&self) -> bool {
        self.gesture
    }

    /// The user moved the camera by hand this frame.
    pub fn manual_camera(&self) -> bool {
        self.drag_delta != Vec2::ZERO || self.scroll_delta != 0.0
    }

    /// Clear per-frame state.
    pub fn begin_frame(&mut self) {
        self.drag_delta = Vec2::ZERO;
        self.scroll_delta = 0.0;
        self.clicked = None;
        self.escape_pressed = false;
        self.gesture = false;
    }

    pub fn set_window_size(&mut self, width: u32, height: u32) {
        self.window_size = Vec2::new(width as f32, height as f32);
        self.pointer_ndc = screen_to_ndc(self.pointer, self.window_size);
    }

    pub fn pointer_moved(&mut self, position: Vec2) {
        if self.pressed_at.is_some() {
            self.drag_delta += position - self.pointer;
        }
        self.pointer = position;
        self.pointer_ndc = screen_to_ndc(position, self.window_size);
        self.pointer_inside = true;
        if let Some(start) = self.pressed_at {
            if start.distance(position) > CLICK_SLOP {
                self.dragging = true;
            }
        }
    }

    pub fn pointer_left(&mut self) {
        self.pointer_inside = false;
    }

    pub fn press(&mut self) {
        self.pressed_at = Some(self.pointer);
        self.dragging = false;
    }

    /// Release the primary button; a press that never dragged is a click.
    pub fn release(&mut self) {
        if self.pressed_at.take().is_some() && !self.dragging {
            self.clicked = Some(self.pointer);
            self.gesture = true;
        }
        self.dragging = false;
    }

    pub fn scroll(&mut self, delta: f32) {
        self.scroll_delta += delta;
        self.gesture = true;
    }

    /// Process a winit window event.
    pub fn handle_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed
                    && !event.repeat
                    && event.physical_key == PhysicalKey::Code(KeyCode::Escape)
                {
                    self.escape_pressed = true;
                }
            }

            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => match state {
                ElementState::Pressed => self.press(),
                ElementState::Released => self.release(),
            },

            WindowEvent::CursorMoved { position, .. } => {
                self.pointer_moved(Vec2::new(position.x as f32, position.y as f32));
            }

            WindowEvent::CursorLeft { .. } => self.pointer_left(),

            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 100.0,
                };
                self.scroll(lines);
            }

            // Touch start updates the pointer so hover picks what is under the finger.
            WindowEvent::Touch(touch) => {
                let position = Vec2::new(touch.location.x as f32, touch.location.y as f32);
                match touch.phase {
                    TouchPhase::Started => {
                        self.pointer_moved(position);
                        self.press();
                    }
                    TouchPhase::Moved => self.pointer_moved(position),
                    TouchPhase::Ended => {
                        self.pointer_moved(position);
                        self.release();
                    }
                    TouchPhase::Cancelled => {
                        self.pressed_at = None;
                        self.dragging = false;
                    }
                }
            }

            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_click_without_movement() {
        let mut input = Input::new();
        input.set_window_size(800, 600);
        input.pointer_moved(Vec2::new(400.0, 300.0));
        input.press();
        input.pointer_moved(Vec2::new(402.0, 301.0));
        input.release();

        assert_eq!(input.clicked(), Some(Vec2::new(402.0, 301.0)));
        assert!(input.user_gesture());
        input.begin_frame();
        assert_eq!(input.clicked(), None);
        assert!(!input.user_gesture());
    }

    #[test]
    fn test_drag_is_not_a_click() {
        let mut input = Input::new();
        input.pointer_moved(Vec2::new(100.0, 100.0));
        input.press();
        input.pointer_moved(Vec2::new(160.0, 110.0));
        assert_eq!(input.drag_delta(), Vec2::new(60.0, 10.0));
        assert!(input.manual_camera());
        input.release();
        assert_eq!(input.clicked(), None);
    }

    #[test]
    fn test_hover_move_is_not_a_drag() {
        let mut input = Input::new();
        input.pointer_moved(Vec2::new(10.0, 10.0));
        input.pointer_moved(Vec2::new(300.0, 10.0));
        assert_eq!(input.drag_delta(), Vec2::ZERO);
        assert!(!input.manual_camera());
    }

    #[test]
    fn test_pointer_ndc() {
        let mut input = Input::new();
        input.set_window_size(800, 600);
        input.pointer_moved(Vec2::new(400.0, 300.0));
        assert!(input.pointer_ndc().x.abs() < 0.01);
        assert!(input.pointer_ndc().y.abs() < 0.01);

        input.pointer_moved(Vec2::new(0.0, 0.0));
        assert_eq!(input.pointer_ndc(), Vec2::new(-1.0, 1.0));
    }

    #[test]
    fn test_scroll_accumulates_and_unlocks() {
        let mut input = Input::new();
        input.scroll(1.0);
        input.scroll(0.5);
        assert_eq!(input.scroll_delta(), 1.5);
        assert!(input.user_gesture());
        assert!(input.manual_camera());
    }
}
