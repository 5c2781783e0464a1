//! Frame-oriented keyboard and mouse state.
//!
//! Window events accumulate between frames; [`Input::begin_frame`] resets
//! the per-frame edges (pressed, released, mouse delta) while held state
//! persists.

use std::collections::HashSet;

use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::math::Vector2;

#[derive(Default)]
pub struct Input {
    keys_down: HashSet<KeyCode>,
    keys_pressed: HashSet<KeyCode>,
    keys_released: HashSet<KeyCode>,
    buttons_down: HashSet<MouseButton>,
    buttons_pressed: HashSet<MouseButton>,
    mouse_position: Vector2,
    mouse_delta: Vector2,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets per-frame state. Call once at the top of each frame, before
    /// processing that frame's events.
    pub fn begin_frame(&mut self) {
        self.keys_pressed.clear();
        self.keys_released.clear();
        self.buttons_pressed.clear();
        self.mouse_delta = Vector2::ZERO;
    }

    pub fn handle_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    match event.state {
                        ElementState::Pressed => {
                            if !self.keys_down.contains(&key) {
                                self.keys_pressed.insert(key);
                            }
                            self.keys_down.insert(key);
                        }
                        ElementState::Released => {
                            self.keys_down.remove(&key);
                            self.keys_released.insert(key);
                        }
                    }
                }
            }
            WindowEvent::MouseInput { state, button, .. } => match state {
                ElementState::Pressed => {
                    if !self.buttons_down.contains(button) {
                        self.buttons_pressed.insert(*button);
                    }
                    self.buttons_down.insert(*button);
                }
                ElementState::Released => {
                    self.buttons_down.remove(button);
                }
            },
            WindowEvent::CursorMoved { position, .. } => {
                let position = Vector2::new(position.x as f32, position.y as f32);
                self.mouse_delta += position - self.mouse_position;
                self.mouse_position = position;
            }
            _ => {}
        }
    }

    /// The key is currently held.
    pub fn key_down(&self, key: KeyCode) -> bool {
        self.keys_down.contains(&key)
    }

    /// The key went down this frame.
    pub fn key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    /// The key came up this frame.
    pub fn key_released(&self, key: KeyCode) -> bool {
        self.keys_released.contains(&key)
    }

    pub fn button_down(&self, button: MouseButton) -> bool {
        self.buttons_down.contains(&button)
    }

    pub fn button_pressed(&self, button: MouseButton) -> bool {
        self.buttons_pressed.contains(&button)
    }

    /// Cursor position in window coordinates.
    pub fn mouse_position(&self) -> Vector2 {
        self.mouse_position
    }

    /// Cursor movement accumulated this frame.
    pub fn mouse_delta(&self) -> Vector2 {
        self.mouse_delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::PhysicalPosition;

    fn press(input: &mut Input, button: MouseButton) {
        input.handle_event(&WindowEvent::MouseInput {
            device_id: winit::event::DeviceId::dummy(),
            state: ElementState::Pressed,
            button,
        });
    }

    #[test]
    fn pressed_is_an_edge_down_is_a_level() {
        let mut input = Input::new();
        press(&mut input, MouseButton::Left);
        assert!(input.button_pressed(MouseButton::Left));
        assert!(input.button_down(MouseButton::Left));

        input.begin_frame();
        assert!(!input.button_pressed(MouseButton::Left));
        assert!(input.button_down(MouseButton::Left));
    }

    #[test]
    fn mouse_delta_accumulates_within_a_frame() {
        let mut input = Input::new();
        for x in [10.0, 25.0, 40.0] {
            input.handle_event(&WindowEvent::CursorMoved {
                device_id: winit::event::DeviceId::dummy(),
                position: PhysicalPosition::new(x, 0.0),
            });
        }
        assert_eq!(input.mouse_delta(), Vector2::new(40.0, 0.0));
        assert_eq!(input.mouse_position(), Vector2::new(40.0, 0.0));

        input.begin_frame();
        assert_eq!(input.mouse_delta(), Vector2::ZERO);
    }
}
