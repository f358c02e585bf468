//! # Input Manager
//!
//! This module handles input processing for the application, including:
//! - Keyboard input state tracking
//! - Mouse input state tracking
//! - Input event processing
//! - Input state management

use std::collections::HashMap;

use winit::{
    event::{ElementState, KeyEvent, MouseButton, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

use super::input_state::{MouseInput, ProcessedInputState, RawInputState};

const KEY_CODES: [KeyCode; 10] = [
    KeyCode::KeyW,
    KeyCode::KeyS,
    KeyCode::KeyA,
    KeyCode::KeyD,
    KeyCode::KeyQ,
    KeyCode::KeyB,
    KeyCode::KeyF,
    KeyCode::KeyL,
    KeyCode::Space,
    KeyCode::ShiftLeft,
];

/// Manages the state of all input devices and processes input events.
///
/// This struct maintains the current state of keyboard and mouse inputs
/// and provides methods to process input events from the windowing system.
pub struct InputManager {
    /// Previous state of all tracked keyboard keys
    pub keyboard_inputs_old: HashMap<KeyCode, bool>,
    /// Current state of all tracked keyboard keys
    pub keyboard_inputs_new: HashMap<KeyCode, bool>,

    /// Current state of mouse inputs
    pub mouse_inputs: MouseInput,
}

impl InputManager {
    /// Creates a new InputManager with all tracked keys and buttons released.
    pub fn new() -> Self {
        let mut keyboard_inputs_old = HashMap::new();
        let mut keyboard_inputs_new = HashMap::new();
        for key_code in KEY_CODES {
            keyboard_inputs_old.insert(key_code, false);
            keyboard_inputs_new.insert(key_code, false);
        }

        let mouse_buttons = [MouseButton::Left, MouseButton::Right, MouseButton::Middle];

        let mut mouse_button_inputs_old = HashMap::new();
        let mut mouse_button_inputs_new = HashMap::new();

        for button in mouse_buttons {
            mouse_button_inputs_old.insert(button, false);
            mouse_button_inputs_new.insert(button, false);
        }

        let mouse_inputs = MouseInput {
            mouse_button_inputs_old,
            mouse_button_inputs_new,
            mouse_delta: None,
        };

        Self {
            keyboard_inputs_old,
            keyboard_inputs_new,
            mouse_inputs,
        }
    }

    /// Copies the current states into the old states for the next frame's
    /// transition comparisons.
    pub fn move_old_states(&mut self) {
        for (key, new_state) in self.keyboard_inputs_new.iter() {
            if let Some(old_state) = self.keyboard_inputs_old.get_mut(key) {
                *old_state = *new_state;
            }
        }

        for (button, new_state) in self.mouse_inputs.mouse_button_inputs_new.iter() {
            if let Some(old_state) = self.mouse_inputs.mouse_button_inputs_old.get_mut(button) {
                *old_state = *new_state;
            }
        }
    }

    /// Processes a window event and updates internal input state.
    ///
    /// # Arguments
    /// * `event` - The window event to process
    pub fn intake_input(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state,
                        physical_key: PhysicalKey::Code(key),
                        ..
                    },
                ..
            } => self.intake_key(*key, *state),
            WindowEvent::MouseInput { button, state, .. } => {
                self.intake_mouse_button(*button, *state)
            }
            _ => {}
        }
    }

    /// Records a key state change. Untracked keys are ignored.
    pub fn intake_key(&mut self, key: KeyCode, state: ElementState) {
        if let Some(key_state) = self.keyboard_inputs_new.get_mut(&key) {
            *key_state = state == ElementState::Pressed;
        }
    }

    /// Records a mouse button state change. Untracked buttons are ignored.
    pub fn intake_mouse_button(&mut self, button: MouseButton, state: ElementState) {
        if let Some(button_state) = self.mouse_inputs.mouse_button_inputs_new.get_mut(&button) {
            *button_state = state == ElementState::Pressed;
        }
    }

    /// Updates the mouse movement delta.
    ///
    /// # Arguments
    /// * `delta` - The (x, y) delta of mouse movement since the last update
    pub fn intake_mouse_motion(&mut self, delta: (f64, f64)) {
        self.mouse_inputs.mouse_delta = Some(delta);
    }

    /// Creates a processed input state from the current raw boolean states.
    ///
    /// This translates the raw boolean states into RawInputState enum values
    /// that represent the state transitions (pressed, held, released, not pressed).
    pub fn create_processed_input_state(&mut self) -> ProcessedInputState {
        let mut keyboard_states = HashMap::new();
        let mut mouse_button_states = HashMap::new();

        for (key, &new_state) in self.keyboard_inputs_new.iter() {
            let old_state = self.keyboard_inputs_old.get(key).copied().unwrap_or(false);
            keyboard_states.insert(*key, RawInputState::from_raw_states(old_state, new_state));
        }

        for (button, &new_state) in self.mouse_inputs.mouse_button_inputs_new.iter() {
            let old_state = self
                .mouse_inputs
                .mouse_button_inputs_old
                .get(button)
                .copied()
                .unwrap_or(false);
            mouse_button_states.insert(*button, RawInputState::from_raw_states(old_state, new_state));
        }

        let mouse_delta = self.mouse_inputs.mouse_delta;

        ProcessedInputState {
            keyboard_states,
            mouse_button_states,
            mouse_delta,
        }
    }

    /// Returns the processed input state and resets internal state for the
    /// next frame.
    pub fn get_and_reset_processed_input(&mut self) -> Option<ProcessedInputState> {
        let processed_input = Some(self.create_processed_input_state());
        self.reset_inputs();
        processed_input
    }

    /// Rolls the current states forward and clears per-frame deltas.
    ///
    /// Also called when the window loses focus to prevent stuck keys.
    pub fn reset_inputs(&mut self) {
        self.move_old_states();
        self.mouse_inputs.mouse_delta = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(pressed: bool) -> ElementState {
        if pressed {
            ElementState::Pressed
        } else {
            ElementState::Released
        }
    }

    #[test]
    fn key_transitions_pressed_then_held_then_released() {
        let mut manager = InputManager::new();

        manager.intake_key(KeyCode::KeyF, state(true));
        let processed = manager.get_and_reset_processed_input().unwrap();
        assert!(processed.get_key_state(KeyCode::KeyF).is_just_pressed());

        let processed = manager.get_and_reset_processed_input().unwrap();
        assert_eq!(processed.get_key_state(KeyCode::KeyF), RawInputState::Held);
        assert!(processed.get_key_state(KeyCode::KeyF).is_active());

        manager.intake_key(KeyCode::KeyF, state(false));
        let processed = manager.get_and_reset_processed_input().unwrap();
        assert!(processed.get_key_state(KeyCode::KeyF).is_just_released());
    }

    #[test]
    fn mouse_button_transitions_through_the_same_states() {
        let mut manager = InputManager::new();

        manager.intake_mouse_button(MouseButton::Left, state(true));
        let processed = manager.get_and_reset_processed_input().unwrap();
        assert!(processed
            .get_mouse_button_state(MouseButton::Left)
            .is_just_pressed());

        manager.intake_mouse_button(MouseButton::Left, state(false));
        let processed = manager.get_and_reset_processed_input().unwrap();
        assert!(processed
            .get_mouse_button_state(MouseButton::Left)
            .is_just_released());
    }

    #[test]
    fn mouse_delta_cleared_after_processing() {
        let mut manager = InputManager::new();
        manager.intake_mouse_motion((3.0, -2.0));

        let processed = manager.get_and_reset_processed_input().unwrap();
        assert_eq!(processed.get_mouse_delta(), Some((3.0, -2.0)));

        let processed = manager.get_and_reset_processed_input().unwrap();
        assert_eq!(processed.get_mouse_delta(), None);
    }

    #[test]
    fn untracked_keys_are_ignored() {
        let mut manager = InputManager::new();
        manager.intake_key(KeyCode::KeyZ, state(true));

        let processed = manager.get_and_reset_processed_input().unwrap();
        assert_eq!(
            processed.get_key_state(KeyCode::KeyZ),
            RawInputState::NotPressed
        );
    }
}
