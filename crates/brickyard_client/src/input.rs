use std::collections::HashSet;

use brickyard_shared::edit::{EditInput, MouseButtons};
use glam::Vec2;
use winit::event::MouseButton;
use winit::keyboard::KeyCode;

pub const CYCLE_BLOCK_KEY: KeyCode = KeyCode::KeyT;

#[derive(Debug, Default)]
pub struct InputState {
    pressed_keys: HashSet<KeyCode>,
    just_pressed: HashSet<KeyCode>,
    cursor: Option<Vec2>,
    pub mouse_delta: Vec2,
    buttons: MouseButtons,
}

impl InputState {
    pub fn press_key(&mut self, key: KeyCode) {
        if self.pressed_keys.insert(key) {
            self.just_pressed.insert(key);
        }
    }

    pub fn release_key(&mut self, key: KeyCode) {
        self.pressed_keys.remove(&key);
    }

    pub fn is_pressed(&self, key: KeyCode) -> bool {
        self.pressed_keys.contains(&key)
    }

    /// True only on the frame the key went down; key repeat does not count.
    pub fn was_just_pressed(&self, key: KeyCode) -> bool {
        self.just_pressed.contains(&key)
    }

    pub fn set_cursor(&mut self, position: Vec2) {
        if let Some(previous) = self.cursor {
            self.mouse_delta += position - previous;
        }
        self.cursor = Some(position);
    }

    pub fn cursor(&self) -> Vec2 {
        self.cursor.unwrap_or_default()
    }

    pub fn set_button(&mut self, button: MouseButton, pressed: bool) {
        let flag = match button {
            MouseButton::Left => MouseButtons::LEFT,
            MouseButton::Middle => MouseButtons::MIDDLE,
            MouseButton::Right => MouseButtons::RIGHT,
            _ => return,
        };
        self.buttons.set(flag, pressed);
    }

    pub fn buttons(&self) -> MouseButtons {
        self.buttons
    }

    /// Mouse-look is active while the middle button is held.
    pub fn is_looking(&self) -> bool {
        self.buttons.contains(MouseButtons::MIDDLE)
    }

    pub fn edit_input(&self, viewport: Vec2) -> EditInput {
        EditInput {
            cursor: self.cursor(),
            viewport,
            buttons: self.buttons,
            cycle_block: self.was_just_pressed(CYCLE_BLOCK_KEY),
        }
    }

    pub fn clear_frame(&mut self) {
        self.mouse_delta = Vec2::ZERO;
        self.just_pressed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_key_fires_once_per_press() {
        let mut input = InputState::default();
        input.press_key(CYCLE_BLOCK_KEY);
        assert!(input.edit_input(Vec2::ONE).cycle_block);

        input.clear_frame();
        // Auto-repeat delivers another press while held.
        input.press_key(CYCLE_BLOCK_KEY);
        assert!(!input.edit_input(Vec2::ONE).cycle_block);

        input.release_key(CYCLE_BLOCK_KEY);
        input.press_key(CYCLE_BLOCK_KEY);
        assert!(input.edit_input(Vec2::ONE).cycle_block);
    }

    #[test]
    fn buttons_map_to_edit_flags() {
        let mut input = InputState::default();
        input.set_button(MouseButton::Left, true);
        input.set_button(MouseButton::Right, true);
        input.set_button(MouseButton::Back, true);
        assert_eq!(input.buttons(), MouseButtons::LEFT | MouseButtons::RIGHT);

        input.set_button(MouseButton::Left, false);
        assert_eq!(input.buttons(), MouseButtons::RIGHT);
        assert!(!input.is_looking());
        input.set_button(MouseButton::Middle, true);
        assert!(input.is_looking());
    }

    #[test]
    fn cursor_motion_accumulates_delta_until_cleared() {
        let mut input = InputState::default();
        input.set_cursor(Vec2::new(100.0, 100.0));
        assert_eq!(input.mouse_delta, Vec2::ZERO);
        input.set_cursor(Vec2::new(110.0, 95.0));
        input.set_cursor(Vec2::new(112.0, 90.0));
        assert_eq!(input.mouse_delta, Vec2::new(12.0, -10.0));

        let edit = input.edit_input(Vec2::new(800.0, 600.0));
        assert_eq!(edit.cursor, Vec2::new(112.0, 90.0));
        assert_eq!(edit.viewport, Vec2::new(800.0, 600.0));

        input.clear_frame();
        assert_eq!(input.mouse_delta, Vec2::ZERO);
    }
}
