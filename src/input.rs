//! Discrete control input
//!
//! Keyboard shortcuts are translated through an explicit table into
//! [`ControlAction`] values, and actions fold into [`ControlState`] through
//! a pure update function. Continuous movement keys feed the camera
//! controllers separately via `CameraInput`.

use crate::pipeline::RenderMode;
use winit::keyboard::KeyCode;

/// A discrete viewer command produced by one key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    SetMode(RenderMode),
    ToggleBlur,
    ToggleRenderedNormals,
    SwitchController,
    Quit,
}

/// Shortcut table. Returns `None` for keys the viewer does not bind.
pub fn translate_key(key: KeyCode) -> Option<ControlAction> {
    match key {
        KeyCode::Digit1 => Some(ControlAction::SetMode(RenderMode::Full)),
        KeyCode::Digit2 => Some(ControlAction::SetMode(RenderMode::AoOnly)),
        KeyCode::Digit3 => Some(ControlAction::SetMode(RenderMode::NoAo)),
        KeyCode::KeyB => Some(ControlAction::ToggleBlur),
        KeyCode::KeyN => Some(ControlAction::ToggleRenderedNormals),
        KeyCode::Tab => Some(ControlAction::SwitchController),
        KeyCode::Escape => Some(ControlAction::Quit),
        _ => None,
    }
}

/// Viewer-level toggles driven by shortcuts and the overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlState {
    pub mode: RenderMode,
    pub blur_enabled: bool,
    pub quit_requested: bool,
    pub switch_controller: bool,
}

impl Default for ControlState {
    fn default() -> Self {
        Self {
            mode: RenderMode::Full,
            blur_enabled: true,
            quit_requested: false,
            switch_controller: false,
        }
    }
}

impl ControlState {
    /// Fold one action into the state, returning the next state.
    ///
    /// `ToggleRenderedNormals` is reported back to the caller since the
    /// flag lives in the AO parameter block, not here.
    pub fn apply(self, action: ControlAction) -> (Self, bool) {
        let mut next = self;
        let mut toggle_normals = false;
        match action {
            ControlAction::SetMode(mode) => next.mode = mode,
            ControlAction::ToggleBlur => next.blur_enabled = !next.blur_enabled,
            ControlAction::ToggleRenderedNormals => toggle_normals = true,
            ControlAction::SwitchController => next.switch_controller = true,
            ControlAction::Quit => next.quit_requested = true,
        }
        (next, toggle_normals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_key_table() {
        assert_eq!(
            translate_key(KeyCode::Digit1),
            Some(ControlAction::SetMode(RenderMode::Full))
        );
        assert_eq!(
            translate_key(KeyCode::Digit2),
            Some(ControlAction::SetMode(RenderMode::AoOnly))
        );
        assert_eq!(
            translate_key(KeyCode::Digit3),
            Some(ControlAction::SetMode(RenderMode::NoAo))
        );
        assert_eq!(translate_key(KeyCode::KeyB), Some(ControlAction::ToggleBlur));
        assert_eq!(
            translate_key(KeyCode::KeyN),
            Some(ControlAction::ToggleRenderedNormals)
        );
        assert_eq!(
            translate_key(KeyCode::Tab),
            Some(ControlAction::SwitchController)
        );
        assert_eq!(translate_key(KeyCode::Escape), Some(ControlAction::Quit));
        assert_eq!(translate_key(KeyCode::KeyW), None);
        assert_eq!(translate_key(KeyCode::F1), None);
    }

    #[test]
    fn test_mode_switch_round_trip() {
        let start = ControlState::default();
        let (no_ao, _) = start.apply(ControlAction::SetMode(RenderMode::NoAo));
        assert_eq!(no_ao.mode, RenderMode::NoAo);
        let (back, _) = no_ao.apply(ControlAction::SetMode(RenderMode::Full));
        // Nothing besides the mode field may drift across a mode round trip.
        assert_eq!(back, start);
    }

    #[test]
    fn test_blur_toggle() {
        let state = ControlState::default();
        assert!(state.blur_enabled);
        let (state, _) = state.apply(ControlAction::ToggleBlur);
        assert!(!state.blur_enabled);
        let (state, _) = state.apply(ControlAction::ToggleBlur);
        assert!(state.blur_enabled);
    }

    #[test]
    fn test_normals_toggle_reported_not_stored() {
        let state = ControlState::default();
        let (next, toggle) = state.apply(ControlAction::ToggleRenderedNormals);
        assert!(toggle);
        assert_eq!(next, state);
    }

    #[test]
    fn test_quit() {
        let (state, _) = ControlState::default().apply(ControlAction::Quit);
        assert!(state.quit_requested);
    }
}
