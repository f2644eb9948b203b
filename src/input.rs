use crate::app::InputMode;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    NextTab,
    PrevTab,
    Down,
    Up,
    Refresh,
    OpenPodPicker,
    OpenFilterPicker,
    ToggleSelected,
    ClearFilters,
    Submit,
    CancelOverlay,
    ToggleHelp,
}

pub fn map_key(mode: InputMode, key: KeyEvent) -> Option<Action> {
    match mode {
        InputMode::Normal => map_normal_mode_key(key),
        InputMode::PodPicker | InputMode::FilterPicker => map_picker_mode_key(key),
    }
}

fn map_normal_mode_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Char('q') => Some(Action::Quit),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Action::Quit),
        KeyCode::Left | KeyCode::Char('h') => Some(Action::PrevTab),
        KeyCode::Right | KeyCode::Char('l') => Some(Action::NextTab),
        KeyCode::Tab => Some(Action::NextTab),
        KeyCode::BackTab => Some(Action::PrevTab),
        KeyCode::Char('p') => Some(Action::OpenPodPicker),
        KeyCode::Char('f') | KeyCode::Char('/') => Some(Action::OpenFilterPicker),
        KeyCode::Char('C') => Some(Action::ClearFilters),
        KeyCode::Char('r') | KeyCode::F(5) => Some(Action::Refresh),
        KeyCode::Char('?') => Some(Action::ToggleHelp),
        KeyCode::Esc => Some(Action::CancelOverlay),
        _ => None,
    }
}

fn map_picker_mode_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Action::Quit),
        KeyCode::Char('j') | KeyCode::Down => Some(Action::Down),
        KeyCode::Char('k') | KeyCode::Up => Some(Action::Up),
        KeyCode::Char(' ') => Some(Action::ToggleSelected),
        KeyCode::Char('C') => Some(Action::ClearFilters),
        KeyCode::Enter => Some(Action::Submit),
        KeyCode::Esc | KeyCode::Char('q') => Some(Action::CancelOverlay),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{Action, map_key};
    use crate::app::InputMode;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    #[test]
    fn normal_mode_maps_quit() {
        let key = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        assert_eq!(map_key(InputMode::Normal, key), Some(Action::Quit));
    }

    #[test]
    fn normal_mode_maps_tab_switching() {
        let right = KeyEvent::new(KeyCode::Right, KeyModifiers::NONE);
        let left = KeyEvent::new(KeyCode::Left, KeyModifiers::NONE);
        assert_eq!(map_key(InputMode::Normal, right), Some(Action::NextTab));
        assert_eq!(map_key(InputMode::Normal, left), Some(Action::PrevTab));
    }

    #[test]
    fn normal_mode_maps_pickers() {
        let pod = KeyEvent::new(KeyCode::Char('p'), KeyModifiers::NONE);
        let filter = KeyEvent::new(KeyCode::Char('f'), KeyModifiers::NONE);
        assert_eq!(map_key(InputMode::Normal, pod), Some(Action::OpenPodPicker));
        assert_eq!(
            map_key(InputMode::Normal, filter),
            Some(Action::OpenFilterPicker)
        );
    }

    #[test]
    fn picker_mode_maps_navigation_and_submit() {
        let down = KeyEvent::new(KeyCode::Char('j'), KeyModifiers::NONE);
        let enter = KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE);
        assert_eq!(map_key(InputMode::PodPicker, down), Some(Action::Down));
        assert_eq!(map_key(InputMode::PodPicker, enter), Some(Action::Submit));
    }

    #[test]
    fn filter_picker_maps_toggle_and_clear() {
        let space = KeyEvent::new(KeyCode::Char(' '), KeyModifiers::NONE);
        let clear = KeyEvent::new(KeyCode::Char('C'), KeyModifiers::SHIFT);
        assert_eq!(
            map_key(InputMode::FilterPicker, space),
            Some(Action::ToggleSelected)
        );
        assert_eq!(
            map_key(InputMode::FilterPicker, clear),
            Some(Action::ClearFilters)
        );
    }

    #[test]
    fn picker_mode_maps_escape_to_cancel() {
        let esc = KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE);
        assert_eq!(
            map_key(InputMode::FilterPicker, esc),
            Some(Action::CancelOverlay)
        );
    }

    #[test]
    fn ctrl_c_quits_from_any_mode() {
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(map_key(InputMode::Normal, key), Some(Action::Quit));
        assert_eq!(map_key(InputMode::PodPicker, key), Some(Action::Quit));
    }
}
