use crate::app::InputMode;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Quit,
    Down,
    Up,
    PageDown,
    PageUp,
    Top,
    Bottom,
    NextTab,
    PrevTab,
    SortNext,
    SortPrev,
    SortInvert,
    StartFilter,
    StartCommand,
    SubmitInput,
    CancelInput,
    Backspace,
    InputChar(char),
    Refresh,
    RefreshAll,
    ToggleHelp,
    ShowManifest,
    OpenShell,
    DeleteSelected,
    CloseOverlay,
    ConfirmYes,
    ConfirmNo,
}

pub fn map_key(mode: InputMode, key: KeyEvent) -> Option<Action> {
    match mode {
        InputMode::Normal => map_normal_mode_key(key),
        InputMode::Command | InputMode::Filter => map_input_mode_key(key),
    }
}

fn map_normal_mode_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Char('q') if key.modifiers.is_empty() => Some(Action::Quit),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Action::Quit),
        KeyCode::Char('j') if key.modifiers.is_empty() => Some(Action::Down),
        KeyCode::Down => Some(Action::Down),
        KeyCode::Char('k') if key.modifiers.is_empty() => Some(Action::Up),
        KeyCode::Up => Some(Action::Up),
        KeyCode::Left => Some(Action::PrevTab),
        KeyCode::Right => Some(Action::NextTab),
        KeyCode::BackTab => Some(Action::PrevTab),
        KeyCode::Tab => Some(Action::NextTab),
        KeyCode::Char('g') => Some(Action::Top),
        KeyCode::Char('G') => Some(Action::Bottom),
        KeyCode::Home => Some(Action::Top),
        KeyCode::End => Some(Action::Bottom),
        KeyCode::PageDown => Some(Action::PageDown),
        KeyCode::PageUp => Some(Action::PageUp),
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(Action::PageDown)
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Action::PageUp),
        KeyCode::Char('<') => Some(Action::SortPrev),
        KeyCode::Char('>') => Some(Action::SortNext),
        KeyCode::Char('!') => Some(Action::SortInvert),
        KeyCode::Char('/') => Some(Action::StartFilter),
        KeyCode::Char(':') => Some(Action::StartCommand),
        KeyCode::Char('r') | KeyCode::F(5) => Some(Action::Refresh),
        KeyCode::Char('R') => Some(Action::RefreshAll),
        KeyCode::Char('?') => Some(Action::ToggleHelp),
        KeyCode::Char('m') if key.modifiers.is_empty() => Some(Action::ShowManifest),
        KeyCode::Char('s') if key.modifiers.is_empty() => Some(Action::OpenShell),
        KeyCode::Char('D') => Some(Action::DeleteSelected),
        KeyCode::Char('y') | KeyCode::Char('Y') => Some(Action::ConfirmYes),
        KeyCode::Char('n') | KeyCode::Char('N') => Some(Action::ConfirmNo),
        KeyCode::Esc => Some(Action::CloseOverlay),
        _ => None,
    }
}

fn map_input_mode_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Enter => Some(Action::SubmitInput),
        KeyCode::Esc => Some(Action::CancelInput),
        KeyCode::Backspace => Some(Action::Backspace),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(Action::CancelInput)
        }
        KeyCode::Char(c) => Some(Action::InputChar(c)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{Action, map_key};
    use crate::app::InputMode;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn normal_mode_maps_navigation_and_sort_keys() {
        assert_eq!(
            map_key(InputMode::Normal, key(KeyCode::Char('j'))),
            Some(Action::Down)
        );
        assert_eq!(
            map_key(InputMode::Normal, key(KeyCode::Char('>'))),
            Some(Action::SortNext)
        );
        assert_eq!(
            map_key(InputMode::Normal, key(KeyCode::Char('!'))),
            Some(Action::SortInvert)
        );
        assert_eq!(
            map_key(InputMode::Normal, key(KeyCode::Char('/'))),
            Some(Action::StartFilter)
        );
    }

    #[test]
    fn input_modes_capture_plain_characters() {
        assert_eq!(
            map_key(InputMode::Filter, key(KeyCode::Char('q'))),
            Some(Action::InputChar('q'))
        );
        assert_eq!(
            map_key(InputMode::Command, key(KeyCode::Enter)),
            Some(Action::SubmitInput)
        );
        assert_eq!(
            map_key(InputMode::Command, key(KeyCode::Esc)),
            Some(Action::CancelInput)
        );
    }
}
