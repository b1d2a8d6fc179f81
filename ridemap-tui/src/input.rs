use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::App;

#[derive(Debug, Clone, Copy)]
pub(crate) enum Action {
    None,
    Quit,
    /// Mount or unmount the selected panel
    TogglePanel,
    /// Run `bootstrap.switch_provider`()
    SwitchProvider,
    /// Run `bootstrap.refresh_config`()
    RefreshConfig,
}

pub(crate) fn handle_key_event(key: KeyEvent, app: &mut App) -> Action {
    use KeyCode::{Char, Down, Enter, Up};

    // Global quit shortcuts
    if key.code == Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Action::Quit;
    }

    match key.code {
        Char('q') => Action::Quit,
        Up | Char('k') => {
            if app.panel_index > 0 {
                app.panel_index -= 1;
            }
            Action::None
        }
        Down | Char('j') => {
            if app.panel_index + 1 < app.panels.len() {
                app.panel_index += 1;
            }
            Action::None
        }
        Enter | Char(' ') | Char('m') => Action::TogglePanel,
        Char('s') if !app.is_busy => Action::SwitchProvider,
        Char('r') if !app.is_busy => Action::RefreshConfig,
        _ => Action::None,
    }
}
