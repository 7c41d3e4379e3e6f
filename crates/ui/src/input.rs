//! Key routing. Decides what a key means in the current mode without touching state.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Which layer receives keys, topmost first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InputMode {
    Confirm,
    Modal,
    History,
    Search,
    Grid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Intent {
    Quit,
    FocusSearch,
    ToggleHistory,
    ToggleTheme,
    GoHome,
    SwitchFocus,
    Escape,
    DismissToast,

    TypeChar(char),
    Backspace,
    ClearQuery,
    SuggestionNext,
    SuggestionPrev,
    CommitSuggestion,

    GridLeft,
    GridRight,
    GridUp,
    GridDown,
    OpenCard,

    HistoryUp,
    HistoryDown,
    HistorySelect,
    HistoryRemove,
    HistoryDetails,
    HistoryClear,

    RecommendFromDetails,
    WebSearch,

    ConfirmYes,
    ConfirmNo,
}

pub(crate) fn map_key(key: KeyEvent, mode: InputMode) -> Option<Intent> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    if ctrl {
        match key.code {
            KeyCode::Char('c') | KeyCode::Char('q') => return Some(Intent::Quit),
            _ => {}
        }
    }

    // The confirmation prompt swallows everything else.
    if mode == InputMode::Confirm {
        return match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => Some(Intent::ConfirmYes),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => Some(Intent::ConfirmNo),
            _ => None,
        };
    }

    if ctrl {
        return match key.code {
            KeyCode::Char('k') => Some(Intent::FocusSearch),
            KeyCode::Char('h') => Some(Intent::ToggleHistory),
            KeyCode::Char('t') => Some(Intent::ToggleTheme),
            KeyCode::Char('g') => Some(Intent::GoHome),
            KeyCode::Char('x') => Some(Intent::DismissToast),
            KeyCode::Char('u') if mode == InputMode::Search => Some(Intent::ClearQuery),
            _ => None,
        };
    }

    match key.code {
        KeyCode::F(2) => return Some(Intent::ToggleHistory),
        KeyCode::Esc => return Some(Intent::Escape),
        _ => {}
    }

    match mode {
        InputMode::Confirm => None,
        InputMode::Modal => match key.code {
            KeyCode::Char('r') => Some(Intent::RecommendFromDetails),
            KeyCode::Char('g') => Some(Intent::WebSearch),
            KeyCode::Char('q') => Some(Intent::Escape),
            _ => None,
        },
        InputMode::History => match key.code {
            KeyCode::Up | KeyCode::Char('k') => Some(Intent::HistoryUp),
            KeyCode::Down | KeyCode::Char('j') => Some(Intent::HistoryDown),
            KeyCode::Enter => Some(Intent::HistorySelect),
            KeyCode::Char('x') | KeyCode::Delete => Some(Intent::HistoryRemove),
            KeyCode::Char('i') => Some(Intent::HistoryDetails),
            KeyCode::Char('c') => Some(Intent::HistoryClear),
            KeyCode::Char('q') => Some(Intent::ToggleHistory),
            _ => None,
        },
        InputMode::Search => match key.code {
            KeyCode::Down => Some(Intent::SuggestionNext),
            KeyCode::Up => Some(Intent::SuggestionPrev),
            KeyCode::Enter => Some(Intent::CommitSuggestion),
            KeyCode::Backspace => Some(Intent::Backspace),
            KeyCode::Tab => Some(Intent::SwitchFocus),
            KeyCode::Char(ch) => Some(Intent::TypeChar(ch)),
            _ => None,
        },
        InputMode::Grid => match key.code {
            KeyCode::Left | KeyCode::Char('h') => Some(Intent::GridLeft),
            KeyCode::Right | KeyCode::Char('l') => Some(Intent::GridRight),
            KeyCode::Up | KeyCode::Char('k') => Some(Intent::GridUp),
            KeyCode::Down | KeyCode::Char('j') => Some(Intent::GridDown),
            KeyCode::Enter => Some(Intent::OpenCard),
            KeyCode::Tab | KeyCode::Char('/') => Some(Intent::SwitchFocus),
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(ch: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(ch), KeyModifiers::CONTROL)
    }

    #[test]
    fn search_field_takes_text() {
        assert_eq!(
            map_key(key(KeyCode::Char('r')), InputMode::Search),
            Some(Intent::TypeChar('r'))
        );
        assert_eq!(
            map_key(key(KeyCode::Down), InputMode::Search),
            Some(Intent::SuggestionNext)
        );
        assert_eq!(
            map_key(key(KeyCode::Up), InputMode::Search),
            Some(Intent::SuggestionPrev)
        );
        assert_eq!(
            map_key(key(KeyCode::Enter), InputMode::Search),
            Some(Intent::CommitSuggestion)
        );
    }

    #[test]
    fn global_shortcuts_work_everywhere_but_confirm() {
        for mode in [
            InputMode::Search,
            InputMode::Grid,
            InputMode::History,
            InputMode::Modal,
        ] {
            assert_eq!(map_key(ctrl('k'), mode), Some(Intent::FocusSearch));
            assert_eq!(map_key(ctrl('h'), mode), Some(Intent::ToggleHistory));
            assert_eq!(map_key(key(KeyCode::F(2)), mode), Some(Intent::ToggleHistory));
            assert_eq!(map_key(ctrl('t'), mode), Some(Intent::ToggleTheme));
            assert_eq!(map_key(key(KeyCode::Esc), mode), Some(Intent::Escape));
        }
        assert_eq!(map_key(ctrl('k'), InputMode::Confirm), None);
        assert_eq!(map_key(ctrl('c'), InputMode::Confirm), Some(Intent::Quit));
    }

    #[test]
    fn modal_actions() {
        assert_eq!(
            map_key(key(KeyCode::Char('r')), InputMode::Modal),
            Some(Intent::RecommendFromDetails)
        );
        assert_eq!(
            map_key(key(KeyCode::Char('g')), InputMode::Modal),
            Some(Intent::WebSearch)
        );
    }

    #[test]
    fn history_rows() {
        assert_eq!(
            map_key(key(KeyCode::Delete), InputMode::History),
            Some(Intent::HistoryRemove)
        );
        assert_eq!(
            map_key(key(KeyCode::Char('i')), InputMode::History),
            Some(Intent::HistoryDetails)
        );
        assert_eq!(
            map_key(key(KeyCode::Char('c')), InputMode::History),
            Some(Intent::HistoryClear)
        );
    }

    #[test]
    fn confirm_prompt_answers() {
        assert_eq!(
            map_key(key(KeyCode::Char('y')), InputMode::Confirm),
            Some(Intent::ConfirmYes)
        );
        assert_eq!(
            map_key(key(KeyCode::Esc), InputMode::Confirm),
            Some(Intent::ConfirmNo)
        );
        assert_eq!(map_key(key(KeyCode::Char('x')), InputMode::Confirm), None);
    }
}
