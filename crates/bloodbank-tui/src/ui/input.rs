//! Keyboard input handling for the TUI.
//!
//! This module handles all keyboard events and translates them into
//! application state changes.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};

use crate::app::{App, AppState, FormField, Tab, PAGE_SCROLL_SIZE};

/// Handle keyboard input. Returns true if the app should quit.
pub async fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    // Handle help overlay
    if matches!(app.state, AppState::ShowingHelp) {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
            app.state = AppState::Normal;
        }
        return Ok(false);
    }

    // Handle quit confirmation
    if matches!(app.state, AppState::ConfirmingQuit) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                app.state = AppState::Quitting;
                return Ok(true);
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                app.state = AppState::Normal;
            }
            _ => {}
        }
        return Ok(false);
    }

    // The open form takes every key so letters land in its fields
    if app.is_editing_form() {
        handle_form_input(app, key).await;
        return Ok(false);
    }

    // Global keys
    match key.code {
        KeyCode::Char('q') => {
            app.state = AppState::ConfirmingQuit;
            return Ok(false);
        }
        KeyCode::Char('?') => {
            app.state = AppState::ShowingHelp;
            return Ok(false);
        }
        KeyCode::Char('1') => {
            app.switch_tab(Tab::Dashboard);
            return Ok(false);
        }
        KeyCode::Char('2') => {
            app.switch_tab(Tab::Register);
            return Ok(false);
        }
        KeyCode::Left => {
            app.switch_tab(app.current_tab.prev());
            return Ok(false);
        }
        KeyCode::Right => {
            app.switch_tab(app.current_tab.next());
            return Ok(false);
        }
        KeyCode::Char('u') => {
            app.load_dashboard();
            return Ok(false);
        }
        KeyCode::Esc => {
            app.status_message = None;
            return Ok(false);
        }
        _ => {}
    }

    // Tab-specific keys
    match app.current_tab {
        Tab::Dashboard => handle_dashboard_input(app, key),
        Tab::Register => handle_submitted_input(app, key),
    }

    Ok(false)
}

// ===== Dashboard =====

fn handle_dashboard_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Down | KeyCode::Char('j') => app.select_hospital_down(1),
        KeyCode::Up | KeyCode::Char('k') => app.select_hospital_up(1),
        KeyCode::PageDown => app.select_hospital_down(PAGE_SCROLL_SIZE),
        KeyCode::PageUp => app.select_hospital_up(PAGE_SCROLL_SIZE),
        KeyCode::Home => app.hospital_selection = 0,
        KeyCode::End => app.select_last_hospital(),
        _ => {}
    }
}

// ===== Registration =====

async fn handle_form_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            // Leave the form without saving
            app.switch_tab(Tab::Dashboard);
        }
        KeyCode::Down | KeyCode::Tab => {
            app.form_focus = app.form_focus.next();
        }
        KeyCode::Up | KeyCode::BackTab => {
            app.form_focus = app.form_focus.prev();
        }
        KeyCode::Left if app.form_focus == FormField::BloodGroup => {
            app.cycle_blood_group(false);
        }
        KeyCode::Right if app.form_focus == FormField::BloodGroup => {
            app.cycle_blood_group(true);
        }
        KeyCode::Char(' ') if app.form_focus == FormField::BloodGroup => {
            app.cycle_blood_group(true);
        }
        KeyCode::Enter => match app.form_focus {
            FormField::Submit => app.submit_registration().await,
            _ => app.form_focus = app.form_focus.next(),
        },
        KeyCode::Backspace => {
            app.pop_form_char();
        }
        KeyCode::Char(c) => {
            app.push_form_char(c);
        }
        _ => {}
    }
}

/// After a successful registration the page is finished; `n` starts over.
fn handle_submitted_input(app: &mut App, key: KeyEvent) {
    if matches!(key.code, KeyCode::Char('n') | KeyCode::Enter) {
        app.open_registration();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use bloodbank_core::store::{generate_document_id, LocalStore};
    use bloodbank_core::{BloodGroup, DataStore, PlaceholderGeocoder};
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn test_app() -> (App, std::path::PathBuf) {
        let dir = std::env::temp_dir().join(format!("bloodbank-input-{}", generate_document_id()));
        let store: Arc<dyn DataStore> = Arc::new(LocalStore::new(dir.clone()).unwrap());
        (App::new(store, Arc::new(PlaceholderGeocoder)), dir)
    }

    async fn press_all(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_input(app, key(KeyCode::Char(c))).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_quit_needs_confirmation() {
        let (mut app, dir) = test_app();
        assert!(!handle_input(&mut app, key(KeyCode::Char('q'))).await.unwrap());
        assert_eq!(app.state, AppState::ConfirmingQuit);
        assert!(!handle_input(&mut app, key(KeyCode::Char('n'))).await.unwrap());
        assert_eq!(app.state, AppState::Normal);

        handle_input(&mut app, key(KeyCode::Char('q'))).await.unwrap();
        assert!(handle_input(&mut app, key(KeyCode::Char('y'))).await.unwrap());
        assert_eq!(app.state, AppState::Quitting);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_letters_go_into_form_not_shortcuts() {
        let (mut app, dir) = test_app();
        handle_input(&mut app, key(KeyCode::Char('2'))).await.unwrap();
        assert_eq!(app.current_tab, Tab::Register);

        press_all(&mut app, "quinn?").await;
        assert_eq!(app.form.name, "quinn?");
        assert_eq!(app.state, AppState::Normal);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_form_navigation_and_blood_group() {
        let (mut app, dir) = test_app();
        app.switch_tab(Tab::Register);

        handle_input(&mut app, key(KeyCode::Enter)).await.unwrap();
        assert_eq!(app.form_focus, FormField::BloodGroup);
        handle_input(&mut app, key(KeyCode::Left)).await.unwrap();
        assert_eq!(app.form.blood_group, Some(BloodGroup::AbNegative));
        handle_input(&mut app, key(KeyCode::Right)).await.unwrap();
        handle_input(&mut app, key(KeyCode::Right)).await.unwrap();
        assert_eq!(app.form.blood_group, Some(BloodGroup::ANegative));

        // Left/Right on the form never switch tabs
        assert_eq!(app.current_tab, Tab::Register);

        handle_input(&mut app, key(KeyCode::BackTab)).await.unwrap();
        assert_eq!(app.form_focus, FormField::Name);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_register_flow_through_keys() {
        let (mut app, dir) = test_app();
        app.switch_tab(Tab::Register);

        press_all(&mut app, "Ravi").await;
        handle_input(&mut app, key(KeyCode::Tab)).await.unwrap();
        handle_input(&mut app, key(KeyCode::Tab)).await.unwrap();
        press_all(&mut app, "12345").await;
        handle_input(&mut app, key(KeyCode::Tab)).await.unwrap();
        press_all(&mut app, "Salem").await;
        handle_input(&mut app, key(KeyCode::Tab)).await.unwrap();
        assert_eq!(app.form_focus, FormField::Submit);

        handle_input(&mut app, key(KeyCode::Enter)).await.unwrap();
        assert!(app.form_state.is_submitted());

        // Now shortcuts work again; `n` opens a fresh form
        handle_input(&mut app, key(KeyCode::Char('n'))).await.unwrap();
        assert!(app.is_editing_form());
        assert!(app.form.name.is_empty());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_escape_leaves_form() {
        let (mut app, dir) = test_app();
        app.switch_tab(Tab::Register);
        press_all(&mut app, "abc").await;
        handle_input(&mut app, key(KeyCode::Esc)).await.unwrap();
        assert_eq!(app.current_tab, Tab::Dashboard);
        let _ = std::fs::remove_dir_all(dir);
    }
}
