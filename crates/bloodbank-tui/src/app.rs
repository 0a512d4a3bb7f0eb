//! Application state management for the blood donation dashboard.
//!
//! This module contains the core `App` struct that manages all application
//! state: the active tab, the latest dashboard snapshot, the registration
//! form, and the background task that reloads the dashboard.

use std::sync::Arc;

use bloodbank_core::registration::{FormState, RegistrationForm, RegistrationHandler, SUCCESS_MESSAGE};
use bloodbank_core::{load_snapshot, BloodGroup, DashboardSnapshot, DataStore, Geocoder};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

// ============================================================================
// Constants
// ============================================================================

/// Buffer size for the dashboard reload channel.
const CHANNEL_BUFFER_SIZE: usize = 4;

/// Maximum length for any registration text field.
const MAX_FIELD_LENGTH: usize = 64;

/// Number of rows to scroll on page up/down.
pub const PAGE_SCROLL_SIZE: usize = 10;

// ============================================================================
// UI State Types
// ============================================================================

/// Main navigation tabs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Dashboard,
    Register,
}

impl Tab {
    /// Get the display title for this tab.
    pub fn title(&self) -> &'static str {
        match self {
            Tab::Dashboard => "Dashboard",
            Tab::Register => "Donor Registration",
        }
    }

    /// Get the next tab (wrapping around)
    pub fn next(&self) -> Self {
        match self {
            Tab::Dashboard => Tab::Register,
            Tab::Register => Tab::Dashboard,
        }
    }

    /// Get the previous tab (wrapping around)
    pub fn prev(&self) -> Self {
        match self {
            Tab::Dashboard => Tab::Register,
            Tab::Register => Tab::Dashboard,
        }
    }
}

/// Overall application state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    ShowingHelp,
    ConfirmingQuit,
    Quitting,
}

/// Registration form focus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Name,
    BloodGroup,
    Contact,
    Location,
    Submit,
}

impl FormField {
    pub fn label(&self) -> &'static str {
        match self {
            FormField::Name => "Name",
            FormField::BloodGroup => "Blood Group",
            FormField::Contact => "Contact Number",
            FormField::Location => "City/Location",
            FormField::Submit => "Register",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            FormField::Name => FormField::BloodGroup,
            FormField::BloodGroup => FormField::Contact,
            FormField::Contact => FormField::Location,
            FormField::Location => FormField::Submit,
            FormField::Submit => FormField::Name,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            FormField::Name => FormField::Submit,
            FormField::BloodGroup => FormField::Name,
            FormField::Contact => FormField::BloodGroup,
            FormField::Location => FormField::Contact,
            FormField::Submit => FormField::Location,
        }
    }
}

/// Result of a background dashboard load
#[derive(Debug)]
enum RefreshResult {
    /// Snapshot taken successfully
    Snapshot(Box<DashboardSnapshot>),
    /// The load task died before producing a snapshot
    Failed(String),
}

// ============================================================================
// Main Application Struct
// ============================================================================

/// Main application state container
pub struct App {
    // Core services
    store: Arc<dyn DataStore>,
    registration: RegistrationHandler,

    // UI State
    pub state: AppState,
    pub current_tab: Tab,
    pub hospital_selection: usize,

    // Dashboard data
    pub snapshot: Option<DashboardSnapshot>,
    pub loading: bool,
    /// A reload was requested while one was in flight
    reload_pending: bool,

    // Registration form state
    pub form: RegistrationForm,
    pub form_focus: FormField,
    pub form_state: FormState,

    // Background task channel
    refresh_rx: mpsc::Receiver<RefreshResult>,
    refresh_tx: mpsc::Sender<RefreshResult>,

    // Status message
    pub status_message: Option<String>,
}

impl App {
    /// Create a new application instance around an already-connected store.
    pub fn new(store: Arc<dyn DataStore>, geocoder: Arc<dyn Geocoder>) -> Self {
        debug!(backend = store.backend_name(), "App::new()");
        let registration = RegistrationHandler::new(Arc::clone(&store), geocoder);
        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);

        Self {
            store,
            registration,

            state: AppState::Normal,
            current_tab: Tab::Dashboard,
            hospital_selection: 0,

            snapshot: None,
            loading: false,
            reload_pending: false,

            form: RegistrationForm::default(),
            form_focus: FormField::Name,
            form_state: FormState::default(),

            refresh_rx: rx,
            refresh_tx: tx,

            status_message: None,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Activate a tab. Activating a tab is a page load: the dashboard reloads
    /// and the registration form starts over.
    pub fn switch_tab(&mut self, tab: Tab) {
        self.current_tab = tab;
        match tab {
            Tab::Dashboard => self.load_dashboard(),
            Tab::Register => self.open_registration(),
        }
    }

    // =========================================================================
    // Dashboard
    // =========================================================================

    /// Spawn a background task that takes a fresh dashboard snapshot.
    ///
    /// A request made while a load is in flight is queued and issued once
    /// that load finishes, so the page never shows data read before it.
    pub fn load_dashboard(&mut self) {
        if self.loading {
            debug!("Dashboard load already in flight, queueing another");
            self.reload_pending = true;
            return;
        }

        info!("Loading dashboard snapshot");
        self.loading = true;
        self.status_message = Some("Loading dashboard...".to_string());

        let store = Arc::clone(&self.store);
        let tx = self.refresh_tx.clone();
        tokio::spawn(async move {
            // Run the load in its own task so a panic still reports back
            let load = tokio::spawn(async move { load_snapshot(store.as_ref()).await });
            let result = match load.await {
                Ok(snapshot) => RefreshResult::Snapshot(Box::new(snapshot)),
                Err(e) => {
                    error!(error = %e, "Dashboard load task failed");
                    RefreshResult::Failed(e.to_string())
                }
            };
            if let Err(e) = tx.send(result).await {
                error!(error = %e, "Failed to deliver dashboard snapshot - channel closed");
            }
        });
    }

    /// Pick up any finished dashboard loads.
    pub fn check_background_tasks(&mut self) {
        while let Ok(result) = self.refresh_rx.try_recv() {
            match result {
                RefreshResult::Snapshot(snapshot) => self.apply_snapshot(*snapshot),
                RefreshResult::Failed(reason) => {
                    self.loading = false;
                    self.status_message = Some(format!("Dashboard load failed: {}", reason));
                }
            }

            if self.reload_pending {
                self.reload_pending = false;
                self.load_dashboard();
            }
        }
    }

    fn apply_snapshot(&mut self, snapshot: DashboardSnapshot) {
        let rows = snapshot.hospitals.len();
        if self.hospital_selection >= rows {
            self.hospital_selection = rows.saturating_sub(1);
        }
        self.snapshot = Some(snapshot);
        self.loading = false;
        self.status_message = None;
    }

    fn hospital_rows(&self) -> usize {
        self.snapshot.as_ref().map(|s| s.hospitals.len()).unwrap_or(0)
    }

    pub fn select_hospital_down(&mut self, by: usize) {
        let max = self.hospital_rows().saturating_sub(1);
        self.hospital_selection = (self.hospital_selection + by).min(max);
    }

    pub fn select_hospital_up(&mut self, by: usize) {
        self.hospital_selection = self.hospital_selection.saturating_sub(by);
    }

    pub fn select_last_hospital(&mut self) {
        self.hospital_selection = self.hospital_rows().saturating_sub(1);
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Start a fresh registration form.
    pub fn open_registration(&mut self) {
        self.form = RegistrationForm::default();
        self.form_focus = FormField::Name;
        self.form_state = FormState::default();
    }

    pub fn is_editing_form(&self) -> bool {
        self.current_tab == Tab::Register && !self.form_state.is_submitted()
    }

    fn focused_text_mut(&mut self) -> Option<&mut String> {
        match self.form_focus {
            FormField::Name => Some(&mut self.form.name),
            FormField::Contact => Some(&mut self.form.contact),
            FormField::Location => Some(&mut self.form.location),
            FormField::BloodGroup | FormField::Submit => None,
        }
    }

    /// Append a character to the focused text field. Returns false if rejected.
    pub fn push_form_char(&mut self, c: char) -> bool {
        match self.focused_text_mut() {
            Some(field) if can_add_field_char(field.chars().count(), c) => {
                field.push(c);
                true
            }
            _ => false,
        }
    }

    pub fn pop_form_char(&mut self) {
        if let Some(field) = self.focused_text_mut() {
            field.pop();
        }
    }

    pub fn cycle_blood_group(&mut self, forward: bool) {
        let next = match self.form.blood_group {
            Some(group) if forward => group.next(),
            Some(group) => group.prev(),
            None => BloodGroup::ALL[0],
        };
        self.form.blood_group = Some(next);
    }

    /// Validate and write the form. Errors stay on the form as messages.
    pub async fn submit_registration(&mut self) {
        self.status_message = Some("Registering donor...".to_string());
        self.form_state = self.registration.submit(&self.form).await;
        self.status_message = match self.form_state {
            FormState::Submitted { .. } => Some(SUCCESS_MESSAGE.to_string()),
            FormState::Editing { .. } => None,
        };
    }
}

// ============================================================================
// Input validation helpers (exported for use in input.rs)
// ============================================================================

/// Check if a form character should be accepted (no control characters)
pub fn can_add_field_char(current_len: usize, c: char) -> bool {
    current_len < MAX_FIELD_LENGTH && !c.is_control()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use bloodbank_core::store::{
        generate_document_id, Document, LocalStore, NewDocument, Record, DONORS_COLLECTION,
    };
    use bloodbank_core::StoreError;
    use bloodbank_core::PlaceholderGeocoder;

    fn test_app() -> (App, std::path::PathBuf) {
        let dir = std::env::temp_dir().join(format!("bloodbank-app-{}", generate_document_id()));
        let store: Arc<dyn DataStore> = Arc::new(LocalStore::new(dir.clone()).unwrap());
        (App::new(store, Arc::new(PlaceholderGeocoder)), dir)
    }

    /// Drain background results until no load is in flight.
    async fn wait_until_loaded(app: &mut App) {
        for _ in 0..200 {
            app.check_background_tasks();
            if !app.loading {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("dashboard load did not finish");
    }

    /// Store whose reads panic.
    struct PanickingStore;

    #[async_trait::async_trait]
    impl DataStore for PanickingStore {
        fn backend_name(&self) -> &'static str {
            "panicking"
        }

        async fn fetch_all(&self, _collection: &str) -> Result<Vec<Document>, StoreError> {
            panic!("store exploded");
        }

        async fn insert(&self, _collection: &str, _document: NewDocument) -> Result<String, StoreError> {
            Err(StoreError::PermissionDenied("read-only".to_string()))
        }
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            assert!(app.push_form_char(c));
        }
    }

    // -------------------------------------------------------------------------
    // Tab / Field Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_tab_next_prev() {
        assert_eq!(Tab::Dashboard.next(), Tab::Register);
        assert_eq!(Tab::Register.next(), Tab::Dashboard);
        assert_eq!(Tab::Dashboard.prev(), Tab::Register);
        assert_eq!(Tab::Register.prev(), Tab::Dashboard);
    }

    #[test]
    fn test_form_field_cycle() {
        let mut field = FormField::Name;
        let mut seen = vec![field];
        for _ in 0..4 {
            field = field.next();
            seen.push(field);
        }
        assert_eq!(
            seen,
            vec![
                FormField::Name,
                FormField::BloodGroup,
                FormField::Contact,
                FormField::Location,
                FormField::Submit
            ]
        );
        assert_eq!(FormField::Submit.next(), FormField::Name);
        assert_eq!(FormField::Name.prev(), FormField::Submit);
    }

    #[test]
    fn test_can_add_field_char() {
        assert!(can_add_field_char(0, 'a'));
        assert!(can_add_field_char(63, 'é'));
        assert!(!can_add_field_char(64, 'a'));
        assert!(!can_add_field_char(0, '\n'));
        assert!(!can_add_field_char(0, '\t'));
        assert!(!can_add_field_char(0, '\x00'));
    }

    // -------------------------------------------------------------------------
    // Form Editing Tests
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_typing_goes_to_focused_field() {
        let (mut app, dir) = test_app();
        app.switch_tab(Tab::Register);

        type_text(&mut app, "Kavya");
        app.form_focus = FormField::BloodGroup;
        assert!(!app.push_form_char('x'));
        app.cycle_blood_group(true);
        app.form_focus = FormField::Contact;
        type_text(&mut app, "98400");
        app.pop_form_char();

        assert_eq!(app.form.name, "Kavya");
        assert_eq!(app.form.blood_group, Some(BloodGroup::ANegative));
        assert_eq!(app.form.contact, "9840");
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_submit_incomplete_form_stays_editing() {
        let (mut app, dir) = test_app();
        app.switch_tab(Tab::Register);
        type_text(&mut app, "Kavya");

        app.submit_registration().await;
        assert!(app.is_editing_form());
        assert_eq!(app.form_state.error(), Some("Please fill out all the fields."));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_submit_then_reopen_starts_fresh() {
        let (mut app, dir) = test_app();
        app.switch_tab(Tab::Register);
        type_text(&mut app, "Kavya");
        app.form_focus = FormField::Contact;
        type_text(&mut app, "555");
        app.form_focus = FormField::Location;
        type_text(&mut app, "Trichy");

        app.submit_registration().await;
        assert!(app.form_state.is_submitted());
        assert!(!app.is_editing_form());
        assert_eq!(app.status_message.as_deref(), Some(SUCCESS_MESSAGE));

        app.switch_tab(Tab::Register);
        assert!(app.is_editing_form());
        assert_eq!(app.form, RegistrationForm::default());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_hospital_selection_clamped() {
        let (mut app, dir) = test_app();
        app.select_hospital_down(5);
        assert_eq!(app.hospital_selection, 0);

        let hospitals = vec![Default::default(), Default::default(), Default::default()];
        app.apply_snapshot(DashboardSnapshot::build(Vec::new(), hospitals));
        app.select_hospital_down(PAGE_SCROLL_SIZE);
        assert_eq!(app.hospital_selection, 2);
        app.select_hospital_up(1);
        assert_eq!(app.hospital_selection, 1);
        app.select_last_hospital();
        assert_eq!(app.hospital_selection, 2);

        app.apply_snapshot(DashboardSnapshot::build(Vec::new(), Vec::new()));
        assert_eq!(app.hospital_selection, 0);
        let _ = std::fs::remove_dir_all(dir);
    }

    // -------------------------------------------------------------------------
    // Background Load Tests
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_load_task_panic_clears_loading() {
        let store: Arc<dyn DataStore> = Arc::new(PanickingStore);
        let mut app = App::new(store, Arc::new(PlaceholderGeocoder));

        app.load_dashboard();
        assert!(app.loading);
        wait_until_loaded(&mut app).await;

        assert!(app.snapshot.is_none());
        assert!(app
            .status_message
            .as_deref()
            .is_some_and(|m| m.starts_with("Dashboard load failed")));

        // A later reload is accepted rather than refused
        app.load_dashboard();
        assert!(app.loading);
    }

    #[tokio::test]
    async fn test_reload_during_load_is_reissued() {
        let dir = std::env::temp_dir().join(format!("bloodbank-app-{}", generate_document_id()));
        let local = Arc::new(LocalStore::new(dir.clone()).unwrap());
        let store: Arc<dyn DataStore> = local.clone();
        let mut app = App::new(store, Arc::new(PlaceholderGeocoder));

        // First load reads the empty store
        app.load_dashboard();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        // A donor registers, then the dashboard is activated again mid-load
        let mut fields = Record::new();
        fields.insert("name".to_string(), serde_json::json!("Anbu"));
        local
            .insert(DONORS_COLLECTION, NewDocument::new(fields))
            .await
            .unwrap();
        app.switch_tab(Tab::Dashboard);
        assert!(app.loading);

        wait_until_loaded(&mut app).await;
        let snapshot = app.snapshot.as_ref().unwrap();
        assert_eq!(snapshot.metrics.donor_count, 1);
        let _ = std::fs::remove_dir_all(dir);
    }
}
