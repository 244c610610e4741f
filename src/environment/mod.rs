//! Environment management.
//!
//! This module loads environment documents (`$shared` plus named
//! environments) and tracks which environment is selected. Environments let
//! users keep different sets of variables for different contexts (local,
//! staging, production) and switch between them.
//!
//! # Example
//!
//! ```
//! use httprex::environment::EnvironmentManager;
//!
//! let manager = EnvironmentManager::new();
//! manager
//!     .load_from_str(r#"{"$shared": {"version": "v1"}, "local": {"baseUrl": "http://localhost:3000"}}"#)
//!     .unwrap();
//! manager.set_current_environment(Some("local")).unwrap();
//!
//! let vars = manager.environment_variables();
//! assert_eq!(vars["baseUrl"], "http://localhost:3000");
//! assert_eq!(vars["version"], "v1");
//! ```

pub mod loader;
pub mod models;

use crate::models::VariableMap;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub use loader::{
    find_environment_file, load_environment_file, parse_environments, parse_environments_str,
    EnvError, ENV_FILE_NAMES,
};
pub use models::{Environment, Environments, SHARED_KEY};

/// Called with the newly selected environment name, or `None` when the
/// selection is cleared.
pub type EnvironmentListener = Arc<dyn Fn(Option<&str>) + Send + Sync>;

/// Handle returned by [`EnvironmentManager::on_change`].
pub type ListenerId = u64;

/// Options for [`EnvironmentManager::with_options`].
#[derive(Clone, Default)]
pub struct EnvironmentManagerOptions {
    /// Select the first environment after a load when none is selected
    pub auto_select: bool,
    /// Callback notified on every selection change, besides listeners
    pub on_environment_change: Option<EnvironmentListener>,
}

impl std::fmt::Debug for EnvironmentManagerOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvironmentManagerOptions")
            .field("auto_select", &self.auto_select)
            .field("on_environment_change", &self.on_environment_change.is_some())
            .finish()
    }
}

#[derive(Default)]
struct ManagerState {
    environments: Environments,
    current: Option<String>,
    listeners: Vec<(ListenerId, EnvironmentListener)>,
    next_listener_id: ListenerId,
}

/// Holds loaded environments and the current selection.
///
/// Cloning gives another handle to the same state, so one manager can be
/// shared across threads. Listeners run after the internal lock is released
/// and may call back into the manager.
#[derive(Clone)]
pub struct EnvironmentManager {
    state: Arc<RwLock<ManagerState>>,
    options: EnvironmentManagerOptions,
}

impl EnvironmentManager {
    pub fn new() -> Self {
        Self::with_options(EnvironmentManagerOptions::default())
    }

    pub fn with_options(options: EnvironmentManagerOptions) -> Self {
        Self {
            state: Arc::new(RwLock::new(ManagerState::default())),
            options,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, ManagerState> {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, ManagerState> {
        self.state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Loads environments from JSON text, replacing everything loaded before.
    pub fn load_from_str(&self, content: &str) -> Result<(), EnvError> {
        self.load(loader::parse_environments_str(content)?);
        Ok(())
    }

    /// Loads environments from a parsed JSON document.
    pub fn load_from_value(&self, document: &Value) -> Result<(), EnvError> {
        self.load(loader::parse_environments(document)?);
        Ok(())
    }

    /// Loads environments from the file at `path`.
    pub fn load_from_file(&self, path: &Path) -> Result<(), EnvError> {
        self.load(loader::load_environment_file(path)?);
        log::info!("Loaded environments from {}", path.display());
        Ok(())
    }

    /// Searches `workspace` (and up to 3 parents) for an environment file and
    /// loads it. Returns the path loaded, or `None` if there is no file.
    pub fn load_from_workspace(&self, workspace: &Path) -> Result<Option<PathBuf>, EnvError> {
        match loader::find_environment_file(workspace) {
            Some(path) => {
                self.load_from_file(&path)?;
                Ok(Some(path))
            }
            None => {
                log::debug!("No environment file found from {}", workspace.display());
                Ok(None)
            }
        }
    }

    /// Replaces the loaded environments.
    ///
    /// A selection that no longer exists is cleared; with `auto_select` the
    /// first environment is selected when nothing is.
    pub fn load(&self, environments: Environments) {
        let change = {
            let mut state = self.write();
            let previous = state.current.clone();
            state.environments = environments;

            if let Some(current) = &state.current {
                if !state.environments.has_environment(current) {
                    log::warn!("Selected environment '{}' no longer exists", current);
                    state.current = None;
                }
            }
            if self.options.auto_select && state.current.is_none() {
                state.current = state.environments.first().map(|env| env.name.clone());
            }

            log::debug!("Loaded {} environment(s)", state.environments.len());
            (state.current != previous).then(|| self.pending_notification(&state))
        };

        if let Some(notification) = change {
            notification.deliver();
        }
    }

    /// Selects an environment, or clears the selection with `None`.
    ///
    /// Selecting an unknown name fails with [`EnvError::UnknownEnvironment`].
    /// Re-selecting the current environment does not notify anyone.
    pub fn set_current_environment(&self, name: Option<&str>) -> Result<(), EnvError> {
        let notification = {
            let mut state = self.write();
            if let Some(name) = name {
                if !state.environments.has_environment(name) {
                    return Err(EnvError::UnknownEnvironment(name.to_string()));
                }
            }
            if state.current.as_deref() == name {
                return Ok(());
            }

            state.current = name.map(str::to_string);
            self.pending_notification(&state)
        };

        log::debug!("Current environment: {:?}", name);
        notification.deliver();
        Ok(())
    }

    pub fn current_environment(&self) -> Option<Environment> {
        let state = self.read();
        state
            .current
            .as_deref()
            .and_then(|name| state.environments.get_environment(name))
            .cloned()
    }

    pub fn current_environment_name(&self) -> Option<String> {
        self.read().current.clone()
    }

    /// Variables of the current environment, empty when none is selected.
    pub fn environment_variables(&self) -> VariableMap {
        self.current_environment()
            .map(|env| env.variables)
            .unwrap_or_default()
    }

    pub fn get_environment(&self, name: &str) -> Option<Environment> {
        self.read().environments.get_environment(name).cloned()
    }

    pub fn has_environment(&self, name: &str) -> bool {
        self.read().environments.has_environment(name)
    }

    /// Environment names in document order.
    pub fn list_environments(&self) -> Vec<String> {
        self.read().environments.list_environments()
    }

    /// Registers a selection-change listener.
    pub fn on_change<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(Option<&str>) + Send + Sync + 'static,
    {
        let mut state = self.write();
        let id = state.next_listener_id;
        state.next_listener_id += 1;
        state.listeners.push((id, Arc::new(listener)));
        id
    }

    /// Unregisters a listener. Returns `false` if `id` was unknown.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut state = self.write();
        let before = state.listeners.len();
        state.listeners.retain(|(listener_id, _)| *listener_id != id);
        state.listeners.len() != before
    }

    /// Drops all environments and the selection. Listeners are notified with
    /// `None` if something was selected.
    pub fn clear(&self) {
        let notification = {
            let mut state = self.write();
            let had_selection = state.current.take().is_some();
            state.environments = Environments::new();
            had_selection.then(|| self.pending_notification(&state))
        };

        if let Some(notification) = notification {
            notification.deliver();
        }
    }

    fn pending_notification(&self, state: &ManagerState) -> Notification {
        let mut listeners: Vec<EnvironmentListener> =
            state.listeners.iter().map(|(_, l)| l.clone()).collect();
        if let Some(callback) = &self.options.on_environment_change {
            listeners.push(callback.clone());
        }
        Notification {
            current: state.current.clone(),
            listeners,
        }
    }
}

impl Default for EnvironmentManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EnvironmentManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.read();
        f.debug_struct("EnvironmentManager")
            .field("environments", &state.environments.list_environments())
            .field("current", &state.current)
            .field("listeners", &state.listeners.len())
            .field("options", &self.options)
            .finish()
    }
}

/// A change captured under the lock and delivered after it is released.
struct Notification {
    current: Option<String>,
    listeners: Vec<EnvironmentListener>,
}

impl Notification {
    fn deliver(self) {
        for listener in &self.listeners {
            listener(self.current.as_deref());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::thread;

    const TWO_ENVS: &str = r#"{
        "local": {"baseUrl": "http://localhost:3000"},
        "staging": {"baseUrl": "https://staging.example.com"}
    }"#;

    fn recorder() -> (Arc<Mutex<Vec<Option<String>>>>, impl Fn(Option<&str>) + Send + Sync + 'static) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = calls.clone();
        (calls, move |name: Option<&str>| {
            sink.lock().unwrap().push(name.map(str::to_string))
        })
    }

    #[test]
    fn test_load_from_str_and_value() {
        let manager = EnvironmentManager::new();
        manager.load_from_str(TWO_ENVS).unwrap();
        assert_eq!(manager.list_environments(), vec!["local", "staging"]);

        let value: Value = serde_json::from_str(r#"{"only": {"a": "1"}}"#).unwrap();
        manager.load_from_value(&value).unwrap();
        assert_eq!(manager.list_environments(), vec!["only"]);
        assert!(!manager.has_environment("local"));
    }

    #[test]
    fn test_shared_variables_are_merged() {
        let manager = EnvironmentManager::new();
        manager
            .load_from_str(r#"{"$shared": {"apiVersion": "v1", "timeout": "5000"}, "local": {"apiVersion": "v2"}}"#)
            .unwrap();

        let local = manager.get_environment("local").unwrap();
        assert_eq!(local.get("apiVersion").unwrap(), "v2");
        assert_eq!(local.get("timeout").unwrap(), "5000");
        assert_eq!(local.shared_variables, vec!["timeout"]);
    }

    #[test]
    fn test_invalid_json_fails_loudly() {
        let manager = EnvironmentManager::new();
        let err = manager.load_from_str("{ invalid json }").unwrap_err();
        assert!(err.to_string().contains("Invalid http-client.env.json format"));
    }

    #[test]
    fn test_set_current_environment() {
        let manager = EnvironmentManager::new();
        manager.load_from_str(TWO_ENVS).unwrap();

        manager.set_current_environment(Some("local")).unwrap();
        assert_eq!(manager.current_environment_name().as_deref(), Some("local"));
        assert_eq!(
            manager.environment_variables()["baseUrl"],
            "http://localhost:3000"
        );

        manager.set_current_environment(None).unwrap();
        assert_eq!(manager.current_environment_name(), None);
        assert!(manager.environment_variables().is_empty());
    }

    #[test]
    fn test_unknown_environment_fails() {
        let manager = EnvironmentManager::new();
        manager.load_from_str(TWO_ENVS).unwrap();

        let err = manager.set_current_environment(Some("production")).unwrap_err();
        assert_eq!(err, EnvError::UnknownEnvironment("production".to_string()));
        assert_eq!(err.to_string(), "Environment \"production\" not found");
        assert_eq!(manager.current_environment_name(), None);
    }

    #[test]
    fn test_listeners_notified_only_on_change() {
        let manager = EnvironmentManager::new();
        manager.load_from_str(TWO_ENVS).unwrap();
        let (calls, listener) = recorder();
        manager.on_change(listener);

        manager.set_current_environment(Some("local")).unwrap();
        manager.set_current_environment(Some("local")).unwrap();
        manager.set_current_environment(Some("staging")).unwrap();

        assert_eq!(
            *calls.lock().unwrap(),
            vec![Some("local".to_string()), Some("staging".to_string())]
        );
    }

    #[test]
    fn test_remove_listener() {
        let manager = EnvironmentManager::new();
        manager.load_from_str(TWO_ENVS).unwrap();
        let (calls, listener) = recorder();
        let id = manager.on_change(listener);

        assert!(manager.remove_listener(id));
        assert!(!manager.remove_listener(id));
        manager.set_current_environment(Some("local")).unwrap();
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_on_environment_change_option() {
        let (calls, callback) = recorder();
        let manager = EnvironmentManager::with_options(EnvironmentManagerOptions {
            auto_select: false,
            on_environment_change: Some(Arc::new(callback)),
        });
        manager.load_from_str(TWO_ENVS).unwrap();
        manager.set_current_environment(Some("local")).unwrap();

        assert_eq!(*calls.lock().unwrap(), vec![Some("local".to_string())]);
    }

    #[test]
    fn test_auto_select_first() {
        let manager = EnvironmentManager::with_options(EnvironmentManagerOptions {
            auto_select: true,
            ..Default::default()
        });
        manager.load_from_str(TWO_ENVS).unwrap();
        assert_eq!(manager.current_environment_name().as_deref(), Some("local"));

        let plain = EnvironmentManager::new();
        plain.load_from_str(TWO_ENVS).unwrap();
        assert_eq!(plain.current_environment_name(), None);
    }

    #[test]
    fn test_reload_drops_missing_selection() {
        let manager = EnvironmentManager::new();
        manager.load_from_str(TWO_ENVS).unwrap();
        manager.set_current_environment(Some("staging")).unwrap();
        let (calls, listener) = recorder();
        manager.on_change(listener);

        manager.load_from_str(r#"{"local": {}}"#).unwrap();
        assert_eq!(manager.current_environment_name(), None);
        assert_eq!(*calls.lock().unwrap(), vec![None]);
    }

    #[test]
    fn test_reload_keeps_existing_selection() {
        let manager = EnvironmentManager::new();
        manager.load_from_str(TWO_ENVS).unwrap();
        manager.set_current_environment(Some("local")).unwrap();

        manager.load_from_str(r#"{"local": {"baseUrl": "http://127.0.0.1"}}"#).unwrap();
        assert_eq!(manager.environment_variables()["baseUrl"], "http://127.0.0.1");
    }

    #[test]
    fn test_clear_notifies_with_none() {
        let manager = EnvironmentManager::new();
        manager.load_from_str(TWO_ENVS).unwrap();
        manager.set_current_environment(Some("local")).unwrap();
        let (calls, listener) = recorder();
        manager.on_change(listener);

        manager.clear();
        assert!(manager.list_environments().is_empty());
        assert_eq!(manager.current_environment_name(), None);
        assert_eq!(*calls.lock().unwrap(), vec![None]);

        manager.clear();
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_listener_can_reenter_manager() {
        let manager = EnvironmentManager::new();
        manager.load_from_str(TWO_ENVS).unwrap();

        let seen = Arc::new(Mutex::new(None));
        let (handle, sink) = (manager.clone(), seen.clone());
        manager.on_change(move |_| {
            *sink.lock().unwrap() = handle.environment_variables().get("baseUrl").cloned();
        });

        manager.set_current_environment(Some("staging")).unwrap();
        assert_eq!(
            seen.lock().unwrap().as_deref(),
            Some("https://staging.example.com")
        );
    }

    #[test]
    fn test_thread_safety() {
        let manager = EnvironmentManager::new();
        manager.load_from_str(TWO_ENVS).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let manager = manager.clone();
                thread::spawn(move || {
                    let name = if i % 2 == 0 { "local" } else { "staging" };
                    manager.set_current_environment(Some(name)).unwrap();
                    manager.environment_variables().len()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 1);
        }
        assert!(manager.current_environment_name().is_some());
    }
}
