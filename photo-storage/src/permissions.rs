use crate::sdk::sdk29_and_up;
use std::collections::HashMap;

/// Storage permissions the app asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    ReadExternalStorage,
    WriteExternalStorage,
}

impl Permission {
    /// Manifest name
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ReadExternalStorage => "android.permission.READ_EXTERNAL_STORAGE",
            Permission::WriteExternalStorage => "android.permission.WRITE_EXTERNAL_STORAGE",
        }
    }
}

/// Grant flags for the shared store
///
/// Written only by the controller while it handles an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PermissionState {
    pub read_granted: bool,
    pub write_granted: bool,
}

impl PermissionState {
    /// Flags from the current grant state
    ///
    /// Scoped storage (API 29+) lets the app write its own media without
    /// WRITE_EXTERNAL_STORAGE, so write counts as granted there.
    pub fn evaluate(read_granted: bool, write_granted: bool, sdk_int: u32) -> Self {
        Self {
            read_granted,
            write_granted: write_granted || sdk29_and_up(sdk_int, || true).unwrap_or(false),
        }
    }

    /// Permissions that still have to be requested, write first
    pub fn missing(&self) -> Vec<Permission> {
        let mut to_request = Vec::new();
        if !self.write_granted {
            to_request.push(Permission::WriteExternalStorage);
        }
        if !self.read_granted {
            to_request.push(Permission::ReadExternalStorage);
        }
        to_request
    }

    /// Updates the flags from a request result
    ///
    /// Permissions missing from `results` keep their previous value.
    pub fn apply_results(&mut self, results: &HashMap<Permission, bool>) {
        if let Some(&read) = results.get(&Permission::ReadExternalStorage) {
            self.read_granted = read;
        }
        if let Some(&write) = results.get(&Permission::WriteExternalStorage) {
            self.write_granted = write;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_implicit_on_q() {
        let state = PermissionState::evaluate(false, false, 29);
        assert!(state.write_granted);
        assert_eq!(state.missing(), vec![Permission::ReadExternalStorage]);
    }

    #[test]
    fn test_legacy_requests_both() {
        let state = PermissionState::evaluate(false, false, 28);
        assert_eq!(
            state.missing(),
            vec![
                Permission::WriteExternalStorage,
                Permission::ReadExternalStorage
            ]
        );
    }

    #[test]
    fn test_nothing_missing() {
        assert!(PermissionState::evaluate(true, true, 23).missing().is_empty());
    }

    #[test]
    fn test_apply_results_keeps_absent_flags() {
        let mut state = PermissionState::evaluate(false, true, 28);
        let mut results = HashMap::new();
        results.insert(Permission::ReadExternalStorage, true);
        state.apply_results(&results);
        assert!(state.read_granted);
        assert!(state.write_granted);

        results.clear();
        results.insert(Permission::WriteExternalStorage, false);
        state.apply_results(&results);
        assert!(state.read_granted);
        assert!(!state.write_granted);
    }

    #[test]
    fn test_manifest_names() {
        assert_eq!(
            Permission::ReadExternalStorage.as_str(),
            "android.permission.READ_EXTERNAL_STORAGE"
        );
    }
}
