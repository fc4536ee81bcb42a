use photo_storage::StorageConfig;
use std::path::PathBuf;

/// Get the app data directory for the current platform
pub fn get_app_data_dir() -> PathBuf {
    #[cfg(target_os = "android")]
    {
        match photo_storage::platform::files_dir() {
            Ok(dir) => return dir,
            Err(e) => log::warn!("getFilesDir failed, trying fallbacks: {}", e),
        }
        // Fallbacks
        for d in [
            "/data/user/0/dev.dioxus.main/files",
            "/data/data/dev.dioxus.main/files",
        ] {
            let p = PathBuf::from(d);
            if p.exists() {
                return p;
            }
        }
        PathBuf::from("./data")
    }

    #[cfg(not(target_os = "android"))]
    {
        // On desktop, use ./data directory
        PathBuf::from("./data")
    }
}

/// Storage layout for this device, with `androidstorage.toml` overrides
pub fn load_config() -> StorageConfig {
    let dir = get_app_data_dir();
    match StorageConfig::load(&dir) {
        Ok(config) => config,
        Err(e) => {
            log::warn!("Ignoring broken config in {:?}: {}", dir, e);
            StorageConfig::for_data_dir(dir)
        }
    }
}
