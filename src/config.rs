use std::net::SocketAddr;
use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Portal Cereri";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default bind address for the HTTP server
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8700";

/// Default cap for the admin request listing
pub const DEFAULT_LIST_LIMIT: u32 = 100;

// Practice identity stamped onto approved enrollment documents.
// The portal simulates a single family-doctor practice.
pub const PRACTICE_NAME: &str = "Cabinet Medical Individual";
pub const PRACTICE_CUI: &str = "RO12345678";
pub const PRACTICE_ADDRESS: &str = "Bucuresti, Str. Exemplu, Nr. 1";
pub const PRACTICE_INSURANCE_HOUSE: &str = "CNAS";
pub const PRACTICE_CONTRACT_NUMBER: &str = "123/2024";

/// Get the application data directory
/// ~/PortalCereri/ on all platforms (user-visible)
pub fn app_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("PORTAL_DATA_DIR") {
        return PathBuf::from(dir);
    }
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("PortalCereri")
}

/// Path of the SQLite database holding the requests table
pub fn database_path() -> PathBuf {
    app_data_dir().join("requests.db")
}

/// Bind address for the HTTP server (`PORTAL_BIND` override)
pub fn bind_addr() -> SocketAddr {
    std::env::var("PORTAL_BIND")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| {
            DEFAULT_BIND_ADDR
                .parse()
                .expect("default bind address is valid")
        })
}

/// Default log filter when RUST_LOG is not set
pub fn default_log_filter() -> String {
    "portal_cereri=info,axum=warn".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_path_under_app_data() {
        let db = database_path();
        assert!(db.starts_with(app_data_dir()));
        assert!(db.ends_with("requests.db"));
    }

    #[test]
    fn default_bind_addr_parses() {
        let addr: SocketAddr = DEFAULT_BIND_ADDR.parse().unwrap();
        assert_eq!(addr.port(), 8700);
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.1.0");
    }
}
