use std::env;

use clinic_roster::config::{Config, StoreKind};
use pretty_assertions::assert_eq;
use serial_test::serial;

mod common;

const KEYS: [&str; 8] = [
    "DATABASE_URL",
    "JWT_SECRET",
    "HOST",
    "PORT",
    "ENVIRONMENT",
    "BASE_URL",
    "STORE",
    "LEAVE_BLOCKS_BOOKED_SLOTS",
];

/// Runs `f` with only `vars` set among the config keys, then restores the
/// original environment.
fn with_env(vars: &[(&str, &str)], f: impl FnOnce()) {
    let original: Vec<(&str, Option<String>)> =
        KEYS.iter().map(|key| (*key, env::var(key).ok())).collect();

    unsafe {
        for key in KEYS {
            env::remove_var(key);
        }
        for (key, value) in vars {
            env::set_var(key, value);
        }
    }

    f();

    unsafe {
        for (key, value) in original {
            match value {
                Some(val) => env::set_var(key, val),
                None => env::remove_var(key),
            }
        }
    }
}

#[test]
#[serial]
fn defaults_apply_when_nothing_is_set() {
    common::setup_test_env();
    with_env(&[], || {
        let config = Config::from_env_only().unwrap();

        assert_eq!(config.database_url, "postgres://@localhost:5432/clinic_roster");
        assert_eq!(
            config.jwt_secret,
            "your-super-secret-jwt-key-change-this-in-production-12345"
        );
        assert_eq!(config.server_address(), "127.0.0.1:8080");
        assert!(config.is_development());
        assert_eq!(config.client_base_url, "http://localhost:3000");
        assert_eq!(config.store, StoreKind::Postgres);
        assert!(!config.leave_blocks_booked_slots);
    });
}

#[test]
#[serial]
fn custom_values_are_read() {
    common::setup_test_env();
    with_env(
        &[
            ("DATABASE_URL", "postgres://clinic@db:5432/roster"),
            ("JWT_SECRET", "test-secret"),
            ("HOST", "0.0.0.0"),
            ("PORT", "3000"),
            ("ENVIRONMENT", "production"),
            ("BASE_URL", "https://roster.example.org"),
            ("STORE", "Memory"),
            ("LEAVE_BLOCKS_BOOKED_SLOTS", "yes"),
        ],
        || {
            let config = Config::from_env_only().unwrap();

            assert_eq!(config.database_url, "postgres://clinic@db:5432/roster");
            assert_eq!(config.jwt_secret, "test-secret");
            assert_eq!(config.server_address(), "0.0.0.0:3000");
            assert!(config.is_production());
            assert_eq!(config.client_base_url, "https://roster.example.org");
            assert_eq!(config.store, StoreKind::Memory);
            assert!(config.leave_blocks_booked_slots);
        },
    );
}

#[test]
#[serial]
fn malformed_values_fall_back() {
    common::setup_test_env();
    with_env(
        &[("PORT", "not-a-port"), ("LEAVE_BLOCKS_BOOKED_SLOTS", "maybe")],
        || {
            let config = Config::from_env_only().unwrap();
            assert_eq!(config.port, 8080);
            assert!(!config.leave_blocks_booked_slots);
        },
    );
}
