#![allow(clippy::unwrap_used)]

use super::*;

#[test]
fn test_explicit_db_path_wins() {
    let config = Config::resolve(Some(OsString::from("/tmp/x/expenses.db")), None).unwrap();
    assert_eq!(config.db_path, PathBuf::from("/tmp/x/expenses.db"));
}

#[test]
fn test_default_log_filter() {
    let config = Config::resolve(Some(OsString::from("a.db")), None).unwrap();
    assert_eq!(config.log_filter, DEFAULT_LOG_FILTER);
}

#[test]
fn test_blank_log_filter_falls_back() {
    let config = Config::resolve(Some(OsString::from("a.db")), Some("  ".into())).unwrap();
    assert_eq!(config.log_filter, DEFAULT_LOG_FILTER);
}

#[test]
fn test_custom_log_filter() {
    let config =
        Config::resolve(Some(OsString::from("a.db")), Some("spendlog=debug".into())).unwrap();
    assert_eq!(config.log_filter, "spendlog=debug");
}
