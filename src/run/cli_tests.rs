#![allow(clippy::unwrap_used)]

use super::*;

fn argv(args: &[&str]) -> Vec<String> {
    args.iter().map(|a| a.to_string()).collect()
}

// ── CliArgs ───────────────────────────────────────────────────

#[test]
fn test_parse_positionals_and_values() {
    let raw = argv(&["Coffee", "4.50", "--date", "2024-01-10", "Food", "--note", "oat"]);
    let args = CliArgs::parse(&raw).unwrap();
    assert_eq!(args.positional, vec!["Coffee", "4.50", "Food"]);
    assert_eq!(args.value("--date"), Some("2024-01-10"));
    assert_eq!(args.value("--note"), Some("oat"));
    assert_eq!(args.value("--month"), None);
}

#[test]
fn test_parse_value_that_looks_like_a_flag() {
    let raw = argv(&["Coffee", "4.50", "Food", "--note", "--date"]);
    let args = CliArgs::parse(&raw).unwrap();
    assert_eq!(args.value("--note"), Some("--date"));
    assert_eq!(args.value("--date"), None);
    assert_eq!(args.positional, vec!["Coffee", "4.50", "Food"]);
}

#[test]
fn test_parse_double_dash_ends_options() {
    let raw = argv(&["--date", "2024-01-10", "--", "--draft", "5", "Food"]);
    let args = CliArgs::parse(&raw).unwrap();
    assert_eq!(args.positional, vec!["--draft", "5", "Food"]);
    assert_eq!(args.value("--date"), Some("2024-01-10"));
}

#[test]
fn test_parse_unknown_option_is_error() {
    let raw = argv(&["Coffee", "--colour", "red"]);
    let err = CliArgs::parse(&raw).unwrap_err();
    assert!(err.to_string().contains("--colour"));
}

#[test]
fn test_parse_missing_value_is_error() {
    let raw = argv(&["Coffee", "4.50", "Food", "--note"]);
    let err = CliArgs::parse(&raw).unwrap_err();
    assert!(err.to_string().contains("--note"));
}

#[test]
fn test_parse_switches() {
    let raw = argv(&["--yes"]);
    assert!(CliArgs::parse(&raw).unwrap().has("--yes"));

    // "--yes" as a flag value is not a confirmation.
    let raw = argv(&["--note", "--yes"]);
    assert!(!CliArgs::parse(&raw).unwrap().has("--yes"));
}

#[test]
fn test_parse_last_value_wins() {
    let raw = argv(&["--month", "2024-01", "--month", "2024-02"]);
    assert_eq!(CliArgs::parse(&raw).unwrap().value("--month"), Some("2024-02"));
}

#[test]
fn test_parse_single_dash_values_are_positional() {
    let raw = argv(&["Refund", "-5", "Food"]);
    let args = CliArgs::parse(&raw).unwrap();
    assert_eq!(args.positional, vec!["Refund", "-5", "Food"]);
}

#[test]
fn test_parse_id() {
    let raw = argv(&["42"]);
    assert_eq!(parse_id(&CliArgs::parse(&raw).unwrap(), "show <id>").unwrap(), 42);

    let raw = argv(&["abc"]);
    assert!(parse_id(&CliArgs::parse(&raw).unwrap(), "show <id>").is_err());

    let raw: Vec<String> = Vec::new();
    let err = parse_id(&CliArgs::parse(&raw).unwrap(), "show <id>").unwrap_err();
    assert!(err.to_string().contains("Usage"));
}

// ── Commands ──────────────────────────────────────────────────

fn ready_store() -> ExpenseStore {
    let store = ExpenseStore::in_memory();
    store.initialize().unwrap();
    store
}

#[test]
fn test_add_title_starting_with_dashes() {
    let store = ready_store();
    let raw = argv(&["spendlog", "add", "--date", "2024-01-10", "--", "--draft", "5", "Food"]);
    as_cli(&raw, &store).unwrap();

    let added = store.expenses();
    assert_eq!(added.len(), 1);
    assert_eq!(added[0].title, "--draft");
    assert_eq!(added[0].date.to_string(), "2024-01-10");
}

#[test]
fn test_clear_requires_confirmation() {
    let store = ready_store();
    as_cli(&argv(&["spendlog", "add", "Coffee", "4.50", "Food", "--date", "2024-01-10"]), &store)
        .unwrap();

    assert!(as_cli(&argv(&["spendlog", "clear"]), &store).is_err());
    assert_eq!(store.expenses().len(), 1);

    as_cli(&argv(&["spendlog", "clear", "--yes"]), &store).unwrap();
    assert!(store.expenses().is_empty());
}

#[test]
fn test_export_rejects_bad_month() {
    let store = ready_store();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.csv");
    let raw = argv(&["spendlog", "export", path.to_str().unwrap(), "--month", "2024-13"]);
    assert!(as_cli(&raw, &store).is_err());
    assert!(!path.exists());
}

#[test]
fn test_total_overflow_is_error_not_panic() {
    let store = ready_store();
    for title in ["Yacht", "Second yacht"] {
        store
            .add(&crate::models::ExpenseDraft::new(
                title,
                rust_decimal::Decimal::MAX,
                Category::Shopping,
                NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            ))
            .unwrap();
    }
    assert!(as_cli(&argv(&["spendlog", "total"]), &store).is_err());
    assert!(as_cli(&argv(&["spendlog", "stats"]), &store).is_err());
    assert!(as_cli(&argv(&["spendlog", "list"]), &store).is_err());
}
