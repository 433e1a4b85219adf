use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use std::path::PathBuf;

use crate::error::ExpenseError;
use crate::models::{parse_date, sum_amounts, Category, Expense, ExpenseForm};
use crate::store::ExpenseStore;
use crate::util::{format_amount, format_percent, truncate};

pub(crate) fn as_cli(args: &[String], store: &ExpenseStore) -> Result<()> {
    let Some(command) = args.get(1) else {
        print_usage();
        return Ok(());
    };
    let rest = CliArgs::parse(&args[2..])?;
    match command.as_str() {
        "add" | "a" => cli_add(&rest, store),
        "list" | "ls" => cli_list(&rest, store),
        "show" => cli_show(&rest, store),
        "edit" => cli_edit(&rest, store),
        "delete" | "rm" => cli_delete(&rest, store),
        "total" => cli_total(store),
        "stats" | "s" => cli_stats(store),
        "categories" => cli_categories(),
        "export" => cli_export(&rest, store),
        "clear" => cli_clear(&rest, store),
        "--help" | "-h" | "help" => {
            print_usage();
            Ok(())
        }
        "--version" | "-V" | "version" => {
            println!("spendlog {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => {
            print_usage();
            anyhow::bail!("Unknown command: {other}");
        }
    }
}

fn print_usage() {
    println!("spendlog: local-only personal expense tracker");
    println!();
    println!("Usage: spendlog <command>");
    println!();
    println!("Commands:");
    println!("  add <title> <amount> <category>   Record an expense");
    println!("    --date <YYYY-MM-DD>             Expense date (default: today)");
    println!("    --note <text>                   Optional description");
    println!("  list                              List expenses, newest first");
    println!("    --from <YYYY-MM-DD>             Only expenses on or after this date");
    println!("    --to <YYYY-MM-DD>               Only expenses on or before this date");
    println!("  show <id>                         Show one expense");
    println!("  edit <id>                         Change an expense; takes the add flags plus");
    println!("    --title, --amount, --category");
    println!("  delete <id>                       Delete an expense");
    println!("  total                             Total and average spending");
    println!("  stats                             Spending by category and by month");
    println!("  categories                        List the available categories");
    println!("  export [path]                     Export expenses to CSV");
    println!("    --month <YYYY-MM>               Month to export (default: all)");
    println!("  clear --yes                       Delete every expense");
    println!("  --help, -h                        Show this help");
    println!("  --version, -V                     Show version");
    println!();
    println!("The database lives in the user data directory unless SPENDLOG_DB is set.");
}

const VALUE_FLAGS: &[&str] = &[
    "--date", "--note", "--from", "--to", "--title", "--amount", "--category", "--month",
];
const SWITCHES: &[&str] = &["--yes"];

/// Command arguments split into positionals, `--flag value` pairs and
/// bare switches. A flag's value is taken verbatim, even when it looks
/// like another flag; everything after `--` is positional.
#[derive(Debug, Default)]
struct CliArgs<'a> {
    positional: Vec<&'a str>,
    values: Vec<(&'a str, &'a str)>,
    switches: Vec<&'a str>,
}

impl<'a> CliArgs<'a> {
    fn parse(args: &'a [String]) -> Result<Self> {
        let mut parsed = Self::default();
        let mut iter = args.iter().map(String::as_str);
        while let Some(arg) = iter.next() {
            if arg == "--" {
                parsed.positional.extend(iter.by_ref());
                break;
            }
            if VALUE_FLAGS.contains(&arg) {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("Missing value for {arg}"))?;
                parsed.values.push((arg, value));
            } else if SWITCHES.contains(&arg) {
                parsed.switches.push(arg);
            } else if arg.starts_with("--") {
                anyhow::bail!("Unknown option: {arg}");
            } else {
                parsed.positional.push(arg);
            }
        }
        Ok(parsed)
    }

    /// Value of `name`; the last occurrence wins.
    fn value(&self, name: &str) -> Option<&'a str> {
        self.values
            .iter()
            .rev()
            .find(|(flag, _)| *flag == name)
            .map(|(_, value)| *value)
    }

    fn has(&self, switch: &str) -> bool {
        self.switches.contains(&switch)
    }
}

fn parse_id(args: &CliArgs<'_>, usage: &str) -> Result<i64> {
    let raw = args
        .positional
        .first()
        .copied()
        .ok_or_else(|| anyhow::anyhow!("Usage: {usage}"))?;
    raw.parse::<i64>()
        .with_context(|| format!("Invalid expense id: {raw}"))
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn cli_add(args: &CliArgs<'_>, store: &ExpenseStore) -> Result<()> {
    let [title, amount, category] = args.positional[..] else {
        anyhow::bail!("Usage: spendlog add <title> <amount> <category> [--date YYYY-MM-DD] [--note TEXT]");
    };

    let form = ExpenseForm {
        title: title.to_string(),
        amount: amount.to_string(),
        category: category.to_string(),
        date: args
            .value("--date")
            .map(str::to_string)
            .unwrap_or_else(|| today().format("%Y-%m-%d").to_string()),
        description: args.value("--note").unwrap_or_default().to_string(),
    };
    let draft = form.validate(today())?;
    let expense = store.add(&draft)?;
    println!(
        "Added expense #{}: {} {} ({})",
        expense.id,
        expense.title,
        format_amount(expense.amount),
        expense.category
    );
    Ok(())
}

fn cli_list(args: &CliArgs<'_>, store: &ExpenseStore) -> Result<()> {
    let from = args.value("--from").map(parse_date).transpose()?;
    let to = args.value("--to").map(parse_date).transpose()?;

    let expenses = if from.is_some() || to.is_some() {
        store.filter_by_date_range(
            from.unwrap_or(NaiveDate::MIN),
            to.unwrap_or(NaiveDate::MAX),
        )
    } else {
        store.expenses()
    };

    if expenses.is_empty() {
        println!("No expenses");
        return Ok(());
    }

    println!(
        "{:<5} {:<10} {:<14} {:>12}  Title",
        "ID", "Date", "Category", "Amount"
    );
    println!("{}", "─".repeat(70));
    for e in &expenses {
        println!(
            "{:<5} {:<10} {:<14} {:>12}  {}",
            e.id,
            e.date.to_string(),
            e.category.as_str(),
            format_amount(e.amount),
            truncate(&e.title, 30)
        );
    }
    let listed = sum_amounts(expenses.iter().map(|e| e.amount))?;
    println!("{}", "─".repeat(70));
    println!("{} expenses, {}", expenses.len(), format_amount(listed));
    Ok(())
}

fn cli_show(args: &CliArgs<'_>, store: &ExpenseStore) -> Result<()> {
    let id = parse_id(args, "spendlog show <id>")?;
    let expense = store.fetch(id)?.ok_or(ExpenseError::NotFound(id))?;
    print_expense(&expense);
    Ok(())
}

fn print_expense(e: &Expense) {
    println!("Expense #{}", e.id);
    println!("  Title:       {}", e.title);
    println!("  Amount:      {}", format_amount(e.amount));
    println!("  Category:    {}", e.category);
    println!("  Date:        {}", e.date.format("%A, %B %-d, %Y"));
    if !e.description.is_empty() {
        println!("  Description: {}", e.description);
    }
    println!("  Created:     {}", e.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("  Updated:     {}", e.updated_at.format("%Y-%m-%d %H:%M:%S UTC"));
}

fn cli_edit(args: &CliArgs<'_>, store: &ExpenseStore) -> Result<()> {
    let id = parse_id(args, "spendlog edit <id> [--title T] [--amount A] [--category C] [--date D] [--note N]")?;
    let existing = store.get(id).ok_or(ExpenseError::NotFound(id))?;

    let mut form = ExpenseForm::from_expense(&existing);
    let fields = [
        ("--title", &mut form.title),
        ("--amount", &mut form.amount),
        ("--category", &mut form.category),
        ("--date", &mut form.date),
        ("--note", &mut form.description),
    ];
    let mut changed = false;
    for (name, field) in fields {
        if let Some(value) = args.value(name) {
            *field = value.to_string();
            changed = true;
        }
    }
    if !changed {
        anyhow::bail!("Nothing to change; pass at least one of --title, --amount, --category, --date, --note");
    }

    let draft = form.validate(today())?;
    let updated = store.update(id, &draft)?;
    println!("Updated expense #{}", updated.id);
    print_expense(&updated);
    Ok(())
}

fn cli_delete(args: &CliArgs<'_>, store: &ExpenseStore) -> Result<()> {
    let id = parse_id(args, "spendlog delete <id>")?;
    store.delete(id)?;
    println!("Deleted expense #{id}");
    Ok(())
}

fn cli_total(store: &ExpenseStore) -> Result<()> {
    let count = store.expenses().len();
    println!("Total spent:   {}", format_amount(store.total()?));
    println!("Transactions:  {count}");
    if let Some(avg) = store.average()? {
        println!("Average:       {}", format_amount(avg));
    }
    Ok(())
}

fn cli_stats(store: &ExpenseStore) -> Result<()> {
    let total = store.total()?;
    let by_category = store.category_breakdown()?;
    let by_month = store.monthly_breakdown()?;

    cli_total(store)?;

    if !by_category.is_empty() {
        println!();
        println!("Spending by Category:");
        for summary in &by_category {
            println!(
                "  {:<16} {:>12} {:>7}  ({} expenses)",
                summary.category.as_str(),
                format_amount(summary.total),
                format_percent(summary.percent_of(total)),
                summary.count
            );
        }
    }

    if !by_month.is_empty() {
        println!();
        println!("Monthly Trend:");
        for summary in &by_month {
            println!(
                "  {:<8} {:>12}  ({} expenses)",
                summary.month,
                format_amount(summary.total),
                summary.count
            );
        }
    }
    Ok(())
}

fn cli_categories() -> Result<()> {
    for category in Category::all() {
        println!("{category}");
    }
    Ok(())
}

fn cli_export(args: &CliArgs<'_>, store: &ExpenseStore) -> Result<()> {
    let month = args.value("--month");
    if let Some(m) = month {
        parse_date(&format!("{m}-01"))
            .map_err(|_| anyhow::anyhow!("Invalid month '{m}'; expected YYYY-MM"))?;
    }
    let output_path = args
        .positional
        .first()
        .map(|p| expand_home(p))
        .unwrap_or_else(|| match month {
            Some(m) => PathBuf::from(format!("spendlog-export-{m}.csv")),
            None => PathBuf::from("spendlog-export.csv"),
        });

    let count = store
        .export_csv(&output_path, month)
        .with_context(|| format!("Failed to export to {}", output_path.display()))?;
    if count == 0 {
        println!("No expenses to export");
    } else {
        println!("Exported {count} expenses to {}", output_path.display());
    }
    Ok(())
}

fn cli_clear(args: &CliArgs<'_>, store: &ExpenseStore) -> Result<()> {
    if !args.has("--yes") {
        anyhow::bail!("This permanently deletes every expense. Re-run with --yes to confirm.");
    }
    let removed = store.clear()?;
    println!("Deleted {removed} expenses");
    Ok(())
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), directories::UserDirs::new()) {
        (Some(rest), Some(dirs)) => dirs.home_dir().join(rest),
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod cli_tests;
