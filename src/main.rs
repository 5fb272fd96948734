use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use std::env;
use std::path::PathBuf;

use expense_ledger::{
    add_category, add_expense, import_expenses, list_categories, list_expenses_with_categories,
    load_csv, sum_for_date, sum_for_range, ExpenseRouter, DATE_FORMAT,
};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("help");

    match command {
        "init" => run_init(),
        "add-category" => run_add_category(&args[2..]),
        "add-expense" => run_add_expense(&args[2..]),
        "list" => run_list(),
        "categories" => run_categories(),
        "sum" => run_sum(&args[2..]),
        "import" => run_import(&args[2..]),
        "export" => run_export(),
        _ => {
            print_usage();
            Ok(())
        }
    }
}

fn print_usage() {
    println!("expense-ledger {}", expense_ledger::VERSION);
    println!();
    println!("Usage:");
    println!("  expense-ledger init");
    println!("  expense-ledger add-category <name>");
    println!("  expense-ledger add-expense <value> <category-id> <YYYY-MM-DD>");
    println!("  expense-ledger list");
    println!("  expense-ledger categories");
    println!("  expense-ledger sum <YYYY-MM-DD> [<YYYY-MM-DD>]");
    println!("  expense-ledger import <file.csv>");
    println!("  expense-ledger export");
    println!();
    println!("The store lives at $EXPENSE_LEDGER_DB (default ./expenses.db).");
}

fn db_path() -> PathBuf {
    env::var_os("EXPENSE_LEDGER_DB")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("expenses.db"))
}

fn open_router() -> Result<ExpenseRouter> {
    let path = db_path();
    ExpenseRouter::open(&path).with_context(|| format!("Failed to open store at {path:?}"))
}

fn parse_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text, DATE_FORMAT)
        .with_context(|| format!("Expected a YYYY-MM-DD date, got `{text}`"))
}

fn run_init() -> Result<()> {
    let path = db_path();
    ExpenseRouter::open(&path).with_context(|| format!("Failed to open store at {path:?}"))?;
    println!("✓ Store ready at {path:?}");
    Ok(())
}

fn run_add_category(args: &[String]) -> Result<()> {
    let Some(name) = args.first() else {
        bail!("Usage: expense-ledger add-category <name>");
    };

    let router = open_router()?;
    let id = add_category(&router, name)?;
    println!("✓ Added category #{id}: {name}");
    Ok(())
}

fn run_add_expense(args: &[String]) -> Result<()> {
    let [value, category_id, date] = args else {
        bail!("Usage: expense-ledger add-expense <value> <category-id> <YYYY-MM-DD>");
    };

    let value: f64 = value
        .parse()
        .with_context(|| format!("Expected a decimal amount, got `{value}`"))?;
    let category_id: i64 = category_id
        .parse()
        .with_context(|| format!("Expected a category id, got `{category_id}`"))?;
    let date = parse_date(date)?;

    let router = open_router()?;
    let id = add_expense(&router, value, category_id, date)?;
    println!("✓ Added expense #{id}: {value} on {date}");
    Ok(())
}

fn run_list() -> Result<()> {
    let router = open_router()?;
    let rows = list_expenses_with_categories(&router)?;

    if rows.is_empty() {
        println!("No expenses recorded.");
        return Ok(());
    }

    for row in &rows {
        println!("#{:<4} {:>10.2}  {:12} {}", row.id, row.value, row.category_name, row.date);
    }
    println!("✓ {} expense(s)", rows.len());
    Ok(())
}

fn run_categories() -> Result<()> {
    let router = open_router()?;
    let categories = list_categories(&router)?;

    for category in &categories {
        println!("#{:<4} {}", category.id, category.name);
    }
    println!("✓ {} categories", categories.len());
    Ok(())
}

fn run_sum(args: &[String]) -> Result<()> {
    let router = open_router()?;

    let sum = match args {
        [date] => sum_for_date(&router, parse_date(date)?)?,
        [from, to] => sum_for_range(&router, parse_date(from)?, parse_date(to)?)?,
        _ => bail!("Usage: expense-ledger sum <YYYY-MM-DD> [<YYYY-MM-DD>]"),
    };

    match sum {
        Some(total) => println!("✓ Total: {total:.2}"),
        None => println!("No matching expenses."),
    }
    Ok(())
}

fn run_import(args: &[String]) -> Result<()> {
    let Some(csv_path) = args.first() else {
        bail!("Usage: expense-ledger import <file.csv>");
    };

    let router = open_router()?;

    println!("📂 Loading {csv_path}...");
    let records = load_csv(csv_path.as_ref())?;
    println!("✓ Loaded {} record(s)", records.len());

    let inserted = import_expenses(&router, &records)?;
    println!("✓ Inserted {inserted} expense(s)");
    Ok(())
}

fn run_export() -> Result<()> {
    let router = open_router()?;
    let rows = list_expenses_with_categories(&router)?;
    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}
