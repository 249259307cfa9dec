//! Transaction ledger aggregation
//!
//! Builds engine inputs (per-category totals, monthly income and spend) from
//! a flat list of transactions. Reading and summing only; storage belongs to
//! the caller.

use std::fmt;
use std::io::Read;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::CategoryAmounts;
use crate::normalize::round_currency;

/// Number of transactions kept in a snapshot's recent list
pub const RECENT_TRANSACTIONS: usize = 10;

/// Direction of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    #[default]
    Expense,
}

impl FromStr for TransactionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "income" | "credit" => Ok(Self::Income),
            "expense" | "debit" | "" => Ok(Self::Expense),
            other => Err(Error::InvalidData(format!(
                "Unknown transaction type: {}",
                other
            ))),
        }
    }
}

/// A single ledger entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: NaiveDate,
    /// Always stored as an absolute value; direction comes from `transaction_type`
    pub amount: f64,
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub transaction_type: TransactionType,
}

impl Transaction {
    pub fn expense(date: NaiveDate, amount: f64, category: &str) -> Self {
        Self {
            date,
            amount: amount.abs(),
            category: category.to_string(),
            description: None,
            transaction_type: TransactionType::Expense,
        }
    }

    pub fn income(date: NaiveDate, amount: f64, category: &str) -> Self {
        Self {
            transaction_type: TransactionType::Income,
            ..Self::expense(date, amount, category)
        }
    }

    pub fn is_expense(&self) -> bool {
        self.transaction_type == TransactionType::Expense
    }
}

/// A calendar month (`YYYY-MM`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Month {
    year: i32,
    month: u32,
}

impl Month {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(Error::InvalidData(format!("Invalid month: {}", month)));
        }
        Ok(Self { year, month })
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// The month before this one
    pub fn previous(&self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Month {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidData(format!("Invalid month (expected YYYY-MM): {}", s));
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        Self::new(year, month)
    }
}

impl TryFrom<String> for Month {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Month> for String {
    fn from(month: Month) -> Self {
        month.to_string()
    }
}

/// Read transactions from CSV with a
/// `date,amount,category,description,transaction_type` header.
///
/// `description` and `transaction_type` may be blank or missing; the type
/// defaults to expense.
pub fn read_transactions_csv<R: Read>(reader: R) -> Result<Vec<Transaction>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));

    let date_col = column("date").ok_or_else(|| Error::InvalidData("Missing date column".into()))?;
    let amount_col =
        column("amount").ok_or_else(|| Error::InvalidData("Missing amount column".into()))?;
    let category_col =
        column("category").ok_or_else(|| Error::InvalidData("Missing category column".into()))?;
    let description_col = column("description");
    let type_col = column("transaction_type");

    let mut transactions = Vec::new();
    for result in rdr.records() {
        let record = result?;

        let date = parse_date(record.get(date_col).unwrap_or(""))?;
        let amount = parse_amount(record.get(amount_col).unwrap_or(""))?;
        let category = record
            .get(category_col)
            .map(|s| s.to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::InvalidData(format!("Missing category on {}", date)))?;
        let description = description_col
            .and_then(|col| record.get(col))
            .map(|s| s.to_string())
            .filter(|s| !s.is_empty());
        let transaction_type = match type_col.and_then(|col| record.get(col)) {
            Some(value) => value.parse()?,
            None => TransactionType::Expense,
        };

        transactions.push(Transaction {
            date,
            amount: amount.abs(),
            category,
            description,
            transaction_type,
        });
    }

    debug!("Parsed {} transactions", transactions.len());
    Ok(transactions)
}

/// Expense totals per category for one month
pub fn category_totals(transactions: &[Transaction], month: Month) -> CategoryAmounts {
    let mut totals = CategoryAmounts::new();
    for tx in transactions
        .iter()
        .filter(|tx| tx.is_expense() && month.contains(tx.date))
    {
        *totals.entry(tx.category.clone()).or_insert(0.0) += tx.amount;
    }
    for amount in totals.values_mut() {
        *amount = round_currency(*amount);
    }
    totals
}

/// Month of the newest transaction, if any
pub fn latest_month(transactions: &[Transaction]) -> Option<Month> {
    transactions.iter().map(|tx| tx.date).max().map(Month::of)
}

fn sum_where(transactions: &[Transaction], month: Month, kind: TransactionType) -> f64 {
    transactions
        .iter()
        .filter(|tx| tx.transaction_type == kind && month.contains(tx.date))
        .map(|tx| tx.amount)
        .sum()
}

/// Month-level figures used to build engine requests and dashboards
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySnapshot {
    pub month: Month,
    pub total_income: f64,
    pub total_expenses: f64,
    /// Income minus expenses (negative when overspent)
    pub savings: f64,
    pub last_month_total_expenses: f64,
    pub current_expenses: CategoryAmounts,
    pub last_month_expenses: CategoryAmounts,
    /// Newest first
    pub recent_transactions: Vec<Transaction>,
}

impl MonthlySnapshot {
    pub fn compute(transactions: &[Transaction], month: Month) -> Self {
        let total_income = round_currency(sum_where(transactions, month, TransactionType::Income));
        let total_expenses =
            round_currency(sum_where(transactions, month, TransactionType::Expense));
        let previous = month.previous();

        let mut recent: Vec<Transaction> = transactions.to_vec();
        recent.sort_by(|a, b| b.date.cmp(&a.date));
        recent.truncate(RECENT_TRANSACTIONS);

        Self {
            month,
            total_income,
            total_expenses,
            savings: round_currency(total_income - total_expenses),
            last_month_total_expenses: round_currency(sum_where(
                transactions,
                previous,
                TransactionType::Expense,
            )),
            current_expenses: category_totals(transactions, month),
            last_month_expenses: category_totals(transactions, previous),
            recent_transactions: recent,
        }
    }
}

/// Parse a date in one of the common ledger formats
fn parse_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();

    let formats = [
        "%Y-%m-%d", // 2024-01-15
        "%d/%m/%Y", // 15/01/2024
        "%d-%m-%Y", // 15-01-2024
    ];

    for fmt in formats {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(date);
        }
    }

    Err(Error::InvalidData(format!("Unable to parse date: {}", s)))
}

/// Parse an amount, dropping currency symbols and thousands separators
fn parse_amount(s: &str) -> Result<f64> {
    let cleaned: String = s.trim().replace(['₹', '$', ',', ' '], "");

    let amount = cleaned
        .parse::<f64>()
        .map_err(|_| Error::InvalidData(format!("Unable to parse amount: {}", s)))?;
    if !amount.is_finite() {
        return Err(Error::InvalidData(format!("Unable to parse amount: {}", s)));
    }
    Ok(amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2024-01-15").unwrap(), date(2024, 1, 15));
        assert_eq!(parse_date("15/01/2024").unwrap(), date(2024, 1, 15));
        assert!(parse_date("January 15").is_err());
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("₹1,234.56").unwrap(), 1234.56);
        assert_eq!(parse_amount("-250").unwrap(), -250.0);
        assert!(parse_amount("NaN").is_err());
        assert!(parse_amount("abc").is_err());
    }

    #[test]
    fn test_month_parse_and_previous() {
        let month: Month = "2024-01".parse().unwrap();
        assert_eq!(month.previous().to_string(), "2023-12");
        assert_eq!("2024-03".parse::<Month>().unwrap().previous().to_string(), "2024-02");
        assert!("2024-13".parse::<Month>().is_err());
        assert!("2024".parse::<Month>().is_err());

        let json = serde_json::to_string(&month).unwrap();
        assert_eq!(json, r#""2024-01""#);
    }

    #[test]
    fn test_read_transactions_csv() {
        let csv = "date,amount,category,description,transaction_type
2024-03-01,50000,Salary,March salary,income
2024-03-02,-1200.50,Food,Groceries,expense
2024-03-03,\"₹2,000\",Transport,,
";
        let txs = read_transactions_csv(csv.as_bytes()).unwrap();
        assert_eq!(txs.len(), 3);
        assert_eq!(txs[0].transaction_type, TransactionType::Income);
        assert_eq!(txs[1].amount, 1200.50);
        assert_eq!(txs[1].description.as_deref(), Some("Groceries"));
        assert_eq!(txs[2].amount, 2000.0);
        assert_eq!(txs[2].transaction_type, TransactionType::Expense);
        assert!(txs[2].description.is_none());
    }

    #[test]
    fn test_read_transactions_csv_minimal_columns() {
        let csv = "Date,Amount,Category\n2024-03-02,100,Food\n";
        let txs = read_transactions_csv(csv.as_bytes()).unwrap();
        assert_eq!(txs.len(), 1);
        assert!(txs[0].is_expense());
    }

    #[test]
    fn test_read_transactions_csv_errors() {
        assert!(read_transactions_csv("date,category\n2024-01-01,Food\n".as_bytes()).is_err());
        assert!(read_transactions_csv(
            "date,amount,category,transaction_type\n2024-01-01,5,Food,refund\n".as_bytes()
        )
        .is_err());
    }

    #[test]
    fn test_category_totals_filters_month_and_type() {
        let txs = vec![
            Transaction::expense(date(2024, 3, 1), 100.0, "Food"),
            Transaction::expense(date(2024, 3, 15), 50.25, "Food"),
            Transaction::expense(date(2024, 2, 28), 999.0, "Food"),
            Transaction::income(date(2024, 3, 1), 50000.0, "Salary"),
        ];
        let totals = category_totals(&txs, Month::new(2024, 3).unwrap());
        assert_eq!(totals.len(), 1);
        assert_eq!(totals["Food"], 150.25);
    }

    #[test]
    fn test_monthly_snapshot() {
        let mut txs = vec![
            Transaction::income(date(2024, 3, 1), 50000.0, "Salary"),
            Transaction::expense(date(2024, 3, 5), 12000.0, "Rent"),
            Transaction::expense(date(2024, 3, 9), 3000.0, "Food"),
            Transaction::expense(date(2024, 2, 9), 2000.0, "Food"),
        ];
        for day in 10..=20 {
            txs.push(Transaction::expense(date(2024, 3, day), 10.0, "Other"));
        }

        let snapshot = MonthlySnapshot::compute(&txs, Month::new(2024, 3).unwrap());
        assert_eq!(snapshot.total_income, 50000.0);
        assert_eq!(snapshot.total_expenses, 15110.0);
        assert_eq!(snapshot.savings, 34890.0);
        assert_eq!(snapshot.last_month_total_expenses, 2000.0);
        assert_eq!(snapshot.current_expenses["Other"], 110.0);
        assert_eq!(snapshot.last_month_expenses["Food"], 2000.0);
        assert_eq!(snapshot.recent_transactions.len(), RECENT_TRANSACTIONS);
        assert_eq!(snapshot.recent_transactions[0].date, date(2024, 3, 20));
    }

    #[test]
    fn test_snapshot_january_looks_at_december() {
        let txs = vec![Transaction::expense(date(2023, 12, 31), 400.0, "Bills")];
        let snapshot = MonthlySnapshot::compute(&txs, Month::new(2024, 1).unwrap());
        assert_eq!(snapshot.total_expenses, 0.0);
        assert_eq!(snapshot.last_month_expenses["Bills"], 400.0);
        assert_eq!(snapshot.savings, 0.0);
    }

    #[test]
    fn test_latest_month() {
        let txs = vec![
            Transaction::expense(date(2024, 2, 9), 10.0, "Food"),
            Transaction::expense(date(2024, 4, 1), 10.0, "Food"),
            Transaction::income(date(2024, 3, 1), 10.0, "Salary"),
        ];
        assert_eq!(latest_month(&txs), Some(Month::new(2024, 4).unwrap()));
        assert_eq!(latest_month(&[]), None);
    }
}
