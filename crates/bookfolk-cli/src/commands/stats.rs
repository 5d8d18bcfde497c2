//! Statistics command handlers

use anyhow::{bail, Context, Result};
use chrono::{Datelike, Local, NaiveDate};

use bookfolk_core::stats::{chart_buckets_for_year, monthly_chart_buckets, monthly_completed};
use bookfolk_core::{App, ReadingSummary};

use crate::output::Output;

/// Overview numbers, with the finished books of one month
pub async fn summary(app: &mut App, month: Option<String>, output: &Output) -> Result<()> {
    let reference = match month {
        Some(ref m) => parse_month(m)?,
        None => Local::now().date_naive(),
    };

    let books = app.fetch_books().await.context("Failed to load books")?;
    let summary = ReadingSummary::compute(books, reference);
    let this_month = monthly_completed(books, reference);

    output.print_summary(&summary, &this_month);
    Ok(())
}

/// Books finished per calendar month
pub async fn chart(app: &mut App, year: Option<i32>, output: &Output) -> Result<()> {
    let books = app.fetch_books().await.context("Failed to load books")?;

    match year {
        Some(y) => output.print_chart(
            &format!("Books read per month in {}", y),
            &chart_buckets_for_year(books, y),
        ),
        None => output.print_chart(
            "Books read per month (all years)",
            &monthly_chart_buckets(books),
        ),
    }
    Ok(())
}

/// First day of a `YYYY-MM` month
fn parse_month(value: &str) -> Result<NaiveDate> {
    match NaiveDate::parse_from_str(&format!("{}-01", value.trim()), "%Y-%m-%d") {
        Ok(date) if date.year() > 0 => Ok(date),
        _ => bail!("Invalid month '{}'. Use YYYY-MM.", value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_month() {
        assert_eq!(
            parse_month("2024-03").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
        assert!(parse_month("2024-13").is_err());
        assert!(parse_month("March").is_err());
        assert!(parse_month("2024-03-05").is_err());
    }
}
