//! Reading statistics
//!
//! Pure functions over a snapshot of books. Nothing here does I/O or
//! fails: a book whose dates cannot be parsed simply has no effective date.

use chrono::{DateTime, Datelike, Month, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::models::{Book, QuoteEntry};

/// The date a book counts towards: `date_read`, else `date_added`
///
/// Accepts `YYYY-MM-DD`, RFC 3339 timestamps, and naive
/// `YYYY-MM-DDTHH:MM:SS[.fff]`. Timestamps keep the calendar date as
/// written, without converting time zones.
pub fn effective_date(book: &Book) -> Option<NaiveDate> {
    let raw = book
        .date_read
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .unwrap_or(&book.date_added);
    parse_date(raw)
}

/// Parse a stored date string
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|dt| dt.date())
}

/// Completed books whose effective date is in the same month and year as
/// `reference`
pub fn monthly_completed(books: &[Book], reference: NaiveDate) -> Vec<&Book> {
    books
        .iter()
        .filter(|b| b.is_completed)
        .filter(|b| {
            effective_date(b)
                .map(|d| d.year() == reference.year() && d.month() == reference.month())
                .unwrap_or(false)
        })
        .collect()
}

/// Sum of pages over completed books
pub fn total_pages_read(books: &[Book]) -> u64 {
    books
        .iter()
        .filter(|b| b.is_completed)
        .map(|b| u64::from(b.pages))
        .sum()
}

/// Number of books marked favorite
pub fn favorite_count(books: &[Book]) -> usize {
    books.iter().filter(|b| b.is_favorite()).count()
}

pub fn completed_count(books: &[Book]) -> usize {
    books.iter().filter(|b| b.is_completed).count()
}

/// One bar of the monthly chart
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthBucket {
    pub month: u32,
    pub label: &'static str,
    pub count: usize,
    pub pages: u64,
}

fn empty_buckets() -> Vec<MonthBucket> {
    (1..=12u32)
        .map(|m| MonthBucket {
            month: m,
            label: month_label(m),
            count: 0,
            pages: 0,
        })
        .collect()
}

fn month_label(month: u32) -> &'static str {
    u8::try_from(month)
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .map(|m| m.name())
        .unwrap_or("?")
}

fn fill_buckets<'a>(books: impl Iterator<Item = (&'a Book, NaiveDate)>) -> Vec<MonthBucket> {
    let mut buckets = empty_buckets();
    for (book, date) in books {
        let bucket = &mut buckets[date.month0() as usize];
        bucket.count += 1;
        bucket.pages += u64::from(book.pages);
    }
    buckets
}

/// Twelve buckets, January first, of completed books per calendar month
///
/// Months are collapsed across years: March 2023 and March 2024 land in
/// the same bucket. See [`chart_buckets_for_year`] for a single year.
pub fn monthly_chart_buckets(books: &[Book]) -> Vec<MonthBucket> {
    fill_buckets(
        books
            .iter()
            .filter(|b| b.is_completed)
            .filter_map(|b| effective_date(b).map(|d| (b, d))),
    )
}

/// Twelve buckets of completed books for one year only
pub fn chart_buckets_for_year(books: &[Book], year: i32) -> Vec<MonthBucket> {
    fill_buckets(
        books
            .iter()
            .filter(|b| b.is_completed)
            .filter_map(|b| effective_date(b).map(|d| (b, d)))
            .filter(|(_, d)| d.year() == year),
    )
}

/// Books marked favorite
pub fn favorites(books: &[Book]) -> Vec<&Book> {
    books.iter().filter(|b| b.is_favorite()).collect()
}

/// Every quote across all books, with its book's title and author
pub fn all_quotes(books: &[Book]) -> Vec<QuoteEntry> {
    books
        .iter()
        .flat_map(|book| {
            book.quotes().iter().map(move |q| QuoteEntry {
                quote: q.clone(),
                book_id: book.id.clone(),
                book_title: book.title.clone(),
                book_author: book.author.clone(),
            })
        })
        .collect()
}

/// Headline numbers for the overview
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadingSummary {
    /// Year and month the monthly count refers to
    pub month: String,
    pub total_books: usize,
    pub completed_books: usize,
    pub completed_this_month: usize,
    pub total_pages_read: u64,
    pub favorites: usize,
    pub quotes: usize,
}

impl ReadingSummary {
    pub fn compute(books: &[Book], reference: NaiveDate) -> Self {
        Self {
            month: reference.format("%Y-%m").to_string(),
            total_books: books.len(),
            completed_books: completed_count(books),
            completed_this_month: monthly_completed(books, reference).len(),
            total_pages_read: total_pages_read(books),
            favorites: favorite_count(books),
            quotes: books.iter().map(|b| b.quotes().len()).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewBook, Quote};

    fn book(id: &str, pages: u32, completed: bool, date_read: Option<&str>, added: &str) -> Book {
        let mut new = NewBook::new(format!("Book {}", id), "Author", pages);
        new.is_completed = completed;
        new.date_read = date_read.map(str::to_string);
        Book::from_new(id, added, new)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("2024-03-05"), Some(date(2024, 3, 5)));
        assert_eq!(
            parse_date("2024-03-31T23:30:00.000Z"),
            Some(date(2024, 3, 31))
        );
        assert_eq!(
            parse_date("2024-03-31T23:30:00+05:00"),
            Some(date(2024, 3, 31))
        );
        assert_eq!(parse_date("2024-03-05T10:00:00"), Some(date(2024, 3, 5)));
        assert_eq!(parse_date("yesterday"), None);
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("2024-02-30"), None);
    }

    #[test]
    fn test_effective_date_falls_back_to_date_added() {
        let b = book("a", 10, true, None, "2024-01-15T08:00:00.000Z");
        assert_eq!(effective_date(&b), Some(date(2024, 1, 15)));

        let b = book("b", 10, true, Some(""), "2024-01-15");
        assert_eq!(effective_date(&b), Some(date(2024, 1, 15)));

        let b = book("c", 10, true, Some("2024-02-01"), "2024-01-15");
        assert_eq!(effective_date(&b), Some(date(2024, 2, 1)));
    }

    #[test]
    fn test_march_scenario() {
        let mut unfinished = book("b", 50, false, None, "");
        unfinished.date_read = None;
        let books = vec![book("a", 100, true, Some("2024-03-05"), "2024-01-01"), unfinished];

        assert_eq!(total_pages_read(&books), 100);

        let monthly = monthly_completed(&books, date(2024, 3, 20));
        assert_eq!(monthly.len(), 1);
        assert_eq!(monthly[0].id, "a");
    }

    #[test]
    fn test_monthly_completed_subset_property() {
        let books = vec![
            book("a", 100, true, Some("2024-03-05"), "2024-01-01"),
            book("b", 100, true, Some("2023-03-05"), "2023-01-01"),
            book("c", 100, false, Some("2024-03-07"), "2024-01-01"),
            book("d", 100, true, None, "2024-03-09"),
            book("e", 100, true, Some("garbage"), "2024-03-09"),
            book("f", 100, true, Some("2024-04-01"), "2024-03-01"),
        ];
        let reference = date(2024, 3, 1);

        let monthly = monthly_completed(&books, reference);
        let ids: Vec<&str> = monthly.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "d"]);

        for b in monthly {
            assert!(books.contains(b));
            assert!(b.is_completed);
            let d = effective_date(b).unwrap();
            assert_eq!((d.year(), d.month()), (2024, 3));
        }
    }

    #[test]
    fn test_totals_on_empty() {
        assert_eq!(total_pages_read(&[]), 0);
        assert_eq!(favorite_count(&[]), 0);
        assert!(monthly_completed(&[], date(2024, 1, 1)).is_empty());
    }

    #[test]
    fn test_favorite_count_treats_unset_as_false() {
        let mut a = book("a", 1, false, None, "2024-01-01");
        a.is_favorite = Some(true);
        let mut b = book("b", 1, false, None, "2024-01-01");
        b.is_favorite = Some(false);
        let c = book("c", 1, false, None, "2024-01-01");

        let books = vec![a, b, c];
        assert_eq!(favorite_count(&books), 1);
        assert_eq!(favorites(&books).len(), 1);
    }

    #[test]
    fn test_chart_buckets_collapse_years() {
        let books = vec![
            book("a", 100, true, Some("2023-03-05"), "2023-01-01"),
            book("b", 200, true, Some("2024-03-10"), "2024-01-01"),
            book("c", 50, true, Some("2024-12-31"), "2024-01-01"),
            book("d", 70, false, Some("2024-03-10"), "2024-01-01"),
            book("e", 70, true, Some("bad"), "also bad"),
        ];

        let buckets = monthly_chart_buckets(&books);
        assert_eq!(buckets.len(), 12);
        assert_eq!(buckets[0].label, "January");
        assert_eq!(buckets[11].label, "December");

        assert_eq!(buckets[2].count, 2);
        assert_eq!(buckets[2].pages, 300);
        assert_eq!(buckets[11].count, 1);
        assert_eq!(buckets.iter().map(|b| b.count).sum::<usize>(), 3);

        let only_2024 = chart_buckets_for_year(&books, 2024);
        assert_eq!(only_2024[2].count, 1);
        assert_eq!(only_2024[2].pages, 200);
    }

    #[test]
    fn test_all_quotes_and_summary() {
        let mut a = book("a", 100, true, Some("2024-03-05"), "2024-01-01");
        a.quotes = Some(vec![
            Quote::new("first", Some(1), None).unwrap(),
            Quote::new("second", None, None).unwrap(),
        ]);
        a.is_favorite = Some(true);
        let b = book("b", 50, false, None, "2024-03-02");

        let books = vec![a, b];
        let quotes = all_quotes(&books);
        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes[0].book_title, "Book a");
        assert_eq!(quotes[1].quote.text, "second");

        let summary = ReadingSummary::compute(&books, date(2024, 3, 15));
        assert_eq!(
            summary,
            ReadingSummary {
                month: "2024-03".to_string(),
                total_books: 2,
                completed_books: 1,
                completed_this_month: 1,
                total_pages_read: 100,
                favorites: 1,
                quotes: 2,
            }
        );
    }
}
