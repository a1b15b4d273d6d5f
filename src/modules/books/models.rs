use serde::{Deserialize, Serialize};

/// A row of the `books` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Book {
    /// Unique identifier, assigned on creation
    pub id: i64,
    pub title: String,
    pub author: String,
    /// Publication year, if known
    pub year: Option<i64>,
    /// ISO `YYYY-MM-DD` date the current or last loan started
    pub borrow_date: Option<String>,
    /// ISO `YYYY-MM-DD` date the last loan ended
    pub return_date: Option<String>,
    /// Outstanding fine, never negative
    pub fine: f64,
}

impl Book {
    pub fn status(&self) -> LoanStatus {
        match (&self.borrow_date, &self.return_date) {
            (None, _) => LoanStatus::Available,
            (Some(_), None) => LoanStatus::OnLoan,
            (Some(_), Some(_)) => LoanStatus::Returned,
        }
    }
}

/// Where a book is in its borrow/return cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    /// Never borrowed
    Available,
    /// Borrowed and not yet returned
    OnLoan,
    /// Returned; `fine` reflects the completed loan
    Returned,
}

/// Book as rendered to clients, with its derived loan status.
#[derive(Debug, Clone, Serialize)]
pub struct BookView {
    #[serde(flatten)]
    pub book: Book,
    pub status: LoanStatus,
}

impl From<Book> for BookView {
    fn from(book: Book) -> Self {
        let status = book.status();
        Self { book, status }
    }
}

/// Request body for creating or editing a book.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookForm {
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub year: Option<i64>,
}

/// Request body for lending a book out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BorrowRequest {
    pub borrow_date: String,
}

/// Request body for taking a book back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnRequest {
    pub return_date: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(borrow_date: Option<&str>, return_date: Option<&str>) -> Book {
        Book {
            id: 1,
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            year: Some(1965),
            borrow_date: borrow_date.map(str::to_string),
            return_date: return_date.map(str::to_string),
            fine: 0.0,
        }
    }

    #[test]
    fn status_follows_loan_dates() {
        assert_eq!(book(None, None).status(), LoanStatus::Available);
        assert_eq!(book(Some("2024-01-01"), None).status(), LoanStatus::OnLoan);
        assert_eq!(
            book(Some("2024-01-01"), Some("2024-01-10")).status(),
            LoanStatus::Returned
        );
    }

    #[test]
    fn view_flattens_book_fields() {
        let view = BookView::from(book(Some("2024-01-01"), None));
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["id"], 1);
        assert_eq!(json["title"], "Dune");
        assert_eq!(json["return_date"], serde_json::Value::Null);
        assert_eq!(json["status"], "on_loan");
    }

    #[test]
    fn year_is_optional_in_form() {
        let form: BookForm =
            serde_json::from_str(r#"{"title":"Emma","author":"Jane Austen"}"#).unwrap();
        assert_eq!(form.year, None);
    }
}
