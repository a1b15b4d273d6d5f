//! Catalog persistence and loan state transitions.

use sqlx::SqlitePool;
use thiserror::Error;

use super::fine::{compute_fine, parse_date, FinePolicy};
use super::models::{Book, BookForm};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("book {id} not found")]
    NotFound { id: i64 },

    #[error("invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Book catalog backed by the `books` table.
///
/// Every operation is a single statement except [`CatalogStore::return_book`],
/// which reads the loan start and writes the fine inside one transaction.
#[derive(Debug, Clone)]
pub struct CatalogStore {
    pool: SqlitePool,
    policy: FinePolicy,
}

impl CatalogStore {
    pub fn new(pool: SqlitePool, policy: FinePolicy) -> Self {
        Self { pool, policy }
    }

    pub fn policy(&self) -> &FinePolicy {
        &self.policy
    }

    /// All books in insertion order.
    pub async fn list(&self) -> CatalogResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>("SELECT * FROM books ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(books)
    }

    pub async fn count(&self) -> CatalogResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn create(&self, form: &BookForm) -> CatalogResult<Book> {
        let (title, author) = validate_form(form)?;

        let book = sqlx::query_as::<_, Book>(
            "INSERT INTO books (title, author, year) VALUES (?, ?, ?) RETURNING *",
        )
        .bind(title)
        .bind(author)
        .bind(form.year)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(book_id = book.id, title = %book.title, "book added");
        Ok(book)
    }

    pub async fn get(&self, id: i64) -> CatalogResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(CatalogError::NotFound { id })
    }

    /// Overwrite title, author and year. Loan fields are left alone.
    pub async fn update(&self, id: i64, form: &BookForm) -> CatalogResult<Book> {
        let (title, author) = validate_form(form)?;

        let book = sqlx::query_as::<_, Book>(
            "UPDATE books SET title = ?, author = ?, year = ? WHERE id = ? RETURNING *",
        )
        .bind(title)
        .bind(author)
        .bind(form.year)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(CatalogError::NotFound { id })?;

        tracing::info!(book_id = id, "book updated");
        Ok(book)
    }

    /// Remove a book. Deleting an unknown id is a no-op; the return value
    /// reports whether a row was actually removed.
    pub async fn delete(&self, id: i64) -> CatalogResult<bool> {
        let result = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        let removed = result.rows_affected() > 0;
        tracing::info!(book_id = id, removed, "book deleted");
        Ok(removed)
    }

    /// Start a new loan. Clears the fine and any return date left over from
    /// the previous loan.
    pub async fn borrow(&self, id: i64, borrow_date: &str) -> CatalogResult<Book> {
        let borrow_date = validate_date("borrow_date", borrow_date)?;

        let book = sqlx::query_as::<_, Book>(
            "UPDATE books SET borrow_date = ?, return_date = NULL, fine = 0.0 WHERE id = ? RETURNING *",
        )
        .bind(borrow_date)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(CatalogError::NotFound { id })?;

        tracing::info!(book_id = id, borrow_date, "book borrowed");
        Ok(book)
    }

    /// Close the loan and charge the fine owed for it.
    pub async fn return_book(&self, id: i64, return_date: &str) -> CatalogResult<Book> {
        let return_date = validate_date("return_date", return_date)?;

        // Take the write lock up front so the borrow date can't change under us.
        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;

        let borrow_date =
            sqlx::query_scalar::<_, Option<String>>("SELECT borrow_date FROM books WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(CatalogError::NotFound { id })?;

        if borrow_date.is_none() {
            tracing::warn!(book_id = id, "returning a book that was never borrowed");
        }

        let fine = compute_fine(borrow_date.as_deref(), Some(return_date), &self.policy);

        let book = sqlx::query_as::<_, Book>(
            "UPDATE books SET return_date = ?, fine = ? WHERE id = ? RETURNING *",
        )
        .bind(return_date)
        .bind(fine)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(book_id = id, return_date, fine, "book returned");
        Ok(book)
    }

    /// Settle the outstanding fine. Loan dates are kept.
    pub async fn pay_fine(&self, id: i64) -> CatalogResult<Book> {
        let book =
            sqlx::query_as::<_, Book>("UPDATE books SET fine = 0.0 WHERE id = ? RETURNING *")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or(CatalogError::NotFound { id })?;

        tracing::info!(book_id = id, "fine paid");
        Ok(book)
    }
}

fn validate_form(form: &BookForm) -> CatalogResult<(&str, &str)> {
    Ok((
        required("title", &form.title)?,
        required("author", &form.author)?,
    ))
}

fn required<'a>(field: &'static str, value: &'a str) -> CatalogResult<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CatalogError::Validation {
            field,
            message: "must not be empty".to_string(),
        });
    }
    Ok(value)
}

fn validate_date<'a>(field: &'static str, value: &'a str) -> CatalogResult<&'a str> {
    let value = value.trim();
    if parse_date(value).is_none() {
        return Err(CatalogError::Validation {
            field,
            message: format!("'{value}' is not a YYYY-MM-DD date"),
        });
    }
    Ok(value)
}
