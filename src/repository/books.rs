//! Books repository for database operations.
//!
//! `available_copies` is never written here - only the issues repository
//! mutates the counter, inside its own transactions.

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookQuery, CreateBook},
};

const DEFAULT_PER_PAGE: i64 = 20;

/// Clamp page/per_page query values into LIMIT/OFFSET
pub(crate) fn page_bounds(page: Option<i64>, per_page: Option<i64>) -> (i64, i64) {
    let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, 100);
    let page = page.unwrap_or(1).max(1);
    (per_page, (page - 1) * per_page)
}

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i64) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::BookNotFound(format!("Book with id {} not found", id)))
    }

    /// Get book by ISBN
    pub async fn get_by_isbn(&self, isbn: &str) -> AppResult<Book> {
        self.find_by_isbn(isbn)
            .await?
            .ok_or_else(|| AppError::BookNotFound(format!("Book with ISBN {} not found", isbn)))
    }

    /// Find book by ISBN, if any
    pub async fn find_by_isbn(&self, isbn: &str) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE isbn = $1")
            .bind(isbn)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    /// Create a new book with all copies available
    pub async fn create(&self, book: &CreateBook) -> AppResult<Book> {
        let created = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, author, isbn, total_copies, available_copies)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING *
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(book.total_copies)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            // Unique violation on isbn, in case of a concurrent insert
            if let sqlx::Error::Database(db) = &e {
                if db.code().as_deref() == Some("23505") {
                    return AppError::Conflict(format!(
                        "Book with ISBN {} already exists",
                        book.isbn
                    ));
                }
            }
            AppError::Database(e)
        })?;

        Ok(created)
    }

    /// Search books with optional title/author filters (case-insensitive substring)
    pub async fn search(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        let (limit, offset) = page_bounds(query.page, query.per_page);
        let title = query.title.as_ref().map(|t| format!("%{}%", t));
        let author = query.author.as_ref().map(|a| format!("%{}%", a));

        let books = sqlx::query_as::<_, Book>(
            r#"
            SELECT * FROM books
            WHERE ($1::text IS NULL OR title ILIKE $1)
              AND ($2::text IS NULL OR author ILIKE $2)
            ORDER BY title, id
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(&title)
        .bind(&author)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM books
            WHERE ($1::text IS NULL OR title ILIKE $1)
              AND ($2::text IS NULL OR author ILIKE $2)
            "#,
        )
        .bind(&title)
        .bind(&author)
        .fetch_one(&self.pool)
        .await?;

        Ok((books, total))
    }

    /// List books with at least one available copy
    pub async fn list_available(
        &self,
        page: Option<i64>,
        per_page: Option<i64>,
    ) -> AppResult<(Vec<Book>, i64)> {
        let (limit, offset) = page_bounds(page, per_page);

        let books = sqlx::query_as::<_, Book>(
            "SELECT * FROM books WHERE available_copies > 0 ORDER BY title, id LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM books WHERE available_copies > 0")
                .fetch_one(&self.pool)
                .await?;

        Ok((books, total))
    }

    /// Delete a book row. No referential guard: open requests and ledger
    /// rows keep the dangling id (display queries tolerate the gap).
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::BookNotFound(format!(
                "Book with id {} not found",
                id
            )));
        }
        Ok(())
    }

    /// Count all books and those with stock (for the summary endpoint)
    pub async fn counts(&self) -> AppResult<(i64, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;
        let available: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM books WHERE available_copies > 0")
                .fetch_one(&self.pool)
                .await?;
        Ok((total, available))
    }
}

#[cfg(test)]
mod tests {
    use super::page_bounds;

    #[test]
    fn page_bounds_defaults_and_clamps() {
        assert_eq!(page_bounds(None, None), (20, 0));
        assert_eq!(page_bounds(Some(3), Some(10)), (10, 20));
        // garbage values are clamped rather than rejected
        assert_eq!(page_bounds(Some(0), Some(0)), (1, 0));
        assert_eq!(page_bounds(Some(-5), Some(1000)), (100, 0));
    }
}
