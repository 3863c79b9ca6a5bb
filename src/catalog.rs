//! Author and book management.

use crate::db::{self, Author, AuthorFields, Book, BookFields, Database};
use crate::error::{AppError, Result};

/// CRUD over authors and books.
#[derive(Clone)]
pub struct CatalogService {
    db: Database,
}

impl CatalogService {
    /// Create a new catalog service.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    // ========== AUTHORS ==========

    /// Create an author.
    pub fn create_author(&self, fields: &AuthorFields) -> Result<Author> {
        let author = self.db.write(|conn| db::insert_author(conn, fields))?;
        tracing::info!(author_id = author.id, name = %author.name, "Author created");
        Ok(author)
    }

    /// List all authors.
    pub fn list_authors(&self) -> Result<Vec<Author>> {
        self.db.read(db::list_authors)
    }

    /// Get an author by ID.
    pub fn get_author(&self, id: i64) -> Result<Author> {
        self.db
            .read(|conn| db::get_author(conn, id))?
            .ok_or_else(author_not_found)
    }

    /// Resolve an author's ID from their exact name.
    pub fn get_author_by_name(&self, name: &str) -> Result<i64> {
        self.db
            .read(|conn| db::find_author_id_by_name(conn, name))?
            .ok_or_else(author_not_found)
    }

    /// Replace an author's fields.
    pub fn update_author(&self, id: i64, fields: &AuthorFields) -> Result<Author> {
        self.db.write(|conn| {
            if !db::update_author(conn, id, fields)? {
                return Err(author_not_found());
            }
            db::get_author(conn, id)?.ok_or_else(author_not_found)
        })
    }

    /// Delete an author together with their books.
    pub fn delete_author(&self, id: i64) -> Result<()> {
        if !self.db.write(|conn| db::delete_author(conn, id))? {
            return Err(author_not_found());
        }
        tracing::info!(author_id = id, "Author deleted");
        Ok(())
    }

    // ========== BOOKS ==========

    /// Create a book under an existing author.
    pub fn create_book(&self, fields: &BookFields) -> Result<Book> {
        let book = self.db.write(|conn| {
            check_book_fields(conn, fields, None)?;
            let id = db::insert_book(conn, fields)?;
            db::get_book(conn, id)?.ok_or_else(book_not_found)
        })?;

        tracing::info!(book_id = book.id, author_id = book.author_id, title = %book.title, "Book created");
        Ok(book)
    }

    /// List books, optionally filtered by title or author name.
    pub fn list_books(&self, search: Option<&str>) -> Result<Vec<Book>> {
        let search = search.filter(|s| !s.is_empty());
        self.db.read(|conn| db::list_books(conn, search))
    }

    /// Get a book by ID.
    pub fn get_book(&self, id: i64) -> Result<Book> {
        self.db
            .read(|conn| db::get_book(conn, id))?
            .ok_or_else(book_not_found)
    }

    /// Replace a book's fields.
    pub fn update_book(&self, id: i64, fields: &BookFields) -> Result<Book> {
        self.db.write(|conn| {
            if !db::book_exists(conn, id)? {
                return Err(book_not_found());
            }
            check_book_fields(conn, fields, Some(id))?;
            db::update_book(conn, id, fields)?;
            db::get_book(conn, id)?.ok_or_else(book_not_found)
        })
    }

    /// Delete a book.
    pub fn delete_book(&self, id: i64) -> Result<()> {
        if !self.db.write(|conn| db::delete_book(conn, id))? {
            return Err(book_not_found());
        }
        tracing::info!(book_id = id, "Book deleted");
        Ok(())
    }
}

/// Author must exist and (title, author) must be free.
fn check_book_fields(
    conn: &rusqlite::Connection,
    fields: &BookFields,
    exclude_id: Option<i64>,
) -> Result<()> {
    if db::get_author(conn, fields.author_id)?.is_none() {
        return Err(author_not_found());
    }

    if db::title_taken(conn, &fields.title, fields.author_id, exclude_id)? {
        return Err(AppError::Conflict(
            "This book already exists for the given author.".to_string(),
        ));
    }

    Ok(())
}

fn author_not_found() -> AppError {
    AppError::NotFound("Author not found".to_string())
}

fn book_not_found() -> AppError {
    AppError::NotFound("Book not found".to_string())
}
