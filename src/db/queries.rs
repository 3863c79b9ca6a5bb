//! Table-level queries.
//!
//! Every function takes a plain [`Connection`] so callers can compose several
//! of them inside one [`Database::write`](super::Database::write) transaction.

use super::{
    Author, AuthorFields, BlacklistedToken, Book, BookFields, Favorite, User, now_timestamp,
};
use crate::error::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};

// ========== AUTHOR OPERATIONS ==========

fn row_to_author(row: &Row<'_>) -> rusqlite::Result<Author> {
    Ok(Author {
        id: row.get(0)?,
        name: row.get(1)?,
        image_url: row.get(2)?,
        bio: row.get(3)?,
    })
}

/// Insert an author and return it.
pub fn insert_author(conn: &Connection, fields: &AuthorFields) -> Result<Author> {
    conn.execute(
        "INSERT INTO authors (name, image_url, bio) VALUES (?1, ?2, ?3)",
        params![fields.name, fields.image_url, fields.bio],
    )?;

    Ok(Author {
        id: conn.last_insert_rowid(),
        name: fields.name.clone(),
        image_url: fields.image_url.clone(),
        bio: fields.bio.clone(),
    })
}

/// Get author by ID.
pub fn get_author(conn: &Connection, id: i64) -> Result<Option<Author>> {
    Ok(conn
        .query_row(
            "SELECT id, name, image_url, bio FROM authors WHERE id = ?1",
            params![id],
            row_to_author,
        )
        .optional()?)
}

/// List all authors.
pub fn list_authors(conn: &Connection) -> Result<Vec<Author>> {
    let mut stmt = conn.prepare("SELECT id, name, image_url, bio FROM authors ORDER BY id")?;
    let authors = stmt
        .query_map([], row_to_author)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(authors)
}

/// Find the first author with exactly this name.
pub fn find_author_id_by_name(conn: &Connection, name: &str) -> Result<Option<i64>> {
    Ok(conn
        .query_row(
            "SELECT id FROM authors WHERE name = ?1 ORDER BY id LIMIT 1",
            params![name],
            |row| row.get(0),
        )
        .optional()?)
}

/// Replace an author's fields.
pub fn update_author(conn: &Connection, id: i64, fields: &AuthorFields) -> Result<bool> {
    let rows = conn.execute(
        "UPDATE authors SET name = ?1, image_url = ?2, bio = ?3 WHERE id = ?4",
        params![fields.name, fields.image_url, fields.bio, id],
    )?;
    Ok(rows > 0)
}

/// Delete an author; books and their favorites go with it.
pub fn delete_author(conn: &Connection, id: i64) -> Result<bool> {
    let rows = conn.execute("DELETE FROM authors WHERE id = ?1", params![id])?;
    Ok(rows > 0)
}

// ========== BOOK OPERATIONS ==========

const BOOK_SELECT: &str = "SELECT b.id, b.title, b.author_id, a.name, b.description, b.published_date
     FROM books b JOIN authors a ON a.id = b.author_id";

fn row_to_book(row: &Row<'_>) -> rusqlite::Result<Book> {
    Ok(Book {
        id: row.get(0)?,
        title: row.get(1)?,
        author_id: row.get(2)?,
        author: row.get(3)?,
        description: row.get(4)?,
        published_date: row.get(5)?,
    })
}

/// Escape `s` for use inside a `LIKE ... ESCAPE '\'` substring pattern.
pub fn like_pattern(s: &str) -> String {
    let mut pattern = String::with_capacity(s.len() + 2);
    pattern.push('%');
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Insert a book and return its ID.
pub fn insert_book(conn: &Connection, fields: &BookFields) -> Result<i64> {
    conn.execute(
        "INSERT INTO books (title, author_id, description, published_date)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            fields.title,
            fields.author_id,
            fields.description,
            fields.published_date,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Get book by ID.
pub fn get_book(conn: &Connection, id: i64) -> Result<Option<Book>> {
    Ok(conn
        .query_row(
            &format!("{BOOK_SELECT} WHERE b.id = ?1"),
            params![id],
            row_to_book,
        )
        .optional()?)
}

/// List books, optionally filtered by a case-insensitive substring of the
/// title or author name.
pub fn list_books(conn: &Connection, search: Option<&str>) -> Result<Vec<Book>> {
    let books = match search {
        Some(term) => {
            let mut stmt = conn.prepare(&format!(
                r"{BOOK_SELECT}
                 WHERE lower_unicode(b.title) LIKE lower_unicode(?1) ESCAPE '\'
                    OR lower_unicode(a.name) LIKE lower_unicode(?1) ESCAPE '\'
                 ORDER BY b.id"
            ))?;
            stmt.query_map(params![like_pattern(term)], row_to_book)?
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
        None => {
            let mut stmt = conn.prepare(&format!("{BOOK_SELECT} ORDER BY b.id"))?;
            stmt.query_map([], row_to_book)?
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };
    Ok(books)
}

/// Whether another book with this title already exists for the author.
pub fn title_taken(
    conn: &Connection,
    title: &str,
    author_id: i64,
    exclude_id: Option<i64>,
) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT id FROM books WHERE title = ?1 AND author_id = ?2 AND id IS NOT ?3 LIMIT 1",
            params![title, author_id, exclude_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Whether a book with this ID exists.
pub fn book_exists(conn: &Connection, id: i64) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT id FROM books WHERE id = ?1", params![id], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(found.is_some())
}

/// Replace a book's fields.
pub fn update_book(conn: &Connection, id: i64, fields: &BookFields) -> Result<bool> {
    let rows = conn.execute(
        "UPDATE books SET title = ?1, author_id = ?2, description = ?3, published_date = ?4
         WHERE id = ?5",
        params![
            fields.title,
            fields.author_id,
            fields.description,
            fields.published_date,
            id,
        ],
    )?;
    Ok(rows > 0)
}

/// Delete a book; favorites on it go with it.
pub fn delete_book(conn: &Connection, id: i64) -> Result<bool> {
    let rows = conn.execute("DELETE FROM books WHERE id = ?1", params![id])?;
    Ok(rows > 0)
}

// ========== USER OPERATIONS ==========

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        created_at: row.get(4)?,
        last_login: row.get(5)?,
    })
}

/// Insert a user and return it.
pub fn insert_user(
    conn: &Connection,
    username: &str,
    email: Option<&str>,
    password_hash: &str,
) -> Result<User> {
    let created_at = now_timestamp();
    conn.execute(
        "INSERT INTO users (username, email, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![username, email, password_hash, created_at],
    )?;

    Ok(User {
        id: conn.last_insert_rowid(),
        username: username.to_string(),
        email: email.map(str::to_string),
        password_hash: password_hash.to_string(),
        created_at,
        last_login: None,
    })
}

/// Get user by username.
pub fn get_user_by_username(conn: &Connection, username: &str) -> Result<Option<User>> {
    Ok(conn
        .query_row(
            "SELECT id, username, email, password_hash, created_at, last_login
             FROM users WHERE username = ?1",
            params![username],
            row_to_user,
        )
        .optional()?)
}

/// Get user by ID.
pub fn get_user_by_id(conn: &Connection, id: i64) -> Result<Option<User>> {
    Ok(conn
        .query_row(
            "SELECT id, username, email, password_hash, created_at, last_login
             FROM users WHERE id = ?1",
            params![id],
            row_to_user,
        )
        .optional()?)
}

/// Whether a user already has this email.
pub fn email_taken(conn: &Connection, email: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT id FROM users WHERE email = ?1",
            params![email],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// List all users.
pub fn list_users(conn: &Connection) -> Result<Vec<User>> {
    let mut stmt = conn.prepare(
        "SELECT id, username, email, password_hash, created_at, last_login
         FROM users ORDER BY username",
    )?;
    let users = stmt
        .query_map([], row_to_user)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(users)
}

/// Update user last login.
pub fn update_last_login(conn: &Connection, user_id: i64) -> Result<()> {
    conn.execute(
        "UPDATE users SET last_login = ?1 WHERE id = ?2",
        params![now_timestamp(), user_id],
    )?;
    Ok(())
}

/// Delete user; favorites go with them.
pub fn delete_user(conn: &Connection, username: &str) -> Result<bool> {
    let rows = conn.execute("DELETE FROM users WHERE username = ?1", params![username])?;
    Ok(rows > 0)
}

// ========== FAVORITE OPERATIONS ==========

fn row_to_favorite(row: &Row<'_>) -> rusqlite::Result<Favorite> {
    Ok(Favorite {
        id: row.get(0)?,
        user_id: row.get(1)?,
        book_id: row.get(2)?,
    })
}

/// Number of favorites a user holds.
pub fn count_favorites(conn: &Connection, user_id: i64) -> Result<u32> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM favorites WHERE user_id = ?1",
        params![user_id],
        |row| row.get(0),
    )?)
}

/// Whether the user already favorited the book.
pub fn favorite_exists(conn: &Connection, user_id: i64, book_id: i64) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT id FROM favorites WHERE user_id = ?1 AND book_id = ?2",
            params![user_id, book_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Insert a favorite and return it.
pub fn insert_favorite(conn: &Connection, user_id: i64, book_id: i64) -> Result<Favorite> {
    conn.execute(
        "INSERT INTO favorites (user_id, book_id) VALUES (?1, ?2)",
        params![user_id, book_id],
    )?;

    Ok(Favorite {
        id: conn.last_insert_rowid(),
        user_id,
        book_id,
    })
}

/// List a user's favorites.
pub fn list_favorites(conn: &Connection, user_id: i64) -> Result<Vec<Favorite>> {
    let mut stmt =
        conn.prepare("SELECT id, user_id, book_id FROM favorites WHERE user_id = ?1 ORDER BY id")?;
    let favorites = stmt
        .query_map(params![user_id], row_to_favorite)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(favorites)
}

/// Delete one of the user's favorites.
pub fn delete_favorite(conn: &Connection, user_id: i64, id: i64) -> Result<bool> {
    let rows = conn.execute(
        "DELETE FROM favorites WHERE id = ?1 AND user_id = ?2",
        params![id, user_id],
    )?;
    Ok(rows > 0)
}

/// Books by the authors of the user's favorites that the user has not
/// favorited yet, lowest ID first.
pub fn recommend_books(conn: &Connection, user_id: i64, limit: u32) -> Result<Vec<Book>> {
    let mut stmt = conn.prepare(&format!(
        "{BOOK_SELECT}
         WHERE b.author_id IN (
             SELECT fb.author_id FROM favorites f
             JOIN books fb ON fb.id = f.book_id
             WHERE f.user_id = ?1
         )
         AND b.id NOT IN (SELECT book_id FROM favorites WHERE user_id = ?1)
         ORDER BY b.id
         LIMIT ?2"
    ))?;
    let books = stmt
        .query_map(params![user_id, limit], row_to_book)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(books)
}

// ========== BLACKLIST OPERATIONS ==========

/// Whether the token has been revoked.
pub fn is_blacklisted(conn: &Connection, token: &str) -> Result<bool> {
    Ok(get_blacklisted(conn, token)?.is_some())
}

/// Record a revoked token. Returns `false` if it was already present.
pub fn insert_blacklisted(conn: &Connection, token: &str) -> Result<bool> {
    let rows = conn.execute(
        "INSERT OR IGNORE INTO blacklist (token, blacklisted_at) VALUES (?1, ?2)",
        params![token, now_timestamp()],
    )?;
    Ok(rows > 0)
}

/// Get a blacklist entry.
pub fn get_blacklisted(conn: &Connection, token: &str) -> Result<Option<BlacklistedToken>> {
    Ok(conn
        .query_row(
            "SELECT token, blacklisted_at FROM blacklist WHERE token = ?1",
            params![token],
            |row| {
                Ok(BlacklistedToken {
                    token: row.get(0)?,
                    blacklisted_at: row.get(1)?,
                })
            },
        )
        .optional()?)
}
