//! Driving port for public reads of books and pages.

use async_trait::async_trait;

use crate::domain::{Book, BookId, Error, Page, PageId};

/// Unauthenticated read access to books and their pages.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookQuery: Send + Sync {
    /// Every book, oldest first.
    async fn list_books(&self) -> Result<Vec<Book>, Error>;

    /// One book by id.
    async fn get_book(&self, book: &BookId) -> Result<Book, Error>;

    /// Pages of a book in the book's order.
    async fn list_pages(&self, book: &BookId) -> Result<Vec<Page>, Error>;

    /// One page of a book.
    async fn get_page(&self, book: &BookId, page: &PageId) -> Result<Page, Error>;
}
