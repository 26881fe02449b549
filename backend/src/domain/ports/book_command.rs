//! Driving port for mutations of books and their pages.

use async_trait::async_trait;

use crate::domain::{
    Book, BookDraft, BookId, BookPatch, CoverChange, CoverTarget, Error, Page, PageDraft, PageId,
    PagePatch, User,
};

/// Book and page mutations. Every operation requires the caller to be the
/// book's author.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookCommand: Send + Sync {
    /// Create a book authored by `author`.
    async fn create_book(&self, author: &User, draft: BookDraft) -> Result<Book, Error>;

    /// Apply a partial update to a book.
    async fn update_book(&self, caller: &User, book: &BookId, patch: BookPatch)
    -> Result<Book, Error>;

    /// Delete a book and the pages it lists.
    async fn delete_book(&self, caller: &User, book: &BookId) -> Result<(), Error>;

    /// Append a new page to a book.
    async fn add_page(&self, caller: &User, book: &BookId, draft: PageDraft)
    -> Result<Page, Error>;

    /// Apply a partial update to a page of a book.
    async fn update_page(
        &self,
        caller: &User,
        book: &BookId,
        page: &PageId,
        patch: PagePatch,
    ) -> Result<Page, Error>;

    /// Remove a page from a book and delete it.
    async fn delete_page(&self, caller: &User, book: &BookId, page: &PageId)
    -> Result<(), Error>;

    /// Upload a new cover for a book or page and retire the previous one.
    async fn change_cover(
        &self,
        caller: &User,
        target: CoverTarget,
        upload: Vec<u8>,
    ) -> Result<CoverChange, Error>;
}
