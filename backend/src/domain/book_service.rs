//! Book aggregate: ownership, page membership and cover replacement.
//!
//! Books and pages live in separate collections and the store offers no
//! multi-document transactions. Multi-step mutations are therefore ordered so
//! that a crash leaves an orphan page rather than a dangling page id, and
//! each failure after the first write runs an explicit compensating step:
//!
//! - add page: the page is inserted, then pushed onto the book. If the push
//!   fails the page is deleted again.
//! - delete page: the page is deleted, then pulled from the book. If the pull
//!   fails the page is re-inserted from its snapshot.
//! - change cover: the new asset is uploaded, then persisted. If persisting
//!   fails the new asset is released; otherwise the old one is.
//! - delete book: the book goes first, then its pages, then cover assets.
//!
//! A compensation that itself fails is logged at `error` with both ids so a
//! reconciliation sweep can find it.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::ports::{
    BookCommand, BookQuery, Document, DocumentStore, Filter, ID_FIELD, Projection, ReturnDocument,
    Update,
};
use super::records::{self, BOOKS, BookRecord, PAGES, PageRecord, fields};
use super::{
    Book, BookDraft, BookId, BookPatch, CoverAssetId, CoverChange, CoverTarget, Error,
    MediaAttachmentManager, Page, PageDraft, PageId, PagePatch, User,
};

const BOOK_NOT_FOUND: &str = "book not found";
const PAGE_NOT_FOUND: &str = "page not found";

/// Book and page use cases over the document store and media host.
#[derive(Clone)]
pub struct BookAggregateService {
    store: Arc<dyn DocumentStore>,
    media: MediaAttachmentManager,
    clock: Arc<dyn Clock>,
}

impl BookAggregateService {
    /// Build the service over its collaborators.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        media: MediaAttachmentManager,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            media,
            clock,
        }
    }

    async fn load_book(&self, id: &BookId) -> Result<Book, Error> {
        let document = self
            .store
            .find_one(BOOKS, &Filter::by_id(id), &Projection::full())
            .await
            .map_err(records::map_store_error)?
            .ok_or_else(|| Error::not_found(BOOK_NOT_FOUND))?;
        records::decode::<BookRecord, Book>(document)
    }

    /// Load a book and check that `caller` wrote it. `action` completes the
    /// sentence "you can't ...".
    async fn load_owned_book(
        &self,
        caller: &User,
        id: &BookId,
        action: &str,
    ) -> Result<Book, Error> {
        let book = self.load_book(id).await?;
        if !book.is_authored_by(caller.id()) {
            debug!(book_id = %id, caller = %caller.id(), "ownership check failed");
            return Err(Error::forbidden(format!("you can't {action}")));
        }
        Ok(book)
    }

    fn stamped(&self, update: Update) -> Update {
        update.set(fields::UPDATED_AT, records::timestamp(self.clock.utc()))
    }

    /// Delete a page inserted moments ago whose book update failed.
    async fn discard_orphan(&self, book: &BookId, page: &PageId) {
        match self.store.delete_one(PAGES, &Filter::by_id(page)).await {
            Ok(_) => debug!(book_id = %book, page_id = %page, "orphan page discarded"),
            Err(err) => error!(
                book_id = %book,
                page_id = %page,
                error = %err,
                "orphan page left behind after failed add"
            ),
        }
    }

    /// Put back a page deleted moments ago whose book update failed.
    async fn restore_page(&self, book: &BookId, page: &PageId, snapshot: Document) {
        match self.store.insert_one(PAGES, snapshot).await {
            Ok(()) => debug!(book_id = %book, page_id = %page, "deleted page restored"),
            Err(err) => error!(
                book_id = %book,
                page_id = %page,
                error = %err,
                "book references a deleted page after failed removal"
            ),
        }
    }

    /// Write the new cover id and report the one it replaced.
    async fn persist_cover(
        &self,
        collection: &'static str,
        filter: Filter,
        asset: CoverAssetId,
        missing: &'static str,
    ) -> Result<Option<CoverAssetId>, Error> {
        let update = self.stamped(Update::new().set(fields::COVER, asset.as_str()));
        let previous = self
            .store
            .find_one_and_update(collection, &filter, &update, ReturnDocument::Before)
            .await
            .map_err(records::map_store_error)?
            .ok_or_else(|| Error::not_found(missing))?;
        Ok(previous
            .get(fields::COVER)
            .and_then(Value::as_str)
            .and_then(CoverAssetId::new))
    }

    fn release_all(&self, assets: impl IntoIterator<Item = CoverAssetId>) {
        for asset in assets {
            drop(self.media.release_detached(asset));
        }
    }
}

fn book_update(patch: BookPatch) -> Update {
    let mut update = Update::new();
    if let Some(title) = patch.title {
        update = update.set(fields::TITLE, String::from(title));
    }
    if let Some(description) = patch.description {
        update = update.set(fields::DESCRIPTION, String::from(description));
    }
    update
}

fn page_update(patch: PagePatch) -> Update {
    let mut update = Update::new();
    if let Some(title) = patch.title {
        update = update.set(fields::TITLE, String::from(title));
    }
    if let Some(content) = patch.content {
        update = update.set(fields::CONTENT, String::from(content));
    }
    update
}

fn ensure_member(book: &Book, page: &PageId) -> Result<(), Error> {
    if book.contains_page(page) {
        Ok(())
    } else {
        Err(Error::not_found(PAGE_NOT_FOUND))
    }
}

fn cover_of(document: &Document) -> Option<CoverAssetId> {
    document
        .get(fields::COVER)
        .and_then(Value::as_str)
        .and_then(CoverAssetId::new)
}

#[async_trait]
impl BookCommand for BookAggregateService {
    async fn create_book(&self, author: &User, draft: BookDraft) -> Result<Book, Error> {
        let book = Book::create(draft, *author.id(), self.clock.utc());
        let document = records::encode(&BookRecord::from(&book))?;
        self.store
            .insert_one(BOOKS, document)
            .await
            .map_err(records::map_store_error)?;
        info!(book_id = %book.id, author = %book.author, "book created");
        Ok(book)
    }

    async fn update_book(
        &self,
        caller: &User,
        book: &BookId,
        patch: BookPatch,
    ) -> Result<Book, Error> {
        self.load_owned_book(caller, book, "update this book").await?;
        let update = self.stamped(book_update(patch));
        let document = self
            .store
            .find_one_and_update(BOOKS, &Filter::by_id(book), &update, ReturnDocument::After)
            .await
            .map_err(records::map_store_error)?
            .ok_or_else(|| Error::not_found(BOOK_NOT_FOUND))?;
        info!(book_id = %book, "book updated");
        records::decode::<BookRecord, Book>(document)
    }

    async fn delete_book(&self, caller: &User, book: &BookId) -> Result<(), Error> {
        let owned = self.load_owned_book(caller, book, "delete this book").await?;
        let deleted = self
            .store
            .delete_one(BOOKS, &Filter::by_id(book))
            .await
            .map_err(records::map_store_error)?
            .ok_or_else(|| Error::not_found(BOOK_NOT_FOUND))?;
        let mut covers: Vec<CoverAssetId> = cover_of(&deleted).into_iter().collect();
        let member_ids = match records::decode::<BookRecord, Book>(deleted) {
            Ok(removed) => removed.pages,
            Err(err) => {
                warn!(book_id = %book, error = %err, "deleted book unreadable; using loaded page list");
                owned.pages
            }
        };

        if !member_ids.is_empty() {
            let members = Filter::id_in(&member_ids);
            let pages = self.store.find_many(PAGES, &members).await;
            let removed = self.store.delete_many(PAGES, &members).await;
            match (pages, removed) {
                (Ok(pages), Ok(count)) => {
                    covers.extend(pages.iter().filter_map(cover_of));
                    debug!(book_id = %book, count, "book pages deleted");
                }
                (_, Err(err)) | (Err(err), _) => {
                    error!(
                        book_id = %book,
                        pages = ?member_ids,
                        error = %err,
                        "book deleted but its pages were left behind"
                    );
                    return Err(Error::internal("failed to delete book pages"));
                }
            }
        }

        self.release_all(covers);
        info!(book_id = %book, "book deleted");
        Ok(())
    }

    async fn add_page(&self, caller: &User, book: &BookId, draft: PageDraft) -> Result<Page, Error> {
        self.load_owned_book(caller, book, "add page to this book").await?;
        let page = Page::create(draft, self.clock.utc());
        let document = records::encode(&PageRecord::from(&page))?;
        self.store
            .insert_one(PAGES, document)
            .await
            .map_err(records::map_store_error)?;

        let update = self.stamped(Update::new().push(fields::PAGES, page.id.to_string()));
        match self
            .store
            .update_one(BOOKS, &Filter::by_id(book), &update)
            .await
        {
            Ok(outcome) if outcome.modified > 0 => {
                info!(book_id = %book, page_id = %page.id, "page added");
                Ok(page)
            }
            Ok(_) => {
                warn!(book_id = %book, page_id = %page.id, "book vanished while adding a page");
                self.discard_orphan(book, &page.id).await;
                Err(Error::internal("failed to add page"))
            }
            Err(err) => {
                warn!(book_id = %book, page_id = %page.id, error = %err, "page membership update failed");
                self.discard_orphan(book, &page.id).await;
                Err(Error::internal("failed to add page"))
            }
        }
    }

    async fn update_page(
        &self,
        caller: &User,
        book: &BookId,
        page: &PageId,
        patch: PagePatch,
    ) -> Result<Page, Error> {
        let owned = self
            .load_owned_book(caller, book, "update page from this book")
            .await?;
        ensure_member(&owned, page)?;
        let update = self.stamped(page_update(patch));
        let document = self
            .store
            .find_one_and_update(PAGES, &Filter::by_id(page), &update, ReturnDocument::After)
            .await
            .map_err(records::map_store_error)?
            .ok_or_else(|| Error::not_found(PAGE_NOT_FOUND))?;
        info!(book_id = %book, page_id = %page, "page updated");
        records::decode::<PageRecord, Page>(document)
    }

    async fn delete_page(&self, caller: &User, book: &BookId, page: &PageId) -> Result<(), Error> {
        let owned = self
            .load_owned_book(caller, book, "delete page from this book")
            .await?;
        ensure_member(&owned, page)?;
        let snapshot = self
            .store
            .delete_one(PAGES, &Filter::by_id(page))
            .await
            .map_err(records::map_store_error)?
            .ok_or_else(|| Error::not_found(PAGE_NOT_FOUND))?;

        let update = self.stamped(Update::new().pull(fields::PAGES, page.to_string()));
        match self
            .store
            .update_one(BOOKS, &Filter::by_id(book), &update)
            .await
        {
            Ok(outcome) if outcome.matched > 0 => {
                if let Some(cover) = cover_of(&snapshot) {
                    self.release_all([cover]);
                }
                info!(book_id = %book, page_id = %page, "page deleted");
                Ok(())
            }
            Ok(_) => {
                warn!(book_id = %book, page_id = %page, "book vanished while removing a page");
                self.restore_page(book, page, snapshot).await;
                Err(Error::internal("failed to remove page"))
            }
            Err(err) => {
                warn!(book_id = %book, page_id = %page, error = %err, "page membership update failed");
                self.restore_page(book, page, snapshot).await;
                Err(Error::internal("failed to remove page"))
            }
        }
    }

    async fn change_cover(
        &self,
        caller: &User,
        target: CoverTarget,
        upload: Vec<u8>,
    ) -> Result<CoverChange, Error> {
        let change = match target {
            CoverTarget::Book(book) => {
                self.load_owned_book(caller, &book, "change this book's cover")
                    .await?;
                self.media
                    .replace(upload, |asset| {
                        self.persist_cover(BOOKS, Filter::by_id(book), asset, BOOK_NOT_FOUND)
                    })
                    .await?
            }
            CoverTarget::Page { book, page } => {
                let owned = self
                    .load_owned_book(caller, &book, "change this page's cover")
                    .await?;
                ensure_member(&owned, &page)?;
                self.media
                    .replace(upload, |asset| {
                        self.persist_cover(PAGES, Filter::by_id(page), asset, PAGE_NOT_FOUND)
                    })
                    .await?
            }
        };
        info!(target = ?target, asset = %change.asset, "cover changed");
        Ok(change)
    }
}

#[async_trait]
impl BookQuery for BookAggregateService {
    async fn list_books(&self) -> Result<Vec<Book>, Error> {
        self.store
            .find_many(BOOKS, &Filter::all())
            .await
            .map_err(records::map_store_error)?
            .into_iter()
            .map(records::decode::<BookRecord, Book>)
            .collect()
    }

    async fn get_book(&self, book: &BookId) -> Result<Book, Error> {
        self.load_book(book).await
    }

    async fn list_pages(&self, book: &BookId) -> Result<Vec<Page>, Error> {
        let owner = self.load_book(book).await?;
        if owner.pages.is_empty() {
            return Ok(Vec::new());
        }
        let mut by_id: HashMap<String, Document> = self
            .store
            .find_many(PAGES, &Filter::id_in(&owner.pages))
            .await
            .map_err(records::map_store_error)?
            .into_iter()
            .filter_map(|document| {
                let id = document.get(ID_FIELD)?.as_str()?.to_owned();
                Some((id, document))
            })
            .collect();

        let mut pages = Vec::with_capacity(owner.pages.len());
        for id in &owner.pages {
            match by_id.remove(&id.to_string()) {
                Some(document) => pages.push(records::decode::<PageRecord, Page>(document)?),
                None => warn!(book_id = %book, page_id = %id, "book lists a missing page"),
            }
        }
        Ok(pages)
    }

    async fn get_page(&self, book: &BookId, page: &PageId) -> Result<Page, Error> {
        let owner = self.load_book(book).await?;
        ensure_member(&owner, page)?;
        let document = self
            .store
            .find_one(PAGES, &Filter::by_id(page), &Projection::full())
            .await
            .map_err(records::map_store_error)?
            .ok_or_else(|| Error::not_found(PAGE_NOT_FOUND))?;
        records::decode::<PageRecord, Page>(document)
    }
}

#[cfg(test)]
#[path = "book_service_tests.rs"]
mod tests;
