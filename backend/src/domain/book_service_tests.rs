//! Tests for book and page consistency, including compensation paths.

use std::sync::Arc;

use rstest::{fixture, rstest};
use rstest_bdd_macros::{given, then, when};

use super::*;
use crate::domain::ports::DeleteOutcome;
use crate::domain::{EmailAddress, ErrorCode, UserId, UserName};
use crate::test_support::{
    FaultyStore, MutableClock, RecordingMediaHost, StoreOp, fixture_timestamp,
};

#[derive(Clone)]
struct Harness {
    store: Arc<FaultyStore>,
    media: Arc<RecordingMediaHost>,
    clock: Arc<MutableClock>,
    service: BookAggregateService,
}

fn user(name: &str) -> User {
    User::new(
        UserId::random(),
        UserName::new(name).expect("valid name"),
        EmailAddress::new(format!("{}@example.com", name.to_lowercase())).expect("valid email"),
        fixture_timestamp(),
        fixture_timestamp(),
    )
}

fn draft(title: &str) -> BookDraft {
    BookDraft::try_from_parts(title, "A book about things", None).expect("valid draft")
}

fn page_draft(title: &str) -> PageDraft {
    PageDraft::try_from_parts(title, Some("Once upon a time")).expect("valid draft")
}

#[fixture]
fn harness() -> Harness {
    let store = FaultyStore::new();
    let media = RecordingMediaHost::new();
    let clock = Arc::new(MutableClock::new(fixture_timestamp()));
    let service = BookAggregateService::new(
        store.clone(),
        MediaAttachmentManager::new(media.clone()),
        clock.clone(),
    );
    Harness {
        store,
        media,
        clock,
        service,
    }
}

/// Let detached release tasks run until `expected` events have been seen.
async fn settle(media: &RecordingMediaHost, expected: usize) -> Vec<String> {
    for _ in 0..50 {
        if media.events().len() >= expected {
            break;
        }
        tokio::task::yield_now().await;
    }
    media.events()
}

#[rstest]
#[tokio::test]
async fn created_books_are_listed_and_fetched(harness: Harness) {
    let author = user("Ada");
    let book = harness
        .service
        .create_book(&author, draft("Dune"))
        .await
        .expect("book created");

    assert_eq!(book.author, *author.id());
    assert!(book.pages.is_empty());
    let listed = harness.service.list_books().await.expect("list succeeds");
    assert_eq!(listed, vec![book.clone()]);
    let fetched = harness.service.get_book(&book.id).await.expect("found");
    assert_eq!(fetched, book);
}

#[rstest]
#[tokio::test]
async fn missing_books_are_not_found(harness: Harness) {
    let error = harness
        .service
        .get_book(&BookId::random())
        .await
        .expect_err("nothing stored");

    assert_eq!(error.code(), ErrorCode::NotFound);
    assert_eq!(error.message(), "book not found");
}

#[rstest]
#[tokio::test]
async fn pages_are_listed_in_book_order(harness: Harness) {
    let author = user("Ada");
    let book = harness
        .service
        .create_book(&author, draft("Dune"))
        .await
        .expect("book created");
    let mut added = Vec::new();
    for title in ["One", "Two", "Three"] {
        added.push(
            harness
                .service
                .add_page(&author, &book.id, page_draft(title))
                .await
                .expect("page added"),
        );
    }

    let pages = harness.service.list_pages(&book.id).await.expect("listed");
    assert_eq!(pages, added);
    let stored = harness.service.get_book(&book.id).await.expect("found");
    assert_eq!(
        stored.pages,
        added.iter().map(|page| page.id).collect::<Vec<_>>()
    );
}

#[rstest]
#[tokio::test]
async fn strangers_cannot_add_pages(harness: Harness) {
    let book = harness
        .service
        .create_book(&user("Ada"), draft("Dune"))
        .await
        .expect("book created");

    let error = harness
        .service
        .add_page(&user("Mallory"), &book.id, page_draft("Mine now"))
        .await
        .expect_err("not the author");

    assert_eq!(error.code(), ErrorCode::Forbidden);
    assert_eq!(error.message(), "you can't add page to this book");
    assert_eq!(harness.store.count(PAGES).await, 0);
}

#[given("a book whose membership update will fail")]
fn a_book_whose_membership_update_will_fail(harness: Harness) -> (Harness, User, Book) {
    let author = user("Ada");
    let book = futures::executor::block_on(harness.service.create_book(&author, draft("Dune")))
        .expect("book created");
    harness.store.fail(StoreOp::Update, BOOKS);
    (harness, author, book)
}

#[when("the author adds a page")]
fn the_author_adds_a_page(harness: &Harness, author: &User, book: &Book) -> Result<Page, Error> {
    futures::executor::block_on(harness.service.add_page(author, &book.id, page_draft("One")))
}

#[then("the inserted page is removed again")]
fn the_inserted_page_is_removed_again(harness: &Harness, result: Result<Page, Error>) {
    let error = result.expect_err("add fails");
    assert_eq!(error.code(), ErrorCode::InternalError);
    assert_eq!(error.message(), "failed to add page");
    assert_eq!(futures::executor::block_on(harness.store.count(PAGES)), 0);
    let writes: Vec<StoreOp> = harness
        .store
        .writes()
        .into_iter()
        .map(|(op, _)| op)
        .collect();
    assert_eq!(
        writes,
        vec![
            StoreOp::Insert,
            StoreOp::Insert,
            StoreOp::Update,
            StoreOp::DeleteOne
        ]
    );
}

#[rstest]
fn failed_membership_update_discards_the_new_page(harness: Harness) {
    let (harness, author, book) = a_book_whose_membership_update_will_fail(harness);
    let result = the_author_adds_a_page(&harness, &author, &book);
    the_inserted_page_is_removed_again(&harness, result);
}

#[rstest]
#[tokio::test]
async fn failed_pull_restores_the_deleted_page(harness: Harness) {
    let author = user("Ada");
    let book = harness
        .service
        .create_book(&author, draft("Dune"))
        .await
        .expect("book created");
    let page = harness
        .service
        .add_page(&author, &book.id, page_draft("One"))
        .await
        .expect("page added");
    harness.store.fail(StoreOp::Update, BOOKS);

    let error = harness
        .service
        .delete_page(&author, &book.id, &page.id)
        .await
        .expect_err("pull fails");

    assert_eq!(error.code(), ErrorCode::InternalError);
    assert_eq!(error.message(), "failed to remove page");
    harness.store.heal();
    let restored = harness
        .service
        .get_page(&book.id, &page.id)
        .await
        .expect("page is back");
    assert_eq!(restored, page);
}

#[rstest]
#[tokio::test]
async fn deleting_a_page_detaches_it_from_the_book(harness: Harness) {
    let author = user("Ada");
    let book = harness
        .service
        .create_book(&author, draft("Dune"))
        .await
        .expect("book created");
    let keep = harness
        .service
        .add_page(&author, &book.id, page_draft("Keep"))
        .await
        .expect("page added");
    let dropped = harness
        .service
        .add_page(&author, &book.id, page_draft("Drop"))
        .await
        .expect("page added");

    harness
        .service
        .delete_page(&author, &book.id, &dropped.id)
        .await
        .expect("page deleted");

    let stored = harness.service.get_book(&book.id).await.expect("found");
    assert_eq!(stored.pages, vec![keep.id]);
    assert_eq!(harness.store.count(PAGES).await, 1);
}

#[rstest]
#[tokio::test]
async fn pages_of_other_books_are_not_found(harness: Harness) {
    let author = user("Ada");
    let first = harness
        .service
        .create_book(&author, draft("Dune"))
        .await
        .expect("book created");
    let second = harness
        .service
        .create_book(&author, draft("Emma"))
        .await
        .expect("book created");
    let page = harness
        .service
        .add_page(&author, &first.id, page_draft("One"))
        .await
        .expect("page added");

    let error = harness
        .service
        .delete_page(&author, &second.id, &page.id)
        .await
        .expect_err("wrong book");
    assert_eq!(error.code(), ErrorCode::NotFound);
    assert_eq!(error.message(), "page not found");

    let error = harness
        .service
        .get_page(&second.id, &page.id)
        .await
        .expect_err("wrong book");
    assert_eq!(error.code(), ErrorCode::NotFound);
    assert_eq!(harness.store.count(PAGES).await, 1);
}

#[rstest]
#[tokio::test]
async fn blank_patch_fields_leave_values_unchanged(harness: Harness) {
    let author = user("Ada");
    let book = harness
        .service
        .create_book(&author, draft("Dune"))
        .await
        .expect("book created");
    let page = harness
        .service
        .add_page(&author, &book.id, page_draft("One"))
        .await
        .expect("page added");
    harness.clock.advance_seconds(30);

    let patch = PagePatch::try_from_parts(Some("  "), Some("Rewritten")).expect("valid patch");
    let updated = harness
        .service
        .update_page(&author, &book.id, &page.id, patch)
        .await
        .expect("page updated");

    assert_eq!(updated.title, page.title);
    assert_eq!(updated.content.as_ref(), "Rewritten");
    assert!(updated.updated_at > page.updated_at);
}

#[rstest]
#[tokio::test]
async fn strangers_cannot_update_books(harness: Harness) {
    let book = harness
        .service
        .create_book(&user("Ada"), draft("Dune"))
        .await
        .expect("book created");

    let patch = BookPatch::try_from_parts(Some("Stolen"), None).expect("valid patch");
    let error = harness
        .service
        .update_book(&user("Mallory"), &book.id, patch)
        .await
        .expect_err("not the author");

    assert_eq!(error.code(), ErrorCode::Forbidden);
    assert_eq!(error.message(), "you can't update this book");
    let stored = harness.service.get_book(&book.id).await.expect("found");
    assert_eq!(stored.title.as_ref(), "Dune");
}

#[rstest]
#[tokio::test]
async fn replacing_a_cover_retires_the_previous_asset(harness: Harness) {
    let author = user("Ada");
    let book = harness
        .service
        .create_book(&author, draft("Dune"))
        .await
        .expect("book created");

    let first = harness
        .service
        .change_cover(&author, CoverTarget::Book(book.id), vec![1])
        .await
        .expect("first cover");
    assert!(first.retired.is_none());

    let second = harness
        .service
        .change_cover(&author, CoverTarget::Book(book.id), vec![2])
        .await
        .expect("second cover");
    let retired = second.retired.expect("first cover retired");
    assert_eq!(retired.asset(), &first.asset);
    assert!(matches!(retired.settled().await, Some(Ok(DeleteOutcome::Deleted))));

    assert_eq!(
        harness.media.events(),
        vec!["upload asset-1", "upload asset-2", "delete asset-1"]
    );
    let stored = harness.service.get_book(&book.id).await.expect("found");
    assert_eq!(stored.cover, Some(second.asset));
}

#[rstest]
#[tokio::test]
async fn failed_cover_persist_releases_the_new_asset(harness: Harness) {
    let author = user("Ada");
    let book = harness
        .service
        .create_book(&author, draft("Dune"))
        .await
        .expect("book created");
    let page = harness
        .service
        .add_page(&author, &book.id, page_draft("One"))
        .await
        .expect("page added");
    harness.store.fail(StoreOp::FindAndUpdate, PAGES);

    let error = harness
        .service
        .change_cover(
            &author,
            CoverTarget::Page {
                book: book.id,
                page: page.id,
            },
            vec![1],
        )
        .await
        .expect_err("persist fails");

    assert_eq!(error.code(), ErrorCode::InternalError);
    assert_eq!(
        harness.media.events(),
        vec!["upload asset-1", "delete asset-1"]
    );
}

#[rstest]
#[tokio::test]
async fn strangers_cannot_change_covers_and_nothing_is_uploaded(harness: Harness) {
    let book = harness
        .service
        .create_book(&user("Ada"), draft("Dune"))
        .await
        .expect("book created");

    let error = harness
        .service
        .change_cover(&user("Mallory"), CoverTarget::Book(book.id), vec![1])
        .await
        .expect_err("not the author");

    assert_eq!(error.code(), ErrorCode::Forbidden);
    assert!(harness.media.events().is_empty());
}

#[rstest]
#[tokio::test]
async fn deleting_a_book_removes_pages_and_releases_covers(harness: Harness) {
    let author = user("Ada");
    let book = harness
        .service
        .create_book(&author, draft("Dune"))
        .await
        .expect("book created");
    let page = harness
        .service
        .add_page(&author, &book.id, page_draft("One"))
        .await
        .expect("page added");
    harness
        .service
        .add_page(&author, &book.id, page_draft("Two"))
        .await
        .expect("page added");
    harness
        .service
        .change_cover(&author, CoverTarget::Book(book.id), vec![1])
        .await
        .expect("book cover");
    harness
        .service
        .change_cover(
            &author,
            CoverTarget::Page {
                book: book.id,
                page: page.id,
            },
            vec![2],
        )
        .await
        .expect("page cover");

    harness
        .service
        .delete_book(&author, &book.id)
        .await
        .expect("book deleted");

    assert_eq!(harness.store.count(BOOKS).await, 0);
    assert_eq!(harness.store.count(PAGES).await, 0);
    let mut deletes: Vec<String> = settle(&harness.media, 4)
        .await
        .into_iter()
        .filter(|event| event.starts_with("delete"))
        .collect();
    deletes.sort();
    assert_eq!(deletes, vec!["delete asset-1", "delete asset-2"]);
}

#[rstest]
#[tokio::test]
async fn deleting_a_book_removes_pages_added_while_it_was_loaded(harness: Harness) {
    let author = user("Ada");
    let book = harness
        .service
        .create_book(&author, draft("Dune"))
        .await
        .expect("book created");
    harness
        .service
        .add_page(&author, &book.id, page_draft("One"))
        .await
        .expect("page added");
    let late = serde_json::json!({
        "_id": PageId::random().to_string(),
        "title": "Late",
        "content": "",
        "cover": null,
    });
    let serde_json::Value::Object(late) = late else {
        panic!("page fixture is an object");
    };
    harness.store.add_page_before_book_delete(book.id, late);

    harness
        .service
        .delete_book(&author, &book.id)
        .await
        .expect("book deleted");

    assert_eq!(harness.store.count(BOOKS).await, 0);
    assert_eq!(harness.store.count(PAGES).await, 0);
}

#[rstest]
#[tokio::test]
async fn listing_skips_pages_missing_from_the_store(harness: Harness) {
    let author = user("Ada");
    let book = harness
        .service
        .create_book(&author, draft("Dune"))
        .await
        .expect("book created");
    let lost = harness
        .service
        .add_page(&author, &book.id, page_draft("Lost"))
        .await
        .expect("page added");
    let kept = harness
        .service
        .add_page(&author, &book.id, page_draft("Kept"))
        .await
        .expect("page added");
    harness
        .store
        .delete_one(PAGES, &Filter::by_id(lost.id))
        .await
        .expect("raw delete");

    let pages = harness.service.list_pages(&book.id).await.expect("listed");

    assert_eq!(pages, vec![kept]);
}
