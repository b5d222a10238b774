//! Catalog service tests over the in-memory store

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::json;
use tokio_test::assert_ok;

use locallib_server::{
    models::{Author, Book, BookInstance, EntityId, Genre, InstanceStatus, RawInput},
    repository::{
        document_id, from_document, memory::InMemoryStore, Collection, EntityStore, Filter, FindOptions,
        SharedStore,
    },
    services::{
        catalog::{CreateOutcome, DeleteOutcome, UpdateOutcome},
        Pipelines, Services,
    },
};

fn catalog() -> (Arc<InMemoryStore>, Services) {
    let memory = Arc::new(InMemoryStore::new());
    let store: SharedStore = memory.clone();
    (memory, Services::new(store, Pipelines::default()))
}

fn created<T, D>(outcome: CreateOutcome<T, D>) -> T {
    match outcome {
        CreateOutcome::Created(entity) => entity,
        CreateOutcome::Existing(_) => panic!("expected a new entity, got an existing one"),
        CreateOutcome::Invalid { violations, .. } => panic!("unexpected violations: {:?}", violations),
    }
}

async fn author(services: &Services, first: &str, family: &str) -> Author {
    let raw = RawInput::new()
        .with("first_name", first)
        .with("family_name", family)
        .with("date_of_birth", "1892-01-03");
    created(assert_ok!(services.authors.create(&raw).await))
}

async fn genre(services: &Services, name: &str) -> Genre {
    let raw = RawInput::new().with("name", name);
    created(assert_ok!(services.genres.create(&raw).await))
}

async fn book(services: &Services, title: &str, author: &Author, genres: &[&Genre]) -> Book {
    let raw = RawInput::new()
        .with("title", title)
        .with("author", author.id.as_str())
        .with("summary", "A long journey")
        .with("isbn", "9780261102217")
        .with_many("genre", genres.iter().map(|g| g.id.as_str()));
    created(assert_ok!(services.books.create(&raw).await))
}

async fn copy(services: &Services, book: &Book, imprint: &str, status: &str) -> BookInstance {
    let raw = RawInput::new()
        .with("book", book.id.as_str())
        .with("imprint", imprint)
        .with("status", status)
        .with("due_back", "2024-03-03");
    created(assert_ok!(services.book_instances.create(&raw).await))
}

#[tokio::test]
async fn test_create_returns_existing_genre() {
    let (memory, services) = catalog();
    memory
        .seed(Collection::Genres, json!({"id": "g1", "name": "Fantasy"}))
        .unwrap();

    let outcome = services
        .genres
        .create(&RawInput::new().with("name", "Fantasy"))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        CreateOutcome::Existing(Genre {
            id: EntityId::new("g1"),
            name: "Fantasy".to_string(),
        })
    );
    assert_eq!(memory.len(Collection::Genres).unwrap(), 1);
}

#[tokio::test]
async fn test_genre_create_is_idempotent() {
    let (memory, services) = catalog();
    let first = genre(&services, "Fantasy").await;

    let second = services
        .genres
        .create(&RawInput::new().with("name", "  Fantasy "))
        .await
        .unwrap();

    assert_eq!(second, CreateOutcome::Existing(first));
    assert_eq!(memory.len(Collection::Genres).unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_genre_creates_store_one_document() {
    let (memory, services) = catalog();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let genres = services.genres.clone();
            tokio::spawn(async move { genres.create(&RawInput::new().with("name", "Horror")).await })
        })
        .collect();

    let mut ids = BTreeSet::new();
    for handle in handles {
        let genre = match handle.await.unwrap().unwrap() {
            CreateOutcome::Created(g) | CreateOutcome::Existing(g) => g,
            CreateOutcome::Invalid { violations, .. } => panic!("unexpected violations: {:?}", violations),
        };
        ids.insert(genre.id);
    }

    assert_eq!(ids.len(), 1);
    assert_eq!(memory.len(Collection::Genres).unwrap(), 1);
}

#[tokio::test]
async fn test_delete_unreferenced_genre() {
    let (memory, services) = catalog();
    memory
        .seed(Collection::Genres, json!({"id": "g1", "name": "Fantasy"}))
        .unwrap();
    memory
        .seed(Collection::Genres, json!({"id": "g2", "name": "Poetry"}))
        .unwrap();
    memory
        .seed(
            Collection::Books,
            json!({"id": "b1", "title": "The Hobbit", "author": "a1", "summary": "s", "isbn": "i", "genre": ["g1"]}),
        )
        .unwrap();

    let g2 = EntityId::new("g2");
    assert_eq!(services.genres.delete(&g2, true).await.unwrap(), DeleteOutcome::Deleted);
    assert!(memory.find_by_id(Collection::Genres, &g2).await.unwrap().is_none());
    assert!(services.genres.detail(&g2).await.unwrap().is_none());
}

#[tokio::test]
async fn test_blocked_deletes_leave_state_unchanged() {
    let (memory, services) = catalog();
    let tolkien = author(&services, "John", "Tolkien").await;
    let fantasy = genre(&services, "Fantasy").await;
    let hobbit = book(&services, "The Hobbit", &tolkien, &[&fantasy]).await;
    copy(&services, &hobbit, "Allen and Unwin, 1937", "Loaned").await;

    let snapshot = |collection| {
        let memory = memory.clone();
        async move {
            memory
                .find(collection, &Filter::all(), &FindOptions::new())
                .await
                .unwrap()
        }
    };
    let before = (
        snapshot(Collection::Authors).await,
        snapshot(Collection::Genres).await,
        snapshot(Collection::Books).await,
        snapshot(Collection::BookInstances).await,
    );

    for outcome in [
        services.authors.delete(&tolkien.id, true).await.unwrap(),
        services.genres.delete(&fantasy.id, true).await.unwrap(),
        services.books.delete(&hobbit.id, true).await.unwrap(),
    ] {
        let DeleteOutcome::Blocked(dependents) = outcome else {
            panic!("referenced entity must not be deleted, got {:?}", outcome);
        };
        assert_eq!(dependents.len(), 1);
    }

    let after = (
        snapshot(Collection::Authors).await,
        snapshot(Collection::Genres).await,
        snapshot(Collection::Books).await,
        snapshot(Collection::BookInstances).await,
    );
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_deletes_in_dependency_order_succeed() {
    let (_, services) = catalog();
    let tolkien = author(&services, "John", "Tolkien").await;
    let fantasy = genre(&services, "Fantasy").await;
    let hobbit = book(&services, "The Hobbit", &tolkien, &[&fantasy]).await;
    let hardback = copy(&services, &hobbit, "Allen and Unwin, 1937", "Available").await;

    let preview = services.books.delete_preview(&hobbit.id).await.unwrap().unwrap();
    assert_eq!(preview.entity, hobbit);
    assert_eq!(preview.dependents.len(), 1);
    assert_eq!(preview.dependents[0].id, hardback.id);
    assert_eq!(preview.dependents[0].url, format!("/catalog/bookinstance/{}", hardback.id));

    assert_eq!(
        services.book_instances.delete(&hardback.id, true).await.unwrap(),
        DeleteOutcome::Deleted
    );
    assert_eq!(services.books.delete(&hobbit.id, true).await.unwrap(), DeleteOutcome::Deleted);
    assert_eq!(services.authors.delete(&tolkien.id, true).await.unwrap(), DeleteOutcome::Deleted);
    assert_eq!(services.genres.delete(&fantasy.id, true).await.unwrap(), DeleteOutcome::Deleted);

    assert!(services.book_instances.detail(&hardback.id).await.unwrap().is_none());
    assert!(services.books.detail(&hobbit.id).await.unwrap().is_none());
    assert!(services.authors.detail(&tolkien.id).await.unwrap().is_none());
    assert!(services.genres.detail(&fantasy.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete_missing_and_unconfirmed() {
    let (_, services) = catalog();
    let poetry = genre(&services, "Poetry").await;

    assert_eq!(
        services.genres.delete(&EntityId::new("nope"), true).await.unwrap(),
        DeleteOutcome::NotFound
    );
    assert_eq!(services.genres.delete(&poetry.id, false).await.unwrap(), DeleteOutcome::Unconfirmed);
    assert!(services.genres.detail(&poetry.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_validation_reports_every_violation() {
    let (memory, services) = catalog();

    let outcome = services
        .books
        .create(&RawInput::new().with("title", "   ").with("isbn", ""))
        .await
        .unwrap();

    let CreateOutcome::Invalid { draft, violations } = outcome else {
        panic!("empty submission must be rejected");
    };
    let fields: BTreeSet<_> = violations.iter().map(|v| v.field.as_str()).collect();
    assert_eq!(fields, BTreeSet::from(["title", "author", "summary", "isbn"]));
    assert_eq!(draft.title, "");
    assert_eq!(memory.len(Collection::Books).unwrap(), 0);
}

#[tokio::test]
async fn test_book_references_must_resolve() {
    let (memory, services) = catalog();
    let fantasy = genre(&services, "Fantasy").await;

    let raw = RawInput::new()
        .with("title", "The Hobbit")
        .with("author", "no-such-author")
        .with("summary", "There and back again")
        .with("isbn", "9780261102217")
        .with_many("genre", [fantasy.id.as_str(), "no-such-genre"]);
    let CreateOutcome::Invalid { violations, .. } = services.books.create(&raw).await.unwrap() else {
        panic!("dangling references must be rejected");
    };

    let fields: BTreeSet<_> = violations.iter().map(|v| v.field.as_str()).collect();
    assert_eq!(fields, BTreeSet::from(["author", "genre"]));
    assert_eq!(memory.len(Collection::Books).unwrap(), 0);
}

#[tokio::test]
async fn test_book_detail_matches_direct_reads() {
    let (memory, services) = catalog();
    let tolkien = author(&services, "John", "Tolkien").await;
    let fantasy = genre(&services, "Fantasy").await;
    let classics = genre(&services, "Classics").await;
    let hobbit = book(&services, "The Hobbit", &tolkien, &[&fantasy, &classics]).await;
    let other = book(&services, "Silmarillion", &tolkien, &[&fantasy]).await;
    copy(&services, &hobbit, "Allen and Unwin, 1937", "Loaned").await;
    copy(&services, &hobbit, "Harper, 2012", "Available").await;
    copy(&services, &other, "Harper, 1999", "Reserved").await;

    let detail = services.books.detail(&hobbit.id).await.unwrap().unwrap();

    let direct: Book = from_document(
        memory
            .find_by_id(Collection::Books, &hobbit.id)
            .await
            .unwrap()
            .unwrap(),
    )
    .unwrap();
    assert_eq!(detail.book.id, direct.id);
    assert_eq!(detail.book.title, direct.title);
    assert_eq!(detail.book.author, tolkien);
    assert_eq!(detail.book.genre, vec![fantasy, classics]);

    let copies = memory
        .find(
            Collection::BookInstances,
            &Filter::all().eq("book", hobbit.id.as_str()),
            &FindOptions::new(),
        )
        .await
        .unwrap();
    let expected: BTreeSet<_> = copies.iter().filter_map(document_id).collect();
    let actual: BTreeSet<_> = detail.book_instances.iter().map(|c| c.id.clone()).collect();
    assert_eq!(actual, expected);
    assert_eq!(actual.len(), 2);
}

#[tokio::test]
async fn test_update_preserves_identity() {
    let (_, services) = catalog();
    let tolkien = author(&services, "John", "Tolkien").await;

    let raw = RawInput::new()
        .with("first_name", "J. R. R.")
        .with("family_name", "Tolkien")
        .with("date_of_birth", "1892-01-03")
        .with("date_of_death", "1973-09-02");
    let UpdateOutcome::Updated(updated) = services.authors.update(&tolkien.id, &raw).await.unwrap() else {
        panic!("valid update must succeed");
    };
    assert_eq!(updated.id, tolkien.id);

    let detail = services.authors.detail(&tolkien.id).await.unwrap().unwrap();
    assert_eq!(detail.author.id, tolkien.id);
    assert_eq!(detail.author.first_name, "J. R. R.");
    assert_eq!(detail.author.lifespan().to_string(), "81 years");

    assert_eq!(
        services.authors.update(&EntityId::new("nope"), &raw).await.unwrap(),
        UpdateOutcome::NotFound
    );
}

#[tokio::test]
async fn test_genre_rename_onto_existing_name_is_rejected() {
    let (_, services) = catalog();
    genre(&services, "Fantasy").await;
    let poetry = genre(&services, "Poetry").await;

    let outcome = services
        .genres
        .update(&poetry.id, &RawInput::new().with("name", "Fantasy"))
        .await
        .unwrap();
    let UpdateOutcome::Invalid { violations, .. } = outcome else {
        panic!("duplicate genre name must be rejected");
    };
    assert_eq!(violations[0].field, "name");

    let renamed = services
        .genres
        .update(&poetry.id, &RawInput::new().with("name", "Verse"))
        .await
        .unwrap();
    assert_eq!(
        renamed,
        UpdateOutcome::Updated(Genre {
            id: poetry.id,
            name: "Verse".to_string(),
        })
    );
}

#[tokio::test]
async fn test_available_copy_has_no_due_date() {
    let (_, services) = catalog();
    let tolkien = author(&services, "John", "Tolkien").await;
    let hobbit = book(&services, "The Hobbit", &tolkien, &[]).await;

    let shelved = copy(&services, &hobbit, "Harper, 2012", "Available").await;
    assert_eq!(shelved.status, InstanceStatus::Available);
    assert_eq!(shelved.due_back, None);

    let loaned = copy(&services, &hobbit, "Harper, 2013", "Loaned").await;
    let view = services.book_instances.detail(&loaned.id).await.unwrap().unwrap();
    assert_eq!(view.book, hobbit);
    assert_eq!(view.due_back_display(), "Mar 3, 2024");
}

#[tokio::test]
async fn test_dashboard_counts() {
    let (_, services) = catalog();
    let tolkien = author(&services, "John", "Tolkien").await;
    let fantasy = genre(&services, "Fantasy").await;
    let hobbit = book(&services, "The Hobbit", &tolkien, &[&fantasy]).await;
    copy(&services, &hobbit, "Harper, 2012", "Available").await;
    copy(&services, &hobbit, "Harper, 2013", "Maintenance").await;

    let counts = services.catalog.dashboard().await.unwrap();
    assert_eq!(counts.book_count, 1);
    assert_eq!(counts.book_instance_count, 2);
    assert_eq!(counts.book_instance_available_count, 1);
    assert_eq!(counts.author_count, 1);
    assert_eq!(counts.genre_count, 1);
}

#[tokio::test]
async fn test_lists_are_sorted() {
    let (_, services) = catalog();
    let herbert = author(&services, "Frank", "Herbert").await;
    author(&services, "Ursula", "Le Guin").await;
    genre(&services, "Science Fiction").await;
    genre(&services, "Fantasy").await;
    book(&services, "Dune Messiah", &herbert, &[]).await;
    book(&services, "Dune", &herbert, &[]).await;

    let genres: Vec<_> = services.genres.list().await.unwrap().into_iter().map(|g| g.name).collect();
    assert_eq!(genres, ["Fantasy", "Science Fiction"]);

    let authors: Vec<_> = services
        .authors
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.family_name)
        .collect();
    assert_eq!(authors, ["Herbert", "Le Guin"]);

    let books = services.books.list().await.unwrap();
    assert_eq!(books[0].title, "Dune");
    assert_eq!(books[1].author, herbert);

    let options = services.books.form_options().await.unwrap();
    assert_eq!(options.authors.len(), 2);
    assert_eq!(options.genres[0].name, "Fantasy");
}
