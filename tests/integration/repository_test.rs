// Generic repository against a real PostgreSQL schema
//
// Run with: TEST_DATABASE_URL=postgres://... cargo test --test repository_test -- --ignored

#[path = "../helpers/mod.rs"]
mod helpers;

use helpers::TestDatabase;
use service_layout::db::{Attributes, Filters, PageParams, Repository, Session};
use service_layout::tickets::{ticket_repository, Ticket};
use service_layout::AppError;

async fn seed(session: &Session, rows: &[(&str, &str)]) -> Vec<Ticket> {
    let repo = ticket_repository(session.clone());
    let mut created = Vec::new();
    for (name, status) in rows {
        let ticket = repo
            .create(Attributes::new().with("name", *name).with("status", *status))
            .await
            .unwrap();
        created.push(ticket);
    }
    created
}

fn ids(tickets: &[Ticket]) -> Vec<i64> {
    tickets.iter().map(|t| t.id).collect()
}

#[tokio::test]
#[ignore = "Requires test database"]
async fn test_create_returns_row_with_server_defaults() {
    let db = TestDatabase::migrated().await;
    let session = db.sessions().session();
    let repo = ticket_repository(session.clone());

    let ticket = repo
        .create(Attributes::new().with("name", "  Boiler leak  "))
        .await
        .unwrap();

    assert!(ticket.id > 0);
    assert_eq!(ticket.name, "Boiler leak");
    assert_eq!(ticket.status, "open");
    assert_eq!(ticket.priority, 0);
    assert_eq!(ticket.description, None);

    let found = repo
        .find_one(Filters::new().with("id", ticket.id))
        .await
        .unwrap();
    assert_eq!(found, Some(ticket));

    session.close().await;
    db.cleanup().await;
}

#[tokio::test]
#[ignore = "Requires test database"]
async fn test_list_filters_and_orders_newest_first() {
    let db = TestDatabase::migrated().await;
    let session = db.sessions().session();
    let created = seed(
        &session,
        &[("Boiler", "open"), ("Radiator", "closed"), ("Valve", "open")],
    )
    .await;
    let repo = Repository::<Ticket>::new(session.clone());

    let all = repo.list(Filters::new(), &[]).await.unwrap();
    assert_eq!(all.len(), 3);
    assert!(all.windows(2).all(|pair| pair[0].id > pair[1].id));

    let open = repo
        .list(Filters::new().with("status", "open"), &[])
        .await
        .unwrap();
    assert_eq!(ids(&open), vec![created[2].id, created[0].id]);

    let none = repo
        .list(
            Filters::new().with("status", "open").with("name", "Radiator"),
            &[],
        )
        .await
        .unwrap();
    assert!(none.is_empty());

    session.close().await;
    db.cleanup().await;
}

#[tokio::test]
#[ignore = "Requires test database"]
async fn test_search_fields_match_case_insensitive_substrings() {
    let db = TestDatabase::migrated().await;
    let session = db.sessions().session();
    let created = seed(
        &session,
        &[
            ("Boiler leak", "open"),
            ("Leaking valve", "in_progress"),
            ("Radiator", "open"),
            ("100% broken", "closed"),
        ],
    )
    .await;
    let repo = Repository::<Ticket>::new(session.clone());

    let leaks = repo
        .list(Filters::new().with("name", "LEAK"), &["name"])
        .await
        .unwrap();
    assert_eq!(ids(&leaks), vec![created[1].id, created[0].id]);

    // Without the search field the same filter is an exact match
    let exact = repo
        .list(Filters::new().with("name", "LEAK"), &[])
        .await
        .unwrap();
    assert!(exact.is_empty());

    let open = repo
        .list(Filters::new().with("status", "OP"), &["status"])
        .await
        .unwrap();
    assert_eq!(ids(&open), vec![created[2].id, created[0].id]);

    // LIKE metacharacters match literally
    let percent = repo
        .list(Filters::new().with("name", "0%"), &["name"])
        .await
        .unwrap();
    assert_eq!(ids(&percent), vec![created[3].id]);

    session.close().await;
    db.cleanup().await;
}

#[tokio::test]
#[ignore = "Requires test database"]
async fn test_paginate_slices_cover_list() {
    let db = TestDatabase::migrated().await;
    let session = db.sessions().session();
    seed(
        &session,
        &[
            ("A", "open"),
            ("B", "open"),
            ("C", "closed"),
            ("D", "open"),
            ("E", "open"),
        ],
    )
    .await;
    let repo = Repository::<Ticket>::new(session.clone());
    let filters = || Filters::new().with("status", "open");

    let everything = repo.list(filters(), &[]).await.unwrap();
    let first = repo
        .paginate(PageParams::new(1, 3).unwrap(), filters(), &[])
        .await
        .unwrap();
    assert_eq!(first.total, 4);
    assert_eq!(first.pages, 2);
    assert_eq!(first.items.len(), 3);

    let mut collected = Vec::new();
    for page in 1..=first.pages {
        let page = repo
            .paginate(PageParams::new(page, 3).unwrap(), filters(), &[])
            .await
            .unwrap();
        assert!(page.items.len() <= 3);
        collected.extend(page.items);
    }
    assert_eq!(collected, everything);

    let beyond = repo
        .paginate(PageParams::new(5, 3).unwrap(), filters(), &[])
        .await
        .unwrap();
    assert!(beyond.items.is_empty());
    assert_eq!(beyond.total, 4);

    session.close().await;
    db.cleanup().await;
}

#[tokio::test]
#[ignore = "Requires test database"]
async fn test_paginate_with_search_fields() {
    let db = TestDatabase::migrated().await;
    let session = db.sessions().session();
    let created = seed(
        &session,
        &[
            ("Boiler leak", "open"),
            ("Radiator", "open"),
            ("Leaking valve", "closed"),
            ("Pipe leak", "open"),
            ("Roof LEAK", "in_progress"),
        ],
    )
    .await;
    let repo = Repository::<Ticket>::new(session.clone());
    let filters = || Filters::new().with("name", "leak");

    let first = repo
        .paginate(PageParams::new(1, 3).unwrap(), filters(), &["name"])
        .await
        .unwrap();
    assert_eq!(first.total, 4);
    assert_eq!(first.pages, 2);
    assert_eq!(
        ids(&first.items),
        vec![created[4].id, created[3].id, created[2].id]
    );

    let second = repo
        .paginate(PageParams::new(2, 3).unwrap(), filters(), &["name"])
        .await
        .unwrap();
    assert_eq!(ids(&second.items), vec![created[0].id]);

    // Search and equality combine
    let open = repo
        .paginate(
            PageParams::default(),
            filters().with("status", "open"),
            &["name"],
        )
        .await
        .unwrap();
    assert_eq!(open.total, 2);
    assert_eq!(ids(&open.items), vec![created[3].id, created[0].id]);

    session.close().await;
    db.cleanup().await;
}

#[tokio::test]
#[ignore = "Requires test database"]
async fn test_timestamp_like_text_is_stored_and_searched_as_text() {
    let db = TestDatabase::migrated().await;
    let session = db.sessions().session();
    let repo = ticket_repository(session.clone());

    let attributes: Attributes =
        serde_json::from_str(r#"{"name": "2024-01-01T00:00:00Z"}"#).unwrap();
    let ticket = repo.create(attributes).await.unwrap();
    assert_eq!(ticket.name, "2024-01-01T00:00:00Z");

    let filters: Filters = serde_json::from_str(r#"{"name": "01T00:00:00Z"}"#).unwrap();
    let found = repo.list(filters, &["name"]).await.unwrap();
    assert_eq!(ids(&found), vec![ticket.id]);

    let filters: Filters =
        serde_json::from_str(r#"{"name": "2024-01-01T00:00:00Z"}"#).unwrap();
    let exact = repo.find_one(filters).await.unwrap();
    assert_eq!(exact.map(|t| t.id), Some(ticket.id));

    session.close().await;
    db.cleanup().await;
}

#[tokio::test]
#[ignore = "Requires test database"]
async fn test_find_one() {
    let db = TestDatabase::migrated().await;
    let session = db.sessions().session();
    let repo = Repository::<Ticket>::new(session.clone());

    assert_eq!(repo.find_one(Filters::new()).await.unwrap(), None);

    let created = seed(&session, &[("A", "open"), ("B", "open"), ("C", "closed")]).await;

    let newest = repo.find_one(Filters::new()).await.unwrap().unwrap();
    assert_eq!(newest.id, created[2].id);

    let newest_open = repo
        .find_one(Filters::new().with("status", "open"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(newest_open.id, created[1].id);

    let missing = repo
        .find_one(Filters::new().with("name", "Z"))
        .await
        .unwrap();
    assert!(missing.is_none());

    session.close().await;
    db.cleanup().await;
}

#[tokio::test]
#[ignore = "Requires test database"]
async fn test_update_persists_and_reloads() {
    let db = TestDatabase::migrated().await;
    let session = db.sessions().session();
    let repo = ticket_repository(session.clone());
    let ticket = seed(&session, &[("Boiler", "open")]).await.remove(0);

    let updated = repo
        .update(
            &ticket,
            Attributes::new()
                .with("priority", 5)
                .with("description", "Pressure drops overnight"),
        )
        .await
        .unwrap();

    assert_eq!(updated.id, ticket.id);
    assert_eq!(updated.priority, 5);
    assert!(updated.updated_at >= ticket.updated_at);

    let refetched = repo
        .find_one(Filters::new().with("id", ticket.id))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refetched.priority, 5);
    assert_eq!(
        refetched.description.as_deref(),
        Some("Pressure drops overnight")
    );

    // Clearing a nullable column
    let cleared = repo
        .update(&refetched, Attributes::new().with("description", None::<String>))
        .await
        .unwrap();
    assert_eq!(cleared.description, None);

    session.close().await;
    db.cleanup().await;
}

#[tokio::test]
#[ignore = "Requires test database"]
async fn test_update_with_no_attributes_only_reloads() {
    let db = TestDatabase::migrated().await;
    let session = db.sessions().session();
    let ticket = seed(&session, &[("Boiler", "open")]).await.remove(0);
    let repo = Repository::<Ticket>::new(session.clone());

    let reloaded = repo.update(&ticket, Attributes::new()).await.unwrap();
    assert_eq!(reloaded, ticket);

    session.close().await;
    db.cleanup().await;
}

#[tokio::test]
#[ignore = "Requires test database"]
async fn test_update_of_deleted_row_is_not_found() {
    let db = TestDatabase::migrated().await;
    let session = db.sessions().session();
    let ticket = seed(&session, &[("Boiler", "open")]).await.remove(0);

    let mut delete = sqlx::QueryBuilder::new("DELETE FROM tickets WHERE id = ");
    delete.push_bind(ticket.id);
    assert_eq!(session.execute(&mut delete).await.unwrap(), 1);
    session.commit().await.unwrap();

    let err = ticket_repository(session.clone())
        .update(&ticket, Attributes::new().with("priority", 2))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    session.close().await;
    db.cleanup().await;
}

#[tokio::test]
#[ignore = "Requires test database"]
async fn test_writes_are_committed_for_other_sessions() {
    let db = TestDatabase::migrated().await;
    let sessions = db.sessions();

    let created = sessions
        .scope(|session| async move {
            ticket_repository(session)
                .create(Attributes::new().with("name", "Boiler"))
                .await
        })
        .await
        .unwrap();

    let seen = sessions
        .scope(|session| async move {
            Repository::<Ticket>::new(session)
                .find_one(Filters::new().with("id", created.id))
                .await
        })
        .await
        .unwrap();

    assert_eq!(seen.map(|t| t.name), Some("Boiler".to_string()));
    db.cleanup().await;
}

#[tokio::test]
#[ignore = "Requires test database"]
async fn test_uncommitted_work_is_rolled_back_on_close() {
    let db = TestDatabase::migrated().await;
    let sessions = db.sessions();

    let session = sessions.session();
    let mut insert = sqlx::QueryBuilder::new("INSERT INTO tickets (name) VALUES ('draft')");
    session.execute(&mut insert).await.unwrap();
    session.close().await;

    let count = sessions
        .scope(|session| async move {
            Repository::<Ticket>::new(session)
                .list(Filters::new(), &[])
                .await
        })
        .await
        .unwrap()
        .len();
    assert_eq!(count, 0);

    db.cleanup().await;
}

#[tokio::test]
#[ignore = "Requires test database"]
async fn test_constraint_violation_propagates() {
    let db = TestDatabase::migrated().await;
    let session = db.sessions().session();
    // No hooks: the missing NOT NULL name reaches the database
    let repo = Repository::<Ticket>::new(session.clone());

    let err = repo
        .create(Attributes::new().with("description", "nameless"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Database(_)));

    session.close().await;
    db.cleanup().await;
}
