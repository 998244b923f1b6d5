//! Runnable walkthrough of the object store: register a record type,
//! create/read/update/delete it through a `Model`, then run AND/OR queries
//! over a second type. Mirrors the scenarios this crate is tested against.

use std::sync::Arc;

use objectstore_core::{EntityId, SystemClock};
use objectstore_kv::MemoryKv;
use objectstore_macros::Record as RecordDerive;
use objectstore_query::{where_field, Query};
use objectstore_store::{Store, TxnError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, RecordDerive)]
struct Person {
    #[record(id)]
    id: EntityId,
    name: String,
    age: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, RecordDerive)]
struct Post {
    #[record(id)]
    id: EntityId,
    author: String,
    title: String,
}

fn main() {
    objectstore_observability::init();

    person_lifecycle();
    post_queries();
}

fn person_lifecycle() {
    let store = Store::new(
        Arc::new(MemoryKv::new()),
        Arc::new(MemoryKv::new()),
        Arc::new(SystemClock),
    );
    let people = store.register::<Person>("person").expect("register Person");

    let mut alice = Person {
        id: EntityId::unassigned(),
        name: "Alice".into(),
        age: 42,
    };
    people.create(&mut alice).expect("create");
    let found = people.find_by_id(&alice.id).expect("find_by_id");
    tracing::info!(?found, "created and read back a Person");

    let mut renamed = found;
    renamed.name = "Bob".into();
    people.save(&renamed).expect("save");
    let after_save = people.find_by_id(&alice.id).expect("find_by_id after save");
    assert_eq!(after_save.name, "Bob");
    assert_eq!(after_save.age, 42);
    tracing::info!(?after_save, "renamed via a merge-patch save");

    people.delete(&alice.id).expect("first delete");
    match people.delete(&alice.id) {
        Err(TxnError::NotFound) => {
            tracing::info!("second delete on the same id correctly reports NotFound");
        }
        other => panic!("expected NotFound on repeat delete, got {other:?}"),
    }
}

fn post_queries() {
    let store = Store::new(
        Arc::new(MemoryKv::new()),
        Arc::new(MemoryKv::new()),
        Arc::new(SystemClock),
    );
    let posts = store.register::<Post>("post").expect("register Post");

    for (author, title) in [
        ("A1", "T1"),
        ("A1", "T2"),
        ("A1", "T3"),
        ("A2", "T4"),
        ("A3", "T5"),
    ] {
        let mut p = Post {
            id: EntityId::unassigned(),
            author: author.into(),
            title: title.into(),
        };
        posts.create(&mut p).expect("create post");
    }

    let by_author = where_field("author").eq("A1");
    assert_eq!(posts.find(&by_author).unwrap().len(), 3);

    let narrowed = where_field("author").eq("A1").and("title").eq("T2");
    assert_eq!(posts.find(&narrowed).unwrap().len(), 1);

    let widened = where_field("author").eq("A1").or(where_field("author").eq("A3"));
    assert_eq!(posts.find(&widened).unwrap().len(), 4);

    let ordered = Query::default().order_by_desc("title");
    let titles: Vec<String> = posts
        .find(&ordered)
        .unwrap()
        .into_iter()
        .map(|p| p.title)
        .collect();
    tracing::info!(?titles, "posts ordered by title, descending");
}
