mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{one_user, registry, users, FailingCache, MockDriver};
use quarry_core::{FetchNode, Insert, RelationalQuery, Row, Select, SqlValue, Update};
use quarry_session::{
    CacheConfig, CacheStrategy, MemoryCache, QueryOutput, Session, SessionConfig, SessionError,
};
use serde_json::json;

fn cached_session(strategy: CacheStrategy) -> (Session<MockDriver>, Arc<MemoryCache>) {
    let cache = Arc::new(MemoryCache::new(strategy));
    let session = Session::new(MockDriver::new(one_user())).with_cache(cache.clone());
    (session, cache)
}

#[tokio::test]
async fn test_opted_in_read_runs_once() {
    let (session, cache) = cached_session(CacheStrategy::Explicit);
    let users = users();
    let select = Select::new().from(&users).build().unwrap();
    let prepared = session
        .prepare(&select)
        .unwrap()
        .with_cache(CacheConfig::enabled());

    let first = session.execute(&prepared).await.unwrap();
    let second = session.execute(&prepared).await.unwrap();

    assert_eq!(first, one_user());
    assert_eq!(second, one_user());
    assert_eq!(session.driver().calls(), 1);
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn test_explicit_strategy_without_opt_in_always_runs() {
    let (session, cache) = cached_session(CacheStrategy::Explicit);
    let select = Select::new().from(&users()).build().unwrap();

    session.run(&select).await.unwrap();
    session.run(&select).await.unwrap();

    assert_eq!(session.driver().calls(), 2);
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_write_invalidates_dependent_reads() {
    let (session, cache) = cached_session(CacheStrategy::All);
    let users = users();
    let select = Select::new().from(&users).build().unwrap();

    session.run(&select).await.unwrap();
    session.run(&select).await.unwrap();
    assert_eq!(session.driver().calls(), 1);

    let insert = Insert::into(&users)
        .value(Row::new().set("id", 2).set("name", "bob"))
        .build()
        .unwrap();
    session.run(&insert).await.unwrap();
    assert!(cache.is_empty());

    session.run(&select).await.unwrap();
    assert_eq!(session.driver().calls(), 3);
}

#[tokio::test]
async fn test_entries_without_auto_invalidation_survive_writes() {
    let (session, _cache) = cached_session(CacheStrategy::Explicit);
    let users = users();
    let select = Select::new().from(&users).build().unwrap();
    let prepared = session
        .prepare(&select)
        .unwrap()
        .with_cache(CacheConfig::enabled().auto_invalidate(false));

    session.execute(&prepared).await.unwrap();
    let update = Update::table(&users)
        .set("name", "carol")
        .where_clause(users.col("id").eq(1))
        .build()
        .unwrap();
    session.run(&update).await.unwrap();
    session.execute(&prepared).await.unwrap();

    // one read, one write
    assert_eq!(session.driver().calls(), 2);
}

#[tokio::test]
async fn test_tagged_entry_dropped_by_explicit_invalidation() {
    let (session, _cache) = cached_session(CacheStrategy::Explicit);
    let select = Select::new().from(&users()).build().unwrap();
    let prepared = session
        .prepare(&select)
        .unwrap()
        .with_cache(CacheConfig::enabled().tag("all-users"));

    session.execute(&prepared).await.unwrap();
    session
        .invalidate(&[], &[String::from("all-users")])
        .await
        .unwrap();
    session.execute(&prepared).await.unwrap();

    assert_eq!(session.driver().calls(), 2);
}

#[tokio::test]
async fn test_concurrent_identical_reads_share_one_execution() {
    let cache = Arc::new(MemoryCache::new(CacheStrategy::All));
    let session = Session::new(MockDriver::new(one_user()).delayed(Duration::from_millis(50)))
        .with_cache(cache);
    let select = Select::new().from(&users()).build().unwrap();
    let prepared = session.prepare(&select).unwrap();

    let (a, b) = tokio::join!(session.execute(&prepared), session.execute(&prepared));

    assert_eq!(a.unwrap(), one_user());
    assert_eq!(b.unwrap(), one_user());
    assert_eq!(session.driver().calls(), 1);
}

#[tokio::test]
async fn test_single_flight_can_be_disabled() {
    let cache = Arc::new(MemoryCache::new(CacheStrategy::All));
    let config = SessionConfig::from_json(r#"{"single_flight": false}"#).unwrap();
    let session = Session::new(MockDriver::new(one_user()).delayed(Duration::from_millis(50)))
        .with_cache(cache)
        .with_config(config);
    let select = Select::new().from(&users()).build().unwrap();
    let prepared = session.prepare(&select).unwrap();

    let (a, b) = tokio::join!(session.execute(&prepared), session.execute(&prepared));

    assert!(a.is_ok() && b.is_ok());
    assert_eq!(session.driver().calls(), 2);
}

#[tokio::test]
async fn test_failed_invalidation_fails_successful_write() {
    let session = Session::new(MockDriver::new(QueryOutput::affected(1)))
        .with_cache(Arc::new(FailingCache));
    let users = users();
    let insert = Insert::into(&users)
        .value(Row::new().set("id", 2).set("name", "bob"))
        .build()
        .unwrap();

    let err = session.run(&insert).await.unwrap_err();

    assert!(matches!(err, SessionError::Cache(_)), "got {err:?}");
    assert_eq!(session.driver().calls(), 1);
}

#[tokio::test]
async fn test_failed_write_and_invalidation_report_both() {
    let session = Session::new(MockDriver::new(QueryOutput::default()).failing())
        .with_cache(Arc::new(FailingCache));
    let users = users();
    let insert = Insert::into(&users)
        .value(Row::new().set("id", 2).set("name", "bob"))
        .build()
        .unwrap();

    let err = session.run(&insert).await.unwrap_err();

    match err {
        SessionError::Multiple(errors) => {
            assert_eq!(errors.len(), 2);
            assert!(matches!(errors[0], SessionError::Query { .. }));
            assert!(matches!(errors[1], SessionError::Cache(_)));
        }
        other => panic!("expected both errors, got {other:?}"),
    }
}

#[tokio::test]
async fn test_cache_store_failure_keeps_query_result() {
    let session =
        Session::new(MockDriver::new(one_user())).with_cache(Arc::new(FailingCache));
    let select = Select::new().from(&users()).build().unwrap();

    let output = session.run(&select).await.unwrap();

    assert_eq!(output, one_user());
}

#[tokio::test]
async fn test_query_error_carries_sql_and_params() {
    let session = Session::new(MockDriver::new(QueryOutput::default()).failing());
    let users = users();
    let select = Select::new()
        .from(&users)
        .where_clause(users.col("id").eq(5))
        .build()
        .unwrap();

    let err = session.run(&select).await.unwrap_err();

    match err {
        SessionError::Query { sql, params, .. } => {
            assert_eq!(sql, r#"SELECT "id", "name" FROM "users" WHERE "users"."id" = $1"#);
            assert_eq!(params, vec![SqlValue::Int(5)]);
        }
        other => panic!("expected a query error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_rebind_checks_parameter_count() {
    let session = Session::new(MockDriver::new(one_user()));
    let users = users();
    let select = Select::new()
        .from(&users)
        .where_clause(users.col("id").eq(5))
        .build()
        .unwrap();
    let prepared = session.prepare(&select).unwrap();

    let rebound = prepared.rebind(vec![SqlValue::Int(9)]).unwrap();
    assert_eq!(rebound.query().params, vec![SqlValue::Int(9)]);
    assert_eq!(rebound.query().sql, prepared.query().sql);

    let err = prepared.rebind(Vec::new()).unwrap_err();
    assert!(matches!(
        err,
        SessionError::ParamCount {
            expected: 1,
            actual: 0
        }
    ));
}

#[tokio::test]
async fn test_fetch_relational_maps_rows() {
    let output = QueryOutput::from_rows(
        vec![
            String::from("id"),
            String::from("name"),
            String::from("posts"),
        ],
        vec![vec![
            SqlValue::Int(1),
            SqlValue::Text(String::from("alice")),
            SqlValue::Text(String::from(r#"[["hello"]]"#)),
        ]],
    );
    let session = Session::new(MockDriver::new(output));
    let query = RelationalQuery::find_many(
        &registry(),
        "users",
        FetchNode::new()
            .include(&["id", "name"])
            .with("posts", FetchNode::new().include(&["title"])),
    )
    .unwrap();

    let rows = session.fetch_relational(&query, None).await.unwrap();

    assert_eq!(
        rows,
        vec![json!({"id": 1, "name": "alice", "posts": [{"title": "hello"}]})]
    );
}
