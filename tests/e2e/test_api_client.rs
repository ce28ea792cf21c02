use crate::e2e::helpers;

use helpers::assertions::{assert_forbidden, assert_item_flags, assert_numbers_feed_items};
use helpers::{FakeAppContext, FEED_LENGTH, PASSWORD, USERNAME};
use pretty_assertions::assert_eq;
use selfoss_harness::client::{Session, RSS_SPOUT};
use test_context::test_context;

async fn ingest(ctx: &mut FakeAppContext) {
    let login = ctx.client.login(USERNAME, PASSWORD).await.unwrap();
    assert!(login.success);
    let feed_url = ctx.feed.feed_url();
    ctx.client
        .add_source(RSS_SPOUT, &[("url", feed_url.as_str())])
        .await
        .unwrap();
    ctx.client.refresh_all().await.unwrap();
}

#[test_context(FakeAppContext)]
#[tokio::test]
async fn it_should_start_anonymous_with_no_items(ctx: &mut FakeAppContext) {
    assert_eq!(ctx.client.session(), &Session::Anonymous);

    let items = ctx.client.list_items(None).await.unwrap();
    assert!(items.is_empty(), "New instance should have no items");
}

#[test_context(FakeAppContext)]
#[tokio::test]
async fn it_should_reject_source_creation_while_anonymous(ctx: &mut FakeAppContext) {
    let feed_url = ctx.feed.feed_url();

    assert_forbidden(
        ctx.client
            .add_source(RSS_SPOUT, &[("url", feed_url.as_str())])
            .await,
    );

    let login = ctx.client.login(USERNAME, PASSWORD).await.unwrap();
    assert!(login.success, "Login failed: {:?}", login.error);

    let source = ctx
        .client
        .add_source(RSS_SPOUT, &[("url", feed_url.as_str())])
        .await
        .unwrap();
    assert!(source.success);
    assert_eq!(source.title.as_deref(), Some("20 numbers"));
}

#[test_context(FakeAppContext)]
#[tokio::test]
async fn it_should_leave_state_unchanged_after_rejected_mutation(ctx: &mut FakeAppContext) {
    ingest(ctx).await;
    let first = ctx.client.list_items(None).await.unwrap()[0].clone();

    let anonymous = ctx.anonymous_client();
    assert_forbidden(anonymous.mark_read(first.id, true).await);
    assert_forbidden(anonymous.mark_starred(first.id, true).await);

    let items = ctx.client.list_items(None).await.unwrap();
    assert_item_flags(&items[0], true, false);
}

#[test_context(FakeAppContext)]
#[tokio::test]
async fn it_should_report_rejected_credentials(ctx: &mut FakeAppContext) {
    let login = ctx.client.login(USERNAME, "wrong").await.unwrap();

    assert!(!login.success);
    assert!(login.error.is_some());
    assert_eq!(ctx.client.session(), &Session::Anonymous);
}

#[test_context(FakeAppContext)]
#[tokio::test]
async fn it_should_drop_privileges_on_logout(ctx: &mut FakeAppContext) {
    ctx.client.login(USERNAME, PASSWORD).await.unwrap();
    assert!(ctx.client.session().is_authenticated());

    let logout = ctx.client.logout().await.unwrap();
    assert!(logout.success);
    assert_eq!(ctx.client.session(), &Session::Anonymous);

    let feed_url = ctx.feed.feed_url();
    assert_forbidden(
        ctx.client
            .add_source(RSS_SPOUT, &[("url", feed_url.as_str())])
            .await,
    );
}

#[test_context(FakeAppContext)]
#[tokio::test]
async fn it_should_ingest_every_feed_item(ctx: &mut FakeAppContext) {
    ingest(ctx).await;

    let items = ctx.client.list_items(None).await.unwrap();
    assert_numbers_feed_items(&items, FEED_LENGTH);
    assert_item_flags(&items[0], true, false);
}

#[test_context(FakeAppContext)]
#[tokio::test]
async fn it_should_not_duplicate_items_on_second_refresh(ctx: &mut FakeAppContext) {
    ingest(ctx).await;
    let token = ctx.client.refresh_all().await.unwrap();
    assert_eq!(token, "finished");

    let items = ctx.client.list_items(None).await.unwrap();
    assert_eq!(items.len(), FEED_LENGTH);
}

#[test_context(FakeAppContext)]
#[tokio::test]
async fn it_should_mark_read_idempotently(ctx: &mut FakeAppContext) {
    ingest(ctx).await;
    let id = ctx.client.list_items(None).await.unwrap()[0].id;

    assert!(ctx.client.mark_read(id, true).await.unwrap());
    assert!(ctx.client.mark_read(id, true).await.unwrap());
    let items = ctx.client.list_items(None).await.unwrap();
    assert_item_flags(&items[0], false, false);

    assert!(ctx.client.mark_read(id, false).await.unwrap());
    let items = ctx.client.list_items(None).await.unwrap();
    assert_item_flags(&items[0], true, false);
}

#[test_context(FakeAppContext)]
#[tokio::test]
async fn it_should_toggle_starred(ctx: &mut FakeAppContext) {
    ingest(ctx).await;
    let id = ctx.client.list_items(None).await.unwrap()[0].id;

    assert!(ctx.client.mark_starred(id, true).await.unwrap());
    assert!(ctx.client.mark_starred(id, true).await.unwrap());
    let items = ctx.client.list_items(None).await.unwrap();
    assert_item_flags(&items[0], true, true);

    assert!(ctx.client.mark_starred(id, false).await.unwrap());
    let items = ctx.client.list_items(None).await.unwrap();
    assert_item_flags(&items[0], true, false);
}

#[test_context(FakeAppContext)]
#[tokio::test]
async fn it_should_surface_status_and_body_for_unknown_items(ctx: &mut FakeAppContext) {
    ingest(ctx).await;

    let err = ctx.client.mark_read(999_999, true).await.unwrap_err();
    assert_eq!(err.status(), Some(reqwest::StatusCode::NOT_FOUND));
    assert_eq!(
        err.body().and_then(|b| b.get("success")),
        Some(&serde_json::Value::Bool(false))
    );
}

#[test_context(FakeAppContext)]
#[tokio::test]
async fn it_should_find_five_numbers_containing_three(ctx: &mut FakeAppContext) {
    ingest(ctx).await;

    let items = ctx.client.list_items(Some("3")).await.unwrap();
    let mut titles: Vec<u64> = items.iter().map(|i| i.title.parse().unwrap()).collect();
    titles.sort_unstable();

    assert_eq!(titles, vec![3, 13, 34, 233, 377]);
}
