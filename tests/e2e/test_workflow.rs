use crate::e2e::helpers;

use futures::FutureExt;
use helpers::assertions::{assert_forbidden, assert_item_flags, assert_numbers_feed_items};
use helpers::{real_app_config, FixtureContext};
use pretty_assertions::assert_eq;
use selfoss_harness::client::RSS_SPOUT;
use serial_test::serial;
use selfoss_harness::fixture::{run_scenario, FixtureEnv};
use std::panic::AssertUnwindSafe;
use test_context::test_context;

/// Login, subscribe to the synthetic feed, refresh and toggle item flags
async fn read_and_star_workflow(env: &FixtureEnv) {
    let mut client = env.client().unwrap();

    let items = client.list_items(None).await.unwrap();
    assert!(items.is_empty(), "Fresh instance should have no items");

    assert_forbidden(
        client
            .add_source(RSS_SPOUT, &[("url", env.feed_url.as_str())])
            .await,
    );

    let login = client
        .login(&env.credentials.username, &env.credentials.password)
        .await
        .unwrap();
    assert!(login.success, "Login failed: {:?}", login.error);

    let source = client
        .add_source(RSS_SPOUT, &[("url", env.feed_url.as_str())])
        .await
        .unwrap();
    assert!(source.success);
    assert_eq!(
        source.title.as_deref(),
        Some(format!("{} numbers", env.feed_length).as_str())
    );

    assert_eq!(client.refresh_all().await.unwrap(), "finished");

    let items = client.list_items(None).await.unwrap();
    assert_numbers_feed_items(&items, env.feed_length);
    let first = &items[0];
    assert_item_flags(first, true, false);

    assert!(client.mark_read(first.id, true).await.unwrap());
    assert!(client.mark_starred(first.id, true).await.unwrap());

    let items = client.list_items(None).await.unwrap();
    assert_eq!(items[0].id, first.id);
    assert_item_flags(&items[0], false, true);

    let found = client.list_items(Some("3")).await.unwrap();
    assert_eq!(found.len(), 5, "Five numbers contain the digit 3");
}

#[test_context(FixtureContext)]
#[tokio::test]
#[serial]
async fn it_should_read_and_star_items_from_subscribed_feed(ctx: &mut FixtureContext) {
    let Some(env) = ctx.env() else {
        return;
    };
    read_and_star_workflow(env).await;
}

#[test_context(FixtureContext)]
#[tokio::test]
#[serial]
async fn it_should_start_each_fixture_empty(ctx: &mut FixtureContext) {
    let Some(env) = ctx.env() else {
        return;
    };
    let client = env.client().unwrap();
    assert!(client.list_items(None).await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn it_should_tear_down_when_scenario_panics() {
    helpers::init_tracing();
    let Some(mut config) = real_app_config() else {
        return;
    };
    let root = tempfile::TempDir::new().unwrap();
    config.temp_root = root.path().to_path_buf();

    let outcome = AssertUnwindSafe(run_scenario::<_, _, ()>(&config, |_env| async {
        panic!("scenario failure");
    }))
    .catch_unwind()
    .await;

    assert!(outcome.is_err(), "The scenario panic should be resumed");
    let leftovers = std::fs::read_dir(root.path()).unwrap().count();
    assert_eq!(leftovers, 0, "Fixture workspaces should be removed");
}
