/// Calling-convention adaptation tests
///
/// Thunks resolve to the same results as direct awaits, and the callback
/// adapter invokes each continuation exactly once with the settled outcome.
/// Run with: cargo test --test adapt_tests
use std::sync::Arc;

use modelkit::{AttrDef, CallStyle, ModelBuilder, ModelType, attrs};
use tokio::sync::oneshot;

fn user() -> Arc<ModelType> {
    ModelBuilder::new("user")
        .attr("id", AttrDef::new().primary())
        .unwrap()
        .attr("name", AttrDef::new())
        .unwrap()
        .find_with(|query| async move {
            Ok(query
                .get("id")
                .cloned()
                .map(|id| attrs! { "id" => id, "name" => "alex" }))
        })
        .count_with(|_query| async move { Ok(Some(3)) })
        .save_with(|_changed| async move { Ok(None) })
        .build()
}

#[tokio::test]
async fn thunk_resolve_matches_a_direct_await() {
    let user = user();
    let direct = user.find(1).await.unwrap().unwrap();
    let deferred = user.find_thunk(1).resolve().await.unwrap().unwrap();
    assert_eq!(direct.attrs(), deferred.attrs());
}

#[tokio::test]
async fn a_thunk_is_itself_awaitable() {
    let user = user();
    let count = user.count_thunk(attrs!()).await.unwrap();
    assert_eq!(count, 3);
}

#[tokio::test]
async fn callback_find_hands_the_outcome_to_the_continuation() {
    let user = user();
    let (tx, rx) = oneshot::channel();
    user.callbacks().find(1, move |outcome| {
        let _ = tx.send(outcome);
    });
    let found = rx.await.unwrap().unwrap().unwrap();
    assert_eq!(found.get_text("name").as_deref(), Some("alex"));
}

#[tokio::test]
async fn callback_save_returns_the_record_clean() {
    let user = user();
    let mut record = user.create(attrs! { "id" => 1 });
    record.set("name", "sasha").unwrap();

    let (tx, rx) = oneshot::channel();
    user.callbacks().save(record, move |outcome| {
        let _ = tx.send(outcome);
    });

    let record = rx.await.unwrap().unwrap();
    assert!(!record.is_dirty());
    assert_eq!(record.get_text("name").as_deref(), Some("sasha"));
}

#[tokio::test]
async fn callback_remove_surfaces_handler_errors() {
    let doomed = ModelBuilder::new("doomed")
        .attr("id", AttrDef::new().primary())
        .unwrap()
        .remove_with(|| async move { Err(anyhow::anyhow!("gone")) })
        .call_style(CallStyle::Callback)
        .build();
    let record = doomed.create(attrs! { "id" => 1 });

    let (tx, rx) = oneshot::channel();
    doomed.callbacks().remove(record, move |outcome| {
        let _ = tx.send(outcome);
    });

    let err = rx.await.unwrap().unwrap_err();
    assert_eq!(err.to_string(), "gone");
}

#[test]
fn call_style_is_recorded_on_the_model() {
    let deferred = ModelBuilder::new("a").build();
    assert_eq!(deferred.call_style(), CallStyle::Deferred);

    let callback = ModelBuilder::new("b").call_style(CallStyle::Callback).build();
    assert_eq!(callback.call_style(), CallStyle::Callback);
}

#[tokio::test]
async fn declared_style_is_advisory_not_a_gate() {
    // A deferred-style model still hands out the callback adapter, and a
    // callback-style model still awaits directly.
    let user = user();
    assert_eq!(user.call_style(), CallStyle::Deferred);
    let (tx, rx) = oneshot::channel();
    user.callbacks().count(attrs!(), move |outcome| {
        let _ = tx.send(outcome);
    });
    assert_eq!(rx.await.unwrap().unwrap(), 3);

    let other = ModelBuilder::new("other")
        .attr("id", AttrDef::new().primary())
        .unwrap()
        .count_with(|_query| async move { Ok(Some(1)) })
        .call_style(CallStyle::Callback)
        .build();
    assert_eq!(other.count(attrs!()).await.unwrap(), 1);
}
