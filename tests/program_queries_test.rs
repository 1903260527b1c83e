mod common;

use common::*;
use rstest::rstest;
use std::sync::Arc;
use tv_store::models::Program;
use tv_store::{AppError, ContentValues, QueryRequest, RequestError, ResourceUri, Selection};

async fn titles(t: &TestStore, uri: &ResourceUri) -> Vec<String> {
    let programs: Vec<Program> = t
        .store
        .query_as(&owner(), uri, &QueryRequest::new())
        .await
        .unwrap();
    programs.into_iter().filter_map(|p| p.title).collect()
}

#[tokio::test]
async fn test_time_window_uses_exclusive_overlap() {
    let t = open_store().await;
    let channel = insert_channel(&t.store, &owner(), "input-1", "1").await;
    insert_program(&t.store, &owner(), channel, "early", 0, 50).await;
    insert_program(&t.store, &owner(), channel, "first", 50, 150).await;
    insert_program(&t.store, &owner(), channel, "second", 150, 250).await;
    insert_program(&t.store, &owner(), channel, "late", 200, 300).await;

    let uri = ResourceUri::channel_programs(channel).with_time_window(100, 200);
    assert_eq!(titles(&t, &uri).await, vec!["first", "second"]);

    let programs: Vec<Program> = t
        .store
        .query_as(&owner(), &uri, &QueryRequest::new())
        .await
        .unwrap();
    let first = &programs[0];
    assert_eq!(first.start_time().map(|at| at.timestamp_millis()), Some(50));
    assert_eq!(first.end_time().map(|at| at.timestamp_millis()), Some(150));

    // Without a window every program of the channel is returned, by start time
    let all = titles(&t, &ResourceUri::channel_programs(channel)).await;
    assert_eq!(all, vec!["early", "first", "second", "late"]);
}

#[rstest]
#[case("content://tvstore/channel/1/program?startTime=100")]
#[case("content://tvstore/channel/1/program?endTime=200")]
#[case("content://tvstore/channel/1/program?startTime=soon&endTime=200")]
#[tokio::test]
async fn test_incomplete_time_window_is_rejected(#[case] raw: &str) {
    let t = open_store().await;
    let uri = ResourceUri::parse(raw).unwrap();
    let err = t
        .store
        .query(&owner(), &uri, &QueryRequest::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Request(RequestError::InvalidParameter { .. })
    ));
}

#[tokio::test]
async fn test_canonical_genre_matches_currently_airing_programs() {
    let t = open_store().await;
    let store = t.store.clone().with_clock(Arc::new(|| 1_000i64));

    let news = insert_channel(&store, &owner(), "input-1", "1").await;
    let sports = insert_channel(&store, &owner(), "input-1", "2").await;
    let later_news = insert_channel(&store, &owner(), "input-1", "3").await;

    for (channel, genre, start, end) in [
        (news, "NEWS", 500, 1_500),
        (news, "NEWS,DRAMA", 900, 1_100),
        (sports, "SPORTS", 500, 1_500),
        (later_news, "NEWS", 2_000, 3_000),
    ] {
        store
            .insert(
                &owner(),
                &ResourceUri::programs(),
                program_values(channel, "show", start, end).with("canonical_genre", genre),
            )
            .await
            .unwrap();
    }

    let rows = store
        .query(
            &owner(),
            &ResourceUri::channels().with_canonical_genre("NEWS"),
            &QueryRequest::new(),
        )
        .await
        .unwrap();
    let ids: Vec<i64> = rows.iter().filter_map(|row| row.get_i64("_id")).collect();
    assert_eq!(ids, vec![news]);
}

#[tokio::test]
async fn test_genre_filter_applies_to_input_shape() {
    let t = open_store().await;
    let store = t.store.clone().with_clock(Arc::new(|| 1_000i64));
    let on_input = insert_channel(&store, &owner(), "input-1", "1").await;
    let elsewhere = insert_channel(&store, &owner(), "input-2", "2").await;
    for channel in [on_input, elsewhere] {
        store
            .insert(
                &owner(),
                &ResourceUri::programs(),
                program_values(channel, "match", 0, 2_000).with("canonical_genre", "SPORTS"),
            )
            .await
            .unwrap();
    }

    let rows = store
        .query(
            &owner(),
            &ResourceUri::input_channels("input-1").with_canonical_genre("SPORTS"),
            &QueryRequest::new(),
        )
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get_i64("_id"), Some(on_input));
}

#[tokio::test]
async fn test_genre_filter_rejections() {
    let t = open_store().await;

    let err = t
        .store
        .query(
            &owner(),
            &ResourceUri::channels().with_canonical_genre("Soap"),
            &QueryRequest::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Request(RequestError::NotCanonicalGenre { .. })
    ));

    let err = t
        .store
        .delete(
            &owner(),
            &ResourceUri::channels().with_canonical_genre("NEWS"),
            &Selection::none(),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Request(RequestError::GenreFilterNotAllowed { .. })
    ));
}

#[rstest]
#[case("NEWS")]
#[case("nonsense")]
#[tokio::test]
async fn test_insert_with_genre_filter_is_rejected(#[case] genre: &str) {
    let t = open_store().await;

    let err = t
        .store
        .insert(
            &owner(),
            &ResourceUri::channels().with_canonical_genre(genre),
            channel_values("input-1", "1"),
        )
        .await
        .unwrap_err();
    match err {
        AppError::Request(RequestError::GenreFilterNotAllowed { operation, .. }) => {
            assert_eq!(operation, "Insert");
        }
        e => panic!("unexpected error: {e}"),
    }

    let rows = t
        .store
        .query(&owner(), &ResourceUri::channels(), &QueryRequest::new())
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_browsable_only_on_input_shape() {
    let t = open_store().await;
    insert_channel(&t.store, &owner(), "input-1", "1").await;
    t.store
        .insert(
            &owner(),
            &ResourceUri::channels(),
            channel_values("input-1", "2").with("browsable", false),
        )
        .await
        .unwrap();

    let browsable = t
        .store
        .query(&owner(), &ResourceUri::input_channels("input-1"), &QueryRequest::new())
        .await
        .unwrap();
    assert_eq!(browsable.len(), 1);

    let everything = t
        .store
        .query(
            &owner(),
            &ResourceUri::input_channels("input-1").with_browsable_only(false),
            &QueryRequest::new(),
        )
        .await
        .unwrap();
    assert_eq!(everything.len(), 2);
}

#[tokio::test]
async fn test_program_writes_normalize_genres() {
    let t = open_store().await;
    let channel = insert_channel(&t.store, &owner(), "input-1", "1").await;

    // Invalid canonical list is dropped and derived from the broadcast genres
    let derived = t
        .store
        .insert(
            &owner(),
            &ResourceUri::programs(),
            program_values(channel, "derived", 0, 10)
                .with("canonical_genre", "NEWS,SOAP")
                .with("broadcast_genre", "Sports,News,sports"),
        )
        .await
        .unwrap();

    // Invalid canonical list without a fallback ends up NULL
    let cleared = t
        .store
        .insert(
            &owner(),
            &ResourceUri::programs(),
            program_values(channel, "cleared", 10, 20).with("canonical_genre", "SOAP"),
        )
        .await
        .unwrap();

    let stored = |uri: ResourceUri| {
        let store = t.store.clone();
        async move {
            let programs: Vec<Program> = store
                .query_as(&owner(), &uri, &QueryRequest::new())
                .await
                .unwrap();
            programs.into_iter().next().unwrap().canonical_genre
        }
    };
    assert_eq!(stored(derived).await.as_deref(), Some("SPORTS,NEWS"));
    assert_eq!(stored(cleared).await, None);

    // A valid list is kept as written
    let program = insert_program(&t.store, &owner(), channel, "kept", 20, 30).await;
    t.store
        .update(
            &owner(),
            &ResourceUri::program(program),
            ContentValues::new().with("canonical_genre", "MOVIES,DRAMA"),
            &Selection::none(),
        )
        .await
        .unwrap();
    assert_eq!(
        stored(ResourceUri::program(program)).await.as_deref(),
        Some("MOVIES,DRAMA")
    );
}

#[tokio::test]
async fn test_schema_14_has_no_video_resolution() {
    let t = open_store_with_version(14).await;
    let channel = insert_channel(&t.store, &owner(), "input-1", "1").await;

    let err = t
        .store
        .insert(
            &owner(),
            &ResourceUri::programs(),
            program_values(channel, "hd", 0, 10).with("video_resolution", "HD"),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Request(RequestError::UnknownColumn { .. })
    ));

    insert_program(&t.store, &owner(), channel, "sd", 0, 10).await;
    let programs: Vec<Program> = t
        .store
        .query_as(&owner(), &ResourceUri::programs(), &QueryRequest::new())
        .await
        .unwrap();
    assert_eq!(programs[0].video_resolution, None);
}
