mod common;

use std::sync::Arc;

use bonito_offline_core::{
    CacheStore, Event, MemoryCacheStore, Outcome, Registration, Response, ResponseSource, WorkerState,
};
use common::{get, worker, FakeNetwork};

#[tokio::test]
async fn install_precaches_every_core_file() {
    let store = Arc::new(MemoryCacheStore::new());
    let network = FakeNetwork::new();
    network.route_core_files();
    let sw = worker("1.0.0", &store, &network);

    let outcome = sw.handle(Event::Install).await.unwrap();
    assert_eq!(outcome, Outcome::Installed { precached: 7 });
    assert_eq!(sw.state(), WorkerState::Installed);

    let entries = store.entries("ecoexpedicoes-static-v1.0.0").await.unwrap();
    assert_eq!(entries.len(), 7);
    let manifest = store
        .get("ecoexpedicoes-static-v1.0.0", &get("/manifest.json").id())
        .await
        .unwrap();
    assert_eq!(manifest.unwrap().text(), "core:/manifest.json");
}

#[tokio::test]
async fn install_is_all_or_nothing() {
    let store = Arc::new(MemoryCacheStore::new());
    let network = FakeNetwork::new();
    network.route_core_files();
    // Third of the seven manifest entries
    network.take_down("/manifest.json");
    let sw = worker("1.0.0", &store, &network);

    assert!(sw.handle(Event::Install).await.is_err());
    assert_eq!(sw.state(), WorkerState::Redundant);
    assert!(store.entries("ecoexpedicoes-static-v1.0.0").await.unwrap().is_empty());
    assert!(store.partitions().await.unwrap().is_empty());
}

#[tokio::test]
async fn install_fails_on_error_status() {
    let store = Arc::new(MemoryCacheStore::new());
    let network = FakeNetwork::new();
    network.route_core_files();
    network.route("/icon-512x512.png", Response::new(404, "missing"));
    let sw = worker("1.0.0", &store, &network);

    let err = sw.install().await.unwrap_err();
    assert!(format!("{:#}", err).contains("404"));
    assert!(store.partitions().await.unwrap().is_empty());
}

#[tokio::test]
async fn install_is_not_retried() {
    let store = Arc::new(MemoryCacheStore::new());
    let network = FakeNetwork::new();
    network.set_offline(true);
    let sw = worker("1.0.0", &store, &network);

    assert!(sw.install().await.is_err());
    network.set_offline(false);
    network.route_core_files();
    assert!(sw.install().await.is_err());
    assert!(sw.activate().await.is_err());
}

#[tokio::test]
async fn activation_removes_previous_version() {
    let store = Arc::new(MemoryCacheStore::new());
    let network = FakeNetwork::new();
    network.route_core_files();
    network.route("/api/attractions", Response::new(200, "[]"));
    network.route("/images/gruta.jpg", Response::new(200, "jpg"));

    let v1 = worker("1", &store, &network);
    v1.install().await.unwrap();
    v1.activate().await.unwrap();
    v1.fetch(&get("/api/attractions")).await.unwrap();
    v1.fetch(&get("/images/gruta.jpg")).await.unwrap();
    v1.settle().await;
    assert_eq!(
        store.partitions().await.unwrap(),
        vec!["ecoexpedicoes-api-v1", "ecoexpedicoes-images-v1", "ecoexpedicoes-static-v1"]
    );

    let v2 = worker("2", &store, &network);
    v2.install().await.unwrap();
    let outcome = v2.handle(Event::Activate).await.unwrap();

    let mut deleted = match outcome {
        Outcome::Activated { deleted } => deleted,
        other => panic!("unexpected outcome: {other:?}"),
    };
    deleted.sort();
    assert_eq!(
        deleted,
        vec!["ecoexpedicoes-api-v1", "ecoexpedicoes-images-v1", "ecoexpedicoes-static-v1"]
    );
    assert_eq!(store.partitions().await.unwrap(), vec!["ecoexpedicoes-static-v2"]);
    assert!(store.entries("ecoexpedicoes-static-v1").await.unwrap().is_empty());
    assert_eq!(v2.state(), WorkerState::Activated);
}

#[tokio::test]
async fn activation_keeps_unused_app_partition_of_current_version() {
    let store = Arc::new(MemoryCacheStore::new());
    let network = FakeNetwork::new();
    let sw = worker("1", &store, &network);
    store
        .put("ecoexpedicoes-v1", get("/").id(), Response::new(200, "x"))
        .await
        .unwrap();
    store.put("legacy-cache", get("/").id(), Response::new(200, "x")).await.unwrap();

    let deleted = sw.activate().await.unwrap();
    assert_eq!(deleted, vec!["legacy-cache"]);
    assert_eq!(store.partitions().await.unwrap(), vec!["ecoexpedicoes-v1"]);
}

#[tokio::test]
async fn registration_upgrade_replaces_active_worker() {
    let store = Arc::new(MemoryCacheStore::new());
    let network = FakeNetwork::new();
    network.route_core_files();

    let mut registration = Registration::new();
    assert!(registration.handle(Event::Install).await.is_err());

    registration.update(worker("1", &store, &network)).await.unwrap();
    let v1 = Arc::clone(registration.active().unwrap());
    assert_eq!(v1.state(), WorkerState::Activated);

    let deleted = registration.update(worker("2", &store, &network)).await.unwrap();
    assert_eq!(deleted, vec!["ecoexpedicoes-static-v1"]);
    assert_eq!(v1.state(), WorkerState::Redundant);
    assert_eq!(registration.active().unwrap().version(), "2");
}

#[tokio::test]
async fn failed_upgrade_keeps_old_worker_serving() {
    let store = Arc::new(MemoryCacheStore::new());
    let network = FakeNetwork::new();
    network.route_core_files();

    let mut registration = Registration::new();
    registration.update(worker("1", &store, &network)).await.unwrap();

    network.take_down("/static/js/main.js");
    let err = registration.update(worker("2", &store, &network)).await.unwrap_err();
    assert!(format!("{:#}", err).contains("version 2"));

    let active = registration.active().unwrap();
    assert_eq!(active.version(), "1");
    assert_eq!(active.state(), WorkerState::Activated);
    assert_eq!(store.partitions().await.unwrap(), vec!["ecoexpedicoes-static-v1"]);

    // The old shell still answers offline navigations
    network.set_offline(true);
    let served = registration.fetch(&get("/roteiros")).await.unwrap();
    assert_eq!(served.source, ResponseSource::Cache);
    assert_eq!(served.response.text(), "core:/");
}

#[tokio::test]
async fn upgrade_waits_for_pending_writes_of_old_worker() {
    let store = Arc::new(MemoryCacheStore::new());
    let network = FakeNetwork::new();
    network.route_core_files();
    network.route("/api/attractions", Response::new(200, "[]"));

    let mut registration = Registration::new();
    registration.update(worker("1", &store, &network)).await.unwrap();
    // Leaves a detached write into the v1 API partition
    registration.fetch(&get("/api/attractions")).await.unwrap();

    registration.update(worker("2", &store, &network)).await.unwrap();

    assert_eq!(store.partitions().await.unwrap(), vec!["ecoexpedicoes-static-v2"]);
}
