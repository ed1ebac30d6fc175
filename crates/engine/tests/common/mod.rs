//! Shared fixtures for the engine integration tests.

#![allow(dead_code)] // not every test binary uses every helper

use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;

use storyloom_core::{BlockType, ContextOut, MacroScene};
use storyloom_engine::Engine;
use storyloom_store::{FileSessionStore, StoreConfig};

/// Engine over a throwaway data directory. Keep the `TempDir` alive for
/// the duration of the test; dropping it deletes the data files.
pub fn test_engine() -> (Engine, TempDir) {
    let dir = TempDir::new().expect("temp data dir");
    let engine = engine_at(&dir);
    (engine, dir)
}

/// A second engine over the same directory, for durability checks.
pub fn engine_at(dir: &TempDir) -> Engine {
    let store = FileSessionStore::new(&StoreConfig::at(dir.path()));
    Engine::new(Arc::new(store))
}

pub fn slot(id: &str, order: u32) -> MacroScene {
    MacroScene {
        id: id.to_string(),
        order,
        title: format!("Scene {order}"),
        objective: format!("Objective {order}"),
    }
}

/// A minimal narrative payload, as the generation collaborator would
/// hand it over.
pub fn narrative(prose: &str) -> serde_json::Map<String, serde_json::Value> {
    let mut map = serde_json::Map::new();
    map.insert("epicIntro".to_string(), json!(prose));
    map
}

/// A `ContextOut` contributing one story fact.
pub fn fact_out(fact: &str) -> ContextOut {
    let mut out = ContextOut::default();
    out.story_facts.push(json!(fact));
    out
}

/// Drive a session to the fully gated state: background and characters
/// appended and locked. Leaves the ledger at background v1, characters v1.
pub async fn gated_session(engine: &Engine, session_id: &str) {
    engine
        .append_block(
            session_id,
            BlockType::Background,
            json!({"premise": "a manor on the moor", "numberOfPlayers": 4}),
        )
        .await
        .expect("append background");
    engine
        .lock_block(session_id, BlockType::Background, true)
        .await
        .expect("lock background");
    engine
        .record_characters(session_id, vec![json!({"name": "Mira", "class": "Bard"})])
        .await
        .expect("record characters");
    engine
        .lock_block(session_id, BlockType::Characters, true)
        .await
        .expect("lock characters");
}

/// Gated session plus a locked chain with slots `sc_1..=sc_N`. Returns
/// the minted chain id.
pub async fn locked_chain_session(engine: &Engine, session_id: &str, count: u32) -> String {
    gated_session(engine, session_id).await;
    let scenes: Vec<MacroScene> = (1..=count).map(|n| slot(&format!("sc_{n}"), n)).collect();
    let recorded = engine
        .record_chain(session_id, None, scenes, None)
        .await
        .expect("record chain");
    engine
        .lock_chain(session_id, &recorded.chain.chain_id, true)
        .await
        .expect("lock chain");
    recorded.chain.chain_id
}

/// Record and lock details for `sc_1..=sc_N`, in order.
pub async fn lock_details_through(engine: &Engine, session_id: &str, count: u32) {
    for n in 1..=count {
        let scene_id = format!("sc_{n}");
        engine
            .record_scene_detail(
                session_id,
                &scene_id,
                narrative("rain on the windows"),
                fact_out(&format!("fact {n}")),
            )
            .await
            .expect("record detail");
        engine
            .lock_scene(session_id, &scene_id, true)
            .await
            .expect("lock scene");
    }
}
