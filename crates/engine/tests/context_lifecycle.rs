//! Integration tests for the session lifecycle: creation, block appends
//! and merges, clears, the health summary, and durability across engine
//! instances.

mod common;

use assert_matches::assert_matches;
use serde_json::json;

use storyloom_core::{BlockType, CoreError};
use storyloom_engine::EngineError;

use common::{engine_at, test_engine};

// ---------------------------------------------------------------------------
// Test: get_or_create persists a zero-state session and is idempotent
// ---------------------------------------------------------------------------

#[tokio::test]
async fn get_or_create_persists_a_zero_state_session() {
    let (engine, _dir) = test_engine();

    let session = engine.get_or_create("sess_1").await.unwrap();
    assert_eq!(session.version, 0);
    assert!(session.blocks.is_empty());
    assert_eq!(session.meta.background_v, 0);
    assert_eq!(session.meta.characters_v, 0);

    // A second call loads the stored record instead of resetting it.
    engine
        .append_block("sess_1", BlockType::Background, json!({"premise": "moor"}))
        .await
        .unwrap();
    let again = engine.get_or_create("sess_1").await.unwrap();
    assert_eq!(again.version, 1);
    assert!(again.has_block(BlockType::Background));
}

// ---------------------------------------------------------------------------
// Test: get never creates
// ---------------------------------------------------------------------------

#[tokio::test]
async fn get_does_not_create() {
    let (engine, _dir) = test_engine();

    assert!(engine.get("sess_1").await.unwrap().is_none());

    engine.get_or_create("sess_1").await.unwrap();
    assert!(engine.get("sess_1").await.unwrap().is_some());
}

// ---------------------------------------------------------------------------
// Test: appends follow each block type's merge semantics
// ---------------------------------------------------------------------------

#[tokio::test]
async fn appends_follow_per_block_merge_semantics() {
    let (engine, _dir) = test_engine();

    // Narrative blocks replace wholesale.
    engine
        .append_block(
            "sess_1",
            BlockType::Background,
            json!({"premise": "moor", "era": "victorian"}),
        )
        .await
        .unwrap();
    let session = engine
        .append_block("sess_1", BlockType::Background, json!({"premise": "coast"}))
        .await
        .unwrap();
    assert_eq!(session.blocks["background"], json!({"premise": "coast"}));

    // Hook lists extend.
    engine
        .append_block("sess_1", BlockType::PlayerHooks, json!(["the letter"]))
        .await
        .unwrap();
    let session = engine
        .append_block("sess_1", BlockType::PlayerHooks, json!(["the debt"]))
        .await
        .unwrap();
    assert_eq!(
        session.blocks["player_hooks"],
        json!(["the letter", "the debt"])
    );

    // World seeds union per list.
    engine
        .append_block(
            "sess_1",
            BlockType::WorldSeeds,
            json!({"locations": ["the manor"]}),
        )
        .await
        .unwrap();
    let session = engine
        .append_block(
            "sess_1",
            BlockType::WorldSeeds,
            json!({"locations": ["the moor"], "factions": ["the family"]}),
        )
        .await
        .unwrap();
    assert_eq!(
        session.blocks["world_seeds"]["locations"],
        json!(["the manor", "the moor"])
    );
    assert_eq!(session.blocks["world_seeds"]["factions"], json!(["the family"]));

    assert_eq!(session.version, 6);
}

// ---------------------------------------------------------------------------
// Test: appends never move the ledger
// ---------------------------------------------------------------------------

#[tokio::test]
async fn appends_never_move_the_ledger() {
    let (engine, _dir) = test_engine();

    engine
        .append_block("sess_1", BlockType::Background, json!({"premise": "moor"}))
        .await
        .unwrap();
    let session = engine
        .append_block("sess_1", BlockType::StoryFacts, json!(["a fact"]))
        .await
        .unwrap();

    assert_eq!(session.meta.background_v, 0);
    assert_eq!(session.meta.characters_v, 0);
    assert_eq!(session.version, 2);
}

// ---------------------------------------------------------------------------
// Test: world_state refuses direct appends
// ---------------------------------------------------------------------------

#[tokio::test]
async fn world_state_refuses_direct_appends() {
    let (engine, _dir) = test_engine();

    let err = engine
        .append_block("sess_1", BlockType::WorldState, json!({"gate": "open"}))
        .await
        .unwrap_err();
    assert_matches!(err, EngineError::Core(CoreError::InvalidBlockType(_)));

    // The refused call created nothing.
    assert!(engine.get("sess_1").await.unwrap().is_none());
}

// ---------------------------------------------------------------------------
// Test: a locked block refuses appends until unlocked
// ---------------------------------------------------------------------------

#[tokio::test]
async fn locked_blocks_refuse_appends() {
    let (engine, _dir) = test_engine();

    engine
        .append_block("sess_1", BlockType::Background, json!({"premise": "moor"}))
        .await
        .unwrap();
    engine
        .lock_block("sess_1", BlockType::Background, true)
        .await
        .unwrap();

    let err = engine
        .append_block("sess_1", BlockType::Background, json!({"premise": "coast"}))
        .await
        .unwrap_err();
    assert_matches!(
        err,
        EngineError::Core(CoreError::AlreadyLocked { id, .. }) if id == "background"
    );

    engine
        .lock_block("sess_1", BlockType::Background, false)
        .await
        .unwrap();
    let session = engine
        .append_block("sess_1", BlockType::Background, json!({"premise": "coast"}))
        .await
        .unwrap();
    assert_eq!(session.blocks["background"]["premise"], "coast");
}

// ---------------------------------------------------------------------------
// Test: clear drops blocks but keeps locks, ledger, and chains
// ---------------------------------------------------------------------------

#[tokio::test]
async fn clear_drops_blocks_but_keeps_locks_and_ledger() {
    let (engine, _dir) = test_engine();
    common::gated_session(&engine, "sess_1").await;

    let cleared = engine.clear_blocks("sess_1").await.unwrap();
    assert!(cleared.blocks.is_empty());
    assert_eq!(cleared.version, 0);
    assert!(cleared.block_locked(BlockType::Background));
    assert!(cleared.block_locked(BlockType::Characters));
    assert_eq!(cleared.meta.background_v, 1);
    assert_eq!(cleared.meta.characters_v, 1);
}

// ---------------------------------------------------------------------------
// Test: health reports existence, counts, and the lock summary
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_reports_existence_and_lock_summary() {
    let (engine, _dir) = test_engine();

    let absent = engine.health("sess_1").await.unwrap();
    assert!(!absent.exists);
    assert_eq!(absent.version, 0);
    assert!(absent.created_at.is_none());

    common::gated_session(&engine, "sess_1").await;
    let report = engine.health("sess_1").await.unwrap();
    assert!(report.exists);
    assert!(report.has_background);
    assert!(report.has_characters);
    assert_eq!(report.block_count, 2);
    assert_eq!(report.chain_count, 0);
    assert_eq!(report.scene_detail_count, 0);
    assert_eq!(report.locks["background"], true);
    assert_eq!(report.locks["characters"], true);
    assert!(report.created_at.is_some());
}

// ---------------------------------------------------------------------------
// Test: saved sessions survive a fresh engine over the same directory
// ---------------------------------------------------------------------------

#[tokio::test]
async fn saved_sessions_survive_a_new_engine_over_the_same_directory() {
    let (engine, dir) = test_engine();
    common::gated_session(&engine, "sess_1").await;

    let reopened = engine_at(&dir);
    let session = reopened.get("sess_1").await.unwrap().unwrap();
    assert_eq!(session.meta.background_v, 1);
    assert_eq!(session.meta.characters_v, 1);
    assert!(session.block_locked(BlockType::Characters));
    assert_eq!(session.blocks["background"]["premise"], "a manor on the moor");
}
