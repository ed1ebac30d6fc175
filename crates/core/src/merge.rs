//! Per-block merge rules for appended payloads.
//!
//! Each block type has its own idea of what "append" means: narrative
//! snapshots replace, hook and fact lists extend, seed components and
//! style `doNots` concatenate, free-form maps overlay shallowly.

use crate::block::BlockType;
use crate::context::SessionContext;
use crate::scene::ContextOut;

/// Merge an incoming payload into whatever the block currently holds.
///
/// `existing` is the stored payload, if any. Returns the new payload for
/// the block; the caller stores it and stamps the session.
pub fn merge_block_data(
    existing: Option<&serde_json::Value>,
    incoming: serde_json::Value,
    kind: BlockType,
) -> serde_json::Value {
    match kind {
        // Narrative snapshots: the latest payload wins wholesale.
        BlockType::Blueprint
        | BlockType::Background
        | BlockType::StoryConcept
        | BlockType::Characters => incoming,
        // Running lists: keep what is there, add what arrived.
        BlockType::PlayerHooks | BlockType::StoryFacts => appended(existing, incoming),
        BlockType::WorldSeeds => merged_world_seeds(existing, &incoming),
        BlockType::StylePrefs => merged_style_prefs(existing, incoming),
        // Free-form maps: shallow overlay, incoming keys overwrite.
        BlockType::Custom | BlockType::WorldState => overlaid(existing, incoming),
    }
}

/// Fold a locked scene's `contextOut` into the session's shared blocks.
///
/// Facts append, world-state keys overwrite, seed components concatenate.
/// Components the scene did not emit leave their blocks untouched, and
/// character moments stay on the scene record itself.
pub fn accumulate_context_out(session: &mut SessionContext, out: &ContextOut) {
    if !out.story_facts.is_empty() {
        let merged = appended(
            session.blocks.get(BlockType::StoryFacts.as_str()),
            serde_json::Value::Array(out.story_facts.clone()),
        );
        session
            .blocks
            .insert(BlockType::StoryFacts.as_str().to_string(), merged);
    }
    if !out.world_state.is_empty() {
        let merged = overlaid(
            session.blocks.get(BlockType::WorldState.as_str()),
            serde_json::Value::Object(out.world_state.clone()),
        );
        session
            .blocks
            .insert(BlockType::WorldState.as_str().to_string(), merged);
    }
    if !out.world_seeds.is_empty() {
        let incoming = serde_json::json!({
            "factions": out.world_seeds.factions,
            "locations": out.world_seeds.locations,
            "constraints": out.world_seeds.constraints,
        });
        let merged = merged_world_seeds(
            session.blocks.get(BlockType::WorldSeeds.as_str()),
            &incoming,
        );
        session
            .blocks
            .insert(BlockType::WorldSeeds.as_str().to_string(), merged);
    }
}

// ---------------------------------------------------------------------------
// Merge primitives
// ---------------------------------------------------------------------------

/// List append. A non-list existing payload is restarted as an empty list;
/// a scalar incoming payload is pushed as a single element.
fn appended(
    existing: Option<&serde_json::Value>,
    incoming: serde_json::Value,
) -> serde_json::Value {
    let mut items = match existing {
        Some(serde_json::Value::Array(items)) => items.clone(),
        _ => Vec::new(),
    };
    match incoming {
        serde_json::Value::Array(new_items) => items.extend(new_items),
        other => items.push(other),
    }
    serde_json::Value::Array(items)
}

/// Seed merge: the result carries exactly the three seed components, each
/// the concatenation of the existing and incoming lists.
fn merged_world_seeds(
    existing: Option<&serde_json::Value>,
    incoming: &serde_json::Value,
) -> serde_json::Value {
    let mut out = serde_json::Map::new();
    for key in ["factions", "locations", "constraints"] {
        let mut items = component(existing, key);
        items.extend(component(Some(incoming), key));
        out.insert(key.to_string(), serde_json::Value::Array(items));
    }
    serde_json::Value::Object(out)
}

fn component(value: Option<&serde_json::Value>, key: &str) -> Vec<serde_json::Value> {
    value
        .and_then(|v| v.get(key))
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default()
}

/// Style merge: shallow overlay, except `doNots` which concatenates.
fn merged_style_prefs(
    existing: Option<&serde_json::Value>,
    incoming: serde_json::Value,
) -> serde_json::Value {
    let incoming_map = match incoming {
        serde_json::Value::Object(map) => map,
        other => return other,
    };
    let mut merged = match existing {
        Some(serde_json::Value::Object(map)) => map.clone(),
        _ => serde_json::Map::new(),
    };
    let mut do_nots = component(existing, "doNots");
    do_nots.extend(component_of(&incoming_map, "doNots"));
    for (key, value) in incoming_map {
        merged.insert(key, value);
    }
    merged.insert("doNots".to_string(), serde_json::Value::Array(do_nots));
    serde_json::Value::Object(merged)
}

fn component_of(map: &serde_json::Map<String, serde_json::Value>, key: &str) -> Vec<serde_json::Value> {
    map.get(key)
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default()
}

/// Shallow overlay of two objects. Anything that is not a pair of objects
/// degrades to replacement.
fn overlaid(
    existing: Option<&serde_json::Value>,
    incoming: serde_json::Value,
) -> serde_json::Value {
    match (existing, incoming) {
        (Some(serde_json::Value::Object(base)), serde_json::Value::Object(new_map)) => {
            let mut merged = base.clone();
            for (key, value) in new_map {
                merged.insert(key, value);
            }
            serde_json::Value::Object(merged)
        }
        (_, incoming) => incoming,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
