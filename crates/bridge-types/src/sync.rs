//! Sync payload carried across workflow steps: an open mapping of scalars
//! and arrays extracted from a `sync_status` tool result.

use serde_json::Value;
use std::collections::BTreeMap;

pub type SyncPayload = BTreeMap<String, Value>;

/// Parse a `sync_status`-shaped result into the shared sync payload,
/// keeping only scalar and array values (objects are dropped — the `when`
/// clauses only ever compare scalars).
pub fn parse_sync_payload(value: &Value) -> SyncPayload {
    let mut out = SyncPayload::new();
    if let Some(obj) = value.as_object() {
        for (k, v) in obj {
            if v.is_object() {
                continue;
            }
            out.insert(k.clone(), v.clone());
        }
    }
    out
}
