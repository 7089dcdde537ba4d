//! JSON codec for queue payloads.
//!
//! Both payloads are positional JSON arrays:
//!
//! ```text
//! tasks:  ["<task_id>", "<cmdline>"]
//! status: ["<address>", "<task_id>" | null, <ram_pct>, <cpu_pct>]
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{StateError, StateResult};
use crate::types::{StatusSignal, TaskMessage};

#[derive(Serialize, Deserialize)]
struct StatusWire(String, Option<String>, f64, f64);

#[derive(Serialize, Deserialize)]
struct TaskWire(String, String);

/// Decode a `status` queue payload.
pub fn decode_status(body: &[u8]) -> StateResult<StatusSignal> {
    let StatusWire(address, task_id, ram_pct, cpu_pct) =
        serde_json::from_slice(body).map_err(|e| StateError::malformed("status", e.to_string()))?;

    if address.trim().is_empty() {
        return Err(StateError::malformed("status", "empty node address"));
    }

    Ok(StatusSignal {
        address,
        task_id,
        ram_pct,
        cpu_pct,
    })
}

/// Encode a status signal for the `status` queue.
pub fn encode_status(signal: &StatusSignal) -> StateResult<Vec<u8>> {
    let wire = StatusWire(
        signal.address.clone(),
        signal.task_id.clone(),
        signal.ram_pct,
        signal.cpu_pct,
    );
    serde_json::to_vec(&wire).map_err(|e| StateError::Serialize(e.to_string()))
}

/// Decode a `tasks` queue payload.
pub fn decode_task(body: &[u8]) -> StateResult<TaskMessage> {
    let TaskWire(task_id, cmdline) =
        serde_json::from_slice(body).map_err(|e| StateError::malformed("task", e.to_string()))?;

    if task_id.is_empty() {
        return Err(StateError::malformed("task", "empty task id"));
    }

    Ok(TaskMessage { task_id, cmdline })
}

/// Encode a task for the `tasks` queue.
pub fn encode_task(task: &TaskMessage) -> StateResult<Vec<u8>> {
    let wire = TaskWire(task.task_id.clone(), task.cmdline.clone());
    serde_json::to_vec(&wire).map_err(|e| StateError::Serialize(e.to_string()))
}
