use serde::Serialize;

/// Structured trace events emitted by the device library crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    RegistersDiscovered {
        node_id: u16,
        count: usize,
        duration_ms: u64,
    },
    RegisterApiMissing {
        node_id: u16,
        index: u16,
    },
    RegisterAccessFailed {
        node_id: u16,
        register: String,
        attempts: u32,
        write: bool,
    },
    RegisterWritten {
        node_id: u16,
        register: String,
        success: bool,
    },
    RemoteRepointed {
        old_node_id: Option<u16>,
        new_node_id: Option<u16>,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "cyd_event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_tagged() {
        let ev = TraceEvent::RegisterWritten {
            node_id: 5,
            register: "navlight.brightness".into(),
            success: true,
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["event"], "RegisterWritten");
        assert_eq!(json["node_id"], 5);
        assert_eq!(json["success"], true);
    }

    #[test]
    fn repoint_event_serializes_none() {
        let ev = TraceEvent::RemoteRepointed {
            old_node_id: None,
            new_node_id: Some(7),
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert!(json["old_node_id"].is_null());
        assert_eq!(json["new_node_id"], 7);
    }
}
