use std::collections::HashMap;

/// Event priority levels (executed in order: Lowest first, Monitor last).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    Lowest = 0,
    Low = 1,
    Normal = 2,
    High = 3,
    Highest = 4,
    Monitor = 5,
}

impl Priority {
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "LOWEST" => Priority::Lowest,
            "LOW" => Priority::Low,
            "NORMAL" => Priority::Normal,
            "HIGH" => Priority::High,
            "HIGHEST" => Priority::Highest,
            "MONITOR" => Priority::Monitor,
            _ => Priority::Normal,
        }
    }
}

/// Result of handling an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResult {
    Continue,
    Cancel,
}

/// A registered listener with metadata (the actual callback lives in the Lua registry).
#[derive(Debug, Clone)]
pub struct ListenerEntry {
    pub script_id: String,
    pub priority: Priority,
    /// Unique ID for this listener, used to retrieve the Lua callback.
    pub listener_id: u64,
}

/// The event bus: maps event names to sorted listener lists. Backs both the
/// scripted-behavior bridge's per-entity hooks and room-lifecycle broadcasts.
pub struct EventBus {
    listeners: HashMap<String, Vec<ListenerEntry>>,
    next_listener_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: HashMap::new(),
            next_listener_id: 1,
        }
    }

    /// Register a listener for an event. Returns the listener_id.
    pub fn register(&mut self, event_name: &str, script_id: &str, priority: Priority) -> u64 {
        let listener_id = self.next_listener_id;
        self.next_listener_id += 1;

        let entry = ListenerEntry {
            script_id: script_id.to_string(),
            priority,
            listener_id,
        };

        let list = self.listeners.entry(event_name.to_string()).or_default();
        list.push(entry);
        list.sort_by_key(|e| e.priority);

        listener_id
    }

    /// Removes a previously registered listener, e.g. when its script is unloaded.
    pub fn unregister(&mut self, event_name: &str, listener_id: u64) {
        if let Some(list) = self.listeners.get_mut(event_name) {
            list.retain(|e| e.listener_id != listener_id);
        }
    }

    /// Get all listeners for an event, sorted by priority.
    pub fn get_listeners(&self, event_name: &str) -> &[ListenerEntry] {
        self.listeners
            .get(event_name)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Get the number of registered events.
    pub fn event_count(&self) -> usize {
        self.listeners.len()
    }

    /// Get total listener count across all events.
    pub fn listener_count(&self) -> usize {
        self.listeners.values().map(|v| v.len()).sum()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
