use std::collections::HashMap;

/// Keeps track of how many layers have been named after each prefix.
///
/// The counters are owned by the caller, two models built with different `LayerCounters`
/// number their layers independently.
#[derive(Debug, Default, Clone)]
pub struct LayerCounters {
    counters: HashMap<String, usize>,
}

impl LayerCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next unique name for `layer_name`, that is, `{layer_name}_{n}` where `n` is
    /// the amount of names already handed out for that prefix.
    pub fn next_name(&mut self, layer_name: &str) -> String {
        let counter = self.counters.entry(layer_name.to_string()).or_default();
        let name = format!("{layer_name}_{counter}");
        *counter += 1;
        name
    }

    /// The amount of names handed out for `layer_name`.
    pub fn count(&self, layer_name: &str) -> usize {
        self.counters.get(layer_name).copied().unwrap_or_default()
    }
}

/// Utility for keeping track of layer names.
pub fn get_name(layer_name: &str, counters: &mut LayerCounters) -> String {
    counters.next_name(layer_name)
}
