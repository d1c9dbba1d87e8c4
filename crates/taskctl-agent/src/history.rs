//! Conversation history: an ordered transcript of rendered turn blocks kept
//! per agent, with a size-bound truncation policy that drops the oldest
//! turns once the estimate exceeds a budget — while always preserving the
//! first entry, which carries the task/system framing every later turn
//! refers back to. The token estimate itself (characters / 4) is the same
//! rough heuristic a context window budget is usually worked out with.

const CHARS_PER_TOKEN: f32 = 4.0;

struct TranscriptEntry {
    rendered: String,
}

pub struct History {
    entries: Vec<TranscriptEntry>,
}

impl History {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn push(&mut self, rendered: String) {
        self.entries.push(TranscriptEntry { rendered });
    }

    pub fn render(&self) -> String {
        self.entries.iter().map(|e| e.rendered.as_str()).collect::<Vec<_>>().join("\n\n")
    }

    fn estimate_tokens(&self) -> usize {
        let chars: usize = self.entries.iter().map(|e| e.rendered.len()).sum();
        (chars as f32 / CHARS_PER_TOKEN).ceil() as usize
    }

    /// Drops the oldest turn after the first (never the first) until the
    /// estimate fits, or only the first turn remains.
    pub fn truncate_to_budget(&mut self, max_tokens: usize) {
        while self.entries.len() > 1 && self.estimate_tokens() > max_tokens {
            self.entries.remove(1);
        }
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_preserves_first_entry() {
        let mut history = History::new();
        history.push("first turn, kept forever".to_string());
        for i in 0..50 {
            history.push(format!("turn {i}: {}", "x".repeat(200)));
        }
        history.truncate_to_budget(100);
        assert!(history.render().starts_with("first turn, kept forever"));
        assert!(history.entries.len() < 51);
    }

    #[test]
    fn under_budget_keeps_everything() {
        let mut history = History::new();
        history.push("a".to_string());
        history.push("b".to_string());
        history.truncate_to_budget(10_000);
        assert_eq!(history.entries.len(), 2);
    }
}
