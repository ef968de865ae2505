//! Step-delimiter detection for procedural text.

use std::sync::LazyLock;

use regex::Regex;

/// `Step 3`, or a line starting with `1.`, `2)` or `(3)`
static STEP_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)\bstep\s*(\d{1,3})\b|^[ \t]*\(?(\d{1,2})[.)][ \t]+")
        .expect("step marker pattern compiles")
});

/// Step boundaries found in a text, in offset order
#[derive(Debug, Clone, Default)]
pub struct StepIndex {
    boundaries: Vec<(usize, u32)>,
}

impl StepIndex {
    /// Scan a text for step markers
    pub fn detect(text: &str) -> Self {
        let boundaries = STEP_MARKER
            .captures_iter(text)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let number = caps.get(1).or_else(|| caps.get(2))?;
                let step = number.as_str().parse().ok()?;
                Some((whole.start(), step))
            })
            .collect();

        Self { boundaries }
    }

    /// Whether the text reads as a numbered procedure
    pub fn is_procedural(&self) -> bool {
        !self.boundaries.is_empty()
    }

    /// Step that contains the given byte offset (None before the first marker)
    pub fn step_at(&self, offset: usize) -> Option<u32> {
        self.boundaries
            .iter()
            .take_while(|(start, _)| *start <= offset)
            .last()
            .map(|(_, step)| *step)
    }
}
