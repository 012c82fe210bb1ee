//! Enriched view of a single knowledge point.

use kpoint_core::KnowledgePoint;
use serde::Serialize;

const ANALOGIES: [&str; 5] = [
    "This is like building a mental bridge between concepts.",
    "Imagine this as planting seeds of knowledge that will grow into a forest of understanding.",
    "Think of this as collecting puzzle pieces that form a complete picture.",
    "This concept works like a compass that guides your thinking.",
    "It's similar to creating a map for navigating complex ideas.",
];

const INSIGHTS: [&str; 5] = [
    "Consider how this knowledge connects to your existing understanding.",
    "Reflect on how this idea might challenge or confirm your assumptions.",
    "Think about applying this concept in different contexts.",
    "Explore how this knowledge might evolve or change over time.",
    "Question the boundaries and limitations of this concept.",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PointDetail {
    pub point: KnowledgePoint,
    pub analogy: &'static str,
    pub insight: &'static str,
}

impl PointDetail {
    /// Analogy and insight are picked from the content length (UTF-16 units,
    /// matching what the browser build computed).
    pub fn new(point: KnowledgePoint) -> Self {
        let len = point.content.encode_utf16().count();
        Self {
            analogy: ANALOGIES[len % ANALOGIES.len()],
            insight: INSIGHTS[(len * 2) % INSIGHTS.len()],
            point,
        }
    }
}
