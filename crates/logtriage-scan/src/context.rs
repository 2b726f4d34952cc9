//! Context extraction
//!
//! Every hit on line `n` gets the lines `[n - W, n + W]`, clamped to the
//! lines that exist, joined with `\n`. The extractor keeps the last `W`
//! lines and holds hits back until `W` further lines have been seen or the
//! input ends, so memory stays bounded by the window, not the input.

use crate::scanner::RawHit;
use std::collections::VecDeque;

/// A hit with its context window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextualHit {
    pub hit: RawHit,
    pub context: String,
}

/// Hits of one line waiting for their trailing context.
#[derive(Debug)]
struct PendingLine {
    hits: Vec<RawHit>,
    lines: Vec<String>,
    remaining: usize,
}

impl PendingLine {
    fn complete(self) -> impl Iterator<Item = ContextualHit> {
        let context = self.lines.join("\n");
        self.hits.into_iter().map(move |hit| ContextualHit {
            hit,
            context: context.clone(),
        })
    }
}

#[derive(Debug)]
pub struct ContextExtractor {
    window: usize,
    trailing: VecDeque<String>,
    pending: VecDeque<PendingLine>,
}

impl ContextExtractor {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            trailing: VecDeque::with_capacity(window),
            pending: VecDeque::new(),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Feed the next line and its hits; returns the hits whose window is now complete.
    ///
    /// Lines must be fed in order, including lines without hits.
    pub fn push_line(&mut self, text: &str, hits: Vec<RawHit>) -> Vec<ContextualHit> {
        for pending in &mut self.pending {
            pending.lines.push(text.to_string());
            pending.remaining -= 1;
        }

        if !hits.is_empty() {
            let mut lines: Vec<String> = self.trailing.iter().cloned().collect();
            lines.push(text.to_string());
            self.pending.push_back(PendingLine {
                hits,
                lines,
                remaining: self.window,
            });
        }

        if self.window > 0 {
            if self.trailing.len() == self.window {
                self.trailing.pop_front();
            }
            self.trailing.push_back(text.to_string());
        }

        let mut done = Vec::new();
        while self
            .pending
            .front()
            .is_some_and(|pending| pending.remaining == 0)
        {
            if let Some(pending) = self.pending.pop_front() {
                done.extend(pending.complete());
            }
        }
        done
    }

    /// End of input: release every held hit with the lines seen so far.
    pub fn finish(&mut self) -> Vec<ContextualHit> {
        self.trailing.clear();
        self.pending.drain(..).flat_map(PendingLine::complete).collect()
    }
}
