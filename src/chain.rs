//! Ordered first-success-wins fallback chains.
//!
//! Several parts of the pipeline resolve a value by trying a fixed list of
//! strategies (date formats, channel reference shapes, transcript tracks).
//! [`Chain`] names each step so logs show which one produced the result.

use tracing::trace;

type Step<'a, I, O> = Box<dyn Fn(&I) -> Option<O> + 'a>;

/// A list of named steps tried in order; the first `Some` wins.
pub struct Chain<'a, I: ?Sized, O> {
    name: &'static str,
    steps: Vec<(&'static str, Step<'a, I, O>)>,
}

impl<'a, I: ?Sized, O> Chain<'a, I, O> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            steps: Vec::new(),
        }
    }

    /// Append a step. Steps run in the order they were added.
    pub fn then(mut self, step: &'static str, f: impl Fn(&I) -> Option<O> + 'a) -> Self {
        self.steps.push((step, Box::new(f)));
        self
    }

    /// Run the steps against `input`, returning the first success.
    pub fn run(&self, input: &I) -> Option<O> {
        for (step, f) in &self.steps {
            if let Some(out) = f(input) {
                trace!(chain = self.name, step, "Chain step succeeded");
                return Some(out);
            }
        }
        trace!(chain = self.name, "Chain exhausted");
        None
    }
}
