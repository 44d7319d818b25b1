use crate::{AlderSend, AlderSync, ErrorKind, Ptr, Result, Value, make_ptr, runtime_error};
use log::trace;

/// A callback that's invoked after each successful evaluation or invocation
///
/// See [ContextSettings::post_eval_callback].
pub trait PostEvalCallback: Fn(&Value) -> Result<()> + AlderSend + AlderSync + 'static {}

impl<T> PostEvalCallback for T where T: Fn(&Value) -> Result<()> + AlderSend + AlderSync + 'static {}

/// The settings used to initialize a [Context]
#[derive(Clone)]
pub struct ContextSettings {
    /// The maximum depth of nested evaluations and invocations
    ///
    /// Exceeding the limit results in an error, which guards against unbounded recursion, e.g.
    /// a method that calls itself.
    ///
    /// Default: 256
    pub max_call_depth: usize,

    /// An optional callback that's invoked with the result of each successful member evaluation,
    /// invocation, and construction
    ///
    /// An error returned from the callback is propagated to the caller.
    ///
    /// Default: `None`
    pub post_eval_callback: Option<Ptr<dyn PostEvalCallback>>,
}

impl ContextSettings {
    /// Sets the post-evaluation callback
    #[must_use]
    pub fn with_post_eval_callback(mut self, callback: impl PostEvalCallback) -> Self {
        self.post_eval_callback = Some(make_ptr!(callback));
        self
    }
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            max_call_depth: 256,
            post_eval_callback: None,
        }
    }
}

/// The execution context that's passed through each evaluation and invocation
///
/// The context sequences nested evaluations, and applies post-evaluation bookkeeping via the
/// optional [PostEvalCallback].
#[derive(Default)]
pub struct Context {
    settings: ContextSettings,
    depth: usize,
}

impl Context {
    /// Makes a context with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes a context with the given settings
    pub fn with_settings(settings: ContextSettings) -> Self {
        Self { settings, depth: 0 }
    }

    /// The context's settings
    pub fn settings(&self) -> &ContextSettings {
        &self.settings
    }

    /// The current depth of nested evaluations and invocations
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Makes a new context with the same settings, for use in another thread
    pub fn spawn(&self) -> Self {
        Self::with_settings(self.settings.clone())
    }

    /// Runs the post-evaluation hook with the given value
    pub fn post(&mut self, value: &Value) -> Result<()> {
        match &self.settings.post_eval_callback {
            Some(callback) => (**callback)(value),
            None => Ok(()),
        }
    }

    /// Runs `f` one level deeper in the evaluation stack
    ///
    /// An error is returned without calling `f` if the maximum call depth would be exceeded.
    pub fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= self.settings.max_call_depth {
            trace!("call depth limit reached ({})", self.depth);
            return runtime_error!(ErrorKind::RecursionLimit {
                limit: self.settings.max_call_depth,
            });
        }

        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }
}
