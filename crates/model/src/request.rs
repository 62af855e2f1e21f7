/// A request to be sent to the model provider.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ModelRequest {
    /// The fully rendered prompt text.
    pub prompt: String,
    /// Sequences that make the model stop generating.
    ///
    /// Providers pass these through to the backend. The sequences
    /// themselves are not included in the generated text.
    pub stop: Vec<String>,
}

impl ModelRequest {
    /// Creates a request with the given prompt and no stop sequences.
    #[inline]
    pub fn new<S: Into<String>>(prompt: S) -> Self {
        Self {
            prompt: prompt.into(),
            stop: vec![],
        }
    }

    /// Adds a stop sequence.
    #[inline]
    pub fn with_stop<S: Into<String>>(mut self, stop: S) -> Self {
        self.stop.push(stop.into());
        self
    }
}
