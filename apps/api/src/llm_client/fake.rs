//! Scripted `TextGenerator` for tests. Records every call it receives.

use std::sync::Mutex;

use async_trait::async_trait;

use super::{Completion, Fragment, FragmentStream, GenerationCall, LlmError, TextGenerator};

type Responder = Box<dyn Fn(&GenerationCall) -> Result<Completion, LlmError> + Send + Sync>;

/// Reasoning fragment emitted ahead of every streamed answer.
pub const FAKE_REASONING: &str = "Weighing what this audience struggles with.";

pub struct FakeGenerator {
    responder: Responder,
    calls: Mutex<Vec<GenerationCall>>,
}

impl FakeGenerator {
    pub fn new(
        responder: impl Fn(&GenerationCall) -> Result<Completion, LlmError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Always answers with the same text.
    pub fn replying(text: &str) -> Self {
        let text = text.to_string();
        Self::new(move |_| Ok(completion(&text)))
    }

    pub fn calls(&self) -> Vec<GenerationCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn respond(&self, call: &GenerationCall) -> Result<Completion, LlmError> {
        self.calls.lock().unwrap().push(call.clone());
        (self.responder)(call)
    }
}

pub fn completion(text: &str) -> Completion {
    Completion {
        text: text.to_string(),
        usage: None,
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn generate(&self, call: &GenerationCall) -> Result<Completion, LlmError> {
        self.respond(call)
    }

    async fn generate_stream(&self, call: &GenerationCall) -> Result<FragmentStream, LlmError> {
        let answer = self.respond(call)?;
        let fragments = vec![
            Ok(Fragment::reasoning(FAKE_REASONING)),
            Ok(Fragment::answer(answer.text)),
        ];
        Ok(Box::pin(futures::stream::iter(fragments)))
    }
}
