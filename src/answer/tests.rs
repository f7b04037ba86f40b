use super::*;
use std::sync::Mutex;

struct FakeModel {
    reply: fn() -> Result<String>,
    prompts: Mutex<Vec<String>>,
}

impl FakeModel {
    fn new(reply: fn() -> Result<String>) -> Arc<Self> {
        Arc::new(Self {
            reply,
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn last_prompt(&self) -> String {
        self.prompts
            .lock()
            .expect("lock")
            .last()
            .cloned()
            .expect("a prompt was sent")
    }
}

impl ChatModel for FakeModel {
    fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().expect("lock").push(prompt.to_string());
        (self.reply)()
    }
}

#[test]
fn prompt_places_context_before_question() {
    let prompt = build_prompt(
        "Who wrote it?",
        &["First chunk.".to_string(), "Second chunk.".to_string()],
    );

    assert!(prompt.starts_with("Use the following pieces of context"));
    assert!(prompt.contains("First chunk.\n\nSecond chunk."));
    assert!(prompt.ends_with("Question: Who wrote it?\nHelpful Answer:"));
    let context_at = prompt.find("First chunk.").expect("context present");
    let question_at = prompt.find("Question:").expect("question present");
    assert!(context_at < question_at);
}

#[test]
fn prompt_with_no_context_still_has_question() {
    let prompt = build_prompt("Anything?", &[]);

    assert!(prompt.contains("Question: Anything?"));
}

#[test]
fn answer_returns_model_text() {
    let model = FakeModel::new(|| Ok("Forty-two.".to_string()));
    let synthesizer = AnswerSynthesizer::new(Arc::clone(&model) as Arc<dyn ChatModel>);

    let answer = synthesizer.answer("Meaning?", &["The answer is 42.".to_string()]);

    assert_eq!(answer, "Forty-two.");
    assert!(model.last_prompt().contains("The answer is 42."));
}

#[test]
fn timeout_becomes_explanatory_text() {
    let model = FakeModel::new(|| Err(QaError::SynthesisTimeout(30)));
    let synthesizer = AnswerSynthesizer::new(model);

    let answer = synthesizer.answer("Slow?", &[]);

    assert!(answer.starts_with("Error: The model is taking too long to respond."));
    assert!(answer.contains("30 seconds"));
}

#[test]
fn other_failures_become_generic_error_text() {
    let model = FakeModel::new(|| Err(QaError::Synthesis("HTTP 401: bad key".to_string())));
    let synthesizer = AnswerSynthesizer::new(model);

    let answer = synthesizer.answer("Auth?", &[]);

    assert!(answer.starts_with("Error generating response:"));
    assert!(answer.contains("bad key"));
}

#[test]
fn synthesize_keeps_typed_errors() {
    let model = FakeModel::new(|| Err(QaError::SynthesisTimeout(5)));
    let synthesizer = AnswerSynthesizer::new(model);

    let result = synthesizer.synthesize("q", &[]);

    assert!(matches!(result, Err(QaError::SynthesisTimeout(5))));
}

#[test]
fn unrelated_errors_are_reported_as_synthesis_errors() {
    let model = FakeModel::new(|| Err(QaError::Config("odd".to_string())));
    let synthesizer = AnswerSynthesizer::new(model);

    let result = synthesizer.synthesize("q", &[]);

    assert!(matches!(result, Err(QaError::Synthesis(_))));
}
