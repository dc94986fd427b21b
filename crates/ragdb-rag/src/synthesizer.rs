use std::sync::Arc;

use tracing::{debug, info};

use ragdb_core::traits::LanguageModel;
use ragdb_core::types::{Answer, Retrieval, SearchHit};
use ragdb_core::Result;

/// Returned verbatim when nothing relevant was retrieved, and requested
/// from the model when the supplied context lacks the answer.
pub const NO_ANSWER: &str = "I'm sorry, I couldn't find any relevant information to answer your question.";

pub const CONTEXT_DELIMITER: &str = "\n\n---\n\n";

pub fn build_context(passages: &[SearchHit]) -> String {
    passages.iter().map(|p| p.content.as_str()).collect::<Vec<_>>().join(CONTEXT_DELIMITER)
}

pub fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "You are an AI assistant providing helpful answers to users' questions based on the provided context.\n\
         Use only the information provided in the context to answer the question. \
         If the context does not contain the answer, respond with \"{NO_ANSWER}\"\n\n\
         Answer the question based only on the following context:\n\n\
         {context}\n\n---\n\n\
         Answer the question based on the above context: {question}\n"
    )
}

pub struct AnswerSynthesizer {
    llm: Arc<dyn LanguageModel>,
}

impl AnswerSynthesizer {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    pub async fn synthesize(&self, question: &str, retrieval: Retrieval) -> Result<Answer> {
        let passages = match retrieval {
            Retrieval::NoRelevantInformation => {
                return Ok(Answer { response: NO_ANSWER.to_string(), sources: Vec::new() });
            }
            Retrieval::Relevant(passages) => passages,
        };
        let context = build_context(&passages);
        let prompt = build_prompt(&context, question);
        debug!(%prompt, "prompt assembled");
        info!(model = %self.llm.model_id(), passages = passages.len(), "invoking language model");

        let response = self.llm.generate(&prompt).await?;
        let sources = passages.iter().map(|p| p.source().to_string()).collect();
        Ok(Answer { response, sources })
    }
}
