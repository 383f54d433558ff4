use async_openai::{
    types::{ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs},
    Client,
};

use super::{clean_terms, TermExpander};
use crate::{Error, Result};

/// Related keywords from an OpenAI chat model
pub struct OpenAiExpander {
    client: Client<async_openai::config::OpenAIConfig>,
    model: String,
    max_terms: usize,
}

impl OpenAiExpander {
    pub fn new(api_key: &str, model: &str, max_terms: usize) -> Self {
        let config = async_openai::config::OpenAIConfig::new().with_api_key(api_key);
        let client = Client::with_config(config);

        Self {
            client,
            model: model.to_string(),
            max_terms,
        }
    }

    fn prompt(&self, term: &str) -> String {
        format!(
            "List up to {} single keywords or short phrases that someone searching government, \
             defense or grant news for \"{}\" would also search for. \
             Return only a comma-separated list, nothing else.",
            self.max_terms, term
        )
    }

    async fn chat(&self, prompt: &str) -> Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(prompt)
                    .build()
                    .map_err(|e| Error::ExpansionUnavailable(e.to_string()))?,
            )])
            .max_tokens(40u32)
            .build()
            .map_err(|e| Error::ExpansionUnavailable(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| Error::ExpansionUnavailable(e.to_string()))?;

        Ok(response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default())
    }
}

#[async_trait::async_trait]
impl TermExpander for OpenAiExpander {
    async fn expand(&self, term: &str) -> Result<Vec<String>> {
        let reply = self.chat(&self.prompt(term)).await?;
        Ok(clean_terms(reply.split(|c| c == ',' || c == '\n'), term, self.max_terms))
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_mentions_term_and_limit() {
        let expander = OpenAiExpander::new("sk-test", "gpt-4o-mini", 4);
        let prompt = expander.prompt("hypersonic");
        assert!(prompt.contains("\"hypersonic\""));
        assert!(prompt.contains("up to 4"));
    }
}
