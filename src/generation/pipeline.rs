use std::sync::Arc;

use chrono::{FixedOffset, Offset, Utc};

use super::acronyms::rewrite_query;
use super::classifier::{classify, QueryIntent};
use super::metrics::retrieval_metrics;
use super::prompts::{assemble_context, draft_prompt, polish_prompt};
use super::usage::describe_usage;
use crate::core::config::AppConfig;
use crate::core::errors::ApiError;
use crate::history::{ChatLog, LogEntry, Metrics, TokensUsed};
use crate::llm::{GenerationConfig, LlmProvider};
use crate::rag::Retriever;

pub const FAREWELL: &str = "Goodbye!";
pub const BLOCKED_REFUSAL: &str =
    "The requested information is not available. Please consult the support team.";
pub const CASUAL_FALLBACK: &str = "Hello!";

const CASUAL_CONFIG: GenerationConfig = GenerationConfig::new(0.7, 50);
const DRAFT_CONFIG: GenerationConfig = GenerationConfig::new(0.0, 1000);
const POLISH_CONFIG: GenerationConfig = GenerationConfig::new(0.0, 500);

#[derive(Debug, Clone)]
pub struct GeneratorSettings {
    pub top_k_text: usize,
    pub top_k_images: usize,
    pub relevance_threshold: f32,
    pub manual_title: String,
    pub timezone: FixedOffset,
    pub timezone_label: String,
}

impl GeneratorSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        let offset_secs = config.history.timezone_offset_hours * 3600;
        let timezone = FixedOffset::east_opt(offset_secs).unwrap_or_else(|| {
            tracing::warn!(
                "Timezone offset {}h out of range, using UTC",
                config.history.timezone_offset_hours
            );
            Utc.fix()
        });

        Self {
            top_k_text: config.retrieval.top_k_text,
            top_k_images: config.retrieval.top_k_images,
            relevance_threshold: config.retrieval.relevance_threshold,
            manual_title: config.llm.manual_title.clone(),
            timezone,
            timezone_label: config.history.timezone_label.clone(),
        }
    }
}

/// Answers one query end to end and records the turn in the chat log.
#[derive(Clone)]
pub struct Generator {
    provider: Arc<dyn LlmProvider>,
    retriever: Retriever,
    chat_log: ChatLog,
    settings: GeneratorSettings,
}

impl Generator {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        retriever: Retriever,
        chat_log: ChatLog,
        settings: GeneratorSettings,
    ) -> Self {
        Self {
            provider,
            retriever,
            chat_log,
            settings,
        }
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub fn chat_log(&self) -> &ChatLog {
        &self.chat_log
    }

    pub async fn generate_response(&self, query: &str) -> Result<(String, LogEntry), ApiError> {
        if query.trim().to_lowercase() == "exit" {
            let entry = self.entry(
                query,
                query.to_string(),
                FAREWELL.to_string(),
                FAREWELL.to_string(),
            );
            self.chat_log.append(&entry).await?;
            return Ok((FAREWELL.to_string(), entry));
        }

        let intent = classify(self.provider.as_ref(), query).await?;
        let expanded = rewrite_query(query);
        tracing::info!("Query classified as {}", intent.as_str());

        let entry = match intent {
            QueryIntent::Blocked => self.entry(
                query,
                expanded,
                BLOCKED_REFUSAL.to_string(),
                BLOCKED_REFUSAL.to_string(),
            ),
            QueryIntent::Casual => {
                let reply = self.provider.generate(query, CASUAL_CONFIG).await?;
                let answer = reply.trimmed_text().unwrap_or(CASUAL_FALLBACK).to_string();
                self.entry(query, expanded, answer.clone(), answer)
            }
            QueryIntent::Manual => self.answer_from_manual(query, expanded).await?,
        };

        self.chat_log.append(&entry).await?;
        Ok((entry.final_answer.clone(), entry))
    }

    async fn answer_from_manual(&self, query: &str, expanded: String) -> Result<LogEntry, ApiError> {
        let chunks = self
            .retriever
            .retrieve_text(&expanded, self.settings.top_k_text)
            .await?;
        let images = self
            .retriever
            .retrieve_images(&expanded, self.settings.top_k_images)
            .await?;
        tracing::debug!("Retrieved {} chunks and {} images", chunks.len(), images.len());

        let context = assemble_context(&chunks, &images);
        let draft = self
            .provider
            .generate(
                &draft_prompt(&self.settings.manual_title, &context, query),
                DRAFT_CONFIG,
            )
            .await?;
        let raw_answer = draft.trimmed_text().unwrap_or(BLOCKED_REFUSAL).to_string();

        let polished = self
            .provider
            .generate(&polish_prompt(&raw_answer), POLISH_CONFIG)
            .await?;
        let final_answer = polished
            .trimmed_text()
            .map(str::to_string)
            .unwrap_or_else(|| raw_answer.clone());

        let metrics = retrieval_metrics(&chunks, self.settings.relevance_threshold);
        let mut entry = self.entry(query, expanded, raw_answer, final_answer);
        entry.retrieved_chunks = chunks;
        entry.images = images;
        entry.metrics = metrics;
        entry.tokens_used = TokensUsed {
            first_pass: describe_usage(draft.usage.as_ref()),
            second_pass: describe_usage(polished.usage.as_ref()),
        };
        Ok(entry)
    }

    fn entry(
        &self,
        query: &str,
        expanded: String,
        raw_answer: String,
        final_answer: String,
    ) -> LogEntry {
        LogEntry {
            timestamp: self.timestamp(),
            user_query: query.to_string(),
            expanded_query: expanded,
            retrieved_chunks: Vec::new(),
            images: Vec::new(),
            raw_answer,
            final_answer,
            metrics: Metrics::default(),
            tokens_used: TokensUsed::default(),
        }
    }

    fn timestamp(&self) -> String {
        let now = Utc::now().with_timezone(&self.settings.timezone);
        format!(
            "{} {}",
            now.format("%Y-%m-%d %H:%M:%S"),
            self.settings.timezone_label
        )
    }
}
