//! 摘要阶段 - 分块、map-reduce归并与摘要缓存
//!
//! 长文本切成带重叠的定长块，map阶段逐块摘要，reduce阶段合并；合并输入
//! 超出预算时递归再归并。结果经摘要缓存读写，失败只影响当前公司。

use std::sync::Arc;

use crate::cache::SummaryCache;
use crate::config::SummarizeConfig;
use crate::llm::CompletionService;
use crate::types::{StageError, SummaryOutcome, TextOutcome};

const MAP_PROMPT: &str = "Write a concise summary of the following section of a corporate sustainability report. \
Focus on concrete goals, metrics and initiatives:\n\n{text}\n\nCONCISE SUMMARY:";

const COMBINE_PROMPT: &str = "The following are partial summaries of a corporate sustainability report. \
Combine them into a single coherent summary covering the key themes, goals and metrics:\n\n{summaries}\n\nCOMBINED SUMMARY:";

/// 把文本切成带重叠的定长块
///
/// 按字符计数，步长为`chunk_size - chunk_overlap`；重叠不小于块长时按
/// 单字符步进兜底。
pub fn split_into_chunks(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() || chunk_size == 0 {
        return Vec::new();
    }
    if chars.len() <= chunk_size {
        return vec![text.to_string()];
    }

    let step = chunk_size.saturating_sub(chunk_overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }

    chunks
}

/// 单公司的map-reduce摘要器
pub struct Summarizer {
    completion: Arc<dyn CompletionService>,
    cache: Arc<SummaryCache>,
    config: SummarizeConfig,
}

impl Summarizer {
    pub fn new(
        completion: Arc<dyn CompletionService>,
        cache: Arc<SummaryCache>,
        config: SummarizeConfig,
    ) -> Self {
        Self {
            completion,
            cache,
            config,
        }
    }

    /// 摘要单个公司的提取文本
    ///
    /// 上游的Warning/Error哨兵和空文本直接短路为Skipped，不触发任何
    /// 补全调用——失败会传染但不致命。
    pub async fn summarize(&self, entity: &str, input: &TextOutcome) -> SummaryOutcome {
        let text = match input {
            TextOutcome::Ok(text) if !text.trim().is_empty() => text.clone(),
            _ => {
                println!("   ⏭️ 跳过 {} 的摘要：上游失败或文本为空", entity);
                return SummaryOutcome::Skipped(
                    "Skipped due to previous error or empty text.".to_string(),
                );
            }
        };

        let result = self
            .cache
            .get_or_compute(entity, || self.generate(entity, text.clone()))
            .await;

        match result {
            Ok(summary) => SummaryOutcome::Ok(summary),
            Err(e) => SummaryOutcome::Error(format!("Error during summarization: {}", e)),
        }
    }

    /// 缓存未命中时的两阶段生成
    async fn generate(&self, entity: &str, text: String) -> Result<String, StageError> {
        let chunks = split_into_chunks(&text, self.config.chunk_size, self.config.chunk_overlap);
        println!("   📝 为 {} 处理 {} 个文本块...", entity, chunks.len());

        // map阶段：逐块摘要。块间串行，公司级扇出已提供并行度
        let mut partials = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            let prompt = MAP_PROMPT.replace("{text}", chunk);
            let partial = self
                .completion
                .complete(&prompt)
                .await
                .map_err(|e| StageError::Transient(format!("Map phase failed: {}", e)))?;
            partials.push(partial);
        }

        // reduce阶段：合并，超预算时先分组归并再合并
        let mut parts = partials;
        loop {
            let combined = parts.join("\n\n");
            if combined.chars().count() <= self.config.combine_input_budget || parts.len() <= 1 {
                let prompt = COMBINE_PROMPT.replace("{summaries}", &combined);
                let summary = self
                    .completion
                    .complete(&prompt)
                    .await
                    .map_err(|e| StageError::Transient(format!("Reduce phase failed: {}", e)))?;

                if summary.trim().is_empty() {
                    return Err(StageError::ContentIssue(
                        "Summarization resulted in empty output.".to_string(),
                    ));
                }
                return Ok(summary);
            }

            parts = self.reduce_groups(parts).await?;
        }
    }

    /// 把部分摘要按输入预算分组，并把每组归并为一条
    async fn reduce_groups(&self, parts: Vec<String>) -> Result<Vec<String>, StageError> {
        let mut reduced = Vec::new();
        let mut group: Vec<String> = Vec::new();
        let mut group_len = 0;

        for part in parts {
            let part_len = part.chars().count();
            if !group.is_empty() && group_len + part_len > self.config.combine_input_budget {
                reduced.push(self.combine_group(&group).await?);
                group.clear();
                group_len = 0;
            }
            group_len += part_len;
            group.push(part);
        }
        if !group.is_empty() {
            reduced.push(self.combine_group(&group).await?);
        }

        Ok(reduced)
    }

    async fn combine_group(&self, group: &[String]) -> Result<String, StageError> {
        let prompt = COMBINE_PROMPT.replace("{summaries}", &group.join("\n\n"));
        self.completion
            .complete(&prompt)
            .await
            .map_err(|e| StageError::Transient(format!("Reduce phase failed: {}", e)))
    }
}
