//! 报告文本提取工具

use rig::tool::Tool;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use super::ResearchToolError;
use crate::retrieval::{self, TextExtractor};
use crate::types::TextOutcome;

/// 文本提取工具，从本地缓存的PDF文件提取纯文本
#[derive(Clone)]
pub struct AgentToolExtractText {
    extractor: Arc<dyn TextExtractor>,
}

/// 提取参数
#[derive(Debug, Deserialize)]
pub struct ExtractTextArgs {
    pub path: String,
}

/// 提取结果
#[derive(Debug, Serialize)]
pub struct ExtractTextResult {
    pub text: String,
}

impl AgentToolExtractText {
    pub fn new(extractor: Arc<dyn TextExtractor>) -> Self {
        Self { extractor }
    }
}

impl Tool for AgentToolExtractText {
    const NAME: &'static str = "extract_report_text";

    type Error = ResearchToolError;
    type Args = ExtractTextArgs;
    type Output = ExtractTextResult;

    async fn definition(&self, _prompt: String) -> rig::completion::ToolDefinition {
        rig::completion::ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Extracts text content from a locally stored PDF file, usually the output of the download_report tool. Input MUST be a local file path to a PDF.".to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Local file path of the PDF to extract text from."
                    }
                },
                "required": ["path"]
            }),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        println!("   🔧 tool called...extract_report_text@{}", args.path);

        match retrieval::extract_text(Path::new(&args.path), self.extractor.as_ref()).await {
            TextOutcome::Ok(text) => Ok(ExtractTextResult { text }),
            // Warning的内容不可用但处理成功，把原因回传给Agent
            TextOutcome::Warning(reason) => Ok(ExtractTextResult { text: reason }),
            TextOutcome::Error(reason) => Err(ResearchToolError(reason)),
        }
    }
}
