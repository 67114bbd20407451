use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

/// LLM Provider类型
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub enum LLMProvider {
    #[serde(rename = "openai")]
    #[default]
    OpenAI,
    #[serde(rename = "moonshot")]
    Moonshot,
    #[serde(rename = "deepseek")]
    DeepSeek,
    #[serde(rename = "mistral")]
    Mistral,
    #[serde(rename = "openrouter")]
    OpenRouter,
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "gemini")]
    Gemini,
    #[serde(rename = "ollama")]
    Ollama,
}

impl std::fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LLMProvider::OpenAI => write!(f, "openai"),
            LLMProvider::Moonshot => write!(f, "moonshot"),
            LLMProvider::DeepSeek => write!(f, "deepseek"),
            LLMProvider::Mistral => write!(f, "mistral"),
            LLMProvider::OpenRouter => write!(f, "openrouter"),
            LLMProvider::Anthropic => write!(f, "anthropic"),
            LLMProvider::Gemini => write!(f, "gemini"),
            LLMProvider::Ollama => write!(f, "ollama"),
        }
    }
}

impl std::str::FromStr for LLMProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(LLMProvider::OpenAI),
            "moonshot" => Ok(LLMProvider::Moonshot),
            "deepseek" => Ok(LLMProvider::DeepSeek),
            "mistral" => Ok(LLMProvider::Mistral),
            "openrouter" => Ok(LLMProvider::OpenRouter),
            "anthropic" => Ok(LLMProvider::Anthropic),
            "gemini" => Ok(LLMProvider::Gemini),
            "ollama" => Ok(LLMProvider::Ollama),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

/// 应用程序配置
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// 内部工作目录路径 (.ecolens)
    pub internal_path: PathBuf,

    /// LLM模型配置
    pub llm: LLMConfig,

    /// 缓存配置
    pub cache: CacheConfig,

    /// 搜索配置
    pub search: SearchConfig,

    /// 报告下载配置
    pub fetch: FetchConfig,

    /// 摘要配置
    pub summarize: SummarizeConfig,

    /// 工作流配置
    pub workflow: WorkflowConfig,

    /// 任务历史数据库配置
    pub history: HistoryConfig,

    /// 是否启用详细日志
    pub verbose: bool,
}

/// LLM模型配置
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LLMConfig {
    /// LLM Provider类型
    pub provider: LLMProvider,

    /// LLM API KEY
    pub api_key: String,

    /// LLM API基地址
    pub api_base_url: String,

    /// 主模型，用于公司识别、趋势综合与基础Agent推理
    pub model_main: String,

    /// 摘要模型，用于map-reduce摘要的高吞吐调用
    pub model_summary: String,

    /// 最大tokens
    pub max_tokens: u32,

    /// 温度
    pub temperature: f64,

    /// 重试次数
    pub retry_attempts: u32,

    /// 重试间隔（毫秒）
    pub retry_delay_ms: u64,

    /// 单次调用超时时间（秒）
    pub timeout_seconds: u64,

    /// 禁用基础Agent的预置工具
    pub disable_preset_tools: bool,

    /// 基础Agent的最大迭代轮数
    pub max_iterations: usize,
}

/// 缓存配置
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CacheConfig {
    /// 是否启用缓存
    pub enabled: bool,

    /// 报告文档缓存目录
    pub document_cache_dir: PathBuf,

    /// 摘要缓存目录
    pub summary_cache_dir: PathBuf,
}

/// 搜索配置
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SearchConfig {
    /// 单次搜索返回的最大结果数
    pub max_results: usize,

    /// 搜索重试次数
    pub retry_attempts: u32,

    /// 搜索重试间隔（秒）
    pub retry_delay_secs: u64,
}

/// 报告下载配置
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FetchConfig {
    /// 下载重试次数
    pub retry_attempts: u32,

    /// 下载重试间隔（秒）
    pub retry_delay_secs: u64,

    /// 单次请求超时时间（秒）
    pub timeout_seconds: u64,
}

/// 摘要配置
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SummarizeConfig {
    /// 分块目标大小（字符）
    pub chunk_size: usize,

    /// 相邻分块重叠（字符）
    pub chunk_overlap: usize,

    /// reduce阶段单次合并的输入预算（字符），超过则递归再归并
    pub combine_input_budget: usize,
}

/// 工作流配置
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WorkflowConfig {
    /// 单次执行的节点数上限，防御路由环路
    pub recursion_limit: usize,

    /// 并发扇出的最大worker数
    pub max_parallels: usize,
}

/// 任务历史数据库配置
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HistoryConfig {
    /// SQLite数据库文件路径
    pub db_path: PathBuf,
}

impl Config {
    /// 从文件加载配置
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let mut file =
            File::open(path).context(format!("Failed to open config file: {:?}", path))?;
        let mut content = String::new();
        file.read_to_string(&mut content)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            internal_path: PathBuf::from("./.ecolens"),
            llm: LLMConfig::default(),
            cache: CacheConfig::default(),
            search: SearchConfig::default(),
            fetch: FetchConfig::default(),
            summarize: SummarizeConfig::default(),
            workflow: WorkflowConfig::default(),
            history: HistoryConfig::default(),
            verbose: false,
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::default(),
            api_key: std::env::var("ECOLENS_LLM_API_KEY").unwrap_or_default(),
            api_base_url: String::from("https://api-inference.modelscope.cn/v1"),
            model_main: String::from("Qwen/Qwen3-235B-A22B-Instruct-2507"),
            model_summary: String::from("Qwen/Qwen3-Next-80B-A3B-Instruct"),
            max_tokens: 131072,
            temperature: 0.1,
            retry_attempts: 5,
            retry_delay_ms: 5000,
            timeout_seconds: 30,
            disable_preset_tools: false,
            max_iterations: 10,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            document_cache_dir: PathBuf::from("./.ecolens/pdf_cache"),
            summary_cache_dir: PathBuf::from("./.ecolens/summary_cache"),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: 5,
            retry_attempts: 3,
            retry_delay_secs: 5,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            retry_attempts: 3,
            retry_delay_secs: 10,
            timeout_seconds: 30,
        }
    }
}

impl Default for SummarizeConfig {
    fn default() -> Self {
        Self {
            chunk_size: 8000,
            chunk_overlap: 400,
            combine_input_budget: 24000,
        }
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            recursion_limit: 10,
            max_parallels: 10,
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./.ecolens/analysis_history.db"),
        }
    }
}
