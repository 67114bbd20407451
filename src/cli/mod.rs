use crate::app::RunMode;
use crate::config::{Config, LLMProvider};
use clap::Parser;
use std::path::PathBuf;

/// EcoLens - 由Rust与AI驱动的可持续发展研究Agent
#[derive(Parser, Debug)]
#[command(name = "EcoLens (ecolens-rs)")]
#[command(
    about = "AI-based research-automation agent. It answers ad-hoc questions through a tool-using LLM loop, and runs a multi-stage pipeline that analyzes corporate sustainability reports across an industry."
)]
#[command(author = "Sopaco")]
#[command(version)]
pub struct Args {
    /// 一次性执行：分析指定行业的可持续发展报告
    #[arg(short, long)]
    pub industry: Option<String>,

    /// 一次性执行：向基础Agent提问
    #[arg(short, long)]
    pub query: Option<String>,

    /// 一次性执行：下载并摘要单份PDF报告
    #[arg(long)]
    pub report_url: Option<String>,

    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 是否启用详细日志
    #[arg(short, long)]
    pub verbose: bool,

    /// 主模型，用于公司识别、趋势综合与基础Agent推理
    #[arg(long)]
    pub model_main: Option<String>,

    /// 摘要模型，用于map-reduce摘要的高吞吐调用
    #[arg(long)]
    pub model_summary: Option<String>,

    /// LLM API基地址
    #[arg(long)]
    pub llm_api_base_url: Option<String>,

    /// LLM API KEY
    #[arg(long)]
    pub llm_api_key: Option<String>,

    /// 最大tokens数
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// 温度参数
    #[arg(long)]
    pub temperature: Option<f64>,

    /// 并发扇出的最大worker数
    #[arg(long)]
    pub max_parallels: Option<usize>,

    /// LLM Provider (openai, mistral, openrouter, anthropic, deepseek)
    #[arg(long)]
    pub llm_provider: Option<String>,

    /// 禁用基础Agent的预置工具
    #[arg(long, default_value = "false", action = clap::ArgAction::SetTrue)]
    pub disable_preset_tools: bool,

    /// 是否禁用缓存
    #[arg(long)]
    pub no_cache: bool,
}

impl Args {
    /// 由一次性参数决定运行模式，没有给出时进入交互式会话
    pub fn run_mode(&self) -> RunMode {
        if let Some(industry) = &self.industry {
            RunMode::Industry(industry.clone())
        } else if let Some(query) = &self.query {
            RunMode::Query(query.clone())
        } else if let Some(url) = &self.report_url {
            RunMode::SingleReport(url.clone())
        } else {
            RunMode::Interactive
        }
    }

    /// 将CLI参数转换为配置
    pub fn into_config(self) -> Config {
        let mut config = if let Some(config_path) = &self.config {
            // 如果显式指定了配置文件路径，从该路径加载
            Config::from_file(config_path).unwrap_or_else(|_| {
                eprintln!("⚠️ 警告: 无法读取配置文件 {:?}，使用默认配置", config_path);
                Config::default()
            })
        } else {
            // 如果没有显式指定配置文件，尝试从默认位置加载
            let default_config_path = std::env::current_dir()
                .unwrap_or_else(|_| std::path::PathBuf::from("."))
                .join("ecolens.toml");

            if default_config_path.exists() {
                Config::from_file(&default_config_path).unwrap_or_else(|_| {
                    eprintln!(
                        "⚠️ 警告: 无法读取默认配置文件 {:?}，使用默认配置",
                        default_config_path
                    );
                    Config::default()
                })
            } else {
                // 默认配置文件不存在，使用默认值
                Config::default()
            }
        };

        // 覆盖LLM配置
        if let Some(provider_str) = self.llm_provider {
            if let Ok(provider) = provider_str.parse::<LLMProvider>() {
                config.llm.provider = provider;
            } else {
                eprintln!(
                    "⚠️ 警告: 未知的provider: {}，使用默认provider",
                    provider_str
                );
            }
        }
        if let Some(llm_api_base_url) = self.llm_api_base_url {
            config.llm.api_base_url = llm_api_base_url;
        }
        if let Some(llm_api_key) = self.llm_api_key {
            config.llm.api_key = llm_api_key;
        }
        if let Some(model_main) = self.model_main {
            config.llm.model_main = model_main;
        }
        if let Some(model_summary) = self.model_summary {
            config.llm.model_summary = model_summary;
        }
        if let Some(max_tokens) = self.max_tokens {
            config.llm.max_tokens = max_tokens;
        }
        if let Some(temperature) = self.temperature {
            config.llm.temperature = temperature;
        }
        if let Some(max_parallels) = self.max_parallels {
            config.workflow.max_parallels = max_parallels;
        }
        config.llm.disable_preset_tools = self.disable_preset_tools;

        // 缓存配置
        if self.no_cache {
            config.cache.enabled = false;
        }

        // 其他配置
        config.verbose = self.verbose;

        config
    }
}
