//! 缓存存储 - 报告文档与摘要的落盘只增缓存
//!
//! 文档缓存以源URL的SHA-256哈希为键（可带截断的可读slug前缀），摘要缓存以
//! 规范化的公司名为键。两者都以"目标路径存在文件"作为唯一的命中信号，不维护
//! 额外清单；条目一经写入不再修改，也不主动过期淘汰。

use sha2::{Digest, Sha256};
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::types::StageError;
use crate::utils::percent_decode;

/// slug前缀的最大长度
const MAX_SLUG_LEN: usize = 50;

/// 文件名中保留的哈希前缀长度（十六进制字符）
const HASH_PREFIX_LEN: usize = 10;

/// 摘要缓存文件的固定后缀
const SUMMARY_SUFFIX: &str = "_summary.txt";

/// 报告文档缓存
pub struct DocumentCache {
    cache_dir: PathBuf,
    enabled: bool,
}

impl DocumentCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            enabled: true,
        }
    }

    /// 关闭缓存命中（文件仍落盘，供后续提取使用）
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// 计算URL对应的缓存路径，纯计算不触盘
    pub fn resolve_path(&self, url: &str) -> PathBuf {
        self.cache_dir.join(url_to_filename(url))
    }

    /// 读穿缓存：命中直接返回路径，未命中时调用fetcher下载并整文件落盘。
    ///
    /// 同一URL的并发调用不在此层去重：两个worker可能都未命中并各自下载，
    /// 后写者覆盖前写者。写入是整文件操作，失败时删除残留，不会产生损坏
    /// 的缓存条目。
    pub async fn get_or_fetch<F, Fut>(&self, url: &str, fetcher: F) -> Result<PathBuf, StageError>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<Vec<u8>, StageError>>,
    {
        let path = self.resolve_path(url);
        if self.enabled && path.exists() {
            println!("   📦 缓存命中: {}", path.display());
            return Ok(path);
        }

        fs::create_dir_all(&self.cache_dir)
            .await
            .map_err(|e| StageError::Transient(format!("Failed to create cache dir: {}", e)))?;

        let bytes = fetcher(url.to_string()).await?;

        if let Err(e) = fs::write(&path, &bytes).await {
            // 删除可能的残留文件，保证"存在即完整"的不变量
            let _ = fs::remove_file(&path).await;
            return Err(StageError::Transient(format!(
                "Failed to write cached document {}: {}",
                path.display(),
                e
            )));
        }

        println!("   📥 已下载并缓存: {}", path.display());
        Ok(path)
    }
}

/// 摘要缓存
///
/// 以公司名为键而非内容哈希：同名公司的源报告更新后仍会命中旧摘要，
/// 这是成本优先于新鲜度的取舍。
pub struct SummaryCache {
    cache_dir: PathBuf,
    enabled: bool,
}

impl SummaryCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            enabled: true,
        }
    }

    /// 关闭缓存：每次都重新计算且不落盘
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// 规范化公司名为缓存键：小写、空格转下划线
    pub fn entity_key(entity: &str) -> String {
        entity.trim().to_lowercase().replace(' ', "_")
    }

    /// 计算公司对应的摘要缓存路径
    pub fn resolve_path(&self, entity: &str) -> PathBuf {
        self.cache_dir
            .join(format!("{}{}", Self::entity_key(entity), SUMMARY_SUFFIX))
    }

    /// 读穿缓存：命中读文件返回，读失败降级为重新计算而非报错
    pub async fn get_or_compute<F, Fut>(&self, entity: &str, compute: F) -> Result<String, StageError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, StageError>>,
    {
        if !self.enabled {
            return compute().await;
        }

        let path = self.resolve_path(entity);

        if path.exists() {
            match fs::read_to_string(&path).await {
                Ok(summary) => {
                    println!("   📦 摘要缓存命中: {}", path.display());
                    return Ok(summary);
                }
                Err(e) => {
                    eprintln!(
                        "   ⚠️ 读取摘要缓存失败: {}: {}，将重新生成",
                        path.display(),
                        e
                    );
                }
            }
        }

        let summary = compute().await?;

        fs::create_dir_all(&self.cache_dir)
            .await
            .map_err(|e| StageError::Transient(format!("Failed to create cache dir: {}", e)))?;
        if let Err(e) = fs::write(&path, &summary).await {
            // 缓存写失败不影响本次结果
            eprintln!("   ⚠️ 写入摘要缓存失败: {}: {}", path.display(), e);
        } else {
            println!("   💾 摘要已写入缓存: {}", path.display());
        }

        Ok(summary)
    }
}

/// 由URL生成稳定且文件系统安全的文件名
///
/// 优先取URL路径末段作为可读slug（截断并清洗），拼接哈希前缀保证唯一；
/// slug不可用时退化为完整哈希。
fn url_to_filename(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    let url_hash = format!("{:x}", hasher.finalize());

    if let Ok(parsed) = reqwest::Url::parse(url) {
        let raw_name = Path::new(&percent_decode(parsed.path()))
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        // 只保留字母数字、下划线、连字符和点
        let safe_name: String = raw_name
            .chars()
            .filter(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
            .collect();

        if let Some(base_name) = safe_name
            .strip_suffix(".pdf")
            .or_else(|| safe_name.strip_suffix(".PDF"))
            && !base_name.is_empty()
        {
            let truncated: String = base_name.chars().take(MAX_SLUG_LEN).collect();
            return format!("{}_{}.pdf", truncated, &url_hash[..HASH_PREFIX_LEN]);
        }
    }

    format!("{}.pdf", url_hash)
}
