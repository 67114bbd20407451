//! 有界并发扇出执行器
//!
//! 研究管线的下载提取阶段与摘要阶段共用这一原语：对一组按公司键控的独立
//! 作业做并发执行，单个作业的失败（包括panic）被折算为该键的错误结果，
//! 不会波及兄弟作业，也不会丢键。

use futures::future::join_all;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::types::StageError;

/// 并发执行一组键控作业，返回逐键的结果映射
///
/// 不变量：输出映射的键集合与输入严格相等。并发度由信号量限制在
/// `max_parallels`以内，超出的作业排队等待；完成顺序不作任何保证。
pub async fn run_parallel<K, V, T, F, Fut>(
    jobs: BTreeMap<K, V>,
    max_parallels: usize,
    worker: F,
) -> BTreeMap<K, Result<T, StageError>>
where
    K: Ord + Clone + Send + 'static,
    V: Send + 'static,
    T: Send + 'static,
    F: Fn(K, V) -> Fut,
    Fut: Future<Output = Result<T, StageError>> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(max_parallels.max(1)));
    let mut keys = Vec::with_capacity(jobs.len());
    let mut handles = Vec::with_capacity(jobs.len());

    for (key, input) in jobs {
        let job = worker(key.clone(), input);
        let semaphore = semaphore.clone();
        keys.push(key);
        handles.push(tokio::spawn(async move {
            // Semaphore在执行器存续期间不会关闭
            let _permit = semaphore
                .acquire_owned()
                .await
                .expect("fan-out semaphore closed");
            job.await
        }));
    }

    let mut results = BTreeMap::new();
    for (key, joined) in keys.into_iter().zip(join_all(handles).await) {
        let outcome = match joined {
            Ok(result) => result,
            // worker panic被tokio捕获，折算为该键的错误结果
            Err(e) => Err(StageError::Transient(format!("Worker task failed: {}", e))),
        };
        results.insert(key, outcome);
    }

    results
}
