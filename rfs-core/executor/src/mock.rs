//! 脚本化模拟执行器
//!
//! 按命令前缀匹配规则返回预设输出，并记录所有执行过的命令。
//! 最长前缀优先；前缀长度相同时后注册的规则优先；未命中的命令视为成功且无输出。

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::debug;

use crate::error::Result;
use crate::runner::{CommandOutput, CommandRunner};

type Handler = Arc<dyn Fn(&str) -> CommandOutput + Send + Sync>;

struct Rule {
    prefix: String,
    handler: Handler,
}

/// 模拟执行器
pub struct MockRunner {
    host: String,
    rules: Mutex<Vec<Rule>>,
    history: Mutex<Vec<String>>,
}

impl MockRunner {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            rules: Mutex::new(Vec::new()),
            history: Mutex::new(Vec::new()),
        }
    }

    /// 前缀命中时返回成功输出
    pub fn on(self, prefix: impl Into<String>, stdout: impl Into<String>) -> Self {
        let output = CommandOutput::success(stdout);
        self.on_fn(prefix, move |_| output.clone())
    }

    /// 前缀命中时返回失败输出
    pub fn on_fail(self, prefix: impl Into<String>, exit_code: i32, stderr: impl Into<String>) -> Self {
        let output = CommandOutput::failure(exit_code, stderr);
        self.on_fn(prefix, move |_| output.clone())
    }

    /// 前缀命中时调用闭包生成输出（闭包可持有共享状态）
    pub fn on_fn<F>(self, prefix: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&str) -> CommandOutput + Send + Sync + 'static,
    {
        self.add_rule(prefix, handler);
        self
    }

    /// 非构建器形式的规则注册
    pub fn add_rule<F>(&self, prefix: impl Into<String>, handler: F)
    where
        F: Fn(&str) -> CommandOutput + Send + Sync + 'static,
    {
        let mut rules = self.rules.lock().unwrap_or_else(|e| e.into_inner());
        rules.push(Rule {
            prefix: prefix.into(),
            handler: Arc::new(handler),
        });
    }

    /// 所有执行过的命令
    pub fn history(&self) -> Vec<String> {
        self.history.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// 以指定前缀开头的已执行命令
    pub fn calls(&self, prefix: &str) -> Vec<String> {
        self.history()
            .into_iter()
            .filter(|c| c.starts_with(prefix))
            .collect()
    }

    /// 以指定前缀开头的已执行命令数量
    pub fn count(&self, prefix: &str) -> usize {
        self.calls(prefix).len()
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    fn host(&self) -> &str {
        &self.host
    }

    async fn run(&self, command: &str) -> Result<CommandOutput> {
        debug!("[mock {}] {}", self.host, command);
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(command.to_string());

        // 释放锁后再调用，闭包内可以继续注册规则
        let handler = {
            let rules = self.rules.lock().unwrap_or_else(|e| e.into_inner());
            rules
                .iter()
                .enumerate()
                .filter(|(_, rule)| command.starts_with(&rule.prefix))
                .max_by_key(|(index, rule)| (rule.prefix.len(), *index))
                .map(|(_, rule)| rule.handler.clone())
        };

        Ok(match handler {
            Some(handler) => handler(command),
            None => CommandOutput::success(""),
        })
    }
}
