//! 文档存储（DocumentStore）
//!
//! 每个文档类型对应一个集合，文档以 snowflake 为主键。
//! 数据库名为 `{prefix}-{environment}`，集合名最长 127 个字符。
//!
use crate::config::{BotConfig, Environment};
use crate::error::{BotError, BotResult};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;

const MAX_COLLECTION_NAME: usize = 127;

pub trait Document: Serialize + DeserializeOwned + Send + Sync + 'static {
    const COLLECTION: &'static str;

    fn snowflake(&self) -> u64;
}

pub fn collection_name<D: Document>() -> &'static str {
    match D::COLLECTION.char_indices().nth(MAX_COLLECTION_NAME) {
        Some((end, _)) => &D::COLLECTION[..end],
        None => D::COLLECTION,
    }
}

pub fn database_name(prefix: &str, environment: Environment) -> String {
    format!("{prefix}-{environment}")
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get_all<D: Document>(&self) -> BotResult<Vec<D>>;

    /// 顶层字段逐一相等（AND）的文档；空过滤条件等同于 `get_all`
    async fn get_all_by_equals<D: Document>(&self, filters: &[(&str, Value)]) -> BotResult<Vec<D>>;

    async fn get_by_snowflake<D: Document>(&self, snowflake: u64) -> BotResult<Option<D>>;

    /// 插入或整体替换
    async fn upsert<D: Document>(&self, document: &D) -> BotResult<()>;

    async fn delete<D: Document>(&self, snowflake: u64) -> BotResult<bool>;
}

pub struct InMemoryDocumentStore {
    database: String,
    collections: DashMap<&'static str, BTreeMap<u64, Value>>,
}

impl InMemoryDocumentStore {
    pub fn new(prefix: &str, environment: Environment) -> Self {
        Self {
            database: database_name(prefix, environment),
            collections: DashMap::new(),
        }
    }

    pub fn for_config(config: &BotConfig) -> Self {
        Self::new(&config.db_prefix, config.environment)
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    fn scan<D: Document>(&self, keep: impl Fn(&Value) -> bool) -> BotResult<Vec<D>> {
        let Some(collection) = self.collections.get(collection_name::<D>()) else {
            return Ok(Vec::new());
        };
        collection
            .values()
            .filter(|v| keep(v))
            .map(|v| from_value(v.clone()))
            .collect()
    }
}

fn from_value<D: Document>(value: Value) -> BotResult<D> {
    serde_json::from_value(value).map_err(|e| {
        BotError::store(format!("decode {}: {e}", collection_name::<D>()))
    })
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get_all<D: Document>(&self) -> BotResult<Vec<D>> {
        self.scan(|_| true)
    }

    async fn get_all_by_equals<D: Document>(&self, filters: &[(&str, Value)]) -> BotResult<Vec<D>> {
        self.scan(|doc| {
            filters
                .iter()
                .all(|(field, expected)| doc.get(*field) == Some(expected))
        })
    }

    async fn get_by_snowflake<D: Document>(&self, snowflake: u64) -> BotResult<Option<D>> {
        let value = self
            .collections
            .get(collection_name::<D>())
            .and_then(|c| c.get(&snowflake).cloned());
        value.map(from_value).transpose()
    }

    async fn upsert<D: Document>(&self, document: &D) -> BotResult<()> {
        let value = serde_json::to_value(document).map_err(|e| {
            BotError::store(format!("encode {}: {e}", collection_name::<D>()))
        })?;
        if !value.is_object() {
            return Err(BotError::store(format!(
                "{} documents must serialize to objects",
                collection_name::<D>()
            )));
        }
        self.collections
            .entry(collection_name::<D>())
            .or_default()
            .insert(document.snowflake(), value);
        Ok(())
    }

    async fn delete<D: Document>(&self, snowflake: u64) -> BotResult<bool> {
        Ok(self
            .collections
            .get_mut(collection_name::<D>())
            .is_some_and(|mut c| c.remove(&snowflake).is_some()))
    }
}
