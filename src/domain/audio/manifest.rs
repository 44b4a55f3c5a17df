//! 文档语音缓存清单
//!
//! 远端文档的 `ttsSummaryParts` 字段保存一个字符串。这里把它解析为有序的
//! `{key, fileId}` 列表，写回时再序列化为 JSON 数组，字段契约保持不变。

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::CacheKey;
use crate::domain::document::FileId;

/// 清单条目：缓存 key → 合成音频文件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub key: CacheKey,
    #[serde(rename = "fileId")]
    pub file_id: FileId,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// 兼容的字段格式
#[derive(Deserialize)]
#[serde(untagged)]
enum RawManifest {
    Entries(Vec<ManifestEntry>),
    /// 早期格式：{ "<key>": "<fileId>" }
    Legacy(BTreeMap<String, String>),
}

/// 语音缓存清单
///
/// 不变量:
/// - 每个 key 至多出现一次
/// - 条目按写入时间排序，最旧的在最前
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudioManifest {
    entries: Vec<ManifestEntry>,
}

impl AudioManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// 解析字段内容
    ///
    /// 空字符串得到空清单；无法解析的内容同样视为空清单（记录日志，不报错）。
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            return Self::new();
        }

        let entries = match serde_json::from_str::<RawManifest>(raw) {
            Ok(RawManifest::Entries(entries)) => entries,
            Ok(RawManifest::Legacy(map)) => map
                .into_iter()
                .filter_map(|(key, file_id)| {
                    FileId::new(file_id).ok().map(|file_id| ManifestEntry {
                        key: CacheKey::from_raw(key),
                        file_id,
                        created_at: None,
                    })
                })
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "Unreadable audio manifest, treating as empty");
                return Self::new();
            }
        };

        let mut manifest = Self::new();
        for entry in entries {
            if entry.key.as_str().is_empty() || entry.file_id.as_str().trim().is_empty() {
                continue;
            }
            manifest.entries.retain(|e| e.key != entry.key);
            manifest.entries.push(entry);
        }
        manifest
    }

    /// 序列化为字段内容（空清单写回空字符串）
    pub fn to_field(&self) -> String {
        if self.entries.is_empty() {
            return String::new();
        }
        serde_json::to_string(&self.entries).unwrap_or_default()
    }

    pub fn lookup(&self, key: &CacheKey) -> Option<&ManifestEntry> {
        self.entries.iter().find(|e| &e.key == key)
    }

    /// 写入或替换条目，并按容量淘汰最旧的条目
    ///
    /// 返回被替换或淘汰的条目（其音频文件不再被引用）。
    pub fn upsert(&mut self, key: CacheKey, file_id: FileId, max_entries: usize) -> Vec<ManifestEntry> {
        let mut released = Vec::new();
        if let Some(pos) = self.entries.iter().position(|e| e.key == key) {
            let old = self.entries.remove(pos);
            if old.file_id != file_id {
                released.push(old);
            }
        }

        self.entries.push(ManifestEntry {
            key,
            file_id,
            created_at: Some(Utc::now()),
        });

        let max_entries = max_entries.max(1);
        if self.entries.len() > max_entries {
            let overflow = self.entries.len() - max_entries;
            released.extend(self.entries.drain(..overflow));
        }
        released
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn file_ids(&self) -> impl Iterator<Item = &FileId> {
        self.entries.iter().map(|e| &e.file_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
