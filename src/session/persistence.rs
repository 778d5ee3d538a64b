//! 会话持久化
//!
//! 按会话 id 将 {turns, summary} 写入/读出单个 JSON 文件，跨进程恢复会话用。

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::session::Session;

/// 文件持久化：每个会话一个 {id}.json
#[derive(Debug)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, id: &Uuid) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    /// 读取会话；文件不存在时返回 None
    pub fn load(&self, id: &Uuid) -> anyhow::Result<Option<Session>> {
        let path = self.path_for(id);
        if !path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&data)?))
    }

    /// 写入会话；目录不存在时自动创建
    pub fn save(&self, session: &Session) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(&session.id);
        std::fs::write(&path, serde_json::to_string_pretty(session)?)?;
        Ok(())
    }
}
