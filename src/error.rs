//! 同步错误分类

use thiserror::Error;

/// 同步过程中的致命错误
///
/// 所有变体都会终止整个同步运行，不做重试。
/// 设置时间戳失败不在此列，只记录警告。
#[derive(Debug, Error)]
pub enum SyncError {
    /// 无法连接远程主机（地址不可达、握手失败、超时）
    #[error("无法连接远程主机 {host}:{port}: {reason}")]
    Connection {
        host: String,
        port: u16,
        reason: String,
    },

    /// 认证被拒绝或私钥不可用
    #[error("用户 {user} 认证失败: {reason}")]
    Authentication { user: String, reason: String },

    /// 缺少必需的连接参数
    #[error("缺少必需参数: --{0}")]
    MissingOption(&'static str),

    /// 构建快照时遍历或 stat 失败
    #[error("扫描 {root} 失败: {reason}")]
    Snapshot { root: String, reason: String },

    /// 打开、复制或创建目录失败
    #[error("传输 {path} 失败: {reason}")]
    Transfer { path: String, reason: String },

    /// 写入字节数与源文件记录的大小不一致
    #[error("复制字节数不一致 - {path}: 源大小 {expected} 实际复制 {actual}")]
    Integrity {
        path: String,
        expected: u64,
        actual: u64,
    },

    /// 遍历得到的路径不在根目录之下
    #[error("路径 {path} 不在根目录 {root} 之下")]
    InvalidPath { root: String, path: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integrity_message_has_both_counts() {
        let err = SyncError::Integrity {
            path: "docs/a.txt".to_string(),
            expected: 10,
            actual: 7,
        };
        let msg = err.to_string();

        assert!(msg.contains("docs/a.txt"));
        assert!(msg.contains("10"));
        assert!(msg.contains('7'));
    }
}
