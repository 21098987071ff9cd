//! 有界日志：新条目在前，超出容量时淘汰最旧的条目。
//!
//! 护理端的发话日志 (容量 100) 与患者端的会话历史 (容量 50) 都使用这个结构。

use std::collections::VecDeque;

use serde::Serialize;

/// 容量固定的环形缓冲，按"最新在前"的顺序保存条目。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundedLog<T> {
    // 队首是最新的条目
    entries: VecDeque<T>,
    #[serde(skip)]
    capacity: usize,
}

impl<T> BoundedLog<T> {
    /// 创建一个空日志。`capacity` 为 0 时会被提升为 1。
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// 在最前面插入一条新条目。若超出容量，返回被淘汰的最旧条目。
    pub fn push_newest(&mut self, entry: T) -> Option<T> {
        self.entries.push_front(entry);
        if self.entries.len() > self.capacity {
            self.entries.pop_back()
        } else {
            None
        }
    }

    /// 最新的条目。
    pub fn newest(&self) -> Option<&T> {
        self.entries.front()
    }

    /// 按"最新在前"的顺序遍历。
    pub fn iter_newest_first(&self) -> impl DoubleEndedIterator<Item = &T> + '_ {
        self.entries.iter()
    }

    /// 按"最旧在前" (时间顺序) 遍历。
    pub fn iter_oldest_first(&self) -> impl Iterator<Item = &T> + '_ {
        self.entries.iter().rev()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<T: Clone> BoundedLog<T> {
    /// 以"最新在前"的顺序复制出全部条目。
    pub fn to_vec_newest_first(&self) -> Vec<T> {
        self.entries.iter().cloned().collect()
    }
}
