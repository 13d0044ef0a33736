use thiserror::Error;

/// 应用程序错误类型
///
/// 对外入口（录题 / 导入）只返回这一种错误，调用方按变体区分处理方式
#[derive(Debug, Error)]
pub enum AppError {
    /// 字段缺失或格式错误，不会产生任何写入
    #[error("校验错误: {0}")]
    Validation(#[from] ValidationError),
    /// 引用的试卷 / 题目不存在
    #[error("未找到: {0}")]
    NotFound(#[from] NotFoundError),
    /// 题库读写失败
    #[error("题库错误: {0}")]
    BankWrite(#[from] BankWriteError),
    /// 试卷侧存储失败
    #[error("存储错误: {0}")]
    Store(#[from] StoreError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 校验错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// 必填字段缺失
    #[error("必填字段缺失: {field}")]
    MissingField { field: &'static str },
    /// 字段格式错误
    #[error("字段 {field} 格式错误 (值: '{value}'): {reason}")]
    Malformed {
        field: &'static str,
        value: String,
        reason: String,
    },
    /// 编程题至少需要一个测试用例
    #[error("编程题至少需要一个测试用例")]
    NoTestCases,
    /// 选择题至少需要一个选项
    #[error("选择题至少需要一个选项")]
    NoOptions,
    /// 编辑时不允许修改题型
    #[error("题型不允许修改: {from} -> {to}")]
    KindChanged { from: String, to: String },
}

/// 资源不存在错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotFoundError {
    /// 试卷不存在
    #[error("试卷不存在: {id}")]
    Exam { id: String },
    /// 题库题目不存在
    #[error("题库题目不存在: {id}")]
    Canonical { id: String },
    /// 试卷题目不存在
    #[error("试卷题目不存在: {id}")]
    ExamQuestion { id: String },
}

/// 题库写入 / 查询失败
#[derive(Debug, Error)]
#[error("题库操作 {operation} 失败: {source}")]
pub struct BankWriteError {
    pub operation: &'static str,
    #[source]
    pub source: StoreError,
}

impl BankWriteError {
    pub fn new(operation: &'static str, source: StoreError) -> Self {
        Self { operation, source }
    }

    /// 是否为瞬时故障（超时 / 不可用），调用方可以稍后重试
    pub fn is_transient(&self) -> bool {
        self.source.is_transient()
    }
}

/// 文档存储错误
#[derive(Debug, Error)]
pub enum StoreError {
    /// 违反唯一索引
    #[error("集合 {collection} 唯一索引冲突 (已存在: {existing_id})")]
    Conflict {
        collection: String,
        existing_id: String,
    },
    /// 按 ID 更新的文档不存在
    #[error("集合 {collection} 中不存在文档 {id}")]
    Missing { collection: String, id: String },
    /// 字段不是数组
    #[error("集合 {collection} 文档 {id} 的字段 {field} 不是数组")]
    NotAnArray {
        collection: String,
        id: String,
        field: String,
    },
    /// 调用超时
    #[error("存储调用 {operation} 超时 ({millis}ms)")]
    Timeout { operation: &'static str, millis: u64 },
    /// 存储不可用
    #[error("存储不可用: {0}")]
    Unavailable(String),
    /// 文档与模型不匹配
    #[error("文档序列化失败: {0}")]
    Serialization(#[from] serde_json::Error),
    /// 快照读写失败
    #[error("快照文件读写失败: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Timeout { .. } | StoreError::Unavailable(_))
    }
}

/// 配置错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// 配置值不合法
    #[error("配置项 {name} 不合法: {reason}")]
    Invalid { name: &'static str, reason: String },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建试卷不存在错误
    pub fn exam_not_found(id: impl Into<String>) -> Self {
        AppError::NotFound(NotFoundError::Exam { id: id.into() })
    }

    /// 创建试卷题目不存在错误
    pub fn exam_question_not_found(id: impl Into<String>) -> Self {
        AppError::NotFound(NotFoundError::ExamQuestion { id: id.into() })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
