//! 错误处理模块
//!
//! 定义了模型管线中使用的统一错误类型。
//!
//! # 设计原则
//!
//! - 手写 `Display` 与 `Error` 实现，不依赖派生宏
//! - 为每种错误类型提供清晰的上下文信息（行号、索引、期望值）
//! - 支持错误链（error source）
//! - 致命错误与非致命诊断（[`LoadWarning`]）分开

use std::fmt;
use std::path::PathBuf;

/// 统一的 Result 类型
///
/// 所有可能返回错误的函数都应该使用这个类型。
pub type Result<T> = std::result::Result<T, DistModelError>;

/// dist_model 的错误类型
///
/// 一次加载失败只会产生一个错误，不会返回部分构建的模型。
#[derive(Debug)]
pub enum DistModelError {
    /// 配置错误
    Config(ConfigError),

    /// 文本模型解析错误
    Parse(ParseError),

    /// 二进制容器格式错误
    Format(FormatError),

    /// 网格加载错误
    MeshLoading(MeshLoadError),

    /// IO 错误
    Io(std::io::Error),

    /// 日志系统错误
    Log(String),
}

/// 配置相关的错误
#[derive(Debug)]
pub enum ConfigError {
    /// 配置文件未找到
    FileNotFound(String),

    /// 配置文件解析失败
    ParseError(String),

    /// 配置值无效
    InvalidValue { field: String, reason: String },
}

/// 解析 OBJ 文本时的错误
///
/// 行号从 1 开始计数。
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// 数值记录中的浮点数无法解析或数量不对
    InvalidNumber { line: usize, token: String },

    /// 面记录的分隔符模式与首个角点不一致
    MalformedFace { line: usize, reason: String },

    /// 面记录少于 3 个角点
    TruncatedFace { line: usize, corners: usize },

    /// 面记录中出现了索引 0
    InvalidIndex { line: usize, index: i64 },

    /// 面引用了不存在的属性元素
    IndexOutOfRange {
        attribute: &'static str,
        index: u32,
        count: usize,
    },
}

/// 二进制 NVM 容器的错误
#[derive(Debug, Clone, PartialEq)]
pub enum FormatError {
    /// 魔数不是 `NVMB`
    BadMagic([u8; 4]),

    /// 头部大小与当前结构体不符
    HeaderSize { expected: u32, found: u32 },

    /// 不支持的格式版本
    Version { expected: u32, found: u32 },

    /// 索引字节大小不是 4
    IndexSize(u32),

    /// 数据长度不足
    Truncated { expected: usize, found: usize },

    /// 头部描述的顶点布局无效
    InvalidLayout(String),
}

/// 网格加载相关的错误
#[derive(Debug)]
pub enum MeshLoadError {
    /// 文件不存在
    FileNotFound(PathBuf),

    /// 不支持的文件格式
    UnsupportedFormat(String),

    /// 数据验证失败
    ValidationError(String),
}

/// 加载过程中的非致命诊断
///
/// 退化输入不会让加载失败，但会记录下来并通过 `tracing::warn!` 输出，
/// 避免 NaN/Inf 悄悄进入顶点缓冲。三角形序号从 0 开始。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadWarning {
    /// 零面积三角形，不参与法线累加
    DegenerateFace { triangle: usize },

    /// UV 行列式为零的三角形，不参与切线累加
    DegenerateTexCoords { triangle: usize },

    /// 累加后长度为零的法线槽位
    ZeroLengthNormal { slot: usize },

    /// 累加后长度为零的切线槽位
    ZeroLengthTangent { slot: usize },

    /// 包围盒半径为零，跳过缩放
    DegenerateExtent,
}

impl fmt::Display for DistModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistModelError::Config(e) => write!(f, "Configuration error: {}", e),
            DistModelError::Parse(e) => write!(f, "Parse error: {}", e),
            DistModelError::Format(e) => write!(f, "Binary format error: {}", e),
            DistModelError::MeshLoading(e) => write!(f, "Mesh loading error: {}", e),
            DistModelError::Io(e) => write!(f, "IO error: {}", e),
            DistModelError::Log(msg) => write!(f, "Log error: {}", msg),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {}", path),
            ConfigError::ParseError(msg) => write!(f, "Failed to parse config: {}", msg),
            ConfigError::InvalidValue { field, reason } => {
                write!(f, "Invalid value for '{}': {}", field, reason)
            }
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::InvalidNumber { line, token } => {
                write!(f, "line {}: invalid numeric value '{}'", line, token)
            }
            ParseError::MalformedFace { line, reason } => {
                write!(f, "line {}: malformed face record: {}", line, reason)
            }
            ParseError::TruncatedFace { line, corners } => {
                write!(f, "line {}: face has {} corners, at least 3 required", line, corners)
            }
            ParseError::InvalidIndex { line, index } => {
                write!(f, "line {}: invalid face index {}", line, index)
            }
            ParseError::IndexOutOfRange { attribute, index, count } => write!(
                f,
                "{} index {} out of range ({} defined)",
                attribute, index, count
            ),
        }
    }
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatError::BadMagic(magic) => write!(f, "bad magic {:?}", magic),
            FormatError::HeaderSize { expected, found } => {
                write!(f, "header size {} does not match {}", found, expected)
            }
            FormatError::Version { expected, found } => {
                write!(f, "unsupported version {} (expected {})", found, expected)
            }
            FormatError::IndexSize(size) => write!(f, "unsupported index size {}", size),
            FormatError::Truncated { expected, found } => {
                write!(f, "data truncated: need {} bytes, got {}", expected, found)
            }
            FormatError::InvalidLayout(msg) => write!(f, "invalid vertex layout: {}", msg),
        }
    }
}

impl fmt::Display for MeshLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeshLoadError::FileNotFound(path) => write!(f, "Mesh file not found: {}", path.display()),
            MeshLoadError::UnsupportedFormat(msg) => write!(f, "Unsupported mesh format: {}", msg),
            MeshLoadError::ValidationError(msg) => write!(f, "Mesh validation failed: {}", msg),
        }
    }
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadWarning::DegenerateFace { triangle } => {
                write!(f, "triangle {} has zero area", triangle)
            }
            LoadWarning::DegenerateTexCoords { triangle } => {
                write!(f, "triangle {} has degenerate texture coordinates", triangle)
            }
            LoadWarning::ZeroLengthNormal { slot } => write!(f, "normal {} has zero length", slot),
            LoadWarning::ZeroLengthTangent { slot } => write!(f, "tangent {} has zero length", slot),
            LoadWarning::DegenerateExtent => write!(f, "bounding box has zero radius"),
        }
    }
}

impl std::error::Error for DistModelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DistModelError::Io(e) => Some(e),
            DistModelError::Parse(e) => Some(e),
            DistModelError::Format(e) => Some(e),
            _ => None,
        }
    }
}

impl std::error::Error for ConfigError {}
impl std::error::Error for ParseError {}
impl std::error::Error for FormatError {}
impl std::error::Error for MeshLoadError {}

// 实现 From trait 以便于错误转换
impl From<std::io::Error> for DistModelError {
    fn from(err: std::io::Error) -> Self {
        DistModelError::Io(err)
    }
}

impl From<ConfigError> for DistModelError {
    fn from(err: ConfigError) -> Self {
        DistModelError::Config(err)
    }
}

impl From<ParseError> for DistModelError {
    fn from(err: ParseError) -> Self {
        DistModelError::Parse(err)
    }
}

impl From<FormatError> for DistModelError {
    fn from(err: FormatError) -> Self {
        DistModelError::Format(err)
    }
}

impl From<MeshLoadError> for DistModelError {
    fn from(err: MeshLoadError) -> Self {
        DistModelError::MeshLoading(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err: DistModelError = ParseError::TruncatedFace { line: 7, corners: 2 }.into();
        let msg = err.to_string();
        assert!(msg.contains("line 7"));
        assert!(msg.contains("2 corners"));
    }

    #[test]
    fn test_format_error_source() {
        use std::error::Error;

        let err: DistModelError = FormatError::IndexSize(2).into();
        assert!(err.source().is_some());
        assert!(matches!(err, DistModelError::Format(FormatError::IndexSize(2))));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: DistModelError = io.into();
        assert!(matches!(err, DistModelError::Io(_)));
    }
}
