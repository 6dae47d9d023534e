//! 配置管理模块
//!
//! 提供模型转换工具配置的加载、解析和管理功能。
//! 支持从 TOML 配置文件加载，也支持命令行参数覆盖。
//!
//! # 配置文件格式 (dist_model.toml)
//!
//! ```toml
//! [loader]
//! target_radius = -1.0        # 小于 0 表示不缩放
//! compute_normals = true
//! compute_tangents = false
//! remove_degenerate = false
//! primitives = ["triangles"]  # points, edges, triangles, triangles_with_adjacency
//!
//! [output]
//! directory = ""              # 为空时输出到输入文件旁边
//!
//! [logging]
//! level = "info"              # trace, debug, info, warn, error
//! file_output = false
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::error::{ConfigError, Result};
use crate::geometry::compiler::PrimitiveMask;
use crate::geometry::loaders::LoadOptions;

/// 工具配置
///
/// 包含了加载、输出和日志所需的所有配置项。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// 加载器配置
    #[serde(default)]
    pub loader: LoaderConfig,

    /// 输出配置
    #[serde(default)]
    pub output: OutputConfig,

    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 加载器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// 目标半径，小于 0 表示不缩放
    #[serde(default = "default_target_radius")]
    pub target_radius: f32,

    /// 是否重建缺失的法线
    #[serde(default)]
    pub compute_normals: bool,

    /// 是否计算 S 方向切线
    #[serde(default)]
    pub compute_tangents: bool,

    /// 是否剔除退化三角形
    #[serde(default)]
    pub remove_degenerate: bool,

    /// 需要生成的图元拓扑
    #[serde(default = "default_primitives")]
    pub primitives: Vec<PrimitiveKind>,
}

/// 图元拓扑类型（配置文件中的写法）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveKind {
    Points,
    Edges,
    Triangles,
    TrianglesWithAdjacency,
}

/// 输出配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// 输出目录，为空时写到输入文件所在目录
    #[serde(default)]
    pub directory: String,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// 是否输出到文件
    #[serde(default = "default_file_output")]
    pub file_output: bool,

    /// 日志文件路径
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

// 默认值函数
fn default_target_radius() -> f32 { -1.0 }
fn default_primitives() -> Vec<PrimitiveKind> { vec![PrimitiveKind::Triangles] }
fn default_log_level() -> LogLevel { LogLevel::Info }
fn default_file_output() -> bool { false }
fn default_log_file() -> String { "dist_model.log".to_string() }

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            target_radius: default_target_radius(),
            compute_normals: false,
            compute_tangents: false,
            remove_degenerate: false,
            primitives: default_primitives(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_output: default_file_output(),
            log_file: default_log_file(),
        }
    }
}

impl From<PrimitiveKind> for PrimitiveMask {
    fn from(kind: PrimitiveKind) -> Self {
        match kind {
            PrimitiveKind::Points => PrimitiveMask::POINTS,
            PrimitiveKind::Edges => PrimitiveMask::EDGES,
            PrimitiveKind::Triangles => PrimitiveMask::TRIANGLES,
            PrimitiveKind::TrianglesWithAdjacency => PrimitiveMask::TRIANGLES_WITH_ADJACENCY,
        }
    }
}

impl LoaderConfig {
    /// 转换为加载器选项
    pub fn to_load_options(&self) -> LoadOptions {
        let primitives = self
            .primitives
            .iter()
            .fold(PrimitiveMask::empty(), |mask, &kind| mask | PrimitiveMask::from(kind));

        LoadOptions {
            target_radius: self.target_radius,
            compute_normals: self.compute_normals,
            compute_tangents: self.compute_tangents,
            remove_degenerate: self.remove_degenerate,
            primitives,
        }
    }
}

impl Config {
    /// 从配置文件加载
    ///
    /// # 参数
    ///
    /// * `path` - 配置文件路径
    ///
    /// # 返回值
    ///
    /// 成功返回 `Config` 实例，失败返回错误
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let contents = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path_str.clone()))?;

        Self::from_toml_str(&contents)
    }

    /// 从 TOML 字符串解析
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()).into())
    }

    /// 从配置文件加载，如果文件不存在则使用默认配置
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!("Using default configuration: {}", e);
                Self::default()
            }
        }
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        std::fs::write(path, contents)?;
        Ok(())
    }

    /// 从命令行参数覆盖配置
    ///
    /// # 说明
    ///
    /// 支持的参数：
    /// - `--normals`: 重建缺失的法线
    /// - `--tangents`: 计算切线
    /// - `--radius <value>`: 目标半径
    /// - `--remove-degenerate`: 剔除退化三角形
    /// - `--adjacency` / `--edges` / `--points`: 追加图元拓扑
    /// - `--out-dir <dir>`: 输出目录
    pub fn apply_args<I>(&mut self, args: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|s| s.as_ref().to_string()).collect();

        if args.iter().any(|a| a == "--normals") {
            self.loader.compute_normals = true;
        }

        if args.iter().any(|a| a == "--tangents") {
            self.loader.compute_tangents = true;
        }

        if args.iter().any(|a| a == "--remove-degenerate") {
            self.loader.remove_degenerate = true;
        }

        for (flag, kind) in [
            ("--points", PrimitiveKind::Points),
            ("--edges", PrimitiveKind::Edges),
            ("--adjacency", PrimitiveKind::TrianglesWithAdjacency),
        ] {
            if args.iter().any(|a| a == flag) && !self.loader.primitives.contains(&kind) {
                self.loader.primitives.push(kind);
            }
        }

        if let Some(idx) = args.iter().position(|a| a == "--radius") {
            if let Some(radius_str) = args.get(idx + 1) {
                if let Ok(radius) = radius_str.parse() {
                    self.loader.target_radius = radius;
                }
            }
        }

        if let Some(idx) = args.iter().position(|a| a == "--out-dir") {
            if let Some(dir) = args.get(idx + 1) {
                self.output.directory = dir.clone();
            }
        }
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<()> {
        if !self.loader.target_radius.is_finite() {
            return Err(ConfigError::InvalidValue {
                field: "loader.target_radius".to_string(),
                reason: "Target radius must be a finite number".to_string(),
            }.into());
        }

        if self.loader.primitives.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "loader.primitives".to_string(),
                reason: "At least one primitive topology is required".to_string(),
            }.into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.loader.target_radius, -1.0);
        assert_eq!(config.loader.primitives, vec![PrimitiveKind::Triangles]);
        assert_eq!(config.logging.level, LogLevel::Info);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.loader.primitives.clear();
        assert!(config.validate().is_err());

        config = Config::default();
        config.loader.target_radius = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = Config::from_toml_str(
            r#"
            [loader]
            compute_normals = true
            primitives = ["triangles", "triangles_with_adjacency"]
            "#,
        )
        .unwrap();

        assert!(config.loader.compute_normals);
        assert!(!config.loader.compute_tangents);
        assert_eq!(config.logging.log_file, "dist_model.log");

        let options = config.loader.to_load_options();
        assert!(options.primitives.contains(PrimitiveMask::TRIANGLES));
        assert!(options.primitives.contains(PrimitiveMask::TRIANGLES_WITH_ADJACENCY));
        assert!(!options.primitives.contains(PrimitiveMask::EDGES));
    }

    #[test]
    fn test_apply_args() {
        let mut config = Config::default();
        config.apply_args(["model.obj", "--normals", "--radius", "2.5", "--edges"]);

        assert!(config.loader.compute_normals);
        assert_eq!(config.loader.target_radius, 2.5);
        assert!(config.loader.primitives.contains(&PrimitiveKind::Edges));
    }
}
