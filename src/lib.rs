//! dist_model - 模型加载与编译库
//!
//! 把 Wavefront OBJ 文本解析为原始网格，按需合成法线与切线，
//! 再编译为单一索引的交错顶点缓冲；编译结果可以保存为 NVM 二进制容器，
//! 之后无需重新解析即可直接加载。
//!
//! # 模块结构
//!
//! - `core`: 核心功能模块（日志、配置、错误处理）
//! - `math`: 向量类型与扁平数组辅助函数
//! - `geometry`: 分词器、原始网格、属性合成、顶点编译与加载器
//!
//! # 使用示例
//!
//! ```no_run
//! use dist_model::geometry::loaders::{load_from_text, save_to_binary};
//! use std::path::Path;
//!
//! let text = std::fs::read("bunny.obj")?;
//! let model = load_from_text(&text, 1.0, true, false)?;
//! save_to_binary(&model, Path::new("bunny.nvm"))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod core;
pub mod geometry;
pub mod math;
