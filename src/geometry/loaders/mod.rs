/// 模型加载器模块
///
/// 提供统一的模型加载接口和各种格式的具体实现。
///
/// # 支持的格式
///
/// - **OBJ**: Wavefront OBJ 文本格式（内置解析器）
/// - **NVM**: 预编译的二进制模型容器（`NVMB` 魔数）
///
/// # 使用示例
///
/// ```rust,no_run
/// use dist_model::geometry::loaders::{ModelLoader, ObjLoader};
/// use std::path::Path;
///
/// let model = ObjLoader::load_from_file(Path::new("model.obj"))?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
use crate::core::error::{DistModelError, MeshLoadError, Result};
use crate::geometry::compiler::PrimitiveMask;
use crate::geometry::model::ModelAsset;
use std::path::Path;

pub mod nvm_loader;
pub mod obj_loader;

// 重新导出加载器
pub use nvm_loader::NvmLoader;
pub use obj_loader::ObjLoader;

/// 文本模型的加载选项
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadOptions {
    /// 缩放目标半径；小于 0 表示不缩放
    pub target_radius: f32,

    /// 缺少法线时合成法线
    pub compute_normals: bool,

    /// 合成切线（同时会合成法线）
    pub compute_tangents: bool,

    /// 编译前剔除退化三角形
    pub remove_degenerate: bool,

    /// 需要生成的图元拓扑
    pub primitives: PrimitiveMask,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            target_radius: -1.0,
            compute_normals: false,
            compute_tangents: false,
            remove_degenerate: false,
            primitives: PrimitiveMask::TRIANGLES,
        }
    }
}

/// 模型加载器 trait
///
/// 定义统一的加载接口，所有格式的加载器都实现此 trait。
///
/// # 实现要求
///
/// - 加载器是无状态的（使用关联函数）
/// - 返回 CPU 侧的 `ModelAsset`，失败时不返回部分构建的模型
pub trait ModelLoader {
    /// 从文件路径加载模型
    ///
    /// # 错误
    ///
    /// - 文件不存在或无法读取
    /// - 文件格式错误或损坏
    fn load_from_file(path: &Path) -> Result<ModelAsset>;

    /// 从内存数据加载模型
    fn load_from_memory(data: &[u8]) -> Result<ModelAsset>;

    /// 获取支持的文件扩展名列表（小写，不含点号）
    fn supported_extensions() -> &'static [&'static str];
}

/// 从 OBJ 文本加载模型
///
/// # 参数
///
/// - `buffer`: OBJ 文本内容
/// - `target_radius`: 缩放目标半径，小于 0 表示不缩放
/// - `compute_normals`: 缺少法线时合成法线
/// - `compute_tangents`: 合成切线
pub fn load_from_text(
    buffer: &[u8],
    target_radius: f32,
    compute_normals: bool,
    compute_tangents: bool,
) -> Result<ModelAsset> {
    let options = LoadOptions {
        target_radius,
        compute_normals,
        compute_tangents,
        ..Default::default()
    };
    ObjLoader::load_with_options(buffer, &options)
}

/// 从二进制容器加载模型
pub fn load_from_binary(buffer: &[u8]) -> Result<ModelAsset> {
    nvm_loader::decode(buffer)
}

/// 把模型写入二进制容器文件
pub fn save_to_binary(asset: &ModelAsset, path: &Path) -> Result<()> {
    nvm_loader::save_to_file(asset, path)
}

/// 根据文件扩展名选择合适的加载器（使用默认选项）
///
/// # 示例
///
/// ```rust,no_run
/// use dist_model::geometry::loaders::load_model;
/// use std::path::Path;
///
/// let model = load_model(Path::new("model.obj"))?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn load_model(path: &Path) -> Result<ModelAsset> {
    load_model_with_options(path, &LoadOptions::default())
}

/// 根据文件扩展名选择加载器
///
/// `options` 只作用于文本格式；二进制容器已经是编译结果。
pub fn load_model_with_options(path: &Path, options: &LoadOptions) -> Result<ModelAsset> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .ok_or_else(|| {
            DistModelError::MeshLoading(MeshLoadError::UnsupportedFormat(
                "无法确定文件扩展名".to_string(),
            ))
        })?;

    if ObjLoader::supported_extensions().contains(&extension.as_str()) {
        ObjLoader::load_file_with_options(path, options)
    } else if NvmLoader::supported_extensions().contains(&extension.as_str()) {
        NvmLoader::load_from_file(path)
    } else {
        Err(DistModelError::MeshLoading(MeshLoadError::UnsupportedFormat(format!(
            "不支持的文件格式: .{}",
            extension
        ))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_extensions() {
        let obj_exts = ObjLoader::supported_extensions();
        assert!(obj_exts.contains(&"obj"));

        let nvm_exts = NvmLoader::supported_extensions();
        assert!(nvm_exts.contains(&"nvm"));
    }

    #[test]
    fn test_unsupported_extension() {
        let result = load_model(Path::new("model.fbx"));
        assert!(matches!(
            result,
            Err(DistModelError::MeshLoading(MeshLoadError::UnsupportedFormat(_)))
        ));

        assert!(load_model(Path::new("no_extension")).is_err());
    }

    #[test]
    fn test_default_options() {
        let options = LoadOptions::default();
        assert!(options.target_radius < 0.0);
        assert!(!options.compute_normals);
        assert_eq!(options.primitives, PrimitiveMask::TRIANGLES);
    }

    #[test]
    fn test_text_binary_round_trip() {
        let text = b"v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nvt 0 0\nvt 1 0\nvt 1 1\nvt 0 1\n\
                     f 1/1 2/2 3/3 4/4\n";
        let asset = load_from_text(text, 2.0, true, true).unwrap();

        let path = std::env::temp_dir().join(format!("dist_model_round_trip_{}.nvm", std::process::id()));
        save_to_binary(&asset, &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let decoded = load_from_binary(&bytes).unwrap();
        assert_eq!(decoded, asset);

        let by_extension = load_model(&path).unwrap();
        assert_eq!(by_extension, asset);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_model_obj_file() {
        let path = std::env::temp_dir().join(format!("dist_model_load_{}.obj", std::process::id()));
        std::fs::write(&path, "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();

        let options = LoadOptions {
            compute_normals: true,
            ..Default::default()
        };
        let model = load_model_with_options(&path, &options).unwrap();
        assert_eq!(model.vertex_count(), 3);
        assert_eq!(model.vertex_stride(), 6);

        std::fs::remove_file(&path).ok();
    }
}
