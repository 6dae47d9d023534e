/// 几何体加载和处理模块
///
/// 提供 3D 模型的解析、属性合成、顶点编译和二进制存取功能。
///
/// # 模块结构
///
/// - `tokenizer`: 文本分词器
/// - `raw_mesh`: 解析阶段的原始网格（每种属性一条索引流）
/// - `math_utils`: 几何数学工具（法线重建、切线计算）
/// - `compiler`: 顶点去重与图元拓扑生成
/// - `vertex`: 交错顶点布局
/// - `model`: 编译后的模型
/// - `loaders`: 各种格式的模型加载器
///
/// # 架构设计
///
/// ```text
/// 文件 (OBJ)
///     ↓
/// ObjLoader::parse → RawMesh
///     ↓
/// compute_normals / compute_tangents / rescale
///     ↓
/// compile → ModelAsset ⇄ NVM 二进制
/// ```
///
/// # 使用示例
///
/// ```rust,no_run
/// use dist_model::geometry::loaders::{ModelLoader, ObjLoader};
/// use std::path::Path;
///
/// // 加载OBJ模型
/// let model = ObjLoader::load_from_file(Path::new("model.obj"))?;
///
/// println!("顶点数: {}", model.vertex_count());
/// println!("三角形数: {}", model.triangle_count());
///
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```

pub mod tokenizer;
pub mod raw_mesh;
pub mod math_utils;
pub mod compiler;
pub mod vertex;
pub mod model;
pub mod loaders;

// 重新导出常用类型
pub use compiler::{compile, PrimitiveMask};
pub use model::ModelAsset;
pub use raw_mesh::RawMesh;
pub use vertex::{VertexAttribute, VertexLayout};
