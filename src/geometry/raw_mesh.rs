//! 原始网格数据模块
//!
//! 解析阶段逐面构建的可变数据：每种属性一个扁平数组，每种属性一条
//! 独立的索引流。索引流按面角点（三角化之后）一一对应，长度始终相同；
//! 缺失的属性用占位索引 `0` 保持同步，下游阶段只通过"数组是否为空"
//! 判断属性是否存在。
//!
//! 生命周期：解析时创建并填充，法线/切线合成与顶点编译阶段只读消费，
//! 编译完成后丢弃。

use crate::core::error::ParseError;

/// 面角点的属性索引（均为 0 起始）
///
/// 未出现在面记录中的属性为 `None`。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Corner {
    pub position: u32,
    pub texcoord: Option<u32>,
    pub normal: Option<u32>,
}

/// 原始网格数据
///
/// 各属性数组的步长：
/// - `positions`: `position_size`（3 或 4）
/// - `normals`: 3
/// - `texcoords`: `texcoord_size`（2 或 3）
/// - `tangents`: 3
/// - `colors`: `color_size`（3 或 4）
#[derive(Debug, Clone)]
pub struct RawMesh {
    pub positions: Vec<f32>,
    pub normals: Vec<f32>,
    pub texcoords: Vec<f32>,
    pub tangents: Vec<f32>,
    pub colors: Vec<f32>,

    pub position_index: Vec<u32>,
    pub normal_index: Vec<u32>,
    pub texcoord_index: Vec<u32>,
    pub tangent_index: Vec<u32>,
    pub color_index: Vec<u32>,

    pub position_size: usize,
    pub texcoord_size: usize,
    pub color_size: usize,
}

impl Default for RawMesh {
    fn default() -> Self {
        Self::new()
    }
}

impl RawMesh {
    /// 创建一个空的原始网格
    pub fn new() -> Self {
        Self {
            positions: Vec::new(),
            normals: Vec::new(),
            texcoords: Vec::new(),
            tangents: Vec::new(),
            colors: Vec::new(),
            position_index: Vec::new(),
            normal_index: Vec::new(),
            texcoord_index: Vec::new(),
            tangent_index: Vec::new(),
            color_index: Vec::new(),
            position_size: 3,
            texcoord_size: 2,
            color_size: 3,
        }
    }

    #[inline]
    pub fn has_normals(&self) -> bool {
        !self.normals.is_empty()
    }

    #[inline]
    pub fn has_texcoords(&self) -> bool {
        !self.texcoords.is_empty()
    }

    #[inline]
    pub fn has_tangents(&self) -> bool {
        !self.tangents.is_empty()
    }

    #[inline]
    pub fn has_colors(&self) -> bool {
        !self.colors.is_empty()
    }

    /// 位置元素个数
    #[inline]
    pub fn position_count(&self) -> usize {
        self.positions.len() / self.position_size
    }

    /// 纹理坐标元素个数
    #[inline]
    pub fn texcoord_count(&self) -> usize {
        self.texcoords.len() / self.texcoord_size
    }

    /// 法线元素个数
    #[inline]
    pub fn normal_count(&self) -> usize {
        self.normals.len() / 3
    }

    /// 面角点个数
    #[inline]
    pub fn corner_count(&self) -> usize {
        self.position_index.len()
    }

    /// 三角形个数
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.position_index.len() / 3
    }

    /// 追加一个三角形
    ///
    /// 每个角点都会向所有索引流写入一项；缺失属性写入占位索引 0。
    /// 颜色索引流与位置索引流一致。
    pub fn push_triangle(&mut self, corners: [Corner; 3]) {
        for corner in corners {
            self.position_index.push(corner.position);
            self.texcoord_index.push(corner.texcoord.unwrap_or(0));
            self.normal_index.push(corner.normal.unwrap_or(0));
            self.color_index.push(corner.position);
        }
    }

    /// 扇形三角化一个多边形面
    ///
    /// N 个角点产生 N-2 个三角形 `(0, i, i+1)`，保持原始绕序。
    pub fn push_polygon(&mut self, corners: &[Corner]) {
        for i in 1..corners.len().saturating_sub(1) {
            self.push_triangle([corners[0], corners[i], corners[i + 1]]);
        }
    }

    /// 检查所有非空索引流都在对应属性数组范围内
    pub fn validate_indices(&self) -> Result<(), ParseError> {
        let streams: [(&'static str, &[u32], usize); 5] = [
            ("position", &self.position_index, self.position_count()),
            ("normal", &self.normal_index, self.normal_count()),
            ("texcoord", &self.texcoord_index, self.texcoord_count()),
            ("tangent", &self.tangent_index, self.tangents.len() / 3),
            ("color", &self.color_index, self.colors.len() / self.color_size.max(1)),
        ];

        // 空索引流表示该属性不存在
        for (attribute, indices, count) in streams {
            if let Some(&index) = indices.iter().find(|&&i| i as usize >= count) {
                return Err(ParseError::IndexOutOfRange { attribute, index, count });
            }
        }

        Ok(())
    }

    /// 剔除退化三角形
    ///
    /// 任意两个角点的位置索引相同的三角形会从所有非空索引流中删除。
    /// 返回删除的三角形个数。
    pub fn remove_degenerate_triangles(&mut self) -> usize {
        let triangle_count = self.triangle_count();
        let keep: Vec<bool> = self
            .position_index
            .chunks_exact(3)
            .map(|t| t[0] != t[1] && t[0] != t[2] && t[1] != t[2])
            .collect();

        let removed = keep.iter().filter(|&&k| !k).count();
        if removed == 0 {
            return 0;
        }

        let retain = |stream: &mut Vec<u32>| {
            if stream.len() != triangle_count * 3 {
                return;
            }
            let mut write = 0;
            for (tri, &kept) in keep.iter().enumerate() {
                if kept {
                    stream.copy_within(tri * 3..tri * 3 + 3, write);
                    write += 3;
                }
            }
            stream.truncate(write);
        };

        retain(&mut self.position_index);
        retain(&mut self.normal_index);
        retain(&mut self.texcoord_index);
        retain(&mut self.tangent_index);
        retain(&mut self.color_index);

        removed
    }

    /// 轴对齐包围盒
    ///
    /// 遍历所有原始位置（跳过齐次 w 分量），种子为 ±∞。
    pub fn bounding_box(&self) -> ([f32; 3], [f32; 3]) {
        let mut min = [f32::INFINITY; 3];
        let mut max = [f32::NEG_INFINITY; 3];

        for p in self.positions.chunks_exact(self.position_size) {
            for axis in 0..3 {
                min[axis] = min[axis].min(p[axis]);
                max[axis] = max[axis].max(p[axis]);
            }
        }

        (min, max)
    }

    /// 把模型缩放到目标半径并居中到原点
    ///
    /// 半径取包围盒三个半轴长度中的最大值；w 分量不变。
    /// 返回 `false` 表示半径为零、无法缩放。
    pub fn rescale(&mut self, target_radius: f32) -> bool {
        if self.positions.is_empty() {
            return true;
        }

        let (min, max) = self.bounding_box();
        let half = [
            0.5 * (max[0] - min[0]),
            0.5 * (max[1] - min[1]),
            0.5 * (max[2] - min[2]),
        ];
        let center = [min[0] + half[0], min[1] + half[1], min[2] + half[2]];
        let old_radius = half[0].max(half[1]).max(half[2]);

        if !(old_radius > 0.0) {
            return false;
        }

        let scale = target_radius / old_radius;
        for p in self.positions.chunks_exact_mut(self.position_size) {
            for axis in 0..3 {
                p[axis] = (p[axis] - center[axis]) * scale;
            }
        }

        true
    }
}
