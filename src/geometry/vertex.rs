/// 顶点布局定义模块
///
/// 编译后的顶点是交错存储的浮点数组，每个顶点依次包含
/// position、normal、texcoord、tangent、color 五种属性中存在的那些。
/// 与固定结构体不同，属性是否存在由原始网格决定，
/// 因此这里用偏移量 + 分量数描述布局，而不是 `#[repr(C)]` 结构。
///
/// # 内存布局示例
///
/// 位置 (3) + 纹理坐标 (2)：
///
/// ```text
/// | px py pz | u v |   stride = 5 floats = 20 bytes
/// ```

use crate::core::error::FormatError;

/// 顶点属性种类
///
/// 声明顺序即交错缓冲中的字段顺序。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexAttribute {
    Position,
    Normal,
    TexCoord,
    Tangent,
    Color,
}

impl VertexAttribute {
    /// 按缓冲字段顺序排列的全部属性
    pub const ALL: [VertexAttribute; 5] = [
        VertexAttribute::Position,
        VertexAttribute::Normal,
        VertexAttribute::TexCoord,
        VertexAttribute::Tangent,
        VertexAttribute::Color,
    ];

    #[inline]
    fn slot(self) -> usize {
        self as usize
    }

    /// 属性名（用于日志和错误信息）
    pub fn name(self) -> &'static str {
        match self {
            VertexAttribute::Position => "position",
            VertexAttribute::Normal => "normal",
            VertexAttribute::TexCoord => "texcoord",
            VertexAttribute::Tangent => "tangent",
            VertexAttribute::Color => "color",
        }
    }
}

/// 交错顶点布局
///
/// 偏移量与步长都以浮点数个数为单位。缺失属性的偏移量为 `None`，
/// 分量数为 0。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexLayout {
    offsets: [Option<u32>; 5],
    components: [u32; 5],
    stride: u32,
}

impl VertexLayout {
    /// 按固定字段顺序紧密排列的布局
    ///
    /// # 参数
    ///
    /// - `position_size`: 位置分量数（3 或 4）
    /// - `has_normal`: 是否包含法线（3 分量）
    /// - `texcoord_size`: 纹理坐标分量数，0 表示不存在
    /// - `has_tangent`: 是否包含切线（3 分量）
    /// - `color_size`: 颜色分量数，0 表示不存在
    pub fn packed(
        position_size: u32,
        has_normal: bool,
        texcoord_size: u32,
        has_tangent: bool,
        color_size: u32,
    ) -> Self {
        let components = [
            position_size,
            if has_normal { 3 } else { 0 },
            texcoord_size,
            if has_tangent { 3 } else { 0 },
            color_size,
        ];

        let mut offsets = [None; 5];
        let mut stride = 0;
        for (slot, &count) in components.iter().enumerate() {
            if count > 0 {
                offsets[slot] = Some(stride);
                stride += count;
            }
        }

        Self {
            offsets,
            components,
            stride,
        }
    }

    /// 从显式描述构建布局并验证
    ///
    /// 用于二进制头部和外部交错数据。偏移量 `-1` 表示属性不存在；
    /// 法线与切线固定为 3 分量。
    ///
    /// # 错误
    ///
    /// 缺少位置、分量数不合法、偏移为其他负数或属性越出步长时
    /// 返回 [`FormatError::InvalidLayout`]。
    pub fn from_parts(
        stride: u32,
        offsets: [i32; 5],
        position_size: u32,
        texcoord_size: u32,
        color_size: u32,
    ) -> Result<Self, FormatError> {
        let mut layout = Self {
            offsets: [None; 5],
            components: [0; 5],
            stride,
        };

        for attribute in VertexAttribute::ALL {
            let slot = attribute.slot();
            let offset = match offsets[slot] {
                -1 => continue,
                o if o < 0 => {
                    return Err(FormatError::InvalidLayout(format!(
                        "{} offset {}",
                        attribute.name(),
                        o
                    )))
                }
                o => o as u32,
            };

            let count = match attribute {
                VertexAttribute::Position => position_size,
                VertexAttribute::Normal | VertexAttribute::Tangent => 3,
                VertexAttribute::TexCoord => texcoord_size,
                VertexAttribute::Color => color_size,
            };

            let valid_count = match attribute {
                VertexAttribute::Position | VertexAttribute::Color => count == 3 || count == 4,
                VertexAttribute::TexCoord => count == 2 || count == 3,
                _ => true,
            };
            if !valid_count {
                return Err(FormatError::InvalidLayout(format!(
                    "{} has {} components",
                    attribute.name(),
                    count
                )));
            }

            if offset + count > stride {
                return Err(FormatError::InvalidLayout(format!(
                    "{} at offset {} exceeds stride {}",
                    attribute.name(),
                    offset,
                    stride
                )));
            }

            layout.offsets[slot] = Some(offset);
            layout.components[slot] = count;
        }

        if layout.offsets[VertexAttribute::Position.slot()].is_none() {
            return Err(FormatError::InvalidLayout("position is required".to_string()));
        }

        Ok(layout)
    }

    /// 属性偏移（浮点数个数），缺失时为 `None`
    #[inline]
    pub fn offset(&self, attribute: VertexAttribute) -> Option<u32> {
        self.offsets[attribute.slot()]
    }

    /// 属性分量数，缺失时为 0
    #[inline]
    pub fn components(&self, attribute: VertexAttribute) -> u32 {
        self.components[attribute.slot()]
    }

    #[inline]
    pub fn has(&self, attribute: VertexAttribute) -> bool {
        self.offsets[attribute.slot()].is_some()
    }

    /// 每个顶点的浮点数个数
    #[inline]
    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// 每个顶点的字节数
    #[inline]
    pub fn size_bytes(&self) -> u32 {
        self.stride * std::mem::size_of::<f32>() as u32
    }

    /// 二进制头部使用的偏移量表示（缺失为 -1）
    pub fn header_offsets(&self) -> [i32; 5] {
        self.offsets.map(|o| o.map_or(-1, |v| v as i32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packed_stride_and_offsets() {
        // 遍历所有属性组合
        for position_size in [3, 4] {
            for has_normal in [false, true] {
                for texcoord_size in [0, 2, 3] {
                    for has_tangent in [false, true] {
                        for color_size in [0, 3, 4] {
                            let layout = VertexLayout::packed(
                                position_size,
                                has_normal,
                                texcoord_size,
                                has_tangent,
                                color_size,
                            );

                            let mut expected_offset = 0;
                            for attribute in VertexAttribute::ALL {
                                let count = layout.components(attribute);
                                if count > 0 {
                                    assert_eq!(layout.offset(attribute), Some(expected_offset));
                                    expected_offset += count;
                                } else {
                                    assert_eq!(layout.offset(attribute), None);
                                }
                            }
                            assert_eq!(layout.stride(), expected_offset);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_position_only() {
        let layout = VertexLayout::packed(3, false, 0, false, 0);
        assert_eq!(layout.stride(), 3);
        assert_eq!(layout.size_bytes(), 12);
        assert_eq!(layout.header_offsets(), [0, -1, -1, -1, -1]);
    }

    #[test]
    fn test_from_parts_matches_packed() {
        let packed = VertexLayout::packed(3, true, 2, true, 0);
        let parsed = VertexLayout::from_parts(11, packed.header_offsets(), 3, 2, 0).unwrap();
        assert_eq!(parsed, packed);
    }

    #[test]
    fn test_from_parts_rejects_bad_layouts() {
        // 缺少位置
        assert!(VertexLayout::from_parts(3, [-1, 0, -1, -1, -1], 3, 0, 0).is_err());
        // 越出步长
        assert!(VertexLayout::from_parts(5, [0, 3, -1, -1, -1], 3, 0, 0).is_err());
        // 非法分量数
        assert!(VertexLayout::from_parts(5, [0, -1, 3, -1, -1], 3, 1, 0).is_err());
        // 非法负偏移
        assert!(VertexLayout::from_parts(3, [-2, -1, -1, -1, -1], 3, 0, 0).is_err());
    }
}
