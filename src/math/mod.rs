//! 数学工具模块
//!
//! 基于 `nalgebra` 的向量类型别名，以及网格处理中反复用到的
//! 扁平浮点数组读写辅助函数。
//!
//! 原始网格数据以 `Vec<f32>` 加步长的形式存储（位置步长 3 或 4，
//! 纹理坐标步长 2 或 3），这里的函数负责在这些数组与向量之间转换。

pub use nalgebra::{Vector2 as Vec2, Vector3 as Vec3};

// 类型别名，使用更简洁的名称
pub type Vector2 = Vec2<f32>;
pub type Vector3 = Vec3<f32>;

/// 数学常量
pub mod constants {
    /// 法线/切线一致性判定阈值：cos(60°)
    pub const AGREEMENT_COS: f32 = 0.5;
}

/// 读取第 `index` 个元素的前三个分量
///
/// `stride` 为每个元素的浮点数个数（至少为 3）。
#[inline]
pub fn vec3_at(data: &[f32], index: u32, stride: usize) -> Vector3 {
    let base = index as usize * stride;
    Vector3::new(data[base], data[base + 1], data[base + 2])
}

/// 读取第 `index` 个元素的前两个分量
#[inline]
pub fn vec2_at(data: &[f32], index: u32, stride: usize) -> Vector2 {
    let base = index as usize * stride;
    Vector2::new(data[base], data[base + 1])
}

/// 把向量写回扁平数组的第 `index` 个三分量槽位
#[inline]
pub fn store_vec3(data: &mut [f32], index: u32, value: &Vector3) {
    let base = index as usize * 3;
    data[base..base + 3].copy_from_slice(value.as_slice());
}

/// 把向量累加到扁平数组的第 `index` 个三分量槽位
#[inline]
pub fn add_vec3(data: &mut [f32], index: u32, value: &Vector3) {
    let base = index as usize * 3;
    for (slot, v) in data[base..base + 3].iter_mut().zip(value.iter()) {
        *slot += v;
    }
}

/// 归一化，零长度或非有限长度时返回 `None` 而不是产生 NaN
///
/// 不设长度阈值，微米级三角形的叉积同样可以归一化。
#[inline]
pub fn try_normalize(v: &Vector3) -> Option<Vector3> {
    let length = v.norm();
    if length.is_finite() && length >= f32::MIN_POSITIVE {
        Some(v / length)
    } else {
        None
    }
}

/// 零向量判定（精确比较，零向量表示"尚未写入"）
#[inline]
pub fn is_zero(v: &Vector3) -> bool {
    v.x == 0.0 && v.y == 0.0 && v.z == 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec3_at_with_stride() {
        let data = [0.0, 1.0, 2.0, 1.0, 3.0, 4.0, 5.0, 1.0];
        assert_eq!(vec3_at(&data, 1, 4), Vector3::new(3.0, 4.0, 5.0));
    }

    #[test]
    fn test_store_and_add() {
        let mut data = vec![0.0; 6];
        store_vec3(&mut data, 1, &Vector3::new(1.0, 2.0, 3.0));
        add_vec3(&mut data, 1, &Vector3::new(1.0, 1.0, 1.0));
        assert_eq!(data, vec![0.0, 0.0, 0.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_try_normalize_zero() {
        assert!(try_normalize(&Vector3::zeros()).is_none());
        let n = try_normalize(&Vector3::new(0.0, 3.0, 0.0)).unwrap();
        assert!((n.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_try_normalize_tiny_and_non_finite() {
        let n = try_normalize(&Vector3::new(0.0, 0.0, 1e-12)).unwrap();
        assert!((n.z - 1.0).abs() < 1e-6);

        assert!(try_normalize(&Vector3::new(f32::NAN, 0.0, 0.0)).is_none());
        assert!(try_normalize(&Vector3::new(f32::INFINITY, 0.0, 0.0)).is_none());
    }
}
