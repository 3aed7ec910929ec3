//! The four lane floating point value that every attribute, register, uniform, and constant is
//! made of. The lanes can be named either position-style (x, y, z, w) or color-style (r, g, b, a).

use std::fmt::{Display, Formatter};
use std::ops::{Add, Index, IndexMut, Mul, Neg};

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct Vector4 {
  pub x: f32,
  pub y: f32,
  pub z: f32,
  pub w: f32
}

impl Vector4 {
  pub const ZERO: Vector4 = Vector4 { x: 0.0, y: 0.0, z: 0.0, w: 0.0 };

  pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Vector4 {
    Vector4 { x, y, z, w }
  }

  /// All four lanes set to `value`.
  pub const fn splat(value: f32) -> Vector4 {
    Vector4 { x: value, y: value, z: value, w: value }
  }

  // region Color aliases

  pub fn r(&self) -> f32 { self.x }
  pub fn g(&self) -> f32 { self.y }
  pub fn b(&self) -> f32 { self.z }
  pub fn a(&self) -> f32 { self.w }

  // endregion

  /// Applies `f` to each lane.
  pub fn map<F>(self, f: F) -> Vector4
    where F: Fn(f32) -> f32
  {
    Vector4::new(f(self.x), f(self.y), f(self.z), f(self.w))
  }

  pub fn abs(self) -> Vector4 {
    self.map(f32::abs)
  }

  pub fn ceil(self) -> Vector4 {
    self.map(f32::ceil)
  }

  pub fn floor(self) -> Vector4 {
    self.map(f32::floor)
  }

  /// Lane-wise product, then the sum of the first three lanes in every lane.
  pub fn dot3(self, rhs: Vector4) -> Vector4 {
    let p = self * rhs;
    Vector4::splat(p.x + p.y + p.z)
  }

  /// Lane-wise product, then the sum of all four lanes in every lane.
  pub fn dot4(self, rhs: Vector4) -> Vector4 {
    let p = self * rhs;
    Vector4::splat(p.x + p.y + p.z + p.w)
  }

  pub fn to_array(self) -> [f32; 4] {
    [self.x, self.y, self.z, self.w]
  }
}

impl From<[f32; 4]> for Vector4 {
  fn from(lanes: [f32; 4]) -> Vector4 {
    Vector4::new(lanes[0], lanes[1], lanes[2], lanes[3])
  }
}

impl Index<usize> for Vector4 {
  type Output = f32;

  fn index(&self, lane: usize) -> &f32 {
    match lane {
      0 => &self.x,
      1 => &self.y,
      2 => &self.z,
      3 => &self.w,
      _ => panic!("Vector4 lane {} out of range", lane)
    }
  }
}

impl IndexMut<usize> for Vector4 {
  fn index_mut(&mut self, lane: usize) -> &mut f32 {
    match lane {
      0 => &mut self.x,
      1 => &mut self.y,
      2 => &mut self.z,
      3 => &mut self.w,
      _ => panic!("Vector4 lane {} out of range", lane)
    }
  }
}

impl Add for Vector4 {
  type Output = Vector4;

  fn add(self, rhs: Vector4) -> Vector4 {
    Vector4::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z, self.w + rhs.w)
  }
}

impl Mul for Vector4 {
  type Output = Vector4;

  fn mul(self, rhs: Vector4) -> Vector4 {
    Vector4::new(self.x * rhs.x, self.y * rhs.y, self.z * rhs.z, self.w * rhs.w)
  }
}

impl Neg for Vector4 {
  type Output = Vector4;

  fn neg(self) -> Vector4 {
    self.map(|lane| -lane)
  }
}

impl Display for Vector4 {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "({}, {}, {}, {})", self.x, self.y, self.z, self.w)
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn color_aliases(){
    let v = Vector4::new(1.0, 2.0, 3.0, 4.0);
    assert_eq!((v.r(), v.g(), v.b(), v.a()), (v.x, v.y, v.z, v.w));
  }

  #[test]
  fn lane_wise_math(){
    let v = Vector4::new(-1.5, 0.0, 2.25, -0.0);
    assert_eq!(v.abs(), Vector4::new(1.5, 0.0, 2.25, 0.0));
    assert_eq!(v.floor(), Vector4::new(-2.0, 0.0, 2.0, -0.0));
    assert_eq!(v.ceil(), Vector4::new(-1.0, 0.0, 3.0, -0.0));
  }

  #[test]
  fn dot_products_broadcast(){
    let a = Vector4::new(1.0, 2.0, 3.0, 4.0);
    let b = Vector4::new(5.0, -6.0, 7.0, 8.0);
    assert_eq!(a.dot3(b), Vector4::splat(5.0 - 12.0 + 21.0));
    assert_eq!(a.dot4(b), Vector4::splat(5.0 - 12.0 + 21.0 + 32.0));
  }

  #[test]
  fn indexing(){
    let mut v = Vector4::ZERO;
    v[2] = 9.0;
    assert_eq!(v[2], v.z);
    assert_eq!(v.to_array(), [0.0, 0.0, 9.0, 0.0]);
  }
}
