//! The per-invocation records the shader core reads its inputs from and writes its outputs to.
//! A record is owned by the caller and only borrowed for one execution.

use crate::vector::Vector4;

/// Attribute slots in a vertex or pixel record.
pub const ATTRIBUTE_SLOTS: usize = 16;
/// Vertex output position and fragment window position.
pub const POSITION_SLOT: u8 = 0;
/// Fragment output color.
pub const COLOR_SLOT: u8 = 1;
/// Vertex outputs other than position are assigned slots from here on, in declaration order.
pub const FIRST_VARYING_SLOT: u8 = 2;

pub trait InvocationRecord {
  fn attributes(&self) -> &[Vector4];

  fn attributes_mut(&mut self) -> &mut [Vector4];

  /// Per-axis screen-space scale factors of the attribute in `slot`, used for level-of-detail
  /// selection when sampling. Records without derivatives report zero.
  fn scale_factors(&self, _slot: u8) -> (Vector4, Vector4) {
    (Vector4::ZERO, Vector4::ZERO)
  }
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct Vertex {
  pub attributes: [Vector4; ATTRIBUTE_SLOTS]
}

impl Vertex {
  pub fn new() -> Vertex {
    Vertex::default()
  }

  /// Slots past the end of the record are ignored.
  pub fn with_attribute(mut self, slot: u8, value: Vector4) -> Vertex {
    if let Some(attribute) = self.attributes.get_mut(slot as usize) {
      *attribute = value;
    }
    self
  }
}

impl InvocationRecord for Vertex {
  fn attributes(&self) -> &[Vector4] {
    &self.attributes
  }

  fn attributes_mut(&mut self) -> &mut [Vector4] {
    &mut self.attributes
  }
}

/// An interpolated fragment, with the x and y scale factors of every attribute.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Pixel {
  pub attributes : [Vector4; ATTRIBUTE_SLOTS],
  pub scale_dx   : [Vector4; ATTRIBUTE_SLOTS],
  pub scale_dy   : [Vector4; ATTRIBUTE_SLOTS]
}

impl Pixel {
  pub fn new() -> Pixel {
    Pixel::default()
  }

  /// Slots past the end of the record are ignored.
  pub fn with_attribute(mut self, slot: u8, value: Vector4) -> Pixel {
    if let Some(attribute) = self.attributes.get_mut(slot as usize) {
      *attribute = value;
    }
    self
  }

  pub fn color(&self) -> Vector4 {
    self.attributes[COLOR_SLOT as usize]
  }
}

impl InvocationRecord for Pixel {
  fn attributes(&self) -> &[Vector4] {
    &self.attributes
  }

  fn attributes_mut(&mut self) -> &mut [Vector4] {
    &mut self.attributes
  }

  fn scale_factors(&self, slot: u8) -> (Vector4, Vector4) {
    let slot = slot as usize;
    match (self.scale_dx.get(slot), self.scale_dy.get(slot)) {
      (Some(dx), Some(dy)) => (*dx, *dy),
      _ => (Vector4::ZERO, Vector4::ZERO)
    }
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn out_of_range_attributes_are_ignored(){
    let vertex = Vertex::new()
      .with_attribute(3, Vector4::splat(1.0))
      .with_attribute(ATTRIBUTE_SLOTS as u8, Vector4::splat(2.0));
    assert_eq!(vertex.attributes[3], Vector4::splat(1.0));
    assert_eq!(vertex.attributes.iter().filter(|a| **a != Vector4::ZERO).count(), 1);

    let pixel = Pixel::new().with_attribute(200, Vector4::splat(2.0));
    assert_eq!(pixel, Pixel::new());
    assert_eq!(pixel.scale_factors(200), (Vector4::ZERO, Vector4::ZERO));
  }
}
