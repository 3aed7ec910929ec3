/*!
  Component masks select and replicate the lanes of a `Vector4` when an operand is read, and select
  which lanes of the destination are written when a result is stored.

  A mask is written either position-style (`x`, `y`, `z`, `w`) or color-style (`r`, `g`, `b`, `a`).
  The two families name the same lanes, but a single mask may not mix them.
*/

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::vector::Vector4;

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum Component {
  X,
  Y,
  Z,
  W
}

impl Component {
  /// Returns the lane and whether the character was a color-style alias.
  pub fn from_char(c: char) -> Option<(Component, bool)> {
    match c {
      'x' => Some((Component::X, false)),
      'y' => Some((Component::Y, false)),
      'z' => Some((Component::Z, false)),
      'w' => Some((Component::W, false)),
      'r' => Some((Component::X, true)),
      'g' => Some((Component::Y, true)),
      'b' => Some((Component::Z, true)),
      'a' => Some((Component::W, true)),
      _   => None
    }
  }

  pub fn lane(&self) -> usize {
    match self {
      Component::X => 0,
      Component::Y => 1,
      Component::Z => 2,
      Component::W => 3
    }
  }

  fn to_char(&self, color: bool) -> char {
    match (self, color) {
      (Component::X, false) => 'x',
      (Component::Y, false) => 'y',
      (Component::Z, false) => 'z',
      (Component::W, false) => 'w',
      (Component::X, true)  => 'r',
      (Component::Y, true)  => 'g',
      (Component::Z, true)  => 'b',
      (Component::W, true)  => 'a',
    }
  }
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub enum MaskError {
  Empty,
  TooLong(usize),
  NotAComponent(char),
  MixedAliases
}

impl Display for MaskError {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      MaskError::Empty            => write!(f, "a component mask needs at least one component"),
      MaskError::TooLong(n)       => write!(f, "a component mask has at most 4 components, found {}", n),
      MaskError::NotAComponent(c) => write!(f, "`{}` is not a vector component", c),
      MaskError::MixedAliases     => write!(f, "a component mask cannot mix xyzw and rgba"),
    }
  }
}

/// One to four components, all from the same alias family.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct Mask {
  components : [Component; 4],
  len        : u8,
  color      : bool
}

impl Mask {
  /// `.xyzw`, the mask used when an operand is written without one.
  pub const FULL: Mask = Mask {
    components : [Component::X, Component::Y, Component::Z, Component::W],
    len        : 4,
    color      : false
  };

  pub fn new(components: &[Component]) -> Result<Mask, MaskError> {
    match components.len() {
      0 => return Err(MaskError::Empty),
      n if n > 4 => return Err(MaskError::TooLong(n)),
      _ => {}
    }
    let mut lanes = [Component::X; 4];
    lanes[..components.len()].copy_from_slice(components);
    Ok(Mask{ components: lanes, len: components.len() as u8, color: false })
  }

  pub fn components(&self) -> &[Component] {
    &self.components[..self.len as usize]
  }

  pub fn len(&self) -> usize {
    self.len as usize
  }

  pub fn is_full(&self) -> bool {
    self.components() == Mask::FULL.components()
  }

  /**
    Extracts lanes of `input`. The i-th mask component selects the i-th output lane. When the mask
    is shorter than four, the remaining output lanes replicate the last resolved lane, so `x` gives
    `(x, x, x, x)` and `xy` gives `(x, y, y, y)`.
  */
  pub fn read(&self, input: Vector4) -> Vector4 {
    let mut output = Vector4::ZERO;
    let mut last   = 0.0;
    for lane in 0..4 {
      if let Some(component) = self.components().get(lane) {
        last = input[component.lane()];
      }
      output[lane] = last;
    }
    output
  }

  /**
    Writes the lanes of `value` named by the mask into the same lanes of `destination`. Lanes the
    mask does not name are left untouched, so `xz` updates lanes 0 and 2 only.
  */
  pub fn write(&self, value: Vector4, destination: &mut Vector4) {
    for component in self.components() {
      let lane = component.lane();
      destination[lane] = value[lane];
    }
  }
}

impl Default for Mask {
  fn default() -> Mask {
    Mask::FULL
  }
}

impl FromStr for Mask {
  type Err = MaskError;

  fn from_str(text: &str) -> Result<Mask, MaskError> {
    let mut components: Vec<Component> = Vec::with_capacity(4);
    let mut family: Option<bool> = None;

    for c in text.chars() {
      let (component, color) = Component::from_char(c).ok_or(MaskError::NotAComponent(c))?;
      match family {
        Some(f) if f != color => return Err(MaskError::MixedAliases),
        _ => family = Some(color)
      }
      components.push(component);
    }

    let mut mask = Mask::new(&components)?;
    mask.color = family.unwrap_or(false);
    Ok(mask)
  }
}

impl Display for Mask {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let text: String = self.components().iter().map(|c| c.to_char(self.color)).collect();
    write!(f, "{}", text)
  }
}

/// Reads `input` through the mask written as `mask`.
pub fn read_by_mask(input: Vector4, mask: &str) -> Result<Vector4, MaskError> {
  Ok(mask.parse::<Mask>()?.read(input))
}

/**
  Writes `value` into `destination` one mask character at a time, stopping at the first character
  that does not name a component. Everything after the stop is left unmodified.
*/
pub fn write_by_mask(value: Vector4, destination: &mut Vector4, mask: &str) {
  for c in mask.chars() {
    match Component::from_char(c) {
      Some((component, _)) => {
        let lane = component.lane();
        destination[lane] = value[lane];
      }
      None => return
    }
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  fn v() -> Vector4 {
    Vector4::new(1.0, 2.0, 3.0, 4.0)
  }

  #[test]
  fn read_replicates_last_lane(){
    assert_eq!(read_by_mask(v(), "x"),    Ok(Vector4::splat(1.0)));
    assert_eq!(read_by_mask(v(), "xy"),   Ok(Vector4::new(1.0, 2.0, 2.0, 2.0)));
    assert_eq!(read_by_mask(v(), "xyz"),  Ok(Vector4::new(1.0, 2.0, 3.0, 3.0)));
    assert_eq!(read_by_mask(v(), "xyzw"), Ok(v()));
  }

  #[test]
  fn read_swizzles(){
    assert_eq!(read_by_mask(v(), "wzyx"), Ok(Vector4::new(4.0, 3.0, 2.0, 1.0)));
    assert_eq!(read_by_mask(v(), "zx"),   Ok(Vector4::new(3.0, 1.0, 1.0, 1.0)));
  }

  #[test]
  fn color_aliases_read_the_same_lanes(){
    for (position, color) in &[("x", "r"), ("yz", "gb"), ("wzyx", "abgr"), ("xyzw", "rgba")] {
      assert_eq!(read_by_mask(v(), position), read_by_mask(v(), color));
    }
  }

  #[test]
  fn malformed_masks(){
    assert_eq!("".parse::<Mask>(), Err(MaskError::Empty));
    assert_eq!("xyzwx".parse::<Mask>(), Err(MaskError::TooLong(5)));
    assert_eq!("xq".parse::<Mask>(), Err(MaskError::NotAComponent('q')));
    assert_eq!("xg".parse::<Mask>(), Err(MaskError::MixedAliases));
  }

  #[test]
  fn write_partial(){
    let mut destination = Vector4::new(10.0, 20.0, 30.0, 40.0);
    write_by_mask(v(), &mut destination, "xz");
    assert_eq!(destination, Vector4::new(1.0, 20.0, 3.0, 40.0));

    let mut destination = Vector4::new(10.0, 20.0, 30.0, 40.0);
    "xy".parse::<Mask>().unwrap().write(v(), &mut destination);
    assert_eq!(destination, Vector4::new(1.0, 2.0, 30.0, 40.0));
  }

  #[test]
  fn write_stops_at_first_non_component(){
    let mut destination = Vector4::ZERO;
    write_by_mask(v(), &mut destination, "x\0w");
    assert_eq!(destination, Vector4::new(1.0, 0.0, 0.0, 0.0));
  }

  #[test]
  fn display_keeps_alias_family(){
    assert_eq!("rgb".parse::<Mask>().unwrap().to_string(), "rgb");
    assert_eq!(Mask::FULL.to_string(), "xyzw");
  }
}
