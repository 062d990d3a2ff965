use std::fmt;

use serde::{Deserialize, Serialize};

/// A position on the horizontal plane.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Vector2<T> {
    pub x: T,
    pub z: T,
}

impl<T> Vector2<T> {
    pub const fn new(x: T, z: T) -> Self {
        Vector2 { x, z }
    }
}

impl<T> From<(T, T)> for Vector2<T> {
    #[inline(always)]
    fn from((x, z): (T, T)) -> Self {
        Vector2 { x, z }
    }
}

impl<T: fmt::Display> fmt::Display for Vector2<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.x, self.z)
    }
}

#[cfg(test)]
mod test {
    use super::Vector2;

    #[test]
    fn display_and_order() {
        assert_eq!(Vector2::new(-3, 12).to_string(), "[-3, 12]");
        assert_eq!(Vector2::from((1, 2)), Vector2::new(1, 2));
        assert!(Vector2::new(0, 5) < Vector2::new(1, -5));
    }
}
