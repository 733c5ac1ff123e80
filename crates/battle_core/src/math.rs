//! Fixed-point geometry for deterministic turn resolution.
//!
//! Positions, speeds, ranges and hit chances are all fixed-point so that a
//! battle replayed from its event log lands on bit-identical state on any
//! platform.

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all battle math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
pub type Fixed = I32F32;

/// Build a fixed-point fraction from a whole percentage (`95` → `0.95`).
#[must_use]
pub fn percent(value: u32) -> Fixed {
    Fixed::from_num(value) / Fixed::from_num(100)
}

/// Fixed-point 2D vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec2Fixed {
    /// X coordinate.
    #[serde(with = "fixed_serde")]
    pub x: Fixed,
    /// Y coordinate.
    #[serde(with = "fixed_serde")]
    pub y: Fixed,
}

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

impl Vec2Fixed {
    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Create a vector from whole-number coordinates.
    #[must_use]
    pub fn from_ints(x: i32, y: i32) -> Self {
        Self::new(Fixed::from_num(x), Fixed::from_num(y))
    }

    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
    };

    /// Calculate squared distance (avoids sqrt for comparisons).
    ///
    /// Saturates at `Fixed::MAX`, roughly 46,340 units of separation.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> Fixed {
        let dx = self.x.saturating_sub(other.x);
        let dy = self.y.saturating_sub(other.y);
        dx.saturating_mul(dx).saturating_add(dy.saturating_mul(dy))
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> Fixed {
        fixed_sqrt(self.distance_squared(other))
    }

    /// Dot product of two vectors.
    #[must_use]
    pub fn dot(self, other: Self) -> Fixed {
        self.x
            .saturating_mul(other.x)
            .saturating_add(self.y.saturating_mul(other.y))
    }

    /// Linearly interpolate between two vectors.
    #[must_use]
    pub fn lerp(self, other: Self, t: Fixed) -> Self {
        Self {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }

    /// Step from `self` toward `target`, travelling at most `max_step`.
    ///
    /// Returns `target` itself when it is within reach.
    #[must_use]
    pub fn move_towards(self, target: Self, max_step: Fixed) -> Self {
        let distance = self.distance(target);
        if distance <= max_step {
            return target;
        }
        if max_step <= Fixed::ZERO {
            return self;
        }
        self.lerp(target, max_step / distance)
    }

    /// Shortest distance from `self` to the segment `start..end`.
    #[must_use]
    pub fn distance_to_segment(self, start: Self, end: Self) -> Fixed {
        let segment = end - start;
        let len_sq = segment.dot(segment);
        if len_sq == Fixed::ZERO {
            return self.distance(start);
        }

        let t = ((self - start).dot(segment) / len_sq).clamp(Fixed::ZERO, Fixed::ONE);
        self.distance(start.lerp(end, t))
    }

    /// Whether the point lies inside `[0, width] x [0, height]`.
    #[must_use]
    pub fn within_bounds(self, width: u32, height: u32) -> bool {
        self.x >= Fixed::ZERO
            && self.y >= Fixed::ZERO
            && self.x <= Fixed::saturating_from_num(width)
            && self.y <= Fixed::saturating_from_num(height)
    }

    /// Coordinates as floats, for presentation layers only.
    #[must_use]
    pub fn to_f64_pair(self) -> (f64, f64) {
        (self.x.to_num::<f64>(), self.y.to_num::<f64>())
    }
}

/// Intermediate points between `start` and `end`, `spacing` units apart.
///
/// Neither endpoint is included.
#[must_use]
pub fn plot_waypoints(start: Vec2Fixed, end: Vec2Fixed, spacing: Fixed) -> Vec<Vec2Fixed> {
    let length = start.distance(end);
    if spacing <= Fixed::ZERO || length <= spacing {
        return Vec::new();
    }

    let steps: u32 = (length / spacing).to_num();
    (1..=steps)
        .map(|step| spacing * Fixed::from_num(step))
        .take_while(|travelled| *travelled < length)
        .map(|travelled| start.lerp(end, travelled / length))
        .collect()
}

/// Computes the square root of a fixed-point number using binary search.
#[must_use]
pub fn fixed_sqrt(value: Fixed) -> Fixed {
    if value <= Fixed::ZERO {
        return Fixed::ZERO;
    }

    // No representable value has a root above this.
    let ceiling = Fixed::from_num(46_341);
    let mut low = Fixed::ZERO;
    let mut high = if value > Fixed::ONE {
        value.min(ceiling)
    } else {
        Fixed::ONE
    };

    for _ in 0..64 {
        let mid = low + (high - low) / Fixed::from_num(2);
        if mid == low {
            break;
        }
        let mid_sq = mid.saturating_mul(mid);

        if mid_sq <= value {
            low = mid;
        } else {
            high = mid;
        }
    }

    low
}

impl std::ops::Add for Vec2Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::Sub for Vec2Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn epsilon() -> Fixed {
        Fixed::ONE / Fixed::from_num(10000)
    }

    #[test]
    fn test_vec2_distance_squared() {
        let a = Vec2Fixed::from_ints(3, 0);
        let b = Vec2Fixed::from_ints(0, 4);
        assert_eq!(a.distance_squared(b), Fixed::from_num(25));
    }

    #[test]
    fn test_vec2_distance() {
        let a = Vec2Fixed::from_ints(0, 0);
        let b = Vec2Fixed::from_ints(3, 4);
        assert!((a.distance(b) - Fixed::from_num(5)).abs() < epsilon());
    }

    #[test]
    fn test_fixed_sqrt_of_non_square() {
        // sqrt(800) = 28.2842712...
        let root = fixed_sqrt(Fixed::from_num(800));
        assert!((root - Fixed::from_num(28.284_271_2)).abs() < epsilon());
    }

    #[test]
    fn test_move_towards_clips_to_step() {
        let start = Vec2Fixed::from_ints(0, 0);
        let target = Vec2Fixed::from_ints(30, 40);
        let next = start.move_towards(target, Fixed::from_num(10));
        assert!((next.x - Fixed::from_num(6)).abs() < epsilon());
        assert!((next.y - Fixed::from_num(8)).abs() < epsilon());
    }

    #[test]
    fn test_move_towards_reaches_close_target() {
        let start = Vec2Fixed::from_ints(0, 0);
        let target = Vec2Fixed::from_ints(3, 4);
        assert_eq!(start.move_towards(target, Fixed::from_num(10)), target);
    }

    #[test]
    fn test_move_towards_zero_step_stays() {
        let start = Vec2Fixed::from_ints(5, 5);
        let target = Vec2Fixed::from_ints(50, 50);
        assert_eq!(start.move_towards(target, Fixed::ZERO), start);
    }

    #[test]
    fn test_distance_to_segment() {
        let start = Vec2Fixed::from_ints(0, 0);
        let end = Vec2Fixed::from_ints(10, 0);

        let above = Vec2Fixed::from_ints(5, 3);
        assert!((above.distance_to_segment(start, end) - Fixed::from_num(3)).abs() < epsilon());

        // Beyond the end the closest point is the endpoint itself.
        let beyond = Vec2Fixed::from_ints(13, 4);
        assert!((beyond.distance_to_segment(start, end) - Fixed::from_num(5)).abs() < epsilon());
    }

    #[test]
    fn test_within_bounds() {
        assert!(Vec2Fixed::from_ints(0, 0).within_bounds(100, 50));
        assert!(Vec2Fixed::from_ints(100, 50).within_bounds(100, 50));
        assert!(!Vec2Fixed::from_ints(101, 10).within_bounds(100, 50));
        assert!(!Vec2Fixed::from_ints(-1, 10).within_bounds(100, 50));
    }

    #[test]
    fn test_distance_saturates_instead_of_wrapping() {
        let origin = Vec2Fixed::from_ints(0, 0);
        let corner = Vec2Fixed::from_ints(40_000, 40_000);
        assert_eq!(origin.distance_squared(corner), Fixed::MAX);
        assert!(origin.distance(corner) > Fixed::from_num(46_000));

        let edge = Vec2Fixed::from_ints(32_767, 32_767);
        assert!(origin.distance_squared(edge) < Fixed::MAX);
    }

    #[test]
    fn test_within_bounds_huge_dimensions() {
        assert!(Vec2Fixed::from_ints(5, 5).within_bounds(u32::MAX, u32::MAX));
    }

    #[test]
    fn test_plot_waypoints_excludes_endpoints() {
        let start = Vec2Fixed::from_ints(0, 0);
        let end = Vec2Fixed::from_ints(16, 0);
        let points = plot_waypoints(start, end, Fixed::from_num(4));

        assert_eq!(
            points,
            vec![
                Vec2Fixed::from_ints(4, 0),
                Vec2Fixed::from_ints(8, 0),
                Vec2Fixed::from_ints(12, 0),
            ]
        );
    }

    #[test]
    fn test_plot_waypoints_short_segment() {
        let start = Vec2Fixed::from_ints(0, 0);
        let end = Vec2Fixed::from_ints(1, 1);
        assert!(plot_waypoints(start, end, Fixed::from_num(2)).is_empty());
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(50), Fixed::from_num(0.5));
        assert_eq!(percent(100), Fixed::ONE);
    }
}
