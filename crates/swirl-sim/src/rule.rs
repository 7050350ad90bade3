//! Per-cell update rules.
//!
//! An [`UpdateRule`] is a pure gather: the next value of a cell is a
//! function of the current field, the forcing grid and the constants,
//! evaluated on a torus (coordinates wrap at every edge). Rules are
//! evaluated on the device, one logical work item per cell, and must not
//! depend on evaluation order.

use std::fmt;

use swirl_core::{Cell, GridDims, SimulationConstants};

use crate::error::StoreError;

/// A deterministic per-cell update rule.
pub trait UpdateRule: Send + Sync + fmt::Debug + 'static {
    /// Rule name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Write this rule's tick-invariant parameters into `constants`.
    ///
    /// Called on the host copy before it is mirrored to the device.
    fn configure(&self, constants: &mut SimulationConstants) -> Result<(), StoreError>;

    /// Next value of cell `(x, y)`.
    ///
    /// `constants` is the device copy; parameters must be read from it,
    /// not from `self`. `field` and `forcing` are row-major and hold
    /// `constants.width * constants.height` cells.
    fn advance_cell(
        &self,
        constants: &SimulationConstants,
        field: &[Cell],
        forcing: &[Cell],
        x: u32,
        y: u32,
    ) -> Cell;
}

// ── MomentumTransfer ───────────────────────────────────────────────

/// Momentum transfer between neighbouring cells.
///
/// Every cell pushes its magnitude outward to the cells within
/// `radius - 1` in each axis, weighted by a radial falloff and by how well
/// the offset aligns with the cell's direction. A receiving cell sums the
/// transferred momentum and points along the resultant, so a coherent flow
/// keeps travelling while spreading out. `scaling_factor` normalises the
/// kernel so an isolated unit vector transfers exactly unit magnitude.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MomentumTransfer {
    radius: u32,
    dispersion: f32,
}

impl MomentumTransfer {
    /// Default neighbourhood radius.
    pub const DEFAULT_RADIUS: u32 = 9;
    /// Default angular dispersion.
    pub const DEFAULT_DISPERSION: f32 = -0.25;

    /// Rule with the given radius (at least 2) and dispersion in
    /// `[-0.25, 0.25]`.
    pub fn new(radius: u32, dispersion: f32) -> Result<Self, StoreError> {
        if radius < 2 {
            return Err(StoreError::InvalidParams {
                reason: format!("radius must be at least 2, got {radius}"),
            });
        }
        // Outside this range the spread polynomial leaves [0, 1].
        if !(-0.25..=0.25).contains(&dispersion) {
            return Err(StoreError::InvalidParams {
                reason: format!("dispersion must be in [-0.25, 0.25], got {dispersion}"),
            });
        }
        Ok(Self { radius, dispersion })
    }

    /// Neighbourhood radius.
    pub fn radius(&self) -> u32 {
        self.radius
    }

    /// Angular dispersion.
    pub fn dispersion(&self) -> f32 {
        self.dispersion
    }
}

impl Default for MomentumTransfer {
    fn default() -> Self {
        Self {
            radius: Self::DEFAULT_RADIUS,
            dispersion: Self::DEFAULT_DISPERSION,
        }
    }
}

fn falloff(x: f32) -> f32 {
    (x - x * x).max(0.0)
}

fn spread(cos: f32, dispersion: f32) -> f32 {
    -dispersion * cos * cos + 0.5 * cos + dispersion + 0.5
}

/// Kernel normalisation for [`MomentumTransfer`]: the reciprocal of the
/// total weight a unit vector along +x distributes over its neighbourhood.
pub fn scaling_factor(radius: u32, dispersion: f32) -> f32 {
    let reach = radius as i64 - 1;
    let r = radius as f32;
    let mut total = 0.0f64;
    for dy in -reach..=reach {
        for dx in -reach..=reach {
            if dx == 0 && dy == 0 {
                continue;
            }
            let d = ((dx * dx + dy * dy) as f32).sqrt();
            total += (falloff(d / r) * spread(dx as f32 / d, dispersion)) as f64;
        }
    }
    if total > 0.0 {
        (1.0 / total) as f32
    } else {
        0.0
    }
}

impl UpdateRule for MomentumTransfer {
    fn name(&self) -> &'static str {
        "momentum_transfer"
    }

    fn configure(&self, constants: &mut SimulationConstants) -> Result<(), StoreError> {
        constants.radius = self.radius;
        constants.dispersion = self.dispersion;
        constants.scaling_factor = scaling_factor(self.radius, self.dispersion);
        Ok(())
    }

    fn advance_cell(
        &self,
        c: &SimulationConstants,
        field: &[Cell],
        forcing: &[Cell],
        x: u32,
        y: u32,
    ) -> Cell {
        let Ok(dims) = GridDims::new(c.width, c.height) else {
            return Cell::ZERO;
        };
        let reach = c.radius as i64 - 1;
        let r = c.radius as f32;
        let mut resultant = Cell::ZERO;
        let mut mass = 0.0f32;

        for oy in -reach..=reach {
            for ox in -reach..=reach {
                if ox == 0 && oy == 0 {
                    continue;
                }
                // Source j sits at (x, y) - offset; the offset points from j to us.
                let j = dims.wrapped_index(x as i64 - ox, y as i64 - oy);
                let source = field[j];
                let speed = source.magnitude();
                if speed <= 0.0 {
                    continue;
                }
                let d = ((ox * ox + oy * oy) as f32).sqrt();
                let unit = Cell::new(ox as f32 / d, oy as f32 / d);
                let cos = (unit.x * source.x + unit.y * source.y) / speed;
                let m = falloff(d / r) * spread(cos, c.dispersion) * speed * c.scaling_factor;
                resultant = resultant + unit * m;
                mass += m;
            }
        }

        let push = forcing
            .get(dims.wrapped_index(x as i64, y as i64))
            .copied()
            .unwrap_or(Cell::ZERO);
        (resultant.normalized_or_zero() + push).normalized_or_zero() * mass
    }
}

// ── Diffusion ──────────────────────────────────────────────────────

/// Explicit four-neighbour diffusion of the vector field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Diffusion {
    rate: f32,
}

impl Diffusion {
    /// Rule with exchange rate in `(0, 0.25]`, the stable range of the
    /// explicit scheme.
    pub fn new(rate: f32) -> Result<Self, StoreError> {
        if !(rate > 0.0 && rate <= 0.25) {
            return Err(StoreError::InvalidParams {
                reason: format!("diffusion rate must be in (0, 0.25], got {rate}"),
            });
        }
        Ok(Self { rate })
    }

    /// Exchange rate.
    pub fn rate(&self) -> f32 {
        self.rate
    }
}

impl UpdateRule for Diffusion {
    fn name(&self) -> &'static str {
        "diffusion"
    }

    fn configure(&self, constants: &mut SimulationConstants) -> Result<(), StoreError> {
        constants.diffusion_rate = self.rate;
        Ok(())
    }

    fn advance_cell(
        &self,
        c: &SimulationConstants,
        field: &[Cell],
        forcing: &[Cell],
        x: u32,
        y: u32,
    ) -> Cell {
        let Ok(dims) = GridDims::new(c.width, c.height) else {
            return Cell::ZERO;
        };
        let (x, y) = (x as i64, y as i64);
        let here = dims.wrapped_index(x, y);
        let centre = field[here];
        let sum = field[dims.wrapped_index(x - 1, y)]
            + field[dims.wrapped_index(x + 1, y)]
            + field[dims.wrapped_index(x, y - 1)]
            + field[dims.wrapped_index(x, y + 1)];
        let laplacian = sum + centre * -4.0;
        let push = forcing.get(here).copied().unwrap_or(Cell::ZERO);
        centre + laplacian * c.diffusion_rate + push
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn constants(w: u32, h: u32, rule: &dyn UpdateRule) -> SimulationConstants {
        let mut c = SimulationConstants::new(GridDims::new(w, h).unwrap());
        rule.configure(&mut c).unwrap();
        c
    }

    fn advance(rule: &dyn UpdateRule, c: &SimulationConstants, field: &[Cell]) -> Vec<Cell> {
        let forcing = vec![Cell::ZERO; field.len()];
        (0..c.height)
            .flat_map(|y| (0..c.width).map(move |x| (x, y)))
            .map(|(x, y)| rule.advance_cell(c, field, &forcing, x, y))
            .collect()
    }

    #[test]
    fn parameter_ranges_are_enforced() {
        assert!(MomentumTransfer::new(1, 0.0).is_err());
        assert!(MomentumTransfer::new(2, -0.3).is_err());
        assert!(MomentumTransfer::new(2, f32::NAN).is_err());
        assert!(MomentumTransfer::new(4, 0.25).is_ok());
        assert!(Diffusion::new(0.0).is_err());
        assert!(Diffusion::new(0.3).is_err());
        assert!(Diffusion::new(0.25).is_ok());
    }

    #[test]
    fn spread_spans_zero_to_one() {
        for d in [-0.25f32, 0.0, 0.25] {
            assert!(spread(-1.0, d).abs() < 1e-6);
            assert!((spread(1.0, d) - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn scaling_factor_is_positive() {
        let k = scaling_factor(9, -0.25);
        assert!(k.is_finite() && k > 0.0);
    }

    #[test]
    fn zero_field_stays_zero() {
        let rule = MomentumTransfer::default();
        let c = constants(16, 12, &rule);
        let next = advance(&rule, &c, &vec![Cell::ZERO; 16 * 12]);
        assert!(next.iter().all(|v| *v == Cell::ZERO));
    }

    #[test]
    fn unit_vector_magnitude_is_conserved() {
        let rule = MomentumTransfer::new(4, -0.25).unwrap();
        let c = constants(32, 32, &rule);
        let mut field = vec![Cell::ZERO; 32 * 32];
        field[16 * 32 + 16] = Cell::new(1.0, 0.0);
        let next = advance(&rule, &c, &field);
        let total: f32 = next.iter().map(|v| v.magnitude()).sum();
        assert!((total - 1.0).abs() < 1e-3, "total magnitude {total}");
        assert_eq!(next[16 * 32 + 16], Cell::ZERO);
    }

    #[test]
    fn momentum_moves_downstream() {
        let rule = MomentumTransfer::new(3, -0.25).unwrap();
        let c = constants(16, 16, &rule);
        let mut field = vec![Cell::ZERO; 16 * 16];
        field[8 * 16 + 8] = Cell::new(1.0, 0.0);
        let next = advance(&rule, &c, &field);
        let ahead = next[8 * 16 + 9].magnitude();
        let behind = next[8 * 16 + 7].magnitude();
        assert!(ahead > 0.0);
        // spread(-1) is zero with dispersion -0.25.
        assert_eq!(behind, 0.0);
        assert!(next[8 * 16 + 9].x > 0.0);
    }

    #[test]
    fn diffusion_preserves_total_vector() {
        let rule = Diffusion::new(0.2).unwrap();
        let c = constants(8, 8, &rule);
        let mut field = vec![Cell::ZERO; 64];
        field[27] = Cell::new(2.0, -1.0);
        let next = advance(&rule, &c, &field);
        let sum = next.iter().fold(Cell::ZERO, |acc, v| acc + *v);
        assert!((sum.x - 2.0).abs() < 1e-5);
        assert!((sum.y + 1.0).abs() < 1e-5);
        assert!((next[27].x - 2.0 * 0.2).abs() < 1e-5);
    }

    #[test]
    fn forcing_is_added_by_diffusion() {
        let rule = Diffusion::new(0.1).unwrap();
        let c = constants(4, 4, &rule);
        let field = vec![Cell::ZERO; 16];
        let mut forcing = vec![Cell::ZERO; 16];
        forcing[5] = Cell::new(0.5, 0.5);
        let v = rule.advance_cell(&c, &field, &forcing, 1, 1);
        assert_eq!(v, Cell::new(0.5, 0.5));
    }

    fn field_strategy(len: usize) -> impl Strategy<Value = Vec<Cell>> {
        proptest::collection::vec((-10.0f32..10.0, -10.0f32..10.0), len)
            .prop_map(|v| v.into_iter().map(|(x, y)| Cell::new(x, y)).collect())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn momentum_output_is_finite(field in field_strategy(64), radius in 2u32..6) {
            let rule = MomentumTransfer::new(radius, -0.25).unwrap();
            let c = constants(8, 8, &rule);
            prop_assert!(advance(&rule, &c, &field).iter().all(|v| v.is_finite()));
        }

        #[test]
        fn diffusion_conserves_the_sum(field in field_strategy(64), rate in 0.01f32..0.25) {
            let rule = Diffusion::new(rate).unwrap();
            let c = constants(8, 8, &rule);
            let before = field.iter().fold(Cell::ZERO, |acc, v| acc + *v);
            let after = advance(&rule, &c, &field).iter().fold(Cell::ZERO, |acc, v| acc + *v);
            prop_assert!((before.x - after.x).abs() < 1e-2);
            prop_assert!((before.y - after.y).abs() < 1e-2);
        }
    }
}
