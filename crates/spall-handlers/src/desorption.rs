//! Recombinative desorption of hydrogen isotopes at the surface.
//!
//! Single D and T atoms just below the surface recombine and leave the
//! material. Above an equilibrium floor the loss is second order:
//!
//! ```text
//! flux = −k(T)·(c − c_eq)²   for c > c_eq, else 0
//! k(T) = k₀·exp(−E/(k_B·T))
//! ```

use spall_core::constants::arrhenius;
use spall_core::{HandlerError, JacobianEntry, JacobianSink, Species};
use spall_grid::SurfaceBand;
use spall_handler::{
    check_buffers, FillMaps, PartialsShape, PhysicsHandler, PointContext, SetupContext, Stage,
};
use spall_network::ReactionNetwork;

/// Second-order loss above `eq`: `(flux, ∂flux/∂c)`.
fn loss(k: f64, c: f64, eq: f64) -> Option<(f64, f64)> {
    (c > eq).then(|| {
        let excess = c - eq;
        (-k * excess * excess, -2.0 * k * excess)
    })
}

/// Desorption of size-1 hydrogen isotopes in a band at the surface.
#[derive(Clone, Debug)]
pub struct DesorptionHandler {
    band: SurfaceBand,
    prefactor: f64,
    energy: f64,
    equilibrium: f64,
    slots: Vec<usize>,
    /// Per local point, whether the point lies in the band.
    in_band: Vec<bool>,
    /// Per local point, `k(T)`.
    rates: Vec<f64>,
}

/// Builder for [`DesorptionHandler`].
///
/// Required: the recombination prefactor and energy. Defaults: band at
/// exactly one point past the surface, zero equilibrium floor.
#[derive(Clone, Debug)]
pub struct DesorptionConfig {
    band: SurfaceBand,
    recombination: Option<(f64, f64)>,
    equilibrium: f64,
}

impl DesorptionHandler {
    /// Create a builder.
    pub fn builder() -> DesorptionConfig {
        DesorptionConfig {
            band: SurfaceBand::single(1),
            recombination: None,
            equilibrium: 0.0,
        }
    }

    /// Equilibrium concentration floor.
    pub fn equilibrium(&self) -> f64 {
        self.equilibrium
    }

    /// `k(T)` at local point `local`.
    pub fn rate(&self, local: usize) -> f64 {
        self.rates.get(local).copied().unwrap_or(0.0)
    }

    /// Slots of the desorbing clusters.
    pub fn desorbing_slots(&self) -> &[usize] {
        &self.slots
    }

    fn candidates(&self, local: usize) -> &[usize] {
        if self.in_band.get(local).copied().unwrap_or(false) {
            &self.slots
        } else {
            &[]
        }
    }
}

impl DesorptionConfig {
    /// Points past the surface where desorption happens.
    pub fn band(mut self, band: SurfaceBand) -> Self {
        self.band = band;
        self
    }

    /// `k(T) = prefactor·exp(−energy/(k_B·T))`.
    pub fn recombination(mut self, prefactor: f64, energy: f64) -> Self {
        self.recombination = Some((prefactor, energy));
        self
    }

    /// Concentration floor below which nothing desorbs.
    pub fn equilibrium(mut self, concentration: f64) -> Self {
        self.equilibrium = concentration;
        self
    }

    /// Build the handler.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the recombination rate is missing or any value is
    /// negative or not finite, or if the band is empty.
    pub fn build(self) -> Result<DesorptionHandler, String> {
        let (prefactor, energy) = self
            .recombination
            .ok_or_else(|| "recombination prefactor and energy are required".to_string())?;
        for (what, v) in [
            ("prefactor", prefactor),
            ("energy", energy),
            ("equilibrium concentration", self.equilibrium),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(format!("desorption {what} must be finite and >= 0, got {v}"));
            }
        }
        if self.band.is_empty() {
            return Err(format!(
                "desorption band {}..={} is empty",
                self.band.start, self.band.end
            ));
        }
        Ok(DesorptionHandler {
            band: self.band,
            prefactor,
            energy,
            equilibrium: self.equilibrium,
            slots: Vec::new(),
            in_band: Vec::new(),
            rates: Vec::new(),
        })
    }
}

impl PhysicsHandler for DesorptionHandler {
    fn name(&self) -> &str {
        "desorption"
    }

    fn stage(&self) -> Stage {
        Stage::Desorption
    }

    fn initialize(
        &mut self,
        setup: &SetupContext<'_>,
        fill: &mut FillMaps,
    ) -> Result<(), HandlerError> {
        let network = setup.network();
        self.slots = [Species::D, Species::T]
            .into_iter()
            .filter_map(|sp| network.get(sp, 1))
            .map(|c| c.id().index())
            .collect();
        for &s in &self.slots {
            fill.dfill.mark(s, s);
        }
        let surface = setup.surface();
        self.in_band = setup
            .owned()
            .iter()
            .map(|p| self.band.contains(p, surface))
            .collect();
        let owned = setup.owned().len();
        if self.rates.len() != owned {
            self.rates = (0..owned)
                .map(|local| arrhenius(self.prefactor, self.energy, network.temperature(local)))
                .collect();
        }
        log::debug!(
            "desorption: {} isotopes at {} points",
            self.slots.len(),
            self.in_band.iter().filter(|&&b| b).count()
        );
        Ok(())
    }

    fn refresh_temperature(&mut self, local: usize, temperature: f64, _network: &ReactionNetwork) {
        if local >= self.rates.len() {
            self.rates.resize(local + 1, 0.0);
        }
        self.rates[local] = arrhenius(self.prefactor, self.energy, temperature);
    }

    fn compute_flux(&self, ctx: &PointContext<'_>, out: &mut [f64]) {
        let k = self.rate(ctx.local());
        for &s in self.candidates(ctx.local()) {
            if let Some((flux, _)) = loss(k, ctx.mid()[s], self.equilibrium) {
                out[s] += flux;
            }
        }
    }

    fn participant_count(&self, ctx: &PointContext<'_>) -> usize {
        self.candidates(ctx.local())
            .iter()
            .filter(|&&s| ctx.mid()[s] > self.equilibrium)
            .count()
    }

    fn partials_shape(&self) -> PartialsShape {
        PartialsShape::new(1, 1)
    }

    fn compute_partials(
        &self,
        ctx: &PointContext<'_>,
        indices: &mut [usize],
        values: &mut [f64],
    ) -> Result<usize, HandlerError> {
        let n = self.participant_count(ctx);
        check_buffers(self.name(), self.partials_shape(), n, indices, values)?;
        let k = self.rate(ctx.local());
        let mut i = 0;
        for &s in self.candidates(ctx.local()) {
            if let Some((_, partial)) = loss(k, ctx.mid()[s], self.equilibrium) {
                indices[i] = s;
                values[i] = partial;
                i += 1;
            }
        }
        Ok(i)
    }

    fn emit_partials(
        &self,
        ctx: &PointContext<'_>,
        indices: &[usize],
        values: &[f64],
        count: usize,
        sink: &mut dyn JacobianSink,
    ) {
        let point = ctx.point() as isize;
        for (&slot, &value) in indices.iter().zip(values).take(count) {
            sink.add(JacobianEntry {
                row_point: point,
                row: slot,
                col_point: point,
                col: slot,
                value,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn nothing_at_or_below_floor() {
        assert_eq!(loss(2.0, 1.0, 1.0), None);
        assert_eq!(loss(2.0, 0.5, 1.0), None);
        assert_eq!(loss(2.0, 3.0, 1.0), Some((-8.0, -8.0)));
    }

    #[test]
    fn recombination_required() {
        assert!(DesorptionHandler::builder().build().is_err());
        assert!(DesorptionHandler::builder()
            .recombination(1.0e-3, -0.1)
            .build()
            .is_err());
        let h = DesorptionHandler::builder()
            .recombination(1.0e-3, 0.5)
            .equilibrium(1.0e-8)
            .build()
            .unwrap();
        assert_eq!(h.equilibrium(), 1.0e-8);
        assert_eq!(h.rate(0), 0.0);
    }

    proptest! {
        #[test]
        fn loss_more_negative_as_concentration_rises(
            k in 1.0e-6f64..1.0e3,
            eq in 0.0f64..1.0,
            a in 0.0f64..10.0,
            gap in 1.0e-3f64..10.0,
        ) {
            let low = eq + a + 1.0e-6;
            let high = low + gap;
            let (f_low, d_low) = loss(k, low, eq).unwrap();
            let (f_high, _) = loss(k, high, eq).unwrap();
            prop_assert!(f_high < f_low);
            prop_assert!(f_low < 0.0);
            prop_assert!(d_low < 0.0);
        }
    }
}
