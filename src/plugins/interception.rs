// SPDX-License-Identifier: Apache-2.0
//! Instruction interception: an ordered chain where each plugin may
//! transform or veto an instruction's effect before Execute commits it
//! (spec §4.6) — e.g. localized radiation flipping a written molecule's
//! value.

use crate::ident::OrganismId;
use crate::isa::Effect;
use crate::rng::Prng;

/// Context available to an interceptor: enough to decide whether and how
/// to alter the pending effect, without giving it World access (only the
/// scheduler, which owns conflict resolution, may touch the World).
#[derive(Clone, Copy, Debug)]
pub struct InterceptionContext {
    /// Current tick.
    pub tick: u64,
    /// The organism whose instruction produced this effect.
    pub organism_id: OrganismId,
}

/// One link in the interception chain.
pub trait InstructionInterceptor: Send + Sync {
    /// Transforms or vetoes `effect`. Returning `None` vetoes the
    /// instruction entirely (as if it had produced [`Effect::None`]);
    /// returning `Some` (possibly unchanged) passes it to the next link.
    fn intercept(
        &self,
        ctx: &InterceptionContext,
        effect: Effect,
        rng: &mut Prng,
    ) -> Option<Effect>;
}

/// Runs `effect` through an ordered chain, short-circuiting on the first
/// veto.
pub fn run_chain(
    chain: &[Box<dyn InstructionInterceptor>],
    ctx: &InterceptionContext,
    mut effect: Effect,
    rng: &mut Prng,
) -> Option<Effect> {
    for interceptor in chain {
        effect = interceptor.intercept(ctx, effect, rng)?;
    }
    Some(effect)
}

/// Replaces a `WriteOwned`/`Swap` molecule's value with a randomized one
/// at probability `flip_probability`, simulating background radiation.
/// Leaves every other effect kind untouched.
#[derive(Clone, Copy, Debug)]
pub struct RadiationInterceptor {
    /// Per-instruction probability of a bit flip.
    pub flip_probability: f32,
}

impl InstructionInterceptor for RadiationInterceptor {
    fn intercept(
        &self,
        _ctx: &InterceptionContext,
        effect: Effect,
        rng: &mut Prng,
    ) -> Option<Effect> {
        if rng.next_f32() >= self.flip_probability {
            return Some(effect);
        }
        Some(match effect {
            Effect::WriteOwned {
                coord,
                mut molecule,
                marker,
            } => {
                molecule.value ^= 1 << rng.next_int(0, 62);
                Effect::WriteOwned {
                    coord,
                    molecule,
                    marker,
                }
            }
            Effect::Swap {
                coord,
                mut molecule,
                marker,
            } => {
                molecule.value ^= 1 << rng.next_int(0, 62);
                Effect::Swap {
                    coord,
                    molecule,
                    marker,
                }
            }
            other => other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::Coord;
    use crate::molecule::{Marker, Molecule};

    #[test]
    fn chain_short_circuits_on_veto() {
        struct Vetoer;
        impl InstructionInterceptor for Vetoer {
            fn intercept(
                &self,
                _ctx: &InterceptionContext,
                _effect: Effect,
                _rng: &mut Prng,
            ) -> Option<Effect> {
                None
            }
        }
        let chain: Vec<Box<dyn InstructionInterceptor>> = vec![Box::new(Vetoer)];
        let ctx = InterceptionContext {
            tick: 0,
            organism_id: crate::ident::OrganismId(1),
        };
        let mut rng = Prng::from_seed_u64(1);
        let result = run_chain(&chain, &ctx, Effect::None, &mut rng);
        assert!(result.is_none());
    }

    #[test]
    fn radiation_never_fires_at_zero_probability() {
        let interceptor = RadiationInterceptor {
            flip_probability: 0.0,
        };
        let ctx = InterceptionContext {
            tick: 0,
            organism_id: crate::ident::OrganismId(1),
        };
        let mut rng = Prng::from_seed_u64(1);
        let effect = Effect::WriteOwned {
            coord: Coord(vec![0, 0]),
            molecule: Molecule::structure(5),
            marker: Marker::ZERO,
        };
        let result = interceptor
            .intercept(&ctx, effect.clone(), &mut rng)
            .unwrap();
        assert!(matches!(result, Effect::WriteOwned { molecule, .. } if molecule.value == 5));
    }
}
