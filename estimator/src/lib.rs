//! Precision estimator for CKKS circuits.
//!
//! Ciphertexts are simulated by [Element]s holding `scale * m + e` in the
//! canonical embedding with arbitrary precision. The [Evaluator] applies
//! each homomorphic operation to the message and injects the error that the
//! real operation would produce (encoding rounding, encryption, key-switching,
//! rescaling, modulus raising). Running the same circuit over many noise
//! realizations with [MonteCarlo] gives the distribution of the output
//! precision.
//!
//! | Module | Responsibility |
//! |---|---|
//! | [parameters] | Modulus chain, scales, secret proxy, noise model switches |
//! | [noise] | Error samplers in the canonical embedding |
//! | [element], [evaluator] | Simulated ciphertexts and their arithmetic |
//! | [linear_transform], [dft] | BSGS linear transforms, homomorphic (I)DFT |
//! | [polynomial], [mod1] | Paterson-Stockmeyer evaluation, EvalMod |
//! | [bootstrapping] | Full bootstrapping circuit |
//! | [stats], [trials] | Precision statistics and Monte Carlo runs |

pub mod bootstrapping;
pub mod dft;
pub mod element;
pub mod error;
pub mod evaluator;
pub mod inverse;
pub mod linear_transform;
pub mod mod1;
pub mod noise;
pub mod parameters;
pub mod polynomial;
pub mod secret;
pub mod stats;
pub mod trials;

pub use bootstrapping::*;
pub use dft::*;
pub use element::*;
pub use error::{Error, Result};
pub use evaluator::*;
pub use linear_transform::*;
pub use mod1::*;
pub use parameters::*;
pub use polynomial::*;
pub use secret::*;
pub use stats::*;
pub use trials::*;

pub use backend::{Complex, Float};
