#![warn(missing_docs)]

//! Light weight helpers shared by the hub crates: the error taxonomy every
//! failure is reported through, the content digest that names commits, the
//! base64url codec used by commit envelopes, and runtime settings.

mod sync;
pub use sync::*;

mod hash;
pub use hash::*;

pub mod encoding;

mod error;
pub use error::*;

mod settings;
pub use settings::*;
