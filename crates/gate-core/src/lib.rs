pub mod codes;
pub mod epoch;
pub mod float_wire;
pub mod ids;
pub mod keys;
pub mod policy;
pub mod schema;
pub mod vectors;

pub use codes::*;
pub use epoch::*;
pub use ids::*;
pub use keys::*;
pub use policy::*;
pub use schema::*;
pub use vectors::*;
