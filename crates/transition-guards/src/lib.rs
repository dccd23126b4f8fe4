mod machine;

pub use machine::{validate, TransitionError, TransitionGrant, TransitionRequest};
