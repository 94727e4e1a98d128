//! The protocols themselves: secret input, reconstruction, degree
//! reduction, truncation, bit extraction and the comparison-based
//! operators built on top of them.
//!
//! Every function takes the party's [`crate::execution::session::MpcContext`]
//! first and drives one party's side of the protocol; all parties must call
//! the same functions in the same order.

pub mod bits;
pub mod compare;
pub mod maxpool;
pub mod mult;
pub mod prefix;
pub mod relu;
pub mod sharing;

pub use bits::{and, if_else, or, xor, xor_public};
pub use compare::{less_than, less_than_shared};
pub use maxpool::{maxpool, maxpool_fused, maxpool_sequential};
pub use mult::{
    mul, reduce_degree, reduce_degree_first_layer, reduce_truncate, square, truncate,
};
pub use prefix::{mult_all, postfix_mult, prefix_mult};
pub use relu::{drelu, lsb, lsb_impaired, msb, msb_impaired, relu, relu_fused};
pub use sharing::{
    input_bundle, input_bundle_prg, input_bundle_prg_2t, input_blocks, input_random,
    input_scalar, open_scalar, request_input, reveal_to, reveal_to_all,
    reveal_to_all_truncated, PendingInput,
};
